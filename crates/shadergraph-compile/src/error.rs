//! Compile error types covering every pipeline failure mode.

use shadergraph_core::CoreError;

/// Errors that can occur while simplifying or finalizing a shader graph.
///
/// Authoring mistakes (bad links, cycles) are not errors: they are recorded
/// as diagnostics on the graph. These variants mean a pass was handed stale
/// ids or left the graph in a state it must never be in.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A graph primitive rejected a lookup or mutation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Graph structure issue found after a pass completed.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
}
