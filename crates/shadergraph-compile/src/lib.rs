//! Shader graph compilation pipeline.
//!
//! This crate turns an authored [`ShaderGraph`](shadergraph_core::ShaderGraph)
//! into the minimal, acyclic, closure-flattened form a kernel compiler
//! consumes.
//!
//! # Modules
//!
//! - [`error`] -- Error types for all pipeline failure modes
//! - [`passes`] -- Individual graph rewriting passes
//! - [`pipeline`] -- `clean`, `simplify` and `finalize` orchestration
//! - [`hash`] -- Displacement subgraph content hash
//! - [`dump`] -- Text and Graphviz renderings for debugging

pub mod dump;
pub mod error;
pub mod hash;
pub mod passes;
pub mod pipeline;

pub use dump::{dump_graph, to_dot};
pub use error::CompileError;
pub use hash::compute_displacement_hash;
pub use passes::closure::num_closures;
pub use pipeline::{clean, compile, finalize, simplify};

use serde::{Deserialize, Serialize};
use shadergraph_core::GraphDiagnostic;

/// How far [`compile`] takes the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Proxy removal, expansion, cleaning and bump refinement.
    Simplify,
    /// Simplify, then bump from displacement and closure flattening.
    #[default]
    Finalize,
}

/// Options controlling the compilation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileOptions {
    pub stage: Stage,

    /// Derive a bumped shading normal from the displacement output.
    pub do_bump: bool,

    /// Evaluate that bump in object space instead of world space.
    pub bump_in_object_space: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            stage: Stage::Finalize,
            do_bump: true,
            bump_in_object_space: false,
        }
    }
}

/// Summary of a compiled graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileReport {
    pub node_count: usize,
    pub link_count: usize,

    /// Closure evaluation slots required at render time.
    pub num_closures: u32,

    /// Empty when the graph has no displacement.
    pub displacement_hash: String,

    /// Everything recorded on the graph, authoring and pipeline alike.
    pub diagnostics: Vec<GraphDiagnostic>,
}
