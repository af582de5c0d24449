//! Pipeline orchestration: clean, simplify, finalize.

use shadergraph_core::{capability, topology, NodeId, SceneContext, ShaderGraph};

use crate::error::CompileError;
use crate::hash::compute_displacement_hash;
use crate::passes::{bump, closure, cycles, dedup, defaults, expand, fold, proxy, volume};
use crate::{CompileOptions, CompileReport, Stage};

/// Optimizes the graph in place.
///
/// 1. Constant fold
/// 2. Apply scene-dependent node settings
/// 3. Merge duplicate nodes
/// 4. Verify the volume output
/// 5. Break cycles reachable from the outputs
/// 6. Drop nodes no output depends on
pub fn clean(graph: &mut ShaderGraph, ctx: &SceneContext) -> Result<(), CompileError> {
    fold::constant_fold(graph)?;

    for id in graph.node_ids() {
        capability::simplify_settings(graph, id, ctx)?;
    }

    dedup::deduplicate_nodes(graph)?;
    volume::verify_volume_output(graph)?;

    let reachable = cycles::break_cycles(graph)?;
    cycles::remove_unreachable(graph, &reachable)?;

    if cfg!(debug_assertions) && !topology::is_acyclic(graph) {
        return Err(CompileError::InvalidGraph(
            "cycle survived cleaning".to_string(),
        ));
    }
    Ok(())
}

/// Rewrites the graph into its minimal executable form. Runs at most once
/// until the graph is modified again, and never on a finalized graph.
///
/// 1. Remove proxy nodes
/// 2. Expand high-level nodes
/// 3. Link default inputs to shared geometry sources
/// 4. Clean
/// 5. Refine user bump nodes into three-sample bumps
#[tracing::instrument(skip_all)]
pub fn simplify(graph: &mut ShaderGraph, ctx: &SceneContext) -> Result<(), CompileError> {
    if graph.is_simplified() || graph.is_finalized() {
        return Ok(());
    }
    let nodes_before = graph.node_count();

    proxy::remove_proxy_nodes(graph)?;
    expand::expand_nodes(graph)?;
    defaults::default_inputs(graph)?;
    clean(graph, ctx)?;
    bump::refine_bump_nodes(graph)?;

    graph.mark_simplified();
    tracing::debug!(nodes_before, nodes_after = graph.node_count(), "simplified");
    Ok(())
}

/// Prepares the graph for compilation to a kernel. Runs at most once; the
/// graph rejects new nodes afterwards.
///
/// 1. Simplify
/// 2. When `do_bump` is set, derive a bumped normal from displacement
/// 3. Flatten the surface closure tree, then the volume closure tree
#[tracing::instrument(skip(graph, ctx))]
pub fn finalize(
    graph: &mut ShaderGraph,
    ctx: &SceneContext,
    do_bump: bool,
    bump_in_object_space: bool,
) -> Result<(), CompileError> {
    if graph.is_finalized() {
        return Ok(());
    }

    simplify(graph, ctx)?;

    if do_bump {
        bump::bump_from_displacement(graph, bump_in_object_space)?;
    }

    for (socket, volume) in [("Surface", false), ("Volume", true)] {
        let input = graph.input_ref(NodeId::OUTPUT, socket)?;
        if let Some(root) = graph.link_of(input)? {
            closure::transform_multi_closure(graph, root.node, None, volume)?;
        }
    }

    graph.mark_finalized();
    tracing::debug!(
        nodes = graph.node_count(),
        closures = closure::num_closures(graph),
        "finalized"
    );
    Ok(())
}

/// Runs the pipeline up to `options.stage` and summarizes the result.
pub fn compile(
    graph: &mut ShaderGraph,
    ctx: &SceneContext,
    options: &CompileOptions,
) -> Result<CompileReport, CompileError> {
    match options.stage {
        Stage::Simplify => simplify(graph, ctx)?,
        Stage::Finalize => finalize(graph, ctx, options.do_bump, options.bump_in_object_space)?,
    }

    Ok(CompileReport {
        node_count: graph.node_count(),
        link_count: graph.link_count(),
        num_closures: closure::num_closures(graph),
        displacement_hash: compute_displacement_hash(graph)?,
        diagnostics: graph.diagnostics().to_vec(),
    })
}
