//! Graph rewriting passes, in the order the pipeline runs them.
//!
//! Every pass takes `&mut ShaderGraph` and leaves both link ends in sync.
//! Traversal state lives in per-pass [`NodeFlags`] indexed by node id.

pub mod bump;
pub mod closure;
pub mod cycles;
pub mod dedup;
pub mod defaults;
pub mod expand;
pub mod fold;
pub mod proxy;
pub mod volume;

use std::collections::VecDeque;

use shadergraph_core::{CoreError, NodeId, ShaderGraph};

/// Per-pass boolean flag per node id.
///
/// Sized from the graph's id counter and grown on demand, so nodes added
/// while the pass runs are handled too.
#[derive(Debug, Clone, Default)]
pub struct NodeFlags(Vec<bool>);

impl NodeFlags {
    pub fn new(graph: &ShaderGraph) -> Self {
        NodeFlags(vec![false; graph.id_bound()])
    }

    pub fn get(&self, id: NodeId) -> bool {
        self.0.get(id.index()).copied().unwrap_or(false)
    }

    pub fn set(&mut self, id: NodeId) {
        self.put(id, true);
    }

    pub fn clear(&mut self, id: NodeId) {
        self.put(id, false);
    }

    fn put(&mut self, id: NodeId, value: bool) {
        let index = id.index();
        if index >= self.0.len() {
            self.0.resize(index + 1, false);
        }
        self.0[index] = value;
    }
}

/// True when every linked input of `id` comes from a node marked `done`.
pub(crate) fn inputs_traversed(
    graph: &ShaderGraph,
    id: NodeId,
    done: &NodeFlags,
) -> Result<bool, CoreError> {
    Ok(graph
        .node(id)?
        .inputs()
        .iter()
        .filter_map(|input| input.link())
        .all(|upstream| done.get(upstream.node)))
}

/// Topological worklist shared by folding and deduplication.
///
/// Seeded with every node that has no linked input; consumers are scheduled
/// once all their producers are done. Nodes on a cycle are never reached.
pub(crate) struct Worklist {
    queue: VecDeque<NodeId>,
    pub done: NodeFlags,
    scheduled: NodeFlags,
}

impl Worklist {
    pub fn seed(graph: &ShaderGraph) -> Self {
        let mut worklist = Worklist {
            queue: VecDeque::new(),
            done: NodeFlags::new(graph),
            scheduled: NodeFlags::new(graph),
        };
        for node in graph.nodes() {
            if !node.has_linked_inputs() {
                worklist.push(node.id());
            }
        }
        worklist
    }

    /// Next node to process; it is marked done on the way out.
    pub fn pop(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        self.done.set(id);
        Some(id)
    }

    /// Schedules every consumer of `id` whose producers are all done.
    pub fn schedule_consumers(&mut self, graph: &ShaderGraph, id: NodeId) -> Result<(), CoreError> {
        for output in graph.node(id)?.outputs() {
            for input in output.links() {
                if !self.scheduled.get(input.node) && inputs_traversed(graph, input.node, &self.done)? {
                    self.push(input.node);
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, id: NodeId) {
        self.scheduled.set(id);
        self.queue.push_back(id);
    }
}
