//! Graph-level plumbing shared by every part of the audio session: the
//! backend abstraction, node id allocation and the live-node registry.

pub mod backend;
pub mod node_registry;

pub use backend::{
    AudioBackend, AudioParam, BackendError, BackendResult, BufferId, NodeId, NodeKind,
    NullBackend, SharedTestBackend, SinkId, SourcePlayback, TestBackend, TestOp, DESTINATION,
};
pub use node_registry::NodeRegistry;

/// First id handed out. Ids below are reserved (0 is the hardware destination).
const FIRST_NODE_ID: i32 = 1000;

/// Allocates node, buffer and sink ids for one audio session.
/// Ids are never reused within a session.
#[derive(Debug)]
pub struct NodeAllocator {
    next_node_id: NodeId,
    next_bufnum: BufferId,
}

impl NodeAllocator {
    pub fn new() -> Self {
        Self {
            next_node_id: FIRST_NODE_ID,
            next_bufnum: 0,
        }
    }

    pub fn node(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }

    /// Sinks share the node id space.
    pub fn sink(&mut self) -> SinkId {
        self.node()
    }

    pub fn buffer(&mut self) -> BufferId {
        let id = self.next_bufnum;
        self.next_bufnum += 1;
        id
    }
}

impl Default for NodeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything graph builders need: the backend, id allocation and the
/// registry. Borrowed mutably for the duration of one build or teardown.
pub struct GraphContext<'a> {
    pub backend: &'a dyn AudioBackend,
    pub alloc: &'a mut NodeAllocator,
    pub registry: &'a mut NodeRegistry,
}

impl<'a> GraphContext<'a> {
    /// Allocate, create and register a node.
    pub fn create(&mut self, kind: NodeKind, owner: &'static str) -> BackendResult<NodeId> {
        let id = self.alloc.node();
        self.backend.create_node(id, kind)?;
        self.registry.register(id, owner);
        Ok(id)
    }

    /// Disconnect and free a node, swallowing backend errors.
    pub fn release(&mut self, node_id: NodeId) {
        let _ = self.backend.disconnect(node_id);
        let _ = self.backend.free_node(node_id);
        self.registry.unregister(node_id);
    }
}
