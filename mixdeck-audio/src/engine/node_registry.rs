use std::collections::BTreeMap;
use std::collections::HashMap;

use super::backend::NodeId;

/// Best-effort registry of graph nodes believed to be alive, with the kind of
/// owner that created them. `AudioSession::reset` asks it for `leaks`: any
/// node still registered after a full teardown was never released.
pub struct NodeRegistry {
    live_nodes: HashMap<NodeId, &'static str>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            live_nodes: HashMap::new(),
        }
    }

    /// Record that a node has been created, tagged with its owner.
    pub fn register(&mut self, node_id: NodeId, owner: &'static str) {
        self.live_nodes.insert(node_id, owner);
    }

    /// Record that a node has been freed (or is about to be freed).
    pub fn unregister(&mut self, node_id: NodeId) {
        self.live_nodes.remove(&node_id);
    }

    /// Number of nodes currently believed to be alive.
    pub fn live_count(&self) -> usize {
        self.live_nodes.len()
    }

    /// Number of live nodes registered by one owner.
    pub fn live_count_for(&self, owner: &str) -> usize {
        self.live_nodes.values().filter(|o| **o == owner).count()
    }

    /// Returns `true` if the node is believed to be alive.
    pub fn is_live(&self, node_id: NodeId) -> bool {
        self.live_nodes.contains_key(&node_id)
    }

    /// Live node counts per owner, leaving out `keep` (the owner whose
    /// nodes are expected to survive). Sorted by owner.
    pub fn leaks(&self, keep: &str) -> Vec<(&'static str, usize)> {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for owner in self.live_nodes.values().filter(|o| **o != keep) {
            *counts.entry(*owner).or_default() += 1;
        }
        counts.into_iter().collect()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
