use crate::document::NodeId;
use crc32fast::Hasher;
use std::collections::HashMap;

/// Seed derived from a surface id using CRC32.
pub fn get_surface_seed(surface_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(surface_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential dom id generator for one preview surface.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(surface_id: &str) -> Self {
        Self {
            seed: get_surface_seed(surface_id),
            count: 0,
        }
    }

    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

/// Two-way map between dom ids and live nodes.
///
/// This is the only lookup path from an address to a node; attributes are
/// written for styling but never scanned.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    by_id: HashMap<String, NodeId>,
    by_node: HashMap<NodeId, String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dom_id: &str) -> Option<NodeId> {
        self.by_id.get(dom_id).copied()
    }

    pub fn id_of(&self, node: NodeId) -> Option<&str> {
        self.by_node.get(&node).map(String::as_str)
    }

    /// Bind `dom_id` to `node`, dropping whatever either side held before.
    /// Returns the node that previously held `dom_id`, if it was another one.
    pub fn assign(&mut self, dom_id: &str, node: NodeId) -> Option<NodeId> {
        if let Some(old_id) = self.by_node.remove(&node) {
            self.by_id.remove(&old_id);
        }
        let previous = self.by_id.insert(dom_id.to_string(), node);
        if let Some(previous) = previous {
            self.by_node.remove(&previous);
        }
        self.by_node.insert(node, dom_id.to_string());
        previous.filter(|p| *p != node)
    }

    pub fn unregister(&mut self, node: NodeId) -> Option<String> {
        let dom_id = self.by_node.remove(&node)?;
        self.by_id.remove(&dom_id);
        Some(dom_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
