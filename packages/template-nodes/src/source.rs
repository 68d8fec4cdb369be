//! Collaborators that know about source code.

use async_trait::async_trait;
use std::collections::HashMap;
use trellis_models::TemplateNode;

/// Looks up the template node declared by a source id marker.
#[async_trait]
pub trait TemplateNodeSource: Send + Sync {
    async fn template_node(&self, oid: &str) -> Option<TemplateNode>;
}

/// Finds the call site of `child` as the `index`th occurrence of its marker
/// inside the component that declares `parent`.
///
/// `None` means `child` is not instantiated from inside `parent` (it is the
/// component's own root, for example) and the search moves one level up.
#[async_trait]
pub trait InstanceResolver: Send + Sync {
    async fn resolve_instance(
        &self,
        parent: &TemplateNode,
        child: &TemplateNode,
        index: usize,
    ) -> Option<TemplateNode>;
}

/// Template nodes held in memory, keyed by oid.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateSource {
    nodes: HashMap<String, TemplateNode>,
}

impl InMemoryTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: TemplateNode) {
        self.nodes.insert(node.oid.clone(), node);
    }
}

impl FromIterator<TemplateNode> for InMemoryTemplateSource {
    fn from_iter<I: IntoIterator<Item = TemplateNode>>(iter: I) -> Self {
        let mut source = Self::new();
        for node in iter {
            source.insert(node);
        }
        source
    }
}

#[async_trait]
impl TemplateNodeSource for InMemoryTemplateSource {
    async fn template_node(&self, oid: &str) -> Option<TemplateNode> {
        self.nodes.get(oid).cloned()
    }
}

/// Instance table keyed by `(parent oid, child oid, index)`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInstanceResolver {
    instances: HashMap<(String, String, usize), TemplateNode>,
}

impl InMemoryInstanceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        parent_oid: impl Into<String>,
        child_oid: impl Into<String>,
        index: usize,
        instance: TemplateNode,
    ) {
        self.instances
            .insert((parent_oid.into(), child_oid.into(), index), instance);
    }
}

#[async_trait]
impl InstanceResolver for InMemoryInstanceResolver {
    async fn resolve_instance(
        &self,
        parent: &TemplateNode,
        child: &TemplateNode,
        index: usize,
    ) -> Option<TemplateNode> {
        self.instances
            .get(&(parent.oid.clone(), child.oid.clone(), index))
            .cloned()
    }
}
