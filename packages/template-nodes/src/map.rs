use crate::error::{Result, TemplateNodeError};
use crate::source::{InstanceResolver, TemplateNodeSource};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};
use trellis_models::{LayerMap, LayerNode, TemplateNode};

#[derive(Debug, Default)]
struct SurfaceNodes {
    layers: LayerMap,
    roots: HashMap<String, TemplateNode>,
    /// `None` records a resolution that found no instance, so it is not
    /// retried.
    instances: HashMap<String, Option<TemplateNode>>,
}

/// Maps element addresses of each preview surface to template nodes.
///
/// The state lock is never held across a call into the source or the
/// resolver; results are computed from a snapshot and written back after.
pub struct TemplateNodeMap {
    source: Arc<dyn TemplateNodeSource>,
    resolver: Arc<dyn InstanceResolver>,
    surfaces: RwLock<HashMap<String, SurfaceNodes>>,
}

impl TemplateNodeMap {
    pub fn new(source: Arc<dyn TemplateNodeSource>, resolver: Arc<dyn InstanceResolver>) -> Self {
        Self {
            source,
            resolver,
            surfaces: RwLock::new(HashMap::new()),
        }
    }

    /// Replace everything known about `surface_id` and map the whole tree.
    pub async fn set_layer_map(&self, surface_id: &str, layers: LayerMap) {
        let roots: Vec<String> = layers
            .values()
            .filter(|layer| layer.parent.is_none())
            .map(|layer| layer.dom_id.clone())
            .collect();

        self.surfaces.write().await.insert(
            surface_id.to_string(),
            SurfaceNodes {
                layers,
                ..Default::default()
            },
        );

        for root in roots {
            self.process_subtree(surface_id, &root).await;
        }
    }

    /// Merge a rebuilt subtree rooted at `parent_id`. Mappings for addresses
    /// that were under the old subtree are dropped before the new one is
    /// mapped.
    pub async fn update_layer_map(&self, surface_id: &str, parent_id: &str, layers: LayerMap) {
        {
            let mut surfaces = self.surfaces.write().await;
            let nodes = surfaces.entry(surface_id.to_string()).or_default();

            let stale = subtree(&nodes.layers, parent_id);
            for address in &stale {
                nodes.roots.remove(address);
                nodes.instances.remove(address);
                if address != parent_id {
                    nodes.layers.remove(address);
                }
            }

            // The rebuilt parent does not know its own parent; keep the link.
            let outer_parent = nodes
                .layers
                .get(parent_id)
                .and_then(|layer| layer.parent.clone());
            nodes.layers.extend(layers);
            if let Some(parent) = nodes.layers.get_mut(parent_id) {
                if parent.parent.is_none() {
                    parent.parent = outer_parent;
                }
            }
            trace!(surface_id, parent_id, dropped = stale.len(), "layer subtree replaced");
        }

        self.process_subtree(surface_id, parent_id).await;
    }

    /// Forget `address` and everything below it.
    pub async fn remove_address(&self, surface_id: &str, address: &str) {
        let mut surfaces = self.surfaces.write().await;
        let Some(nodes) = surfaces.get_mut(surface_id) else {
            return;
        };
        for stale in subtree(&nodes.layers, address) {
            nodes.roots.remove(&stale);
            nodes.instances.remove(&stale);
            nodes.layers.remove(&stale);
        }
    }

    /// Forget a deregistered surface entirely.
    pub async fn remove_surface(&self, surface_id: &str) {
        if self.surfaces.write().await.remove(surface_id).is_some() {
            debug!(surface_id, "template nodes cleared");
        }
    }

    pub async fn get_root(&self, surface_id: &str, address: &str) -> Option<TemplateNode> {
        let surfaces = self.surfaces.read().await;
        surfaces.get(surface_id)?.roots.get(address).cloned()
    }

    pub async fn get_instance(&self, surface_id: &str, address: &str) -> Option<TemplateNode> {
        let surfaces = self.surfaces.read().await;
        surfaces.get(surface_id)?.instances.get(address).cloned().flatten()
    }

    /// Instance mapping if there is one, otherwise the root mapping.
    pub async fn get_any(&self, surface_id: &str, address: &str) -> Option<TemplateNode> {
        let surfaces = self.surfaces.read().await;
        let nodes = surfaces.get(surface_id)?;
        nodes
            .instances
            .get(address)
            .cloned()
            .flatten()
            .or_else(|| nodes.roots.get(address).cloned())
    }

    pub async fn layer(&self, surface_id: &str, address: &str) -> Option<LayerNode> {
        let surfaces = self.surfaces.read().await;
        surfaces.get(surface_id)?.layers.get(address).cloned()
    }

    /// Instance for `address`, resolving it now if it has not been yet.
    /// A cached answer (including "none") is returned without calling the
    /// resolver again.
    pub async fn resolve_instance(
        &self,
        surface_id: &str,
        address: &str,
    ) -> Result<Option<TemplateNode>> {
        let (layers, mut roots) = {
            let surfaces = self.surfaces.read().await;
            let nodes = surfaces
                .get(surface_id)
                .ok_or_else(|| TemplateNodeError::UnknownSurface(surface_id.to_string()))?;
            if let Some(cached) = nodes.instances.get(address) {
                return Ok(cached.clone());
            }
            if !nodes.layers.contains_key(address) {
                return Err(TemplateNodeError::UnknownAddress {
                    surface_id: surface_id.to_string(),
                    address: address.to_string(),
                });
            }
            (nodes.layers.clone(), nodes.roots.clone())
        };

        let instance = self.find_instance(&layers, &mut roots, address).await;
        let mut surfaces = self.surfaces.write().await;
        if let Some(nodes) = surfaces.get_mut(surface_id) {
            nodes.roots.extend(roots);
            nodes
                .instances
                .entry(address.to_string())
                .or_insert_with(|| instance.clone());
        }
        Ok(instance)
    }

    /// Map every element under `root_id` to its root template node, then
    /// resolve instances for the ones that have not been resolved yet.
    async fn process_subtree(&self, surface_id: &str, root_id: &str) {
        let (layers, mut roots, resolved) = {
            let surfaces = self.surfaces.read().await;
            let Some(nodes) = surfaces.get(surface_id) else {
                return;
            };
            let resolved: HashSet<String> = nodes.instances.keys().cloned().collect();
            (nodes.layers.clone(), nodes.roots.clone(), resolved)
        };

        let order = subtree(&layers, root_id);
        for address in &order {
            let Some(oid) = layers.get(address).and_then(|layer| layer.oid.as_deref()) else {
                continue;
            };
            match self.source.template_node(oid).await {
                Some(node) => {
                    roots.insert(address.clone(), node);
                }
                None => {
                    warn!(surface_id, address = %address, oid, "no template node for source id")
                }
            }
        }

        let mut instances = HashMap::new();
        for address in &order {
            if resolved.contains(address) || !roots.contains_key(address) {
                continue;
            }
            let instance = self.find_instance(&layers, &mut roots, address).await;
            instances.insert(address.clone(), instance);
        }

        let mut surfaces = self.surfaces.write().await;
        let Some(nodes) = surfaces.get_mut(surface_id) else {
            trace!(surface_id, "surface removed while mapping");
            return;
        };
        nodes.roots.extend(roots);
        for (address, instance) in instances {
            nodes.instances.entry(address).or_insert(instance);
        }
        debug!(surface_id, root_id, mapped = order.len(), "template nodes mapped");
    }

    /// Walk up from `address` looking for the first ancestor in a different
    /// component, then ask the resolver for the matching call site. If the
    /// resolver has nothing, continue from that ancestor. Stops at `<body>`,
    /// or at an ancestor with no template node.
    async fn find_instance(
        &self,
        layers: &LayerMap,
        roots: &mut HashMap<String, TemplateNode>,
        address: &str,
    ) -> Option<TemplateNode> {
        let original = layers.get(address)?;
        let template = roots.get(address)?.clone();
        let mut current = original;

        loop {
            if current.tag_name == "body" {
                return None;
            }
            let parent_id = current.parent.as_deref()?;
            let parent = layers.get(parent_id)?;
            let parent_template = self.root_for(roots, parent).await?;

            if parent_template.component != template.component {
                let index = occurrence_index(layers, parent_id, original);
                if let Some(instance) = self
                    .resolver
                    .resolve_instance(&parent_template, &template, index)
                    .await
                {
                    trace!(address, instance = %instance.oid, index, "resolved instance");
                    return Some(instance);
                }
            }
            current = parent;
        }
    }

    async fn root_for(
        &self,
        roots: &mut HashMap<String, TemplateNode>,
        layer: &LayerNode,
    ) -> Option<TemplateNode> {
        if let Some(known) = roots.get(&layer.dom_id) {
            return Some(known.clone());
        }
        let node = self.source.template_node(layer.oid.as_deref()?).await?;
        roots.insert(layer.dom_id.clone(), node.clone());
        Some(node)
    }
}

/// `root_id` and every address below it, in document order.
fn subtree(layers: &LayerMap, root_id: &str) -> Vec<String> {
    let mut order = Vec::new();
    let mut stack = vec![root_id.to_string()];
    while let Some(address) = stack.pop() {
        if let Some(layer) = layers.get(&address) {
            stack.extend(layer.children.iter().rev().cloned());
            order.push(address);
        }
    }
    order
}

/// Position of `element` among the elements under `ancestor_id` that carry
/// the same source id.
fn occurrence_index(layers: &LayerMap, ancestor_id: &str, element: &LayerNode) -> usize {
    subtree(layers, ancestor_id)
        .iter()
        .filter_map(|address| layers.get(address))
        .filter(|layer| layer.oid.is_some() && layer.oid == element.oid)
        .position(|layer| layer.dom_id == element.dom_id)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(
        dom_id: &str,
        oid: Option<&str>,
        parent: Option<&str>,
        children: &[&str],
    ) -> LayerNode {
        LayerNode {
            dom_id: dom_id.into(),
            surface_id: "frame".into(),
            tag_name: if parent.is_none() { "body".into() } else { "div".into() },
            is_visible: true,
            text_content: String::new(),
            oid: oid.map(str::to_string),
            instance_id: None,
            parent: parent.map(str::to_string),
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn map(layers: Vec<LayerNode>) -> LayerMap {
        layers.into_iter().map(|l| (l.dom_id.clone(), l)).collect()
    }

    #[test]
    fn test_subtree_order() {
        let layers = map(vec![
            layer("body", None, None, &["a", "b"]),
            layer("a", None, Some("body"), &["a1"]),
            layer("a1", None, Some("a"), &[]),
            layer("b", None, Some("body"), &[]),
        ]);
        assert_eq!(subtree(&layers, "body"), vec!["body", "a", "a1", "b"]);
        assert_eq!(subtree(&layers, "a"), vec!["a", "a1"]);
        assert!(subtree(&layers, "missing").is_empty());
    }

    #[test]
    fn test_occurrence_index_counts_same_oid_only() {
        let layers = map(vec![
            layer("body", None, None, &["card1", "other", "card2"]),
            layer("card1", Some("card"), Some("body"), &[]),
            layer("other", Some("x"), Some("body"), &[]),
            layer("card2", Some("card"), Some("body"), &[]),
        ]);
        assert_eq!(occurrence_index(&layers, "body", &layers["card1"]), 0);
        assert_eq!(occurrence_index(&layers, "body", &layers["card2"]), 1);
    }
}
