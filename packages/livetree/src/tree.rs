//! Layer-tree construction and mutation processing.
//!
//! ```text
//! LiveDocument ──walk(valid elements)──▶ LayerMap
//!      │
//!      └─ take_records() ──▶ dedup temp ids ──▶ rebuild parent subtrees
//!                                               ──▶ WindowMutation{added, removed}
//! ```

use crate::document::{LiveDocument, MutationRecord, NodeId};
use crate::error::{LiveTreeError, Result};
use crate::ids::{IdGenerator, IdRegistry};
use std::collections::BTreeMap;
use tracing::{debug, trace};
use trellis_models::{
    LayerMap, LayerNode, StyleMap, DOM_ID_ATTRIBUTE, IGNORE_ATTRIBUTE, INSTANCE_ID_ATTRIBUTE,
    SOURCE_ID_ATTRIBUTE, TEMP_ID_ATTRIBUTE,
};

/// Tags that never appear in the layer tree.
const NON_VISUAL_TAGS: &[&str] = &[
    "head", "script", "style", "link", "meta", "title", "template", "noscript", "base",
];

pub const DEFAULT_TEXT_PREVIEW_LENGTH: usize = 100;

/// Layer subtrees rebuilt after one observation cycle, keyed by the dom id of
/// the parent whose children changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowMutation {
    pub added: BTreeMap<String, LayerMap>,
    pub removed: BTreeMap<String, LayerMap>,
}

impl WindowMutation {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A live document plus the identity bookkeeping for one preview surface.
#[derive(Debug, Clone)]
pub struct LiveTree {
    surface_id: String,
    doc: LiveDocument,
    registry: IdRegistry,
    ids: IdGenerator,
    text_preview_length: usize,
}

impl LiveTree {
    pub fn new(surface_id: impl Into<String>) -> Self {
        let surface_id = surface_id.into();
        Self {
            ids: IdGenerator::new(&surface_id),
            surface_id,
            doc: LiveDocument::new(),
            registry: IdRegistry::new(),
            text_preview_length: DEFAULT_TEXT_PREVIEW_LENGTH,
        }
    }

    pub fn with_text_preview_length(mut self, length: usize) -> Self {
        self.text_preview_length = length;
        self
    }

    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    pub fn document(&self) -> &LiveDocument {
        &self.doc
    }

    /// Direct access for host-driven re-renders. Changes made here show up
    /// in the next [`LiveTree::process_mutations`].
    pub fn document_mut(&mut self) -> &mut LiveDocument {
        &mut self.doc
    }

    pub fn registry(&self) -> &IdRegistry {
        &self.registry
    }

    /// Resolve an address to a node that is still attached.
    pub fn resolve(&self, dom_id: &str) -> Result<NodeId> {
        self.registry
            .get(dom_id)
            .filter(|node| self.doc.is_connected(*node))
            .ok_or_else(|| LiveTreeError::UnknownAddress(dom_id.to_string()))
    }

    pub fn dom_id_of(&self, node: NodeId) -> Option<&str> {
        self.registry.id_of(node)
    }

    /// Existing dom id for `node`, or a freshly generated one.
    pub fn ensure_dom_id(&mut self, node: NodeId) -> Result<String> {
        if let Some(existing) = self.registry.id_of(node) {
            return Ok(existing.to_string());
        }
        let dom_id = self.ids.new_id();
        self.bind(&dom_id, node)?;
        Ok(dom_id)
    }

    /// Give `node` a known dom id.
    pub fn bind(&mut self, dom_id: &str, node: NodeId) -> Result<()> {
        self.doc.set_attribute(node, DOM_ID_ATTRIBUTE, dom_id)?;
        if let Some(previous) = self.registry.assign(dom_id, node) {
            trace!(dom_id, ?previous, "dom id moved to a new node");
            self.doc.remove_attribute(previous, DOM_ID_ATTRIBUTE)?;
        }
        Ok(())
    }

    /// Elements that are rendered and editable.
    pub fn is_valid_element(&self, node: NodeId) -> bool {
        let Some(element) = self.doc.element(node) else {
            return false;
        };
        !NON_VISUAL_TAGS.contains(&element.tag_name.as_str())
            && !element.attributes.contains_key(IGNORE_ATTRIBUTE)
    }

    /// Visibility from the element's own attributes and styles, with
    /// `overrides` taking precedence over inline styles.
    pub fn is_visible(&self, node: NodeId, overrides: Option<&StyleMap>) -> bool {
        let Some(element) = self.doc.element(node) else {
            return false;
        };
        if element.attributes.contains_key("hidden") {
            return false;
        }
        let lookup = |key: &str| {
            overrides
                .and_then(|styles| styles.get(key))
                .or_else(|| element.styles.get(key))
                .map(|value| value.trim())
        };
        !(lookup("display") == Some("none") || lookup("visibility") == Some("hidden"))
    }

    /// Build the layer map for the whole body.
    pub fn build_layer_map(
        &mut self,
        overrides: &dyn Fn(&str) -> Option<StyleMap>,
    ) -> Result<(String, LayerMap)> {
        let body = self.doc.body();
        self.build_layer_map_from(body, overrides)
    }

    /// Build the layer map for the subtree rooted at `root`.
    ///
    /// Elements failing [`LiveTree::is_valid_element`] are skipped but their
    /// descendants are still visited, so the visit order is not contiguous.
    /// A stack of current ancestors is popped until its top contains the
    /// next visited element.
    pub fn build_layer_map_from(
        &mut self,
        root: NodeId,
        overrides: &dyn Fn(&str) -> Option<StyleMap>,
    ) -> Result<(String, LayerMap)> {
        let root_id = self.ensure_dom_id(root)?;
        let mut layers = LayerMap::new();
        let mut ancestors: Vec<(NodeId, String)> = Vec::new();

        for node in self.doc.descendants(root) {
            if node != root && !self.is_valid_element(node) {
                continue;
            }

            while let Some((top, _)) = ancestors.last() {
                if self.doc.contains(*top, node) {
                    break;
                }
                ancestors.pop();
            }

            let dom_id = self.ensure_dom_id(node)?;
            let parent = ancestors.last().map(|(_, id)| id.clone());
            let layer = self.layer_node(node, &dom_id, parent.clone(), overrides);
            if let Some(parent) = parent {
                if let Some(parent_layer) = layers.get_mut(&parent) {
                    parent_layer.children.push(dom_id.clone());
                }
            }
            layers.insert(dom_id.clone(), layer);
            ancestors.push((node, dom_id));
        }

        Ok((root_id, layers))
    }

    fn layer_node(
        &self,
        node: NodeId,
        dom_id: &str,
        parent: Option<String>,
        overrides: &dyn Fn(&str) -> Option<StyleMap>,
    ) -> LayerNode {
        let style_overrides = overrides(dom_id);
        let text: String = self
            .doc
            .own_text(node)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(self.text_preview_length)
            .collect();

        LayerNode {
            dom_id: dom_id.to_string(),
            surface_id: self.surface_id.clone(),
            tag_name: self.doc.tag_name(node).unwrap_or_default().to_string(),
            is_visible: self.is_visible(node, style_overrides.as_ref()),
            text_content: text,
            oid: self.doc.attribute(node, SOURCE_ID_ATTRIBUTE).map(str::to_string),
            instance_id: self
                .doc
                .attribute(node, INSTANCE_ID_ATTRIBUTE)
                .map(str::to_string),
            parent,
            children: Vec::new(),
        }
    }

    /// Drain pending mutation records and rebuild the affected subtrees.
    pub fn process_mutations(
        &mut self,
        overrides: &dyn Fn(&str) -> Option<StyleMap>,
    ) -> Result<WindowMutation> {
        let records = self.doc.take_records();
        let mut mutation = WindowMutation::default();
        let mut detached: Vec<NodeId> = Vec::new();

        for MutationRecord {
            target,
            added,
            removed,
        } in records
        {
            detached.extend(removed.iter().copied());
            let added: Vec<NodeId> = added
                .into_iter()
                .filter(|node| self.is_tracked(*node))
                .collect();
            let removed: Vec<NodeId> = removed
                .into_iter()
                .filter(|node| self.is_tracked(*node))
                .collect();

            for node in &added {
                if let Some(stale) = self.dedup_temp_id(*node)? {
                    detached.push(stale);
                }
            }
            for node in &removed {
                self.forget_detached(*node);
            }

            if !self.doc.is_connected(target) {
                trace!(?target, "mutation target no longer attached");
                continue;
            }
            if !added.is_empty() {
                let (parent_id, layers) = self.build_layer_map_from(target, overrides)?;
                mutation.added.insert(parent_id, layers);
            }
            if !removed.is_empty() {
                let (parent_id, layers) = self.build_layer_map_from(target, overrides)?;
                mutation.removed.insert(parent_id, layers);
            }
        }

        // Records are produced by the dedup step itself; they describe
        // detaching stale copies and carry nothing new.
        self.doc.take_records();
        self.release_detached(detached);
        Ok(mutation)
    }

    /// Free subtrees that ended this cycle outside the document. Nodes that
    /// were moved, or detached and re-attached, are left alone.
    fn release_detached(&mut self, candidates: Vec<NodeId>) {
        for node in candidates {
            if self.doc.is_connected(node) {
                continue;
            }
            // A candidate nested inside another detached candidate goes
            // with its top-most detached ancestor.
            let mut top = node;
            while let Some(parent) = self.doc.parent(top) {
                top = parent;
            }
            let released = self.doc.release(top);
            for freed in &released {
                self.registry.unregister(*freed);
            }
            if !released.is_empty() {
                trace!(count = released.len(), "released detached nodes");
            }
        }
    }

    fn is_tracked(&self, node: NodeId) -> bool {
        self.doc.is_element(node) && self.doc.attribute(node, IGNORE_ATTRIBUTE).is_none()
    }

    /// An element re-rendered from source may carry the temp id of an element
    /// the editor inserted earlier. The stale copy is detached and the id
    /// moves to the new node. Returns the detached stale copy.
    fn dedup_temp_id(&mut self, node: NodeId) -> Result<Option<NodeId>> {
        let Some(temp_id) = self.doc.attribute(node, TEMP_ID_ATTRIBUTE).map(str::to_string) else {
            return Ok(None);
        };

        let stale = self.registry.get(&temp_id).filter(|stale| *stale != node);
        if let Some(stale) = stale {
            debug!(dom_id = %temp_id, "removing stale copy of inserted element");
            self.doc.remove(stale)?;
            for detached in self.doc.descendants(stale) {
                self.registry.unregister(detached);
            }
        }

        self.bind(&temp_id, node)?;
        self.doc.remove_attribute(node, TEMP_ID_ATTRIBUTE)?;
        Ok(stale)
    }

    fn forget_detached(&mut self, node: NodeId) {
        if self.doc.is_connected(node) {
            // Moved rather than removed.
            return;
        }
        for detached in self.doc.descendants(node) {
            if let Some(dom_id) = self.registry.unregister(detached) {
                trace!(dom_id = %dom_id, "unregistered detached element");
            }
        }
    }
}
