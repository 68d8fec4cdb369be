//! Arena-backed live document.
//!
//! Nodes are addressed by generational [`NodeId`]s. Detaching a node only
//! clears its parent link; [`LiveDocument::release`] frees a detached subtree
//! and its slots are reused. A released id never resolves again, even once
//! its slot holds a new node. Parent/child links are indices into the arena,
//! so there are no reference cycles to manage.
//!
//! Every child-list change is recorded as a [`MutationRecord`] until drained
//! with [`LiveDocument::take_records`], mirroring a childList observer on the
//! document root.

use crate::error::{LiveTreeError, Result};
use std::collections::BTreeMap;
use trellis_models::StyleMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag_name: String,
    pub attributes: BTreeMap<String, String>,
    /// Inline style, keyed by internal style key.
    pub styles: StyleMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// One childList change under `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct LiveDocument {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    records: Vec<MutationRecord>,
}

impl Default for LiveDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveDocument {
    /// An empty `<html><head/><body/></html>` document.
    pub fn new() -> Self {
        let placeholder = NodeId {
            index: 0,
            generation: 0,
        };
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: placeholder,
            head: placeholder,
            body: placeholder,
            records: Vec::new(),
        };
        let root = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.attach(root, head, None);
        doc.attach(root, body, None);
        doc.root = root;
        doc.head = head;
        doc.body = body;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            styles: StyleMap::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(LiveTreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id).ok_or(LiveTreeError::UnknownNode(id))
    }

    /// True while `id` refers to a node that has not been released.
    pub fn exists(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live (unreleased) nodes.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Free a detached node and its whole subtree. Returns the released ids,
    /// or an empty list when `id` is still attached, is the document root or
    /// was already released.
    pub fn release(&mut self, id: NodeId) -> Vec<NodeId> {
        let releasable = id != self.root
            && self.get(id).map(|node| node.parent.is_none()).unwrap_or(false);
        if !releasable {
            return Vec::new();
        }

        let released = self.descendants(id);
        for node in &released {
            if let Some(slot) = self.slots.get_mut(node.index) {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(node.index);
            }
        }
        released
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.get(id).map(|node| &node.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(element) => Ok(element),
            NodeData::Text(_) => Err(LiveTreeError::NotAnElement(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag_name.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|element| element.attributes.get(name))
            .map(String::as_str)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.element_mut(id)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.element_mut(id)?.attributes.remove(name))
    }

    pub fn set_inline_style(&mut self, id: NodeId, key: &str, value: &str) -> Result<()> {
        let styles = &mut self.element_mut(id)?.styles;
        if value.is_empty() {
            styles.remove(key);
        } else {
            styles.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Children that are elements, in order.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Position of `child` among its parent's element children.
    pub fn element_index(&self, child: NodeId) -> Option<usize> {
        let parent = self.parent(child)?;
        self.element_children(parent)
            .iter()
            .position(|sibling| *sibling == child)
    }

    /// True if `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// True if `id` is attached under the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Insert `child` at raw child position `index` (clamped). A child that
    /// is already attached elsewhere is moved.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.element_mut(parent)?;
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(LiveTreeError::Cycle { parent, child });
        }

        self.detach(child)?;
        let index = index.min(self.children(parent).len());
        self.attach(parent, child, Some(index));
        self.records.push(MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Insert `child` so that it ends up at `index` among the element
    /// children of `parent` (clamped to the end).
    pub fn insert_element_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        let siblings: Vec<NodeId> = self
            .element_children(parent)
            .into_iter()
            .filter(|sibling| *sibling != child)
            .collect();
        let raw = match siblings.get(index) {
            Some(before) => {
                let before = *before;
                // Position after detaching `child` from the same parent.
                self.children(parent)
                    .iter()
                    .filter(|c| **c != child)
                    .position(|c| *c == before)
                    .unwrap_or(usize::MAX)
            }
            None => usize::MAX,
        };
        self.insert_child(parent, raw, child)
    }

    /// Detach `child` from its parent, recording the removal.
    pub fn remove(&mut self, child: NodeId) -> Result<()> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        self.detach(child)?;
        self.records.push(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![child],
        });
        Ok(())
    }

    /// Replace all children of `id` with a single text node. A lone text
    /// child is rewritten in place, which is a character data change and
    /// records no childList mutation.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.element_mut(id)?;
        if !text.is_empty() {
            if let [only] = self.node(id)?.children.as_slice() {
                let only = *only;
                if let NodeData::Text(value) = &mut self.node_mut(only)?.data {
                    value.clear();
                    value.push_str(text);
                    return Ok(());
                }
            }
        }

        let removed = std::mem::take(&mut self.node_mut(id)?.children);
        for child in &removed {
            if let Some(node) = self.get_mut(*child) {
                node.parent = None;
            }
        }

        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.attach(id, text_node, None);
            added.push(text_node);
        }

        if !(added.is_empty() && removed.is_empty()) {
            self.records.push(MutationRecord {
                target: id,
                added,
                removed,
            });
        }
        Ok(())
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        for node in self.descendants(id) {
            if let Some(NodeData::Text(value)) = self.data(node) {
                text.push_str(value);
            }
        }
        text
    }

    /// Text held directly by `id`, ignoring nested elements.
    pub fn own_text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|child| match self.data(*child) {
                Some(NodeData::Text(value)) => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// `id` and everything below it in document order. Uses an explicit
    /// stack so deep trees do not grow the call stack.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        order
    }

    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn has_pending_records(&self) -> bool {
        !self.records.is_empty()
    }

    fn detach(&mut self, child: NodeId) -> Result<()> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        let node = self.node_mut(parent)?;
        node.children.retain(|c| *c != child);
        self.node_mut(child)?.parent = None;
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Some(node) = self.get_mut(parent) {
            match index {
                Some(index) => node.children.insert(index.min(node.children.len()), child),
                None => node.children.push(child),
            }
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn div(doc: &mut LiveDocument, parent: NodeId) -> NodeId {
        let id = doc.create_element("div");
        doc.append_child(parent, id).unwrap();
        id
    }

    #[test]
    fn test_document_shape() {
        let doc = LiveDocument::new();
        assert_eq!(doc.tag_name(doc.root()), Some("html"));
        assert_eq!(doc.children(doc.root()), &[doc.head(), doc.body()]);
        assert!(doc.is_connected(doc.body()));
    }

    #[test]
    fn test_insert_records_mutation() {
        let mut doc = LiveDocument::new();
        let body = doc.body();
        let a = div(&mut doc, body);

        let records = doc.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, body);
        assert_eq!(records[0].added, vec![a]);
        assert!(!doc.has_pending_records());
    }

    #[test]
    fn test_move_between_parents() {
        let mut doc = LiveDocument::new();
        let body = doc.body();
        let a = div(&mut doc, body);
        let b = div(&mut doc, body);
        let c = div(&mut doc, a);

        doc.append_child(b, c).unwrap();
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.parent(c), Some(b));
        assert!(doc.contains(body, c));
        assert!(!doc.contains(a, c));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut doc = LiveDocument::new();
        let body = doc.body();
        let a = div(&mut doc, body);
        let b = div(&mut doc, a);

        assert_eq!(
            doc.append_child(b, a),
            Err(LiveTreeError::Cycle {
                parent: b,
                child: a
            })
        );
    }

    #[test]
    fn test_element_index_ignores_text() {
        let mut doc = LiveDocument::new();
        let body = doc.body();
        let text = doc.create_text("hello");
        doc.append_child(body, text).unwrap();
        let a = div(&mut doc, body);
        let b = div(&mut doc, body);

        assert_eq!(doc.element_index(a), Some(0));
        assert_eq!(doc.element_index(b), Some(1));

        doc.insert_element_at(body, 0, b).unwrap();
        assert_eq!(doc.element_children(body), vec![b, a]);

        doc.insert_element_at(body, 5, b).unwrap();
        assert_eq!(doc.element_children(body), vec![a, b]);
    }

    #[test]
    fn test_text_content() {
        let mut doc = LiveDocument::new();
        let body = doc.body();
        let p = div(&mut doc, body);
        doc.set_text_content(p, "hi ").unwrap();
        let span = div(&mut doc, p);
        doc.set_text_content(span, "there").unwrap();

        assert_eq!(doc.text_content(p), "hi there");
        assert_eq!(doc.own_text(p), "hi ");
    }

    #[test]
    fn test_set_text_content_rewrites_lone_text_node() {
        let mut doc = LiveDocument::new();
        let body = doc.body();
        let p = div(&mut doc, body);
        doc.set_text_content(p, "one").unwrap();
        doc.take_records();
        let text = doc.children(p)[0];

        doc.set_text_content(p, "two").unwrap();
        assert_eq!(doc.children(p), &[text]);
        assert_eq!(doc.text_content(p), "two");
        assert!(!doc.has_pending_records());

        doc.set_text_content(p, "").unwrap();
        assert!(doc.children(p).is_empty());
        assert_eq!(doc.take_records()[0].removed, vec![text]);
    }

    #[test]
    fn test_release_frees_detached_subtree() {
        let mut doc = LiveDocument::new();
        let body = doc.body();
        let a = div(&mut doc, body);
        let a1 = div(&mut doc, a);
        let count = doc.node_count();

        assert!(doc.release(a).is_empty(), "attached nodes stay");
        assert!(doc.release(doc.root()).is_empty());

        doc.remove(a).unwrap();
        assert_eq!(doc.release(a), vec![a, a1]);
        assert_eq!(doc.node_count(), count - 2);
        assert!(!doc.exists(a));
        assert!(doc.release(a).is_empty());
    }

    #[test]
    fn test_released_ids_do_not_alias_reused_slots() {
        let mut doc = LiveDocument::new();
        let body = doc.body();
        let a = div(&mut doc, body);
        doc.remove(a).unwrap();
        doc.release(a);

        let b = div(&mut doc, body);
        assert_ne!(a, b);
        assert!(doc.exists(b));
        assert_eq!(doc.tag_name(a), None);
        assert_eq!(doc.parent(a), None);
        assert_eq!(doc.append_child(body, a), Err(LiveTreeError::UnknownNode(a)));
    }

    #[test]
    fn test_descendants_document_order() {
        let mut doc = LiveDocument::new();
        let body = doc.body();
        let a = div(&mut doc, body);
        let a1 = div(&mut doc, a);
        let b = div(&mut doc, body);

        assert_eq!(doc.descendants(body), vec![body, a, a1, b]);
    }
}
