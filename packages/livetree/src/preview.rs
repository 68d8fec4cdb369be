//! In-process preview surface.
//!
//! [`LivePreview`] answers the same requests a rendering host would: style
//! overrides go to the surface's [`StylesheetManager`], structural edits go to
//! the live document, and every change is followed by a mutation pass whose
//! results are published as [`PreviewEvent`]s.

use crate::document::NodeId;
use crate::error::{LiveTreeError, Result};
use crate::tree::{LiveTree, WindowMutation};
use tokio::sync::mpsc;
use tracing::debug;
use trellis_models::{
    ActionElement, ActionLocation, ActionTarget, DomElement, ImageContent, InsertPosition,
    LayerMap, StyleMap, TextDomElement, SOURCE_ID_ATTRIBUTE,
};
use trellis_stylesheet::StylesheetManager;

/// Notifications from the surface to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEvent {
    DomReady { layers: LayerMap },
    WindowMutated(WindowMutation),
    ElementInserted(DomUpdate),
    ElementRemoved(DomUpdate),
    ElementMoved(DomUpdate),
    ElementGrouped(DomUpdate),
    ElementUngrouped(DomUpdate),
    ElementTextEdited(TextDomElement),
}

/// Result of a structural edit: the element involved plus the rebuilt layer
/// subtree of its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomUpdate {
    pub element: DomElement,
    pub parent_id: String,
    pub layers: LayerMap,
}

pub struct LivePreview {
    tree: LiveTree,
    stylesheet: StylesheetManager,
    style_node: NodeId,
    subscribers: Vec<mpsc::UnboundedSender<PreviewEvent>>,
}

impl LivePreview {
    pub fn new(surface_id: impl Into<String>) -> Self {
        Self::with_tree(LiveTree::new(surface_id))
    }

    pub fn with_tree(mut tree: LiveTree) -> Self {
        let doc = tree.document_mut();
        let style_node = doc.create_element("style");
        let head = doc.head();
        // The head always accepts element children.
        let _ = doc.append_child(head, style_node);
        doc.take_records();

        Self {
            tree,
            stylesheet: StylesheetManager::new(),
            style_node,
            subscribers: Vec::new(),
        }
    }

    pub fn surface_id(&self) -> &str {
        self.tree.surface_id()
    }

    pub fn tree(&self) -> &LiveTree {
        &self.tree
    }

    /// Mutable access for simulating host re-renders; call
    /// [`LivePreview::flush_mutations`] afterwards.
    pub fn tree_mut(&mut self) -> &mut LiveTree {
        &mut self.tree
    }

    pub fn stylesheet(&self) -> &StylesheetManager {
        &self.stylesheet
    }

    /// Current text of the injected style element.
    pub fn style_text(&self) -> String {
        self.tree.document().text_content(self.style_node)
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PreviewEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: PreviewEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Populate `<body>` from a snapshot, binding the snapshot's dom ids.
    pub fn load(&mut self, root: &ActionElement) -> Result<LayerMap> {
        let body = self.tree.document().body();
        let node = self.build_from(root)?;
        self.tree.document_mut().append_child(body, node)?;
        self.tree.document_mut().take_records();
        self.dom_ready()
    }

    /// Full layer map; published as `DomReady`.
    pub fn dom_ready(&mut self) -> Result<LayerMap> {
        let layers = self.layer_map()?;
        self.emit(PreviewEvent::DomReady {
            layers: layers.clone(),
        });
        Ok(layers)
    }

    pub fn layer_map(&mut self) -> Result<LayerMap> {
        let stylesheet = &self.stylesheet;
        let lookup = |dom_id: &str| overrides_for(stylesheet, dom_id);
        Ok(self.tree.build_layer_map(&lookup)?.1)
    }

    /// Process pending document changes and publish them.
    pub fn flush_mutations(&mut self) -> Result<WindowMutation> {
        let stylesheet = &self.stylesheet;
        let lookup = |dom_id: &str| overrides_for(stylesheet, dom_id);
        let mutation = self.tree.process_mutations(&lookup)?;
        if !mutation.is_empty() {
            self.emit(PreviewEvent::WindowMutated(mutation.clone()));
        }
        Ok(mutation)
    }

    pub fn update_style(&mut self, dom_id: &str, property: &str, value: &str) -> Result<()> {
        self.tree.resolve(dom_id)?;
        let css = self.stylesheet.update_style(dom_id, property, value);
        self.write_style_text(&css)
    }

    pub fn update_styles(&mut self, dom_id: &str, styles: &StyleMap) -> Result<()> {
        self.tree.resolve(dom_id)?;
        let css = self.stylesheet.update_styles(dom_id, styles);
        self.write_style_text(&css)
    }

    fn write_style_text(&mut self, css: &str) -> Result<()> {
        self.tree.document_mut().set_text_content(self.style_node, css)?;
        // The style element is not a layer; its text change is not a window
        // mutation worth reporting.
        self.flush_mutations()?;
        Ok(())
    }

    /// Snapshot an element and its subtree, including pending overrides.
    pub fn snapshot(&self, dom_id: &str) -> Result<ActionElement> {
        let root = self.tree.resolve(dom_id)?;
        let doc = self.tree.document();

        let mut root_snapshot = None;
        // (node, path of child indices from the snapshot root)
        let mut stack: Vec<(NodeId, Vec<usize>)> = vec![(root, Vec::new())];
        while let Some((node, path)) = stack.pop() {
            let Some(element) = doc.element(node) else {
                continue;
            };
            let node_dom_id = self.tree.dom_id_of(node).unwrap_or_default().to_string();
            let mut styles = element.styles.clone();
            styles.extend(self.stylesheet.styles_for(&node_dom_id));
            let own_text = doc.own_text(node);

            let snapshot = ActionElement {
                tag_name: element.tag_name.clone(),
                attributes: element.attributes.clone(),
                styles,
                text_content: (!own_text.is_empty()).then_some(own_text),
                children: Vec::new(),
                dom_id: node_dom_id,
                oid: element.attributes.get(SOURCE_ID_ATTRIBUTE).cloned(),
            };

            match path.split_last() {
                None => root_snapshot = Some(snapshot),
                Some((_, parent_path)) => {
                    if let Some(parent) = root_snapshot
                        .as_mut()
                        .and_then(|root| descend(root, parent_path))
                    {
                        parent.children.push(snapshot);
                    }
                }
            }

            let children = doc.element_children(node);
            for (index, child) in children.into_iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(index);
                stack.push((child, child_path));
            }
        }

        root_snapshot.ok_or_else(|| LiveTreeError::UnknownAddress(dom_id.to_string()))
    }

    fn dom_element(&self, node: NodeId) -> Result<DomElement> {
        let doc = self.tree.document();
        let tag_name = doc
            .tag_name(node)
            .ok_or(LiveTreeError::NotAnElement(node))?
            .to_string();
        let dom_id = self.tree.dom_id_of(node).unwrap_or_default().to_string();
        Ok(DomElement {
            surface_id: self.tree.surface_id().to_string(),
            styles: self.stylesheet.styles_for(&dom_id),
            dom_id,
            tag_name,
            oid: doc.attribute(node, SOURCE_ID_ATTRIBUTE).map(str::to_string),
            instance_id: doc
                .attribute(node, trellis_models::INSTANCE_ID_ATTRIBUTE)
                .map(str::to_string),
            parent_dom_id: doc
                .parent(node)
                .and_then(|parent| self.tree.dom_id_of(parent))
                .map(str::to_string),
        })
    }

    /// Create detached nodes for `element` and its subtree.
    fn build_from(&mut self, element: &ActionElement) -> Result<NodeId> {
        let mut root = None;
        let mut stack: Vec<(&ActionElement, Option<NodeId>)> = vec![(element, None)];

        while let Some((snapshot, parent)) = stack.pop() {
            let doc = self.tree.document_mut();
            let node = doc.create_element(&snapshot.tag_name);
            for (name, value) in &snapshot.attributes {
                doc.set_attribute(node, name, value)?;
            }
            if let Some(oid) = &snapshot.oid {
                doc.set_attribute(node, SOURCE_ID_ATTRIBUTE, oid)?;
            }
            if let Some(text) = &snapshot.text_content {
                let text_node = doc.create_text(text);
                doc.append_child(node, text_node)?;
            }
            match parent {
                Some(parent) => doc.append_child(parent, node)?,
                None => root = Some(node),
            }

            if snapshot.dom_id.is_empty() {
                self.tree.ensure_dom_id(node)?;
            } else {
                self.tree.bind(&snapshot.dom_id, node)?;
            }
            if !snapshot.styles.is_empty() {
                let dom_id = self.tree.ensure_dom_id(node)?;
                let css = self.stylesheet.update_styles(&dom_id, &snapshot.styles);
                self.tree.document_mut().set_text_content(self.style_node, &css)?;
            }

            for child in snapshot.children.iter().rev() {
                stack.push((child, Some(node)));
            }
        }

        root.ok_or_else(|| LiveTreeError::UnknownAddress(element.dom_id.clone()))
    }

    fn structural_update(&mut self, node: NodeId, parent: NodeId) -> Result<DomUpdate> {
        self.flush_mutations()?;
        let element = self.dom_element(node)?;
        let stylesheet = &self.stylesheet;
        let lookup = |dom_id: &str| overrides_for(stylesheet, dom_id);
        let (parent_id, layers) = self.tree.build_layer_map_from(parent, &lookup)?;
        Ok(DomUpdate {
            element,
            parent_id,
            layers,
        })
    }

    pub fn insert_element(
        &mut self,
        element: &ActionElement,
        location: &ActionLocation,
    ) -> Result<DomUpdate> {
        let parent = self.tree.resolve(&location.target_address)?;
        let node = self.build_from(element)?;
        let doc = self.tree.document_mut();
        match location.position {
            InsertPosition::Append => doc.append_child(parent, node)?,
            InsertPosition::Prepend => doc.insert_element_at(parent, 0, node)?,
            InsertPosition::Index { index } => doc.insert_element_at(parent, index, node)?,
        }
        debug!(dom_id = %element.dom_id, parent = %location.target_address, "inserted element");

        let update = self.structural_update(node, parent)?;
        self.emit(PreviewEvent::ElementInserted(update.clone()));
        Ok(update)
    }

    /// Remove the element at `location`.
    pub fn remove_element(&mut self, location: &ActionLocation) -> Result<DomUpdate> {
        let parent = self.tree.resolve(&location.target_address)?;
        let children = self.tree.document().element_children(parent);
        let index = match location.position {
            InsertPosition::Append => children.len().checked_sub(1),
            InsertPosition::Prepend => (!children.is_empty()).then_some(0),
            InsertPosition::Index { index } => (index < children.len()).then_some(index),
        };
        let node = index
            .and_then(|index| children.get(index).copied())
            .ok_or_else(|| LiveTreeError::InvalidLocation {
                parent: location.target_address.clone(),
                index: index.unwrap_or(children.len()),
            })?;
        self.remove_node(node, parent)
    }

    /// Remove a known element from `location`'s parent. Falls back to the
    /// positional lookup when the element is no longer registered.
    pub fn remove_element_by_id(
        &mut self,
        dom_id: &str,
        location: &ActionLocation,
    ) -> Result<DomUpdate> {
        match self.tree.resolve(dom_id) {
            Ok(node) => {
                let parent = self.tree.resolve(&location.target_address)?;
                if self.tree.document().parent(node) != Some(parent) {
                    return Err(LiveTreeError::NotAChild {
                        parent: location.target_address.clone(),
                        child: dom_id.to_string(),
                    });
                }
                self.remove_node(node, parent)
            }
            Err(_) => self.remove_element(location),
        }
    }

    fn remove_node(&mut self, node: NodeId, parent: NodeId) -> Result<DomUpdate> {
        let element = self.dom_element(node)?;
        self.tree.document_mut().remove(node)?;
        let mut update = self.structural_update(parent, parent)?;
        update.element = element;
        self.emit(PreviewEvent::ElementRemoved(update.clone()));
        Ok(update)
    }

    pub fn move_element(&mut self, dom_id: &str, new_index: usize) -> Result<DomUpdate> {
        let node = self.tree.resolve(dom_id)?;
        let parent = self
            .tree
            .document()
            .parent(node)
            .ok_or_else(|| LiveTreeError::UnknownAddress(dom_id.to_string()))?;
        self.tree
            .document_mut()
            .insert_element_at(parent, new_index, node)?;

        let update = self.structural_update(node, parent)?;
        self.emit(PreviewEvent::ElementMoved(update.clone()));
        Ok(update)
    }

    pub fn edit_text(&mut self, dom_id: &str, content: &str) -> Result<TextDomElement> {
        let node = self.tree.resolve(dom_id)?;
        self.tree.document_mut().set_text_content(node, content)?;
        self.flush_mutations()?;

        let edited = TextDomElement {
            element: self.dom_element(node)?,
            text_content: content.to_string(),
        };
        self.emit(PreviewEvent::ElementTextEdited(edited.clone()));
        Ok(edited)
    }

    /// Wrap `children` of `parent` in a new `container`, placed where the
    /// first child was. Only the container itself is built; any children in
    /// the `container` snapshot are the live `children` being wrapped.
    pub fn group_elements(
        &mut self,
        parent: &ActionTarget,
        container: &ActionElement,
        children: &[ActionTarget],
    ) -> Result<DomUpdate> {
        let parent_node = self.tree.resolve(&parent.address)?;
        let mut members = Vec::new();
        for child in children {
            let node = self.tree.resolve(&child.address)?;
            let index = self
                .tree
                .document()
                .element_index(node)
                .filter(|_| self.tree.document().parent(node) == Some(parent_node))
                .ok_or_else(|| LiveTreeError::NotAChild {
                    parent: parent.address.clone(),
                    child: child.address.clone(),
                })?;
            members.push((index, node));
        }
        members.sort_by_key(|(index, _)| *index);

        let insert_at = members.first().map(|(index, _)| *index).unwrap_or(0);
        let container_node = self.build_from(&container.shell())?;
        let doc = self.tree.document_mut();
        doc.insert_element_at(parent_node, insert_at, container_node)?;
        for (_, node) in &members {
            doc.append_child(container_node, *node)?;
        }

        let update = self.structural_update(container_node, parent_node)?;
        self.emit(PreviewEvent::ElementGrouped(update.clone()));
        Ok(update)
    }

    /// Move the container's children back into `parent` at the container's
    /// position and drop the container.
    pub fn ungroup_elements(
        &mut self,
        parent: &ActionTarget,
        container: &ActionElement,
    ) -> Result<DomUpdate> {
        let parent_node = self.tree.resolve(&parent.address)?;
        let container_node = self.tree.resolve(&container.dom_id)?;
        let doc = self.tree.document_mut();
        if doc.parent(container_node) != Some(parent_node) {
            return Err(LiveTreeError::NotAChild {
                parent: parent.address.clone(),
                child: container.dom_id.clone(),
            });
        }

        let position = doc.element_index(container_node).unwrap_or(0);
        for (offset, child) in doc.element_children(container_node).into_iter().enumerate() {
            doc.insert_element_at(parent_node, position + offset, child)?;
        }
        let removed = self.dom_element(container_node)?;
        self.tree.document_mut().remove(container_node)?;

        let mut update = self.structural_update(parent_node, parent_node)?;
        update.element = removed;
        self.emit(PreviewEvent::ElementUngrouped(update.clone()));
        Ok(update)
    }

    pub fn insert_image(&mut self, dom_id: &str, image: &ImageContent) -> Result<()> {
        let url = format!("url(data:{};base64,{})", image.mime_type, image.content);
        self.update_style(dom_id, "backgroundImage", &url)
    }

    pub fn remove_image(&mut self, dom_id: &str) -> Result<()> {
        self.update_style(dom_id, "backgroundImage", "")
    }

    /// Source now reflects every edit: drop transient overrides and resync.
    pub fn clean_after_write(&mut self) -> Result<LayerMap> {
        let css = self.stylesheet.clear();
        self.write_style_text(&css)?;
        self.dom_ready()
    }
}

fn overrides_for(stylesheet: &StylesheetManager, dom_id: &str) -> Option<StyleMap> {
    let styles = stylesheet.styles_for(dom_id);
    (!styles.is_empty()).then_some(styles)
}

fn descend<'a>(root: &'a mut ActionElement, path: &[usize]) -> Option<&'a mut ActionElement> {
    let mut current = root;
    for index in path {
        current = current.children.get_mut(*index)?;
    }
    Some(current)
}
