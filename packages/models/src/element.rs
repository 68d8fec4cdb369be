//! Element snapshots, layer nodes and template nodes.

use crate::style::StyleMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Snapshot of an element carried inside insert/remove/group actions.
///
/// Snapshots are deep: `children` hold the complete subtree so that an
/// insert reversed into a remove (and back) reconstructs the same nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionElement {
    pub tag_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub styles: StyleMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default)]
    pub children: Vec<ActionElement>,
    pub dom_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
}

impl ActionElement {
    pub fn new(tag_name: impl Into<String>, dom_id: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: BTreeMap::new(),
            styles: StyleMap::new(),
            text_content: None,
            children: Vec::new(),
            dom_id: dom_id.into(),
            oid: None,
        }
    }

    pub fn with_oid(mut self, oid: impl Into<String>) -> Self {
        self.oid = Some(oid.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(key.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: ActionElement) -> Self {
        self.children.push(child);
        self
    }

    /// Number of elements in this snapshot, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(ActionElement::subtree_len).sum::<usize>()
    }

    /// This element without its children. A group container is built from
    /// its shell; the children it wraps already exist.
    pub fn shell(&self) -> ActionElement {
        ActionElement {
            tag_name: self.tag_name.clone(),
            attributes: self.attributes.clone(),
            styles: self.styles.clone(),
            text_content: self.text_content.clone(),
            children: Vec::new(),
            dom_id: self.dom_id.clone(),
            oid: self.oid.clone(),
        }
    }
}

/// An element as reported back by a preview surface after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomElement {
    pub surface_id: String,
    pub dom_id: String,
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_dom_id: Option<String>,
    #[serde(default)]
    pub styles: StyleMap,
}

/// A [`DomElement`] plus the text it now holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDomElement {
    #[serde(flatten)]
    pub element: DomElement,
    pub text_content: String,
}

/// One row of the layers panel.
///
/// Layer nodes reference their parent and children by dom id only; they are
/// resolved against a [`LayerMap`] when needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerNode {
    pub dom_id: String,
    pub surface_id: String,
    pub tag_name: String,
    pub is_visible: bool,
    #[serde(default)]
    pub text_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Layer nodes keyed by dom id.
pub type LayerMap = HashMap<String, LayerNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicType {
    /// Produced by mapping over an array.
    Array,
    /// Produced by a conditional expression.
    Conditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoreElementType {
    ComponentRoot,
    BodyTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

/// Opaque pointer into source code for one authored element.
///
/// A root template node is the declaration inside the authoring component; an
/// instance template node is the call site that produced one rendered copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    pub oid: String,
    pub path: String,
    pub range: SourceRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_type: Option<DynamicType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_element_type: Option<CoreElementType>,
}

impl TemplateNode {
    pub fn new(oid: impl Into<String>, path: impl Into<String>, range: SourceRange) -> Self {
        Self {
            oid: oid.into(),
            path: path.into(),
            range,
            component: None,
            dynamic_type: None,
            core_element_type: None,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtree_len_counts_nested_children() {
        let element = ActionElement::new("div", "d1")
            .with_child(ActionElement::new("span", "d2").with_child(ActionElement::new("b", "d3")))
            .with_child(ActionElement::new("p", "d4"));

        assert_eq!(element.subtree_len(), 4);
    }

    #[test]
    fn test_shell_drops_children_only() {
        let element = ActionElement::new("section", "wrap")
            .with_oid("wrap")
            .with_style("display", "flex")
            .with_child(ActionElement::new("h1", "title"));

        let shell = element.shell();
        assert!(shell.children.is_empty());
        assert_eq!(shell.dom_id, "wrap");
        assert_eq!(shell.oid.as_deref(), Some("wrap"));
        assert_eq!(shell.styles, element.styles);
    }

    #[test]
    fn test_template_node_json_shape() {
        let range = SourceRange {
            start: SourcePosition { line: 3, column: 4 },
            end: SourcePosition { line: 3, column: 20 },
        };
        let node = TemplateNode::new("abc", "app/page.tsx", range).with_component("Page");

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["oid"], "abc");
        assert_eq!(json["component"], "Page");
        assert!(json.get("dynamicType").is_none());
    }
}
