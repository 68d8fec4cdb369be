//! The closed set of editor actions.
//!
//! Every gesture in the editor is described by one [`Action`]. The same value
//! is applied to the preview, stored in history and handed to the write queue,
//! so everything here is plain serializable data.

use crate::code::CodeDiff;
use crate::element::ActionElement;
use crate::style::StyleMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One rendered element inside one preview surface.
///
/// `address` is the persistent dom id assigned by the live tree. It is stable
/// for the lifetime of the rendered node but not across re-renders; `source_id`
/// is injected at authoring time and survives re-renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTarget {
    pub surface_id: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl ActionTarget {
    pub fn new(surface_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            surface_id: surface_id.into(),
            address: address.into(),
            source_id: None,
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }
}

/// A before/after pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change<T> {
    pub original: T,
    pub updated: T,
}

impl<T> Change<T> {
    pub fn new(original: T, updated: T) -> Self {
        Self { original, updated }
    }

    pub fn reverse(self) -> Self {
        Self {
            original: self.updated,
            updated: self.original,
        }
    }
}

/// Style change for one target. An empty string on either side means the
/// property was (or becomes) unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleActionTarget {
    #[serde(flatten)]
    pub target: ActionTarget,
    pub change: Change<StyleMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InsertPosition {
    Append,
    Prepend,
    Index { index: usize },
}

/// Where an element is inserted or removed: a parent plus a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLocation {
    pub target_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_source_id: Option<String>,
    pub position: InsertPosition,
}

/// Location of a move. `original_index` is kept so the move can be reversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLocation {
    pub target_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_source_id: Option<String>,
    pub index: usize,
    pub original_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStyleAction {
    pub targets: Vec<StyleActionTarget>,
}

/// Source of a pasted element, so the code service can copy its markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteParams {
    pub source_id: String,
    pub address: String,
}

/// Insert into the parent named by `location`. `targets` name the surfaces
/// the insert applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertElementAction {
    pub targets: Vec<ActionTarget>,
    pub location: ActionLocation,
    pub element: ActionElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paste_params: Option<PasteParams>,
}

/// Mirror of [`InsertElementAction`]; `element` is the full snapshot of what
/// was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveElementAction {
    pub targets: Vec<ActionTarget>,
    pub location: ActionLocation,
    pub element: ActionElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paste_params: Option<PasteParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveElementAction {
    pub targets: Vec<ActionTarget>,
    pub location: MoveLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTextAction {
    pub targets: Vec<ActionTarget>,
    pub original_content: String,
    pub new_content: String,
}

/// Wrap `children` of `parent` into `container`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupElementsAction {
    pub parent: ActionTarget,
    pub container: ActionElement,
    pub children: Vec<ActionTarget>,
}

/// Unwrap `container`, putting `children` back into `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UngroupElementsAction {
    pub parent: ActionTarget,
    pub container: ActionElement,
    pub children: Vec<ActionTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    pub content: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Background image set on (or cleared from) each target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAction {
    pub targets: Vec<ActionTarget>,
    pub image: ImageContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteCodeAction {
    pub diffs: Vec<CodeDiff>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    UpdateStyle(UpdateStyleAction),
    InsertElement(InsertElementAction),
    RemoveElement(RemoveElementAction),
    MoveElement(MoveElementAction),
    EditText(EditTextAction),
    GroupElements(GroupElementsAction),
    UngroupElements(UngroupElementsAction),
    InsertImage(ImageAction),
    RemoveImage(ImageAction),
    WriteCode(WriteCodeAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    UpdateStyle,
    InsertElement,
    RemoveElement,
    MoveElement,
    EditText,
    GroupElements,
    UngroupElements,
    InsertImage,
    RemoveImage,
    WriteCode,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::UpdateStyle => "update-style",
            ActionKind::InsertElement => "insert-element",
            ActionKind::RemoveElement => "remove-element",
            ActionKind::MoveElement => "move-element",
            ActionKind::EditText => "edit-text",
            ActionKind::GroupElements => "group-elements",
            ActionKind::UngroupElements => "ungroup-elements",
            ActionKind::InsertImage => "insert-image",
            ActionKind::RemoveImage => "remove-image",
            ActionKind::WriteCode => "write-code",
        }
    }

    /// Whether actions of this kind change the shape of the live tree.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ActionKind::InsertElement
                | ActionKind::RemoveElement
                | ActionKind::MoveElement
                | ActionKind::GroupElements
                | ActionKind::UngroupElements
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::UpdateStyle(_) => ActionKind::UpdateStyle,
            Action::InsertElement(_) => ActionKind::InsertElement,
            Action::RemoveElement(_) => ActionKind::RemoveElement,
            Action::MoveElement(_) => ActionKind::MoveElement,
            Action::EditText(_) => ActionKind::EditText,
            Action::GroupElements(_) => ActionKind::GroupElements,
            Action::UngroupElements(_) => ActionKind::UngroupElements,
            Action::InsertImage(_) => ActionKind::InsertImage,
            Action::RemoveImage(_) => ActionKind::RemoveImage,
            Action::WriteCode(_) => ActionKind::WriteCode,
        }
    }

    /// Every element this action touches. Group actions list the parent first.
    pub fn targets(&self) -> Vec<&ActionTarget> {
        match self {
            Action::UpdateStyle(action) => action.targets.iter().map(|t| &t.target).collect(),
            Action::InsertElement(action) => action.targets.iter().collect(),
            Action::RemoveElement(action) => action.targets.iter().collect(),
            Action::MoveElement(action) => action.targets.iter().collect(),
            Action::EditText(action) => action.targets.iter().collect(),
            Action::GroupElements(GroupElementsAction {
                parent, children, ..
            })
            | Action::UngroupElements(UngroupElementsAction {
                parent, children, ..
            }) => std::iter::once(parent).chain(children.iter()).collect(),
            Action::InsertImage(action) | Action::RemoveImage(action) => {
                action.targets.iter().collect()
            }
            Action::WriteCode(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_json_uses_kebab_type_tag() {
        let json = r#"{
            "type": "update-style",
            "targets": [{
                "surfaceId": "frame-1",
                "address": "d1",
                "sourceId": "abc",
                "change": {
                    "original": { "width": "" },
                    "updated": { "width": "100px" }
                }
            }]
        }"#;

        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.kind(), ActionKind::UpdateStyle);

        let targets = action.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].source_id.as_deref(), Some("abc"));

        let back = serde_json::to_value(&action).unwrap();
        assert_eq!(back["type"], "update-style");
        assert_eq!(back["targets"][0]["surfaceId"], "frame-1");
    }

    #[test]
    fn test_insert_position_shapes() {
        let at: InsertPosition = serde_json::from_str(r#"{"type":"index","index":2}"#).unwrap();
        assert_eq!(at, InsertPosition::Index { index: 2 });

        let append: InsertPosition = serde_json::from_str(r#"{"type":"append"}"#).unwrap();
        assert_eq!(append, InsertPosition::Append);
    }

    #[test]
    fn test_group_targets_lists_parent_first() {
        let action = Action::GroupElements(GroupElementsAction {
            parent: ActionTarget::new("f", "parent"),
            container: ActionElement::new("div", "box"),
            children: vec![ActionTarget::new("f", "a"), ActionTarget::new("f", "b")],
        });

        let addresses: Vec<_> = action.targets().iter().map(|t| t.address.as_str()).collect();
        assert_eq!(addresses, vec!["parent", "a", "b"]);
        assert!(action.kind().is_structural());
    }

    #[test]
    fn test_change_reverse_swaps() {
        let change = Change::new("a", "b").reverse();
        assert_eq!(change.original, "b");
        assert_eq!(change.updated, "a");
    }
}
