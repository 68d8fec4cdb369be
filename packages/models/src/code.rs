//! Code diff requests and the diffs that come back from the code service.

use crate::actions::{ImageContent, InsertPosition, PasteParams};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Attribute key holding the utility-class list in generated markup.
pub const CLASS_NAME_ATTRIBUTE: &str = "className";

/// One file edit: the full text before and after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDiff {
    pub path: String,
    pub original: String,
    pub generated: String,
}

impl CodeDiff {
    pub fn reverse(self) -> Self {
        Self {
            path: self.path,
            original: self.generated,
            generated: self.original,
        }
    }
}

/// An element as it should appear in source: styles already translated into
/// the class list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeElement {
    pub tag_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default)]
    pub children: Vec<CodeElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeInsert {
    pub position: InsertPosition,
    pub element: CodeElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paste_params: Option<PasteParams>,
}

/// Structural edit recorded against the source node that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StructureChange {
    Insert(CodeInsert),
    #[serde(rename_all = "camelCase")]
    Remove {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_id: Option<String>,
        position: InsertPosition,
    },
    #[serde(rename_all = "camelCase")]
    Move {
        source_id: String,
        index: usize,
        original_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    Group {
        container: CodeElement,
        children: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Ungroup {
        container: CodeElement,
        children: Vec<String>,
    },
    InsertImage { image: ImageContent },
    RemoveImage { image: ImageContent },
}

/// Everything one flush wants changed on one source node.
///
/// Requests are keyed by `oid`; every action resolving to the same source id
/// within a flush lands in the same request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDiffRequest {
    pub oid: String,
    #[serde(default)]
    pub structure_changes: Vec<StructureChange>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    /// Utility groups whose classes must be stripped from the existing list.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub cleared_groups: BTreeSet<String>,
}

impl CodeDiffRequest {
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            ..Default::default()
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        self.attributes.get(CLASS_NAME_ATTRIBUTE).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.structure_changes.is_empty()
            && self.attributes.is_empty()
            && self.text_content.is_none()
            && self.cleared_groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_diff_swaps_text() {
        let diff = CodeDiff {
            path: "a.tsx".into(),
            original: "old".into(),
            generated: "new".into(),
        }
        .reverse();

        assert_eq!(diff.original, "new");
        assert_eq!(diff.generated, "old");
    }

    #[test]
    fn test_request_json_shape() {
        let mut request = CodeDiffRequest::new("card");
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"oid":"card","structureChanges":[],"attributes":{}}"#
        );

        request.cleared_groups.insert("width".into());
        let json = serde_json::to_value(&request).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4, "{keys:?}");
        assert_eq!(json["clearedGroups"], serde_json::json!(["width"]));
    }

    #[test]
    fn test_structure_change_tags() {
        let change = StructureChange::Move {
            source_id: "child".into(),
            index: 2,
            original_index: 0,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "move");
        assert_eq!(json["sourceId"], "child");
        assert_eq!(json["originalIndex"], 0);
    }

    #[test]
    fn test_empty_request() {
        let mut request = CodeDiffRequest::new("abc");
        assert!(request.is_empty());

        request.text_content = Some("hi".into());
        assert!(!request.is_empty());
    }
}
