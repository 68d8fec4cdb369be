//! Aggregation of actions into one [`CodeDiffRequest`] per source id.

use crate::tailwind::{merge_classes, to_utility};
use std::collections::{BTreeMap, BTreeSet};
use trellis_models::{
    style_key_to_css, ActionElement, CodeDiffRequest, CodeElement, StructureChange, StyleMap,
    CLASS_NAME_ATTRIBUTE, DOM_ID_ATTRIBUTE, INSTANCE_ID_ATTRIBUTE, SOURCE_ID_ATTRIBUTE,
    TEMP_ID_ATTRIBUTE,
};

/// Attributes the editor injects into rendered markup; never written to source.
const EDITOR_ATTRIBUTES: &[&str] = &[
    DOM_ID_ATTRIBUTE,
    SOURCE_ID_ATTRIBUTE,
    INSTANCE_ID_ATTRIBUTE,
    TEMP_ID_ATTRIBUTE,
];

/// Collects everything one flush wants changed, merged by source id.
#[derive(Debug, Default)]
pub struct RequestSet {
    requests: BTreeMap<String, CodeDiffRequest>,
}

impl RequestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, oid: &str) -> &mut CodeDiffRequest {
        self.requests
            .entry(oid.to_string())
            .or_insert_with(|| CodeDiffRequest::new(oid))
    }

    /// Merge a style map into the class list of `oid`. Empty values clear
    /// the property's utility group: any class this request already carries
    /// for it is dropped and the group is marked for removal from source.
    pub fn add_styles(&mut self, oid: &str, styles: &StyleMap) {
        let request = self.get_or_create(oid);

        let mut updates = Vec::new();
        let mut cleared = BTreeSet::new();
        for (key, value) in styles {
            let property = style_key_to_css(key);
            if value.trim().is_empty() {
                request.cleared_groups.insert(property.clone());
                cleared.insert(property);
            } else {
                request.cleared_groups.remove(&property);
                updates.push((property.clone(), to_utility(&property, value)));
            }
        }

        let existing = request.class_name().unwrap_or_default().to_string();
        if existing.is_empty() && updates.is_empty() {
            return;
        }
        let merged = merge_classes(&existing, &updates, &cleared);
        if merged.is_empty() {
            request.attributes.remove(CLASS_NAME_ATTRIBUTE);
        } else {
            request
                .attributes
                .insert(CLASS_NAME_ATTRIBUTE.to_string(), merged);
        }
    }

    pub fn add_structure_change(&mut self, oid: &str, change: StructureChange) {
        self.get_or_create(oid).structure_changes.push(change);
    }

    pub fn set_text(&mut self, oid: &str, text: &str) {
        self.get_or_create(oid).text_content = Some(text.to_string());
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Requests in source-id order, skipping any that ended up empty.
    pub fn into_requests(self) -> Vec<CodeDiffRequest> {
        self.requests
            .into_values()
            .filter(|request| !request.is_empty())
            .collect()
    }
}

/// Translate a snapshot into source markup: editor attributes dropped and
/// styles folded into the class list, children included.
pub fn to_code_element(element: &ActionElement) -> CodeElement {
    let mut attributes: BTreeMap<String, String> = element
        .attributes
        .iter()
        .filter(|(name, _)| !EDITOR_ATTRIBUTES.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let existing = attributes
        .remove(CLASS_NAME_ATTRIBUTE)
        .or_else(|| attributes.remove("class"))
        .unwrap_or_default();
    let updates: Vec<(String, String)> = element
        .styles
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(key, value)| {
            let property = style_key_to_css(key);
            let class = to_utility(&property, value);
            (property, class)
        })
        .collect();
    let class_name = merge_classes(&existing, &updates, &BTreeSet::new());
    if !class_name.is_empty() {
        attributes.insert(CLASS_NAME_ATTRIBUTE.to_string(), class_name);
    }

    CodeElement {
        tag_name: element.tag_name.clone(),
        attributes,
        text_content: element.text_content.clone(),
        children: element.children.iter().map(to_code_element).collect(),
        oid: element.oid.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles(pairs: &[(&str, &str)]) -> StyleMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_same_source_id_merges_into_one_request() {
        let mut set = RequestSet::new();
        set.add_styles("card", &styles(&[("width", "100px")]));
        set.add_styles("card", &styles(&[("height", "20px")]));
        set.add_styles("card", &styles(&[("width", "50%")]));

        let requests = set.into_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].class_name(), Some("h-[20px] w-[50%]"));
    }

    #[test]
    fn test_empty_value_clears_group() {
        let mut set = RequestSet::new();
        set.add_styles("card", &styles(&[("backgroundColor", ""), ("color", "red")]));

        let request = &set.into_requests()[0];
        assert!(request.cleared_groups.contains("background-color"));
        assert_eq!(request.class_name(), Some("text-[red]"));
    }

    #[test]
    fn test_clearing_drops_class_set_earlier_in_same_flush() {
        let mut set = RequestSet::new();
        set.add_styles("card", &styles(&[("width", "100px"), ("height", "20px")]));
        set.add_styles("card", &styles(&[("width", "")]));

        let request = &set.into_requests()[0];
        assert_eq!(request.class_name(), Some("h-[20px]"));
        assert!(request.cleared_groups.contains("width"));
    }

    #[test]
    fn test_clearing_the_only_class_removes_attribute() {
        let mut set = RequestSet::new();
        set.add_styles("card", &styles(&[("width", "100px")]));
        set.add_styles("card", &styles(&[("width", "")]));

        let request = &set.into_requests()[0];
        assert_eq!(request.class_name(), None);
        assert!(request.attributes.is_empty());
        assert_eq!(request.cleared_groups.len(), 1);
    }

    #[test]
    fn test_setting_a_cleared_group_again_unclears_it() {
        let mut set = RequestSet::new();
        set.add_styles("card", &styles(&[("color", "")]));
        set.add_styles("card", &styles(&[("color", "blue")]));

        let request = &set.into_requests()[0];
        assert!(request.cleared_groups.is_empty());
    }

    #[test]
    fn test_code_element_strips_editor_attributes() {
        let element = ActionElement::new("div", "dom-1")
            .with_oid("box")
            .with_attr(DOM_ID_ATTRIBUTE, "dom-1")
            .with_attr("className", "card w-[10px]")
            .with_attr("role", "note")
            .with_style("width", "100px")
            .with_child(ActionElement::new("span", "dom-2").with_style("display", "flex"));

        let code = to_code_element(&element);
        assert!(!code.attributes.contains_key(DOM_ID_ATTRIBUTE));
        assert_eq!(code.attributes["role"], "note");
        assert_eq!(code.attributes[CLASS_NAME_ATTRIBUTE], "card w-[100px]");
        assert_eq!(code.children[0].attributes[CLASS_NAME_ATTRIBUTE], "flex");
        assert_eq!(code.oid.as_deref(), Some("box"));
    }
}
