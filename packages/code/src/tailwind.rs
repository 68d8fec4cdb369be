//! CSS declarations to utility classes, and class-list merging.
//!
//! Each generated class belongs to the CSS property it sets. Merging a new
//! class replaces any existing class for the same property and leaves the
//! rest of the list alone.

use std::collections::BTreeSet;
use trellis_models::style_key_to_css;

/// Properties with a fixed keyword → class table.
const KEYWORD_CLASSES: &[(&str, &str, &str)] = &[
    ("display", "block", "block"),
    ("display", "inline-block", "inline-block"),
    ("display", "inline", "inline"),
    ("display", "flex", "flex"),
    ("display", "inline-flex", "inline-flex"),
    ("display", "grid", "grid"),
    ("display", "none", "hidden"),
    ("position", "static", "static"),
    ("position", "relative", "relative"),
    ("position", "absolute", "absolute"),
    ("position", "fixed", "fixed"),
    ("position", "sticky", "sticky"),
    ("flex-direction", "row", "flex-row"),
    ("flex-direction", "row-reverse", "flex-row-reverse"),
    ("flex-direction", "column", "flex-col"),
    ("flex-direction", "column-reverse", "flex-col-reverse"),
    ("flex-wrap", "wrap", "flex-wrap"),
    ("flex-wrap", "nowrap", "flex-nowrap"),
    ("justify-content", "flex-start", "justify-start"),
    ("justify-content", "center", "justify-center"),
    ("justify-content", "flex-end", "justify-end"),
    ("justify-content", "space-between", "justify-between"),
    ("justify-content", "space-around", "justify-around"),
    ("justify-content", "space-evenly", "justify-evenly"),
    ("align-items", "flex-start", "items-start"),
    ("align-items", "center", "items-center"),
    ("align-items", "flex-end", "items-end"),
    ("align-items", "stretch", "items-stretch"),
    ("align-items", "baseline", "items-baseline"),
    ("text-align", "left", "text-left"),
    ("text-align", "center", "text-center"),
    ("text-align", "right", "text-right"),
    ("text-align", "justify", "text-justify"),
    ("font-weight", "100", "font-thin"),
    ("font-weight", "200", "font-extralight"),
    ("font-weight", "300", "font-light"),
    ("font-weight", "400", "font-normal"),
    ("font-weight", "normal", "font-normal"),
    ("font-weight", "500", "font-medium"),
    ("font-weight", "600", "font-semibold"),
    ("font-weight", "700", "font-bold"),
    ("font-weight", "bold", "font-bold"),
    ("font-weight", "800", "font-extrabold"),
    ("font-weight", "900", "font-black"),
    ("font-style", "italic", "italic"),
    ("font-style", "normal", "not-italic"),
    ("overflow", "hidden", "overflow-hidden"),
    ("overflow", "auto", "overflow-auto"),
    ("overflow", "scroll", "overflow-scroll"),
    ("overflow", "visible", "overflow-visible"),
    ("visibility", "hidden", "invisible"),
    ("visibility", "visible", "visible"),
];

/// Properties written as `prefix-<value>`.
const PREFIXES: &[(&str, &str)] = &[
    ("width", "w"),
    ("height", "h"),
    ("min-width", "min-w"),
    ("max-width", "max-w"),
    ("min-height", "min-h"),
    ("max-height", "max-h"),
    ("margin", "m"),
    ("margin-top", "mt"),
    ("margin-right", "mr"),
    ("margin-bottom", "mb"),
    ("margin-left", "ml"),
    ("padding", "p"),
    ("padding-top", "pt"),
    ("padding-right", "pr"),
    ("padding-bottom", "pb"),
    ("padding-left", "pl"),
    ("gap", "gap"),
    ("top", "top"),
    ("right", "right"),
    ("bottom", "bottom"),
    ("left", "left"),
    ("border-radius", "rounded"),
    ("opacity", "opacity"),
    ("z-index", "z"),
    ("font-size", "text"),
    ("color", "text"),
    ("line-height", "leading"),
    ("letter-spacing", "tracking"),
    ("background-color", "bg"),
    ("background-image", "bg"),
    ("border-width", "border"),
    ("border-color", "border"),
];

/// Keyword values accepted after a prefix without brackets.
const SIZE_KEYWORDS: &[(&str, &str)] =
    &[("100%", "full"), ("auto", "auto"), ("0", "0"), ("0px", "0")];

/// Utility class for one declaration. `property` may be a style key or a CSS
/// property name.
pub fn to_utility(property: &str, value: &str) -> String {
    let property = style_key_to_css(property);
    let value = value.trim();

    if let Some((_, _, class)) = KEYWORD_CLASSES
        .iter()
        .find(|(p, v, _)| *p == property && *v == value)
    {
        return class.to_string();
    }

    if let Some((_, prefix)) = PREFIXES.iter().find(|(p, _)| *p == property) {
        if let Some((_, keyword)) = SIZE_KEYWORDS.iter().find(|(v, _)| *v == value) {
            return format!("{}-{}", prefix, keyword);
        }
        return format!("{}-[{}]", prefix, escape_arbitrary(value));
    }

    format!("[{}:{}]", property, escape_arbitrary(value))
}

/// CSS property a utility class sets, if it is one this module generates.
pub fn utility_property(class: &str) -> Option<String> {
    if let Some((_, p, _)) = KEYWORD_CLASSES.iter().find(|(_, _, c)| *c == class) {
        return Some(p.to_string());
    }

    if let Some(inner) = class.strip_prefix('[').and_then(|c| c.strip_suffix(']')) {
        return inner.split_once(':').map(|(property, _)| property.to_string());
    }

    if let Some((prefix, rest)) = class.split_once("-[") {
        let value = rest.strip_suffix(']')?;
        return property_for_prefix(prefix, value);
    }

    SIZE_KEYWORDS.iter().find_map(|(_, keyword)| {
        let prefix = class.strip_suffix(keyword)?.strip_suffix('-')?;
        property_for_prefix(prefix, keyword)
    })
}

/// Several properties share a prefix; the value decides which one.
fn property_for_prefix(prefix: &str, value: &str) -> Option<String> {
    let mut candidates = PREFIXES.iter().filter(|(_, p)| *p == prefix).map(|(prop, _)| *prop);
    let first = candidates.next()?;
    let Some(second) = candidates.next() else {
        return Some(first.to_string());
    };

    let is_length = value
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '.')
        .unwrap_or(false);
    let property = match prefix {
        "text" if is_length => "font-size",
        "text" => "color",
        "bg" if value.starts_with("url(") => "background-image",
        "bg" => "background-color",
        "border" if is_length => "border-width",
        "border" => "border-color",
        _ => second,
    };
    Some(property.to_string())
}

/// Arbitrary values cannot contain spaces.
fn escape_arbitrary(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Merge `updates` (property, class) into `existing`, dropping any class for
/// an updated or `cleared` property. Unknown classes are kept in place.
pub fn merge_classes(
    existing: &str,
    updates: &[(String, String)],
    cleared: &BTreeSet<String>,
) -> String {
    let replaced: BTreeSet<&str> = updates
        .iter()
        .map(|(property, _)| property.as_str())
        .chain(cleared.iter().map(String::as_str))
        .collect();

    let mut classes: Vec<String> = existing
        .split_whitespace()
        .filter(|class| {
            utility_property(class)
                .map(|property| !replaced.contains(property.as_str()))
                .unwrap_or(true)
        })
        .map(str::to_string)
        .collect();

    for (_, class) in updates {
        if !classes.contains(class) {
            classes.push(class.clone());
        }
    }
    classes.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_classes() {
        assert_eq!(to_utility("display", "flex"), "flex");
        assert_eq!(to_utility("display", "none"), "hidden");
        assert_eq!(to_utility("flexDirection", "column"), "flex-col");
        assert_eq!(to_utility("fontWeight", "700"), "font-bold");
    }

    #[test]
    fn test_arbitrary_values() {
        assert_eq!(to_utility("width", "100px"), "w-[100px]");
        assert_eq!(to_utility("width", "100%"), "w-full");
        assert_eq!(to_utility("backgroundColor", "#ff0000"), "bg-[#ff0000]");
        assert_eq!(to_utility("margin", "0 auto"), "m-[0_auto]");
        assert_eq!(to_utility("cursor", "pointer"), "[cursor:pointer]");
    }

    #[test]
    fn test_utility_property_reverses_generated_classes() {
        for (property, value) in [
            ("width", "100px"),
            ("width", "auto"),
            ("font-size", "12px"),
            ("color", "#333"),
            ("background-image", "url(a.png)"),
            ("border-width", "2px"),
            ("display", "grid"),
            ("cursor", "pointer"),
        ] {
            let class = to_utility(property, value);
            assert_eq!(utility_property(&class).as_deref(), Some(property), "{class}");
        }
        assert_eq!(utility_property("my-custom-class"), None);
    }

    #[test]
    fn test_merge_replaces_same_property_only() {
        let merged = merge_classes(
            "card w-[10px] text-[12px] shadow",
            &[("width".into(), "w-[100px]".into())],
            &BTreeSet::new(),
        );
        assert_eq!(merged, "card text-[12px] shadow w-[100px]");
    }

    #[test]
    fn test_merge_clears_properties() {
        let cleared: BTreeSet<String> = ["font-size".to_string()].into_iter().collect();
        let merged = merge_classes("text-[12px] text-[#333] flex", &[], &cleared);
        assert_eq!(merged, "text-[#333] flex");
    }
}
