//! Style maps and property-key conversion.
//!
//! Style edits travel through the editor keyed by the internal camelCase
//! property name (`backgroundColor`). Stylesheets and utility classes want the
//! CSS spelling (`background-color`).

use std::collections::BTreeMap;

/// Property → value. An empty value means "clear this property".
pub type StyleMap = BTreeMap<String, String>;

/// Convert an internal style key to its CSS property name.
///
/// Keys that already contain a dash are returned as-is, so CSS custom
/// properties (`--brand`) and kebab-case input pass through untouched.
pub fn style_key_to_css(key: &str) -> String {
    if key.contains('-') {
        return key.to_string();
    }

    let mut css = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            // A leading capital is a vendor prefix: WebkitTransform -> -webkit-transform
            css.push('-');
            css.push(ch.to_ascii_lowercase());
        } else {
            css.push(ch);
        }
    }
    css
}

/// Convert a CSS property name back to the internal camelCase key.
pub fn css_to_style_key(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }

    let trimmed = property.strip_prefix('-').unwrap_or(property);
    let mut key = String::with_capacity(trimmed.len());
    let mut upper_next = property.starts_with('-');
    for ch in trimmed.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            key.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            key.push(ch);
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_to_kebab() {
        assert_eq!(style_key_to_css("backgroundColor"), "background-color");
        assert_eq!(style_key_to_css("width"), "width");
        assert_eq!(style_key_to_css("borderTopLeftRadius"), "border-top-left-radius");
        assert_eq!(style_key_to_css("WebkitTransform"), "-webkit-transform");
    }

    #[test]
    fn test_kebab_passthrough() {
        assert_eq!(style_key_to_css("background-color"), "background-color");
        assert_eq!(style_key_to_css("--brand-color"), "--brand-color");
    }

    #[test]
    fn test_kebab_to_camel() {
        assert_eq!(css_to_style_key("background-color"), "backgroundColor");
        assert_eq!(css_to_style_key("-webkit-transform"), "WebkitTransform");
        assert_eq!(css_to_style_key("--brand"), "--brand");
        assert_eq!(css_to_style_key("color"), "color");
    }
}
