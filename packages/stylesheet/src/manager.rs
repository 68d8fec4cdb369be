use crate::ast::{Rule, StyleRule, Stylesheet};
use crate::error::Result;
use crate::parser::parse;
use std::collections::BTreeSet;
use trellis_models::{css_to_style_key, style_key_to_css, StyleMap, DOM_ID_ATTRIBUTE};
use tracing::{debug, trace};

/// Owns the synthetic stylesheet of one preview surface.
///
/// Every edit goes through the parsed AST and the whole sheet is serialized
/// back afterwards; the caller writes the returned text into the surface's
/// style element.
#[derive(Debug, Clone, Default)]
pub struct StylesheetManager {
    sheet: Stylesheet,
    /// Selectors whose only rule was added by this manager.
    created: BTreeSet<String>,
}

impl StylesheetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing stylesheet text.
    pub fn from_css(css: &str) -> Result<Self> {
        Ok(Self {
            sheet: parse(css)?,
            created: BTreeSet::new(),
        })
    }

    /// Selector addressing one element by its dom id.
    pub fn selector_for(dom_id: &str) -> String {
        format!("[{}=\"{}\"]", DOM_ID_ATTRIBUTE, dom_id)
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.sheet
    }

    pub fn css(&self) -> String {
        self.sheet.to_string()
    }

    /// Set (or with an empty `value`, clear) one property on `dom_id`.
    ///
    /// `property` may be the internal camelCase key or a CSS name. Clearing
    /// deletes the declaration and drops the rule if this manager added it
    /// and it ends up empty, so a set followed by a clear leaves the sheet as
    /// it was. Rules that came with the sheet are never dropped.
    pub fn update_style(&mut self, dom_id: &str, property: &str, value: &str) -> String {
        self.apply(dom_id, property, value);
        self.css()
    }

    pub fn update_styles(&mut self, dom_id: &str, styles: &StyleMap) -> String {
        for (property, value) in styles {
            self.apply(dom_id, property, value);
        }
        self.css()
    }

    fn apply(&mut self, dom_id: &str, property: &str, value: &str) {
        let selector = Self::selector_for(dom_id);
        let property = style_key_to_css(property);
        let value = value.trim();

        if self.sheet.find(&selector).is_empty() {
            if value.is_empty() {
                trace!(dom_id, property = %property, "nothing to clear");
                return;
            }
            let mut rule = StyleRule::new(selector.clone());
            rule.set(&property, value);
            self.sheet.rules.push(Rule::Style(rule));
            self.created.insert(selector);
            debug!(dom_id, property = %property, "created override rule");
            return;
        }

        for rule in self.sheet.find_mut(&selector) {
            if value.is_empty() {
                rule.remove(&property);
            } else {
                rule.set(&property, value);
            }
        }

        if value.is_empty() && self.created.contains(&selector) {
            self.sheet.prune_empty(&selector);
            if self.sheet.find(&selector).is_empty() {
                self.created.remove(&selector);
            }
        }
    }

    /// Current overrides for `dom_id`, keyed by internal style key. Later
    /// rules win.
    pub fn styles_for(&self, dom_id: &str) -> StyleMap {
        let mut styles = StyleMap::new();
        for rule in self.sheet.find(&Self::selector_for(dom_id)) {
            for declaration in &rule.declarations {
                styles.insert(css_to_style_key(&declaration.property), declaration.value.clone());
            }
        }
        styles
    }

    /// Forget every override, e.g. once the edits have reached source.
    pub fn clear(&mut self) -> String {
        self.sheet = Stylesheet::new();
        self.created.clear();
        String::new()
    }
}
