//! Stylesheet AST and compact serialization.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// Selector text with whitespace collapsed.
    pub prelude: String,
    pub declarations: Vec<Declaration>,
}

impl StyleRule {
    pub fn new(prelude: impl Into<String>) -> Self {
        Self {
            prelude: normalize_prelude(&prelude.into()),
            declarations: Vec::new(),
        }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|d| d.property == property)
            .map(|d| d.value.as_str())
    }

    /// Set or replace `property`. Returns true if anything changed.
    pub fn set(&mut self, property: &str, value: &str) -> bool {
        match self.declarations.iter_mut().find(|d| d.property == property) {
            Some(existing) if existing.value == value => false,
            Some(existing) => {
                existing.value = value.to_string();
                true
            }
            None => {
                self.declarations.push(Declaration::new(property, value));
                true
            }
        }
    }

    /// Remove every declaration of `property`. Returns true if one existed.
    pub fn remove(&mut self, property: &str) -> bool {
        let before = self.declarations.len();
        self.declarations.retain(|d| d.property != property);
        self.declarations.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtBlock {
    Rules(Vec<Rule>),
    Declarations(Vec<Declaration>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub name: String,
    pub prelude: String,
    pub block: Option<AtBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Style(StyleRule),
    At(AtRule),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All style rules whose prelude equals `selector`, including rules
    /// nested in conditional at-rules. Matching is textual, not by
    /// specificity.
    pub fn find(&self, selector: &str) -> Vec<&StyleRule> {
        let selector = normalize_prelude(selector);
        let mut found = Vec::new();
        collect(&self.rules, &selector, &mut found);
        found
    }

    pub fn find_mut(&mut self, selector: &str) -> Vec<&mut StyleRule> {
        let selector = normalize_prelude(selector);
        let mut found = Vec::new();
        collect_mut(&mut self.rules, &selector, &mut found);
        found
    }

    /// Drop style rules for `selector` that no longer hold any declaration.
    pub fn prune_empty(&mut self, selector: &str) {
        let selector = normalize_prelude(selector);
        prune(&mut self.rules, &selector);
    }
}

fn collect<'a>(rules: &'a [Rule], selector: &str, found: &mut Vec<&'a StyleRule>) {
    for rule in rules {
        match rule {
            Rule::Style(style) if style.prelude == selector => found.push(style),
            Rule::Style(_) => {}
            Rule::At(AtRule {
                block: Some(AtBlock::Rules(nested)),
                ..
            }) => collect(nested, selector, found),
            Rule::At(_) => {}
        }
    }
}

fn collect_mut<'a>(rules: &'a mut [Rule], selector: &str, found: &mut Vec<&'a mut StyleRule>) {
    for rule in rules {
        match rule {
            Rule::Style(style) if style.prelude == selector => found.push(style),
            Rule::Style(_) => {}
            Rule::At(AtRule {
                block: Some(AtBlock::Rules(nested)),
                ..
            }) => collect_mut(nested, selector, found),
            Rule::At(_) => {}
        }
    }
}

fn prune(rules: &mut Vec<Rule>, selector: &str) {
    rules.retain_mut(|rule| match rule {
        Rule::Style(style) => !(style.prelude == selector && style.declarations.is_empty()),
        Rule::At(AtRule {
            block: Some(AtBlock::Rules(nested)),
            ..
        }) => {
            prune(nested, selector);
            true
        }
        Rule::At(_) => true,
    });
}

/// Collapse runs of whitespace to one space and trim.
pub fn normalize_prelude(prelude: &str) -> String {
    prelude.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn write_declarations(f: &mut fmt::Formatter<'_>, declarations: &[Declaration]) -> fmt::Result {
    for (i, declaration) in declarations.iter().enumerate() {
        if i > 0 {
            write!(f, ";")?;
        }
        write!(f, "{}:{}", declaration.property, declaration.value)?;
    }
    Ok(())
}

impl fmt::Display for StyleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.prelude)?;
        write_declarations(f, &self.declarations)?;
        write!(f, "}}")
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Style(style) => write!(f, "{}", style),
            Rule::At(at) => {
                write!(f, "@{}", at.name)?;
                if !at.prelude.is_empty() {
                    write!(f, " {}", at.prelude)?;
                }
                match &at.block {
                    None => write!(f, ";"),
                    Some(AtBlock::Declarations(declarations)) => {
                        write!(f, "{{")?;
                        write_declarations(f, declarations)?;
                        write!(f, "}}")
                    }
                    Some(AtBlock::Rules(rules)) => {
                        write!(f, "{{")?;
                        for rule in rules {
                            write!(f, "{}", rule)?;
                        }
                        write!(f, "}}")
                    }
                }
            }
        }
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            write!(f, "{}", rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_compact() {
        let mut rule = StyleRule::new(".a   >  .b");
        rule.set("color", "red");
        rule.set("width", "10px");

        let sheet = Stylesheet {
            rules: vec![Rule::Style(rule)],
        };
        assert_eq!(sheet.to_string(), ".a > .b{color:red;width:10px}");
    }

    #[test]
    fn test_set_reports_changes() {
        let mut rule = StyleRule::new("a");
        assert!(rule.set("color", "red"));
        assert!(!rule.set("color", "red"));
        assert!(rule.set("color", "blue"));
        assert_eq!(rule.get("color"), Some("blue"));
        assert!(rule.remove("color"));
        assert!(!rule.remove("color"));
    }

    #[test]
    fn test_find_includes_nested() {
        let mut inner = StyleRule::new("a");
        inner.set("color", "red");
        let sheet = Stylesheet {
            rules: vec![
                Rule::Style(StyleRule::new("a")),
                Rule::At(AtRule {
                    name: "media".into(),
                    prelude: "print".into(),
                    block: Some(AtBlock::Rules(vec![Rule::Style(inner)])),
                }),
            ],
        };

        assert_eq!(sheet.find("a").len(), 2);
        assert!(sheet.find("b").is_empty());
    }
}
