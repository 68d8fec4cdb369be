//! Replay script format.
//!
//! ```json
//! {
//!   "surface": "frame-1",
//!   "document": { "tagName": "main", "domId": "main", "oid": "page", "children": [] },
//!   "templateNodes": [ { "oid": "page", "path": "app/page.tsx", "range": { ... } } ],
//!   "instances": [],
//!   "steps": [
//!     { "step": "run", "action": { "type": "update-style", "targets": [ ... ] } },
//!     { "step": "undo" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use trellis_models::{Action, ActionElement, TemplateNode};
use trellis_template_nodes::{InMemoryInstanceResolver, InMemoryTemplateSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub surface: String,
    pub document: ActionElement,
    #[serde(default)]
    pub template_nodes: Vec<TemplateNode>,
    #[serde(default)]
    pub instances: Vec<InstanceEntry>,
    pub steps: Vec<Step>,
}

/// `instance` is the call site of the `index`th `child` inside `parent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceEntry {
    pub parent: String,
    pub child: String,
    pub index: usize,
    pub instance: TemplateNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum Step {
    Run { action: Action },
    Undo,
    Redo,
    StartTransaction,
    CommitTransaction,
}

impl Step {
    pub fn label(&self) -> String {
        match self {
            Step::Run { action } => format!("run {}", action.kind()),
            Step::Undo => "undo".into(),
            Step::Redo => "redo".into(),
            Step::StartTransaction => "start transaction".into(),
            Step::CommitTransaction => "commit transaction".into(),
        }
    }
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid script {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn template_source(&self) -> InMemoryTemplateSource {
        self.template_nodes.iter().cloned().collect()
    }

    pub fn instance_resolver(&self) -> InMemoryInstanceResolver {
        let mut resolver = InMemoryInstanceResolver::new();
        for entry in &self.instances {
            resolver.insert(
                entry.parent.clone(),
                entry.child.clone(),
                entry.index,
                entry.instance.clone(),
            );
        }
        resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../demos/insert-and-undo.json");

    #[test]
    fn test_parse_demo_script() {
        let script = Script::parse(DEMO).unwrap();
        assert_eq!(script.surface, "frame-1");
        assert_eq!(script.document.children.len(), 2);
        assert_eq!(script.template_nodes.len(), 3);

        let labels: Vec<String> = script.steps.iter().map(Step::label).collect();
        assert_eq!(
            labels,
            vec![
                "run insert-element",
                "start transaction",
                "run update-style",
                "run update-style",
                "commit transaction",
                "undo",
                "undo",
                "redo",
            ]
        );
    }

    #[test]
    fn test_unknown_step_rejected() {
        let text = r#"{
            "surface": "f",
            "document": { "tagName": "div", "domId": "root" },
            "steps": [ { "step": "rewind" } ]
        }"#;
        assert!(Script::parse(text).is_err());
    }
}
