//! Binding of (resource kind, action) to a vendor CLI argument vector.
//!
//! The argument grammar belongs to the vendor CLI, so it lives in data: a
//! built-in table matching the watsonx Orchestrate ADK, overridable per kind
//! from configuration. Arguments may contain `{name}`, `{kind}`, `{file}` and
//! `{env}` placeholders; `{{` and `}}` produce literal braces.

use crate::error::TemplateError;
use crate::manifest::{ResourceDescriptor, ResourceKind};
use crate::plan::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-kind template overrides as they appear under `[templates.<kind>]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindTemplates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<String>>,
}

impl KindTemplates {
    pub fn get(&self, action: Action) -> Option<&Vec<String>> {
        match action {
            Action::Import => self.import.as_ref(),
            Action::Remove => self.remove.as_ref(),
        }
    }

    /// Overlay `other` on top of `self`, action by action
    pub fn merge(&mut self, other: KindTemplates) {
        if other.import.is_some() {
            self.import = other.import;
        }
        if other.remove.is_some() {
            self.remove = other.remove;
        }
    }
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Built-in ADK grammar for a kind and action
pub fn builtin(kind: ResourceKind, action: Action) -> Vec<String> {
    match (kind, action) {
        (ResourceKind::PythonTool, Action::Import) => {
            args(&["tools", "import", "-k", "python", "-f", "{file}"])
        }
        (ResourceKind::FlowTool, Action::Import) => {
            args(&["tools", "import", "-k", "flow", "-f", "{file}"])
        }
        (ResourceKind::OpenapiTool, Action::Import) => {
            args(&["tools", "import", "-k", "openapi", "-f", "{file}"])
        }
        (
            ResourceKind::PythonTool | ResourceKind::FlowTool | ResourceKind::OpenapiTool,
            Action::Remove,
        ) => args(&["tools", "remove", "-n", "{name}"]),
        (ResourceKind::McpToolkit, Action::Import) => {
            args(&["toolkits", "import", "--kind", "mcp", "--name", "{name}"])
        }
        (ResourceKind::McpToolkit, Action::Remove) => args(&["toolkits", "remove", "-n", "{name}"]),
        (ResourceKind::NativeAgent | ResourceKind::ExternalAgent, Action::Import) => {
            args(&["agents", "import", "-f", "{file}"])
        }
        (ResourceKind::NativeAgent, Action::Remove) => {
            args(&["agents", "remove", "-n", "{name}", "-k", "native"])
        }
        (ResourceKind::ExternalAgent, Action::Remove) => {
            args(&["agents", "remove", "-n", "{name}", "-k", "external"])
        }
        (ResourceKind::KnowledgeBase, Action::Import) => {
            args(&["knowledge-bases", "import", "-f", "{file}"])
        }
        (ResourceKind::KnowledgeBase, Action::Remove) => {
            args(&["knowledge-bases", "remove", "-n", "{name}"])
        }
    }
}

/// Template for a kind and action: the configured override, else the built-in
pub fn resolve(
    overrides: &BTreeMap<String, KindTemplates>,
    kind: ResourceKind,
    action: Action,
) -> Result<Vec<String>, TemplateError> {
    match overrides.get(kind.as_str()).and_then(|t| t.get(action)) {
        Some(template) if template.is_empty() => Err(TemplateError::MissingTemplate {
            kind: kind.to_string(),
            action: action.to_string(),
        }),
        Some(template) => Ok(template.clone()),
        None => Ok(builtin(kind, action)),
    }
}

/// Values available to placeholders
pub struct Bindings<'a> {
    owner: &'a str,
    resource: Option<&'a ResourceDescriptor>,
    environment: Option<&'a str>,
}

impl<'a> Bindings<'a> {
    pub fn for_resource(resource: &'a ResourceDescriptor, environment: Option<&'a str>) -> Self {
        Self {
            owner: &resource.name,
            resource: Some(resource),
            environment,
        }
    }

    /// Bindings for the environment activation preflight: only `{env}` resolves
    pub fn for_environment(environment: &'a str) -> Self {
        Self {
            owner: "environment activation",
            resource: None,
            environment: Some(environment),
        }
    }

    fn lookup(&self, key: &str) -> Result<String, TemplateError> {
        match (key, self.resource) {
            ("name", Some(r)) => Ok(r.name.clone()),
            ("kind", Some(r)) => Ok(r.kind.to_string()),
            ("file", Some(r)) => r
                .file
                .as_ref()
                .map(|f| f.to_string_lossy().into_owned())
                .ok_or_else(|| TemplateError::MissingFile(r.name.clone())),
            ("env", _) => self
                .environment
                .map(str::to_string)
                .ok_or_else(|| TemplateError::MissingEnvironment(self.owner.to_string())),
            _ => Err(TemplateError::UnknownPlaceholder {
                resource: self.owner.to_string(),
                placeholder: key.to_string(),
            }),
        }
    }
}

pub fn render(template: &[String], bindings: &Bindings<'_>) -> Result<Vec<String>, TemplateError> {
    template
        .iter()
        .map(|arg| render_arg(arg, bindings))
        .collect()
}

fn render_arg(arg: &str, bindings: &Bindings<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(arg.len());
    let mut chars = arg.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => key.push(ch),
                        None => return Err(TemplateError::Unterminated(arg.to_string())),
                    }
                }
                out.push_str(&bindings.lookup(key.trim())?);
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
