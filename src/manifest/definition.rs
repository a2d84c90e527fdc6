//! Data structures for manifest entries.
//!
//! These types define the schema of a single `[[resource]]` table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Kind of platform resource a manifest entry manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    PythonTool,
    FlowTool,
    OpenapiTool,
    McpToolkit,
    NativeAgent,
    ExternalAgent,
    KnowledgeBase,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::PythonTool,
        ResourceKind::FlowTool,
        ResourceKind::OpenapiTool,
        ResourceKind::McpToolkit,
        ResourceKind::NativeAgent,
        ResourceKind::ExternalAgent,
        ResourceKind::KnowledgeBase,
    ];

    /// Name used in manifests, config template tables and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::PythonTool => "python_tool",
            ResourceKind::FlowTool => "flow_tool",
            ResourceKind::OpenapiTool => "openapi_tool",
            ResourceKind::McpToolkit => "mcp_toolkit",
            ResourceKind::NativeAgent => "native_agent",
            ResourceKind::ExternalAgent => "external_agent",
            ResourceKind::KnowledgeBase => "knowledge_base",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown resource kind '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// One manageable unit: a tool, toolkit, agent or knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDescriptor {
    pub name: String,

    pub kind: ResourceKind,

    /// Resources that must exist before this one is imported
    #[serde(default, alias = "dependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Source file, relative to the manifest directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Extra arguments appended to the import command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra arguments appended to the remove command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_args: Vec<String>,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            depends_on: Vec::new(),
            file: None,
            args: Vec::new(),
            remove_args: Vec::new(),
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}
