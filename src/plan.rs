//! Execution plans: a manifest in dependency order with every step already
//! bound to its command line.
//!
//! Binding happens up front so that a bad template or a resource missing its
//! `file` stops the run before the first command is issued.

use crate::config::Config;
use crate::error::Result;
use crate::manifest::{Manifest, ResourceDescriptor};
use crate::orderer::DependencyOrderer;
use crate::runner::CommandLine;
use crate::template::{self, Bindings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Import,
    Remove,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Import => "import",
            Action::Remove => "remove",
        }
    }

    /// Progressive form used in progress lines
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Import => "Importing",
            Action::Remove => "Removing",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub descriptor: ResourceDescriptor,
    pub command: CommandLine,
}

#[derive(Debug, Clone)]
pub struct Plan {
    action: Action,
    steps: Vec<PlannedStep>,
    preflight: Option<CommandLine>,
    working_dir: PathBuf,
    manifest_name: Option<String>,
}

impl Plan {
    /// Order the manifest for `action` and bind every resource to its command
    pub fn build(manifest: &Manifest, action: Action, config: &Config) -> Result<Self> {
        let environment = config.cli.environment.as_deref();
        let order = DependencyOrderer::new(manifest.resources()).order_for(action)?;

        let mut steps = Vec::with_capacity(order.len());
        for resource in order {
            let template = template::resolve(&config.templates, resource.kind, action)?;
            let bindings = Bindings::for_resource(resource, environment);
            let mut args = template::render(&template, &bindings)?;
            match action {
                Action::Import => args.extend(resource.args.iter().cloned()),
                Action::Remove => args.extend(resource.remove_args.iter().cloned()),
            }

            steps.push(PlannedStep {
                descriptor: resource.clone(),
                command: CommandLine::new(&config.cli.program, args),
            });
        }

        // Nothing to run means nothing to activate
        let preflight = match environment {
            Some(env) if !steps.is_empty() && !config.cli.activate.is_empty() => {
                let args = template::render(&config.cli.activate, &Bindings::for_environment(env))?;
                Some(CommandLine::new(&config.cli.program, args))
            }
            _ => None,
        };

        Ok(Self {
            action,
            steps,
            preflight,
            working_dir: manifest.base_dir().to_path_buf(),
            manifest_name: manifest.name().map(str::to_string),
        })
    }

    /// Assemble a plan from already-bound steps
    pub fn from_steps(
        action: Action,
        steps: Vec<PlannedStep>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            action,
            steps,
            preflight: None,
            working_dir: working_dir.into(),
            manifest_name: None,
        }
    }

    pub fn with_preflight(mut self, preflight: Option<CommandLine>) -> Self {
        self.preflight = preflight;
        self
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// Environment activation to run before the first step
    pub fn preflight(&self) -> Option<&CommandLine> {
        self.preflight.as_ref()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn manifest_name(&self) -> Option<&str> {
        self.manifest_name.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
