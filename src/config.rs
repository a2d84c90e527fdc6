use crate::cli::RunFlags;
use crate::error::{LifecycleError, Result};
use crate::manifest::ResourceKind;
use crate::plan::Action;
use crate::sequencer::{FailurePolicy, DEFAULT_MISSING_OK};
use crate::template::KindTemplates;
use crate::utils::env;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// File name looked up next to the manifest and in the home directory
pub const CONFIG_FILE_NAME: &str = ".wxo-lifecycle.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub cli: CliConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    /// Per-kind command template overrides, keyed by kind name
    #[serde(default)]
    pub templates: BTreeMap<String, KindTemplates>,

    /// Verbose mode (not stored in config file)
    #[serde(skip)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Vendor CLI executable
    #[serde(default = "default_program")]
    pub program: String,

    /// Orchestrate environment to activate before a run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Arguments that activate `{env}`; empty disables activation
    #[serde(default = "default_activate")]
    pub activate: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Extra variables exported to every command
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            environment: None,
            activate: default_activate(),
            timeout_secs: None,
            vars: BTreeMap::new(),
        }
    }
}

impl CliConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_program() -> String {
    "orchestrate".to_string()
}

fn default_activate() -> Vec<String> {
    vec!["env".to_string(), "activate".to_string(), "{env}".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<FailurePolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<FailurePolicy>,

    /// Output fragments that mean a remove target is already gone
    #[serde(default = "default_missing_ok")]
    pub missing_ok: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            import: None,
            remove: None,
            missing_ok: default_missing_ok(),
        }
    }
}

impl PolicyConfig {
    /// Configured policy for `action`, falling back to the action's default
    pub fn for_action(&self, action: Action) -> FailurePolicy {
        let configured = match action {
            Action::Import => self.import,
            Action::Remove => self.remove,
        };
        configured.unwrap_or_else(|| FailurePolicy::default_for(action))
    }
}

fn default_missing_ok() -> Vec<String> {
    DEFAULT_MISSING_OK.iter().map(|p| p.to_string()).collect()
}

impl Config {
    /// Load configuration with precedence:
    /// 1. CLI flags (applied later via with_run_overrides)
    /// 2. Environment variables
    /// 3. Project config (.wxo-lifecycle.toml next to the manifest)
    /// 4. Global config (~/.wxo-lifecycle.toml)
    /// 5. Built-in defaults
    pub fn load(project_dir: &Path) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load global config
        if let Some(global_config) = global_config_path() {
            if global_config.exists() {
                tracing::debug!(path = %global_config.display(), "loading global config");
                config = config.merge(Self::from_file(&global_config)?);
            }
        }

        // 2. Load project config
        let project_config = project_dir.join(CONFIG_FILE_NAME);
        if project_config.exists() {
            tracing::debug!(path = %project_config.display(), "loading project config");
            config = config.merge(Self::from_file(&project_config)?);
        }

        // 3. Apply environment variables
        config = config.merge_env()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(mut self, other: Self) -> Self {
        // CLI settings
        if other.cli.program != default_program() {
            self.cli.program = other.cli.program;
        }
        if other.cli.environment.is_some() {
            self.cli.environment = other.cli.environment;
        }
        if other.cli.activate != default_activate() {
            self.cli.activate = other.cli.activate;
        }
        if other.cli.timeout_secs.is_some() {
            self.cli.timeout_secs = other.cli.timeout_secs;
        }
        self.cli.vars.extend(other.cli.vars);

        // Policy
        if other.policy.import.is_some() {
            self.policy.import = other.policy.import;
        }
        if other.policy.remove.is_some() {
            self.policy.remove = other.policy.remove;
        }
        // A configured list replaces the defaults; `[]` turns the tolerance off
        if other.policy.missing_ok != default_missing_ok() {
            self.policy.missing_ok = other.policy.missing_ok;
        }

        // Templates (merge per kind and action)
        for (kind, templates) in other.templates {
            self.templates.entry(kind).or_default().merge(templates);
        }

        self
    }

    /// Apply environment variable overrides
    fn merge_env(mut self) -> Result<Self> {
        if let Ok(program) = std::env::var("WXO_LIFECYCLE_PROGRAM") {
            if !program.is_empty() {
                self.cli.program = program;
            }
        }

        if let Ok(environment) = std::env::var("WXO_LIFECYCLE_ENV") {
            if !environment.is_empty() {
                self.cli.environment = Some(environment);
            }
        }

        if let Ok(timeout) = std::env::var("WXO_LIFECYCLE_TIMEOUT") {
            let secs = timeout.parse::<u64>().map_err(|_| {
                LifecycleError::InvalidConfig(format!(
                    "WXO_LIFECYCLE_TIMEOUT must be a number of seconds, got '{}'",
                    timeout
                ))
            })?;
            self.cli.timeout_secs = Some(secs);
        }

        Ok(self)
    }

    /// Apply run flags (highest precedence)
    pub fn with_run_overrides(mut self, flags: &RunFlags, verbose: bool) -> Result<Self> {
        self.verbose = verbose;

        if let Some(program) = &flags.program {
            self.cli.program = program.clone();
        }
        if let Some(environment) = &flags.environment {
            self.cli.environment = Some(environment.clone());
        }
        if let Some(timeout) = flags.timeout {
            self.cli.timeout_secs = Some(timeout);
        }

        // Env files first so that --var wins over them
        for path in &flags.env_files {
            self.cli.vars.extend(env::load_env_file(path)?);
        }
        self.cli.vars.extend(env::parse_env_args(&flags.vars)?);

        self.validate()?;
        Ok(self)
    }

    /// Check values that TOML alone cannot constrain
    pub fn validate(&self) -> Result<()> {
        if self.cli.program.trim().is_empty() {
            return Err(LifecycleError::InvalidConfig(
                "cli.program must not be empty".to_string(),
            ));
        }

        if self.cli.timeout_secs == Some(0) {
            return Err(LifecycleError::InvalidConfig(
                "cli.timeout_secs must be greater than zero".to_string(),
            ));
        }

        for kind in self.templates.keys() {
            ResourceKind::from_str(kind).map_err(|e| {
                LifecycleError::InvalidConfig(format!("[templates.{}]: {}", kind, e))
            })?;
        }

        for key in self.cli.vars.keys() {
            env::validate_env_key(key)?;
        }

        Ok(())
    }
}

/// Get the home directory
pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

pub fn global_config_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}
