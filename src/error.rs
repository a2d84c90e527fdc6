use std::path::PathBuf;
use thiserror::Error;

/// Problems found while loading or validating a manifest.
///
/// All of these are detected before any external command runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Resource #{0} has an empty name")]
    EmptyName(usize),

    #[error("Resource '{0}' is declared more than once")]
    DuplicateName(String),

    #[error("Resource '{resource}' depends on unknown resource '{dependency}'")]
    UnknownDependency {
        resource: String,
        dependency: String,
    },

    #[error("Cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Selected resource '{0}' is not declared in the manifest")]
    UnknownResource(String),
}

/// Problems binding a resource to a vendor command line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("No {action} template configured for kind '{kind}'")]
    MissingTemplate { kind: String, action: String },

    #[error("Unknown placeholder '{{{placeholder}}}' in template for '{resource}'")]
    UnknownPlaceholder {
        resource: String,
        placeholder: String,
    },

    #[error("Unterminated placeholder in template argument '{0}'")]
    Unterminated(String),

    #[error("Resource '{0}' has no 'file' but its template uses {{file}}")]
    MissingFile(String),

    #[error("Template for '{0}' uses {{env}} but no environment is active")]
    MissingEnvironment(String),
}

/// The external program could not be spawned at all.
///
/// Kept separate from a non-zero exit: the program never ran.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to launch '{program}': {reason}")]
pub struct LaunchError {
    pub program: String,
    pub reason: String,
}

impl LaunchError {
    pub fn new(program: &str, err: &std::io::Error) -> Self {
        let reason = match err.kind() {
            std::io::ErrorKind::NotFound => "program not found".to_string(),
            std::io::ErrorKind::PermissionDenied => "permission denied".to_string(),
            _ => err.to_string(),
        };
        Self {
            program: program.to_string(),
            reason,
        }
    }
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Invalid command template: {0}")]
    Template(#[from] TemplateError),

    #[error("Cannot read manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot parse manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("Sequencer already ran; create a new one for each run")]
    SequencerReused,
}

impl LifecycleError {
    /// Process exit code for this error.
    ///
    /// `2` for anything that stops a run before the first command is issued
    /// (manifest, template and configuration problems), `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            LifecycleError::Manifest(_)
            | LifecycleError::Template(_)
            | LifecycleError::ManifestRead { .. }
            | LifecycleError::ManifestParse { .. }
            | LifecycleError::ConfigParse(_)
            | LifecycleError::InvalidConfig(_) => 2,
            LifecycleError::Json(_)
            | LifecycleError::Io(_)
            | LifecycleError::Launch(_)
            | LifecycleError::SequencerReused => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
