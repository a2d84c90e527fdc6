use crate::error::{LifecycleError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Check that a variable name is usable in a process environment
pub fn validate_env_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(LifecycleError::InvalidConfig(format!(
            "Invalid environment variable name: '{}'",
            key
        )))
    }
}

/// Parse `KEY=VALUE` pairs from CLI arguments
pub fn parse_env_args(env_args: &[String]) -> Result<BTreeMap<String, String>> {
    let mut env_vars = BTreeMap::new();

    for arg in env_args {
        if let Some((key, value)) = arg.split_once('=') {
            validate_env_key(key)?;
            env_vars.insert(key.to_string(), value.to_string());
        } else {
            return Err(LifecycleError::InvalidConfig(format!(
                "Invalid variable format: {}. Expected KEY=VALUE",
                arg
            )));
        }
    }

    Ok(env_vars)
}

/// Load `KEY=VALUE` lines from a dotenv-style file
pub fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        LifecycleError::InvalidConfig(format!("Failed to read env file {}: {}", path.display(), e))
    })?;

    let mut env_vars = BTreeMap::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            validate_env_key(key)?;
            env_vars.insert(key.to_string(), unquote(value.trim()).to_string());
        } else {
            return Err(LifecycleError::InvalidConfig(format!(
                "Invalid env format at {}:{}: {}",
                path.display(),
                line_num + 1,
                line
            )));
        }
    }

    Ok(env_vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
