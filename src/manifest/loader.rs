//! Manifest file reading and parsing.
//!
//! `.json` files are parsed as JSON, everything else as TOML.

use super::definition::ResourceDescriptor;
use crate::error::{LifecycleError, Result};
use serde::Deserialize;
use std::path::Path;

/// On-disk shape of a manifest before validation
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawManifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "resource", alias = "resources")]
    pub resources: Vec<ResourceDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ManifestFormat::Json,
            _ => ManifestFormat::Toml,
        }
    }
}

pub(super) fn read(path: &Path) -> Result<RawManifest> {
    let contents = std::fs::read_to_string(path).map_err(|source| LifecycleError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&contents, ManifestFormat::from_path(path)).map_err(|reason| {
        LifecycleError::ManifestParse {
            path: path.to_path_buf(),
            reason,
        }
    })
}

pub(super) fn parse(
    contents: &str,
    format: ManifestFormat,
) -> std::result::Result<RawManifest, String> {
    match format {
        ManifestFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
        ManifestFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
    }
}
