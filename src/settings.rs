// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::directive::MissingKeyPolicy;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Engine-wide defaults. Every field is optional in a settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Emit warning-level diagnostics for skipped loops, lines and files.
    pub action_warnings: bool,

    /// Policy used by `lines` directives that do not set `missing_key`.
    pub default_missing_key: String,

    /// Delimiter used by `join: true` directives without `join_delimiter`.
    pub default_join_delimiter: String,

    /// Roots searched when resolving template and parser names.
    pub search_paths: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            action_warnings: true,
            default_missing_key: MissingKeyPolicy::Warn.to_string(),
            default_join_delimiter: " ".to_string(),
            search_paths: vec![PathBuf::from(".")],
        }
    }
}

impl Settings {
    /// Parses settings from YAML. JSON documents are valid YAML and are
    /// accepted too.
    pub fn from_yaml_str(yaml: &str) -> Result<Settings> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() -> Result<()> {
        let settings = Settings::from_yaml_str("default_missing_key: fail\n")?;
        assert_eq!(settings.default_missing_key, "fail");
        assert_eq!(settings.default_join_delimiter, " ");
        assert!(settings.action_warnings);
        assert_eq!(settings.search_paths, vec![PathBuf::from(".")]);
        Ok(())
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(Settings::from_yaml_str("config_indent: 2\n").is_err());
    }
}
