// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use log::{debug, info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Progress notices such as `including file ...`.
    Info,
    /// Skipped content the author most likely wants to know about.
    Warning,
    /// Conditional skips. Only interesting when debugging a template.
    Verbose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

/// Non-fatal side channel. Every entry is also forwarded to the `log` facade.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    warnings_enabled: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Diagnostics {
    pub fn new(warnings_enabled: bool) -> Self {
        Self {
            entries: vec![],
            warnings_enabled,
        }
    }

    pub fn set_warnings_enabled(&mut self, enabled: bool) {
        self.warnings_enabled = enabled;
    }

    pub fn info(&mut self, message: String) {
        info!("{message}");
        self.push(Level::Info, message);
    }

    pub fn warning(&mut self, message: String) {
        if self.warnings_enabled {
            warn!("{message}");
            self.push(Level::Warning, message);
        }
    }

    pub fn verbose(&mut self, message: String) {
        debug!("{message}");
        self.push(Level::Verbose, message);
    }

    fn push(&mut self, level: Level, message: String) {
        self.entries.push(Diagnostic { level, message });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.level == Level::Warning)
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        core::mem::take(&mut self.entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
