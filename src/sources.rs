// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Filesystem collaborators. The interpreters only see the two traits; the
//! default implementations read YAML or JSON from a list of search roots.

use crate::diagnostics::Diagnostics;
use crate::interpreter::error::RenderError;
use crate::value::Value;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use regex::Regex;

/// Maps a logical name such as `interfaces.yaml` to a file, given the kind of
/// file wanted (`templates`, `parsers`).
pub trait NeedleResolver {
    fn resolve_needle(&self, category: &str, name: &str) -> Result<PathBuf>;
}

/// Loads a structured document (directive list, fact definitions, variables).
pub trait SourceLoader {
    fn load_structured_file(&self, path: &Path) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct SearchPathResolver {
    roots: Vec<PathBuf>,
}

impl SearchPathResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl Default for SearchPathResolver {
    fn default() -> Self {
        Self::new(vec![PathBuf::from(".")])
    }
}

impl NeedleResolver for SearchPathResolver {
    fn resolve_needle(&self, category: &str, name: &str) -> Result<PathBuf> {
        let direct = PathBuf::from(name);
        if direct.is_file() {
            return Ok(direct);
        }

        // Absolute names are never searched for.
        if !direct.is_absolute() {
            for root in &self.roots {
                for candidate in [root.join(category).join(name), root.join(name)] {
                    if candidate.is_file() {
                        return Ok(candidate);
                    }
                }
            }
        }

        Err(RenderError::TemplateSourceNotFound {
            category: category.to_string(),
            name: name.to_string(),
        }
        .into())
    }
}

/// Reads `.json` files as JSON and anything else as YAML.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl SourceLoader for FileLoader {
    fn load_structured_file(&self, path: &Path) -> Result<Value> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Value::from_json_file(path),
            _ => Value::from_yaml_file(path),
        }
    }
}

/// Compiles an include/exclude pattern list. A single string is a one element
/// list; null or undefined is empty.
pub fn match_list(patterns: &Value, context: &str) -> Result<Vec<Regex>> {
    let patterns = match patterns {
        Value::Null | Value::Undefined => return Ok(vec![]),
        Value::String(_) => vec![patterns.clone()],
        Value::Array(items) => items.as_ref().clone(),
        _ => {
            return Err(RenderError::MalformedMatchList {
                context: context.to_string(),
            }
            .into())
        }
    };

    let mut regexes = Vec::with_capacity(patterns.len());
    for p in &patterns {
        match p {
            Value::String(p) => regexes.push(compile(p)?),
            _ => {
                return Err(RenderError::MalformedMatchList {
                    context: context.to_string(),
                }
                .into())
            }
        }
    }
    Ok(regexes)
}

fn compile(pattern: &str) -> Result<Regex> {
    match Regex::new(pattern) {
        Ok(r) => Ok(r),
        Err(e) => Err(RenderError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        }
        .into()),
    }
}

/// Lists the template files in `dir` in name order, honoring exclude
/// patterns first and include patterns second. Both are matched against the
/// file's base name.
pub fn discover_sources(
    dir: &Path,
    include: &Value,
    exclude: &Value,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RenderError::InvalidSourceDir {
            path: dir.display().to_string(),
        }
        .into());
    }

    let include = match_list(include, "include")?;
    let exclude = match_list(exclude, "exclude")?;

    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => bail!("Failed to read {}. {e}", dir.display()),
    };
    files.sort();

    let mut sources = vec![];
    for path in files {
        let base = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        if exclude.iter().any(|r| r.is_match(&base)) {
            diagnostics.warning(format!("excluding file {}", path.display()));
        } else if !include.is_empty() && !include.iter().any(|r| r.is_match(&base)) {
            diagnostics.warning(format!("skipping file {}", path.display()));
        } else {
            sources.push(path);
        }
    }
    Ok(sources)
}
