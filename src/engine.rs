// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::directive::{Directive, MissingKeyPolicy};
use crate::facts::{tag_set, FactDefinition, FactExtractor};
use crate::interpreter::Interpreter;
use crate::netconfig::ConfigModel;
use crate::scope::Env;
use crate::settings::Settings;
use crate::sources::*;
use crate::value::*;

use std::convert::AsRef;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

/// Output of a render call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rendered {
    pub lines: Vec<String>,
    /// `lines` joined with newlines.
    pub text: String,
    /// Template files used, in the order they were loaded.
    pub included_files: Vec<PathBuf>,
}

impl Rendered {
    fn new(lines: Vec<String>, included_files: Vec<PathBuf>) -> Self {
        Self {
            text: lines.join("\n"),
            lines,
            included_files,
        }
    }
}

/// Renders configuration templates and extracts facts from configuration
/// text.
pub struct Engine {
    settings: Settings,
    resolver: Box<dyn NeedleResolver>,
    loader: Box<dyn SourceLoader>,
    variables: Value,
    diagnostics: Diagnostics,
}

/// Create a default engine.
impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            resolver: Box::new(SearchPathResolver::new(settings.search_paths.clone())),
            loader: Box::new(FileLoader),
            variables: Value::new_object(),
            diagnostics: Diagnostics::new(settings.action_warnings),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_resolver(&mut self, resolver: Box<dyn NeedleResolver>) {
        self.resolver = resolver;
    }

    pub fn set_loader(&mut self, loader: Box<dyn SourceLoader>) {
        self.loader = loader;
    }

    /// Replaces the search roots and the resolver built from them.
    pub fn set_search_paths(&mut self, paths: Vec<PathBuf>) {
        self.resolver = Box::new(SearchPathResolver::new(paths.clone()));
        self.settings.search_paths = paths;
    }

    pub fn set_action_warnings(&mut self, enabled: bool) {
        self.settings.action_warnings = enabled;
        self.diagnostics.set_warnings_enabled(enabled);
    }

    pub fn set_default_missing_key(&mut self, policy: &str) -> Result<()> {
        policy.parse::<MissingKeyPolicy>()?;
        self.settings.default_missing_key = policy.to_string();
        Ok(())
    }

    pub fn set_default_join_delimiter(&mut self, delimiter: &str) {
        self.settings.default_join_delimiter = delimiter.to_string();
    }

    pub fn clear_variables(&mut self) {
        self.variables = Value::new_object();
    }

    /// Adds top-level variables. Names already present are replaced, so
    /// private variables added after host facts take precedence.
    pub fn add_variables(&mut self, variables: Value) -> Result<()> {
        let variables = variables.ensure_object("variables")?;
        let map = self.variables.as_object_mut()?;
        for (name, value) in variables.as_object()?.iter() {
            map.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    pub fn add_variables_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let variables = self.loader.load_structured_file(path.as_ref())?;
        self.add_variables(variables)
    }

    pub fn variables(&self) -> &Value {
        &self.variables
    }

    /// Environment holding the engine's variables.
    pub fn env(&self) -> Result<Env> {
        Env::from_value(self.variables.clone())
    }

    pub fn render(&mut self, directives: &[Directive], env: &Env) -> Result<Rendered> {
        let mut interpreter = Interpreter::new(
            self.resolver.as_ref(),
            self.loader.as_ref(),
            &self.settings,
            &mut self.diagnostics,
        );
        let lines = interpreter.render(directives, env)?;
        let included_files = interpreter.take_included_files();
        Ok(Rendered::new(lines, included_files))
    }

    /// Resolves `name` as a template and renders it with the engine's
    /// variables.
    pub fn render_file(&mut self, name: &str) -> Result<Rendered> {
        let path = self.resolver.resolve_needle("templates", name)?;
        self.render_paths(vec![path])
    }

    /// Renders every template in `dir`, in file name order, as one document.
    pub fn render_directory<P: AsRef<Path>>(
        &mut self,
        dir: P,
        include: &Value,
        exclude: &Value,
    ) -> Result<Rendered> {
        let paths = discover_sources(dir.as_ref(), include, exclude, &mut self.diagnostics)?;
        self.render_paths(paths)
    }

    fn render_paths(&mut self, paths: Vec<PathBuf>) -> Result<Rendered> {
        let env = self.env()?;
        let mut lines = vec![];
        let mut included_files = vec![];

        for path in paths {
            self.diagnostics
                .info(format!("including file {}", path.display()));
            let directives = Directive::list_from_value(&self.loader.load_structured_file(&path)?)?;
            included_files.push(path);

            let mut rendered = self.render(&directives, &env)?;
            lines.append(&mut rendered.lines);
            included_files.append(&mut rendered.included_files);
        }

        Ok(Rendered::new(lines, included_files))
    }

    /// Extracts facts from `text`. With non-empty `tags`, only definitions
    /// tagged exactly so are run.
    pub fn parse(&mut self, definitions: &[FactDefinition], text: &str, tags: &[&str]) -> Result<Value> {
        let tags = tag_set(&Value::from(
            tags.iter().map(|t| Value::from(*t)).collect::<Vec<_>>(),
        ));
        let model = ConfigModel::parse(text);
        FactExtractor::new(&mut self.diagnostics).extract(definitions, text, &model, &tags)
    }

    /// Resolves `name` as a parser and extracts facts from `text` with it.
    pub fn parse_file(&mut self, name: &str, text: &str, tags: &[&str]) -> Result<Value> {
        let path = self.resolver.resolve_needle("parsers", name)?;
        let definitions = FactDefinition::list_from_value(&self.loader.load_structured_file(&path)?)?;
        self.parse(&definitions, text, tags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }
}
