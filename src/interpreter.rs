// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod error;
pub mod loops;

use crate::diagnostics::Diagnostics;
use crate::directive::*;
use crate::scope::Env;
use crate::settings::Settings;
use crate::sources::{NeedleResolver, SourceLoader};
use crate::templater::{self, OMIT_PLACEHOLDER};
use crate::value::Value;

use error::RenderError;

use std::path::PathBuf;

use anyhow::Result;
use log::debug;

/// Renders directive trees into configuration lines.
///
/// The interpreter borrows everything it needs for one render call. Includes
/// are resolved and loaded synchronously through the two collaborators.
pub struct Interpreter<'a> {
    resolver: &'a dyn NeedleResolver,
    loader: &'a dyn SourceLoader,
    settings: &'a Settings,
    diagnostics: &'a mut Diagnostics,
    included_files: Vec<PathBuf>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        resolver: &'a dyn NeedleResolver,
        loader: &'a dyn SourceLoader,
        settings: &'a Settings,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            resolver,
            loader,
            settings,
            diagnostics,
            included_files: vec![],
        }
    }

    /// Files pulled in by `include` directives, in the order they were
    /// resolved.
    pub fn included_files(&self) -> &[PathBuf] {
        &self.included_files
    }

    pub fn take_included_files(&mut self) -> Vec<PathBuf> {
        core::mem::take(&mut self.included_files)
    }

    pub fn render(&mut self, directives: &[Directive], env: &Env) -> Result<Vec<String>> {
        let mut lines = vec![];
        for directive in directives {
            lines.append(&mut self.render_directive(directive, env)?);
        }
        Ok(lines)
    }

    pub fn render_directive(&mut self, directive: &Directive, env: &Env) -> Result<Vec<String>> {
        let kind = match &directive.kind {
            DirectiveKind::Include { .. } => "include",
            _ => "block",
        };

        if let Some(when) = &directive.when {
            if !templater::evaluate_condition(when, env)? {
                self.diagnostics.verbose(format!(
                    "{kind} '{}' skipped due to conditional check failure",
                    directive.display_name()
                ));
                return Ok(vec![]);
            }
        }

        let envs = match &directive.loop_expr {
            Some(loop_expr) => {
                let envs = loops::expand(loop_expr, env, &directive.loop_var)?;
                if envs.is_empty() {
                    self.diagnostics.warning(format!(
                        "{kind} '{}' skipped due to missing loop var '{}'",
                        directive.display_name(),
                        loop_expr.to_text()
                    ));
                    return Ok(vec![]);
                }
                envs
            }
            None => vec![env.clone()],
        };

        let mut lines = vec![];
        for env in &envs {
            let mut rendered = match &directive.kind {
                DirectiveKind::Include { path } => self.render_include(path, env)?,
                DirectiveKind::Block { children } => self.render(children, env)?,
                DirectiveKind::Lines(block) => self.render_lines(directive, block, env)?,
            };
            lines.append(&mut rendered);
        }
        Ok(lines)
    }

    fn render_include(&mut self, path: &Value, env: &Env) -> Result<Vec<String>> {
        let name = match templater::render_value(path, env, false)? {
            Value::Null => {
                return Err(RenderError::TemplateSourceNotFound {
                    category: "templates".to_string(),
                    name: path.to_text(),
                }
                .into())
            }
            v => v.to_text(),
        };

        let source = self.resolver.resolve_needle("templates", &name)?;
        self.diagnostics
            .info(format!("including file {}", source.display()));
        self.included_files.push(source.clone());

        let contents = self.loader.load_structured_file(&source)?;
        let children = Directive::list_from_value(&contents)?;
        self.render(&children, env)
    }

    fn render_lines(
        &mut self,
        directive: &Directive,
        block: &LinesDirective,
        env: &Env,
    ) -> Result<Vec<String>> {
        let policy: MissingKeyPolicy = block
            .missing_key
            .as_deref()
            .unwrap_or(&self.settings.default_missing_key)
            .parse()?;
        // A required item reports its own absence rather than the reference.
        let fail_on_undefined = policy == MissingKeyPolicy::Fail && !block.required;

        let mut values: Vec<String> = vec![];
        for item in &block.items {
            let value = templater::render_value(item, env, fail_on_undefined)?;
            if contains_omit(&value) {
                debug!("line '{}' omitted", item.to_text());
                continue;
            }

            if value.is_empty() {
                if block.required {
                    return Err(RenderError::MissingRequiredValue {
                        name: directive.display_name().to_string(),
                    }
                    .into());
                }
                if policy == MissingKeyPolicy::Warn {
                    self.diagnostics.warning(format!(
                        "line '{}' skipped due to missing key",
                        item.to_text()
                    ));
                }
                continue;
            }

            match value {
                Value::Array(items) => values.extend(
                    items
                        .iter()
                        .filter(|v| !matches!(v, Value::Null | Value::Undefined))
                        .map(Value::to_text),
                ),
                v => values.push(v.to_text()),
            }
        }

        if block.join && !values.is_empty() {
            let delimiter = block
                .join_delimiter
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or(&self.settings.default_join_delimiter);
            values = vec![values.join(delimiter)];
        }

        if block.indent > 0 {
            let pad = " ".repeat(block.indent);
            values = values
                .iter()
                .map(|line| format!("{pad}{}", line.trim()))
                .collect();
        }

        Ok(values)
    }
}

fn contains_omit(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains(OMIT_PLACEHOLDER),
        Value::Array(items) => items
            .iter()
            .any(|v| matches!(v, Value::String(s) if s.as_ref() == OMIT_PLACEHOLDER)),
        _ => false,
    }
}
