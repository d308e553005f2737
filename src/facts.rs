// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fact extraction from device configuration text.
//!
//! A fact definition runs its match rules against either the whole text or
//! each configuration section whose name matches `section`, and templates
//! `facts` with the match results. The results of every definition are merged
//! into a single object.

use crate::diagnostics::Diagnostics;
use crate::interpreter::error::RenderError;
use crate::netconfig::ConfigModel;
use crate::scope::Env;
use crate::templater;
use crate::value::{Map, Value};

use std::collections::BTreeSet;
use std::rc::Rc;

use anyhow::Result;
use log::debug;
use regex::{Captures, Regex, RegexBuilder};

/// A regex applied to one context text.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub pattern: Regex,
    pub match_all: bool,
    pub match_var: Option<Rc<str>>,
}

impl MatchRule {
    pub fn new(pattern: &str, match_all: bool, match_var: Option<&str>) -> Result<Self> {
        // Single matches let `^` and `$` anchor at line boundaries.
        let regex = match RegexBuilder::new(pattern).multi_line(!match_all).build() {
            Ok(r) => r,
            Err(e) => {
                return Err(RenderError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                }
                .into())
            }
        };
        Ok(Self {
            pattern: regex,
            match_all,
            match_var: match_var.map(Rc::from),
        })
    }

    fn from_value(rule: &Value, definition: &str) -> Result<Self> {
        let malformed = || RenderError::MalformedMatchList {
            context: definition.to_string(),
        };
        let pattern = match &rule["pattern"] {
            Value::String(p) => p.clone(),
            _ => return Err(malformed().into()),
        };
        let match_all = match &rule["match_all"] {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            _ => return Err(malformed().into()),
        };
        let match_var = match &rule["match_var"] {
            Value::Undefined | Value::Null => None,
            Value::String(v) => Some(v.clone()),
            _ => return Err(malformed().into()),
        };
        Self::new(&pattern, match_all, match_var.as_deref())
    }

    /// First match as a list of its groups (`null` when there is no match),
    /// or every match when `match_all` is set.
    pub fn apply(&self, text: &str) -> Value {
        if self.match_all {
            return Value::from(
                self.pattern
                    .captures_iter(text)
                    .map(|c| self.find_all_item(&c))
                    .collect::<Vec<_>>(),
            );
        }

        match self.pattern.captures(text) {
            Some(c) => Value::from(
                c.iter()
                    .skip(1)
                    .map(|g| match g {
                        Some(g) => Value::from(g.as_str()),
                        None => Value::Null,
                    })
                    .collect::<Vec<_>>(),
            ),
            None => Value::Null,
        }
    }

    // Without groups an item is the whole match, with one group it is that
    // group, otherwise it is the list of groups.
    fn find_all_item(&self, c: &Captures) -> Value {
        let group = |i: usize| Value::from(c.get(i).map(|g| g.as_str()).unwrap_or_default());
        match c.len() {
            1 => group(0),
            2 => group(1),
            n => Value::from((1..n).map(group).collect::<Vec<_>>()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FactDefinition {
    pub name: Option<Rc<str>>,
    pub tags: BTreeSet<Rc<str>>,
    pub section: Option<Regex>,
    pub matches: Vec<MatchRule>,
    pub facts: Value,
    pub loop_expr: Option<Value>,
}

impl FactDefinition {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Compiles a section regex. Section names match case-insensitively from
    /// their start.
    pub fn section_regex(pattern: &str) -> Result<Regex> {
        match RegexBuilder::new(&format!("^(?:{pattern})"))
            .case_insensitive(true)
            .build()
        {
            Ok(r) => Ok(r),
            Err(e) => Err(RenderError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    pub fn list_from_value(value: &Value) -> Result<Vec<FactDefinition>> {
        match value {
            Value::Array(items) => items.iter().map(FactDefinition::from_value).collect(),
            Value::Null => Ok(vec![]),
            v => Err(RenderError::MalformedFactDefinition {
                name: "<parser>".to_string(),
                reason: format!("expected a list of definitions, got {}", v.type_name()),
            }
            .into()),
        }
    }

    pub fn from_value(value: &Value) -> Result<FactDefinition> {
        let name: Option<Rc<str>> = match &value["name"] {
            Value::Undefined | Value::Null => None,
            v => Some(Rc::from(v.to_text())),
        };
        let display = name.as_deref().unwrap_or("<unnamed>").to_string();
        let malformed = |reason: &str| RenderError::MalformedFactDefinition {
            name: display.clone(),
            reason: reason.to_string(),
        };

        if !matches!(value, Value::Object(_)) {
            return Err(malformed("expected a mapping").into());
        }

        let facts = match &value["facts"] {
            Value::Undefined => return Err(malformed("missing required entry `facts`").into()),
            v => v.clone(),
        };

        let matches = match &value["matches"] {
            Value::Undefined => return Err(malformed("missing required entry `matches`").into()),
            Value::Array(rules) => rules
                .iter()
                .map(|r| MatchRule::from_value(r, &display))
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(RenderError::MalformedMatchList {
                    context: display.clone(),
                }
                .into())
            }
        };

        let section = match &value["section"] {
            Value::Undefined | Value::Null => None,
            Value::String(s) => Some(Self::section_regex(s)?),
            _ => return Err(malformed("section must be a string").into()),
        };

        Ok(FactDefinition {
            name,
            tags: tag_set(&value["tags"]),
            section,
            matches,
            facts,
            loop_expr: match &value["loop"] {
                Value::Undefined | Value::Null => None,
                v => Some(v.clone()),
            },
        })
    }
}

/// Tags may be written as one string or a list of strings.
pub fn tag_set(tags: &Value) -> BTreeSet<Rc<str>> {
    tags.clone()
        .into_list()
        .iter()
        .map(|t| Rc::from(t.to_text()))
        .collect()
}

/// Runs fact definitions over configuration text.
pub struct FactExtractor<'a> {
    diagnostics: &'a mut Diagnostics,
}

impl<'a> FactExtractor<'a> {
    pub fn new(diagnostics: &'a mut Diagnostics) -> Self {
        Self { diagnostics }
    }

    /// Extracts and merges the facts of every definition. With a non-empty
    /// `tags` filter, only definitions carrying exactly those tags run.
    pub fn extract(
        &mut self,
        definitions: &[FactDefinition],
        text: &str,
        model: &ConfigModel,
        tags: &BTreeSet<Rc<str>>,
    ) -> Result<Value> {
        let mut facts = Value::new_object();

        for definition in definitions {
            if !tags.is_empty() && *tags != definition.tags {
                self.diagnostics.warning(format!(
                    "skipping `{}` due to tagging",
                    definition.display_name()
                ));
                continue;
            }

            for context in Self::contexts(definition, text, model)? {
                let env = Self::match_env(definition, &context);
                match &definition.loop_expr {
                    Some(loop_expr) => {
                        let items = templater::evaluate(loop_expr, &env, false, true)?;
                        // Loop bodies see only `item`, never the match variables.
                        for item in items.into_list() {
                            let obj = templater::evaluate(
                                &definition.facts,
                                &Env::new().bind("item", item),
                                false,
                                false,
                            )?;
                            Self::merge(&mut facts, obj, definition)?;
                        }
                    }
                    None => {
                        let obj = templater::evaluate(&definition.facts, &env, false, false)?;
                        Self::merge(&mut facts, obj, definition)?;
                    }
                }
            }
        }

        Ok(facts)
    }

    fn contexts(
        definition: &FactDefinition,
        text: &str,
        model: &ConfigModel,
    ) -> Result<Vec<String>> {
        let Some(section) = &definition.section else {
            return Ok(vec![text.to_string()]);
        };

        let mut contexts = vec![];
        for name in model.sections().filter(|s| section.is_match(s)) {
            debug!("`{}` matched section `{name}`", definition.display_name());
            let path = model.section_path(name).unwrap_or_else(|| vec![name]);
            contexts.push(model.get_block(&path)?);
        }
        Ok(contexts)
    }

    fn match_env(definition: &FactDefinition, context: &str) -> Env {
        let mut vars = Map::new();
        let mut matches = Vec::with_capacity(definition.matches.len());
        for rule in &definition.matches {
            let result = rule.apply(context);
            if let Some(var) = &rule.match_var {
                vars.insert(var.clone(), result.clone());
            }
            matches.push(result);
        }
        vars.insert("matches".into(), Value::from(matches));
        Env::from_map(vars)
    }

    fn merge(facts: &mut Value, obj: Value, definition: &FactDefinition) -> Result<()> {
        match obj {
            Value::Object(_) => {
                facts.merge(obj);
                Ok(())
            }
            v => Err(RenderError::MalformedFacts {
                name: definition.display_name().to_string(),
                found: v.type_name().to_string(),
            }
            .into()),
        }
    }
}

/// Parses `text` and extracts facts in one call.
pub fn extract_facts(
    definitions: &[FactDefinition],
    text: &str,
    tags: &BTreeSet<Rc<str>>,
    diagnostics: &mut Diagnostics,
) -> Result<Value> {
    let model = ConfigModel::parse(text);
    FactExtractor::new(diagnostics).extract(definitions, text, &model, tags)
}
