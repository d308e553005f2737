// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod builtins;
mod diagnostics;
mod directive;
mod engine;
mod facts;
mod interpreter;
mod lexer;
mod netconfig;
mod number;
mod parser;
mod scope;
mod settings;
mod sources;
mod templater;
mod value;

pub use diagnostics::{Diagnostic, Diagnostics, Level};
pub use directive::{Directive, DirectiveKind, LinesDirective, MissingKeyPolicy};
pub use engine::{Engine, Rendered};
pub use facts::{extract_facts, tag_set, FactDefinition, FactExtractor, MatchRule};
pub use interpreter::error::RenderError;
pub use interpreter::loops::expand as expand_loop;
pub use interpreter::Interpreter;
pub use netconfig::{ConfigLine, ConfigModel};
pub use number::Number;
pub use scope::Env;
pub use settings::Settings;
pub use sources::{
    discover_sources, match_list, FileLoader, NeedleResolver, SearchPathResolver, SourceLoader,
};
pub use templater::{coerce, evaluate, evaluate_condition, render_value, OMIT_PLACEHOLDER};
pub use value::{Map, Value};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ast::*;
    pub use crate::lexer::*;
    pub use crate::parser::*;
    pub use crate::templater::render_template;
}
