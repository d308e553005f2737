// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Fatal conditions raised while rendering templates or extracting facts.
///
/// Functions return `anyhow::Result`; use `downcast_ref::<RenderError>()`
/// on the error to recover the kind.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    /// A variable reference could not be resolved and undefined values are
    /// not allowed at this point.
    #[error("'{name}' is undefined")]
    UndefinedReference { name: String },

    /// A `required` lines entry templated to nothing.
    #[error("block '{name}' is missing required key")]
    MissingRequiredValue { name: String },

    #[error("option missing_key expected one of warn, fail, ignore, got {value}")]
    InvalidPolicyValue { value: String },

    #[error("unable to find '{name}' in expected paths for {category}")]
    TemplateSourceNotFound { category: String, name: String },

    #[error("{context}: matches must be a valid list")]
    MalformedMatchList { context: String },

    #[error("invalid directive '{name}': {reason}")]
    InvalidDirective { name: String, reason: String },

    #[error("invalid fact definition '{name}': {reason}")]
    MalformedFactDefinition { name: String, reason: String },

    #[error("facts for '{name}' must template to a mapping, got {found}")]
    MalformedFacts { name: String, found: String },

    #[error("{0}")]
    TemplateSyntax(String),

    #[error("filter `{filter}`: {message}")]
    FilterError { filter: String, message: String },

    #[error("invalid regex `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("section {path} not found in configuration")]
    SectionNotFound { path: String },

    #[error("{path} does not appear to be a valid directory")]
    InvalidSourceDir { path: String },
}

impl RenderError {
    /// Returns the kind carried by `err`, if it is one of ours.
    pub fn of(err: &anyhow::Error) -> Option<&RenderError> {
        err.downcast_ref::<RenderError>()
    }

    pub fn is_undefined_reference(err: &anyhow::Error) -> bool {
        matches!(Self::of(err), Some(RenderError::UndefinedReference { .. }))
    }
}
