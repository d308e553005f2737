// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod collections;
pub mod strings;
pub mod utils;

use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use lazy_static::lazy_static;

/// A filter receives the span of its name, the piped-in value and its
/// evaluated arguments.
pub type FilterFcn = fn(&Span, &Value, &[Value]) -> Result<Value>;

/// Filter function with its minimum and maximum argument counts.
pub type FilterEntry = (FilterFcn, usize, usize);

#[rustfmt::skip]
lazy_static! {
    pub static ref FILTERS: HashMap<&'static str, FilterEntry> = {
	let mut m : HashMap<&'static str, FilterEntry> = HashMap::new();

	strings::register(&mut m);
	collections::register(&mut m);

	m
    };
}

/// Filters that are handed undefined input instead of failing on it.
pub fn accepts_undefined(name: &str) -> bool {
    name == "default"
}
