// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::interpreter::error::RenderError;
use crate::lexer::Span;
use crate::value::Value;

use std::rc::Rc;

use anyhow::Result;

pub fn filter_error(fcn: &Span, message: String) -> anyhow::Error {
    RenderError::FilterError {
        filter: fcn.text().to_string(),
        message: fcn.message("error", &message),
    }
    .into()
}

pub fn ensure_string(fcn: &Span, v: &Value) -> Result<Rc<str>> {
    match v {
        Value::String(s) => Ok(s.clone()),
        _ => Err(filter_error(
            fcn,
            format!("expects string argument. Got `{v}` instead"),
        )),
    }
}

pub fn ensure_array(fcn: &Span, v: &Value) -> Result<Rc<Vec<Value>>> {
    match v {
        Value::Array(a) => Ok(a.clone()),
        _ => Err(filter_error(
            fcn,
            format!("expects array argument. Got `{v}` instead"),
        )),
    }
}

pub fn optional_string(fcn: &Span, args: &[Value], idx: usize, default: &str) -> Result<Rc<str>> {
    match args.get(idx) {
        Some(v) => ensure_string(fcn, v),
        None => Ok(default.into()),
    }
}
