// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::utils::{ensure_string, filter_error, optional_string};
use crate::builtins::FilterEntry;
use crate::lexer::Span;
use crate::number::Number;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, FilterEntry>) {
    m.insert("default", (default, 0, 2));
    m.insert("int", (int, 0, 0));
    m.insert("lower", (lower, 0, 0));
    m.insert("replace", (replace, 2, 2));
    m.insert("split", (split, 0, 1));
    m.insert("string", (string, 0, 0));
    m.insert("trim", (trim, 0, 0));
    m.insert("upper", (upper, 0, 0));
}

// `default(value, boolean=false)`. With `boolean` set, falsy input is
// replaced as well as undefined input.
fn default(span: &Span, input: &Value, args: &[Value]) -> Result<Value> {
    let replace_falsy = match args.get(1) {
        Some(Value::Bool(b)) => *b,
        Some(v) => {
            return Err(filter_error(
                span,
                format!("expects boolean second argument. Got `{v}` instead"),
            ))
        }
        None => false,
    };

    let missing = input.is_undefined() || (replace_falsy && !input.is_truthy());
    Ok(match (missing, args.first()) {
        (false, _) => input.clone(),
        (true, Some(v)) => v.clone(),
        (true, None) => Value::from(""),
    })
}

fn int(span: &Span, input: &Value, _args: &[Value]) -> Result<Value> {
    Ok(match input {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Value::from(i),
            None => Value::from(n.as_f64().trunc() as i64),
        },
        Value::Bool(b) => Value::from(i64::from(*b)),
        Value::String(s) => match s.trim().parse::<Number>() {
            Ok(n) => Value::from(n.as_f64().trunc() as i64),
            Err(_) => Value::from(0i64),
        },
        Value::Null => Value::from(0i64),
        v => {
            return Err(filter_error(
                span,
                format!("cannot convert {} to int", v.type_name()),
            ))
        }
    })
}

fn lower(_span: &Span, input: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(input.to_text().to_lowercase()))
}

fn upper(_span: &Span, input: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(input.to_text().to_uppercase()))
}

fn trim(_span: &Span, input: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(input.to_text().trim()))
}

fn string(_span: &Span, input: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(input.to_text()))
}

fn replace(span: &Span, input: &Value, args: &[Value]) -> Result<Value> {
    let s = ensure_string(span, input)?;
    let old = optional_string(span, args, 0, "")?;
    let new = optional_string(span, args, 1, "")?;
    Ok(Value::from(s.replace(old.as_ref(), new.as_ref())))
}

// Without a separator, splits on runs of whitespace.
fn split(span: &Span, input: &Value, args: &[Value]) -> Result<Value> {
    let s = ensure_string(span, input)?;
    let parts: Vec<Value> = match args.first() {
        Some(sep) => {
            let sep = ensure_string(span, sep)?;
            s.split(sep.as_ref()).map(Value::from).collect()
        }
        None => s.split_whitespace().map(Value::from).collect(),
    };
    Ok(Value::from(parts))
}
