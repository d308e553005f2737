// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::utils::{ensure_array, filter_error, optional_string};
use crate::builtins::FilterEntry;
use crate::lexer::Span;
use crate::value::{Map, Value};

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, FilterEntry>) {
    m.insert("dict2items", (dict2items, 0, 0));
    m.insert("first", (first, 0, 0));
    m.insert("join", (join, 0, 1));
    m.insert("last", (last, 0, 0));
    m.insert("length", (length, 0, 0));
    m.insert("list", (list, 0, 0));
    m.insert("unique", (unique, 0, 0));
}

fn join(span: &Span, input: &Value, args: &[Value]) -> Result<Value> {
    let sep = optional_string(span, args, 0, "")?;
    Ok(match input {
        Value::Array(items) => Value::from(
            items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<String>>()
                .join(sep.as_ref()),
        ),
        Value::String(_) => input.clone(),
        v => {
            return Err(filter_error(
                span,
                format!("cannot join {}", v.type_name()),
            ))
        }
    })
}

fn length(span: &Span, input: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(match input {
        Value::Array(a) => a.len(),
        Value::Object(m) => m.len(),
        Value::String(s) => s.chars().count(),
        v => {
            return Err(filter_error(
                span,
                format!("{} has no length", v.type_name()),
            ))
        }
    }))
}

fn list(span: &Span, input: &Value, _args: &[Value]) -> Result<Value> {
    Ok(match input {
        Value::Array(_) => input.clone(),
        Value::Object(m) => Value::from(m.keys().map(|k| Value::String(k.clone())).collect::<Vec<_>>()),
        Value::String(s) => Value::from(
            s.chars()
                .map(|c| Value::from(c.to_string()))
                .collect::<Vec<_>>(),
        ),
        v => {
            return Err(filter_error(
                span,
                format!("cannot convert {} to list", v.type_name()),
            ))
        }
    })
}

fn first(span: &Span, input: &Value, args: &[Value]) -> Result<Value> {
    Ok(list(span, input, args)?[0].clone())
}

fn last(span: &Span, input: &Value, args: &[Value]) -> Result<Value> {
    let items = list(span, input, args)?;
    let items = ensure_array(span, &items)?;
    Ok(items.last().cloned().unwrap_or(Value::Undefined))
}

fn unique(span: &Span, input: &Value, _args: &[Value]) -> Result<Value> {
    let items = ensure_array(span, input)?;
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items.iter() {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    Ok(Value::from(out))
}

fn dict2items(span: &Span, input: &Value, _args: &[Value]) -> Result<Value> {
    let map = match input {
        Value::Object(m) => m,
        v => {
            return Err(filter_error(
                span,
                format!("expects a mapping. Got {} instead", v.type_name()),
            ))
        }
    };
    Ok(Value::from(
        map.iter()
            .map(|(k, v)| {
                let mut item = Map::new();
                item.insert("key".into(), Value::String(k.clone()));
                item.insert("value".into(), v.clone());
                Value::from(item)
            })
            .collect::<Vec<_>>(),
    ))
}
