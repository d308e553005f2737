// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::scope::Env;
use crate::templater;
use crate::value::{Map, Value};

use anyhow::Result;

/// Evaluates a loop source and returns one child environment per iteration.
///
/// Objects iterate their entries in insertion order with the loop variable
/// bound to `{key, value}`; arrays iterate their elements. Any other
/// non-empty value is a single iteration. An empty, falsy or undefined source
/// produces no environments; callers report that as a skipped loop.
pub fn expand(loop_expr: &Value, env: &Env, loop_var: &str) -> Result<Vec<Env>> {
    let data = templater::evaluate(loop_expr, env, false, true)?;
    if !data.is_truthy() {
        return Ok(vec![]);
    }

    Ok(match data {
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| {
                let mut item = Map::with_capacity(2);
                item.insert("key".into(), Value::String(key.clone()));
                item.insert("value".into(), value.clone());
                env.bind(loop_var, Value::from(item))
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| env.bind(loop_var, item.clone()))
            .collect(),
        v => vec![env.bind(loop_var, v)],
    })
}
