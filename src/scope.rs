// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::value::{Map, Value};

use std::rc::Rc;

use anyhow::{bail, Result};

/// Variables visible to a template. Immutable: a loop iteration gets a copy
/// of its parent with the loop variable added, so siblings never see each
/// other's bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env {
    vars: Rc<Map>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(vars: Map) -> Self {
        Self {
            vars: Rc::new(vars),
        }
    }

    pub fn from_value(vars: Value) -> Result<Self> {
        match vars {
            Value::Object(vars) => Ok(Self { vars }),
            Value::Null | Value::Undefined => Ok(Self::new()),
            v => bail!("variables must be an object, got {}", v.type_name()),
        }
    }

    pub fn get(&self, name: &str) -> &Value {
        self.vars.get(name).unwrap_or(&Value::Undefined)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// A child scope with `name` bound to `value`.
    pub fn bind(&self, name: &str, value: Value) -> Env {
        let mut vars = self.vars.as_ref().clone();
        vars.insert(name.into(), value);
        Env::from_map(vars)
    }

    /// A scope with `overlay`'s variables layered on top of these.
    pub fn overlay(&self, overlay: &Env) -> Env {
        let mut vars = self.vars.as_ref().clone();
        for (k, v) in overlay.vars.iter() {
            vars.insert(k.clone(), v.clone());
        }
        Env::from_map(vars)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.vars.clone())
    }
}
