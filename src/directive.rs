// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::interpreter::error::RenderError;
use crate::value::Value;

use core::fmt;
use core::str::FromStr;
use std::rc::Rc;

use anyhow::Result;

pub const DEFAULT_LOOP_VAR: &str = "item";

/// What to do when a lines item templates to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKeyPolicy {
    Warn,
    Fail,
    Ignore,
}

impl FromStr for MissingKeyPolicy {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            "ignore" => Ok(Self::Ignore),
            _ => Err(RenderError::InvalidPolicyValue {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MissingKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Ignore => "ignore",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinesDirective {
    pub items: Vec<Value>,
    pub required: bool,
    pub join: bool,
    /// Falls back to the configured default delimiter when unset.
    pub join_delimiter: Option<Rc<str>>,
    pub indent: usize,
    /// Raw policy text; checked when the directive is rendered.
    pub missing_key: Option<Rc<str>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    Lines(LinesDirective),
    Block { children: Vec<Directive> },
    Include { path: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: Option<Rc<str>>,
    pub when: Option<Value>,
    pub loop_expr: Option<Value>,
    pub loop_var: Rc<str>,
    pub kind: DirectiveKind,
}

impl Directive {
    pub fn lines(items: Vec<Value>) -> Self {
        Self::new(DirectiveKind::Lines(LinesDirective {
            items,
            required: false,
            join: false,
            join_delimiter: None,
            indent: 0,
            missing_key: None,
        }))
    }

    pub fn block(children: Vec<Directive>) -> Self {
        Self::new(DirectiveKind::Block { children })
    }

    pub fn include(path: Value) -> Self {
        Self::new(DirectiveKind::Include { path })
    }

    fn new(kind: DirectiveKind) -> Self {
        Self {
            name: None,
            when: None,
            loop_expr: None,
            loop_var: DEFAULT_LOOP_VAR.into(),
            kind,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_when(mut self, when: Value) -> Self {
        self.when = Some(when);
        self
    }

    pub fn with_loop(mut self, loop_expr: Value) -> Self {
        self.loop_expr = Some(loop_expr);
        self
    }

    pub fn with_loop_var(mut self, loop_var: &str) -> Self {
        self.loop_var = loop_var.into();
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Decodes a list of directive records, as loaded from a template file.
    pub fn list_from_value(value: &Value) -> Result<Vec<Directive>> {
        match value {
            Value::Array(items) => items.iter().map(Directive::from_value).collect(),
            Value::Null => Ok(vec![]),
            v => Err(invalid("<template>", format!("expected a list of directives, got {}", v.type_name())).into()),
        }
    }

    /// Decodes one directive record. `include` takes precedence over `block`,
    /// which takes precedence over `lines`.
    pub fn from_value(value: &Value) -> Result<Directive> {
        let fields = match value {
            Value::Object(fields) => fields,
            v => return Err(invalid("<unnamed>", format!("expected a mapping, got {}", v.type_name())).into()),
        };

        let name: Option<Rc<str>> = match &value["name"] {
            Value::Undefined | Value::Null => None,
            v => Some(Rc::from(v.to_text())),
        };
        let display = name.as_deref().unwrap_or("<unnamed>").to_string();

        let kind = if fields.contains_key("include") {
            DirectiveKind::Include {
                path: value["include"].clone(),
            }
        } else if fields.contains_key("block") {
            DirectiveKind::Block {
                children: match &value["block"] {
                    Value::Array(items) => items
                        .iter()
                        .map(Directive::from_value)
                        .collect::<Result<Vec<_>>>()?,
                    v => {
                        return Err(invalid(&display, format!("block must be a list, got {}", v.type_name())).into())
                    }
                },
            }
        } else if fields.contains_key("lines") {
            DirectiveKind::Lines(lines_from_value(value, &display)?)
        } else {
            return Err(invalid(&display, "missing required entry `lines`, `block` or `include`".to_string()).into());
        };

        let loop_var = match (&value["loop_var"], &value["loop_control"]["loop_var"]) {
            (Value::String(v), _) | (Value::Undefined, Value::String(v)) => v.clone(),
            (Value::Undefined, Value::Undefined) => DEFAULT_LOOP_VAR.into(),
            _ => return Err(invalid(&display, "loop_var must be a string".to_string()).into()),
        };

        Ok(Directive {
            name,
            when: optional(&value["when"]),
            loop_expr: optional(&value["loop"]),
            loop_var,
            kind,
        })
    }
}

fn invalid(name: &str, reason: String) -> RenderError {
    RenderError::InvalidDirective {
        name: name.to_string(),
        reason,
    }
}

fn optional(v: &Value) -> Option<Value> {
    match v {
        Value::Undefined | Value::Null => None,
        v => Some(v.clone()),
    }
}

fn flag(value: &Value, key: &str, name: &str) -> Result<bool> {
    match &value[key] {
        Value::Undefined | Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        v => Err(invalid(name, format!("{key} must be a boolean, got {v}")).into()),
    }
}

fn lines_from_value(value: &Value, name: &str) -> Result<LinesDirective> {
    let items = match &value["lines"] {
        Value::Array(items) => items.as_ref().clone(),
        Value::Null => vec![],
        v => vec![v.clone()],
    };

    let indent = match &value["indent"] {
        Value::Undefined | Value::Null => 0,
        Value::Number(n) => match n.as_i64() {
            Some(i) if i >= 0 => i as usize,
            _ => return Err(invalid(name, format!("indent must be a non-negative integer, got {n}")).into()),
        },
        v => return Err(invalid(name, format!("indent must be a non-negative integer, got {v}")).into()),
    };

    let text = |key: &str| -> Option<Rc<str>> {
        match &value[key] {
            Value::Undefined | Value::Null => None,
            Value::String(s) => Some(s.clone()),
            v => Some(v.to_text().into()),
        }
    };

    Ok(LinesDirective {
        items,
        required: flag(value, "required", name)?,
        join: flag(value, "join", name)?,
        join_delimiter: text("join_delimiter"),
        indent,
        missing_key: text("missing_key"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_kinds() -> Result<()> {
        let v = Value::from_yaml_str(
            r#"
- name: hostname
  lines: "hostname {{ name }}"
- name: ifaces
  loop: "{{ interfaces }}"
  loop_control:
    loop_var: iface
  block:
    - lines:
        - "interface {{ iface.key }}"
      indent: 1
      join: true
      missing_key: fail
- include: "{{ role }}.yaml"
  when: role is defined
"#,
        )?;
        let directives = Directive::list_from_value(&v)?;
        assert_eq!(directives.len(), 3);

        match &directives[0].kind {
            DirectiveKind::Lines(lines) => {
                assert_eq!(lines.items, vec![Value::from("hostname {{ name }}")]);
                assert!(!lines.required);
            }
            k => panic!("unexpected {k:?}"),
        }

        assert_eq!(directives[1].loop_var.as_ref(), "iface");
        match &directives[1].kind {
            DirectiveKind::Block { children } => match &children[0].kind {
                DirectiveKind::Lines(lines) => {
                    assert_eq!(lines.indent, 1);
                    assert!(lines.join);
                    assert_eq!(lines.missing_key.as_deref(), Some("fail"));
                }
                k => panic!("unexpected {k:?}"),
            },
            k => panic!("unexpected {k:?}"),
        }

        assert!(matches!(directives[2].kind, DirectiveKind::Include { .. }));
        assert_eq!(directives[2].when, Some(Value::from("role is defined")));
        Ok(())
    }

    #[test]
    fn record_without_kind() {
        let v = Value::from_yaml_str("- name: nothing\n  when: true\n").unwrap();
        let err = Directive::list_from_value(&v).unwrap_err();
        assert!(matches!(
            RenderError::of(&err),
            Some(RenderError::InvalidDirective { .. })
        ));
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("fail".parse::<MissingKeyPolicy>(), Ok(MissingKeyPolicy::Fail));
        assert_eq!(
            "loud".parse::<MissingKeyPolicy>(),
            Err(RenderError::InvalidPolicyValue {
                value: "loud".to_string()
            })
        );
    }
}
