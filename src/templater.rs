// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Expression templating.
//!
//! `evaluate` walks a template value structurally: objects are templated
//! key by key and value by value, arrays element by element, and strings are
//! parsed for `{{ ... }}` segments which are evaluated against an [`Env`].
//! Evaluation is a pure function of its inputs and keeps no state between
//! calls.

use crate::ast::*;
use crate::builtins::{self, FILTERS};
use crate::interpreter::error::RenderError;
use crate::lexer::Source;
use crate::parser::Parser;
use crate::scope::Env;
use crate::value::{Map, Value};

use core::cmp::Ordering;

use anyhow::{anyhow, bail, Result};
use lazy_static::lazy_static;
use regex::Regex;

/// Value of the `omit` variable. Lines containing it are dropped.
pub const OMIT_PLACEHOLDER: &str = "__omit_place_holder__";

lazy_static! {
    static ref BARE_REFERENCE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*|\[[^\]]+\])*$")
            .expect("valid bare reference regex");
    static ref BARE_FILTERED: Regex =
        Regex::new(r"^[A-Za-z_][^|{}]*\|\s*[A-Za-z_]").expect("valid bare filter regex");
}

// Which plain strings are read as variable references.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Bare {
    Off,
    // The loop source itself: any reference path or filter pipeline.
    Always,
    // Elements of a literal list or map: only names bound in the scope, or
    // filter pipelines. Anything else stays a literal string.
    Bound,
}

impl Bare {
    fn nested(self) -> Bare {
        match self {
            Bare::Always => Bare::Bound,
            b => b,
        }
    }

    fn applies(self, text: &str, env: &Env) -> bool {
        let filtered = BARE_FILTERED.is_match(text);
        match self {
            Bare::Off => false,
            Bare::Always => filtered || BARE_REFERENCE.is_match(text),
            Bare::Bound => {
                let head = text.split(['.', '[', '|']).next().unwrap_or_default().trim();
                filtered || (BARE_REFERENCE.is_match(text) && env.contains(head))
            }
        }
    }
}

#[derive(Clone, Copy)]
struct Options {
    fail_on_undefined: bool,
    bare: Bare,
    coerce: bool,
}

/// Templates `expr` against `env`.
///
/// With `fail_on_undefined` an unresolved reference is an
/// [`RenderError::UndefinedReference`]; otherwise the scalar containing it
/// becomes `null`. With `convert_bare` a plain string that looks like a
/// variable path (`interfaces`, `vlans.access`) or a filter pipeline is
/// evaluated as if it had been written `{{ interfaces }}`. Inside a literal
/// list or map only names bound in `env` are converted. Results are passed
/// through [`coerce`].
pub fn evaluate(expr: &Value, env: &Env, fail_on_undefined: bool, convert_bare: bool) -> Result<Value> {
    let options = Options {
        fail_on_undefined,
        bare: if convert_bare { Bare::Always } else { Bare::Off },
        coerce: true,
    };
    walk(expr, env, options)
}

/// Templates `expr` for output. Rendered text is kept as written: no integer
/// coercion and no bare conversion.
pub fn render_value(expr: &Value, env: &Env, fail_on_undefined: bool) -> Result<Value> {
    let options = Options {
        fail_on_undefined,
        bare: Bare::Off,
        coerce: false,
    };
    walk(expr, env, options)
}

fn walk(expr: &Value, env: &Env, options: Options) -> Result<Value> {
    let nested = Options {
        bare: options.bare.nested(),
        ..options
    };
    match expr {
        Value::Object(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (key, value) in fields.iter() {
                let key = walk(&Value::String(key.clone()), env, nested)?;
                if key.is_null() {
                    continue;
                }
                let value = walk(value, env, nested)?;
                map.insert(key.to_text().into(), value);
            }
            Ok(Value::from(map))
        }
        Value::Array(items) => Ok(Value::from(
            items
                .iter()
                .map(|item| walk(item, env, nested))
                .collect::<Result<Vec<Value>>>()?,
        )),
        Value::String(text) => match template_string(text, env, options) {
            Ok(v) if options.coerce => Ok(coerce(v)),
            Ok(v) => Ok(v),
            Err(e) if !options.fail_on_undefined && RenderError::is_undefined_reference(&e) => {
                Ok(Value::Null)
            }
            Err(e) => Err(e),
        },
        Value::Undefined => Ok(Value::Null),
        v => Ok(v.clone()),
    }
}

/// Integer-looking strings become integers and empty results become null.
/// Booleans and everything else pass through untouched.
pub fn coerce(value: Value) -> Value {
    match value {
        Value::String(s) if s.is_empty() => Value::Null,
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Value::from(i),
            Err(_) => Value::String(s),
        },
        Value::Array(a) if a.is_empty() => Value::Null,
        Value::Object(m) if m.is_empty() => Value::Null,
        Value::Undefined => Value::Null,
        v => v,
    }
}

fn template_string(text: &str, env: &Env, options: Options) -> Result<Value> {
    if !text.contains("{{") {
        let bare = text.trim();
        if options.bare.applies(bare, env) {
            let source = Source::from_contents("<loop>".into(), bare.to_string());
            let expr = Parser::parse_bare(&source)?;
            let evaluator = Evaluator::new(env);
            let value = evaluator.eval(&expr)?;
            return evaluator.defined(value, &expr);
        }
        return Ok(Value::from(text));
    }

    let source = Source::from_contents("<template>".into(), text.to_string());
    let template = Parser::parse_template(&source)?;
    match template.single_expr().map(|e| e.as_ref()) {
        // Output keeps numeric literals exactly as written.
        Some(Expr::Number(span, _)) if !options.coerce => Ok(Value::from(span.text())),
        _ => render_template(&template, env),
    }
}

/// Renders a parsed template. A template that is a single expression yields
/// the expression's native value; anything else yields text.
pub fn render_template(template: &Template, env: &Env) -> Result<Value> {
    let evaluator = Evaluator::new(env);
    if let Some(expr) = template.single_expr() {
        let value = evaluator.eval(expr)?;
        return evaluator.defined(value, expr);
    }

    let mut out = String::new();
    for segment in &template.segments {
        match segment {
            Segment::Text(t) => out.push_str(t),
            Segment::Expr(expr) => {
                if let Expr::Number(span, _) = expr.as_ref() {
                    out.push_str(span.text());
                    continue;
                }
                let value = evaluator.eval(expr)?;
                out.push_str(&evaluator.defined(value, expr)?.to_text());
            }
        }
    }
    Ok(Value::from(out))
}

/// Evaluates a `when` condition. Conditions are bare expressions, a boolean
/// literal, or a list of conditions that must all hold. A condition that
/// references something undefined is false.
pub fn evaluate_condition(when: &Value, env: &Env) -> Result<bool> {
    match when {
        Value::Bool(b) => Ok(*b),
        Value::Null | Value::Undefined => Ok(false),
        Value::Number(n) => Ok(!n.is_zero()),
        Value::Array(conditions) => {
            for condition in conditions.iter() {
                if !evaluate_condition(condition, env)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Value::String(text) => {
            let result = if text.contains("{{") {
                let options = Options {
                    fail_on_undefined: true,
                    bare: Bare::Off,
                    coerce: true,
                };
                template_string(text, env, options)
            } else {
                let source = Source::from_contents("<when>".into(), text.to_string());
                let expr = Parser::parse_bare(&source)?;
                let evaluator = Evaluator::new(env);
                evaluator
                    .eval(&expr)
                    .and_then(|v| evaluator.defined(v, &expr))
            };
            match result {
                Ok(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
                Ok(v) => Ok(v.is_truthy()),
                Err(e) if RenderError::is_undefined_reference(&e) => Ok(false),
                Err(e) => Err(e),
            }
        }
        Value::Object(_) => bail!("conditional must be a string, boolean or list, got {when}"),
    }
}

struct Evaluator<'a> {
    env: &'a Env,
}

impl<'a> Evaluator<'a> {
    fn new(env: &'a Env) -> Self {
        Self { env }
    }

    // Undefined values may flow through references; any other use of them is
    // an error naming the reference.
    fn defined(&self, value: Value, expr: &Expr) -> Result<Value> {
        match value {
            Value::Undefined => Err(RenderError::UndefinedReference {
                name: expr.span().text().to_string(),
            }
            .into()),
            v => Ok(v),
        }
    }

    fn eval_defined(&self, expr: &Expr) -> Result<Value> {
        let value = self.eval(expr)?;
        self.defined(value, expr)
    }

    fn eval(&self, expr: &Expr) -> Result<Value> {
        use Expr::*;
        match expr {
            Null(_) => Ok(Value::Null),
            Bool(_, b) => Ok(Value::Bool(*b)),
            Number(_, n) => Ok(Value::Number(*n)),
            String(_, s) => Ok(Value::String(s.clone())),
            Array { items, .. } => Ok(Value::from(
                items
                    .iter()
                    .map(|item| self.eval_defined(item))
                    .collect::<Result<Vec<Value>>>()?,
            )),

            Var(span) => Ok(match (self.env.get(span.text()), span.text()) {
                (Value::Undefined, "omit") => Value::from(OMIT_PLACEHOLDER),
                (v, _) => v.clone(),
            }),
            RefDot { refr, field, .. } => Ok(self.eval(refr)?[field.text()].clone()),
            RefBrack { refr, index, .. } => {
                let base = self.eval(refr)?;
                let index = self.eval_defined(index)?;
                Ok(base[&index].clone())
            }

            Not { expr, .. } => Ok(Value::Bool(!self.eval_defined(expr)?.is_truthy())),
            BoolExpr { op, lhs, rhs, .. } => {
                let lhs = self.eval_defined(lhs)?.is_truthy();
                Ok(Value::Bool(match op {
                    BoolOp::And => lhs && self.eval_defined(rhs)?.is_truthy(),
                    BoolOp::Or => lhs || self.eval_defined(rhs)?.is_truthy(),
                }))
            }
            CompareExpr { span, op, lhs, rhs } => {
                let lhs = self.eval_defined(lhs)?;
                let rhs = self.eval_defined(rhs)?;
                self.compare(span, *op, &lhs, &rhs)
            }
            Concat { lhs, rhs, .. } => {
                let lhs = self.eval_defined(lhs)?;
                let rhs = self.eval_defined(rhs)?;
                Ok(Value::from(lhs.to_text() + &rhs.to_text()))
            }

            Filter {
                expr, name, args, ..
            } => {
                let input = match builtins::accepts_undefined(name.text()) {
                    true => self.eval(expr)?,
                    false => self.eval_defined(expr)?,
                };
                let args = args
                    .iter()
                    .map(|a| self.eval_defined(a))
                    .collect::<Result<Vec<Value>>>()?;
                let (fcn, _, _) = FILTERS
                    .get(name.text())
                    .ok_or_else(|| name.error("unknown filter"))?;
                fcn(name, &input, &args)
            }

            Test {
                expr,
                name,
                negated,
                ..
            } => {
                let value = self.eval(expr)?;
                let result = match name.text() {
                    "defined" => !value.is_undefined(),
                    "undefined" => value.is_undefined(),
                    "none" => value.is_null(),
                    "string" => matches!(value, Value::String(_)),
                    "number" => matches!(value, Value::Number(_)),
                    "mapping" => matches!(value, Value::Object(_)),
                    "sequence" => matches!(value, Value::Array(_) | Value::String(_)),
                    t => bail!(name.error(&format!("unknown test `{t}`"))),
                };
                Ok(Value::Bool(result != *negated))
            }

            IfElse {
                cond,
                then,
                otherwise,
                ..
            } => {
                if self.eval_defined(cond)?.is_truthy() {
                    self.eval(then)
                } else {
                    match otherwise {
                        Some(e) => self.eval(e),
                        None => Ok(Value::Null),
                    }
                }
            }
        }
    }

    fn compare(
        &self,
        span: &crate::lexer::Span,
        op: CompareOp,
        lhs: &Value,
        rhs: &Value,
    ) -> Result<Value> {
        let ordering = |lhs: &Value, rhs: &Value| -> Result<Ordering> {
            let ord = match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            };
            ord.ok_or_else(|| {
                anyhow!(span.error(&format!(
                    "cannot compare {} with {}",
                    lhs.type_name(),
                    rhs.type_name()
                )))
            })
        };

        let result = match op {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Lt => ordering(lhs, rhs)?.is_lt(),
            CompareOp::Le => ordering(lhs, rhs)?.is_le(),
            CompareOp::Gt => ordering(lhs, rhs)?.is_gt(),
            CompareOp::Ge => ordering(lhs, rhs)?.is_ge(),
            CompareOp::In | CompareOp::NotIn => {
                let found = match rhs {
                    Value::Array(items) => items.contains(lhs),
                    Value::Object(fields) => fields.contains_key(lhs.to_text().as_str()),
                    Value::String(s) => s.contains(lhs.to_text().as_str()),
                    v => bail!(span.error(&format!("`in` needs a container, got {}", v.type_name()))),
                };
                found == (op == CompareOp::In)
            }
        };
        Ok(Value::Bool(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(json: &str) -> Env {
        Env::from_value(Value::from_json_str(json).unwrap()).unwrap()
    }

    fn eval(text: &str, env: &Env) -> Result<Value> {
        evaluate(&Value::from(text), env, true, false)
    }

    #[test]
    fn interpolation_and_native_values() -> Result<()> {
        let env = env(r#"{"name": "r1", "servers": ["a", "b"], "vlan": 10}"#);
        assert_eq!(eval("hostname {{ name }}", &env)?, Value::from("hostname r1"));
        assert_eq!(
            eval("{{ servers }}", &env)?,
            Value::from(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(eval("{{ vlan }}", &env)?, Value::from(10i64));
        assert_eq!(eval("{{ servers | join(',') }}", &env)?, Value::from("a,b"));
        Ok(())
    }

    #[test]
    fn coercion() -> Result<()> {
        let env = Env::new();
        assert_eq!(eval("42", &env)?, Value::from(42i64));
        assert_eq!(eval("", &env)?, Value::Null);
        assert_eq!(eval("{{ '' }}", &env)?, Value::Null);
        assert_eq!(eval("{{ true }}", &env)?, Value::Bool(true));
        assert_eq!(eval("abc", &env)?, Value::from("abc"));
        Ok(())
    }

    #[test]
    fn undefined_policy() -> Result<()> {
        let env = Env::new();
        let err = eval("host {{ missing.name }}", &env).unwrap_err();
        assert_eq!(
            RenderError::of(&err),
            Some(&RenderError::UndefinedReference {
                name: "missing.name".to_string()
            })
        );

        let v = evaluate(&Value::from("host {{ missing }}"), &env, false, false)?;
        assert_eq!(v, Value::Null);

        assert_eq!(eval("{{ missing | default('x') }}", &env)?, Value::from("x"));
        assert_eq!(eval("{{ missing is defined }}", &env)?, Value::Bool(false));
        Ok(())
    }

    #[test]
    fn structural() -> Result<()> {
        let env = env(r#"{"k": "hostname", "v": "r1"}"#);
        let expr = Value::from_json_str(r#"{"{{ k }}": "{{ v }}", "list": ["{{ v }}", 1]}"#)?;
        let out = evaluate(&expr, &env, false, false)?;
        assert_eq!(out, Value::from_json_str(r#"{"hostname": "r1", "list": ["r1", 1]}"#)?);
        Ok(())
    }

    #[test]
    fn bare_conversion() -> Result<()> {
        let env = env(r#"{"vlans": {"access": [1, 2]}}"#);
        let v = evaluate(&Value::from("vlans.access"), &env, false, true)?;
        assert_eq!(v, Value::from_json_str("[1, 2]")?);

        // Without bare conversion the text is kept.
        let v = evaluate(&Value::from("vlans.access"), &env, false, false)?;
        assert_eq!(v, Value::from("vlans.access"));

        // Unknown bare names are undefined.
        assert_eq!(evaluate(&Value::from("nope"), &env, false, true)?, Value::Null);

        // Inside a literal list only bound names are references.
        let v = evaluate(&Value::from_json_str(r#"["vlans.access", "nope"]"#)?, &env, false, true)?;
        assert_eq!(v, Value::from_json_str(r#"[[1, 2], "nope"]"#)?);
        Ok(())
    }

    #[test]
    fn null_keys_are_dropped() -> Result<()> {
        let env = env(r#"{"name": "eth0"}"#);
        let expr = Value::from_json_str(r#"{"{{ name }}": 1, "{{ missing }}": 2}"#)?;
        assert_eq!(
            evaluate(&expr, &env, false, false)?,
            Value::from_json_str(r#"{"eth0": 1}"#)?
        );
        Ok(())
    }

    #[test]
    fn rendered_values_keep_their_text() -> Result<()> {
        let env = env(r#"{"id": "0042"}"#);
        let render = |text: &str| render_value(&Value::from(text), &env, true);
        assert_eq!(render("007")?, Value::from("007"));
        assert_eq!(render("{{ id }}")?, Value::from("0042"));
        assert_eq!(render("{{ 99999999999999999999999 }}")?, Value::from("99999999999999999999999"));
        assert_eq!(render("id")?, Value::from("id"));
        assert_eq!(eval("{{ id }}", &env)?, Value::from(42i64));
        Ok(())
    }

    #[test]
    fn conditions() -> Result<()> {
        let env = env(r#"{"enabled": true, "mode": "trunk", "vlans": [10, 20]}"#);
        assert!(evaluate_condition(&Value::from("enabled"), &env)?);
        assert!(evaluate_condition(&Value::from("mode == 'trunk' and 10 in vlans"), &env)?);
        assert!(!evaluate_condition(&Value::from("missing"), &env)?);
        assert!(evaluate_condition(&Value::from("missing is not defined"), &env)?);
        assert!(!evaluate_condition(&Value::Bool(false), &env)?);
        assert!(!evaluate_condition(
            &Value::from_json_str(r#"["enabled", "mode == 'access'"]"#)?,
            &env
        )?);
        assert!(evaluate_condition(&Value::from("{{ enabled }}"), &env)?);
        Ok(())
    }

    #[test]
    fn omit_marker() -> Result<()> {
        let v = eval("description {{ omit }}", &Env::new())?;
        assert_eq!(v, Value::from(format!("description {OMIT_PLACEHOLDER}")));
        Ok(())
    }

    #[test]
    fn comparison_errors() {
        let env = env(r#"{"a": "x"}"#);
        assert!(eval("{{ a < 1 }}", &env).is_err());
    }
}
