// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::Result;
use cfgforge::*;

#[test]
fn merge_is_recursive_for_objects_only() -> Result<()> {
    let mut facts = Value::from_json_str(r#"{"a": {"x": 1}}"#)?;
    facts.merge(Value::from_json_str(r#"{"a": {"y": 2}}"#)?);
    assert_eq!(facts, Value::from_json_str(r#"{"a": {"x": 1, "y": 2}}"#)?);

    let mut facts = Value::from_json_str(r#"{"a": 1}"#)?;
    facts.merge(Value::from_json_str(r#"{"a": 2}"#)?);
    assert_eq!(facts, Value::from_json_str(r#"{"a": 2}"#)?);

    let mut facts = Value::from_json_str(r#"{"a": [1, 2]}"#)?;
    facts.merge(Value::from_json_str(r#"{"a": [3]}"#)?);
    assert_eq!(facts, Value::from_json_str(r#"{"a": [3]}"#)?);
    Ok(())
}

#[test]
fn yaml_keys_keep_order_and_become_strings() -> Result<()> {
    let v = Value::from_yaml_str("zeta: 1\n10: ten\nalpha: 2\ntrue: yes\n")?;
    let keys: Vec<&str> = v.as_object()?.keys().map(|k| &**k).collect();
    assert_eq!(keys, vec!["zeta", "10", "alpha", "true"]);

    let json = serde_json::to_string(&v)?;
    assert_eq!(json, r#"{"zeta":1,"10":"ten","alpha":2,"true":"yes"}"#);
    Ok(())
}

#[test]
fn text_forms() -> Result<()> {
    assert_eq!(Value::from(true).to_text(), "true");
    assert_eq!(Value::from(3i64).to_text(), "3");
    assert_eq!(Value::from_json_str("2.5")?.to_text(), "2.5");
    assert_eq!(Value::Null.to_text(), "");
    assert_eq!(Value::from_json_str(r#"["a", 1]"#)?.to_text(), r#"["a",1]"#);
    Ok(())
}

#[test]
fn emptiness() -> Result<()> {
    for empty in ["null", "false", r#""""#, "[]", "{}"] {
        assert!(Value::from_json_str(empty)?.is_empty(), "{empty}");
    }
    assert!(Value::Undefined.is_empty());
    assert!(!Value::from(0i64).is_empty());
    assert!(!Value::from(0i64).is_truthy());
    assert!(Value::from("0").is_truthy());
    Ok(())
}

#[test]
fn coercion() -> Result<()> {
    assert_eq!(coerce(Value::from(" 42 ")), Value::from(42i64));
    assert_eq!(coerce(Value::from("")), Value::Null);
    assert_eq!(coerce(Value::from("4.2")), Value::from("4.2"));
    assert_eq!(coerce(Value::from(true)), Value::from(true));
    Ok(())
}

#[test]
fn indexing() -> Result<()> {
    let v = Value::from_json_str(r#"{"vlans": [10, 20, 30]}"#)?;
    assert_eq!(v["vlans"][0], Value::from(10i64));
    assert_eq!(v["vlans"][5], Value::Undefined);
    assert_eq!(v["missing"]["deeper"], Value::Undefined);
    assert_eq!(v.lookup(&["vlans"]).as_array()?.len(), 3);
    Ok(())
}
