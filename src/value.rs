// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::number::Number;

use core::fmt;
use std::ops;
use std::path::Path;
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Object fields. Insertion order is the order keys appeared in the source
/// document and is preserved through templating and merging.
pub type Map = IndexMap<Rc<str>, Value>;

// We cannot use serde_json::Value because templates need an explicit
// undefined marker and ordered objects with cheap clones.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    // Json data types. serde will automatically map json/yaml to these variants.
    Null,
    Bool(bool),
    Number(Number),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<Map>),

    // Result of looking up a name, key or index that does not exist.
    Undefined,
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null | Value::Undefined => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s.as_ref()),
            Value::Number(n) => n.serialize(serializer),
            Value::Array(a) => a.serialize(serializer),
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields.iter() {
                    map.serialize_entry(k.as_ref(), v)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a value")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Bool(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(Number::from(v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(Number::from(v)))
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(s.into()))
    }

    fn visit_string<E>(self, s: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(s.into()))
    }

    fn visit_seq<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: SeqAccess<'de>,
    {
        let mut arr = vec![];
        while let Some(v) = visitor.next_element()? {
            arr.push(v);
        }
        Ok(Value::from(arr))
    }

    fn visit_map<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: MapAccess<'de>,
    {
        // Yaml allows scalar keys such as `10:` or `true:`. Keys are always
        // strings once loaded.
        let mut map = Map::new();
        while let Some((key, value)) = visitor.next_entry::<Value, Value>()? {
            map.insert(key.to_text().into(), value);
        }
        Ok(Value::from(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{s}"),
            Err(_e) => Err(std::fmt::Error),
        }
    }
}

impl Value {
    pub fn new_object() -> Value {
        Value::from(Map::new())
    }

    pub fn from_json_str(json: &str) -> Result<Value> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Value> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Value> {
        match std::fs::read_to_string(&path) {
            Ok(c) => Self::from_json_str(c.as_str()),
            Err(e) => bail!("Failed to read {}. {e}", path.as_ref().display()),
        }
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Value> {
        match std::fs::read_to_string(&path) {
            Ok(c) => Self::from_yaml_str(c.as_str()),
            Err(e) => bail!("Failed to read {}. {e}", path.as_ref().display()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(Rc::new(a))
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Object(Rc::new(m))
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// A value with nothing to render: null, undefined, false, or an empty
    /// string, array or object.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null | Value::Undefined => true,
            Value::Bool(b) => !b,
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(m) => m.is_empty(),
            Value::Number(_) => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => !n.is_zero(),
            _ => !self.is_empty(),
        }
    }

    /// Text form used when a value is interpolated into a line.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null | Value::Undefined => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.format_decimal(),
            Value::String(s) => s.to_string(),
            Value::Array(_) | Value::Object(_) => self.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Undefined => "undefined",
        }
    }

    pub fn as_array(&self) -> Result<&Vec<Value>> {
        match self {
            Value::Array(a) => Ok(a),
            _ => Err(anyhow!("not an array")),
        }
    }

    pub fn as_object(&self) -> Result<&Map> {
        match self {
            Value::Object(m) => Ok(m),
            _ => Err(anyhow!("not an object")),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut Map> {
        match self {
            Value::Object(m) => Ok(Rc::make_mut(m)),
            _ => Err(anyhow!("not an object")),
        }
    }

    /// Wraps anything that is not already an array into a one element array.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::Array(a) => Rc::unwrap_or_clone(a),
            Value::Null | Value::Undefined => vec![],
            v => vec![v],
        }
    }
}

impl Value {
    /// Right-biased recursive merge. Keys present on both sides merge
    /// recursively when both values are objects; otherwise `new` wins.
    pub fn merge(&mut self, new: Value) {
        match (self, new) {
            (Value::Object(map), Value::Object(new)) => {
                let map = Rc::make_mut(map);
                for (k, v) in Rc::unwrap_or_clone(new) {
                    let both_objects = matches!(
                        (map.get(&k), &v),
                        (Some(Value::Object(_)), Value::Object(_))
                    );
                    if both_objects {
                        if let Some(existing) = map.get_mut(&k) {
                            existing.merge(v);
                        }
                    } else {
                        map.insert(k, v);
                    }
                }
            }
            (this, new) => *this = new,
        }
    }

    /// Looks up a dotted path such as `interfaces.Ethernet1.mtu`.
    pub fn lookup(&self, path: &[&str]) -> &Value {
        path.iter().fold(self, |v, k| &v[*k])
    }

    pub fn ensure_object(self, context: &str) -> Result<Value> {
        match self {
            v @ Value::Object(_) => Ok(v),
            v => bail!("{context}: expected an object, got {}", v.type_name()),
        }
    }
}

impl ops::Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Value::Array(a) if index < a.len() => &a[index],
            _ => &Value::Undefined,
        }
    }
}

impl ops::Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Self::Output {
        match self {
            Value::Object(o) => o.get(key).unwrap_or(&Value::Undefined),
            _ => &Value::Undefined,
        }
    }
}

impl ops::Index<&String> for Value {
    type Output = Value;

    fn index(&self, key: &String) -> &Self::Output {
        &self[key.as_str()]
    }
}

impl ops::Index<&Value> for Value {
    type Output = Value;

    fn index(&self, key: &Value) -> &Self::Output {
        match (self, key) {
            (Value::Object(_), Value::String(k)) => &self[k.as_ref()],
            (Value::Object(o), k) => o.get(k.to_text().as_str()).unwrap_or(&Value::Undefined),
            (Value::Array(a), Value::Number(n)) => match n.as_i64() {
                Some(i) if i >= 0 && (i as usize) < a.len() => &a[i as usize],
                // Negative indices count from the end.
                Some(i) if i < 0 && i.unsigned_abs() as usize <= a.len() => {
                    &a[a.len() - i.unsigned_abs() as usize]
                }
                _ => &Value::Undefined,
            },
            _ => &Value::Undefined,
        }
    }
}
