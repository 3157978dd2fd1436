use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GeoError, Result};

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Attribute name to value, ordered by name.
pub type Attributes = BTreeMap<String, AttrValue>;

impl AttrValue {
    /// Convert a loosely typed JSON value. Arrays and objects are rejected;
    /// numbers that do not fit an `f64` become `Null`.
    pub fn from_json(name: &str, value: serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(AttrValue::Null),
            Value::Bool(b) => Ok(AttrValue::Bool(b)),
            Value::Number(n) => Ok(n.as_f64().filter(|v| v.is_finite()).map_or(AttrValue::Null, AttrValue::Number)),
            Value::String(s) => Ok(AttrValue::String(s)),
            Value::Array(_) => Err(GeoError::attribute(name, "arrays are not attribute values")),
            Value::Object(_) => Err(GeoError::attribute(name, "objects are not attribute values")),
        }
    }

    #[inline] pub fn is_null(&self) -> bool { matches!(self, AttrValue::Null) }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Bool(_) => "bool",
            AttrValue::Number(_) => "number",
            AttrValue::String(_) => "string",
        }
    }

    /// Numeric view: numbers as-is, booleans as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            AttrValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Order two values of the same kind. `None` when the kinds differ or
    /// either side is null.
    pub fn compare(&self, other: &AttrValue) -> Option<Ordering> {
        match (self, other) {
            (AttrValue::Number(a), AttrValue::Number(b)) => a.partial_cmp(b),
            (AttrValue::String(a), AttrValue::String(b)) => Some(a.cmp(b)),
            (AttrValue::Bool(a), AttrValue::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Validate a JSON object of attributes.
pub fn attributes_from_json(object: serde_json::Map<String, serde_json::Value>) -> Result<Attributes> {
    object.into_iter()
        .map(|(name, value)| {
            let value = AttrValue::from_json(&name, value)?;
            Ok((name, value))
        })
        .collect()
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "null"),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Number(v) => write!(f, "{v}"),
            AttrValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self { if v.is_finite() { AttrValue::Number(v) } else { AttrValue::Null } }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self { AttrValue::Number(v as f64) }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self { AttrValue::Number(v as f64) }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self { AttrValue::Bool(v) }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self { AttrValue::String(v.to_string()) }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self { AttrValue::String(v) }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self { v.map_or(AttrValue::Null, Into::into) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_are_accepted() {
        let json = json!({ "name": "Balboa", "acres": 1200.5, "open": true, "closed": null });
        let serde_json::Value::Object(object) = json else { unreachable!() };
        let attrs = attributes_from_json(object).unwrap();

        assert_eq!(attrs["name"], AttrValue::from("Balboa"));
        assert_eq!(attrs["acres"], AttrValue::Number(1200.5));
        assert_eq!(attrs["open"], AttrValue::Bool(true));
        assert!(attrs["closed"].is_null());
    }

    #[test]
    fn nested_json_is_rejected() {
        let serde_json::Value::Object(object) = json!({ "tags": ["a", "b"] }) else { unreachable!() };
        let err = attributes_from_json(object).unwrap_err();
        assert_eq!(err.kind(), "invalid-attribute");
    }

    #[test]
    fn compare_same_kind_only() {
        assert_eq!(AttrValue::from(1.0).compare(&AttrValue::from(2.0)), Some(Ordering::Less));
        assert_eq!(AttrValue::from("b").compare(&AttrValue::from("a")), Some(Ordering::Greater));
        assert_eq!(AttrValue::from(1.0).compare(&AttrValue::from("1")), None);
        assert_eq!(AttrValue::Null.compare(&AttrValue::Null), None);
    }

    #[test]
    fn non_finite_numbers_become_null() {
        assert!(AttrValue::from(f64::NAN).is_null());
        assert!(AttrValue::from(None::<f64>).is_null());
        assert_eq!(AttrValue::from(true).as_f64(), Some(1.0));
    }

    #[test]
    fn serializes_untagged() {
        let value = serde_json::to_value(AttrValue::from("x")).unwrap();
        assert_eq!(value, json!("x"));
        let back: AttrValue = serde_json::from_value(json!(3.5)).unwrap();
        assert_eq!(back, AttrValue::Number(3.5));
    }
}
