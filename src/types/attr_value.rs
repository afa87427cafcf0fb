// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalized attribute values.
//!
//! Remote devices encode attribute values in several ways: enumerations
//! render as label names, state values render as their string form, and
//! fixed-size arrays render as tuples. [`AttrValue`] normalizes all of them
//! into a single comparable representation so that downstream equality
//! checks stay straightforward.

use std::fmt;

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Sentinel string returned when a device does not expose the requested
/// attribute.
///
/// Missing attributes deliberately surface as a value rather than an error
/// to keep test assertions terse.
pub(crate) const NOT_FOUND: &str = "attribute not found";

/// A normalized, comparable attribute value.
///
/// # Examples
///
/// ```
/// use statewatch::types::AttrValue;
///
/// let state = AttrValue::from("ON");
/// assert_eq!(state, AttrValue::Str("ON".to_string()));
///
/// let receptors = AttrValue::from(vec![1_i64, 2, 3]);
/// assert_eq!(receptors.to_string(), "(1, 2, 3)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A string value: plain strings, enum labels and state names.
    Str(String),
    /// A signed integer value.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A fixed-size array, normalized element-wise.
    Tuple(Vec<AttrValue>),
}

impl AttrValue {
    /// Returns the sentinel value reported for a missing attribute.
    #[must_use]
    pub fn not_found() -> Self {
        Self::Str(NOT_FOUND.to_string())
    }

    /// Returns `true` if this value is the missing-attribute sentinel.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Str(s) if s == NOT_FOUND)
    }

    /// Returns the string content if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric content as `f64` if this is a numeric value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the tuple elements if this is a tuple value.
    #[must_use]
    pub fn as_tuple(&self) -> Option<&[AttrValue]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Normalizes a JSON value into an `AttrValue`.
    ///
    /// Arrays normalize element-wise into tuples. JSON `null` (an attribute
    /// with no readable value) maps to the missing-attribute sentinel.
    /// Objects keep their JSON rendering as a string.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::not_found(),
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Self::Tuple(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(_) => Self::Str(value.to_string()),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(values: Vec<i64>) -> Self {
        Self::Tuple(values.into_iter().map(AttrValue::Int).collect())
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(values: Vec<AttrValue>) -> Self {
        Self::Tuple(values)
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for AttrValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_sentinel() {
        let value = AttrValue::not_found();
        assert!(value.is_not_found());
        assert!(!AttrValue::from("ON").is_not_found());
    }

    #[test]
    fn display_renders_tuples_like_tuples() {
        let value = AttrValue::from(vec![1_i64, 2, 3]);
        assert_eq!(value.to_string(), "(1, 2, 3)");
    }

    #[test]
    fn from_json_normalizes_scalars() {
        assert_eq!(
            AttrValue::from_json(&serde_json::json!("IDLE")),
            AttrValue::from("IDLE")
        );
        assert_eq!(AttrValue::from_json(&serde_json::json!(4)), AttrValue::Int(4));
        assert_eq!(
            AttrValue::from_json(&serde_json::json!(0.5)),
            AttrValue::Float(0.5)
        );
        assert_eq!(
            AttrValue::from_json(&serde_json::json!(true)),
            AttrValue::Bool(true)
        );
    }

    #[test]
    fn from_json_normalizes_arrays_elementwise() {
        let value = AttrValue::from_json(&serde_json::json!([1, 2, 3]));
        assert_eq!(value, AttrValue::from(vec![1_i64, 2, 3]));
    }

    #[test]
    fn from_json_null_is_not_found() {
        assert!(AttrValue::from_json(&serde_json::Value::Null).is_not_found());
    }

    #[test]
    fn serialize_is_plain_json() {
        let value = AttrValue::from(vec![1_i64, 2]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "[1,2]");

        let text = serde_json::to_string(&AttrValue::from("ON")).unwrap();
        assert_eq!(text, "\"ON\"");
    }

    #[test]
    fn deserialize_round_trips_through_normalization() {
        let value: AttrValue = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(value, AttrValue::from(vec![1_i64, 2, 3]));
    }
}
