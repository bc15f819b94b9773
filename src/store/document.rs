use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single field value as delivered by the document store.
///
/// Decoding never fails: value kinds the normalizers have no use for
/// (bytes, references, geo points) collapse into `Other`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    Array(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
    Other,
}

impl FieldValue {
    /// Decodes a Firestore REST typed value (`{"stringValue": "..."}` and friends).
    pub fn from_firestore(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return FieldValue::Other;
        };
        let Some((kind, inner)) = obj.iter().next() else {
            return FieldValue::Other;
        };

        match kind.as_str() {
            "nullValue" => FieldValue::Null,
            "booleanValue" => inner.as_bool().map_or(FieldValue::Other, FieldValue::Bool),
            // int64 values travel as decimal strings
            "integerValue" => match inner {
                Value::String(s) => s.parse().map_or(FieldValue::Other, FieldValue::Integer),
                Value::Number(n) => n.as_i64().map_or(FieldValue::Other, FieldValue::Integer),
                _ => FieldValue::Other,
            },
            "doubleValue" => match inner {
                Value::Number(n) => n.as_f64().map_or(FieldValue::Other, FieldValue::Double),
                // NaN and the infinities are sent as strings
                Value::String(s) => s.parse().map_or(FieldValue::Other, FieldValue::Double),
                _ => FieldValue::Other,
            },
            "timestampValue" => inner
                .as_str()
                .and_then(parse_timestamp)
                .map_or(FieldValue::Other, FieldValue::Timestamp),
            "stringValue" => inner
                .as_str()
                .map_or(FieldValue::Other, |s| FieldValue::String(s.to_string())),
            "arrayValue" => FieldValue::Array(
                inner
                    .get("values")
                    .and_then(Value::as_array)
                    .map(|values| values.iter().map(FieldValue::from_firestore).collect())
                    .unwrap_or_default(),
            ),
            "mapValue" => FieldValue::Map(
                inner
                    .get("fields")
                    .and_then(Value::as_object)
                    .map(|fields| {
                        fields
                            .iter()
                            .map(|(k, v)| (k.clone(), FieldValue::from_firestore(v)))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            _ => FieldValue::Other,
        }
    }

    /// Converts plain JSON (as written in fixture files) into a field value.
    ///
    /// Plain JSON has no timestamp type; timestamp-shaped strings stay strings
    /// and are recognized later by [`FieldValue::as_timestamp`].
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n.as_f64().map_or(FieldValue::Other, FieldValue::Double),
            },
            Value::String(s) => FieldValue::String(s.clone()),
            Value::Array(items) => FieldValue::Array(items.iter().map(FieldValue::from_json).collect()),
            Value::Object(fields) => FieldValue::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JavaScript-style truthiness: null, `false`, zero, NaN and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Integer(i) => *i != 0,
            FieldValue::Double(d) => *d != 0.0 && !d.is_nan(),
            FieldValue::String(s) => !s.is_empty(),
            FieldValue::Timestamp(_) | FieldValue::Array(_) | FieldValue::Map(_) | FieldValue::Other => {
                true
            }
        }
    }

    /// Renders a scalar value as text, or `None` when it is falsy or not a scalar.
    pub fn as_text(&self) -> Option<String> {
        if !self.is_truthy() {
            return None;
        }
        match self {
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Double(d) => Some(d.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Interprets the value as a timestamp. RFC 3339 strings are accepted too.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            FieldValue::String(s) => parse_timestamp(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Ordering across value kinds, following the store's cross-type order:
    /// null < booleans < numbers < timestamps < strings < arrays < maps.
    pub fn store_cmp(&self, other: &FieldValue) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            (FieldValue::Array(a), FieldValue::Array(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.store_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => Ordering::Equal,
            },
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Integer(_) | FieldValue::Double(_) => 2,
            FieldValue::Timestamp(_) => 3,
            FieldValue::String(_) => 4,
            FieldValue::Array(_) => 5,
            FieldValue::Map(_) => 6,
            FieldValue::Other => 7,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        FieldValue::Array(value.into_iter().map(Into::into).collect())
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A loosely-typed document: store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDocument {
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter, mostly for fixtures and tests.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Decodes a document resource from the Firestore REST API.
    ///
    /// The id is the last segment of the resource `name`. Returns `None` only
    /// when the resource has no usable name.
    pub fn from_firestore(resource: &Value) -> Option<Self> {
        let name = resource.get("name")?.as_str()?;
        let id = name.rsplit('/').next().filter(|id| !id.is_empty())?;

        let fields = resource
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_firestore(v)))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: id.to_string(),
            fields,
        })
    }

    /// Builds a document from a plain JSON object whose `id` key holds the id.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let id = obj.get("id")?.as_str()?;
        let fields = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "id")
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
            .collect();
        Some(Self {
            id: id.to_string(),
            fields,
        })
    }
}
