//! Typed output of the engine: decoded values and record instances.

use indexmap::IndexMap;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Integer(i64),
    /// Integers above `i64::MAX`; everything that fits stays `Integer`.
    Unsigned(u64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Sequence(Vec<Data>),
    Mapping(IndexMap<String, Data>),
    Record(Instance),
    /// A scalar carried through unchecked (passthrough primitive mode only).
    Opaque(Value),
}

/// A populated record: its name plus one entry per schema field, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    record: String,
    fields: IndexMap<String, Data>,
}

/// Accumulates field values; an `Instance` only exists once `finish` is called.
#[derive(Debug)]
pub struct InstanceBuilder {
    record: String,
    fields: IndexMap<String, Data>,
}

impl Data {
    pub fn kind(&self) -> &'static str {
        match self {
            Data::Integer(_) | Data::Unsigned(_) => "integer",
            Data::Float(_) => "float",
            Data::Boolean(_) => "boolean",
            Data::Text(_) => "text",
            Data::Sequence(_) => "sequence",
            Data::Mapping(_) => "mapping",
            Data::Record(_) => "record",
            Data::Opaque(v) => value_kind(v),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Data::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Data::Integer(i) => u64::try_from(*i).ok(),
            Data::Unsigned(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Data::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Data]> {
        match self {
            Data::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Data>> {
        match self {
            Data::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Instance> {
        match self {
            Data::Record(instance) => Some(instance),
            _ => None,
        }
    }

    /// Structural inverse of decoding: back to raw nested data.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Instance {
    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn get(&self, field: &str) -> Option<&Data> {
        self.fields.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Data)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Move a field's value out, leaving the remaining order intact.
    pub fn take(&mut self, field: &str) -> Option<Data> {
        self.fields.shift_remove(field)
    }
}

impl InstanceBuilder {
    pub fn new(record: impl Into<String>) -> Self {
        Self::with_capacity(record, 0)
    }

    pub fn with_capacity(record: impl Into<String>, fields: usize) -> Self {
        Self { record: record.into(), fields: IndexMap::with_capacity(fields) }
    }

    pub fn set(&mut self, field: impl Into<String>, value: Data) -> &mut Self {
        self.fields.insert(field.into(), value);
        self
    }

    pub fn finish(self) -> Instance {
        Instance { record: self.record, fields: self.fields }
    }
}

impl Serialize for Data {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Data::Integer(i) => serializer.serialize_i64(*i),
            Data::Unsigned(u) => serializer.serialize_u64(*u),
            Data::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Data::Float(f) => Err(S::Error::custom(format!("{f} has no JSON representation"))),
            Data::Boolean(b) => serializer.serialize_bool(*b),
            Data::Text(s) => serializer.serialize_str(s),
            Data::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Data::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Data::Record(instance) => instance.serialize(serializer),
            Data::Opaque(value) => value.serialize(serializer),
        }
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            out.serialize_entry(k, v)?;
        }
        out.end()
    }
}

pub(crate) fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "text",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
