//! Recursive deserialization of raw values against type descriptors.
//!
//! The engine matches exhaustively on [`TypeDescriptor`]; records are looked up
//! in the [`Namespace`] by name when first reached, so mutually referencing
//! records only need to be declared, not ordered. A record is assembled in an
//! [`InstanceBuilder`] and only finalized once every schema field decoded, so a
//! failure anywhere below leaves nothing half-built behind.

use serde_json::Value;
use tracing::{trace, Level};

use crate::config::PrimitiveMode;
use crate::data::{value_kind, Data, Instance, InstanceBuilder};
use crate::error::{Error, Result};
use crate::ir::{PrimitiveKind, TypeDescriptor};
use crate::namespace::Namespace;
use crate::path_de::DataPath;

pub struct Engine<'ns> {
    namespace: &'ns Namespace,
}

impl<'ns> Engine<'ns> {
    pub fn new(namespace: &'ns Namespace) -> Self {
        Self { namespace }
    }

    pub fn deserialize(&self, ty: &TypeDescriptor, raw: &Value) -> Result<Data> {
        self.decode(ty, raw, &mut DataPath::root())
    }

    pub fn deserialize_record(&self, name: &str, raw: &Value) -> Result<Instance> {
        self.decode_record(name, raw, &mut DataPath::root())
    }

    fn decode(&self, ty: &TypeDescriptor, raw: &Value, path: &mut DataPath) -> Result<Data> {
        let limit = self.namespace.config().max_depth;
        if path.depth() > limit {
            return Err(Error::DepthLimit { path: path.to_string(), limit });
        }

        match ty {
            TypeDescriptor::Primitive(kind) => self.decode_primitive(*kind, raw, path),
            TypeDescriptor::SequenceOf(elem) => {
                let Value::Array(items) = raw else {
                    return Err(mismatch(path, "sequence", raw));
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.push_index(i);
                    out.push(self.decode(elem, item, path)?);
                    path.pop();
                }
                Ok(Data::Sequence(out))
            }
            TypeDescriptor::MappingOf(_, val) => {
                let Value::Object(map) = raw else {
                    return Err(mismatch(path, "mapping", raw));
                };
                let mut out = indexmap::IndexMap::with_capacity(map.len());
                for (key, item) in map {
                    path.push_key(key);
                    out.insert(key.clone(), self.decode(val, item, path)?);
                    path.pop();
                }
                Ok(Data::Mapping(out))
            }
            TypeDescriptor::RecordRef(name) => Ok(Data::Record(self.decode_record(name, raw, path)?)),
        }
    }

    fn decode_record(&self, name: &str, raw: &Value, path: &mut DataPath) -> Result<Instance> {
        if !self.namespace.contains(name) {
            return Err(Error::UnresolvedType { name: name.to_string() });
        }
        let schema = self.namespace.schema(name)?;
        let Value::Object(map) = raw else {
            return Err(mismatch(path, &format!("record `{name}`"), raw));
        };

        let mut builder = InstanceBuilder::with_capacity(name, schema.fields.len());
        for field in &schema.fields {
            let Some(item) = map.get(&field.name) else {
                return Err(Error::MissingField {
                    record: name.to_string(),
                    field: field.name.clone(),
                    path: path.to_string(),
                });
            };
            path.push_key(&field.name);
            let data = self.decode(&field.ty, item, path)?;
            path.pop();
            builder.set(field.name.clone(), data);
        }

        if tracing::enabled!(Level::TRACE) {
            let ignored: Vec<&str> =
                map.keys().filter(|k| schema.field(k).is_none()).map(String::as_str).collect();
            if !ignored.is_empty() {
                trace!(record = %name, path = %path, ?ignored, "keys outside the schema were not copied");
            }
        }
        Ok(builder.finish())
    }

    fn decode_primitive(&self, kind: PrimitiveKind, raw: &Value, path: &DataPath) -> Result<Data> {
        let data = match (kind, raw) {
            (PrimitiveKind::Integer, Value::Number(n)) => n
                .as_i64()
                .map(Data::Integer)
                .or_else(|| n.as_u64().map(Data::Unsigned)),
            (PrimitiveKind::Float, Value::Number(n)) => n.as_f64().map(Data::Float),
            (PrimitiveKind::Boolean, Value::Bool(b)) => Some(Data::Boolean(*b)),
            (PrimitiveKind::Text, Value::String(s)) => Some(Data::Text(s.clone())),
            _ => None,
        };
        match (data, self.namespace.config().primitives) {
            (Some(data), _) => Ok(data),
            (None, PrimitiveMode::Passthrough) => Ok(Data::Opaque(raw.clone())),
            (None, PrimitiveMode::Strict) if kind == PrimitiveKind::Integer && beyond_u64_or_i64(raw) => {
                Err(Error::TypeMismatch {
                    path: path.to_string(),
                    expected: kind.name().to_string(),
                    found: "integer out of range",
                })
            }
            (None, PrimitiveMode::Strict) => Err(mismatch(path, kind.name(), raw)),
        }
    }
}

/// Integers past both `i64` and `u64` only survive parsing as whole floats.
fn beyond_u64_or_i64(raw: &Value) -> bool {
    raw.as_f64()
        .is_some_and(|f| f.fract() == 0.0 && (f < i64::MIN as f64 || f >= u64::MAX as f64))
}

fn mismatch(path: &DataPath, expected: &str, raw: &Value) -> Error {
    Error::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: value_kind(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::DiscoveryError;
    use crate::schema::Declaration;
    use serde_json::json;

    fn namespace(config: Config) -> Namespace {
        Namespace::from_declarations(
            config,
            [
                Declaration::new("TestClass1").field("a", "int").field("b", "bool"),
                Declaration::new("TestClass2").field("c", "List[int]").field("e", "List[List[int]]"),
                Declaration::new("TestClass3")
                    .field("f", "Dict[str, int]")
                    .field("g", "Dict[str, Dict[str, str]]"),
                Declaration::new("A").field("a", "int").field("b", "B"),
                Declaration::new("B").field("b", "int"),
                Declaration::new("Broken").field("x", "Tuple[int]"),
            ],
        )
    }

    fn strict() -> Namespace {
        namespace(Config::default())
    }

    #[test]
    fn primitive_fields_copy_only_what_the_schema_names() {
        let ns = strict();
        let raw = json!({"a": 5, "b": true, "c": [1, 2, 3]});
        let obj = ns.deserialize_record("TestClass1", &raw).unwrap();
        assert_eq!(obj.get("a"), Some(&Data::Integer(5)));
        assert_eq!(obj.get("b"), Some(&Data::Boolean(true)));
        assert!(!obj.has("c"));
        assert!(!obj.has("d"));
        assert_eq!(obj.len(), 2);
    }

    #[test]
    fn nested_sequences_keep_shape() {
        let ns = strict();
        let raw = json!({"c": [1, 2, 3], "e": [[1, 2, 3], [4, 5, 6], [7, 8, 9]]});
        let obj = ns.deserialize_record("TestClass2", &raw).unwrap();
        let back = Data::Record(obj).to_value().unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn deep_sequences_of_any_depth() {
        let ns = strict();
        let mut ty = TypeDescriptor::Primitive(PrimitiveKind::Integer);
        let mut raw = json!(7);
        for _ in 0..12 {
            ty = TypeDescriptor::sequence_of(ty);
            raw = json!([raw.clone(), raw]);
        }
        let data = ns.deserialize(&ty, &raw).unwrap();
        assert_eq!(data.to_value().unwrap(), raw);
    }

    #[test]
    fn mappings_keep_keys_and_order() {
        let ns = strict();
        let raw = json!({"f": {"z": 1, "a": 2}, "g": {"outer": {"k": "v"}, "empty": {}}});
        let obj = ns.deserialize_record("TestClass3", &raw).unwrap();
        let f = obj.get("f").and_then(Data::as_mapping).unwrap();
        assert_eq!(f.keys().collect::<Vec<_>>(), ["z", "a"]);
        let g = obj.get("g").and_then(Data::as_mapping).unwrap();
        assert_eq!(g["outer"].as_mapping().unwrap()["k"], Data::Text("v".into()));
        assert!(g["empty"].as_mapping().unwrap().is_empty());
    }

    #[test]
    fn nested_records_become_distinct_instances() {
        let ns = strict();
        let obj = ns.deserialize_record("A", &json!({"a": 1, "b": {"b": 2}})).unwrap();
        assert_eq!(obj.record(), "A");
        assert_eq!(obj.get("a"), Some(&Data::Integer(1)));
        let b = obj.get("b").and_then(Data::as_record).unwrap();
        assert_eq!(b.record(), "B");
        assert_eq!(b.get("b"), Some(&Data::Integer(2)));
    }

    #[test]
    fn missing_key_fails_with_its_location() {
        let ns = strict();
        let err = ns.deserialize_record("TestClass1", &json!({"b": true})).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField { ref record, ref field, ref path }
                if record == "TestClass1" && field == "a" && path == "."
        ));

        let err = ns.deserialize_record("A", &json!({"a": 1, "b": {}})).unwrap_err();
        assert!(matches!(err, Error::MissingField { ref path, .. } if path == "b"));
    }

    #[test]
    fn strict_mode_rejects_mismatched_scalars() {
        let ns = strict();
        let err = ns.deserialize_record("TestClass1", &json!({"a": "5", "b": true})).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch { ref path, ref expected, found: "text" }
                if path == "a" && expected == "Integer"
        ));

        let err = ns
            .deserialize_record("TestClass2", &json!({"c": [1], "e": [[1], [2.5]]}))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref path, .. } if path == "e[1][0]"));
    }

    #[test]
    fn passthrough_mode_carries_scalars_unchanged() {
        let ns = namespace(Config { primitives: PrimitiveMode::Passthrough, ..Config::default() });
        let obj = ns.deserialize_record("TestClass1", &json!({"a": "5", "b": null})).unwrap();
        assert_eq!(obj.get("a"), Some(&Data::Opaque(json!("5"))));
        assert_eq!(obj.get("b"), Some(&Data::Opaque(Value::Null)));
    }

    #[test]
    fn containers_are_checked_in_every_mode() {
        let ns = namespace(Config { primitives: PrimitiveMode::Passthrough, ..Config::default() });
        let err = ns.deserialize_record("TestClass2", &json!({"c": 1, "e": []})).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { found: "integer", .. }));
        let err = ns.deserialize_record("A", &json!([1])).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { found: "sequence", .. }));
    }

    #[test]
    fn floats_accept_integral_numbers() {
        let ns = strict();
        let data = ns
            .deserialize(&TypeDescriptor::Primitive(PrimitiveKind::Float), &json!(3))
            .unwrap();
        assert_eq!(data, Data::Float(3.0));
    }

    #[test]
    fn unknown_record_reference_is_unresolved() {
        let err = strict().deserialize(&TypeDescriptor::record("Ghost"), &json!({})).unwrap_err();
        assert!(matches!(err, Error::UnresolvedType { ref name } if name == "Ghost"));
    }

    #[test]
    fn broken_declaration_surfaces_as_discovery_error() {
        let err = strict().deserialize_record("Broken", &json!({"x": [1]})).unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaDiscovery { cause: DiscoveryError::Field { ref field, .. }, .. } if field == "x"
        ));
    }

    #[test]
    fn depth_limit_stops_runaway_nesting() {
        let ns = namespace(Config { max_depth: 3, ..Config::default() });
        let ty = (0..6).fold(TypeDescriptor::Primitive(PrimitiveKind::Integer), |t, _| {
            TypeDescriptor::sequence_of(t)
        });
        let raw = json!([[[[[[1]]]]]]);
        let err = ns.deserialize(&ty, &raw).unwrap_err();
        assert!(matches!(err, Error::DepthLimit { limit: 3, ref path } if path == "[0][0][0][0]"));
    }

    #[test]
    fn integers_above_i64_stay_exact() {
        let ns = strict();
        let ty = TypeDescriptor::Primitive(PrimitiveKind::Integer);
        let data = ns.deserialize(&ty, &json!(u64::MAX)).unwrap();
        assert_eq!(data, Data::Unsigned(u64::MAX));
        assert_eq!(data.to_value().unwrap(), json!(u64::MAX));

        let data = ns.deserialize(&ty, &json!(9_223_372_036_854_775_808u64)).unwrap();
        assert_eq!(data.as_u64(), Some(1 << 63));
        assert_eq!(ns.deserialize(&ty, &json!(-3)).unwrap(), Data::Integer(-3));
    }

    #[test]
    fn integers_beyond_every_width_say_so() {
        let ns = strict();
        let ty = TypeDescriptor::Primitive(PrimitiveKind::Integer);
        let huge: Value = serde_json::from_str("18446744073709551616").unwrap();
        let err = ns.deserialize(&ty, &huge).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { found: "integer out of range", .. }));
        assert_eq!(err.to_string(), "at .: expected Integer, found integer out of range");

        let err = ns.deserialize(&ty, &json!(2.5)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { found: "float", .. }));
    }
}
