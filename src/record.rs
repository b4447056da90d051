//! Typed records: compile-time declarations and conversions from/to [`Data`].
//!
//! [`record!`](crate::record!) declares a plain struct and captures each
//! field's name and type text with `stringify!`, which is all schema discovery
//! needs. Conversions go through a finished [`Instance`], so no struct value
//! exists before every field decoded.

use std::collections::{BTreeMap, HashMap, VecDeque};

use indexmap::IndexMap;

use crate::data::{Data, Instance};
use crate::error::{Error, Result};
use crate::namespace::Namespace;
use crate::schema::Declaration;

/// Built from decoded [`Data`].
pub trait Decode: Sized {
    fn from_data(data: Data) -> Result<Self>;

    /// Declare the records this type mentions. No-op for primitives.
    fn register_types(_namespace: &mut Namespace) -> Result<()> {
        Ok(())
    }
}

/// Lowered back to [`Data`].
pub trait Encode {
    fn to_data(&self) -> Data;
}

/// A struct with a declared schema, usually written with [`record!`](crate::record!).
pub trait Record: Decode + Encode {
    const NAME: &'static str;

    fn declaration() -> Declaration;
    fn from_instance(instance: Instance) -> Result<Self>;
    fn to_instance(&self) -> Instance;
}

/// Move one field out of `instance` and convert it.
pub fn take_field<T: Decode>(instance: &mut Instance, field: &str) -> Result<T> {
    let Some(data) = instance.take(field) else {
        return Err(Error::MissingField {
            record: instance.record().to_string(),
            field: field.to_string(),
            path: ".".to_string(),
        });
    };
    T::from_data(data)
}

/// Unwrap a `Data::Record` of the expected record type.
pub fn expect_record(data: Data, record: &'static str) -> Result<Instance> {
    match data {
        Data::Record(instance) if instance.record() == record => Ok(instance),
        Data::Record(instance) => Err(Error::Conversion {
            target: record,
            found: format!("record `{}`", instance.record()),
        }),
        other => Err(conversion(record, &other)),
    }
}

fn conversion(target: &'static str, data: &Data) -> Error {
    Error::Conversion { target, found: data.kind().to_string() }
}

/// Declare a struct whose fields double as its schema.
///
/// ```
/// recast::record! {
///     #[derive(Debug, PartialEq)]
///     pub struct Point {
///         pub x: i64,
///         pub y: i64,
///     }
/// }
///
/// let p: Point = recast::deserialize(&serde_json::json!({"x": 1, "y": 2})).unwrap();
/// assert_eq!(p, Point { x: 1, y: 2 });
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            const NAME: &'static str = stringify!($name);

            fn declaration() -> $crate::Declaration {
                $crate::Declaration::new(stringify!($name))
                    $( .field(stringify!($field), stringify!($ty)) )*
            }

            #[allow(unused_mut)]
            fn from_instance(mut instance: $crate::Instance) -> $crate::Result<Self> {
                Ok(Self {
                    $(
                        $field: $crate::record::take_field::<$ty>(
                            &mut instance,
                            stringify!($field).trim_start_matches("r#"),
                        )?,
                    )*
                })
            }

            fn to_instance(&self) -> $crate::Instance {
                #[allow(unused_mut)]
                let mut builder = $crate::InstanceBuilder::new(stringify!($name));
                $(
                    builder.set(
                        stringify!($field).trim_start_matches("r#"),
                        $crate::Encode::to_data(&self.$field),
                    );
                )*
                builder.finish()
            }
        }

        impl $crate::Decode for $name {
            fn from_data(data: $crate::Data) -> $crate::Result<Self> {
                let instance = $crate::record::expect_record(data, stringify!($name))?;
                <Self as $crate::Record>::from_instance(instance)
            }

            fn register_types(namespace: &mut $crate::Namespace) -> $crate::Result<()> {
                let declaration = <Self as $crate::Record>::declaration();
                match namespace.declaration(stringify!($name)) {
                    Some(existing) if *existing == declaration => return Ok(()),
                    Some(_) => {
                        return Err($crate::Error::SchemaDiscovery {
                            record: stringify!($name).to_string(),
                            cause: $crate::DiscoveryError::ConflictingDeclaration,
                        });
                    }
                    None => {}
                }
                namespace.declare(declaration);
                $( <$ty as $crate::Decode>::register_types(namespace)?; )*
                Ok(())
            }
        }

        impl $crate::Encode for $name {
            fn to_data(&self) -> $crate::Data {
                $crate::Data::Record(<Self as $crate::Record>::to_instance(self))
            }
        }
    };
}

// ————————————————————————————————————————————————————————————————————————————
// PRIMITIVES & CONTAINERS
// ————————————————————————————————————————————————————————————————————————————

macro_rules! integer_impls {
    ($($t:ty),*) => {$(
        impl Decode for $t {
            fn from_data(data: Data) -> Result<Self> {
                match data {
                    Data::Integer(i) => <$t>::try_from(i).map_err(|_| Error::Conversion {
                        target: stringify!($t),
                        found: format!("out-of-range integer {i}"),
                    }),
                    Data::Unsigned(u) => <$t>::try_from(u).map_err(|_| Error::Conversion {
                        target: stringify!($t),
                        found: format!("out-of-range integer {u}"),
                    }),
                    other => Err(conversion(stringify!($t), &other)),
                }
            }
        }

        impl Encode for $t {
            fn to_data(&self) -> Data {
                match i64::try_from(*self) {
                    Ok(i) => Data::Integer(i),
                    // only u64/usize above i64::MAX
                    Err(_) => Data::Unsigned(*self as u64),
                }
            }
        }
    )*};
}

integer_impls!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Decode for f64 {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Float(f) => Ok(f),
            other => Err(conversion("f64", &other)),
        }
    }
}

impl Encode for f64 {
    fn to_data(&self) -> Data {
        Data::Float(*self)
    }
}

impl Decode for f32 {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Float(f) if f.is_finite() && (f as f32).is_infinite() => Err(Error::Conversion {
                target: "f32",
                found: format!("out-of-range float {f:e}"),
            }),
            Data::Float(f) => Ok(f as f32),
            other => Err(conversion("f32", &other)),
        }
    }
}

impl Encode for f32 {
    fn to_data(&self) -> Data {
        Data::Float(f64::from(*self))
    }
}

impl Decode for bool {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Boolean(b) => Ok(b),
            other => Err(conversion("bool", &other)),
        }
    }
}

impl Encode for bool {
    fn to_data(&self) -> Data {
        Data::Boolean(*self)
    }
}

impl Decode for String {
    fn from_data(data: Data) -> Result<Self> {
        match data {
            Data::Text(s) => Ok(s),
            other => Err(conversion("String", &other)),
        }
    }
}

impl Encode for String {
    fn to_data(&self) -> Data {
        Data::Text(self.clone())
    }
}

macro_rules! sequence_impls {
    ($($seq:ident),*) => {$(
        impl<T: Decode> Decode for $seq<T> {
            fn from_data(data: Data) -> Result<Self> {
                match data {
                    Data::Sequence(items) => items.into_iter().map(T::from_data).collect(),
                    other => Err(conversion(stringify!($seq), &other)),
                }
            }

            fn register_types(namespace: &mut Namespace) -> Result<()> {
                T::register_types(namespace)
            }
        }

        impl<T: Encode> Encode for $seq<T> {
            fn to_data(&self) -> Data {
                Data::Sequence(self.iter().map(Encode::to_data).collect())
            }
        }
    )*};
}

sequence_impls!(Vec, VecDeque);

macro_rules! mapping_impls {
    ($($map:ident),*) => {$(
        impl<T: Decode> Decode for $map<String, T> {
            fn from_data(data: Data) -> Result<Self> {
                match data {
                    Data::Mapping(entries) => entries
                        .into_iter()
                        .map(|(k, v)| T::from_data(v).map(|v| (k, v)))
                        .collect(),
                    other => Err(conversion(stringify!($map), &other)),
                }
            }

            fn register_types(namespace: &mut Namespace) -> Result<()> {
                T::register_types(namespace)
            }
        }

        impl<T: Encode> Encode for $map<String, T> {
            fn to_data(&self) -> Data {
                Data::Mapping(self.iter().map(|(k, v)| (k.clone(), v.to_data())).collect())
            }
        }
    )*};
}

mapping_impls!(HashMap, BTreeMap, IndexMap);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InstanceBuilder;

    #[test]
    fn integers_are_range_checked() {
        assert_eq!(u8::from_data(Data::Integer(200)).unwrap(), 200);
        let err = u8::from_data(Data::Integer(300)).unwrap_err();
        assert!(matches!(err, Error::Conversion { target: "u8", .. }));
        assert!(i32::from_data(Data::Text("1".into())).is_err());
    }

    #[test]
    fn huge_unsigned_values_keep_their_number() {
        assert_eq!(u64::MAX.to_data(), Data::Unsigned(u64::MAX));
        assert_eq!(7u64.to_data(), Data::Integer(7));
        assert_eq!(u64::from_data(u64::MAX.to_data()).unwrap(), u64::MAX);
        let err = i64::from_data(Data::Unsigned(u64::MAX)).unwrap_err();
        assert!(matches!(err, Error::Conversion { target: "i64", .. }));
    }

    #[test]
    fn f32_rejects_what_it_cannot_hold() {
        assert_eq!(f32::from_data(Data::Float(0.5)).unwrap(), 0.5);
        let err = f32::from_data(Data::Float(1e300)).unwrap_err();
        assert!(matches!(err, Error::Conversion { target: "f32", .. }));
        assert_eq!(err.to_string(), "cannot convert out-of-range float 1e300 into f32");
    }

    #[test]
    fn containers_convert_elementwise() {
        let data = Data::Sequence(vec![
            Data::Sequence(vec![Data::Integer(1), Data::Integer(2)]),
            Data::Sequence(vec![]),
        ]);
        let v: Vec<Vec<i64>> = Decode::from_data(data.clone()).unwrap();
        assert_eq!(v, vec![vec![1, 2], vec![]]);
        assert_eq!(v.to_data(), data);

        let mut entries = IndexMap::new();
        entries.insert("k".to_string(), Data::Boolean(true));
        let m: BTreeMap<String, bool> = Decode::from_data(Data::Mapping(entries)).unwrap();
        assert_eq!(m.get("k"), Some(&true));
    }

    #[test]
    fn record_mismatch_names_both_types() {
        let mut b = InstanceBuilder::new("Other");
        b.set("x", Data::Integer(1));
        let err = expect_record(Data::Record(b.finish()), "Point").unwrap_err();
        assert_eq!(err.to_string(), "cannot convert record `Other` into Point");
    }
}
