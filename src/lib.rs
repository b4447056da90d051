//! Turn untyped nested data into declared records.
//!
//! Records declare their fields once (with [`record!`] or a declaration file);
//! the schema is recovered from that declaration, and a recursive engine walks
//! it against raw `serde_json::Value`s.
//!
//! ```
//! recast::record! {
//!     #[derive(Debug, PartialEq)]
//!     pub struct B { pub b: i64 }
//! }
//! recast::record! {
//!     #[derive(Debug, PartialEq)]
//!     pub struct A { pub a: i64, pub b: B }
//! }
//!
//! let raw = serde_json::json!({"a": 1, "b": {"b": 2}});
//! let a: A = recast::deserialize(&raw).unwrap();
//! assert_eq!(a, A { a: 1, b: B { b: 2 } });
//! assert_eq!(recast::serialize(&a).unwrap(), raw);
//! ```
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod ir;
pub mod jq_exec;
pub mod namespace;
pub mod path_de;
pub mod record;
pub mod resolve;
pub mod schema;

use serde_json::Value;

pub use config::{Config, PrimitiveMode};
pub use data::{Data, Instance, InstanceBuilder};
pub use engine::Engine;
pub use error::{DiscoveryError, Error, Result};
pub use ir::{FieldSchema, PrimitiveKind, Schema, TypeDescriptor};
pub use namespace::Namespace;
pub use record::{Decode, Encode, Record};
pub use schema::{Declaration, DeclarationFile, FieldDecl};

/// Decode `raw` into `T` using a fresh namespace holding `T` and every record
/// it reaches.
pub fn deserialize<T: Record>(raw: &Value) -> Result<T> {
    let mut namespace = Namespace::new();
    namespace.register::<T>()?;
    namespace.decode::<T>(raw)
}

/// Lower a value back to raw nested data; `deserialize` undoes it.
pub fn serialize<T: Encode + ?Sized>(value: &T) -> Result<Value> {
    value.to_data().to_value()
}
