//! The enclosing declaration scope: every known record, by name.
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{trace, warn};

use crate::config::Config;
use crate::data::{Data, Instance};
use crate::engine::Engine;
use crate::error::{DiscoveryError, Error, Result};
use crate::ir::{Schema, TypeDescriptor};
use crate::record::{Decode, Record};
use crate::resolve::Scope;
use crate::schema::{discover_schema, Declaration};

/// Record declarations plus an optional per-name schema cache.
///
/// Shareable across threads: cached schemas are immutable once inserted and
/// two threads racing on the same miss both compute it, the first insert wins.
#[derive(Debug, Default)]
pub struct Namespace {
    config: Config,
    declarations: IndexMap<String, Declaration>,
    cache: RwLock<HashMap<String, Arc<Schema>>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn from_declarations<I>(config: Config, declarations: I) -> Self
    where
        I: IntoIterator<Item = Declaration>,
    {
        let mut namespace = Self::with_config(config);
        for decl in declarations {
            namespace.declare(decl);
        }
        namespace
    }

    /// Add or replace a record declaration.
    pub fn declare(&mut self, decl: Declaration) -> &mut Self {
        let name = decl.name.clone();
        if self.declarations.insert(name.clone(), decl).is_some() {
            warn!(record = %name, "record declared twice, keeping the latest declaration");
        }
        self.cache.get_mut().unwrap_or_else(PoisonError::into_inner).remove(&name);
        self
    }

    /// Declare `T` and every record reachable from its field types.
    ///
    /// Records are keyed by bare name, so two different records sharing a
    /// name (say `left::Item` and `right::Item`) are refused.
    pub fn register<T: Decode>(&mut self) -> Result<&mut Self> {
        T::register_types(self)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    pub fn record_names(&self) -> impl Iterator<Item = &str> {
        self.declarations.keys().map(String::as_str)
    }

    /// Discover (or fetch the cached) schema of record `name`.
    pub fn schema(&self, name: &str) -> Result<Arc<Schema>> {
        if self.config.cache_schemas {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(schema) = cache.get(name) {
                trace!(record = %name, "schema cache hit");
                return Ok(Arc::clone(schema));
            }
        }

        let decl = self
            .declarations
            .get(name)
            .ok_or_else(|| Error::discovery(name, DiscoveryError::Undeclared))?;
        let schema = Arc::new(discover_schema(decl, self)?);

        if !self.config.cache_schemas {
            return Ok(schema);
        }
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(name.to_string()).or_insert(schema)))
    }

    pub fn deserialize(&self, ty: &TypeDescriptor, raw: &Value) -> Result<Data> {
        Engine::new(self).deserialize(ty, raw)
    }

    pub fn deserialize_record(&self, name: &str, raw: &Value) -> Result<Instance> {
        Engine::new(self).deserialize_record(name, raw)
    }

    /// Decode into `T`, which must already be registered.
    pub fn decode<T: Record>(&self, raw: &Value) -> Result<T> {
        let instance = self.deserialize_record(T::NAME, raw)?;
        T::from_instance(instance)
    }
}

impl Scope for Namespace {
    fn declares(&self, name: &str) -> bool {
        self.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Namespace {
        Namespace::from_declarations(
            Config::default(),
            [
                Declaration::new("A").field("a", "int").field("b", "B"),
                Declaration::new("B").field("b", "int"),
            ],
        )
    }

    #[test]
    fn forward_references_resolve_lazily() {
        let ns = sample();
        let schema = ns.schema("A").unwrap();
        assert_eq!(schema.fields[1].ty, TypeDescriptor::record("B"));
    }

    #[test]
    fn cached_schema_is_shared() {
        let ns = sample();
        let first = ns.schema("B").unwrap();
        let second = ns.schema("B").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn uncached_schema_is_rederived_but_equal() {
        let config = Config { cache_schemas: false, ..Config::default() };
        let ns = Namespace::from_declarations(config, [Declaration::new("B").field("b", "int")]);
        let first = ns.schema("B").unwrap();
        let second = ns.schema("B").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn redeclaring_invalidates_the_cached_schema() {
        let mut ns = sample();
        assert_eq!(ns.schema("B").unwrap().fields.len(), 1);
        ns.declare(Declaration::new("B").field("b", "int").field("c", "str"));
        assert_eq!(ns.schema("B").unwrap().field_names().collect::<Vec<_>>(), ["b", "c"]);
    }

    #[test]
    fn undeclared_record_fails_discovery() {
        let err = sample().schema("Nope").unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaDiscovery { cause: DiscoveryError::Undeclared, ref record } if record == "Nope"
        ));
    }

    #[test]
    fn namespace_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Namespace>();

        let ns = sample();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| assert_eq!(ns.schema("A").unwrap().record, "A"));
            }
        });
    }
}
