use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use flow_store::{KvSnapshot, KvStore, StoreError, WriteBatch};
use flow_types::StreamName;

use crate::error::{SchemaError, SchemaResult};
use crate::validator::SchemaValidator;

/// A stream and the schema its documents must satisfy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamDefinition {
    pub name: StreamName,
    pub schema: Value,
}

impl StreamDefinition {
    pub fn new(name: impl Into<String>, schema: Value) -> SchemaResult<Self> {
        Ok(Self {
            name: StreamName::new(name)?,
            schema,
        })
    }
}

/// Persisted stream configuration.
///
/// A configuration command rewrites the stream list wholesale and stores
/// each stream's schema, all in one batch. Schemas of streams dropped from
/// the list stay in the store, so their documents remain addressable.
pub struct SchemaRegistry {
    store: Arc<dyn KvStore>,
}

impl SchemaRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Replace the stream configuration atomically.
    ///
    /// Repeated names collapse to the position of their first occurrence;
    /// the last schema given for a name wins. If the commit fails the
    /// previous configuration is left untouched.
    pub fn set_configuration(&self, streams: &[StreamDefinition]) -> SchemaResult<()> {
        let mut order: Vec<&StreamName> = Vec::with_capacity(streams.len());
        let mut schemas: HashMap<&StreamName, &Value> = HashMap::with_capacity(streams.len());
        for def in streams {
            if schemas.insert(&def.name, &def.schema).is_none() {
                order.push(&def.name);
            }
        }

        let mut batch = WriteBatch::with_capacity(order.len() + 1);
        for name in &order {
            let schema = serde_json::to_vec(schemas[name]).map_err(|e| {
                StoreError::corrupt(&flow_keys::schema_key(name), e.to_string())
            })?;
            batch.put(flow_keys::schema_key(name), schema);
        }
        let list = serde_json::to_vec(&order)
            .map_err(|e| StoreError::corrupt(&flow_keys::stream_list_key(), e.to_string()))?;
        batch.put(flow_keys::stream_list_key(), list);

        self.store.commit(batch)?;
        info!(streams = order.len(), "stream configuration replaced");
        Ok(())
    }

    /// Names from the most recent configuration command, in order.
    pub fn current_configuration(&self) -> SchemaResult<Vec<StreamName>> {
        let key = flow_keys::stream_list_key();
        let raw = self
            .store
            .get(&key)?
            .ok_or(SchemaError::ConfigurationNotFound)?;
        serde_json::from_slice(&raw)
            .map_err(|e| StoreError::corrupt(&key, e.to_string()).into())
    }

    pub fn schema_for(&self, stream: &StreamName) -> SchemaResult<Value> {
        let snapshot = self.store.snapshot()?;
        schema_in(snapshot.as_ref(), stream)
    }

    /// Load and compile a stream's schema.
    pub fn validator_for(&self, stream: &StreamName) -> SchemaResult<SchemaValidator> {
        let schema = self.schema_for(stream)?;
        SchemaValidator::compile(&schema).map_err(|reason| SchemaError::InvalidSchema {
            stream: stream.clone(),
            reason,
        })
    }

    pub fn is_configured(&self, stream: &StreamName) -> SchemaResult<bool> {
        Ok(self.store.get(&flow_keys::schema_key(stream))?.is_some())
    }
}

/// Read a stream's schema inside an existing snapshot.
pub fn schema_in(snapshot: &dyn KvSnapshot, stream: &StreamName) -> SchemaResult<Value> {
    let key = flow_keys::schema_key(stream);
    let raw = snapshot
        .get(&key)?
        .ok_or_else(|| SchemaError::StreamNotFound(stream.clone()))?;
    serde_json::from_slice(&raw).map_err(|e| StoreError::corrupt(&key, e.to_string()).into())
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_store::{InMemoryKvStore, StoreResult};
    use serde_json::json;

    fn def(name: &str, schema: Value) -> StreamDefinition {
        StreamDefinition::new(name, schema).unwrap()
    }

    fn name(s: &str) -> StreamName {
        StreamName::new(s).unwrap()
    }

    /// Store whose commits always fail, for all-or-nothing checks.
    struct FailingCommits(InMemoryKvStore);

    impl KvStore for FailingCommits {
        fn snapshot(&self) -> StoreResult<Box<dyn KvSnapshot>> {
            self.0.snapshot()
        }

        fn commit(&self, _batch: WriteBatch) -> StoreResult<()> {
            Err(StoreError::Backend("disk full".into()))
        }

        fn fetch_update(
            &self,
            key: &[u8],
            f: &mut dyn FnMut(Option<&[u8]>) -> StoreResult<Vec<u8>>,
        ) -> StoreResult<Vec<u8>> {
            self.0.fetch_update(key, f)
        }
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    #[test]
    fn configuration_round_trip() {
        let registry = SchemaRegistry::new(Arc::new(InMemoryKvStore::new()));
        registry
            .set_configuration(&[def("a", json!({"type": "object"})), def("b", json!({}))])
            .unwrap();
        assert_eq!(registry.current_configuration().unwrap(), vec![name("a"), name("b")]);
        assert_eq!(registry.schema_for(&name("a")).unwrap(), json!({"type": "object"}));
        assert_eq!(registry.schema_for(&name("b")).unwrap(), json!({}));
    }

    #[test]
    fn missing_configuration_is_not_found() {
        let registry = SchemaRegistry::new(Arc::new(InMemoryKvStore::new()));
        assert!(matches!(
            registry.current_configuration(),
            Err(SchemaError::ConfigurationNotFound)
        ));
    }

    #[test]
    fn unknown_stream_is_not_found() {
        let registry = SchemaRegistry::new(Arc::new(InMemoryKvStore::new()));
        registry.set_configuration(&[def("a", json!({}))]).unwrap();
        assert!(matches!(
            registry.schema_for(&name("zzz")),
            Err(SchemaError::StreamNotFound(_))
        ));
        assert!(!registry.is_configured(&name("zzz")).unwrap());
        assert!(registry.is_configured(&name("a")).unwrap());
    }

    #[test]
    fn stream_list_is_replaced_not_merged() {
        let registry = SchemaRegistry::new(Arc::new(InMemoryKvStore::new()));
        registry
            .set_configuration(&[def("a", json!({})), def("b", json!({}))])
            .unwrap();
        registry.set_configuration(&[def("c", json!({}))]).unwrap();
        assert_eq!(registry.current_configuration().unwrap(), vec![name("c")]);
        // Dropped streams keep their schema.
        assert!(registry.schema_for(&name("a")).is_ok());
    }

    #[test]
    fn resubmitting_a_stream_overwrites_its_schema() {
        let registry = SchemaRegistry::new(Arc::new(InMemoryKvStore::new()));
        registry.set_configuration(&[def("a", json!({"type": "object"}))]).unwrap();
        registry.set_configuration(&[def("a", json!({"type": "array"}))]).unwrap();
        assert_eq!(registry.schema_for(&name("a")).unwrap(), json!({"type": "array"}));
    }

    #[test]
    fn duplicate_names_collapse_and_last_schema_wins() {
        let registry = SchemaRegistry::new(Arc::new(InMemoryKvStore::new()));
        registry
            .set_configuration(&[
                def("a", json!({"v": 1})),
                def("b", json!({})),
                def("a", json!({"v": 2})),
            ])
            .unwrap();
        assert_eq!(registry.current_configuration().unwrap(), vec![name("a"), name("b")]);
        assert_eq!(registry.schema_for(&name("a")).unwrap(), json!({"v": 2}));
    }

    #[test]
    fn empty_configuration_clears_the_list() {
        let registry = SchemaRegistry::new(Arc::new(InMemoryKvStore::new()));
        registry.set_configuration(&[def("a", json!({}))]).unwrap();
        registry.set_configuration(&[]).unwrap();
        assert!(registry.current_configuration().unwrap().is_empty());
    }

    #[test]
    fn empty_stream_name_rejected() {
        assert!(matches!(
            StreamDefinition::new("", json!({})),
            Err(SchemaError::InvalidStream(_))
        ));
        let parsed: Result<StreamDefinition, _> =
            serde_json::from_value(json!({"name": "", "schema": {}}));
        assert!(parsed.is_err());
    }

    #[test]
    fn failed_commit_keeps_previous_configuration() {
        let inner = InMemoryKvStore::new();
        let mut batch = WriteBatch::new();
        batch.put(flow_keys::stream_list_key(), b"[\"old\"]".to_vec());
        batch.put(flow_keys::schema_key(&name("old")), b"{}".to_vec());
        inner.commit(batch).unwrap();

        let registry = SchemaRegistry::new(Arc::new(FailingCommits(inner)));
        let err = registry
            .set_configuration(&[def("new", json!({}))])
            .unwrap_err();
        assert!(matches!(err, SchemaError::Store(_)));
        assert_eq!(registry.current_configuration().unwrap(), vec![name("old")]);
        assert!(matches!(
            registry.schema_for(&name("new")),
            Err(SchemaError::StreamNotFound(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Validators
    // -----------------------------------------------------------------------

    #[test]
    fn validator_for_configured_stream() {
        let registry = SchemaRegistry::new(Arc::new(InMemoryKvStore::new()));
        registry
            .set_configuration(&[def("a", json!({"required": ["x"]}))])
            .unwrap();
        let validator = registry.validator_for(&name("a")).unwrap();
        assert!(validator.is_valid(&json!({"x": 1})));
        assert!(!validator.is_valid(&json!({"y": 1})));
    }

    #[test]
    fn uncompilable_schema_reported_at_use() {
        let registry = SchemaRegistry::new(Arc::new(InMemoryKvStore::new()));
        registry
            .set_configuration(&[def("a", json!({"type": 12}))])
            .unwrap();
        assert!(matches!(
            registry.validator_for(&name("a")),
            Err(SchemaError::InvalidSchema { .. })
        ));
    }
}
