use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use flow_documents::DocumentStore;
use flow_query::QueryExecutor;
use flow_schema::{SchemaRegistry, StreamDefinition};
use flow_sequence::SequenceAllocator;
use flow_store::{InMemoryKvStore, KvStore, RedbKvStore};
use flow_types::{Clock, DocumentId, SortOrder, StreamName, SystemClock};

use crate::config::{FlowConfig, StorageConfig};
use crate::error::FlowResult;
use crate::search::SearchRequest;

/// An open FlowDB database.
///
/// All operations are synchronous and safe to call from many threads.
/// Documents are returned as the raw JSON bytes they were stored with.
pub struct FlowDb {
    registry: Arc<SchemaRegistry>,
    sequences: Arc<SequenceAllocator>,
    documents: DocumentStore,
    queries: QueryExecutor,
    config: FlowConfig,
}

impl FlowDb {
    /// Open a database as described by `config`.
    pub fn open(config: FlowConfig) -> FlowResult<Self> {
        Self::builder().config(config).build()
    }

    /// A fresh, empty in-memory database with default settings.
    pub fn in_memory() -> FlowResult<Self> {
        Self::builder().build()
    }

    pub fn builder() -> FlowDbBuilder {
        FlowDbBuilder::default()
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    // ---- Configuration ----

    /// Replace the configured stream list and schemas atomically.
    pub fn set_configuration(&self, streams: Vec<StreamDefinition>) -> FlowResult<()> {
        Ok(self.registry.set_configuration(&streams)?)
    }

    pub fn current_configuration(&self) -> FlowResult<Vec<StreamName>> {
        Ok(self.registry.current_configuration()?)
    }

    pub fn get_schema(&self, stream: &str) -> FlowResult<Value> {
        Ok(self.registry.schema_for(&StreamName::new(stream)?)?)
    }

    // ---- Documents ----

    /// Validate and store `documents`, all or nothing.
    pub fn append_documents(
        &self,
        stream: &str,
        documents: Vec<Value>,
    ) -> FlowResult<Vec<DocumentId>> {
        Ok(self.documents.append(&StreamName::new(stream)?, documents)?)
    }

    pub fn get_document(&self, stream: &str, id: DocumentId) -> FlowResult<Vec<u8>> {
        Ok(self.documents.get_document(&StreamName::new(stream)?, id)?)
    }

    /// Documents in timestamp order, newest first for `Descending`.
    pub fn recent(
        &self,
        stream: &str,
        order: SortOrder,
        limit: Option<usize>,
    ) -> FlowResult<Vec<Vec<u8>>> {
        Ok(self.documents.recent(&StreamName::new(stream)?, order, limit)?)
    }

    // ---- Search ----

    pub fn search(&self, request: &SearchRequest) -> FlowResult<Vec<Vec<u8>>> {
        let stream = StreamName::new(request.stream.as_str())?;
        let expression = flow_query::parse(&request.query)?;
        Ok(self
            .queries
            .execute(&stream, &expression, request.max_results, request.sort)?)
    }

    // ---- Lifecycle ----

    /// Return unused ids to the store so the next open continues the
    /// sequences without a gap.
    pub fn close(self) -> FlowResult<()> {
        self.sequences.release()?;
        info!("database closed");
        Ok(())
    }
}

impl std::fmt::Debug for FlowDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowDb")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`FlowDb`], optionally around a caller-supplied store or
/// clock.
#[derive(Default)]
pub struct FlowDbBuilder {
    config: FlowConfig,
    store: Option<Arc<dyn KvStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl FlowDbBuilder {
    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `store` instead of the one named by the configuration.
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> FlowResult<FlowDb> {
        let store: Arc<dyn KvStore> = match (self.store, &self.config.storage) {
            (Some(store), _) => store,
            (None, StorageConfig::InMemory) => Arc::new(InMemoryKvStore::new()),
            (None, StorageConfig::Path(path)) => Arc::new(RedbKvStore::open(path)?),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        let registry = Arc::new(SchemaRegistry::new(store.clone()));
        let sequences = Arc::new(SequenceAllocator::new(store.clone(), &self.config.sequence)?);
        let documents = DocumentStore::new(store.clone(), registry.clone(), sequences.clone(), clock)
            .with_id_scope(self.config.sequence.scope)
            .with_recent_config(self.config.recent.clone());
        let queries = QueryExecutor::new(store, self.config.query.clone());

        info!(storage = ?self.config.storage, "database opened");
        Ok(FlowDb {
            registry,
            sequences,
            documents,
            queries,
            config: self.config,
        })
    }
}
