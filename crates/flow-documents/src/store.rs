use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use flow_schema::{schema_in, SchemaRegistry, Violation};
use flow_sequence::{IdScope, SequenceAllocator};
use flow_store::{Direction, KvSnapshot, KvStore, WriteBatch};
use flow_types::{
    Clock, DocumentId, FieldValue, SortOrder, StreamName, ID_FIELD, STREAM_FIELD, TIMESTAMP_FIELD,
};

use crate::error::{DocumentError, DocumentResult};
use crate::staging::StagedDocument;

/// Settings for recency reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentConfig {
    /// Documents returned by `recent` when the caller gives no limit.
    pub default_limit: usize,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self { default_limit: 100 }
    }
}

/// Validated, atomically indexed document storage.
///
/// Every document is written together with its time entry and one field
/// entry per top-level scalar field in a single batch. Readers never see a
/// document without its index entries or an entry without its document.
pub struct DocumentStore {
    store: Arc<dyn KvStore>,
    registry: Arc<SchemaRegistry>,
    sequences: Arc<SequenceAllocator>,
    clock: Arc<dyn Clock>,
    id_scope: IdScope,
    recent: RecentConfig,
}

impl DocumentStore {
    pub fn new(
        store: Arc<dyn KvStore>,
        registry: Arc<SchemaRegistry>,
        sequences: Arc<SequenceAllocator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            sequences,
            clock,
            id_scope: IdScope::default(),
            recent: RecentConfig::default(),
        }
    }

    pub fn with_id_scope(mut self, id_scope: IdScope) -> Self {
        self.id_scope = id_scope;
        self
    }

    pub fn with_recent_config(mut self, recent: RecentConfig) -> Self {
        self.recent = recent;
        self
    }

    /// Validate and persist `documents` into `stream`, returning their ids in
    /// input order.
    ///
    /// The first document that fails validation aborts the call and nothing
    /// from the batch is written. Ids drawn for the batch before the failure
    /// are not reused.
    pub fn append(
        &self,
        stream: &StreamName,
        documents: Vec<Value>,
    ) -> DocumentResult<Vec<DocumentId>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let validator = self.registry.validator_for(stream)?;
        let scope = self.id_scope.scope_for(stream);

        let mut staged = Vec::with_capacity(documents.len());
        for (index, document) in documents.into_iter().enumerate() {
            let mut fields = match document {
                Value::Object(fields) => fields,
                other => {
                    return Err(DocumentError::Validation {
                        index,
                        violations: vec![not_an_object(&other)],
                    })
                }
            };

            let id = DocumentId::new(self.sequences.next(&scope)?);
            let timestamp = self.clock.now_millis();
            fields.insert(ID_FIELD.into(), json!(id.value()));
            fields.insert(STREAM_FIELD.into(), json!(stream.as_str()));
            fields.insert(TIMESTAMP_FIELD.into(), json!(timestamp));

            let document = Value::Object(fields);
            let violations = validator.validate(&document);
            if !violations.is_empty() {
                debug!(%stream, index, violations = violations.len(), "document rejected");
                return Err(DocumentError::Validation { index, violations });
            }
            staged.push(StagedDocument {
                id,
                timestamp,
                document,
            });
        }

        let entries = staged.iter().map(StagedDocument::entry_count).sum();
        let mut batch = WriteBatch::with_capacity(entries);
        for doc in &staged {
            doc.stage(stream, &mut batch)?;
        }
        self.store.commit(batch)?;

        let ids: Vec<DocumentId> = staged.iter().map(|d| d.id).collect();
        debug!(%stream, documents = ids.len(), entries, "appended documents");
        Ok(ids)
    }

    /// Raw JSON of one document.
    pub fn get_document(&self, stream: &StreamName, id: DocumentId) -> DocumentResult<Vec<u8>> {
        self.store
            .get(&flow_keys::document_key(stream, id))?
            .ok_or_else(|| DocumentError::DocumentNotFound {
                stream: stream.clone(),
                id,
            })
    }

    /// Up to `limit` documents of `stream` in timestamp order.
    ///
    /// Documents with equal timestamps come out in id order (reversed for
    /// descending). Fails with a schema `StreamNotFound` if the stream was
    /// never configured.
    pub fn recent(
        &self,
        stream: &StreamName,
        order: SortOrder,
        limit: Option<usize>,
    ) -> DocumentResult<Vec<Vec<u8>>> {
        let limit = limit.unwrap_or(self.recent.default_limit);
        let snapshot = self.store.snapshot()?;
        schema_in(snapshot.as_ref(), stream)?;

        let prefix = flow_keys::time_index_prefix(stream);
        let mut documents = Vec::with_capacity(limit.min(1024));
        for entry in snapshot.scan(&prefix, Direction::from(order))?.take(limit) {
            let (key, pointer) = entry?;
            documents.push(resolve(snapshot.as_ref(), &key, &pointer)?);
        }
        Ok(documents)
    }
}

/// Follow an index entry to its document inside `snapshot`.
///
/// A missing document means the index is inconsistent and is reported as
/// an error rather than skipped.
pub fn resolve(snapshot: &dyn KvSnapshot, index_key: &[u8], pointer: &[u8]) -> DocumentResult<Vec<u8>> {
    snapshot.get(pointer)?.ok_or_else(|| {
        let key = String::from_utf8_lossy(index_key).into_owned();
        let pointer = String::from_utf8_lossy(pointer).into_owned();
        warn!(%key, %pointer, "index entry points at a missing document");
        DocumentError::DanglingIndex { key, pointer }
    })
}

fn not_an_object(value: &Value) -> Violation {
    Violation {
        path: String::new(),
        rule: "/type".into(),
        message: format!(
            "document must be a JSON object, got {}",
            FieldValue::from(value).kind()
        ),
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("id_scope", &self.id_scope)
            .field("recent", &self.recent)
            .finish_non_exhaustive()
    }
}
