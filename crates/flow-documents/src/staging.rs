use serde_json::{Map, Value};

use flow_store::WriteBatch;
use flow_types::{index_token_of, DocumentId, StreamName, TimestampMillis};

use crate::error::{DocumentError, DocumentResult};

/// A validated document waiting to be committed.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedDocument {
    pub id: DocumentId,
    pub timestamp: TimestampMillis,
    /// The full document, injected fields included. Always a JSON object.
    pub document: Value,
}

impl StagedDocument {
    fn fields(&self) -> Option<&Map<String, Value>> {
        self.document.as_object()
    }

    /// Put the document and all of its index entries into `batch`.
    ///
    /// Entries written: the document itself, one time entry, and one field
    /// entry per top-level scalar field. Index values are the document key.
    pub fn stage(&self, stream: &StreamName, batch: &mut WriteBatch) -> DocumentResult<()> {
        let doc_key = flow_keys::document_key(stream, self.id);
        let raw = serde_json::to_vec(&self.document)
            .map_err(|e| DocumentError::Serialization(e.to_string()))?;

        batch.put(doc_key.clone(), raw);
        batch.put(
            flow_keys::time_index_key(stream, self.timestamp, self.id),
            doc_key.clone(),
        );
        for (field, value) in self.fields().into_iter().flatten() {
            if let Some(token) = index_token_of(value) {
                batch.put(
                    flow_keys::field_index_key(stream, field, &token, self.timestamp, self.id),
                    doc_key.clone(),
                );
            }
        }
        Ok(())
    }

    /// Number of keys [`stage`](Self::stage) writes.
    pub fn entry_count(&self) -> usize {
        2 + self
            .fields()
            .into_iter()
            .flat_map(Map::values)
            .filter(|v| index_token_of(v).is_some())
            .count()
    }
}
