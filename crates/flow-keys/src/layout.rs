use flow_types::{DocumentId, IndexToken, StreamName, TimestampMillis};

use crate::codec::{decode_id, decode_timestamp, encode_id, encode_timestamp, escape};
use crate::error::{KeyError, KeyResult};

const STREAM_LIST: &[u8] = b"streams";
const GLOBAL_SEQUENCE: &[u8] = b"sequences/global";

fn stream_root(stream: &StreamName) -> String {
    format!("streams@{}/", escape(stream.as_str()))
}

/// Key of the process-wide list of configured streams.
pub fn stream_list_key() -> Vec<u8> {
    STREAM_LIST.to_vec()
}

/// Key holding the lease bound of the global id sequence.
pub fn global_sequence_key() -> Vec<u8> {
    GLOBAL_SEQUENCE.to_vec()
}

pub fn schema_key(stream: &StreamName) -> Vec<u8> {
    format!("{}schema", stream_root(stream)).into_bytes()
}

/// Key holding the lease bound of a stream's own id sequence.
pub fn stream_sequence_key(stream: &StreamName) -> Vec<u8> {
    format!("{}sequence", stream_root(stream)).into_bytes()
}

pub fn document_key(stream: &StreamName, id: DocumentId) -> Vec<u8> {
    format!("{}documents/{}", stream_root(stream), encode_id(id.value())).into_bytes()
}

pub fn time_index_prefix(stream: &StreamName) -> Vec<u8> {
    format!("{}indices/", stream_root(stream)).into_bytes()
}

pub fn time_index_key(stream: &StreamName, ts: TimestampMillis, id: DocumentId) -> Vec<u8> {
    let mut key = time_index_prefix(stream);
    push_posting(&mut key, ts, id);
    key
}

/// Prefix covering every value of one field. Postings under it are ordered
/// by value token first, so a scan of it is not in time order.
pub fn field_presence_prefix(stream: &StreamName, field: &str) -> Vec<u8> {
    format!("{}fields/{}/", stream_root(stream), escape(field)).into_bytes()
}

/// Prefix covering exactly the postings of `field == value`.
///
/// The trailing delimiter matters: without it the prefix for `s:ab` would
/// also match `s:abc`.
pub fn field_index_prefix(stream: &StreamName, field: &str, value: &IndexToken) -> Vec<u8> {
    let mut key = field_presence_prefix(stream, field);
    key.extend_from_slice(escape(value.as_str()).as_bytes());
    key.push(b'/');
    key
}

pub fn field_index_key(
    stream: &StreamName,
    field: &str,
    value: &IndexToken,
    ts: TimestampMillis,
    id: DocumentId,
) -> Vec<u8> {
    let mut key = field_index_prefix(stream, field, value);
    push_posting(&mut key, ts, id);
    key
}

fn push_posting(key: &mut Vec<u8>, ts: TimestampMillis, id: DocumentId) {
    key.extend_from_slice(encode_timestamp(ts).as_bytes());
    key.push(b'/');
    key.extend_from_slice(encode_id(id.value()).as_bytes());
}

/// Ordering components carried by a time or field index key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostingKey {
    pub timestamp: TimestampMillis,
    pub id: DocumentId,
}

/// Decode the trailing `{timestamp}/{id}` of an index key.
pub fn decode_posting(key: &[u8]) -> KeyResult<PostingKey> {
    let mut parts = key.rsplitn(3, |b| *b == b'/');
    let (Some(id), Some(ts), Some(_)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(KeyError::malformed(key, "expected {timestamp}/{id} suffix"));
    };
    Ok(PostingKey {
        timestamp: decode_timestamp(ts)?,
        id: DocumentId::new(decode_id(id)?),
    })
}
