use thiserror::Error;

/// Errors from decoding keys read back from the store.
///
/// Encoding never fails; only keys of unexpected shape are rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("malformed key {key:?}: {reason}")]
    Malformed { key: String, reason: String },
}

impl KeyError {
    pub(crate) fn malformed(key: &[u8], reason: impl Into<String>) -> Self {
        Self::Malformed {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: reason.into(),
        }
    }
}

pub type KeyResult<T> = Result<T, KeyError>;
