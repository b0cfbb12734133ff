use std::fmt;

use serde::{Deserialize, Serialize};

use flow_types::StreamName;

/// An independent id sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SequenceScope {
    /// One sequence shared by every stream.
    Global,
    /// A sequence owned by a single stream.
    Stream(StreamName),
}

impl SequenceScope {
    /// Key under which the scope's lease bound is persisted.
    pub fn key(&self) -> Vec<u8> {
        match self {
            Self::Global => flow_keys::global_sequence_key(),
            Self::Stream(stream) => flow_keys::stream_sequence_key(stream),
        }
    }
}

impl fmt::Display for SequenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Stream(stream) => write!(f, "stream:{stream}"),
        }
    }
}

/// Which sequence documents draw their ids from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScope {
    /// Each stream numbers its documents independently.
    #[default]
    PerStream,
    /// All streams share one sequence; ids are unique database-wide.
    Global,
}

impl IdScope {
    pub fn scope_for(self, stream: &StreamName) -> SequenceScope {
        match self {
            Self::PerStream => SequenceScope::Stream(stream.clone()),
            Self::Global => SequenceScope::Global,
        }
    }
}
