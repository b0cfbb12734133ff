use serde::{Deserialize, Serialize};

use flow_types::SortOrder;

/// A search over one stream.
///
/// Field names follow the HTTP body: `dataStream`, `query`, `maxResults`,
/// `sortDirection`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(rename = "dataStream")]
    pub stream: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    #[serde(default, rename = "sortDirection")]
    pub sort: SortOrder,
}

impl SearchRequest {
    pub fn new(stream: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            query: query.into(),
            max_results: None,
            sort: SortOrder::default(),
        }
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}
