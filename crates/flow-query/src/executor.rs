use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use flow_keys::PostingKey;
use flow_store::{Direction, KvSnapshot, KvStore};
use flow_types::{SortOrder, StreamName};

use crate::ast::{Condition, Expression, Literal, Operator};
use crate::error::{QueryError, QueryResult};

/// Bounds applied to every query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// Results returned when the request names no limit.
    pub default_max_results: usize,
    /// Requested limits above this are clamped to it.
    pub max_results_cap: usize,
    /// Index keys one query may visit across all of its clauses.
    pub scan_budget: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_max_results: 100,
            max_results_cap: 10_000,
            scan_budget: 100_000,
        }
    }
}

/// A document matched by an index entry.
#[derive(Clone, Debug)]
struct Posting {
    index_key: Vec<u8>,
    document_key: Vec<u8>,
    key: PostingKey,
}

/// Counts index keys visited by one query.
struct ScanBudget {
    limit: usize,
    used: usize,
}

impl ScanBudget {
    fn charge(&mut self) -> QueryResult<()> {
        self.used += 1;
        if self.used > self.limit {
            return Err(QueryError::ScanBudgetExceeded { budget: self.limit });
        }
        Ok(())
    }
}

/// Answers equality queries from the field index.
///
/// Each clause is a prefix scan over `field = value` postings, which are
/// stored in timestamp order, so a scan in the requested direction yields
/// the best candidates first and stops after `max_results`. AND groups
/// intersect their clauses, OR groups are unioned, and the survivors are
/// sorted by timestamp (ties by ascending id) and resolved to documents.
/// Everything happens inside one snapshot.
///
/// Because every clause is cut at `max_results`, an AND group can miss
/// documents that match all of its clauses but sit beyond the cut in one
/// of them. Results are correct but may be incomplete for intersections.
pub struct QueryExecutor {
    store: Arc<dyn KvStore>,
    limits: QueryLimits,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn KvStore>, limits: QueryLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> &QueryLimits {
        &self.limits
    }

    /// Run `expression` against `stream` and return raw document bytes.
    pub fn execute(
        &self,
        stream: &StreamName,
        expression: &Expression,
        max_results: Option<usize>,
        order: SortOrder,
    ) -> QueryResult<Vec<Vec<u8>>> {
        let limit = self.effective_limit(max_results)?;
        check_supported(expression)?;

        let snapshot = self.store.snapshot()?;
        flow_schema::schema_in(snapshot.as_ref(), stream)?;

        let mut budget = ScanBudget {
            limit: self.limits.scan_budget,
            used: 0,
        };
        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        for group in &expression.or_groups {
            let mut survivors: Option<HashMap<Vec<u8>, Posting>> = None;
            for condition in &group.conditions {
                let postings =
                    scan_clause(snapshot.as_ref(), stream, condition, order, limit, &mut budget)?;
                survivors = Some(match survivors {
                    None => postings
                        .into_iter()
                        .map(|p| (p.document_key.clone(), p))
                        .collect(),
                    Some(mut current) => {
                        let keep: HashSet<Vec<u8>> =
                            postings.into_iter().map(|p| p.document_key).collect();
                        current.retain(|doc, _| keep.contains(doc));
                        current
                    }
                });
            }
            for (doc, posting) in survivors.unwrap_or_default() {
                if seen.insert(doc) {
                    matches.push(posting);
                }
            }
        }

        sort_postings(&mut matches, order);
        matches.truncate(limit);
        debug!(
            stream = %stream,
            query = %expression,
            results = matches.len(),
            scanned = budget.used,
            "query executed"
        );

        let mut documents = Vec::with_capacity(matches.len());
        for posting in &matches {
            documents.push(flow_documents::resolve(
                snapshot.as_ref(),
                &posting.index_key,
                &posting.document_key,
            )?);
        }
        Ok(documents)
    }

    fn effective_limit(&self, requested: Option<usize>) -> QueryResult<usize> {
        match requested {
            Some(0) => Err(QueryError::InvalidRequest(
                "max results must be at least 1".into(),
            )),
            Some(n) => Ok(n.min(self.limits.max_results_cap)),
            None => Ok(self
                .limits
                .default_max_results
                .clamp(1, self.limits.max_results_cap.max(1))),
        }
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

/// Reject every clause the field index cannot answer before any scan.
fn check_supported(expression: &Expression) -> QueryResult<()> {
    for condition in expression.or_groups.iter().flat_map(|g| &g.conditions) {
        let reason = if condition.negated {
            "negation is not supported"
        } else if condition.operator != Operator::Eq {
            "only equality is supported"
        } else {
            continue;
        };
        return Err(QueryError::UnsupportedOperator {
            clause: condition.to_string(),
            reason: reason.into(),
        });
    }
    Ok(())
}

fn scan_clause(
    snapshot: &dyn KvSnapshot,
    stream: &StreamName,
    condition: &Condition,
    order: SortOrder,
    limit: usize,
    budget: &mut ScanBudget,
) -> QueryResult<Vec<Posting>> {
    match &condition.value {
        Literal::Wildcard => {
            // Presence postings are grouped by value, not time, so the
            // whole range is read and then ordered.
            let prefix = flow_keys::field_presence_prefix(stream, &condition.field);
            let mut postings = collect(snapshot, &prefix, Direction::Forward, usize::MAX, budget)?;
            sort_postings(&mut postings, order);
            postings.truncate(limit);
            Ok(postings)
        }
        concrete => {
            let Some(token) = concrete.index_token() else {
                return Ok(Vec::new());
            };
            let prefix = flow_keys::field_index_prefix(stream, &condition.field, &token);
            collect(snapshot, &prefix, Direction::from(order), limit, budget)
        }
    }
}

fn collect(
    snapshot: &dyn KvSnapshot,
    prefix: &[u8],
    direction: Direction,
    limit: usize,
    budget: &mut ScanBudget,
) -> QueryResult<Vec<Posting>> {
    let mut postings = Vec::new();
    for entry in snapshot.scan(prefix, direction)? {
        if postings.len() >= limit {
            break;
        }
        budget.charge()?;
        let (index_key, document_key) = entry?;
        let key = flow_keys::decode_posting(&index_key)?;
        postings.push(Posting {
            index_key,
            document_key,
            key,
        });
    }
    Ok(postings)
}

/// Timestamp in the requested direction, ties by ascending id.
fn sort_postings(postings: &mut [Posting], order: SortOrder) {
    postings.sort_by(|a, b| {
        let by_time = a.key.timestamp.cmp(&b.key.timestamp);
        let by_time = if order.is_ascending() {
            by_time
        } else {
            by_time.reverse()
        };
        match by_time {
            Ordering::Equal => a.key.id.cmp(&b.key.id),
            other => other,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use flow_documents::DocumentStore;
    use flow_schema::{SchemaError, SchemaRegistry, StreamDefinition};
    use flow_sequence::{SequenceAllocator, SequenceConfig};
    use flow_store::{InMemoryKvStore, WriteBatch};
    use flow_types::ManualClock;
    use serde_json::{json, Value};

    struct Fixture {
        store: Arc<InMemoryKvStore>,
        docs: DocumentStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_clock(ManualClock::with_step(1_000, 10))
        }

        fn with_clock(clock: ManualClock) -> Self {
            let store = Arc::new(InMemoryKvStore::new());
            let registry = Arc::new(SchemaRegistry::new(store.clone()));
            registry
                .set_configuration(&[
                    StreamDefinition::new("people", json!({"type": "object"})).unwrap(),
                    StreamDefinition::new("empty", json!({})).unwrap(),
                ])
                .unwrap();
            let sequences =
                Arc::new(SequenceAllocator::new(store.clone(), &SequenceConfig::default()).unwrap());
            let docs = DocumentStore::new(store.clone(), registry, sequences, Arc::new(clock));
            Self { store, docs }
        }

        fn append(&self, docs: Vec<Value>) {
            self.docs.append(&stream("people"), docs).unwrap();
        }

        fn executor(&self) -> QueryExecutor {
            self.executor_with(QueryLimits::default())
        }

        fn executor_with(&self, limits: QueryLimits) -> QueryExecutor {
            QueryExecutor::new(self.store.clone(), limits)
        }
    }

    fn stream(name: &str) -> StreamName {
        StreamName::new(name).unwrap()
    }

    fn run(
        executor: &QueryExecutor,
        query: &str,
        max: Option<usize>,
        order: SortOrder,
    ) -> QueryResult<Vec<Value>> {
        let expr = parse(query).unwrap();
        Ok(executor
            .execute(&stream("people"), &expr, max, order)?
            .iter()
            .map(|raw| serde_json::from_slice(raw).unwrap())
            .collect())
    }

    fn names(docs: &[Value]) -> Vec<&str> {
        docs.iter().map(|d| d["name"].as_str().unwrap()).collect()
    }

    fn people() -> Fixture {
        let f = Fixture::new();
        f.append(vec![
            json!({"name": "ada", "team": "core", "active": true, "age": 36}),
            json!({"name": "bob", "team": "core", "active": false, "age": 40}),
            json!({"name": "cy", "team": "web", "active": true, "age": 36}),
            json!({"name": "di", "team": "web", "active": true}),
        ]);
        f
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    #[test]
    fn single_clause_newest_first() {
        let f = people();
        let docs = run(&f.executor(), "team = 'core'", None, SortOrder::Descending).unwrap();
        assert_eq!(names(&docs), vec!["bob", "ada"]);
    }

    #[test]
    fn ascending_order() {
        let f = people();
        let docs = run(&f.executor(), "active = true", None, SortOrder::Ascending).unwrap();
        assert_eq!(names(&docs), vec!["ada", "cy", "di"]);
    }

    #[test]
    fn and_intersects() {
        let f = people();
        let docs = run(
            &f.executor(),
            "team = 'web' AND active = TRUE AND age = 36",
            None,
            SortOrder::Descending,
        )
        .unwrap();
        assert_eq!(names(&docs), vec!["cy"]);
    }

    #[test]
    fn or_unions_without_duplicates() {
        let f = people();
        let docs = run(
            &f.executor(),
            "age = 36 OR team = 'core'",
            None,
            SortOrder::Ascending,
        )
        .unwrap();
        assert_eq!(names(&docs), vec!["ada", "bob", "cy"]);
    }

    #[test]
    fn numbers_match_across_representations() {
        let f = people();
        let docs = run(&f.executor(), "age = 36.0", None, SortOrder::Ascending).unwrap();
        assert_eq!(names(&docs), vec!["ada", "cy"]);
    }

    #[test]
    fn typed_values_do_not_cross_match() {
        let f = people();
        assert!(run(&f.executor(), "age = '36'", None, SortOrder::Ascending)
            .unwrap()
            .is_empty());
        assert!(run(&f.executor(), "active = 'true'", None, SortOrder::Ascending)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn wildcard_matches_presence() {
        let f = people();
        let docs = run(&f.executor(), "age = *", None, SortOrder::Descending).unwrap();
        assert_eq!(names(&docs), vec!["cy", "bob", "ada"]);
    }

    #[test]
    fn injected_fields_are_queryable() {
        let f = people();
        let docs = run(&f.executor(), "_id = 1", None, SortOrder::Ascending).unwrap();
        assert_eq!(names(&docs), vec!["bob"]);
        let docs = run(
            &f.executor(),
            "_dataStream = 'people' AND name = 'di'",
            None,
            SortOrder::Ascending,
        )
        .unwrap();
        assert_eq!(names(&docs), vec!["di"]);
    }

    #[test]
    fn unknown_field_matches_nothing() {
        let f = people();
        assert!(run(&f.executor(), "missing = 1", None, SortOrder::Ascending)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn nested_fields_are_not_indexed() {
        let f = Fixture::new();
        f.append(vec![json!({"name": "x", "address": {"city": "oslo"}})]);
        assert!(run(&f.executor(), "address.city = 'oslo'", None, SortOrder::Ascending)
            .unwrap()
            .is_empty());
    }

    // -----------------------------------------------------------------------
    // Ordering and limits
    // -----------------------------------------------------------------------

    #[test]
    fn equal_timestamps_break_ties_by_ascending_id() {
        let f = Fixture::with_clock(ManualClock::new(5_000));
        f.append(vec![
            json!({"name": "a", "k": 1}),
            json!({"name": "b", "k": 1}),
            json!({"name": "c", "k": 1}),
        ]);
        for order in [SortOrder::Ascending, SortOrder::Descending] {
            let docs = run(&f.executor(), "k = 1", None, order).unwrap();
            assert_eq!(names(&docs), vec!["a", "b", "c"], "order {order}");
        }
    }

    #[test]
    fn max_results_truncates_after_sorting() {
        let f = people();
        let docs = run(&f.executor(), "age = 36 OR age = 40", Some(2), SortOrder::Descending)
            .unwrap();
        assert_eq!(names(&docs), vec!["cy", "bob"]);
    }

    #[test]
    fn zero_max_results_is_invalid() {
        let f = people();
        assert!(matches!(
            run(&f.executor(), "age = 36", Some(0), SortOrder::Ascending),
            Err(QueryError::InvalidRequest(_))
        ));
    }

    #[test]
    fn max_results_is_clamped_to_cap() {
        let f = people();
        let executor = f.executor_with(QueryLimits {
            max_results_cap: 1,
            ..QueryLimits::default()
        });
        let docs = run(&executor, "active = true", Some(50), SortOrder::Ascending).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn default_max_results_applies() {
        let f = people();
        let executor = f.executor_with(QueryLimits {
            default_max_results: 2,
            ..QueryLimits::default()
        });
        let docs = run(&executor, "active = true", None, SortOrder::Ascending).unwrap();
        assert_eq!(names(&docs), vec!["ada", "cy"]);
    }

    #[test]
    fn scan_budget_is_enforced() {
        let f = people();
        let executor = f.executor_with(QueryLimits {
            scan_budget: 2,
            ..QueryLimits::default()
        });
        assert!(matches!(
            run(&executor, "active = true", None, SortOrder::Ascending),
            Err(QueryError::ScanBudgetExceeded { budget: 2 })
        ));
        assert_eq!(
            run(&executor, "team = 'core'", None, SortOrder::Ascending)
                .unwrap()
                .len(),
            2
        );
    }

    // -----------------------------------------------------------------------
    // Rejections
    // -----------------------------------------------------------------------

    #[test]
    fn unsupported_operators_rejected_before_scanning() {
        let f = people();
        let executor = f.executor_with(QueryLimits {
            scan_budget: 0,
            ..QueryLimits::default()
        });
        for q in ["NOT age = 36", "age > 30", "age != 36", "team = 'core' OR age <= 3"] {
            assert!(
                matches!(
                    run(&executor, q, None, SortOrder::Ascending),
                    Err(QueryError::UnsupportedOperator { .. })
                ),
                "query {q}"
            );
        }
    }

    #[test]
    fn unknown_stream_is_not_found() {
        let f = people();
        let expr = parse("a = 1").unwrap();
        let err = f
            .executor()
            .execute(&stream("nope"), &expr, None, SortOrder::Ascending)
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::Schema(SchemaError::StreamNotFound(_))
        ));
    }

    #[test]
    fn empty_stream_returns_nothing() {
        let f = people();
        let expr = parse("name = *").unwrap();
        let docs = f
            .executor()
            .execute(&stream("empty"), &expr, None, SortOrder::Ascending)
            .unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn dangling_index_entry_is_an_error() {
        let f = people();
        let token = flow_types::index_token_of(&json!("ghost")).unwrap();
        let mut batch = WriteBatch::new();
        batch.put(
            flow_keys::field_index_key(
                &stream("people"),
                "name",
                &token,
                1,
                flow_types::DocumentId::new(99),
            ),
            flow_keys::document_key(&stream("people"), flow_types::DocumentId::new(99)),
        );
        f.store.commit(batch).unwrap();
        assert!(matches!(
            run(&f.executor(), "name = 'ghost'", None, SortOrder::Ascending),
            Err(QueryError::Document(
                flow_documents::DocumentError::DanglingIndex { .. }
            ))
        ));
    }

    #[test]
    fn limits_from_toml() {
        let limits: QueryLimits = toml::from_str("scan_budget = 50").unwrap();
        assert_eq!(limits.scan_budget, 50);
        assert_eq!(limits.default_max_results, 100);
        assert_eq!(limits.max_results_cap, 10_000);
    }
}
