use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::batch::{BatchOp, WriteBatch};
use crate::error::StoreResult;
use crate::traits::{prefix_successor, Direction, KvIter, KvSnapshot, KvStore};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory, `BTreeMap`-based ordered store.
///
/// Intended for tests and embedding. Snapshots share the map through an
/// `Arc`; a commit that races an open snapshot copies the map before
/// mutating it, so snapshots never observe later writes.
pub struct InMemoryKvStore {
    map: RwLock<Arc<Map>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(Arc::new(BTreeMap::new())),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// All keys in byte order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.map.read().keys().cloned().collect()
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for InMemoryKvStore {
    fn snapshot(&self) -> StoreResult<Box<dyn KvSnapshot>> {
        let map = Arc::clone(&self.map.read());
        Ok(Box::new(MemorySnapshot { map }))
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut guard = self.map.write();
        let map = Arc::make_mut(&mut guard);
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn fetch_update(
        &self,
        key: &[u8],
        f: &mut dyn FnMut(Option<&[u8]>) -> StoreResult<Vec<u8>>,
    ) -> StoreResult<Vec<u8>> {
        let mut guard = self.map.write();
        let next = f(guard.get(key).map(Vec::as_slice))?;
        Arc::make_mut(&mut guard).insert(key.to_vec(), next.clone());
        Ok(next)
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &self.len())
            .finish()
    }
}

struct MemorySnapshot {
    map: Arc<Map>,
}

impl KvSnapshot for MemorySnapshot {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn scan(&self, prefix: &[u8], direction: Direction) -> StoreResult<KvIter<'_>> {
        let end = prefix_successor(prefix);
        let upper = match &end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        let range = self
            .map
            .range::<[u8], _>((Bound::Included(prefix), upper))
            .map(|(k, v)| Ok((k.clone(), v.clone())));
        Ok(match direction {
            Direction::Forward => Box::new(range),
            Direction::Reverse => Box::new(range.rev()),
        })
    }
}
