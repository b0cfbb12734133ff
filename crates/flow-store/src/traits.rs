use flow_types::SortOrder;

use crate::batch::WriteBatch;
use crate::error::StoreResult;

/// A key-value pair read from the store.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Lazy, ordered sequence of pairs produced by a prefix scan.
pub type KvIter<'a> = Box<dyn Iterator<Item = StoreResult<KvPair>> + 'a>;

/// Direction of a prefix scan in byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl From<SortOrder> for Direction {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Ascending => Self::Forward,
            SortOrder::Descending => Self::Reverse,
        }
    }
}

/// Consistent, read-only view of the store.
///
/// Every read through one snapshot observes the same committed state: a
/// batch committed after the snapshot was taken is invisible to it, and a
/// batch committed before is fully visible.
pub trait KvSnapshot {
    /// Read a single key. Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Iterate all keys starting with `prefix`, in byte order or its reverse.
    ///
    /// The iterator is lazy; callers bound their work by how far they pull.
    fn scan(&self, prefix: &[u8], direction: Direction) -> StoreResult<KvIter<'_>>;
}

/// Ordered, transactional key-value store.
///
/// All implementations must satisfy these invariants:
/// - A [`WriteBatch`] is applied atomically: all of it or none of it.
/// - Snapshots are isolated from concurrent commits.
/// - [`fetch_update`](Self::fetch_update) is a single read-modify-write
///   transaction on one key.
/// - All backend errors are propagated, never silently ignored.
pub trait KvStore: Send + Sync {
    /// Open a consistent read view.
    fn snapshot(&self) -> StoreResult<Box<dyn KvSnapshot>>;

    /// Apply every operation of `batch` atomically.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Atomically replace the value of `key` with `f(current)` and return
    /// the value written. If `f` fails, nothing is written.
    fn fetch_update(
        &self,
        key: &[u8],
        f: &mut dyn FnMut(Option<&[u8]>) -> StoreResult<Vec<u8>>,
    ) -> StoreResult<Vec<u8>>;

    /// Read a single key from a fresh snapshot.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.snapshot()?.get(key)
    }
}

/// Smallest byte string greater than every string starting with `prefix`,
/// or `None` when no such bound exists (empty or all-`0xFF` prefix).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
