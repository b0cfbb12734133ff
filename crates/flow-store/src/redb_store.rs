use std::collections::VecDeque;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{AccessGuard, Database, ReadOnlyTable, ReadTransaction, ReadableTable, TableDefinition};
use tracing::debug;

use crate::batch::{BatchOp, WriteBatch};
use crate::error::{StoreError, StoreResult};
use crate::traits::{prefix_successor, Direction, KvIter, KvPair, KvSnapshot, KvStore};

const DATA_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("flowdb");

/// Rows fetched per range call while a scan is being pulled.
const SCAN_PAGE: usize = 256;

type DataTable = ReadOnlyTable<&'static [u8], &'static [u8]>;

/// Disk-backed ordered store on a single redb file.
///
/// redb provides serializable write transactions and MVCC read
/// transactions, which map directly onto [`KvStore::commit`] and
/// [`KvStore::snapshot`].
#[derive(Clone)]
pub struct RedbKvStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbKvStore {
    /// Open the database file at `path`, creating it and its parent
    /// directories if needed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(&path).map_err(StoreError::backend)?;

        // Create the table up front so read transactions can always open it.
        let tx = db.begin_write().map_err(StoreError::backend)?;
        {
            tx.open_table(DATA_TABLE).map_err(StoreError::backend)?;
        }
        tx.commit().map_err(StoreError::backend)?;

        debug!(path = %path.display(), "opened redb store");
        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for RedbKvStore {
    fn snapshot(&self) -> StoreResult<Box<dyn KvSnapshot>> {
        let tx = self.db.begin_read().map_err(StoreError::backend)?;
        let table = tx.open_table(DATA_TABLE).map_err(StoreError::backend)?;
        Ok(Box::new(RedbSnapshot { table, _tx: tx }))
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let ops = batch.len();
        let tx = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = tx.open_table(DATA_TABLE).map_err(StoreError::backend)?;
            for op in batch.ops() {
                match op {
                    BatchOp::Put { key, value } => {
                        table
                            .insert(key.as_slice(), value.as_slice())
                            .map_err(StoreError::backend)?;
                    }
                    BatchOp::Delete { key } => {
                        table.remove(key.as_slice()).map_err(StoreError::backend)?;
                    }
                }
            }
        }
        tx.commit().map_err(StoreError::backend)?;
        debug!(ops, "committed batch");
        Ok(())
    }

    fn fetch_update(
        &self,
        key: &[u8],
        f: &mut dyn FnMut(Option<&[u8]>) -> StoreResult<Vec<u8>>,
    ) -> StoreResult<Vec<u8>> {
        let tx = self.db.begin_write().map_err(StoreError::backend)?;
        let next = {
            let mut table = tx.open_table(DATA_TABLE).map_err(StoreError::backend)?;
            let current = table
                .get(key)
                .map_err(StoreError::backend)?
                .map(|guard| guard.value().to_vec());
            let next = f(current.as_deref())?;
            table
                .insert(key, next.as_slice())
                .map_err(StoreError::backend)?;
            next
        };
        tx.commit().map_err(StoreError::backend)?;
        Ok(next)
    }
}

impl std::fmt::Debug for RedbKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbKvStore")
            .field("path", &self.path)
            .finish()
    }
}

struct RedbSnapshot {
    table: DataTable,
    _tx: ReadTransaction,
}

impl KvSnapshot for RedbSnapshot {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .table
            .get(key)
            .map_err(StoreError::backend)?
            .map(|guard| guard.value().to_vec()))
    }

    fn scan(&self, prefix: &[u8], direction: Direction) -> StoreResult<KvIter<'_>> {
        Ok(Box::new(RedbScan {
            table: &self.table,
            start: prefix.to_vec(),
            end: prefix_successor(prefix),
            cursor: None,
            direction,
            buffer: VecDeque::new(),
            exhausted: false,
        }))
    }
}

/// Lazy prefix scan that pulls rows from redb one page at a time.
///
/// Each page is an independent range call on the snapshot's table, resumed
/// just past the last key returned.
struct RedbScan<'a> {
    table: &'a DataTable,
    start: Vec<u8>,
    end: Option<Vec<u8>>,
    cursor: Option<Vec<u8>>,
    direction: Direction,
    buffer: VecDeque<KvPair>,
    exhausted: bool,
}

impl RedbScan<'_> {
    fn fill(&mut self) -> StoreResult<()> {
        let end = match &self.end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        let (lower, upper) = match (self.direction, &self.cursor) {
            (Direction::Forward, Some(cursor)) => (Bound::Excluded(cursor.as_slice()), end),
            (Direction::Forward, None) => (Bound::Included(self.start.as_slice()), end),
            (Direction::Reverse, Some(cursor)) => (
                Bound::Included(self.start.as_slice()),
                Bound::Excluded(cursor.as_slice()),
            ),
            (Direction::Reverse, None) => (Bound::Included(self.start.as_slice()), end),
        };

        let range = self
            .table
            .range::<&[u8]>((lower, upper))
            .map_err(StoreError::backend)?;
        let mut page = Vec::with_capacity(SCAN_PAGE);
        match self.direction {
            Direction::Forward => read_page(range, &mut page)?,
            Direction::Reverse => read_page(range.rev(), &mut page)?,
        }

        if page.len() < SCAN_PAGE {
            self.exhausted = true;
        }
        if let Some((last, _)) = page.last() {
            self.cursor = Some(last.clone());
        }
        self.buffer.extend(page);
        Ok(())
    }
}

type Row<'a> = Result<
    (
        AccessGuard<'a, &'static [u8]>,
        AccessGuard<'a, &'static [u8]>,
    ),
    redb::StorageError,
>;

fn read_page<'a>(rows: impl Iterator<Item = Row<'a>>, page: &mut Vec<KvPair>) -> StoreResult<()> {
    for row in rows.take(SCAN_PAGE) {
        let (k, v) = row.map_err(StoreError::backend)?;
        page.push((k.value().to_vec(), v.value().to_vec()));
    }
    Ok(())
}

impl Iterator for RedbScan<'_> {
    type Item = StoreResult<KvPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
