use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use flow_store::{KvStore, StoreError, StoreResult};

use crate::error::{SequenceError, SequenceResult};
use crate::scope::{IdScope, SequenceScope};

/// Allocator settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Ids reserved per persisted counter update.
    pub lease_size: u64,
    /// Which sequence documents draw from.
    pub scope: IdScope,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            lease_size: 1000,
            scope: IdScope::PerStream,
        }
    }
}

/// In-memory cursor over one leased block `[next, bound)`.
#[derive(Debug, Default)]
struct Lease {
    next: u64,
    bound: u64,
}

/// Monotonic, crash-safe id generator.
///
/// Each scope persists a high-water mark `h`. Leasing moves it to
/// `h + lease_size` in one store transaction and then serves `[h, h +
/// lease_size)` from memory. A crash loses at most the unserved part of
/// the current lease; ids are never handed out twice.
///
/// # Locking
///
/// - An outer mutex maps scopes to their lease and is held only for the
///   lookup.
/// - Each scope's lease has its own mutex, so scopes never wait on each
///   other while a lease is being refilled.
pub struct SequenceAllocator {
    store: Arc<dyn KvStore>,
    lease_size: u64,
    leases: Mutex<HashMap<SequenceScope, Arc<Mutex<Lease>>>>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn KvStore>, config: &SequenceConfig) -> SequenceResult<Self> {
        if config.lease_size == 0 {
            return Err(SequenceError::InvalidLeaseSize);
        }
        Ok(Self {
            store,
            lease_size: config.lease_size,
            leases: Mutex::new(HashMap::new()),
        })
    }

    pub fn lease_size(&self) -> u64 {
        self.lease_size
    }

    /// Return a fresh id for `scope`.
    pub fn next(&self, scope: &SequenceScope) -> SequenceResult<u64> {
        let lease = self.lease_for(scope);
        let mut lease = lease.lock();
        if lease.next == lease.bound {
            let (start, bound) = self.refill(scope)?;
            lease.next = start;
            lease.bound = bound;
        }
        let id = lease.next;
        lease.next += 1;
        Ok(id)
    }

    /// Hand unused ids of every lease back to the store.
    ///
    /// The persisted mark is lowered to the lease cursor only when it still
    /// equals the lease bound, i.e. nothing else leased from this scope in
    /// the meantime. After a release, a restarted process continues the
    /// sequence without a gap.
    pub fn release(&self) -> SequenceResult<()> {
        let leases: Vec<_> = self
            .leases
            .lock()
            .iter()
            .map(|(scope, lease)| (scope.clone(), Arc::clone(lease)))
            .collect();

        for (scope, lease) in leases {
            let mut lease = lease.lock();
            if lease.next == lease.bound {
                continue;
            }
            let (cursor, bound) = (lease.next, lease.bound);
            self.store.fetch_update(&scope.key(), &mut |current| {
                let persisted = decode_mark(&scope, current)?;
                let mark = if persisted == bound { cursor } else { persisted };
                Ok(mark.to_be_bytes().to_vec())
            })?;
            lease.bound = cursor;
            debug!(%scope, returned = bound - cursor, "released id lease");
        }
        Ok(())
    }

    fn lease_for(&self, scope: &SequenceScope) -> Arc<Mutex<Lease>> {
        let mut leases = self.leases.lock();
        Arc::clone(leases.entry(scope.clone()).or_default())
    }

    fn refill(&self, scope: &SequenceScope) -> SequenceResult<(u64, u64)> {
        let lease_size = self.lease_size;
        let mut exhausted = false;
        let written = self.store.fetch_update(&scope.key(), &mut |current| {
            let mark = decode_mark(scope, current)?;
            match mark.checked_add(lease_size) {
                Some(next) => Ok(next.to_be_bytes().to_vec()),
                None => {
                    exhausted = true;
                    Err(StoreError::Backend(format!("sequence {scope} exhausted")))
                }
            }
        });
        let written = match written {
            Err(_) if exhausted => return Err(SequenceError::Exhausted(scope.clone())),
            other => other?,
        };
        let bound = decode_mark(scope, Some(&written))?;
        let start = bound - lease_size;
        debug!(%scope, start, bound, "leased id block");
        Ok((start, bound))
    }
}

fn decode_mark(scope: &SequenceScope, raw: Option<&[u8]>) -> StoreResult<u64> {
    match raw {
        None => Ok(0),
        Some(bytes) => bytes
            .try_into()
            .map(u64::from_be_bytes)
            .map_err(|_| StoreError::corrupt(&scope.key(), "sequence mark is not 8 bytes")),
    }
}

impl std::fmt::Debug for SequenceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceAllocator")
            .field("lease_size", &self.lease_size)
            .field("scopes", &self.leases.lock().len())
            .finish()
    }
}
