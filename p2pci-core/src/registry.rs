//! Registry: the directory's peer set and document index behind one lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::identity::{DocumentRecord, PeerIdentity};

#[derive(Default)]
struct Inner {
    /// Newest first.
    peers: Vec<PeerIdentity>,
    /// Newest first; at most one copy of each exact record.
    records: Vec<DocumentRecord>,
}

/// Thread-safe home for the peer set and document index.
///
/// Every operation takes the single lock for its whole duration, so an
/// add/remove pair is never partially visible to a concurrent lookup. The
/// lock is never held across I/O; callers get owned snapshots back.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Poisoned state is still consistent: each mutation is a single Vec operation.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert the peer if absent. Returns true if it was new.
    pub fn register_peer(&self, peer: &PeerIdentity) -> bool {
        let mut inner = self.lock();
        insert_peer(&mut inner, peer)
    }

    /// Insert the record if the exact tuple is absent, registering its owner too.
    /// Returns the stored record.
    pub fn add_document(&self, number: u32, title: &str, owner: &PeerIdentity) -> DocumentRecord {
        let record = DocumentRecord::new(number, title, owner.clone());
        let added = {
            let mut inner = self.lock();
            insert_peer(&mut inner, owner);
            let added = !inner.records.contains(&record);
            if added {
                inner.records.insert(0, record.clone());
            }
            added
        };
        if added {
            tracing::debug!(number, owner = %owner, "document added");
        }
        record
    }

    /// Records for `number`, most recently added first.
    pub fn lookup(&self, number: u32) -> Vec<DocumentRecord> {
        self.lock()
            .records
            .iter()
            .filter(|r| r.number == number)
            .cloned()
            .collect()
    }

    /// All records, most recently added first.
    pub fn list_all(&self) -> Vec<DocumentRecord> {
        self.lock().records.clone()
    }

    /// Drop the peer and every record it owns. Returns the number of records removed.
    pub fn remove_peer(&self, peer: &PeerIdentity) -> usize {
        let mut inner = self.lock();
        inner.peers.retain(|p| p != peer);
        let before = inner.records.len();
        inner.records.retain(|r| r.owner != *peer);
        before - inner.records.len()
    }

    /// Known peers, newest first.
    pub fn peers(&self) -> Vec<PeerIdentity> {
        self.lock().peers.clone()
    }

    pub fn contains_peer(&self, peer: &PeerIdentity) -> bool {
        self.lock().peers.contains(peer)
    }
}

fn insert_peer(inner: &mut Inner, peer: &PeerIdentity) -> bool {
    if inner.peers.contains(peer) {
        return false;
    }
    inner.peers.insert(0, peer.clone());
    true
}
