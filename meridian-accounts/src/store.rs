use std::collections::BTreeMap;

use crate::error::Result;

/// The versioned key-value store the account core persists into.
///
/// One manager instance uses a single fixed scope per keyspace; snapshots
/// nest, and a revert discards every write made after the token was taken.
/// Success commits implicitly; there is no commit call.
pub trait StateDb {
    fn get(&self, scope: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&mut self, scope: &str, key: &[u8], value: Vec<u8>) -> Result<()>;
    fn snapshot(&mut self) -> u64;
    fn revert_to_snapshot(&mut self, token: u64);
}

/// Read access to the store's historical snapshots, for `*_by_time` queries.
pub trait SnapshotReader {
    /// The value of `(scope, key)` in the last snapshot taken at or before
    /// `time`, if any.
    fn snapshot_msg(&self, scope: &str, key: &[u8], time: u64) -> Result<Option<Vec<u8>>>;
    /// Timestamp of the most recent snapshot, 0 if none exists.
    fn last_snapshot_time(&self) -> u64;
    /// Timestamp of the last snapshot strictly before `time`, 0 if none.
    fn prev_snapshot_time(&self, time: u64) -> u64;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct JournalEntry {
    scope: String,
    key: Vec<u8>,
    prev: Option<Vec<u8>>,
}

/// In-memory [`StateDb`] with journaled snapshots.
///
/// Every `put` records the previous value; a snapshot token is an index into
/// the journal, and a revert unwinds the journal back to it. Timed snapshots
/// for the [`SnapshotReader`] side are full copies recorded explicitly via
/// [`MemStateDb::record_snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemStateDb {
    data: BTreeMap<(String, Vec<u8>), Vec<u8>>,
    journal: Vec<JournalEntry>,
    snapshots: Vec<usize>,
    history: BTreeMap<u64, BTreeMap<(String, Vec<u8>), Vec<u8>>>,
}

impl MemStateDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current contents as the snapshot for `time`.
    pub fn record_snapshot(&mut self, time: u64) {
        self.history.insert(time, self.data.clone());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl StateDb for MemStateDb {
    fn get(&self, scope: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(&(scope.to_owned(), key.to_vec())).cloned())
    }

    fn put(&mut self, scope: &str, key: &[u8], value: Vec<u8>) -> Result<()> {
        let prev = self
            .data
            .insert((scope.to_owned(), key.to_vec()), value);
        self.journal.push(JournalEntry {
            scope: scope.to_owned(),
            key: key.to_vec(),
            prev,
        });
        Ok(())
    }

    fn snapshot(&mut self) -> u64 {
        let token = self.snapshots.len() as u64;
        self.snapshots.push(self.journal.len());
        token
    }

    fn revert_to_snapshot(&mut self, token: u64) {
        let token = token as usize;
        if token >= self.snapshots.len() {
            return;
        }
        let journal_len = self.snapshots[token];
        while self.journal.len() > journal_len {
            let entry = self.journal.pop().expect("journal length checked");
            let slot = (entry.scope, entry.key);
            match entry.prev {
                Some(prev) => {
                    self.data.insert(slot, prev);
                }
                None => {
                    self.data.remove(&slot);
                }
            }
        }
        self.snapshots.truncate(token);
    }
}

impl SnapshotReader for MemStateDb {
    fn snapshot_msg(&self, scope: &str, key: &[u8], time: u64) -> Result<Option<Vec<u8>>> {
        let slot = (scope.to_owned(), key.to_vec());
        Ok(self
            .history
            .range(..=time)
            .next_back()
            .and_then(|(_, data)| data.get(&slot).cloned()))
    }

    fn last_snapshot_time(&self) -> u64 {
        self.history.keys().next_back().copied().unwrap_or(0)
    }

    fn prev_snapshot_time(&self, time: u64) -> u64 {
        self.history
            .range(..time)
            .next_back()
            .map(|(t, _)| *t)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let mut db = MemStateDb::new();
        assert_eq!(db.get("s", b"k").unwrap(), None);
        db.put("s", b"k", vec![1, 2, 3]).unwrap();
        assert_eq!(db.get("s", b"k").unwrap(), Some(vec![1, 2, 3]));
        // Scopes are separate keyspaces.
        assert_eq!(db.get("t", b"k").unwrap(), None);
    }

    #[test]
    fn test_revert_restores_prior_values() {
        let mut db = MemStateDb::new();
        db.put("s", b"a", vec![1]).unwrap();
        let token = db.snapshot();
        db.put("s", b"a", vec![2]).unwrap();
        db.put("s", b"b", vec![3]).unwrap();
        db.revert_to_snapshot(token);
        assert_eq!(db.get("s", b"a").unwrap(), Some(vec![1]));
        assert_eq!(db.get("s", b"b").unwrap(), None);
    }

    #[test]
    fn test_nested_snapshots() {
        let mut db = MemStateDb::new();
        let outer = db.snapshot();
        db.put("s", b"a", vec![1]).unwrap();
        let inner = db.snapshot();
        db.put("s", b"a", vec![2]).unwrap();
        db.revert_to_snapshot(inner);
        assert_eq!(db.get("s", b"a").unwrap(), Some(vec![1]));
        db.revert_to_snapshot(outer);
        assert_eq!(db.get("s", b"a").unwrap(), None);
    }

    #[test]
    fn test_revert_leaves_store_identical() {
        let mut db = MemStateDb::new();
        db.put("s", b"a", vec![1]).unwrap();
        let before = db.clone();
        let token = db.snapshot();
        db.put("s", b"a", vec![9]).unwrap();
        db.put("s", b"z", vec![9]).unwrap();
        db.revert_to_snapshot(token);
        assert_eq!(db, before);
    }

    #[test]
    fn test_timed_snapshots() {
        let mut db = MemStateDb::new();
        db.put("s", b"k", vec![1]).unwrap();
        db.record_snapshot(100);
        db.put("s", b"k", vec![2]).unwrap();
        db.record_snapshot(200);

        assert_eq!(db.snapshot_msg("s", b"k", 100).unwrap(), Some(vec![1]));
        assert_eq!(db.snapshot_msg("s", b"k", 150).unwrap(), Some(vec![1]));
        assert_eq!(db.snapshot_msg("s", b"k", 250).unwrap(), Some(vec![2]));
        assert_eq!(db.snapshot_msg("s", b"k", 50).unwrap(), None);
        assert_eq!(db.last_snapshot_time(), 200);
        assert_eq!(db.prev_snapshot_time(200), 100);
        assert_eq!(db.prev_snapshot_time(100), 0);
    }
}
