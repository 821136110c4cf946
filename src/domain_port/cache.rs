use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("entry not found")]
    NotFound,
    #[error("entry of {size} bytes does not fit a cache of {capacity} bytes")]
    EntryTooLarge { size: usize, capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub used_bytes: u64,
    pub capacity_bytes: u64,
}

/// Iterator over a snapshot of live entries.
///
/// Cloning yields an independent cursor over the same snapshot, and
/// [`CacheIter::rewind`] restarts from the first entry.
#[derive(Debug, Clone)]
pub struct CacheIter {
    entries: Arc<[CacheEntry]>,
    pos: usize,
}

impl CacheIter {
    pub fn new(entries: Vec<CacheEntry>) -> Self {
        CacheIter {
            entries: entries.into(),
            pos: 0,
        }
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl Iterator for CacheIter {
    type Item = CacheEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.pos)?.clone();
        self.pos += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CacheIter {}

/// Byte-oriented key/value store backing refresh tokens.
///
/// A `ttl` of `None` or zero keeps the entry until it is deleted or evicted.
pub trait Cache: Send + Sync {
    /// Returns the value, or [`CacheError::NotFound`] for absent and expired keys.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, CacheError>;

    fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    fn del(&self, key: &[u8]) -> bool;

    /// Removes and returns the value. Of any number of concurrent callers
    /// presenting the same key, at most one receives it.
    fn take(&self, key: &[u8]) -> Result<Vec<u8>, CacheError> {
        let value = self.get(key)?;
        if self.del(key) {
            Ok(value)
        } else {
            Err(CacheError::NotFound)
        }
    }

    fn iter(&self) -> CacheIter;

    fn stats(&self) -> CacheStats;

    fn entry_count(&self) -> u64 {
        self.stats().entries
    }

    fn hit_count(&self) -> u64 {
        self.stats().hits
    }

    fn miss_count(&self) -> u64 {
        self.stats().misses
    }
}
