use crate::{DBBatch, Key, RelayDBError, Value};
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;

/// Committed key-value store shared by the state machine components
pub type ShareableRelayDBController = Arc<RwLock<Box<dyn RelayDBController>>>;

/// Committed key-value store.
///
/// Writes are only done through `write_batch`, so a block is always
/// persisted atomically.
pub trait RelayDBController: Send + Sync + Debug {
    /// Writes the batch atomically, attaching it to `change_id` (the block height) if given
    fn write_batch(&mut self, batch: DBBatch, change_id: Option<u64>);

    /// Exposes RocksDB's "get_cf" function
    fn get_cf(&self, handle_cf: &str, key: Key) -> Result<Option<Value>, RelayDBError>;

    /// Exposes RocksDB's "iterator_cf" function
    fn iterator_cf(
        &self,
        handle_cf: &str,
        mode: RelayIteratorMode,
    ) -> Box<dyn Iterator<Item = (Key, Value)> + '_>;

    /// Exposes RocksDB's "prefix_iterator_cf" function
    ///
    /// The iterator may go past the prefix: callers stop at the first key that does not start with it.
    fn prefix_iterator_cf(
        &self,
        handle_cf: &str,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = (Key, Value)> + '_>;

    /// Get the change id of the last written batch
    fn get_change_id(&self) -> Result<u64, RelayDBError>;

    /// Flushes the underlying db
    fn flush(&self) -> Result<(), RelayDBError>;
}

/// Start position of an iterator
pub enum RelayIteratorMode<'a> {
    /// first key
    Start,
    /// last key, iterating backwards
    End,
    /// given key, in the given direction
    From(&'a [u8], RelayDirection),
}

/// Iteration direction
pub enum RelayDirection {
    /// ascending keys
    Forward,
    /// descending keys
    Reverse,
}
