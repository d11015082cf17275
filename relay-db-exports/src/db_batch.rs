use std::collections::BTreeMap;

/// Store key
pub type Key = Vec<u8>;
/// Store value
pub type Value = Vec<u8>;

/// Ordered set of changes: `Some(value)` writes the key, `None` deletes it
pub type DBBatch = BTreeMap<Key, Option<Value>>;
