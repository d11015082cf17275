// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::{
    DBBatch, Key, RelayDirection, RelayIteratorMode, ShareableRelayDBController, Value,
    BRANCH_ERROR, CRUD_ERROR, STATE_CF,
};
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};

/// Layered write overlay above the committed store.
///
/// The bottom layer holds the writes of the current block. `branch` pushes a
/// transaction layer on top, `commit_branch` merges the top layer into the
/// one below and `discard_branch` drops it. Reads and iterators always see
/// the merged view: top layer first, then lower layers, then the store.
#[derive(Debug)]
pub struct StateStore {
    db: ShareableRelayDBController,
    layers: Vec<DBBatch>,
}

impl StateStore {
    /// Opens an empty overlay above `db`
    pub fn new(db: ShareableRelayDBController) -> Self {
        StateStore {
            db,
            layers: vec![DBBatch::new()],
        }
    }

    /// Committed store below the overlay
    pub fn db(&self) -> &ShareableRelayDBController {
        &self.db
    }

    /// Number of open branches
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    /// Reads a key
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        for layer in self.layers.iter().rev() {
            if let Some(change) = layer.get(key) {
                return change.clone();
            }
        }
        self.db
            .read()
            .get_cf(STATE_CF, key.to_vec())
            .expect(CRUD_ERROR)
    }

    /// True if the key is set
    pub fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Writes a key in the top layer
    pub fn put(&mut self, key: Key, value: Value) {
        self.top_layer().insert(key, Some(value));
    }

    /// Deletes a key in the top layer
    pub fn delete(&mut self, key: Key) {
        self.top_layer().insert(key, None);
    }

    fn top_layer(&mut self) -> &mut DBBatch {
        self.layers
            .last_mut()
            .expect("critical: state store without base layer")
    }

    /// All entries whose key starts with `prefix`, in ascending key order
    pub fn prefix_iter(&self, prefix: &[u8]) -> Vec<(Key, Value)> {
        let mut merged: BTreeMap<Key, Value> = self
            .db
            .read()
            .iterator_cf(
                STATE_CF,
                RelayIteratorMode::From(prefix, RelayDirection::Forward),
            )
            .take_while(|(key, _)| key.starts_with(prefix))
            .collect();
        for layer in &self.layers {
            for (key, change) in layer
                .range::<[u8], _>((Included(prefix), Unbounded))
                .take_while(|(key, _)| key.starts_with(prefix))
            {
                apply_change(&mut merged, key, change);
            }
        }
        merged.into_iter().collect()
    }

    /// All entries whose key starts with `prefix`, in descending key order
    pub fn reverse_prefix_iter(&self, prefix: &[u8]) -> Vec<(Key, Value)> {
        let mut entries = self.prefix_iter(prefix);
        entries.reverse();
        entries
    }

    /// All entries with `start <= key < end`, in ascending key order
    pub fn range_iter(&self, start: &[u8], end: &[u8]) -> Vec<(Key, Value)> {
        if start >= end {
            return Vec::new();
        }
        let mut merged: BTreeMap<Key, Value> = self
            .db
            .read()
            .iterator_cf(
                STATE_CF,
                RelayIteratorMode::From(start, RelayDirection::Forward),
            )
            .take_while(|(key, _)| key.as_slice() < end)
            .collect();
        for layer in &self.layers {
            for (key, change) in layer.range::<[u8], _>((Included(start), Excluded(end))) {
                apply_change(&mut merged, key, change);
            }
        }
        merged.into_iter().collect()
    }

    /// Opens a transaction layer
    pub fn branch(&mut self) {
        self.layers.push(DBBatch::new());
    }

    /// Merges the top transaction layer into the layer below
    pub fn commit_branch(&mut self) {
        if self.layers.len() < 2 {
            panic!("{}", BRANCH_ERROR);
        }
        let top = self.layers.pop().expect(BRANCH_ERROR);
        self.top_layer().extend(top);
    }

    /// Drops the top transaction layer and all its writes
    pub fn discard_branch(&mut self) {
        if self.layers.len() < 2 {
            panic!("{}", BRANCH_ERROR);
        }
        self.layers.pop();
    }

    /// Collapses every layer into a single batch, ready to be written to the store
    pub fn into_batch(self) -> DBBatch {
        let mut batch = DBBatch::new();
        for layer in self.layers {
            batch.extend(layer);
        }
        batch
    }

    /// Writes the whole overlay to the committed store, attached to `change_id`
    pub fn commit(self, change_id: u64) {
        let db = self.db.clone();
        let batch = self.into_batch();
        db.write().write_batch(batch, Some(change_id));
    }
}

fn apply_change(merged: &mut BTreeMap<Key, Value>, key: &Key, change: &Option<Value>) {
    match change {
        Some(value) => {
            merged.insert(key.clone(), value.clone());
        }
        None => {
            merged.remove(key);
        }
    }
}
