// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::{ShareableRelayDBController, StateStore};
use relay_models::{Address, BlockHeader, Event};
use relay_time::RelayTime;
use tracing::debug;

/// Execution context of one block.
///
/// Holds the header given by consensus, the state overlay and the ordered
/// event log. Branches open a transaction layer on both the store and the
/// event log: discarding a branch drops its writes and its events.
#[derive(Debug)]
pub struct BlockContext {
    header: BlockHeader,
    store: StateStore,
    events: Vec<Event>,
    event_marks: Vec<usize>,
}

impl BlockContext {
    /// Opens the context of the block `header` above the committed store `db`
    pub fn new(header: BlockHeader, db: ShareableRelayDBController) -> Self {
        BlockContext {
            header,
            store: StateStore::new(db),
            events: Vec::new(),
            event_marks: Vec::new(),
        }
    }

    /// Header of the block
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Height of the block
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Time of the block
    pub fn block_time(&self) -> RelayTime {
        self.header.time
    }

    /// Proposer of the block
    pub fn proposer(&self) -> Address {
        self.header.proposer
    }

    /// Read access to the state
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Write access to the state
    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    /// Appends an event to the block log
    pub fn emit_event(&mut self, event: Event) {
        debug!("event emitted at height {}: {}", self.header.height, event);
        self.events.push(event);
    }

    /// Events emitted so far
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Opens a transaction layer
    pub fn branch(&mut self) {
        self.store.branch();
        self.event_marks.push(self.events.len());
    }

    /// Keeps the writes and events of the top transaction layer
    pub fn commit_branch(&mut self) {
        self.store.commit_branch();
        self.event_marks.pop();
    }

    /// Drops the writes and events of the top transaction layer
    pub fn discard_branch(&mut self) {
        self.store.discard_branch();
        if let Some(mark) = self.event_marks.pop() {
            self.events.truncate(mark);
        }
    }

    /// Writes the block to the committed store, with the height as change id, and returns its events
    pub fn commit(self) -> Vec<Event> {
        self.store.commit(self.header.height);
        self.events
    }

    /// Drops every write of the block and returns its events
    pub fn abort(self) -> Vec<Event> {
        self.events
    }
}
