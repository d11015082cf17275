use relay_db_exports::{
    DBBatch, Key, RelayDBConfig, RelayDBController, RelayDBError, RelayDirection,
    RelayIteratorMode, Value, CF_ERROR, CHANGE_ID_DESER_ERROR, CHANGE_ID_KEY, CHANGE_ID_SER_ERROR,
    CRUD_ERROR, METADATA_CF, OPEN_ERROR, STATE_CF,
};
use relay_serialization::{
    DeserializeError, Deserializer, Serializer, U64VarIntDeserializer, U64VarIntSerializer,
};
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::ops::Bound::Included;
use tracing::debug;

/// Wrapped RocksDB database
pub struct RelayDB {
    /// The rocksdb instance
    pub db: DB,
    /// configuration for the `RelayDB`
    pub config: RelayDBConfig,
    change_id_serializer: U64VarIntSerializer,
    change_id_deserializer: U64VarIntDeserializer,
}

impl std::fmt::Debug for RelayDB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayDB")
            .field("db", &self.db)
            .field("config", &self.config)
            .finish()
    }
}

impl RelayDB {
    /// Returns a new `RelayDB` instance
    pub fn new(config: RelayDBConfig) -> Self {
        let db_opts = Self::default_db_opts(&config);
        Self::new_with_options(config, db_opts).expect(OPEN_ERROR)
    }

    /// Default RocksDB options: missing database and columns are created
    pub fn default_db_opts(config: &RelayDBConfig) -> Options {
        let mut db_opts = Options::default();
        if let Some(max_open_files) = config.max_open_files {
            db_opts.set_max_open_files(max_open_files);
        }
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts
    }

    /// Returns a new `RelayDB` instance given a config and RocksDB options
    pub fn new_with_options(
        config: RelayDBConfig,
        db_opts: Options,
    ) -> Result<Self, rocksdb::Error> {
        let db = DB::open_cf_descriptors(
            &db_opts,
            &config.path,
            vec![
                ColumnFamilyDescriptor::new(STATE_CF, Options::default()),
                ColumnFamilyDescriptor::new(METADATA_CF, Options::default()),
            ],
        )?;

        let relay_db = Self {
            db,
            config,
            change_id_serializer: U64VarIntSerializer::new(),
            change_id_deserializer: U64VarIntDeserializer::new(Included(0), Included(u64::MAX)),
        };

        if relay_db.get_change_id().is_err() {
            relay_db.set_initial_change_id(0);
        }

        Ok(relay_db)
    }

    /// Writes the changes in a single RocksDB batch.
    ///
    /// The change id must never decrease.
    pub fn write_changes(
        &mut self,
        changes: DBBatch,
        change_id: Option<u64>,
    ) -> Result<(), RelayDBError> {
        if let Some(change_id) = change_id {
            if change_id < self.get_change_id().expect(CHANGE_ID_DESER_ERROR) {
                return Err(RelayDBError::InvalidChangeID(String::from(
                    "change_id should monotonically increase after every write",
                )));
            }
        }

        let handle_state = self.db.cf_handle(STATE_CF).expect(CF_ERROR);
        let mut batch = WriteBatch::default();
        for (key, value) in changes.iter() {
            match value {
                Some(value) => batch.put_cf(handle_state, key, value),
                None => batch.delete_cf(handle_state, key),
            }
        }
        if let Some(change_id) = change_id {
            self.set_change_id_to_batch(&mut batch, change_id);
        }

        self.db
            .write(batch)
            .map_err(|e| RelayDBError::RocksDBError(format!("Can't write batch to disk: {}", e)))?;
        debug!(
            "wrote {} changes to the state, change_id {:?}",
            changes.len(),
            change_id
        );
        Ok(())
    }

    /// Get the current change_id attached to the database.
    pub fn get_change_id(&self) -> Result<u64, RelayDBError> {
        let handle = self.db.cf_handle(METADATA_CF).expect(CF_ERROR);

        let Ok(Some(change_id_bytes)) = self.db.get_pinned_cf(handle, CHANGE_ID_KEY) else {
            return Err(RelayDBError::DeserializeError(String::from(
                "Could not recover change_id in database",
            )));
        };

        let (_rest, change_id) = self
            .change_id_deserializer
            .deserialize::<DeserializeError>(&change_id_bytes)
            .expect(CHANGE_ID_DESER_ERROR);

        Ok(change_id)
    }

    /// Set the initial change_id. Only called when opening an empty database.
    fn set_initial_change_id(&self, change_id: u64) {
        let mut batch = WriteBatch::default();
        self.set_change_id_to_batch(&mut batch, change_id);
        self.db.write(batch).expect(CRUD_ERROR);
    }

    fn set_change_id_to_batch(&self, batch: &mut WriteBatch, change_id: u64) {
        let handle_metadata = self.db.cf_handle(METADATA_CF).expect(CF_ERROR);

        let mut change_id_bytes = Vec::new();
        self.change_id_serializer
            .serialize(&change_id, &mut change_id_bytes)
            .expect(CHANGE_ID_SER_ERROR);

        batch.put_cf(handle_metadata, CHANGE_ID_KEY, &change_id_bytes);
    }
}

impl RelayDBController for RelayDB {
    fn write_batch(&mut self, batch: DBBatch, change_id: Option<u64>) {
        self.write_changes(batch, change_id).expect(CRUD_ERROR);
    }

    fn get_cf(&self, handle_cf: &str, key: Key) -> Result<Option<Value>, RelayDBError> {
        let handle = self.db.cf_handle(handle_cf).expect(CF_ERROR);

        self.db
            .get_cf(handle, key)
            .map_err(|e| RelayDBError::RocksDBError(format!("{:?}", e)))
    }

    fn iterator_cf(
        &self,
        handle_cf: &str,
        mode: RelayIteratorMode,
    ) -> Box<dyn Iterator<Item = (Key, Value)> + '_> {
        let handle = self.db.cf_handle(handle_cf).expect(CF_ERROR);

        let rocksdb_mode = match mode {
            RelayIteratorMode::Start => IteratorMode::Start,
            RelayIteratorMode::End => IteratorMode::End,
            RelayIteratorMode::From(key, RelayDirection::Forward) => {
                IteratorMode::From(key, Direction::Forward)
            }
            RelayIteratorMode::From(key, RelayDirection::Reverse) => {
                IteratorMode::From(key, Direction::Reverse)
            }
        };

        Box::new(
            self.db
                .iterator_cf(handle, rocksdb_mode)
                .flatten()
                .map(|(k, v)| (k.to_vec(), v.to_vec())),
        )
    }

    fn prefix_iterator_cf(
        &self,
        handle_cf: &str,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = (Key, Value)> + '_> {
        let handle = self.db.cf_handle(handle_cf).expect(CF_ERROR);

        Box::new(
            self.db
                .prefix_iterator_cf(handle, prefix)
                .flatten()
                .map(|(k, v)| (k.to_vec(), v.to_vec())),
        )
    }

    fn get_change_id(&self) -> Result<u64, RelayDBError> {
        self.get_change_id()
    }

    fn flush(&self) -> Result<(), RelayDBError> {
        self.db
            .flush()
            .map_err(|e| RelayDBError::RocksDBError(format!("{:?}", e)))
    }
}
