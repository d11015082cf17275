use std::path::PathBuf;

/// Config structure for a `RelayDB`
#[derive(Debug, Clone)]
pub struct RelayDBConfig {
    /// The path to the database, used in the wrapped RocksDB instance
    pub path: PathBuf,
    /// Maximum number of files kept open by RocksDB, `None` for no limit
    pub max_open_files: Option<i32>,
}
