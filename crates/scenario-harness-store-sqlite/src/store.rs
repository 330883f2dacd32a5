// crates/scenario-harness-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Baseline Store
// Description: Durable BaselineStore backed by SQLite WAL.
// Purpose: Persist baseline snapshots with deterministic serialization.
// Dependencies: scenario-harness-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`BaselineStore`] using `SQLite`. Each
//! scenario owns exactly one row holding its canonical JSON snapshot; a save
//! overwrites that row in place. Loads verify integrity via stored hashes and
//! fail closed on corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use scenario_harness_core::Baseline;
use scenario_harness_core::BaselineStore;
use scenario_harness_core::HashAlgorithm;
use scenario_harness_core::ScenarioId;
use scenario_harness_core::StoreError;
use scenario_harness_core::Timestamp;
use scenario_harness_core::hashing::DEFAULT_HASH_ALGORITHM;
use scenario_harness_core::hashing::canonical_json_bytes;
use scenario_harness_core::hashing::hash_bytes;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum baseline snapshot size accepted by the store.
pub const MAX_BASELINE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` baseline store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a configuration with defaults for everything but the path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Store payload exceeded size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "baseline_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps a rusqlite error into a store error.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed baseline store with WAL support.
#[derive(Clone)]
pub struct SqliteBaselineStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteBaselineStore {
    /// Opens an `SQLite`-backed baseline store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the database path backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Acquires the connection guard.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Loads the current baseline for the provided scenario identifier.
    fn load_baseline(
        &self,
        scenario_id: &ScenarioId,
    ) -> Result<Option<Baseline>, SqliteStoreError> {
        let row = {
            let guard = self.lock()?;
            read_row(&guard, scenario_id.as_str())?
        };
        let Some((bytes, hash, algorithm)) = row else {
            return Ok(None);
        };
        decode_baseline(scenario_id, &bytes, &hash, &algorithm).map(Some)
    }

    /// Writes the baseline, replacing any earlier row for the scenario.
    fn save_baseline(&self, baseline: &Baseline) -> Result<(), SqliteStoreError> {
        let canonical_json = canonical_json_bytes(baseline)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if canonical_json.len() > MAX_BASELINE_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_BASELINE_BYTES,
                actual_bytes: canonical_json.len(),
            });
        }
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &canonical_json);
        let saved_at = Timestamp::now().as_unix_millis();
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO baselines (scenario_id, baseline_json, baseline_hash, \
                 hash_algorithm, saved_at) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(scenario_id) \
                 DO UPDATE SET baseline_json = excluded.baseline_json, baseline_hash = \
                 excluded.baseline_hash, hash_algorithm = excluded.hash_algorithm, saved_at = \
                 excluded.saved_at",
                params![
                    baseline.scenario_id.as_str(),
                    canonical_json,
                    digest.value,
                    digest.algorithm.label(),
                    saved_at
                ],
            )
            .map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(())
    }

    /// Loads the baseline of every scenario ordered by identifier.
    fn list_baselines(&self) -> Result<Vec<Baseline>, SqliteStoreError> {
        let ids: Vec<String> = {
            let guard = self.lock()?;
            let mut statement = guard
                .prepare("SELECT scenario_id FROM baselines ORDER BY scenario_id ASC")
                .map_err(|err| db_error(&err))?;
            let mapped =
                statement.query_map(params![], |row| row.get(0)).map_err(|err| db_error(&err))?;
            let mut ids = Vec::new();
            for id in mapped {
                ids.push(id.map_err(|err| db_error(&err))?);
            }
            ids
        };
        let mut baselines = Vec::with_capacity(ids.len());
        for id in ids {
            let scenario_id = ScenarioId::new(id);
            if let Some(baseline) = self.load_baseline(&scenario_id)? {
                baselines.push(baseline);
            }
        }
        Ok(baselines)
    }
}

impl BaselineStore for SqliteBaselineStore {
    fn load(&self, scenario_id: &ScenarioId) -> Result<Option<Baseline>, StoreError> {
        self.load_baseline(scenario_id).map_err(StoreError::from)
    }

    fn save(&self, baseline: &Baseline) -> Result<(), StoreError> {
        self.save_baseline(baseline).map_err(StoreError::from)
    }

    fn list(&self) -> Result<Vec<Baseline>, StoreError> {
        self.list_baselines().map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Access
// ============================================================================

/// Reads the stored payload of a scenario with its digest.
fn read_row(
    connection: &Connection,
    scenario_id: &str,
) -> Result<Option<(Vec<u8>, String, String)>, SqliteStoreError> {
    let metadata = connection
        .query_row(
            "SELECT length(baseline_json), baseline_hash, hash_algorithm FROM baselines WHERE \
             scenario_id = ?1",
            params![scenario_id],
            |row| {
                let length: i64 = row.get(0)?;
                let hash: String = row.get(1)?;
                let algorithm: String = row.get(2)?;
                Ok((length, hash, algorithm))
            },
        )
        .optional()
        .map_err(|err| db_error(&err))?;
    let Some((length, hash, algorithm)) = metadata else {
        return Ok(None);
    };
    let length = usize::try_from(length).map_err(|_| {
        SqliteStoreError::Invalid(format!("negative baseline length for scenario {scenario_id}"))
    })?;
    if length > MAX_BASELINE_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_BASELINE_BYTES,
            actual_bytes: length,
        });
    }
    let bytes: Vec<u8> = connection
        .query_row(
            "SELECT baseline_json FROM baselines WHERE scenario_id = ?1",
            params![scenario_id],
            |row| row.get(0),
        )
        .map_err(|err| db_error(&err))?;
    Ok(Some((bytes, hash, algorithm)))
}

/// Verifies the digest of a stored payload and decodes it.
fn decode_baseline(
    scenario_id: &ScenarioId,
    bytes: &[u8],
    hash_value: &str,
    hash_algorithm: &str,
) -> Result<Baseline, SqliteStoreError> {
    let algorithm = HashAlgorithm::from_label(hash_algorithm).ok_or_else(|| {
        SqliteStoreError::Invalid(format!("unsupported hash algorithm: {hash_algorithm}"))
    })?;
    let expected = hash_bytes(algorithm, bytes);
    if expected.value != hash_value {
        return Err(SqliteStoreError::Corrupt(format!("hash mismatch for scenario {}", scenario_id.as_str())));
    }
    let baseline: Baseline =
        serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if baseline.scenario_id != *scenario_id {
        return Err(SqliteStoreError::Invalid(
            "scenario_id mismatch between key and payload".to_string(),
        ));
    }
    Ok(baseline)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS baselines (
                    scenario_id TEXT PRIMARY KEY,
                    baseline_json BLOB NOT NULL,
                    baseline_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL
                );",
            )
            .map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}
