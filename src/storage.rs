// Durable storage for the entry collection
//
// The whole collection lives in a single named record, `{ version, entries }`,
// serialized as JSON and rewritten wholesale after every mutation.

use crate::models::Entry;
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Name of the persisted record
pub const RECORD_KEY: &str = "freelancer-tracker-data";

/// Layout version written by this build
pub const CURRENT_VERSION: u32 = 1;

/// Somewhere the serialized record can be kept between sessions
pub trait Backend {
    /// Read the raw record bytes, `None` if nothing has been stored yet
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the record
    fn write(&mut self, payload: &str) -> Result<()>;

    /// Delete the record entirely
    fn remove(&mut self) -> Result<()>;

    /// Keep a copy of a payload that could not be loaded
    fn preserve(&mut self, _payload: &[u8]) -> Result<()> {
        Ok(())
    }

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    /// Absent in payloads written before versioning
    #[serde(default)]
    version: u32,
    #[serde(default)]
    entries: Vec<Entry>,
}

#[derive(Serialize)]
struct StoredRecordRef<'a> {
    version: u32,
    entries: &'a [Entry],
}

/// Serialize the collection into the stored layout
pub fn encode(entries: &[Entry]) -> Result<String> {
    let record = StoredRecordRef {
        version: CURRENT_VERSION,
        entries,
    };
    serde_json::to_string(&record).context("Failed to serialize entries")
}

/// Parse a stored payload back into entries; invalid UTF-8 is a parse failure
pub fn decode(payload: &[u8]) -> Result<Vec<Entry>> {
    let record: StoredRecord = serde_json::from_slice(payload).context("Failed to parse stored entries")?;
    if record.version > CURRENT_VERSION {
        return Err(eyre!(
            "Stored data has version {} but this build only understands up to {}",
            record.version,
            CURRENT_VERSION
        ));
    }
    Ok(record.entries)
}

// ============================================================================
// File backend
// ============================================================================

/// Stores the record as one JSON file
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<dir>/freelancer-tracker-data.json`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", RECORD_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create storage directory")?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.sibling(".lock"))
            .context("Failed to open lock file")?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;
        Ok(lock)
    }
}

impl Backend for FileBackend {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let payload = fs::read(&self.path).context("Failed to read storage file")?;
        Ok(Some(payload))
    }

    fn write(&mut self, payload: &str) -> Result<()> {
        // Lock is released when dropped
        let _lock = self.lock()?;

        let tmp_path = self.sibling(".tmp");
        let mut tmp = File::create(&tmp_path).context("Failed to create temporary storage file")?;
        tmp.write_all(payload.as_bytes())?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &self.path).context("Failed to replace storage file")?;

        debug!(path = ?self.path, bytes = payload.len(), "Wrote storage file");
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        let _lock = self.lock()?;
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove storage file")?;
        }
        Ok(())
    }

    fn preserve(&mut self, payload: &[u8]) -> Result<()> {
        let backup = self.sibling(".bak");
        fs::write(&backup, payload).context("Failed to write backup file")?;
        info!(path = ?backup, "Preserved unreadable storage payload");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Stores the record in a key/value table, one row per key
pub struct SqliteBackend {
    db: Connection,
    label: String,
}

impl SqliteBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create storage directory")?;
        }
        let db = Connection::open(path).context("Failed to open SQLite database")?;
        Self::with_connection(db, path.display().to_string())
    }

    /// `<dir>/freelance-tracker.db`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open(Self::path_in(dir))
    }

    pub fn path_in<P: AsRef<Path>>(dir: P) -> PathBuf {
        dir.as_ref().join("freelance-tracker.db")
    }

    /// Open `path`, moving an unopenable database aside to `<path>.bak` and
    /// starting a fresh one in its place
    pub fn open_or_recover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(backend) => Ok(backend),
            Err(e) if path.exists() => {
                warn!(path = ?path, error = ?e, "SQLite database is unreadable, starting a new one");
                let mut backup = path.as_os_str().to_owned();
                backup.push(".bak");
                fs::rename(path, &backup).context("Failed to move unreadable database aside")?;
                info!(path = ?backup, "Preserved unreadable database");
                Self::open(path)
            }
            Err(e) => Err(e),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open SQLite database")?;
        Self::with_connection(db, ":memory:".to_string())
    }

    fn with_connection(db: Connection, label: String) -> Result<Self> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { db, label })
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO storage (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}

impl Backend for SqliteBackend {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        let value: Option<String> = self
            .db
            .query_row("SELECT value FROM storage WHERE key = ?1", [RECORD_KEY], |row| row.get(0))
            .optional()?;
        Ok(value.map(String::into_bytes))
    }

    fn write(&mut self, payload: &str) -> Result<()> {
        self.put(RECORD_KEY, payload)
    }

    fn remove(&mut self) -> Result<()> {
        self.db.execute("DELETE FROM storage WHERE key = ?1", [RECORD_KEY])?;
        Ok(())
    }

    fn preserve(&mut self, payload: &[u8]) -> Result<()> {
        self.put(&format!("{}.bak", RECORD_KEY), &String::from_utf8_lossy(payload))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.label)
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    record: Option<Vec<u8>>,
    preserved: Option<Vec<u8>>,
    fail_writes: bool,
    writes: usize,
}

/// Process-local storage; clones share the same record
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(payload: impl Into<Vec<u8>>) -> Self {
        let backend = Self::default();
        backend.state().record = Some(payload.into());
        backend
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self) -> Option<Vec<u8>> {
        self.state().record.clone()
    }

    pub fn preserved(&self) -> Option<Vec<u8>> {
        self.state().preserved.clone()
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> usize {
        self.state().writes
    }

    /// Make subsequent writes fail, to simulate a full or read-only disk
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }
}

impl Backend for MemoryBackend {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.state().record.clone())
    }

    fn write(&mut self, payload: &str) -> Result<()> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(eyre!("Storage quota exceeded"));
        }
        state.record = Some(payload.as_bytes().to_vec());
        state.writes += 1;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        self.state().record = None;
        Ok(())
    }

    fn preserve(&mut self, payload: &[u8]) -> Result<()> {
        self.state().preserved = Some(payload.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryType, NewEntry};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn entries() -> Vec<Entry> {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        vec![
            NewEntry::new(EntryType::Job, "Acme").into_entry("a".to_string(), ts),
            NewEntry::new(EntryType::Lead, "Globex").into_entry("b".to_string(), ts),
        ]
    }

    #[test]
    fn test_encode_writes_version() {
        let payload = encode(&entries()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["entries"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_decode_round_trip() {
        let original = entries();
        let decoded = decode(encode(&original).unwrap().as_bytes()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_legacy_payload_without_version() {
        let payload = r#"{"entries":[{"id":"x","type":"job","company":"Initech","status":"pending",
            "createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-01T00:00:00.000Z"}]}"#;
        let decoded = decode(payload.as_bytes()).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].company, "Initech");

        // The browser version tolerated a record with no entries key
        assert!(decode(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_future_version_and_garbage() {
        assert!(decode(br#"{"version":99,"entries":[]}"#).is_err());
        assert!(decode(b"{not json").is_err());
        assert!(decode(br#"{"entries":"nope"}"#).is_err());
        assert!(decode(b"{\"entries\":[{\"company\":\"Caf\xe9\"}]}").is_err());
    }

    #[test]
    fn test_file_backend_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::in_dir(temp.path().join("nested"));

        assert_eq!(backend.read().unwrap(), None);

        backend.write("first").unwrap();
        backend.write("second").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some(b"second".as_slice()));
        assert!(backend.path().ends_with("freelancer-tracker-data.json"));
        assert!(!temp.path().join("nested/freelancer-tracker-data.json.tmp").exists());

        backend.remove().unwrap();
        assert_eq!(backend.read().unwrap(), None);
        // Removing twice is fine
        backend.remove().unwrap();
    }

    #[test]
    fn test_file_backend_preserve() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::in_dir(temp.path());
        backend.preserve(b"{broken").unwrap();

        let backup = temp.path().join("freelancer-tracker-data.json.bak");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{broken");
    }

    #[test]
    fn test_sqlite_backend_round_trip() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(backend.read().unwrap(), None);

        backend.write("one").unwrap();
        backend.write("two").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some(b"two".as_slice()));

        backend.preserve(b"bad").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some(b"two".as_slice()));

        backend.remove().unwrap();
        assert_eq!(backend.read().unwrap(), None);
        assert_eq!(backend.describe(), "sqlite::memory:");
    }

    #[test]
    fn test_sqlite_backend_persists_on_disk() {
        let temp = TempDir::new().unwrap();
        {
            let mut backend = SqliteBackend::in_dir(temp.path()).unwrap();
            backend.write("kept").unwrap();
        }
        let backend = SqliteBackend::in_dir(temp.path()).unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some(b"kept".as_slice()));
    }

    #[test]
    fn test_sqlite_open_or_recover_moves_garbage_aside() {
        let temp = TempDir::new().unwrap();
        let path = SqliteBackend::path_in(temp.path());
        let garbage = "this is not a sqlite database\n".repeat(200);
        fs::write(&path, &garbage).unwrap();

        let mut backend = SqliteBackend::open_or_recover(&path).unwrap();
        assert_eq!(backend.read().unwrap(), None);
        backend.write("fresh").unwrap();

        let backup = temp.path().join("freelance-tracker.db.bak");
        assert_eq!(fs::read_to_string(backup).unwrap(), garbage);
    }

    #[test]
    fn test_sqlite_open_or_recover_keeps_good_database() {
        let temp = TempDir::new().unwrap();
        let path = SqliteBackend::path_in(temp.path());
        SqliteBackend::open(&path).unwrap().write("kept").unwrap();

        let backend = SqliteBackend::open_or_recover(&path).unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some(b"kept".as_slice()));
        assert!(!temp.path().join("freelance-tracker.db.bak").exists());
    }

    #[test]
    fn test_memory_backend_shares_state() {
        let handle = MemoryBackend::new();
        let mut backend = handle.clone();

        backend.write("payload").unwrap();
        assert_eq!(handle.record().as_deref(), Some(b"payload".as_slice()));
        assert_eq!(handle.writes(), 1);

        handle.fail_writes(true);
        assert!(backend.write("lost").is_err());
        assert_eq!(handle.record().as_deref(), Some(b"payload".as_slice()));
    }
}
