//! File-backed lock store.
//!
//! # Lock Files
//!
//! Each record lives in `<dir>/<stem>.lock` as pretty-printed JSON. The stem
//! is the key encoded so any string maps to a single safe filename: ASCII
//! letters, digits, `-` and `_` are kept, every other byte becomes `%XX`.
//! Encodings longer than 200 bytes are cut to a readable prefix plus
//! `~` and the SHA-256 of the key. `~` never appears in an encoding, so hashed
//! and plain stems cannot collide. The record itself always carries the full key.
//!
//! # Atomicity
//!
//! Every mutation (insert, delete, compare-and-delete, delete-all) runs while
//! holding an exclusive advisory lock on `<dir>/.store.guard`, so a record is
//! only ever removed after it has been read and verified under that lock.
//! Readers take no lock:
//!
//! - **Insert** writes and syncs a private temp file, then hard-links it onto
//!   the lock path. Readers never see a half-written lock file.
//! - **Removal** is a single unlink of the lock path.
//!
//! Private files start with `.` and never end in `.lock`, so listing ignores
//! them.

use super::{Insert, LockRecord, LockStore, NewLock};
use crate::clock::{Clock, SystemClock};
use crate::error::{LockError, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Extension of lock files.
const LOCK_EXTENSION: &str = "lock";

/// Name of the file whose advisory lock serializes mutations.
const GUARD_FILE: &str = ".store.guard";

/// Longest filename stem used as-is. Keeps `<stem>.lock` well under the
/// usual 255-byte filename limit.
const MAX_STEM_LEN: usize = 200;

/// Encoded bytes kept in front of the digest when a stem is hashed.
const HASHED_PREFIX_LEN: usize = 64;

/// Disambiguates private files created by threads of one process.
static PRIVATE_FILE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A lock store keeping one JSON file per key in a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

/// Exclusive hold on the store guard file. Released on drop.
struct StoreGuard {
    file: File,
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileStore {
    /// Open (creating if needed) a store in `dir` on the system clock.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    /// Open (creating if needed) a store in `dir` that reads time from `clock`.
    pub fn with_clock<P: Into<PathBuf>>(dir: P, clock: Arc<dyn Clock>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            LockError::Store(format!(
                "failed to create locks directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir, clock })
    }

    /// The directory holding the lock files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the lock file for `key`.
    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_stem(key), LOCK_EXTENSION))
    }

    fn private_path(&self, suffix: &str) -> PathBuf {
        let seq = PRIVATE_FILE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}.{}.{}", std::process::id(), seq, suffix))
    }

    /// Block until this handle holds the store's mutation lock.
    fn guard(&self) -> Result<StoreGuard> {
        let path = self.dir.join(GUARD_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::Store(format!(
                    "failed to open store guard '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        FileExt::lock_exclusive(&file).map_err(|e| {
            LockError::Store(format!(
                "failed to lock store guard '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(StoreGuard { file })
    }

    /// Link `temp` onto `path`. Returns the conflicting record if the path
    /// is already taken.
    fn link_or_read(&self, temp: &Path, path: &Path) -> Result<Option<LockRecord>> {
        match fs::hard_link(temp, path) {
            Ok(()) => {
                sync_dir(&self.dir);
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => match read_record(path)? {
                Some(existing) => Ok(Some(existing)),
                None => Err(LockError::Store(format!(
                    "lock file '{}' was removed outside the store guard",
                    path.display()
                ))),
            },
            Err(e) => Err(LockError::Store(format!(
                "failed to create lock file '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn remove(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                sync_dir(&self.dir);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LockError::Store(format!(
                "failed to remove lock file '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn lock_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LockError::Store(format!(
                    "failed to read locks directory '{}': {}",
                    self.dir.display(),
                    e
                )));
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                LockError::Store(format!("failed to read locks directory entry: {}", e))
            })?;
            let path = entry.path();

            let is_private = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|n| n.starts_with('.'));
            if is_private || path.extension().and_then(|e| e.to_str()) != Some(LOCK_EXTENSION) {
                continue;
            }
            paths.push(path);
        }
        Ok(paths)
    }
}

impl LockStore for FileStore {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn insert_unique(&self, lock: NewLock) -> Result<Insert> {
        let path = self.lock_path(&lock.key);
        let _guard = self.guard()?;
        let record = lock.stamp(self.clock.now());

        let temp = self.private_path("tmp");
        write_record(&temp, &record)?;
        let outcome = self.link_or_read(&temp, &path);
        let _ = fs::remove_file(&temp);

        match outcome? {
            None => Ok(Insert::Created(record)),
            Some(existing) => Ok(Insert::Conflict(existing)),
        }
    }

    fn get(&self, key: &str) -> Result<Option<LockRecord>> {
        read_record(&self.lock_path(key))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let path = self.lock_path(key);
        let _guard = self.guard()?;
        self.remove(&path)
    }

    fn delete_matching(&self, record: &LockRecord) -> Result<bool> {
        let path = self.lock_path(&record.key);
        let _guard = self.guard()?;

        match read_record(&path)? {
            Some(current) if current.token == record.token => self.remove(&path),
            _ => Ok(false),
        }
    }

    fn delete_all(&self) -> Result<usize> {
        if !self.dir.is_dir() {
            return Ok(0);
        }
        let _guard = self.guard()?;

        let mut removed = 0;
        for path in self.lock_files()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(LockError::Store(format!(
                        "failed to remove lock file '{}': {}",
                        path.display(),
                        e
                    )));
                }
            }
        }
        sync_dir(&self.dir);
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<LockRecord>> {
        let mut records = Vec::new();
        for path in self.lock_files()? {
            match read_record(&path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable lock file");
                }
            }
        }
        Ok(records)
    }
}

/// Encode a key into a filename-safe string.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{:02X}", byte);
        }
    }
    encoded
}

/// Filename stem for `key`: the encoding, or a prefix plus digest when the
/// encoding is too long.
fn file_stem(key: &str) -> String {
    let encoded = encode_key(key);
    if encoded.len() <= MAX_STEM_LEN {
        return encoded;
    }

    let digest = Sha256::digest(key.as_bytes());
    let mut stem = String::with_capacity(HASHED_PREFIX_LEN + 1 + digest.len() * 2);
    // Encodings are pure ASCII, so any byte offset is a char boundary.
    stem.push_str(&encoded[..HASHED_PREFIX_LEN]);
    stem.push('~');
    for byte in digest {
        let _ = write!(stem, "{:02x}", byte);
    }
    stem
}

/// Read a lock file. A missing file is `Ok(None)`.
fn read_record(path: &Path) -> Result<Option<LockRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LockError::Store(format!(
                "failed to read lock file '{}': {}",
                path.display(),
                e
            )));
        }
    };

    serde_json::from_str(&content).map(Some).map_err(|e| {
        LockError::Store(format!(
            "failed to parse lock file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Write a record to a fresh file and sync it to disk.
fn write_record(path: &Path, record: &LockRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| LockError::Store(format!("failed to serialize lock record: {}", e)))?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            LockError::Store(format!(
                "failed to create temporary lock file '{}': {}",
                path.display(),
                e
            ))
        })?;

    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(path);
        LockError::Store(format!("failed to write lock record: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        LockError::Store(format!("failed to sync lock file: {}", e))
    })
}

/// Best-effort sync of a directory so new or removed entries are durable.
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_encode_key_keeps_safe_characters() {
        assert_eq!(encode_key("TASK-001"), "TASK-001");
        assert_eq!(encode_key("queue_worker"), "queue_worker");
    }

    #[test]
    fn test_encode_key_escapes_everything_else() {
        assert_eq!(encode_key("a/b"), "a%2Fb");
        assert_eq!(encode_key("calc.42"), "calc%2E42");
        assert_eq!(encode_key(".."), "%2E%2E");
        assert_eq!(encode_key("é"), "%C3%A9");
    }

    #[test]
    fn test_distinct_keys_get_distinct_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        assert_ne!(store.lock_path("a/b"), store.lock_path("a%2Fb"));
        assert_ne!(store.lock_path("a.b"), store.lock_path("a_b"));
    }

    #[test]
    fn test_lock_file_contains_record_json() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        let created = match store
            .insert_unique(NewLock {
                key: "workflow".to_string(),
                owner: "alice".to_string(),
                timeout: 60,
                pid: Some(42),
            })
            .unwrap()
        {
            Insert::Created(record) => record,
            other => panic!("expected insert, got {:?}", other),
        };

        let content = fs::read_to_string(store.lock_path("workflow")).unwrap();
        assert!(content.contains("\"owner\": \"alice\""));
        assert!(content.contains("creation_time"));
        let parsed: LockRecord = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, created);
    }

    #[test]
    fn test_insert_leaves_no_private_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        for owner in ["alice", "bob"] {
            store
                .insert_unique(NewLock {
                    key: "shared".to_string(),
                    owner: owner.to_string(),
                    timeout: 60,
                    pid: None,
                })
                .unwrap();
        }

        let mut names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec![GUARD_FILE.to_string(), "shared.lock".to_string()]);
    }

    #[test]
    fn test_list_skips_corrupt_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store
            .insert_unique(NewLock {
                key: "good".to_string(),
                owner: "alice".to_string(),
                timeout: 60,
                pid: None,
            })
            .unwrap();
        fs::write(temp_dir.path().join("broken.lock"), "not json").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "hello").unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "good");
    }

    #[test]
    fn test_get_corrupt_file_is_store_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        fs::write(store.lock_path("broken"), "{").unwrap();

        let err = store.get("broken").unwrap_err();
        assert!(matches!(err, LockError::Store(_)));
    }

    #[test]
    fn test_mismatched_delete_leaves_lock_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        let current = match store
            .insert_unique(NewLock {
                key: "job".to_string(),
                owner: "alice".to_string(),
                timeout: 60,
                pid: None,
            })
            .unwrap()
        {
            Insert::Created(record) => record,
            other => panic!("expected insert, got {:?}", other),
        };

        let mut stale_handle = current.clone();
        stale_handle.token = uuid::Uuid::new_v4();

        assert!(!store.delete_matching(&stale_handle).unwrap());
        assert_eq!(store.get("job").unwrap(), Some(current));
    }

    #[test]
    fn test_long_keys_are_hashed_into_short_names() {
        let key = "queue/".repeat(40);
        assert_eq!(file_stem(&key).len(), HASHED_PREFIX_LEN + 1 + 64);
        assert_eq!(file_stem(&"a".repeat(MAX_STEM_LEN)), "a".repeat(MAX_STEM_LEN));
        assert_ne!(
            file_stem(&format!("{}x", key)),
            file_stem(&format!("{}y", key))
        );
    }

    #[test]
    fn test_long_key_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let key = "queue/".repeat(40);

        let record = match store
            .insert_unique(NewLock {
                key: key.clone(),
                owner: "alice".to_string(),
                timeout: 60,
                pid: None,
            })
            .unwrap()
        {
            Insert::Created(record) => record,
            other => panic!("expected insert, got {:?}", other),
        };

        let name = store.lock_path(&key).file_name().unwrap().len();
        assert!(name < 255, "lock filename is {} bytes", name);
        assert_eq!(store.get(&key).unwrap(), Some(record.clone()));
        assert_eq!(store.list().unwrap(), vec![record.clone()]);
        assert!(matches!(
            store.insert_unique(NewLock {
                key: key.clone(),
                owner: "bob".to_string(),
                timeout: 60,
                pid: None,
            }),
            Ok(Insert::Conflict(_))
        ));
        assert!(store.delete_matching(&record).unwrap());
        assert_eq!(store.get(&key).unwrap(), None);
    }

    #[test]
    fn test_delete_all_on_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("locks")).unwrap();
        fs::remove_dir(store.dir()).unwrap();

        assert_eq!(store.delete_all().unwrap(), 0);
        assert!(store.list().unwrap().is_empty());
    }
}
