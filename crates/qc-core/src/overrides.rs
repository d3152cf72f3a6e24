//! Per-dataset parameter override store.
//!
//! Once a threshold has been used (or set by an operator) for a dataset, later
//! automated runs reuse it. Each dataset has one JSON record:
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "identity": "mooring/ADCP_2019.nc",
//!   "updated_at": "2026-10-19T08:00:00+00:00",
//!   "tests": {"correlation_magnitude": {"cmag": 110.0}}
//! }
//! ```
//!
//! Writes are read-modify-write under a per-identity in-process mutex and a
//! cross-process lock file, then land via rename so readers never see a
//! partial record. A lock file holds the writer's pid and creation time in
//! unix seconds; one older than the stale age is left over from a crashed
//! writer and is removed.

use qc_common::{DatasetId, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Stored values: test name -> parameter name -> value.
pub type TestParams = BTreeMap<String, BTreeMap<String, f64>>;

/// Persisted override record for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub schema_version: String,
    pub identity: DatasetId,
    pub updated_at: String,
    #[serde(default)]
    pub tests: TestParams,
}

impl OverrideRecord {
    fn empty(identity: &DatasetId) -> Self {
        OverrideRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            identity: identity.clone(),
            updated_at: chrono::Utc::now().to_rfc3339(),
            tests: BTreeMap::new(),
        }
    }

    pub fn get(&self, test: &str, param: &str) -> Option<f64> {
        self.tests.get(test).and_then(|p| p.get(param)).copied()
    }
}

#[derive(Debug, Error)]
pub enum OverrideStoreError {
    #[error("override record for {0} is locked by another process")]
    LockUnavailable(String),
    #[error("refusing to store non-finite value {value} for {test}.{param}")]
    NonFinite {
        test: String,
        param: String,
        value: f64,
    },
    #[error("override record {path} belongs to {found}, not {expected}")]
    IdentityCollision {
        path: String,
        expected: String,
        found: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<OverrideStoreError> for qc_common::Error {
    fn from(err: OverrideStoreError) -> Self {
        match err {
            OverrideStoreError::LockUnavailable(path) => qc_common::Error::LockUnavailable { path },
            OverrideStoreError::Io(e) => qc_common::Error::Io(e),
            OverrideStoreError::Json(e) => qc_common::Error::Json(e),
            other => qc_common::Error::OverrideStore(other.to_string()),
        }
    }
}

/// How long a writer waits for another process's lock file.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);
/// Age after which a lock file is taken to belong to a dead writer. Far above
/// the time any write holds the lock.
pub const DEFAULT_STALE_LOCK_AGE: Duration = Duration::from_secs(30);
const LOCK_RETRY: Duration = Duration::from_millis(10);

/// File-backed override store rooted at one directory.
#[derive(Debug)]
pub struct OverrideStore {
    dir: PathBuf,
    lock_timeout: Duration,
    stale_lock_age: Duration,
    locks: Mutex<HashMap<DatasetId, Arc<Mutex<()>>>>,
}

impl OverrideStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            stale_lock_age: DEFAULT_STALE_LOCK_AGE,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_stale_lock_age(mut self, age: Duration) -> Self {
        self.stale_lock_age = age;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, identity: &DatasetId) -> PathBuf {
        self.dir.join(format!("{}.json", identity.record_stem()))
    }

    fn lock_path(&self, identity: &DatasetId) -> PathBuf {
        self.dir.join(format!("{}.lock", identity.record_stem()))
    }

    /// Full record for a dataset, if one was ever written.
    pub fn load(&self, identity: &DatasetId) -> Result<Option<OverrideRecord>, OverrideStoreError> {
        let path = self.record_path(identity);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        let record: OverrideRecord = serde_json::from_str(&contents)?;
        if &record.identity != identity {
            return Err(OverrideStoreError::IdentityCollision {
                path: path.display().to_string(),
                expected: identity.to_string(),
                found: record.identity.to_string(),
            });
        }
        Ok(Some(record))
    }

    /// Stored value for `(identity, test, param)`, else `default`.
    pub fn read(
        &self,
        identity: &DatasetId,
        test: &str,
        param: &str,
        default: f64,
    ) -> Result<f64, OverrideStoreError> {
        Ok(self
            .load(identity)?
            .and_then(|r| r.get(test, param))
            .unwrap_or(default))
    }

    /// Merge one value into the dataset's record.
    pub fn write(
        &self,
        identity: &DatasetId,
        test: &str,
        param: &str,
        value: f64,
    ) -> Result<(), OverrideStoreError> {
        self.write_many(identity, test, &[(param.to_string(), value)])
    }

    /// Merge several values for one test in a single read-modify-write.
    /// Entries for other tests and other parameters are left alone.
    pub fn write_many(
        &self,
        identity: &DatasetId,
        test: &str,
        params: &[(String, f64)],
    ) -> Result<(), OverrideStoreError> {
        if let Some((param, value)) = params.iter().find(|(_, v)| !v.is_finite()) {
            return Err(OverrideStoreError::NonFinite {
                test: test.to_string(),
                param: param.clone(),
                value: *value,
            });
        }
        self.update(identity, |record| {
            let entry = record.tests.entry(test.to_string()).or_default();
            for (param, value) in params {
                entry.insert(param.clone(), *value);
            }
            true
        })
    }

    /// Forget stored values: one test's, or every test's when `test` is None.
    /// Returns whether anything was removed.
    pub fn reset(
        &self,
        identity: &DatasetId,
        test: Option<&str>,
    ) -> Result<bool, OverrideStoreError> {
        let mut removed = false;
        self.update(identity, |record| {
            removed = match test {
                Some(name) => record.tests.remove(name).is_some(),
                None => {
                    let had = !record.tests.is_empty();
                    record.tests.clear();
                    had
                }
            };
            removed
        })?;
        Ok(removed)
    }

    fn identity_lock(&self, identity: &DatasetId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(identity.clone()).or_default().clone()
    }

    /// Serialized read-modify-write. `mutate` returns whether to persist.
    fn update<F>(&self, identity: &DatasetId, mutate: F) -> Result<(), OverrideStoreError>
    where
        F: FnOnce(&mut OverrideRecord) -> bool,
    {
        let in_process = self.identity_lock(identity);
        let _held = in_process.lock().unwrap_or_else(|e| e.into_inner());

        fs::create_dir_all(&self.dir)?;
        let _guard = LockGuard::acquire(
            &self.lock_path(identity),
            self.lock_timeout,
            self.stale_lock_age,
        )?;

        let mut record = self
            .load(identity)?
            .unwrap_or_else(|| OverrideRecord::empty(identity));
        if !mutate(&mut record) {
            return Ok(());
        }
        record.updated_at = chrono::Utc::now().to_rfc3339();
        self.write_record(identity, &record)
    }

    fn write_record(
        &self,
        identity: &DatasetId,
        record: &OverrideRecord,
    ) -> Result<(), OverrideStoreError> {
        let path = self.record_path(identity);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(record)?;
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&json)?;
            file.flush()?;
        }
        fs::rename(tmp_path, &path)?;
        Ok(())
    }
}

struct LockGuard {
    lock_path: PathBuf,
}

impl LockGuard {
    fn acquire(
        path: &Path,
        timeout: Duration,
        stale_after: Duration,
    ) -> Result<Self, OverrideStoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            let file = OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(path);
            match file {
                Ok(mut handle) => {
                    let created = unix_secs(SystemTime::now());
                    let _ = write!(handle, "{} {}", std::process::id(), created);
                    return Ok(Self {
                        lock_path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock_age(path).is_some_and(|age| age > stale_after) {
                        tracing::warn!(
                            lock = %path.display(),
                            owner = %fs::read_to_string(path).unwrap_or_default().trim(),
                            "removing stale override lock"
                        );
                        match fs::remove_file(path) {
                            Ok(()) => continue,
                            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                            Err(e) => return Err(OverrideStoreError::Io(e)),
                        }
                    }
                    if Instant::now() >= deadline {
                        return Err(OverrideStoreError::LockUnavailable(
                            path.display().to_string(),
                        ));
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(err) => return Err(OverrideStoreError::Io(err)),
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn unix_secs(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

/// Age of a lock file from its recorded creation time, falling back to the
/// file's mtime when the contents are not `<pid> <unix secs>`. None when the
/// file vanished in between.
fn lock_age(path: &Path) -> Option<Duration> {
    let now = unix_secs(SystemTime::now());
    let recorded = fs::read_to_string(path)
        .ok()
        .and_then(|contents| contents.split_whitespace().nth(1)?.parse::<u64>().ok());
    let created = match recorded {
        Some(secs) => secs,
        None => unix_secs(fs::metadata(path).ok()?.modified().ok()?),
    };
    Some(Duration::from_secs(now.saturating_sub(created)))
}
