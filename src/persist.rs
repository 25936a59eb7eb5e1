//! Mirror the users state into a durable key-value slot and load it back.
//!
//! The slot holds one JSON document:
//!
//! ```json
//! { "version": 1, "state": { "users": [], "status": "idle", "error": null } }
//! ```
//!
//! Writes are whole-state and best effort. A stored document whose version
//! differs from [`Config::version`] is treated as absent; there is no
//! migration.
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
};
use tracing::{debug, instrument, warn};

use crate::{
    error::Result,
    store::{Status, UsersState},
};

/// The version written to new snapshots and expected from stored ones.
pub const DEFAULT_VERSION: u32 = 1;
/// The default slot name.
pub const DEFAULT_KEY: &str = "root";

/// A string key-value store in the shape of browser local storage.
pub trait Storage: Send + Sync + fmt::Debug {
    /// Read the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    /// Store `value` under `key`, replacing what was there.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Storage that lives and dies with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
        Ok(())
    }
}

/// Storage keeping one JSON file per key inside a directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for storage. The directory is created on the first write.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Percent-encoded, so distinct keys never share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        let file_name = url::form_urlencoded::byte_serialize(key.as_bytes())
            .collect::<String>()
            .replace('*', "%2A");
        self.dir.join(format!("{file_name}.json"))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Where and under which version the state is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub key: String,
    pub version: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            version: DEFAULT_VERSION,
        }
    }
}

impl Config {
    /// The namespaced storage key, e.g. `persist:root`.
    pub fn storage_key(&self) -> String {
        format!("persist:{}", self.key)
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    state: &'a UsersState,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    state: UsersState,
}

// Only the version, so a mismatched document is discarded even when its
// state no longer decodes.
#[derive(Deserialize)]
struct SnapshotVersion {
    version: u32,
}

/// Loads and writes [`UsersState`] snapshots through a [`Storage`].
#[derive(Debug)]
pub struct Persistor {
    storage: Box<dyn Storage>,
    config: Config,
}

impl Persistor {
    pub fn new<S: Storage + 'static>(storage: S, config: Config) -> Self {
        Self {
            storage: Box::new(storage),
            config,
        }
    }

    /// A persistor backed by [`MemoryStorage`] with the default config.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new(), Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Read the stored state.
    ///
    /// Falls back to the default state when nothing is stored, the version
    /// does not match, or the document cannot be read. A stored `loading`
    /// status comes back as `idle`, since no fetch of this process can be in
    /// flight yet.
    #[instrument(skip(self), fields(key = %self.config.storage_key()))]
    pub fn load(&self) -> UsersState {
        match self.try_load() {
            Ok(Some(mut state)) => {
                if state.status == Status::Loading {
                    state.status = Status::Idle;
                }
                debug!(users = state.users.len(), "rehydrated users state");
                state
            }
            Ok(None) => UsersState::default(),
            Err(e) => {
                warn!(error = %e, "discarding unreadable users snapshot");
                UsersState::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<UsersState>> {
        let raw = match self.storage.get_item(&self.config.storage_key())? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let SnapshotVersion { version } = serde_json::from_str(&raw)?;
        if version != self.config.version {
            debug!(
                stored = version,
                expected = self.config.version,
                "ignoring snapshot with mismatched version"
            );
            return Ok(None);
        }

        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        Ok(Some(snapshot.state))
    }

    /// Serialize `state` and overwrite the slot.
    pub fn write(&self, state: &UsersState) -> Result<()> {
        let payload = serde_json::to_string(&SnapshotRef {
            version: self.config.version,
            state,
        })?;
        self.storage
            .set_item(&self.config.storage_key(), &payload)
    }

    /// Called after every state transition. Failures are logged and
    /// swallowed; the in-memory state stays authoritative.
    pub fn on_state_change(&self, state: &UsersState) {
        if let Err(e) = self.write(state) {
            warn!(error = %e, key = %self.config.storage_key(), "failed to persist users state");
        }
    }

    /// Remove the stored snapshot.
    pub fn purge(&self) -> Result<()> {
        self.storage.remove_item(&self.config.storage_key())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{users::User, Error};

    fn state_with_ada() -> UsersState {
        UsersState {
            users: vec![User {
                id: 1_700_000_000_000,
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                ..Default::default()
            }],
            status: Status::Succeeded,
            error: None,
        }
    }

    #[test]
    fn test_load_without_snapshot() {
        let persistor = Persistor::in_memory();
        assert_eq!(persistor.load(), UsersState::default());
    }

    #[test]
    fn test_round_trip() {
        let persistor = Persistor::in_memory();
        let state = state_with_ada();
        persistor.write(&state).unwrap();
        assert_eq!(persistor.load(), state);
    }

    #[test]
    fn test_payload_layout() {
        let persistor = Persistor::in_memory();
        persistor.write(&UsersState::default()).unwrap();

        let raw = persistor.storage().get_item("persist:root").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "version": 1,
                "state": { "users": [], "status": "idle", "error": null }
            })
        );
    }

    #[test]
    fn test_version_mismatch_falls_back_to_default() {
        let storage = MemoryStorage::new();
        let v1 = Persistor::new(storage, Config::default());
        v1.write(&state_with_ada()).unwrap();

        let raw = v1.storage().get_item("persist:root").unwrap().unwrap();
        let storage = MemoryStorage::new();
        storage.set_item("persist:root", &raw).unwrap();
        let v2 = Persistor::new(
            storage,
            Config {
                version: 2,
                ..Config::default()
            },
        );
        assert_eq!(v2.load(), UsersState::default());
    }

    #[test]
    fn test_mismatched_version_with_foreign_state_shape() {
        let storage = MemoryStorage::new();
        storage
            .set_item("persist:root", r#"{"version": 0, "state": {"people": 3}}"#)
            .unwrap();
        let persistor = Persistor::new(storage, Config::default());
        assert_eq!(persistor.try_load().unwrap(), None);
    }

    #[test]
    fn test_garbage_snapshot_falls_back_to_default() {
        let storage = MemoryStorage::new();
        storage.set_item("persist:root", "{not json").unwrap();
        let persistor = Persistor::new(storage, Config::default());
        assert!(matches!(persistor.try_load(), Err(Error::Serialize(_))));
        assert_eq!(persistor.load(), UsersState::default());
    }

    #[test]
    fn test_loading_status_rehydrates_as_idle() {
        let persistor = Persistor::in_memory();
        let mut state = state_with_ada();
        state.status = Status::Loading;
        persistor.write(&state).unwrap();

        let loaded = persistor.load();
        assert_eq!(loaded.status, Status::Idle);
        assert_eq!(loaded.users, state.users);
    }

    #[test]
    fn test_purge() {
        let persistor = Persistor::in_memory();
        persistor.write(&state_with_ada()).unwrap();
        persistor.purge().unwrap();
        assert_eq!(persistor.storage().get_item("persist:root").unwrap(), None);
        persistor.purge().unwrap();
    }

    #[derive(Debug)]
    struct FullStorage;

    impl Storage for FullStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "quota exceeded").into())
        }

        fn remove_item(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let persistor = Persistor::new(FullStorage, Config::default());
        assert!(matches!(
            persistor.write(&state_with_ada()),
            Err(Error::Storage(_))
        ));
        // Swallowed.
        persistor.on_state_change(&state_with_ada());
    }

    #[test]
    fn test_file_storage() {
        let dir = std::env::temp_dir().join(format!(
            "userdesk-persist-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let storage = FileStorage::new(&dir);
        assert_eq!(storage.get_item("persist:root").unwrap(), None);

        storage.set_item("persist:root", "{}").unwrap();
        assert!(dir.join("persist%3Aroot.json").exists());
        assert_eq!(storage.get_item("persist:root").unwrap().as_deref(), Some("{}"));

        storage.remove_item("persist:root").unwrap();
        storage.remove_item("persist:root").unwrap();
        assert_eq!(storage.get_item("persist:root").unwrap(), None);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_storage_keeps_similar_keys_apart() {
        let dir = std::env::temp_dir().join(format!(
            "userdesk-keys-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let storage = FileStorage::new(&dir);
        storage.set_item("persist:root", "colon").unwrap();
        storage.set_item("persist-root", "dash").unwrap();
        storage.set_item("persist root", "space").unwrap();
        storage.set_item("persist*root", "star").unwrap();

        assert_eq!(storage.get_item("persist:root").unwrap().as_deref(), Some("colon"));
        assert_eq!(storage.get_item("persist-root").unwrap().as_deref(), Some("dash"));
        assert_eq!(storage.get_item("persist root").unwrap().as_deref(), Some("space"));
        assert_eq!(storage.get_item("persist*root").unwrap().as_deref(), Some("star"));
        assert!(dir.join("persist%2Aroot.json").exists());

        fs::remove_dir_all(&dir).ok();
    }
}
