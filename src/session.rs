use std::{
    collections::{BTreeMap, HashMap},
    io,
    path::PathBuf,
    sync::Mutex,
};

use tracing::debug;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_NAME_KEY: &str = "userName";

const DEFAULT_USER_NAME: &str = "Пользователь";

/// Durable string key-value storage for the client side of the widget.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Keeps every key in one JSON object on disk.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> io::Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(io::Error::other),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(entries).map_err(io::Error::other)?;
        std::fs::write(&self.path, raw)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.read()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write(&entries)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.read()?;
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }
}

/// Storage that lives as long as the process.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub name: String,
}

impl Session {
    pub fn load(storage: &dyn Storage) -> io::Result<Option<Self>> {
        let Some(token) = storage.get(AUTH_TOKEN_KEY)? else {
            return Ok(None);
        };
        let name = storage
            .get(USER_NAME_KEY)?
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_owned());

        debug!(%name, "restored session");
        Ok(Some(Self { token, name }))
    }

    pub fn save(&self, storage: &dyn Storage) -> io::Result<()> {
        storage.set(AUTH_TOKEN_KEY, &self.token)?;
        storage.set(USER_NAME_KEY, &self.name)
    }

    pub fn clear(storage: &dyn Storage) -> io::Result<()> {
        storage.remove(AUTH_TOKEN_KEY)?;
        storage.remove(USER_NAME_KEY)
    }
}
