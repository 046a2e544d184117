//! Client-side persistence, server edition.
//!
//! Each client (identified by the `x-client-id` header) gets its own namespace
//! of string-keyed JSON blobs, mirroring browser local storage. Blobs are read
//! and written wholesale. A blob that fails to parse is removed and the caller
//! proceeds with defaults.

use std::{
  collections::HashMap,
  path::PathBuf,
  sync::{Arc, Mutex},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info, warn};

pub const PRACTICE_SETTINGS_KEY: &str = "practice_settings";
pub const USER_SESSION_KEY: &str = "mock_user_session_v2";
pub const THEME_KEY: &str = "theme_preference";

/// Raw string store. Namespacing happens in `ClientStorage`.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Option<String>;
  fn set(&self, key: &str, value: String) -> Result<(), String>;
  fn remove(&self, key: &str) -> Result<(), String>;
}

#[derive(Default)]
pub struct MemoryStore {
  items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Option<String> {
    self.items.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
  }

  fn set(&self, key: &str, value: String) -> Result<(), String> {
    self.items.lock().unwrap_or_else(|e| e.into_inner()).insert(key.to_string(), value);
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), String> {
    self.items.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
    Ok(())
  }
}

/// Single JSON file holding every key. Loaded once, rewritten on each change.
pub struct FileStore {
  path: PathBuf,
  items: Mutex<HashMap<String, String>>,
}

impl FileStore {
  pub fn open(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let items = match std::fs::read_to_string(&path) {
      Ok(s) => match serde_json::from_str::<HashMap<String, String>>(&s) {
        Ok(map) => {
          info!(target: "vocab_backend", path = %path.display(), keys = map.len(), "Loaded storage file");
          map
        }
        Err(e) => {
          error!(target: "vocab_backend", path = %path.display(), error = %e, "Storage file is corrupt; starting empty");
          HashMap::new()
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
      Err(e) => {
        error!(target: "vocab_backend", path = %path.display(), error = %e, "Failed to read storage file; starting empty");
        HashMap::new()
      }
    };
    Self { path, items: Mutex::new(items) }
  }

  fn flush(&self, items: &HashMap<String, String>) -> Result<(), String> {
    let body = serde_json::to_string_pretty(items).map_err(|e| e.to_string())?;
    std::fs::write(&self.path, body).map_err(|e| format!("write {}: {}", self.path.display(), e))
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> Option<String> {
    self.items.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
  }

  fn set(&self, key: &str, value: String) -> Result<(), String> {
    let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
    items.insert(key.to_string(), value);
    self.flush(&items)
  }

  fn remove(&self, key: &str) -> Result<(), String> {
    let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
    if items.remove(key).is_some() {
      self.flush(&items)?;
    }
    Ok(())
  }
}

/// A store view scoped to one client.
#[derive(Clone)]
pub struct ClientStorage {
  store: Arc<dyn KeyValueStore>,
  client_id: String,
}

impl ClientStorage {
  pub fn new(store: Arc<dyn KeyValueStore>, client_id: impl Into<String>) -> Self {
    Self { store, client_id: client_id.into() }
  }

  pub fn client_id(&self) -> &str { &self.client_id }

  fn scoped(&self, key: &str) -> String {
    format!("{}:{}", self.client_id, key)
  }

  /// Typed read. Corrupt or schema-mismatched blobs are cleared.
  pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let scoped = self.scoped(key);
    let raw = self.store.get(&scoped)?;
    match serde_json::from_str::<T>(&raw) {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(target: "vocab_backend", client = %self.client_id, %key, error = %e, "Discarding unreadable stored value");
        if let Err(e) = self.store.remove(&scoped) {
          error!(target: "vocab_backend", client = %self.client_id, %key, error = %e, "Failed to clear stored value");
        }
        None
      }
    }
  }

  pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), String> {
    let raw = serde_json::to_string(value).map_err(|e| e.to_string())?;
    self.store.set(&self.scoped(key), raw)
  }

  pub fn remove(&self, key: &str) -> Result<(), String> {
    self.store.remove(&self.scoped(key))
  }

  #[cfg(test)]
  pub fn raw(&self, key: &str) -> Option<String> {
    self.store.get(&self.scoped(key))
  }

  #[cfg(test)]
  pub fn put_raw(&self, key: &str, raw: &str) {
    self.store.set(&self.scoped(key), raw.to_string()).unwrap();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{PracticeQuestionType, PracticeSettings};

  fn storage(client: &str) -> ClientStorage {
    ClientStorage::new(Arc::new(MemoryStore::new()), client)
  }

  #[test]
  fn practice_settings_round_trip() {
    let s = storage("c1");
    let settings = PracticeSettings {
      language: "english".into(),
      level: "intermediate".into(),
      topic: "travel".into(),
      num_questions: 7,
      question_type: PracticeQuestionType::Grammar,
    };
    s.save(PRACTICE_SETTINGS_KEY, &settings).unwrap();
    assert_eq!(s.load::<PracticeSettings>(PRACTICE_SETTINGS_KEY), Some(settings));
  }

  #[test]
  fn corrupt_value_is_cleared() {
    let s = storage("c1");
    s.put_raw(PRACTICE_SETTINGS_KEY, "{not json");
    assert_eq!(s.load::<PracticeSettings>(PRACTICE_SETTINGS_KEY), None);
    assert_eq!(s.raw(PRACTICE_SETTINGS_KEY), None);
  }

  #[test]
  fn schema_mismatch_is_cleared() {
    let s = storage("c1");
    s.put_raw(PRACTICE_SETTINGS_KEY, r#"{"language": 3}"#);
    assert_eq!(s.load::<PracticeSettings>(PRACTICE_SETTINGS_KEY), None);
    assert_eq!(s.raw(PRACTICE_SETTINGS_KEY), None);
  }

  #[test]
  fn clients_are_isolated() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let a = ClientStorage::new(store.clone(), "a");
    let b = ClientStorage::new(store, "b");
    a.save(THEME_KEY, &"dark").unwrap();
    assert_eq!(a.load::<String>(THEME_KEY).as_deref(), Some("dark"));
    assert_eq!(b.load::<String>(THEME_KEY), None);
  }

  #[test]
  fn file_store_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!("vocab_store_{}_{}.json", std::process::id(), uuid::Uuid::new_v4()));
    {
      let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path));
      ClientStorage::new(store, "c").save(THEME_KEY, &"ocean").unwrap();
    }
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path));
    let c = ClientStorage::new(store, "c");
    assert_eq!(c.load::<String>(THEME_KEY).as_deref(), Some("ocean"));
    c.remove(THEME_KEY).unwrap();
    assert_eq!(c.load::<String>(THEME_KEY), None);
    let _ = std::fs::remove_file(&path);
  }
}
