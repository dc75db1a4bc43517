use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::{KeyValueStore, StoreError, StoreKey};

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<StoreKey, Value>>,
}

impl MemoryStore {
    fn poisoned() -> StoreError {
        StoreError::Unavailable("memory store mutex poisoned".to_string())
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: StoreKey) -> Result<Option<Value>, StoreError> {
        let guard = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(guard.get(&key).cloned())
    }

    fn save(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(|_| Self::poisoned())?;
        guard.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(|_| Self::poisoned())?;
        guard.remove(&key);
        Ok(())
    }
}
