use serde::{Deserialize, Serialize};

use super::{EcoStore, StoreKey};

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8000";

/// Process-wide user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub notifications_enabled: bool,
    pub auto_scan: bool,
    pub api_endpoint: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            auto_scan: true,
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
        }
    }
}

/// Partial update; absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scan: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.notifications_enabled.is_none()
            && self.auto_scan.is_none()
            && self.api_endpoint.is_none()
    }

    fn apply(self, settings: &mut Settings) {
        if let Some(enabled) = self.notifications_enabled {
            settings.notifications_enabled = enabled;
        }
        if let Some(auto_scan) = self.auto_scan {
            settings.auto_scan = auto_scan;
        }
        if let Some(endpoint) = self.api_endpoint {
            settings.api_endpoint = endpoint.trim().trim_end_matches('/').to_string();
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    store: EcoStore,
}

impl SettingsStore {
    pub(super) fn new(store: EcoStore) -> Self {
        Self { store }
    }

    pub fn get(&self) -> Settings {
        self.store.read(StoreKey::Settings)
    }

    /// Overlays `patch` onto the stored record and persists the result.
    pub fn update(&self, patch: SettingsPatch) -> Settings {
        let mut settings = self.get();
        patch.apply(&mut settings);
        self.store.write(StoreKey::Settings, &settings);
        settings
    }

    pub fn reset(&self) -> Settings {
        self.store.remove(StoreKey::Settings);
        Settings::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{KeyValueStore, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn defaults_when_nothing_stored() {
        let store = EcoStore::in_memory();
        let settings = store.settings().get();
        assert!(settings.notifications_enabled);
        assert!(settings.auto_scan);
        assert_eq!(settings.api_endpoint, "http://localhost:8000");
    }

    #[test]
    fn update_merges_only_present_fields() {
        let store = EcoStore::in_memory();
        let settings = store.settings();

        settings.update(SettingsPatch {
            auto_scan: Some(false),
            ..SettingsPatch::default()
        });
        let updated = settings.update(SettingsPatch {
            api_endpoint: Some("https://eco.example.com/".to_string()),
            ..SettingsPatch::default()
        });

        assert!(!updated.auto_scan);
        assert!(updated.notifications_enabled);
        assert_eq!(updated.api_endpoint, "https://eco.example.com");
        assert_eq!(settings.get(), updated);
    }

    #[test]
    fn partially_stored_record_fills_defaults() {
        let backend = Arc::new(MemoryStore::default());
        backend
            .save(StoreKey::Settings, json!({ "autoScan": false }))
            .expect("memory save");
        let store = EcoStore::new(backend, Arc::new(ManualClock::default()));

        let settings = store.settings().get();
        assert!(!settings.auto_scan);
        assert!(settings.notifications_enabled);
        assert_eq!(settings.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn reset_restores_defaults() {
        let store = EcoStore::in_memory();
        store.settings().update(SettingsPatch {
            notifications_enabled: Some(false),
            ..SettingsPatch::default()
        });
        assert_eq!(store.settings().reset(), Settings::default());
        assert_eq!(store.settings().get(), Settings::default());
    }
}
