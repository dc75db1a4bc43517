use serde::{Deserialize, Serialize};

use super::{EcoStore, HistoryEvent, StoreKey};
use crate::stats::compute_stats;

/// Legacy progress snapshot persisted under `userProgress`. It is derived
/// from the history on every recorded view and never read back into the
/// aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProgress {
    pub total_products: usize,
    pub average_grade: String,
    pub co2_saved_kg: f64,
    pub badges: Vec<String>,
    pub updated_at_epoch_millis: i64,
}

#[derive(Debug, Clone)]
pub struct ProgressStore {
    store: EcoStore,
}

impl ProgressStore {
    pub(super) fn new(store: EcoStore) -> Self {
        Self { store }
    }

    pub fn get(&self) -> UserProgress {
        self.store.read(StoreKey::UserProgress)
    }

    pub fn refresh(&self, history: &[HistoryEvent]) -> UserProgress {
        let stats = compute_stats(history);
        let progress = UserProgress {
            total_products: stats.total_products,
            average_grade: stats.average_grade_label().to_string(),
            co2_saved_kg: stats.co2_saved_kg,
            badges: stats
                .badges
                .iter()
                .map(|badge| badge.label().to_string())
                .collect(),
            updated_at_epoch_millis: self.store.now_millis(),
        };
        self.store.write(StoreKey::UserProgress, &progress);
        progress
    }

    pub fn clear(&self) {
        self.store.remove(StoreKey::UserProgress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::grade::Grade;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn refresh_persists_derived_snapshot() {
        let clock = Arc::new(ManualClock::starting_at(9_000));
        let store = EcoStore::new(Arc::new(MemoryStore::default()), clock);
        let history: Vec<HistoryEvent> = [Grade::A, Grade::A, Grade::B, Grade::B, Grade::C]
            .into_iter()
            .enumerate()
            .map(|(index, grade)| HistoryEvent {
                product: format!("item {index}"),
                grade,
                co2_impact: "1.0 kg CO2".to_string(),
                timestamp_epoch_millis: index as i64,
            })
            .collect();

        let progress = store.progress().refresh(&history);

        assert_eq!(progress.total_products, 5);
        assert_eq!(progress.average_grade, "B");
        assert_eq!(progress.co2_saved_kg, 10.0);
        assert_eq!(progress.badges, vec!["Eco Explorer".to_string()]);
        assert_eq!(progress.updated_at_epoch_millis, 9_000);
        assert_eq!(store.progress().get(), progress);
    }
}
