use std::io::Write;

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use super::{EcoStore, StoreKey};
use crate::grade::Grade;

pub const MAX_HISTORY_ENTRIES: usize = 100;

/// "Product viewed with grade X" record backing the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub product: String,
    pub grade: Grade,
    pub co2_impact: String,
    #[serde(rename = "timestamp")]
    pub timestamp_epoch_millis: i64,
}

#[derive(Debug, Serialize)]
struct HistoryCsvRow<'a> {
    product: &'a str,
    grade: &'static str,
    co2_impact: &'a str,
    timestamp: String,
}

/// Append-only log of viewed products holding the most recent
/// [`MAX_HISTORY_ENTRIES`] events in append order.
#[derive(Debug, Clone)]
pub struct EventHistory {
    store: EcoStore,
}

impl EventHistory {
    pub(super) fn new(store: EcoStore) -> Self {
        Self { store }
    }

    pub fn append(&self, event: HistoryEvent) {
        let mut events = self.all();
        events.push(event);
        trim_front(&mut events, MAX_HISTORY_ENTRIES);
        self.store.write(StoreKey::EcoData, &events);
    }

    /// Oldest first, most recent last.
    pub fn all(&self) -> Vec<HistoryEvent> {
        self.store.read(StoreKey::EcoData)
    }

    pub fn clear(&self) {
        self.store.remove(StoreKey::EcoData);
    }

    /// Writes the history as CSV (`product,grade,co2_impact,timestamp`), the
    /// timestamp rendered as RFC 3339 UTC.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, csv::Error> {
        let events = self.all();
        let mut csv_writer = csv::Writer::from_writer(writer);
        for event in &events {
            csv_writer.serialize(HistoryCsvRow {
                product: &event.product,
                grade: event.grade.label(),
                co2_impact: &event.co2_impact,
                timestamp: format_timestamp(event.timestamp_epoch_millis),
            })?;
        }
        csv_writer.flush()?;
        Ok(events.len())
    }
}

fn trim_front(events: &mut Vec<HistoryEvent>, cap: usize) {
    if events.len() > cap {
        let excess = events.len() - cap;
        events.drain(..excess);
    }
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|moment| moment.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn history() -> EventHistory {
        EcoStore::new(
            Arc::new(MemoryStore::default()),
            Arc::new(ManualClock::default()),
        )
        .history()
    }

    fn event(index: usize) -> HistoryEvent {
        HistoryEvent {
            product: format!("product {index}"),
            grade: Grade::B,
            co2_impact: "2.5 kg CO2".to_string(),
            timestamp_epoch_millis: index as i64,
        }
    }

    #[test]
    fn append_preserves_order() {
        let history = history();
        history.append(event(1));
        history.append(event(2));
        history.append(event(1));
        let products: Vec<_> = history.all().into_iter().map(|e| e.product).collect();
        assert_eq!(products, vec!["product 1", "product 2", "product 1"]);
    }

    #[test]
    fn overflow_drops_oldest_and_keeps_order() {
        let history = history();
        for index in 0..(MAX_HISTORY_ENTRIES + 25) {
            history.append(event(index));
            assert!(history.all().len() <= MAX_HISTORY_ENTRIES);
        }

        let events = history.all();
        assert_eq!(events.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(events[0], event(25));
        assert_eq!(events[MAX_HISTORY_ENTRIES - 1], event(MAX_HISTORY_ENTRIES + 24));
        assert!(events
            .windows(2)
            .all(|pair| pair[0].timestamp_epoch_millis < pair[1].timestamp_epoch_millis));
    }

    #[test]
    fn clear_empties_history() {
        let history = history();
        history.append(event(1));
        history.clear();
        assert!(history.all().is_empty());
    }

    #[test]
    fn export_writes_header_and_rows() {
        let history = history();
        history.append(HistoryEvent {
            product: "Organic Cotton Tee, Fair Trade".to_string(),
            grade: Grade::A,
            co2_impact: "1.8 kg CO2".to_string(),
            timestamp_epoch_millis: 1_700_000_000_000,
        });

        let mut buffer = Vec::new();
        let written = history.export_csv(&mut buffer).expect("export succeeds");
        let text = String::from_utf8(buffer).expect("utf8 csv");

        assert_eq!(written, 1);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("product,grade,co2_impact,timestamp"));
        assert_eq!(
            lines.next(),
            Some("\"Organic Cotton Tee, Fair Trade\",A,1.8 kg CO2,2023-11-14T22:13:20.000Z")
        );
    }
}
