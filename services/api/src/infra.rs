use ecotide::config::AppConfig;
use ecotide::error::AppError;
use ecotide::scanner::{MutationRecord, Overlay, OverlayError, ProductEntity};
use ecotide::{EcoStore, ScoreResult, ScoringClient};
use metrics_exporter_prometheus::PrometheusHandle;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: EcoStore,
}

/// Scoring client for the endpoint in the stored settings, unless the
/// environment overrides it.
pub(crate) fn scoring_client(config: &AppConfig, store: &EcoStore) -> Result<ScoringClient, AppError> {
    let endpoint = config
        .scoring
        .resolve_endpoint(&store.settings().get().api_endpoint);
    debug!(%endpoint, "using scoring endpoint");
    Ok(ScoringClient::new(endpoint, config.scoring.request_timeout)?)
}

/// Prints one line per overlay transition.
#[derive(Debug, Default)]
pub(crate) struct ConsoleOverlay;

impl ConsoleOverlay {
    fn emit(&self, line: String) -> Result<(), OverlayError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}").map_err(|err| OverlayError::Render(err.to_string()))
    }
}

impl Overlay for ConsoleOverlay {
    fn show_loading(&self, entity: &ProductEntity) -> Result<(), OverlayError> {
        self.emit(format!("[ ... ] {} {}", entity.id, entity.label))
    }

    fn show_score(&self, entity: &ProductEntity, result: &ScoreResult) -> Result<(), OverlayError> {
        let recyclable = if result.recyclable { "recyclable" } else { "not recyclable" };
        self.emit(format!(
            "[  {}  ] {} {} | {} | {} | packaging {} | supply chain {}",
            result.grade,
            entity.id,
            entity.label,
            result.co2_impact,
            recyclable,
            result.packaging_score,
            result.supply_chain_score
        ))
    }

    fn show_error(&self, entity: &ProductEntity, fallback: &ScoreResult) -> Result<(), OverlayError> {
        let reason = fallback.message.as_deref().unwrap_or("scoring unavailable");
        self.emit(format!(
            "[ {}?! ] {} {} | {}",
            fallback.grade, entity.id, entity.label, reason
        ))
    }
}

/// Polls `path` and reports a structural mutation whenever its size or
/// modification time changes. The channel closes when the receiver is
/// dropped.
pub(crate) fn poll_for_changes(path: PathBuf, interval: Duration) -> mpsc::Receiver<MutationRecord> {
    let (sender, receiver) = mpsc::channel(16);

    tokio::spawn(async move {
        let mut last_seen = fingerprint(&path);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let current = fingerprint(&path);
            if current == last_seen {
                continue;
            }
            last_seen = current;

            if sender.send(MutationRecord { added_nodes: 1 }).await.is_err() {
                return;
            }
        }
    });

    receiver
}

fn fingerprint(path: &Path) -> Option<(u64, SystemTime)> {
    match std::fs::metadata(path) {
        Ok(meta) => Some((meta.len(), meta.modified().unwrap_or(SystemTime::UNIX_EPOCH))),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "watched page unavailable");
            None
        }
    }
}
