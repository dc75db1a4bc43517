use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::entity::{EntityId, EntityState, ProductEntity};
use super::overlay::{Overlay, OverlayError};
use super::surface::PageSurface;
use super::watcher::RescanTrigger;
use crate::scoring::{ScoreResult, ScoringApi, ScoringError};
use crate::store::EcoStore;

/// Counters for a single scan pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub discovered: usize,
    pub skipped: usize,
    pub cache_hits: usize,
    pub scored: usize,
    pub errored: usize,
    pub overlay_failures: usize,
}

impl ScanReport {
    fn absorb(&mut self, other: ScanReport) {
        self.discovered += other.discovered;
        self.skipped += other.skipped;
        self.cache_hits += other.cache_hits;
        self.scored += other.scored;
        self.errored += other.errored;
        self.overlay_failures += other.overlay_failures;
    }
}

enum Lookup {
    Cached(ScoreResult),
    Fresh(ScoreResult),
    Failed(ScoringError),
    Lost(String),
}

/// Drives per-entity `unseen -> loading -> scored | errored` transitions for
/// one page. An entity id that has entered `loading` is never looked up again
/// until it is forgotten.
pub struct PageScanner<S> {
    scoring: Arc<S>,
    store: EcoStore,
    overlay: Arc<dyn Overlay>,
    states: HashMap<EntityId, EntityState>,
}

impl<S> PageScanner<S>
where
    S: ScoringApi + 'static,
{
    pub fn new(scoring: Arc<S>, store: EcoStore, overlay: Arc<dyn Overlay>) -> Self {
        Self {
            scoring,
            store,
            overlay,
            states: HashMap::new(),
        }
    }

    pub fn state(&self, id: &EntityId) -> Option<&EntityState> {
        self.states.get(id)
    }

    pub fn states(&self) -> impl Iterator<Item = (&EntityId, &EntityState)> {
        self.states.iter()
    }

    /// Returns an entity to `unseen` after it was removed from the page.
    pub fn forget(&mut self, id: &EntityId) -> Option<EntityState> {
        self.states.remove(id)
    }

    /// Drops all per-page state, as on navigation.
    pub fn reset(&mut self) {
        self.states.clear();
    }

    pub async fn scan<P>(&mut self, surface: &P) -> ScanReport
    where
        P: PageSurface + ?Sized,
    {
        let entities = match surface.product_entities() {
            Ok(entities) => entities,
            Err(err) => {
                warn!(error = %err, "unable to enumerate page entities");
                return ScanReport::default();
            }
        };

        let mut report = ScanReport {
            discovered: entities.len(),
            ..ScanReport::default()
        };
        let mut lookups = JoinSet::new();
        let mut pending = HashMap::new();

        for entity in entities {
            if self.states.contains_key(&entity.id) {
                report.skipped += 1;
                continue;
            }

            self.states.insert(entity.id.clone(), EntityState::Loading);
            if let Err(err) = self.overlay.show_loading(&entity) {
                self.overlay_failed(&entity, err, &mut report);
            }

            pending.insert(entity.id.clone(), entity.clone());
            let scoring = Arc::clone(&self.scoring);
            let store = self.store.clone();
            lookups.spawn(async move {
                let lookup = resolve(scoring.as_ref(), &store, &entity).await;
                (entity, lookup)
            });
        }

        let mut lost_reason = None;
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((entity, lookup)) => {
                    pending.remove(&entity.id);
                    self.settle(entity, lookup, &mut report);
                }
                Err(err) => {
                    warn!(error = %err, "entity lookup task aborted");
                    lost_reason = Some(err.to_string());
                }
            }
        }

        // Entities whose task never returned must not stay in `loading`.
        for entity in pending.into_values() {
            let reason = lost_reason
                .clone()
                .unwrap_or_else(|| "lookup task aborted".to_string());
            self.settle(entity, Lookup::Lost(reason), &mut report);
        }

        info!(
            discovered = report.discovered,
            skipped = report.skipped,
            cache_hits = report.cache_hits,
            scored = report.scored,
            errored = report.errored,
            "page scan finished"
        );
        report
    }

    /// Rescan triggered by an observed mutation; disabled when the user has
    /// turned auto-scan off.
    pub async fn rescan_on_mutation<P>(&mut self, surface: &P) -> Option<ScanReport>
    where
        P: PageSurface + ?Sized,
    {
        if !self.store.settings().get().auto_scan {
            debug!("auto-scan disabled, ignoring mutation");
            return None;
        }
        Some(self.scan(surface).await)
    }

    /// Runs rescans for every trigger until the trigger channel closes and
    /// returns the accumulated counters.
    pub async fn watch<P>(
        &mut self,
        surface: &P,
        mut triggers: mpsc::Receiver<RescanTrigger>,
    ) -> ScanReport
    where
        P: PageSurface + ?Sized,
    {
        let mut totals = ScanReport::default();
        while triggers.recv().await.is_some() {
            if let Some(report) = self.rescan_on_mutation(surface).await {
                totals.absorb(report);
            }
        }
        totals
    }

    /// Fresh results are cached and recorded as a view; cache hits and
    /// failures leave the history untouched.
    fn settle(&mut self, entity: ProductEntity, lookup: Lookup, report: &mut ScanReport) {
        let state = match lookup {
            Lookup::Cached(result) => {
                report.cache_hits += 1;
                EntityState::Scored {
                    result,
                    from_cache: true,
                }
            }
            Lookup::Fresh(result) => {
                report.scored += 1;
                self.store.cache().put(&entity.cache_key(), result.clone());
                self.store.record_view(&entity.label, &result);
                EntityState::Scored {
                    result,
                    from_cache: false,
                }
            }
            Lookup::Failed(err) => {
                report.errored += 1;
                warn!(entity = %entity.id, error = %err, "scoring failed");
                EntityState::Errored {
                    fallback: ScoreResult::fallback(format!(
                        "Unable to assess sustainability. Please try again. ({err})"
                    )),
                    reason: err.to_string(),
                }
            }
            Lookup::Lost(reason) => {
                report.errored += 1;
                EntityState::Errored {
                    fallback: ScoreResult::fallback(format!(
                        "Unable to assess sustainability. Please try again. ({reason})"
                    )),
                    reason,
                }
            }
        };

        let rendered = match &state {
            EntityState::Scored { result, .. } => self.overlay.show_score(&entity, result),
            EntityState::Errored { fallback, .. } => self.overlay.show_error(&entity, fallback),
            EntityState::Loading => Ok(()),
        };
        if let Err(err) = rendered {
            self.overlay_failed(&entity, err, report);
        }

        self.states.insert(entity.id, state);
    }

    fn overlay_failed(&self, entity: &ProductEntity, err: OverlayError, report: &mut ScanReport) {
        report.overlay_failures += 1;
        warn!(entity = %entity.id, error = %err, "overlay rendering failed");

        let fallback = ScoreResult::fallback(format!("Unable to display grade ({err})"));
        if let Err(err) = self.overlay.show_error(entity, &fallback) {
            debug!(entity = %entity.id, error = %err, "error affordance could not be rendered");
        }
    }
}

/// Cache first, then the scoring service. Writes happen when the lookup is
/// settled on the scanner task so concurrent lookups never interleave
/// read-modify-write cycles on the store.
async fn resolve<S>(scoring: &S, store: &EcoStore, entity: &ProductEntity) -> Lookup
where
    S: ScoringApi,
{
    let key = entity.cache_key();
    if let Some(cached) = store.cache().get(&key) {
        debug!(entity = %entity.id, "cache hit");
        return Lookup::Cached(cached);
    }

    match scoring
        .try_score(&entity.label, entity.site_id.as_deref())
        .await
    {
        Ok(result) => Lookup::Fresh(result),
        Err(err) => Lookup::Failed(err),
    }
}
