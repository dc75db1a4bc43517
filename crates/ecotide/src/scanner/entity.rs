use std::fmt;

use serde::Serialize;

use crate::scoring::ScoreResult;
use crate::store::cache_key;

/// Stable identity of a product entity for the life of a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub String);

impl EntityId {
    /// DOM-position composite used for search-result rows.
    pub fn positional(index: usize, site_id: &str) -> Self {
        Self(format!("{index}-{site_id}"))
    }

    /// Content-derived key used for single-product pages.
    pub fn product_page(site_id: Option<&str>, title: &str) -> Self {
        match site_id.filter(|id| !id.is_empty()) {
            Some(id) => Self(format!("product-{id}")),
            None => Self(format!("product-{}", title.trim())),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One detected product on a scanned page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductEntity {
    pub id: EntityId,
    pub label: String,
    pub site_id: Option<String>,
}

impl ProductEntity {
    pub fn cache_key(&self) -> String {
        cache_key(&self.label, self.site_id.as_deref())
    }
}

/// Lifecycle of an entity once discovered. Unseen entities have no state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityState {
    Loading,
    Scored { result: ScoreResult, from_cache: bool },
    Errored { fallback: ScoreResult, reason: String },
}

impl EntityState {
    pub fn label(&self) -> &'static str {
        match self {
            EntityState::Loading => "loading",
            EntityState::Scored { .. } => "scored",
            EntityState::Errored { .. } => "errored",
        }
    }

    /// Result to render, if the entity has settled.
    pub fn result(&self) -> Option<&ScoreResult> {
        match self {
            EntityState::Loading => None,
            EntityState::Scored { result, .. } => Some(result),
            EntityState::Errored { fallback, .. } => Some(fallback),
        }
    }
}
