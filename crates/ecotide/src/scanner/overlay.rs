use super::entity::ProductEntity;
use crate::scoring::ScoreResult;

/// Renders grade badges next to product entities.
pub trait Overlay: Send + Sync {
    fn show_loading(&self, entity: &ProductEntity) -> Result<(), OverlayError>;
    fn show_score(&self, entity: &ProductEntity, result: &ScoreResult) -> Result<(), OverlayError>;
    /// Inline error affordance; `fallback` is still rendered so the entity
    /// never ends up without a badge.
    fn show_error(&self, entity: &ProductEntity, fallback: &ScoreResult)
        -> Result<(), OverlayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    #[error("anchor for entity {0} is no longer attached")]
    Detached(String),
    #[error("overlay rendering failed: {0}")]
    Render(String),
}
