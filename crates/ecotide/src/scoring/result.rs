use serde::{Deserialize, Serialize};

use crate::grade::Grade;

pub const UNKNOWN_IMPACT: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";

/// Renderable outcome of a sustainability lookup. Persisted in the local cache
/// using the extension's camelCase field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub grade: Grade,
    pub co2_impact: String,
    pub recyclable: bool,
    pub renewable_materials: bool,
    pub packaging_score: String,
    pub supply_chain_score: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub is_fallback: bool,
}

impl ScoreResult {
    /// Deterministic degraded result: grade C, unknown impact, no material
    /// claims. `reason` ends up in `message` so the overlay can explain itself.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            grade: Grade::C,
            co2_impact: UNKNOWN_IMPACT.to_string(),
            recyclable: false,
            renewable_materials: false,
            packaging_score: NOT_AVAILABLE.to_string(),
            supply_chain_score: NOT_AVAILABLE.to_string(),
            message: Some(reason.into()),
            is_fallback: true,
        }
    }
}
