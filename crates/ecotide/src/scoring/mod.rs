//! Client side of the external sustainability scoring service.

mod client;
pub mod result;
pub mod wire;

use std::future::Future;

use crate::grade::InvalidGrade;

pub use client::ScoringClient;
pub use result::ScoreResult;
pub use wire::Suggestion;

/// Seam between the page scanner and the scoring service so scans can be
/// exercised without a network.
pub trait ScoringApi: Send + Sync {
    fn try_score(
        &self,
        label: &str,
        site_id: Option<&str>,
    ) -> impl Future<Output = Result<ScoreResult, ScoringError>> + Send;
}

/// Reasons a scoring call produced no usable result.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("unable to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("scoring endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("scoring endpoint returned status {0}")]
    Status(u16),
    #[error("scoring response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("scoring response missing required field '{0}'")]
    MissingField(&'static str),
    #[error(transparent)]
    InvalidGrade(#[from] InvalidGrade),
}
