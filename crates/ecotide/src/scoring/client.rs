use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use tracing::{debug, warn};

use super::result::ScoreResult;
use super::wire::{
    FeedbackRequest, HealthResponse, Suggestion, SuggestionsRequest, SuggestionsResponse,
    SustainabilityRequest, SustainabilityResponse,
};
use super::{ScoringApi, ScoringError};
use crate::grade::Grade;

const FALLBACK_MESSAGE: &str = "Unable to assess sustainability. Please try again.";

/// HTTP client for the scoring service rooted at `endpoint`.
#[derive(Debug, Clone)]
pub struct ScoringClient {
    http: Client,
    endpoint: String,
}

impl ScoringClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ScoringError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ScoringError::Client)?;
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Always yields a renderable result; failures collapse into
    /// [`ScoreResult::fallback`].
    pub async fn fetch_score(&self, label: &str, site_id: Option<&str>) -> ScoreResult {
        match self.request_score(label, site_id).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, product = label, "scoring failed, using fallback grade");
                ScoreResult::fallback(format!("{FALLBACK_MESSAGE} ({err})"))
            }
        }
    }

    async fn request_score(
        &self,
        label: &str,
        site_id: Option<&str>,
    ) -> Result<ScoreResult, ScoringError> {
        let body = SustainabilityRequest {
            product_title: label,
            asin: site_id.unwrap_or_default(),
        };

        let response = self
            .http
            .post(self.url("/api/sustainability"))
            .json(&body)
            .send()
            .await
            .map_err(ScoringError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Status(status.as_u16()));
        }

        let payload: SustainabilityResponse =
            response.json().await.map_err(ScoringError::Decode)?;
        let result = payload.into_score()?;
        debug!(product = label, grade = %result.grade, "scored product");
        Ok(result)
    }

    /// `true` when the service answers `/health` with a 2xx and, if it reports
    /// a status, that status is `healthy`.
    pub async fn health_check(&self) -> bool {
        let response = match self.http.get(self.url("/health")).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "health check failed");
                return false;
            }
        };

        if !response.status().is_success() {
            return false;
        }

        match response.json::<HealthResponse>().await {
            Ok(HealthResponse {
                status: Some(status),
            }) => status.eq_ignore_ascii_case("healthy"),
            Ok(HealthResponse { status: None }) => true,
            // A plain-text 2xx still means reachable.
            Err(_) => true,
        }
    }

    /// Fire-and-forget feedback; the return value only reports delivery.
    pub async fn submit_feedback(&self, product_title: &str, grade: Grade, feedback: &str) -> bool {
        let body = FeedbackRequest {
            product_title,
            grade: grade.label(),
            feedback,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        match self
            .http
            .post(self.url("/api/feedback"))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                warn!(error = %err, "feedback submission failed");
                false
            }
        }
    }

    /// Alternatives for `product_title`; empty on any failure.
    pub async fn suggestions(&self, product_title: &str, category: &str) -> Vec<Suggestion> {
        let body = SuggestionsRequest {
            product_title,
            category,
        };

        let response = match self
            .http
            .post(self.url("/api/suggestions"))
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = response.status().as_u16(), "suggestions request rejected");
                return Vec::new();
            }
            Err(err) => {
                warn!(error = %err, "suggestions request failed");
                return Vec::new();
            }
        };

        match response.json::<SuggestionsResponse>().await {
            Ok(payload) => payload.suggestions,
            Err(err) => {
                warn!(error = %err, "suggestions response could not be decoded");
                Vec::new()
            }
        }
    }
}

impl ScoringApi for ScoringClient {
    async fn try_score(
        &self,
        label: &str,
        site_id: Option<&str>,
    ) -> Result<ScoreResult, ScoringError> {
        self.request_score(label, site_id).await
    }
}
