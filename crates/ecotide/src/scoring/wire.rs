//! Request and response payloads exchanged with the scoring endpoint.

use serde::{Deserialize, Serialize};

use super::result::{ScoreResult, NOT_AVAILABLE};
use super::ScoringError;
use crate::grade::Grade;

#[derive(Debug, Clone, Serialize)]
pub struct SustainabilityRequest<'a> {
    pub product_title: &'a str,
    pub asin: &'a str,
}

/// Raw body of a successful `/api/sustainability` call. Only `grade` and
/// `co2_impact` are required; everything else is optional passthrough.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SustainabilityResponse {
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub co2_impact: Option<String>,
    #[serde(default)]
    pub recyclable: Option<bool>,
    #[serde(default)]
    pub renewable_materials: Option<bool>,
    #[serde(default)]
    pub packaging_score: Option<String>,
    #[serde(default)]
    pub supply_chain_score: Option<String>,
    #[serde(default)]
    pub green_message: Option<String>,
}

impl SustainabilityResponse {
    pub fn into_score(self) -> Result<ScoreResult, ScoringError> {
        let raw_grade = self
            .grade
            .filter(|value| !value.trim().is_empty())
            .ok_or(ScoringError::MissingField("grade"))?;
        let co2_impact = self
            .co2_impact
            .filter(|value| !value.trim().is_empty())
            .ok_or(ScoringError::MissingField("co2_impact"))?;
        let grade: Grade = raw_grade.parse()?;

        Ok(ScoreResult {
            grade,
            co2_impact,
            recyclable: self.recyclable.unwrap_or(false),
            renewable_materials: self.renewable_materials.unwrap_or(false),
            packaging_score: self
                .packaging_score
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            supply_chain_score: self
                .supply_chain_score
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            message: self.green_message,
            is_fallback: false,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest<'a> {
    pub product_title: &'a str,
    pub grade: &'a str,
    pub feedback: &'a str,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionsRequest<'a> {
    pub product_title: &'a str,
    pub category: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionsResponse {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

/// A more sustainable alternative proposed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> SustainabilityResponse {
        serde_json::from_value(value).expect("response deserializes")
    }

    #[test]
    fn complete_response_converts() {
        let score = response(json!({
            "grade": "B",
            "co2_impact": "2.5 kg CO2",
            "recyclable": true,
            "renewable_materials": false,
            "packaging_score": "Good",
            "supply_chain_score": null,
            "green_message": "Good choice!",
            "confidence": 0.8
        }))
        .into_score()
        .expect("valid response");

        assert_eq!(score.grade, Grade::B);
        assert!(score.recyclable);
        assert_eq!(score.packaging_score, "Good");
        assert_eq!(score.supply_chain_score, "N/A");
        assert_eq!(score.message.as_deref(), Some("Good choice!"));
        assert!(!score.is_fallback);
    }

    #[test]
    fn missing_co2_impact_is_rejected() {
        let err = response(json!({ "grade": "A" }))
            .into_score()
            .expect_err("co2_impact required");
        assert!(matches!(err, ScoringError::MissingField("co2_impact")));
    }

    #[test]
    fn unknown_grade_letter_is_rejected() {
        let err = response(json!({ "grade": "Z", "co2_impact": "1 kg" }))
            .into_score()
            .expect_err("grade must be A-E");
        assert!(matches!(err, ScoringError::InvalidGrade(_)));
    }
}
