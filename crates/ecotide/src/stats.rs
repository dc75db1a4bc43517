//! Dashboard statistics derived from the viewing history.
//!
//! Nothing here is persisted: every read recomputes counts, the average grade,
//! the CO2 estimate, and the unlocked badges from the current history.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::grade::Grade;
use crate::store::HistoryEvent;

/// Heuristic kilograms of CO2 saved per A/B choice.
pub const CO2_SAVED_PER_GOOD_CHOICE_KG: f64 = 2.5;

const ECO_EXPLORER_PRODUCTS: usize = 5;
const GREEN_SHOPPER_PRODUCTS: usize = 20;
const CHAMPION_GOOD_CHOICES: usize = 10;
const CARBON_SAVER_KG: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Badge {
    #[serde(rename = "Eco Explorer")]
    EcoExplorer,
    #[serde(rename = "Green Shopper")]
    GreenShopper,
    #[serde(rename = "Sustainability Champion")]
    SustainabilityChampion,
    #[serde(rename = "Carbon Saver")]
    CarbonSaver,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::EcoExplorer => "Eco Explorer",
            Badge::GreenShopper => "Green Shopper",
            Badge::SustainabilityChampion => "Sustainability Champion",
            Badge::CarbonSaver => "Carbon Saver",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub total_products: usize,
    /// `None` renders as "N/A" when there is no history.
    pub average_grade: Option<Grade>,
    pub good_choices: usize,
    pub co2_saved_kg: f64,
    pub badges: BTreeSet<Badge>,
    pub grade_distribution: BTreeMap<Grade, usize>,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_products: 0,
            average_grade: None,
            good_choices: 0,
            co2_saved_kg: 0.0,
            badges: BTreeSet::new(),
            grade_distribution: Grade::ordered().into_iter().map(|g| (g, 0)).collect(),
        }
    }
}

impl Stats {
    pub fn average_grade_label(&self) -> &'static str {
        self.average_grade.map(Grade::label).unwrap_or("N/A")
    }

    pub fn view(&self) -> StatsView {
        StatsView {
            total_products: self.total_products,
            average_grade: self.average_grade_label(),
            co2_saved_kg: self.co2_saved_kg,
            good_choices: self.good_choices,
            badges: self.badges.iter().map(|badge| badge.label()).collect(),
            grade_distribution: self
                .grade_distribution
                .iter()
                .map(|(grade, count)| GradeCount {
                    grade: grade.label(),
                    count: *count,
                })
                .collect(),
        }
    }
}

/// Serialized dashboard form of [`Stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub total_products: usize,
    pub average_grade: &'static str,
    pub co2_saved_kg: f64,
    pub good_choices: usize,
    pub badges: Vec<&'static str>,
    pub grade_distribution: Vec<GradeCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeCount {
    pub grade: &'static str,
    pub count: usize,
}

pub fn compute_stats(history: &[HistoryEvent]) -> Stats {
    let total_products = history.len();
    if total_products == 0 {
        return Stats::default();
    }

    let mut grade_distribution: BTreeMap<Grade, usize> =
        Grade::ordered().into_iter().map(|g| (g, 0)).collect();
    for event in history {
        *grade_distribution.entry(event.grade).or_insert(0) += 1;
    }

    let score_sum: u64 = history
        .iter()
        .map(|event| u64::from(event.grade.score()))
        .sum();
    let mean = score_sum as f64 / total_products as f64;
    // Half-up rounding; an unmatched value falls back to C.
    let rounded = (mean + 0.5).floor() as i64;
    let average_grade = Grade::from_score(rounded).unwrap_or(Grade::C);

    let good_choices = history
        .iter()
        .filter(|event| event.grade.is_good_choice())
        .count();
    let co2_saved_kg = round_one_decimal(good_choices as f64 * CO2_SAVED_PER_GOOD_CHOICE_KG);

    let mut badges = BTreeSet::new();
    if total_products >= ECO_EXPLORER_PRODUCTS {
        badges.insert(Badge::EcoExplorer);
    }
    if total_products >= GREEN_SHOPPER_PRODUCTS {
        badges.insert(Badge::GreenShopper);
    }
    if good_choices >= CHAMPION_GOOD_CHOICES {
        badges.insert(Badge::SustainabilityChampion);
    }
    if co2_saved_kg >= CARBON_SAVER_KG {
        badges.insert(Badge::CarbonSaver);
    }

    Stats {
        total_products,
        average_grade: Some(average_grade),
        good_choices,
        co2_saved_kg,
        badges,
        grade_distribution,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
