use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Category, Season};

/// Result of checking one essential-items checklist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EssentialCheck {
    pub label: String,
    pub category: Category,
    pub season: Season,
    pub owned: usize,
    pub satisfied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deficiency: Option<String>,
}

/// Owned tagged items relative to the expected minimum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub count: usize,
    pub expected: u32,
    /// `count / expected`, clamped to [0, 1]
    pub ratio: f64,
}

impl Coverage {
    pub fn new(count: usize, expected: u32) -> Self {
        let ratio = if expected == 0 {
            1.0
        } else {
            (count as f64 / f64::from(expected)).min(1.0)
        };
        Self {
            count,
            expected,
            ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Something worth adding to the wardrobe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapSuggestion {
    pub item: String,
    pub reason: String,
    pub priority: Priority,
    pub suggested: Vec<String>,
}

/// Read-only analysis of what the wardrobe lacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    pub total_items: usize,
    pub essentials: Vec<EssentialCheck>,
    pub style_coverage: BTreeMap<String, Coverage>,
    pub season_coverage: BTreeMap<Season, Coverage>,
    /// Formality-compatible (top, bottom) pairings over all possible pairings
    pub combination_score: f64,
    pub compatible_pairings: usize,
    pub possible_pairings: usize,
    /// Number of distinct outfits the wardrobe can form, outerwear optional
    pub outfit_combinations: usize,
    pub category_distribution: BTreeMap<Category, usize>,
    pub color_distribution: BTreeMap<String, usize>,
    /// Overall fullness from 0 to 100
    pub wardrobe_score: f64,
    pub suggestions: Vec<GapSuggestion>,
}

impl GapReport {
    /// Checklist entries that are not yet covered
    pub fn missing_essentials(&self) -> impl Iterator<Item = &EssentialCheck> {
        self.essentials.iter().filter(|check| !check.satisfied)
    }
}
