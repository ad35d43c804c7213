use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::{Category, ClothingItem, Formality, Occasion, WeatherAdvice};
use crate::error::{AppError, AppResult};

/// One garment placed into an outfit slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitPiece {
    pub slot: Category,
    pub item: ClothingItem,
}

/// A proposed combination of items, at most one per slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitCandidate {
    pub pieces: Vec<OutfitPiece>,
    /// Explanation supplied by the generative model, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Model confidence in [0, 1], generative mode only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl OutfitCandidate {
    /// Builds a candidate, rejecting two items in the same slot or a one-piece
    /// combined with a top or bottom
    pub fn new(items: Vec<ClothingItem>) -> AppResult<Self> {
        let mut seen = BTreeSet::new();
        for item in &items {
            if !seen.insert(item.category) {
                return Err(AppError::invalid_input(format!(
                    "outfit has more than one {} item",
                    item.category
                )));
            }
        }

        if seen.contains(&Category::OnePiece)
            && (seen.contains(&Category::Top) || seen.contains(&Category::Bottom))
        {
            return Err(AppError::invalid_input(
                "a one-piece cannot be combined with a top or bottom",
            ));
        }

        let mut pieces: Vec<OutfitPiece> = items
            .into_iter()
            .map(|item| OutfitPiece {
                slot: item.category,
                item,
            })
            .collect();
        pieces.sort_by_key(|piece| piece.slot);

        Ok(Self {
            pieces,
            rationale: None,
            confidence: None,
        })
    }

    pub fn items(&self) -> impl Iterator<Item = &ClothingItem> {
        self.pieces.iter().map(|piece| &piece.item)
    }

    pub fn item_in(&self, slot: Category) -> Option<&ClothingItem> {
        self.pieces
            .iter()
            .find(|piece| piece.slot == slot)
            .map(|piece| &piece.item)
    }

    pub fn has_slot(&self, slot: Category) -> bool {
        self.item_in(slot).is_some()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Highest formality among the pieces
    pub fn max_formality(&self) -> Option<Formality> {
        self.items().map(|item| item.formality).max()
    }

    /// Sum of wear counts, used to favor rotation
    pub fn total_wears(&self) -> u64 {
        self.items().map(|item| u64::from(item.wear_count)).sum()
    }

    /// Unique signature for the candidate based on item IDs (for deduplication)
    pub fn signature(&self) -> String {
        let mut ids: Vec<String> = self.items().map(|item| item.id.to_string()).collect();
        ids.sort();
        ids.join(",")
    }

    pub fn item_ids(&self) -> Vec<Uuid> {
        self.items().map(|item| item.id).collect()
    }
}

/// Named scoring rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    ColorHarmony,
    SeasonalFit,
    FormalityMatch,
    WeatherSuitability,
}

/// A candidate with its final score and per-rule breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredOutfit {
    pub candidate: OutfitCandidate,
    pub total: f64,
    pub breakdown: BTreeMap<Rule, f64>,
    pub repetition_penalty: f64,
}

impl ScoredOutfit {
    /// Lowest rule score, used as the first tie-breaker
    pub fn min_sub_score(&self) -> f64 {
        self.breakdown
            .values()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }
}

/// A required slot that could not be filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSlot {
    pub slot: Category,
    pub reason: String,
}

/// Where candidates come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Ask the generative model first, falling back to deterministic on failure
    #[default]
    Generative,
    /// Combinatorial enumeration only
    Deterministic,
}

/// Per-request knobs for `recommend_outfits`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationOptions {
    /// Day being dressed for; defaults to the weather snapshot's date
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub mode: GenerationMode,
    pub top_k: usize,
    /// Items worn within this many days are not offered
    pub lookback_days: u32,
    pub candidate_cap: usize,
}

impl Default for RecommendationOptions {
    fn default() -> Self {
        Self {
            date: None,
            mode: GenerationMode::Generative,
            top_k: 3,
            lookback_days: 2,
            candidate_cap: 10,
        }
    }
}

impl RecommendationOptions {
    pub fn deterministic() -> Self {
        Self {
            mode: GenerationMode::Deterministic,
            ..Self::default()
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Ranked outfits for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub request_id: Uuid,
    pub date: NaiveDate,
    pub occasion: Occasion,
    pub required_formality: Formality,
    /// Mode that actually produced the candidates
    pub produced_by: GenerationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub outfits: Vec<ScoredOutfit>,
    pub skipped_slots: Vec<SkippedSlot>,
    pub advice: WeatherAdvice,
    /// Context that had to be substituted because a provider failed
    pub degraded_context: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Ranked(Recommendation),
    /// Every required slot is empty after filtering
    NoFeasibleOutfit { skipped_slots: Vec<SkippedSlot> },
}

impl RecommendationOutcome {
    pub fn outfits(&self) -> &[ScoredOutfit] {
        match self {
            RecommendationOutcome::Ranked(recommendation) => &recommendation.outfits,
            RecommendationOutcome::NoFeasibleOutfit { .. } => &[],
        }
    }

    pub fn is_feasible(&self) -> bool {
        matches!(self, RecommendationOutcome::Ranked(_))
    }
}
