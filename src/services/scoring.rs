use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{ClothingItem, OutfitCandidate, Rule, ScoredOutfit};
use crate::services::rules::{self, RuleContext};

/// Scores closer than this are treated as tied
const SCORE_EPSILON: f64 = 1e-9;

/// Relative weight of each rule in the total score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub color: f64,
    pub seasonal: f64,
    pub formality: f64,
    pub weather: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            color: 0.25,
            seasonal: 0.25,
            formality: 0.3,
            weather: 0.2,
        }
    }
}

impl ScoringWeights {
    pub fn weight(&self, rule: Rule) -> f64 {
        match rule {
            Rule::ColorHarmony => self.color,
            Rule::SeasonalFit => self.seasonal,
            Rule::FormalityMatch => self.formality,
            Rule::WeatherSuitability => self.weather,
        }
    }

    /// Weighted mean of the rule scores present in the breakdown
    ///
    /// Rules missing from the breakdown (weather when unknown) drop out and the
    /// remaining weights are renormalized.
    pub fn combine(&self, breakdown: &BTreeMap<Rule, f64>) -> f64 {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (rule, score) in breakdown {
            let weight = self.weight(*rule);
            weighted += weight * score;
            total_weight += weight;
        }

        if total_weight <= 0.0 {
            return 0.0;
        }
        weighted / total_weight
    }
}

/// Deduction for items worn recently
///
/// Each item costs `per_day * max(0, window_days - days_since_worn)`; the sum
/// across an outfit is capped at `cap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyPenalty {
    pub per_day: f64,
    pub window_days: i64,
    pub cap: f64,
}

impl Default for RecencyPenalty {
    fn default() -> Self {
        Self {
            per_day: 0.05,
            window_days: 3,
            cap: 0.3,
        }
    }
}

impl RecencyPenalty {
    pub fn for_item(&self, item: &ClothingItem, on: NaiveDate) -> f64 {
        match item.days_since_worn(on) {
            Some(days) => self.per_day * (self.window_days - days).max(0) as f64,
            None => 0.0,
        }
    }

    pub fn for_candidate(&self, candidate: &OutfitCandidate, on: NaiveDate) -> f64 {
        let total: f64 = candidate.items().map(|item| self.for_item(item, on)).sum();
        total.min(self.cap)
    }
}

/// Turns candidates into ranked, scored outfits
pub struct OutfitScorer<'a> {
    ctx: RuleContext<'a>,
    weights: &'a ScoringWeights,
    recency: &'a RecencyPenalty,
    /// Share of the total given to model confidence when the candidate carries one
    confidence_weight: f64,
}

impl<'a> OutfitScorer<'a> {
    pub fn new(
        ctx: RuleContext<'a>,
        weights: &'a ScoringWeights,
        recency: &'a RecencyPenalty,
        confidence_weight: f64,
    ) -> Self {
        Self {
            ctx,
            weights,
            recency,
            confidence_weight: confidence_weight.clamp(0.0, 1.0),
        }
    }

    pub fn score(&self, candidate: OutfitCandidate) -> ScoredOutfit {
        let breakdown = rules::evaluate(&candidate, &self.ctx);
        let rule_score = self.weights.combine(&breakdown);

        let blended = match candidate.confidence {
            Some(confidence) => {
                (1.0 - self.confidence_weight) * rule_score
                    + self.confidence_weight * confidence.clamp(0.0, 1.0)
            }
            None => rule_score,
        };

        let repetition_penalty = self.recency.for_candidate(&candidate, self.ctx.date);
        let total = (blended - repetition_penalty).clamp(0.0, 1.0);

        ScoredOutfit {
            candidate,
            total,
            breakdown,
            repetition_penalty,
        }
    }

    /// Scores every candidate and returns the best `top_k`, highest first
    pub fn rank(&self, candidates: Vec<OutfitCandidate>, top_k: usize) -> Vec<ScoredOutfit> {
        let mut scored: Vec<ScoredOutfit> = candidates
            .into_iter()
            .map(|candidate| self.score(candidate))
            .collect();

        // Stable sort keeps insertion order as the last tie-breaker
        scored.sort_by(compare_ranked);
        scored.truncate(top_k);
        scored
    }
}

/// Ordering for ranked output: higher total, then higher minimum rule score,
/// then fewer total wears
pub fn compare_ranked(a: &ScoredOutfit, b: &ScoredOutfit) -> Ordering {
    descending(a.total, b.total)
        .then_with(|| descending(a.min_sub_score(), b.min_sub_score()))
        .then_with(|| a.candidate.total_wears().cmp(&b.candidate.total_wears()))
}

fn descending(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < SCORE_EPSILON {
        Ordering::Equal
    } else {
        b.total_cmp(&a)
    }
}
