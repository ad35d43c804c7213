mod clothing;
mod context;
mod gap;
mod outfit;

pub use clothing::{normalize_style, Category, ClothingItem, Formality, Season};
pub use context::{Occasion, ScheduleEvent, WeatherAdvice, WeatherCondition, WeatherSnapshot};
pub use gap::{Coverage, EssentialCheck, GapReport, GapSuggestion, Priority};
pub use outfit::{
    GenerationMode, OutfitCandidate, OutfitPiece, Recommendation, RecommendationOptions,
    RecommendationOutcome, Rule, ScoredOutfit, SkippedSlot,
};

use std::collections::HashSet;

use crate::error::{AppError, AppResult};

/// Checks a wardrobe snapshot before it reaches the engine
///
/// Rejects an empty wardrobe, duplicate item IDs, and embeddings whose
/// dimension differs from the rest of the wardrobe.
pub fn validate_wardrobe(items: &[ClothingItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::invalid_input("wardrobe is empty"));
    }

    let mut ids = HashSet::new();
    let mut dimension: Option<usize> = None;

    for item in items {
        if !ids.insert(item.id) {
            return Err(AppError::invalid_input(format!(
                "duplicate item id {}",
                item.id
            )));
        }

        if item.embedding.is_empty() {
            continue;
        }

        match dimension {
            None => dimension = Some(item.embedding.len()),
            Some(expected) if expected != item.embedding.len() => {
                return Err(AppError::invalid_input(format!(
                    "item {} has a {}-dimensional embedding, expected {}",
                    item.id,
                    item.embedding.len(),
                    expected
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}
