use chrono::NaiveDate;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{GapReport, RecommendationOptions, RecommendationOutcome},
    services::{
        context::ContextResolver, providers::WardrobeRepository, recommendations::OutfitEngine,
    },
};

/// Wires the wardrobe repository and context collaborators to the engine
#[derive(Clone)]
pub struct DailyPlanner {
    wardrobe: Arc<dyn WardrobeRepository>,
    context: ContextResolver,
    engine: OutfitEngine,
}

impl DailyPlanner {
    pub fn new(
        wardrobe: Arc<dyn WardrobeRepository>,
        context: ContextResolver,
        engine: OutfitEngine,
    ) -> Self {
        Self {
            wardrobe,
            context,
            engine,
        }
    }

    /// Loads the wardrobe and the day's context, then ranks outfits for `date`
    ///
    /// Context that could not be fetched is replaced by defaults and listed in
    /// the recommendation's `degraded_context`.
    pub async fn plan(
        &self,
        date: NaiveDate,
        options: RecommendationOptions,
    ) -> AppResult<RecommendationOutcome> {
        let items = self.wardrobe.load_items().await?;
        let resolved = self.context.resolve(date).await;

        let options = options.on(date);
        let mut outcome = self
            .engine
            .recommend_outfits(&items, &resolved.weather, &resolved.events, &options)
            .await?;

        if let RecommendationOutcome::Ranked(recommendation) = &mut outcome {
            recommendation.degraded_context = resolved.degraded;
        }

        Ok(outcome)
    }

    pub async fn gaps(&self) -> AppResult<GapReport> {
        let items = self.wardrobe.load_items().await?;
        self.engine.analyze_gaps(&items)
    }
}
