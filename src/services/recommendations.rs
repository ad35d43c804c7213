use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::{
    error::{AppError, AppResult},
    models::{
        validate_wardrobe, ClothingItem, GapReport, Occasion, Recommendation,
        RecommendationOptions, RecommendationOutcome, ScheduleEvent, WeatherSnapshot,
    },
    services::{
        candidates::{self, GenerationSettings, SlotPools},
        gap_analysis::{self, GapThresholds},
        prompt::PromptContext,
        providers::GenerativeProvider,
        rules::{self, RuleContext},
        scoring::{OutfitScorer, RecencyPenalty, ScoringWeights},
        tables::RuleTables,
    },
    telemetry::RequestId,
};

/// Tunables shared by every request
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub weights: ScoringWeights,
    pub recency: RecencyPenalty,
    /// Share of the total taken by model confidence for generated candidates
    pub confidence_weight: f64,
    pub generation: GenerationSettings,
    /// Items kept per slot before enumeration
    pub per_slot_limit: usize,
    pub tables: RuleTables,
    pub gaps: GapThresholds,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            recency: RecencyPenalty::default(),
            confidence_weight: 0.1,
            generation: GenerationSettings::default(),
            per_slot_limit: 5,
            tables: RuleTables::default(),
            gaps: GapThresholds::default(),
        }
    }
}

/// Recommends outfits and analyzes wardrobe gaps
///
/// Holds no per-request state, so one engine can serve concurrent requests.
#[derive(Clone)]
pub struct OutfitEngine {
    settings: Arc<EngineSettings>,
    generator: Option<Arc<dyn GenerativeProvider>>,
}

impl OutfitEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            generator: None,
        }
    }

    /// Enables generative candidates; without a generator every request is deterministic
    pub fn with_generator(mut self, generator: Arc<dyn GenerativeProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Ranks outfits for one day
    ///
    /// Returns `NoFeasibleOutfit` when no top, bottom or one-piece survives the
    /// lookback filter. A required slot that is empty while others are not is
    /// reported in `skipped_slots` instead.
    pub async fn recommend_outfits(
        &self,
        wardrobe: &[ClothingItem],
        weather: &WeatherSnapshot,
        schedule: &[ScheduleEvent],
        options: &RecommendationOptions,
    ) -> AppResult<RecommendationOutcome> {
        validate_wardrobe(wardrobe)?;
        weather.validate()?;
        for event in schedule {
            event.validate()?;
        }
        if options.top_k == 0 {
            return Err(AppError::invalid_input("top_k must be at least 1"));
        }
        if options.candidate_cap == 0 {
            return Err(AppError::invalid_input("candidate_cap must be at least 1"));
        }

        let date = options.date.unwrap_or(weather.date);
        let request_id = RequestId::new();

        self.rank(request_id, date, wardrobe, weather, schedule, options)
            .instrument(request_id.span(date))
            .await
    }

    async fn rank(
        &self,
        request_id: RequestId,
        date: NaiveDate,
        wardrobe: &[ClothingItem],
        weather: &WeatherSnapshot,
        schedule: &[ScheduleEvent],
        options: &RecommendationOptions,
    ) -> AppResult<RecommendationOutcome> {
        let started = Instant::now();
        let settings = &*self.settings;
        let tables = &settings.tables;

        let events: Vec<ScheduleEvent> = schedule
            .iter()
            .filter(|event| event.date() == date)
            .cloned()
            .collect();
        let occasion = binding_occasion(&events, tables);
        let required_formality = tables.required_formality(occasion);

        let pools = SlotPools::build(
            wardrobe,
            date,
            options.lookback_days,
            required_formality,
            settings.per_slot_limit,
        );

        for skipped in pools.skipped() {
            tracing::info!(slot = %skipped.slot, reason = %skipped.reason, "Skipping slot");
        }

        if !pools.is_feasible() {
            tracing::info!("No feasible outfit");
            return Ok(RecommendationOutcome::NoFeasibleOutfit {
                skipped_slots: pools.skipped().to_vec(),
            });
        }

        let prompt_ctx = PromptContext {
            date,
            season: tables.season_for(date),
            weather,
            events: &events,
            occasion,
            required_formality,
            max_outfits: options.top_k,
        };

        let generated = candidates::generate_candidates(
            &pools,
            &prompt_ctx,
            options.mode,
            self.generator.as_deref(),
            &settings.generation,
            options.candidate_cap,
        )
        .await;

        let rule_ctx = RuleContext {
            tables,
            weather,
            occasion,
            date,
        };
        let scorer = OutfitScorer::new(
            rule_ctx,
            &settings.weights,
            &settings.recency,
            settings.confidence_weight,
        );
        let outfits = scorer.rank(generated.candidates, options.top_k);

        // Feasible pools always enumerate at least one candidate
        let Some(best) = outfits.first().map(|outfit| outfit.total) else {
            tracing::error!(produced_by = ?generated.produced_by, "Feasible wardrobe produced no candidates");
            return Err(AppError::Internal(
                "feasible wardrobe produced no candidates".to_string(),
            ));
        };

        tracing::info!(
            occasion = %occasion,
            produced_by = ?generated.produced_by,
            outfits = outfits.len(),
            best,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ranked outfits"
        );

        Ok(RecommendationOutcome::Ranked(Recommendation {
            request_id: request_id.0,
            date,
            occasion,
            required_formality,
            produced_by: generated.produced_by,
            fallback_reason: generated.fallback_reason,
            outfits,
            skipped_slots: pools.skipped().to_vec(),
            advice: rules::weather_advice(weather),
            degraded_context: Vec::new(),
        }))
    }

    /// Reports what the wardrobe lacks; read-only
    pub fn analyze_gaps(&self, wardrobe: &[ClothingItem]) -> AppResult<GapReport> {
        validate_wardrobe(wardrobe)?;
        Ok(gap_analysis::analyze(
            wardrobe,
            &self.settings.tables,
            &self.settings.gaps,
        ))
    }
}

/// The most formal occasion on the day; casual when nothing is planned
pub fn binding_occasion(events: &[ScheduleEvent], tables: &RuleTables) -> Occasion {
    events
        .iter()
        .map(|event| event.occasion)
        .max_by_key(|occasion| (tables.required_formality(*occasion), *occasion))
        .unwrap_or(Occasion::Casual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Formality, GenerationMode, Season, WeatherCondition};
    use chrono::NaiveDateTime;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 15).unwrap()
    }

    fn event(occasion: Occasion, at: &str) -> ScheduleEvent {
        let start = NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M").unwrap();
        ScheduleEvent {
            title: format!("{} event", occasion),
            start,
            end: start + chrono::Duration::hours(1),
            occasion,
        }
    }

    fn item(category: Category, level: u8) -> ClothingItem {
        ClothingItem::new(category, Formality::new(level).unwrap()).in_all_seasons()
    }

    fn weather() -> WeatherSnapshot {
        WeatherSnapshot::new(date(), 18.0, WeatherCondition::Clear)
    }

    #[test]
    fn test_binding_occasion_is_most_formal() {
        let tables = RuleTables::default();
        let events = vec![
            event(Occasion::Sport, "2024-10-15 07:00"),
            event(Occasion::Business, "2024-10-15 10:00"),
            event(Occasion::SmartCasual, "2024-10-15 19:00"),
        ];
        assert_eq!(binding_occasion(&events, &tables), Occasion::Business);
        assert_eq!(binding_occasion(&[], &tables), Occasion::Casual);
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected() {
        let engine = OutfitEngine::new(EngineSettings::default());
        let options = RecommendationOptions::deterministic();

        let empty = engine.recommend_outfits(&[], &weather(), &[], &options).await;
        assert!(matches!(empty, Err(AppError::InvalidInput(_))));

        let wardrobe = vec![item(Category::Top, 2)];
        let mut bad_weather = weather();
        bad_weather.humidity_pct = 140;
        let result = engine
            .recommend_outfits(&wardrobe, &bad_weather, &[], &options)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let mut inverted = event(Occasion::Business, "2024-10-15 10:00");
        inverted.end = inverted.start - chrono::Duration::hours(2);
        let result = engine
            .recommend_outfits(&wardrobe, &weather(), &[inverted], &options)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let zero_k = RecommendationOptions {
            top_k: 0,
            ..RecommendationOptions::deterministic()
        };
        let result = engine
            .recommend_outfits(&wardrobe, &weather(), &[], &zero_k)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_events_on_other_days_ignored() {
        let engine = OutfitEngine::new(EngineSettings::default());
        let wardrobe = vec![item(Category::Top, 1), item(Category::Bottom, 1)];
        let schedule = vec![event(Occasion::Formal, "2024-10-16 19:00")];

        let outcome = engine
            .recommend_outfits(
                &wardrobe,
                &weather(),
                &schedule,
                &RecommendationOptions::deterministic(),
            )
            .await
            .unwrap();

        match outcome {
            RecommendationOutcome::Ranked(recommendation) => {
                assert_eq!(recommendation.occasion, Occasion::Casual);
                assert_eq!(recommendation.required_formality, Formality::MIN);
            }
            other => panic!("expected a ranking, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_bottom_recorded_as_skipped() {
        let engine = OutfitEngine::new(EngineSettings::default());
        let wardrobe = vec![item(Category::Top, 2), item(Category::Shoes, 2)];

        let outcome = engine
            .recommend_outfits(
                &wardrobe,
                &weather(),
                &[],
                &RecommendationOptions::deterministic(),
            )
            .await
            .unwrap();

        match outcome {
            RecommendationOutcome::Ranked(recommendation) => {
                assert_eq!(recommendation.skipped_slots.len(), 1);
                assert_eq!(recommendation.skipped_slots[0].slot, Category::Bottom);
                assert!(!recommendation.outfits.is_empty());
                assert_eq!(recommendation.produced_by, GenerationMode::Deterministic);
            }
            other => panic!("expected a ranking, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_feasible_wardrobe_always_ranked() {
        let engine = OutfitEngine::new(EngineSettings::default());
        let options = RecommendationOptions::deterministic();

        for wardrobe in [
            vec![item(Category::Top, 5)],
            vec![item(Category::OnePiece, 1)],
            vec![item(Category::Bottom, 3), item(Category::Accessory, 1)],
        ] {
            let outcome = engine
                .recommend_outfits(&wardrobe, &weather(), &[], &options)
                .await
                .unwrap();
            assert!(outcome.is_feasible());
            assert!(!outcome.outfits().is_empty());
        }
    }

    #[tokio::test]
    async fn test_no_feasible_outfit() {
        let engine = OutfitEngine::new(EngineSettings::default());
        let wardrobe = vec![item(Category::Shoes, 2), item(Category::Outerwear, 2)];

        let outcome = engine
            .recommend_outfits(
                &wardrobe,
                &weather(),
                &[],
                &RecommendationOptions::deterministic(),
            )
            .await
            .unwrap();

        assert!(!outcome.is_feasible());
        assert!(outcome.outfits().is_empty());
        match outcome {
            RecommendationOutcome::NoFeasibleOutfit { skipped_slots } => {
                assert_eq!(skipped_slots.len(), 2);
            }
            other => panic!("expected no feasible outfit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generative_without_provider_records_fallback() {
        let engine = OutfitEngine::new(EngineSettings::default());
        let wardrobe = vec![item(Category::Top, 2), item(Category::Bottom, 2)];

        let outcome = engine
            .recommend_outfits(&wardrobe, &weather(), &[], &RecommendationOptions::default())
            .await
            .unwrap();

        match outcome {
            RecommendationOutcome::Ranked(recommendation) => {
                assert_eq!(recommendation.produced_by, GenerationMode::Deterministic);
                assert!(recommendation.fallback_reason.is_some());
            }
            other => panic!("expected a ranking, got {:?}", other),
        }
    }

    #[test]
    fn test_analyze_gaps_rejects_duplicates() {
        let engine = OutfitEngine::new(EngineSettings::default());
        let top = item(Category::Top, 2).with_seasons(&[Season::Summer]);
        assert!(engine.analyze_gaps(&[top.clone(), top]).is_err());
    }
}
