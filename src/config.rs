use serde::Deserialize;
use std::time::Duration;

use crate::models::RecommendationOptions;
use crate::services::{
    candidates::GenerationSettings,
    gap_analysis::GapThresholds,
    recommendations::EngineSettings,
    scoring::{RecencyPenalty, ScoringWeights},
    tables::RuleTables,
};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL; weather responses are not cached when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// OpenWeatherMap API key; weather is treated as unknown when unset
    #[serde(default)]
    pub weather_api_key: Option<String>,

    /// OpenWeatherMap API base URL
    #[serde(default = "default_weather_api_url")]
    pub weather_api_url: String,

    #[serde(default = "default_weather_city")]
    pub weather_city: String,

    #[serde(default = "default_weather_country")]
    pub weather_country: String,

    /// Chat completion API base URL
    #[serde(default = "default_llm_api_url")]
    pub llm_api_url: String,

    /// Chat completion API key; generative mode falls back to deterministic when unset
    #[serde(default)]
    pub llm_api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// JSON file holding the wardrobe snapshot
    #[serde(default = "default_wardrobe_path")]
    pub wardrobe_path: String,

    /// JSON file holding calendar events
    #[serde(default = "default_schedule_path")]
    pub schedule_path: String,

    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_per_slot_limit")]
    pub per_slot_limit: usize,

    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Retries after a failed generation call, clamped to 1
    #[serde(default)]
    pub generation_retries: u32,

    #[serde(default = "default_collaborator_timeout_secs")]
    pub weather_timeout_secs: u64,

    #[serde(default = "default_collaborator_timeout_secs")]
    pub schedule_timeout_secs: u64,

    #[serde(default = "default_weight_color")]
    pub weight_color: f64,

    #[serde(default = "default_weight_seasonal")]
    pub weight_seasonal: f64,

    #[serde(default = "default_weight_formality")]
    pub weight_formality: f64,

    #[serde(default = "default_weight_weather")]
    pub weight_weather: f64,

    #[serde(default = "default_confidence_weight")]
    pub confidence_weight: f64,

    #[serde(default = "default_recency_per_day")]
    pub recency_per_day: f64,

    #[serde(default = "default_recency_window_days")]
    pub recency_window_days: i64,

    #[serde(default = "default_recency_cap")]
    pub recency_cap: f64,

    #[serde(default = "default_min_count")]
    pub style_min_count: u32,

    #[serde(default = "default_min_count")]
    pub season_min_count: u32,
}

fn default_weather_api_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_city() -> String {
    "Tokyo".to_string()
}

fn default_weather_country() -> String {
    "JP".to_string()
}

fn default_llm_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_wardrobe_path() -> String {
    "wardrobe.json".to_string()
}

fn default_schedule_path() -> String {
    "schedule.json".to_string()
}

fn default_lookback_days() -> u32 {
    2
}

fn default_candidate_cap() -> usize {
    10
}

fn default_top_k() -> usize {
    3
}

fn default_per_slot_limit() -> usize {
    5
}

fn default_generation_timeout_secs() -> u64 {
    10
}

fn default_collaborator_timeout_secs() -> u64 {
    5
}

fn default_weight_color() -> f64 {
    0.25
}

fn default_weight_seasonal() -> f64 {
    0.25
}

fn default_weight_formality() -> f64 {
    0.3
}

fn default_weight_weather() -> f64 {
    0.2
}

fn default_confidence_weight() -> f64 {
    0.1
}

fn default_recency_per_day() -> f64 {
    0.05
}

fn default_recency_window_days() -> i64 {
    3
}

fn default_recency_cap() -> f64 {
    0.3
}

fn default_min_count() -> u32 {
    5
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let weights = [
            ("WEIGHT_COLOR", self.weight_color),
            ("WEIGHT_SEASONAL", self.weight_seasonal),
            ("WEIGHT_FORMALITY", self.weight_formality),
            ("WEIGHT_WEATHER", self.weight_weather),
            ("RECENCY_PER_DAY", self.recency_per_day),
            ("RECENCY_CAP", self.recency_cap),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{} must be a non-negative number, got {}", name, value);
            }
        }
        if !(0.0..=1.0).contains(&self.confidence_weight) {
            anyhow::bail!(
                "CONFIDENCE_WEIGHT must be between 0 and 1, got {}",
                self.confidence_weight
            );
        }
        if self.top_k == 0 || self.candidate_cap == 0 {
            anyhow::bail!("TOP_K and CANDIDATE_CAP must be at least 1");
        }
        Ok(())
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs)
    }

    pub fn schedule_timeout(&self) -> Duration {
        Duration::from_secs(self.schedule_timeout_secs)
    }

    /// Per-request defaults for the CLI
    pub fn recommendation_options(&self) -> RecommendationOptions {
        RecommendationOptions {
            top_k: self.top_k,
            lookback_days: self.lookback_days,
            candidate_cap: self.candidate_cap,
            ..RecommendationOptions::default()
        }
    }

    /// Typed engine tunables built from the flat environment values
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            weights: ScoringWeights {
                color: self.weight_color,
                seasonal: self.weight_seasonal,
                formality: self.weight_formality,
                weather: self.weight_weather,
            },
            recency: RecencyPenalty {
                per_day: self.recency_per_day,
                window_days: self.recency_window_days,
                cap: self.recency_cap,
            },
            confidence_weight: self.confidence_weight,
            generation: GenerationSettings {
                timeout: Duration::from_secs(self.generation_timeout_secs),
                retries: self.generation_retries.min(1),
            },
            per_slot_limit: self.per_slot_limit,
            tables: RuleTables::default(),
            gaps: GapThresholds {
                style_min_count: self.style_min_count,
                season_min_count: self.season_min_count,
                ..GapThresholds::default()
            },
        }
    }
}
