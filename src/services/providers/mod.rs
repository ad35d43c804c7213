//! External collaborators the engine consumes
//!
//! Each data source sits behind a trait so the engine can run against the
//! reference implementations in this module or against mocks in tests.
//! Implementations may be slow or fail; callers wrap every call in a timeout
//! and degrade instead of propagating the failure.

use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{ClothingItem, ScheduleEvent, WeatherSnapshot},
};

pub mod chat;
pub mod openweather;
pub mod schedule;
pub mod wardrobe;

pub use chat::ChatCompletionProvider;
pub use openweather::OpenWeatherProvider;
pub use schedule::StaticScheduleProvider;
pub use wardrobe::JsonFileWardrobe;

/// Source of the weather for a given day
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    async fn get_weather(&self, date: NaiveDate) -> AppResult<WeatherSnapshot>;
}

/// Source of the user's calendar
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ScheduleProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Events starting on `date`; an empty list means nothing is planned
    async fn get_events(&self, date: NaiveDate) -> AppResult<Vec<ScheduleEvent>>;
}

/// Text generation model used to propose outfits
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GenerativeProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends the prompt and returns the raw response text
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

/// Read-only snapshot of the user's wardrobe
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WardrobeRepository: Send + Sync {
    fn name(&self) -> &'static str;

    /// Full item list; no pagination
    async fn load_items(&self) -> AppResult<Vec<ClothingItem>>;
}
