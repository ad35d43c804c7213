use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{ScheduleEvent, WeatherSnapshot},
    services::providers::{ScheduleProvider, WeatherProvider},
};

/// Weather and schedule for one day, with a note for every substituted value
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext {
    pub weather: WeatherSnapshot,
    pub events: Vec<ScheduleEvent>,
    pub degraded: Vec<String>,
}

/// Fetches per-day context from the collaborators without letting them fail a request
///
/// A weather failure or timeout yields `WeatherSnapshot::unknown`, which turns
/// off weather scoring. A schedule failure or timeout yields no events, which
/// makes the day casual.
#[derive(Clone)]
pub struct ContextResolver {
    weather: Option<Arc<dyn WeatherProvider>>,
    schedule: Option<Arc<dyn ScheduleProvider>>,
    weather_timeout: Duration,
    schedule_timeout: Duration,
}

impl ContextResolver {
    pub fn new() -> Self {
        Self {
            weather: None,
            schedule: None,
            weather_timeout: Duration::from_secs(5),
            schedule_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_weather(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.weather = Some(provider);
        self
    }

    pub fn with_schedule(mut self, provider: Arc<dyn ScheduleProvider>) -> Self {
        self.schedule = Some(provider);
        self
    }

    pub fn with_timeouts(mut self, weather: Duration, schedule: Duration) -> Self {
        self.weather_timeout = weather;
        self.schedule_timeout = schedule;
        self
    }

    /// Looks up weather and schedule concurrently
    pub async fn resolve(&self, date: NaiveDate) -> ResolvedContext {
        let (weather, events) = tokio::join!(self.weather_for(date), self.events_for(date));
        let mut degraded = Vec::new();

        let weather = match weather {
            Ok(snapshot) => snapshot,
            Err(reason) => {
                tracing::warn!(date = %date, reason = %reason, "Weather unavailable, skipping weather scoring");
                degraded.push(format!("weather unavailable: {}", reason));
                WeatherSnapshot::unknown(date)
            }
        };

        let events = match events {
            Ok(events) => events,
            Err(reason) => {
                tracing::warn!(date = %date, reason = %reason, "Schedule unavailable, assuming a casual day");
                degraded.push(format!("schedule unavailable: {}", reason));
                Vec::new()
            }
        };

        ResolvedContext {
            weather,
            events,
            degraded,
        }
    }

    async fn weather_for(&self, date: NaiveDate) -> AppResult<WeatherSnapshot> {
        let provider = self
            .weather
            .as_ref()
            .ok_or_else(|| AppError::ExternalApi("no weather provider configured".to_string()))?;

        let mut snapshot =
            bounded(provider.name(), self.weather_timeout, provider.get_weather(date)).await?;
        snapshot.validate()?;
        snapshot.date = date;
        Ok(snapshot)
    }

    async fn events_for(&self, date: NaiveDate) -> AppResult<Vec<ScheduleEvent>> {
        let Some(provider) = self.schedule.as_ref() else {
            return Ok(Vec::new());
        };

        let events =
            bounded(provider.name(), self.schedule_timeout, provider.get_events(date)).await?;
        for event in &events {
            event.validate()?;
        }
        Ok(events)
    }
}

impl Default for ContextResolver {
    fn default() -> Self {
        Self::new()
    }
}

async fn bounded<T>(
    name: &'static str,
    timeout: Duration,
    call: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| AppError::timeout(name, timeout))?
}
