use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Fog,
    /// Weather could not be determined; weather-based scoring is skipped
    Unknown,
}

impl WeatherCondition {
    /// Precipitation that calls for a covering layer
    pub fn is_wet(&self) -> bool {
        matches!(self, WeatherCondition::Rain | WeatherCondition::Snow)
    }
}

impl Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Fog => "fog",
            WeatherCondition::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// Weather for a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub date: NaiveDate,
    pub temperature_c: f64,
    pub condition: WeatherCondition,
    pub humidity_pct: u8,
}

impl WeatherSnapshot {
    pub fn new(date: NaiveDate, temperature_c: f64, condition: WeatherCondition) -> Self {
        Self {
            date,
            temperature_c,
            condition,
            humidity_pct: 60,
        }
    }

    /// Placeholder used when the weather provider fails or times out
    pub fn unknown(date: NaiveDate) -> Self {
        Self {
            date,
            temperature_c: 20.0,
            condition: WeatherCondition::Unknown,
            humidity_pct: 60,
        }
    }

    pub fn is_known(&self) -> bool {
        self.condition != WeatherCondition::Unknown
    }

    pub fn validate(&self) -> AppResult<()> {
        if !self.temperature_c.is_finite() {
            return Err(AppError::invalid_input("weather temperature is not a number"));
        }
        if self.humidity_pct > 100 {
            return Err(AppError::invalid_input(format!(
                "humidity must be a percentage, got {}",
                self.humidity_pct
            )));
        }
        Ok(())
    }
}

/// Kind of event on the user's calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occasion {
    Casual,
    Sport,
    SmartCasual,
    Business,
    Formal,
}

impl Display for Occasion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Occasion::Casual => "casual",
            Occasion::Sport => "sport",
            Occasion::SmartCasual => "smart casual",
            Occasion::Business => "business",
            Occasion::Formal => "formal",
        };
        write!(f, "{}", label)
    }
}

/// A calendar entry for the day being dressed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub occasion: Occasion,
}

impl ScheduleEvent {
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.end < self.start {
            return Err(AppError::invalid_input(format!(
                "event '{}' ends before it starts",
                self.title
            )));
        }
        Ok(())
    }
}

/// Clothing guidance derived from the weather alone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAdvice {
    pub needs_outerwear: bool,
    pub needs_rainwear: bool,
    pub suggested_materials: Vec<String>,
    pub suggested_style: String,
}
