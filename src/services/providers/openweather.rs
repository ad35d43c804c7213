//! OpenWeatherMap weather provider
//!
//! Today's weather comes from `/weather` (current conditions). Other dates are
//! read from `/forecast`, which returns 3-hour readings for the next five days;
//! readings are grouped by local calendar day and averaged.

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{WeatherCondition, WeatherSnapshot},
    services::providers::WeatherProvider,
};
use chrono::{DateTime, Local, NaiveDate};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize};

const WEATHER_CACHE_TTL: u64 = 1800; // 30 minutes

#[derive(Debug, Deserialize)]
struct MainReading {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionReading {
    main: String,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainReading,
    #[serde(default)]
    weather: Vec<ConditionReading>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: MainReading,
    #[serde(default)]
    weather: Vec<ConditionReading>,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastCity {
    /// Offset from UTC in seconds
    #[serde(default)]
    timezone: i64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
    #[serde(default)]
    city: ForecastCity,
}

#[derive(Clone)]
pub struct OpenWeatherProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    /// `city,country` query understood by OpenWeatherMap
    location: String,
    cache: Option<Cache>,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, api_url: String, city: &str, country: &str) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            location: format!("{},{}", city, country),
            cache: None,
        }
    }

    /// Serves repeated lookups for the same day from Redis
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn fetch(&self, date: NaiveDate) -> AppResult<WeatherSnapshot> {
        if date == Local::now().date_naive() {
            let current: CurrentResponse = self.get_json("weather").await?;
            return Ok(snapshot_from_current(&current, date));
        }

        let forecast: ForecastResponse = self.get_json("forecast").await?;
        daily_snapshot(&forecast, date).ok_or_else(|| {
            AppError::ExternalApi(format!("No OpenWeatherMap forecast for {}", date))
        })
    }

    async fn fetch_cached(&self, cache: &Cache, date: NaiveDate) -> AppResult<WeatherSnapshot> {
        let key = CacheKey::Weather {
            city: self.location.clone(),
            date,
        };
        cached!(cache, key, WEATHER_CACHE_TTL, self.fetch(date))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), endpoint);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("q", self.location.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OpenWeatherMap returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn name(&self) -> &'static str {
        "openweathermap"
    }

    async fn get_weather(&self, date: NaiveDate) -> AppResult<WeatherSnapshot> {
        let snapshot = match &self.cache {
            Some(cache) => self.fetch_cached(cache, date).await?,
            None => self.fetch(date).await?,
        };

        tracing::debug!(
            location = %self.location,
            date = %date,
            temperature_c = snapshot.temperature_c,
            condition = %snapshot.condition,
            "Fetched weather"
        );

        Ok(snapshot)
    }
}

/// Maps OpenWeatherMap's `weather[].main` group to a condition
pub fn map_condition(main: &str) -> WeatherCondition {
    match main.to_lowercase().as_str() {
        "clear" => WeatherCondition::Clear,
        "clouds" => WeatherCondition::Cloudy,
        "rain" | "drizzle" | "thunderstorm" => WeatherCondition::Rain,
        "snow" => WeatherCondition::Snow,
        "mist" | "fog" | "haze" | "smoke" | "dust" | "sand" => WeatherCondition::Fog,
        _ => WeatherCondition::Unknown,
    }
}

fn first_condition(readings: &[ConditionReading]) -> WeatherCondition {
    readings
        .first()
        .map_or(WeatherCondition::Unknown, |reading| map_condition(&reading.main))
}

fn humidity_pct(humidity: f64) -> u8 {
    humidity.round().clamp(0.0, 100.0) as u8
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn snapshot_from_current(current: &CurrentResponse, date: NaiveDate) -> WeatherSnapshot {
    WeatherSnapshot {
        date,
        temperature_c: round1(current.main.temp),
        condition: first_condition(&current.weather),
        humidity_pct: humidity_pct(current.main.humidity),
    }
}

/// Averages the forecast readings that fall on `date` in the city's local time
///
/// Temperature and humidity are means; the condition is the most frequent one,
/// earliest reading first on a tie.
fn daily_snapshot(forecast: &ForecastResponse, date: NaiveDate) -> Option<WeatherSnapshot> {
    let readings: Vec<&ForecastEntry> = forecast
        .list
        .iter()
        .filter(|entry| {
            DateTime::from_timestamp(entry.dt + forecast.city.timezone, 0)
                .is_some_and(|local| local.date_naive() == date)
        })
        .collect();

    if readings.is_empty() {
        return None;
    }

    let n = readings.len() as f64;
    let temperature = readings.iter().map(|entry| entry.main.temp).sum::<f64>() / n;
    let humidity = readings.iter().map(|entry| entry.main.humidity).sum::<f64>() / n;

    let mut tally: Vec<(WeatherCondition, usize)> = Vec::new();
    for entry in &readings {
        let condition = first_condition(&entry.weather);
        match tally.iter_mut().find(|(seen, _)| *seen == condition) {
            Some((_, count)) => *count += 1,
            None => tally.push((condition, 1)),
        }
    }

    let mut condition = WeatherCondition::Unknown;
    let mut best = 0;
    for (candidate, count) in tally {
        if count > best {
            condition = candidate;
            best = count;
        }
    }

    Some(WeatherSnapshot {
        date,
        temperature_c: round1(temperature),
        condition,
        humidity_pct: humidity_pct(humidity),
    })
}
