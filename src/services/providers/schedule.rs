use chrono::NaiveDate;
use std::path::Path;

use crate::{
    error::AppResult,
    models::ScheduleEvent,
    services::providers::ScheduleProvider,
};

/// Calendar held in memory, typically loaded from a JSON export
#[derive(Debug, Clone, Default)]
pub struct StaticScheduleProvider {
    events: Vec<ScheduleEvent>,
}

impl StaticScheduleProvider {
    pub fn new(events: Vec<ScheduleEvent>) -> AppResult<Self> {
        for event in &events {
            event.validate()?;
        }
        Ok(Self { events })
    }

    /// Reads a JSON array of events; a missing file means an empty calendar
    pub async fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            tracing::info!(path = %path.display(), "No schedule file, assuming an empty calendar");
            return Ok(Self::default());
        }

        let raw = tokio::fs::read_to_string(path).await?;
        let events: Vec<ScheduleEvent> = serde_json::from_str(&raw)?;
        tracing::info!(path = %path.display(), events = events.len(), "Loaded schedule");
        Self::new(events)
    }
}

#[async_trait::async_trait]
impl ScheduleProvider for StaticScheduleProvider {
    fn name(&self) -> &'static str {
        "static_schedule"
    }

    async fn get_events(&self, date: NaiveDate) -> AppResult<Vec<ScheduleEvent>> {
        let mut events: Vec<ScheduleEvent> = self
            .events
            .iter()
            .filter(|event| event.date() == date)
            .cloned()
            .collect();
        events.sort_by_key(|event| event.start);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Occasion;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn event(title: &str, start: &str, end: &str, occasion: Occasion) -> ScheduleEvent {
        ScheduleEvent {
            title: title.to_string(),
            start: at(start),
            end: at(end),
            occasion,
        }
    }

    #[tokio::test]
    async fn test_events_filtered_and_sorted() {
        let provider = StaticScheduleProvider::new(vec![
            event("Dinner", "2024-10-15 19:00", "2024-10-15 21:00", Occasion::SmartCasual),
            event("Gym", "2024-10-16 07:00", "2024-10-16 08:00", Occasion::Sport),
            event("Standup", "2024-10-15 09:00", "2024-10-15 09:15", Occasion::Business),
        ])
        .unwrap();

        let events = provider
            .get_events(NaiveDate::from_ymd_opt(2024, 10, 15).unwrap())
            .await
            .unwrap();

        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Standup", "Dinner"]);
    }

    #[test]
    fn test_rejects_inverted_event() {
        let result = StaticScheduleProvider::new(vec![event(
            "Backwards",
            "2024-10-15 10:00",
            "2024-10-15 09:00",
            Occasion::Casual,
        )]);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_calendar() {
        let path = std::env::temp_dir().join(format!("schedule-{}.json", uuid::Uuid::new_v4()));
        let provider = StaticScheduleProvider::from_json_file(&path).await.unwrap();
        let events = provider
            .get_events(NaiveDate::from_ymd_opt(2024, 10, 15).unwrap())
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_loads_json_file() {
        let path = std::env::temp_dir().join(format!("schedule-{}.json", uuid::Uuid::new_v4()));
        let json = r#"[{"title":"Board meeting","start":"2024-10-15T10:00:00","end":"2024-10-15T12:00:00","occasion":"business"}]"#;
        tokio::fs::write(&path, json).await.unwrap();

        let provider = StaticScheduleProvider::from_json_file(&path).await.unwrap();
        let events = provider
            .get_events(NaiveDate::from_ymd_opt(2024, 10, 15).unwrap())
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].occasion, Occasion::Business);
        tokio::fs::remove_file(&path).await.unwrap();
    }
}
