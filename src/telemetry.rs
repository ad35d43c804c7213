use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "wardrobe_engine=info";

/// Installs the global tracing subscriber
///
/// Logs go to stderr so stdout stays free for command output.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Identifier attached to every log line of one recommendation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Creates a new random request ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the UUID as a string
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }

    /// Span that scopes the logs of one recommendation request
    pub fn span(&self, date: NaiveDate) -> tracing::Span {
        tracing::info_span!(
            "recommend_outfits",
            request_id = %self.as_str(),
            date = %date,
        )
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_request_id_display_matches_uuid() {
        let id = RequestId::new();
        assert_eq!(id.to_string(), id.0.to_string());
        assert_eq!(id.as_str().len(), 36);
    }
}
