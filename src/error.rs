use std::time::Duration;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{collaborator} did not respond within {}ms", .timeout.as_millis())]
    CollaboratorTimeout {
        collaborator: &'static str,
        timeout: Duration,
    },

    #[error("Malformed generation response: {0}")]
    Parse(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create an input validation error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a timeout error for the named collaborator.
    pub fn timeout(collaborator: &'static str, timeout: Duration) -> Self {
        Self::CollaboratorTimeout {
            collaborator,
            timeout,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = AppError::timeout("weather", Duration::from_millis(1500));
        assert_eq!(err.to_string(), "weather did not respond within 1500ms");
    }

    #[test]
    fn test_invalid_input_display() {
        let err = AppError::invalid_input("wardrobe is empty");
        assert_eq!(err.to_string(), "Invalid input: wardrobe is empty");
    }
}
