//! Error types shared across the crate.
//!
//! Operations on missing task ids are not errors; they are no-ops. Weather
//! failures never escape the cache: they are recorded per task as text.

use thiserror::Error;

use crate::task::TaskId;

/// Errors raised by task and view operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The draft cannot become a task.
    #[error("invalid task: {0}")]
    InvalidTask(String),

    /// Unknown filter key.
    #[error("unknown filter '{0}' (expected all, today, important, completed or assigned)")]
    InvalidFilter(String),

    /// Unknown sort key.
    #[error("unknown sort key '{0}' (expected date, priority, status or name)")]
    InvalidSortKey(String),

    /// Unknown priority.
    #[error("unknown priority '{0}' (expected low, medium or high)")]
    InvalidPriority(String),
}

/// Errors from the session gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("username must not be empty")]
    EmptyUsername,
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure of a single call to the weather provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("weather service returned HTTP {0}")]
    Status(u16),

    /// The body did not contain the expected fields.
    #[error("malformed weather response: {0}")]
    Decode(String),

    /// No answer within the configured timeout.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// The provider is not usable as configured.
    #[error("weather provider not configured: {0}")]
    NotConfigured(String),
}

/// A failed weather refresh for one task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("weather fetch for task {task_id} failed: {message}")]
    FetchFailed { task_id: TaskId, message: String },
}

impl WeatherError {
    pub fn fetch_failed(task_id: TaskId, source: &FetchError) -> Self {
        WeatherError::FetchFailed {
            task_id,
            message: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn fetch_failure_carries_task_and_cause() {
        let err = WeatherError::fetch_failed(TaskId(3), &FetchError::Status(500));
        assert_eq!(
            err.to_string(),
            "weather fetch for task 3 failed: weather service returned HTTP 500"
        );
    }

    #[rstest]
    #[case(FetchError::Timeout(10_000), "timed out after 10000ms")]
    #[case(FetchError::Decode("missing main".into()), "malformed weather response: missing main")]
    fn fetch_error_messages(#[case] err: FetchError, #[case] expected: &str) {
        assert_eq!(err.to_string(), expected);
    }
}
