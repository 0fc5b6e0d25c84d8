//! Task data structure and related functionality.
//!
//! This module defines the `Task` struct that represents a single to-do item,
//! the `TaskDraft` a caller fills in to create one, and the `TaskId` token
//! assigned by the store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::fields::Priority;

/// Unique, immutable task identifier assigned by the store at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A to-do item.
///
/// `completed` always agrees with the collection the task lives in, and
/// `completed_at` is set exactly while `completed` is true. `location` is only
/// present for outdoor tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub priority: Priority,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub important: bool,
    pub date: DateTime<Utc>,
    pub is_outdoor: bool,
    pub location: Option<String>,
    pub assigned_to_me: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh, incomplete task from a validated draft.
    pub(crate) fn from_draft(id: TaskId, draft: TaskDraft, created_at: DateTime<Utc>) -> Self {
        let location = if draft.is_outdoor {
            draft.location.map(|l| l.trim().to_string())
        } else {
            None
        };
        Task {
            id,
            text: draft.text,
            priority: draft.priority,
            completed: false,
            completed_at: None,
            important: draft.important,
            date: draft.date,
            is_outdoor: draft.is_outdoor,
            location,
            assigned_to_me: draft.assigned_to_me,
            created_at,
        }
    }

    /// Location to look weather up for, if this is an outdoor task.
    pub fn weather_location(&self) -> Option<&str> {
        if self.is_outdoor {
            self.location.as_deref().filter(|l| !l.is_empty())
        } else {
            None
        }
    }
}

/// The caller-supplied part of a new task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub text: String,
    pub priority: Priority,
    pub important: bool,
    pub date: DateTime<Utc>,
    pub is_outdoor: bool,
    pub location: Option<String>,
    pub assigned_to_me: bool,
}

impl TaskDraft {
    /// A medium-priority, indoor, unassigned draft due now.
    pub fn new(text: impl Into<String>) -> Self {
        TaskDraft {
            text: text.into(),
            priority: Priority::default(),
            important: false,
            date: Utc::now(),
            is_outdoor: false,
            location: None,
            assigned_to_me: false,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn due(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn important(mut self, important: bool) -> Self {
        self.important = important;
        self
    }

    pub fn assigned_to_me(mut self, assigned: bool) -> Self {
        self.assigned_to_me = assigned;
        self
    }

    /// Mark the draft as an outdoor activity at `location`.
    pub fn outdoor(mut self, location: impl Into<String>) -> Self {
        self.is_outdoor = true;
        self.location = Some(location.into());
        self
    }

    /// Reject drafts the store must not accept.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.text.trim().is_empty() {
            return Err(TaskError::InvalidTask("task text must not be empty".into()));
        }
        if self.is_outdoor
            && self
                .location
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
        {
            return Err(TaskError::InvalidTask(
                "outdoor tasks need a location".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn blank_text_is_invalid(#[case] text: &str) {
        assert!(matches!(
            TaskDraft::new(text).validate(),
            Err(TaskError::InvalidTask(_))
        ));
    }

    #[rstest]
    fn outdoor_without_location_is_invalid() {
        let draft = TaskDraft::new("Run").outdoor("  ");
        assert!(draft.validate().is_err());
    }

    #[rstest]
    fn indoor_task_drops_location() {
        let mut draft = TaskDraft::new("Read");
        draft.location = Some("Paris".into());
        let task = Task::from_draft(TaskId(1), draft, Utc::now());
        assert_eq!(task.location, None);
        assert_eq!(task.weather_location(), None);
    }

    #[rstest]
    fn outdoor_task_keeps_trimmed_location() {
        let task = Task::from_draft(TaskId(7), TaskDraft::new("Hike").outdoor(" Oslo "), Utc::now());
        assert_eq!(task.weather_location(), Some("Oslo"));
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
    }

    #[rstest]
    fn task_serialises_id_as_plain_number() {
        let task = Task::from_draft(TaskId(42), TaskDraft::new("Write"), Utc::now());
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["priority"], "medium");
    }
}
