//! Enumerations and field types for task management.
//!
//! This module defines the structured values used to categorise tasks and to
//! select views over them: priority levels, filter keys and sort keys.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Priority classification for a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Fixed rank used for sorting: high sorts first, low last.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(TaskError::InvalidPriority(s.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        })
    }
}

/// Which tasks are visible in the main list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKey {
    #[default]
    All,
    Today,
    Important,
    Completed,
    Assigned,
}

impl FilterKey {
    /// Every filter in sidebar order.
    pub const ALL: [FilterKey; 5] = [
        FilterKey::All,
        FilterKey::Today,
        FilterKey::Important,
        FilterKey::Completed,
        FilterKey::Assigned,
    ];

    /// Human-readable label for menus and headers.
    pub fn label(self) -> &'static str {
        match self {
            FilterKey::All => "My Day",
            FilterKey::Today => "Today",
            FilterKey::Important => "Important",
            FilterKey::Completed => "Completed",
            FilterKey::Assigned => "Assigned to me",
        }
    }
}

impl FromStr for FilterKey {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(FilterKey::All),
            "today" => Ok(FilterKey::Today),
            "important" => Ok(FilterKey::Important),
            "completed" => Ok(FilterKey::Completed),
            "assigned" => Ok(FilterKey::Assigned),
            _ => Err(TaskError::InvalidFilter(s.to_string())),
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterKey::All => "all",
            FilterKey::Today => "today",
            FilterKey::Important => "important",
            FilterKey::Completed => "completed",
            FilterKey::Assigned => "assigned",
        })
    }
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Date,
    Priority,
    Status,
    Name,
}

impl SortKey {
    /// The key that follows this one, wrapping around. Used by the TUI toggle.
    pub fn next(self) -> Self {
        match self {
            SortKey::Date => SortKey::Priority,
            SortKey::Priority => SortKey::Status,
            SortKey::Status => SortKey::Name,
            SortKey::Name => SortKey::Date,
        }
    }
}

impl FromStr for SortKey {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "priority" => Ok(SortKey::Priority),
            "status" => Ok(SortKey::Status),
            "name" => Ok(SortKey::Name),
            _ => Err(TaskError::InvalidSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Date => "date",
            SortKey::Priority => "priority",
            SortKey::Status => "status",
            SortKey::Name => "name",
        })
    }
}
