use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default category for tasks created without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Task importance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Ordering weight used when sorting listings, highest first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::invalid_input(format!("unknown priority '{other}'"))),
        }
    }
}

/// How often a recurring task spawns a new occurrence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(Error::InvalidFrequency(other.to_string())),
        }
    }
}

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(Error::invalid_input(format!("unknown theme '{other}'"))),
        }
    }
}

/// A checklist item embedded in a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Recurrence state carried by a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceConfig {
    pub frequency: Frequency,
    /// When the last occurrence was spawned (or recurrence was enabled).
    pub last_generated: DateTime<Utc>,
    pub is_active: bool,
}

/// Represents a single task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, assigned as `max + 1`.
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    /// Creation timestamp. Never changed by updates.
    pub created_at: DateTime<Utc>,
    /// Due date in ISO 8601 form, either a bare date or a full timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_config: Option<RecurrenceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders_enabled: Option<bool>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Task {
    /// True when the task carries an active recurrence config.
    pub fn is_recurring(&self) -> bool {
        self.recurring_config
            .as_ref()
            .map(|c| c.is_active)
            .unwrap_or(false)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .as_ref()
            .map(|tags| tags.iter().any(|t| t == tag))
            .unwrap_or(false)
    }
}

/// Input for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub priority: Priority,
    pub category: String,
    pub due_date: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            priority: Priority::Medium,
            category: default_category(),
            due_date: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn due(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }
}

/// A partial update to a task.
///
/// There is no `id` or `created_at` field: identity and creation time cannot
/// be patched. Fields that may be cleared use `Option<Option<_>>`, where
/// `Some(None)` removes the value.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub subtasks: Option<Vec<Subtask>>,
    pub recurring_config: Option<Option<RecurrenceConfig>>,
    pub reminders_enabled: Option<bool>,
}

impl TaskPatch {
    /// Merges the supplied fields over `task`.
    pub fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(tags) = self.tags {
            task.tags = Some(tags);
        }
        if let Some(notes) = self.notes {
            task.notes = Some(notes);
        }
        if let Some(subtasks) = self.subtasks {
            task.subtasks = Some(subtasks);
        }
        if let Some(config) = self.recurring_config {
            task.recurring_config = config;
        }
        if let Some(enabled) = self.reminders_enabled {
            task.reminders_enabled = Some(enabled);
        }
    }
}

/// Pending-only counts per priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl PriorityCounts {
    pub fn sum(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// Counts derived from the task collection. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub by_priority: PriorityCounts,
}

/// Checklist progress for one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubtaskStats {
    pub total: usize,
    pub completed: usize,
}

/// Listing criteria. `None` means "all" for priority and category.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub search: String,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub recurring_only: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        let search = self.search.to_lowercase();
        let matches_search = task.title.to_lowercase().contains(&search);
        let matches_priority = self.priority.map_or(true, |p| task.priority == p);
        let matches_category = self
            .category
            .as_deref()
            .map_or(true, |c| task.category == c);
        let matches_tag = self.tag.as_deref().map_or(true, |t| task.has_tag(t));
        let matches_recurring = !self.recurring_only || task.is_recurring();

        matches_search && matches_priority && matches_category && matches_tag && matches_recurring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task {
            id: 1,
            title: "Write report".into(),
            completed: false,
            created_at: Utc::now(),
            due_date: None,
            priority: Priority::High,
            category: "Work".into(),
            tags: Some(vec!["urgent".into()]),
            notes: None,
            subtasks: None,
            recurring_config: None,
            reminders_enabled: None,
        }
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent_fields() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["priority"], "high");
        assert!(json.get("dueDate").is_none());
        assert!(json.get("recurringConfig").is_none());
    }

    #[test]
    fn test_deserializes_minimal_record_with_defaults() {
        let raw = r#"{"id":3,"title":"x","createdAt":"2024-01-15T12:00:00.000Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, DEFAULT_CATEGORY);
        assert!(!task.completed);
    }

    #[test]
    fn test_patch_can_clear_due_date() {
        let mut task = sample();
        task.due_date = Some("2024-01-15".into());
        TaskPatch { due_date: Some(None), ..Default::default() }.apply_to(&mut task);
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn test_filter_defaults_match_everything() {
        assert!(TaskFilter::default().matches(&sample()));
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let filter = TaskFilter { search: "REPORT".into(), ..Default::default() };
        assert!(filter.matches(&sample()));
    }

    #[test]
    fn test_frequency_parse_rejects_unknown() {
        assert!(matches!("hourly".parse::<Frequency>(), Err(Error::InvalidFrequency(_))));
        assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
    }
}
