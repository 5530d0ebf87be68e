//! Recurring tasks.
//!
//! Two kinds of arithmetic live here and they deliberately disagree:
//! [`next_due_date`] steps by calendar units (a month is a calendar month),
//! while [`should_generate_next`] compares elapsed time against fixed
//! thresholds (a month is 30 days, a year 365).

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

use crate::error::{Error, Result};
use crate::models::{Frequency, RecurrenceConfig, Subtask, Task, TaskPatch};
use crate::storage::KeyValueStore;
use crate::tasks::TaskRepository;

/// Source of the current time.
pub type Clock = fn() -> DateTime<Utc>;

/// Parses an ISO 8601 timestamp or bare date. Bare dates and timestamps
/// without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::default()).and_utc());
    }
    Err(Error::invalid_input(format!("invalid date '{raw}'")))
}

/// Formats like `2024-01-16T00:00:00.000Z`.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Moves `dt` forward by `months` calendar months, keeping the day of month.
/// A day past the end of the target month overflows into the next one, so
/// Jan 31 becomes Mar 2 (or Mar 3 outside leap years).
fn add_months(dt: DateTime<Utc>, months: i32) -> Result<DateTime<Utc>> {
    let total = dt.year() * 12 + dt.month0() as i32 + months;
    let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);
    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)
        .ok_or_else(|| Error::invalid_input(format!("date out of range: {dt}")))?;
    let date = first + Duration::days(i64::from(dt.day()) - 1);
    Ok(date.and_time(dt.time()).and_utc())
}

/// Computes the due date following `current` for `frequency`.
pub fn next_due_date(current: &str, frequency: Frequency) -> Result<String> {
    let date = parse_timestamp(current)?;
    let next = match frequency {
        Frequency::Daily => date + Duration::days(1),
        Frequency::Weekly => date + Duration::days(7),
        Frequency::Monthly => add_months(date, 1)?,
        Frequency::Yearly => add_months(date, 12)?,
    };
    Ok(format_timestamp(next))
}

/// Minimum elapsed time between generated occurrences.
pub fn threshold(frequency: Frequency) -> Duration {
    match frequency {
        Frequency::Daily => Duration::hours(24),
        Frequency::Weekly => Duration::days(7),
        Frequency::Monthly => Duration::days(30),
        Frequency::Yearly => Duration::days(365),
    }
}

/// True once at least [`threshold`] has passed since `last_generated`.
pub fn should_generate_next(
    last_generated: DateTime<Utc>,
    frequency: Frequency,
    now: DateTime<Utc>,
) -> bool {
    now - last_generated >= threshold(frequency)
}

/// Like [`should_generate_next`] for an untyped frequency; unknown ones never fire.
pub fn should_generate_next_str(
    last_generated: DateTime<Utc>,
    frequency: &str,
    now: DateTime<Utc>,
) -> bool {
    frequency
        .parse::<Frequency>()
        .map(|f| should_generate_next(last_generated, f, now))
        .unwrap_or(false)
}

pub struct RecurrenceEngine<'a, S> {
    repo: &'a TaskRepository<S>,
    clock: Clock,
}

impl<'a, S: KeyValueStore> RecurrenceEngine<'a, S> {
    pub fn new(repo: &'a TaskRepository<S>) -> Self {
        RecurrenceEngine { repo, clock: Utc::now }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Activates recurrence, starting the generation timer now.
    pub fn make_recurring(&self, task_id: u64, frequency: Frequency) -> Result<Task> {
        let config = RecurrenceConfig {
            frequency,
            last_generated: self.now(),
            is_active: true,
        };
        self.repo.update(
            task_id,
            TaskPatch {
                recurring_config: Some(Some(config)),
                ..Default::default()
            },
        )
    }

    pub fn stop_recurring(&self, task_id: u64) -> Result<Task> {
        self.repo.update(
            task_id,
            TaskPatch {
                recurring_config: Some(None),
                ..Default::default()
            },
        )
    }

    /// Tasks with an active recurrence config, in repository order.
    pub fn list_recurring(&self) -> Vec<Task> {
        self.repo
            .get_all()
            .into_iter()
            .filter(Task::is_recurring)
            .collect()
    }

    /// Spawns the next occurrence of `task` and returns it.
    ///
    /// The occurrence inherits title, priority, category, tags, notes and the
    /// recurrence config; its subtasks start unchecked. The source task's
    /// `last_generated` moves to now, and so does the copy's.
    pub fn generate_next_occurrence(&self, task: &Task) -> Result<Task> {
        let config = match &task.recurring_config {
            Some(config) if config.is_active => config,
            _ => {
                tracing::warn!(
                    target: "recurrence",
                    "Task {} is not recurring or is inactive",
                    task.id
                );
                return Err(Error::NotRecurring(task.id));
            }
        };

        let now = self.now();
        let base = task.due_date.clone().unwrap_or_else(|| format_timestamp(now));
        let due = next_due_date(&base, config.frequency)?;

        let refreshed = RecurrenceConfig {
            last_generated: now,
            ..config.clone()
        };
        let occurrence = Task {
            id: 0,
            title: task.title.clone(),
            completed: false,
            created_at: now,
            due_date: Some(due),
            priority: task.priority,
            category: task.category.clone(),
            tags: task.tags.clone(),
            notes: task.notes.clone().filter(|n| !n.is_empty()),
            subtasks: task.subtasks.as_ref().map(|subtasks| {
                subtasks
                    .iter()
                    .map(|st| Subtask {
                        completed: false,
                        ..st.clone()
                    })
                    .collect()
            }),
            recurring_config: Some(refreshed.clone()),
            reminders_enabled: None,
        };

        // The copy and the source's new timestamp land together or not at all.
        let occurrence = self.repo.add_derived(
            occurrence,
            task.id,
            TaskPatch {
                recurring_config: Some(Some(refreshed)),
                ..Default::default()
            },
        )?;

        tracing::info!(
            target: "recurrence",
            "Generated task {} from recurring task {} due {}",
            occurrence.id,
            task.id,
            occurrence.due_date.as_deref().unwrap_or("-")
        );
        Ok(occurrence)
    }

    /// Generates an occurrence for every active recurring task whose threshold
    /// has elapsed. Returns the tasks created, in iteration order.
    pub fn auto_generate_due(&self) -> Vec<Task> {
        let now = self.now();
        let mut created = Vec::new();
        for task in self.list_recurring() {
            let Some(config) = &task.recurring_config else { continue };
            if !should_generate_next(config.last_generated, config.frequency, now) {
                continue;
            }
            match self.generate_next_occurrence(&task) {
                Ok(occurrence) => created.push(occurrence),
                Err(e) => {
                    tracing::warn!(
                        target: "recurrence",
                        "Skipping recurring task {}: {}",
                        task.id,
                        e
                    );
                }
            }
        }
        created
    }
}
