//! The task repository.
//!
//! Owns the canonical task collection stored under [`TASKS_KEY`]. Every
//! operation reloads the collection, and every mutation writes the whole
//! collection back before returning. Read-modify-write sequences are not
//! atomic: two processes sharing a data directory race, and the last write
//! wins.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::config::TASKS_KEY;
use crate::error::{Error, Result};
use crate::models::{NewTask, Priority, PriorityCounts, Task, TaskFilter, TaskPatch, TaskStats};
use crate::storage::{KeyValueStore, Storage};

pub struct TaskRepository<S> {
    storage: Storage<S>,
}

impl<S: KeyValueStore> TaskRepository<S> {
    pub fn new(storage: Storage<S>) -> Self {
        TaskRepository { storage }
    }

    /// The gateway underneath, shared with the theme accessor.
    pub fn storage(&self) -> &Storage<S> {
        &self.storage
    }

    /// Loads all tasks. Returns an empty vector if nothing is stored or the
    /// stored value cannot be read.
    fn load(&self) -> Vec<Task> {
        self.storage.get(TASKS_KEY, Vec::new())
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        if self.storage.set(TASKS_KEY, tasks) {
            Ok(())
        } else {
            Err(Error::Storage(TASKS_KEY.to_string()))
        }
    }

    /// A candidate id must be positive.
    pub fn is_valid_id(id: u64) -> bool {
        id > 0
    }

    fn check_id(id: u64) -> Result<()> {
        if Self::is_valid_id(id) {
            Ok(())
        } else {
            tracing::warn!(target: "tasks", "Invalid task ID: {}", id);
            Err(Error::InvalidId(id))
        }
    }

    /// Creates a task and returns it.
    pub fn add(&self, new: NewTask) -> Result<Task> {
        let title = new.title.trim();
        if title.is_empty() {
            tracing::warn!(target: "tasks", "Task title cannot be empty");
            return Err(Error::EmptyTitle);
        }

        let mut tasks = self.load();
        let next_id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let task = Task {
            id: next_id,
            title: title.to_string(),
            completed: false,
            created_at: Utc::now(),
            due_date: new.due_date.filter(|d| !d.is_empty()),
            priority: new.priority,
            category: new.category,
            tags: None,
            notes: None,
            subtasks: None,
            recurring_config: None,
            reminders_enabled: None,
        };
        tasks.push(task.clone());
        self.save(&tasks)?;
        tracing::debug!(target: "tasks", "Task added (id = {})", next_id);
        Ok(task)
    }

    /// Appends a fully formed `task` under the next id and merges
    /// `source_patch` over `source_id`, in a single write. Nothing is stored
    /// if either half fails.
    pub fn add_derived(
        &self,
        mut task: Task,
        source_id: u64,
        source_patch: TaskPatch,
    ) -> Result<Task> {
        Self::check_id(source_id)?;

        let mut tasks = self.load();
        let Some(source) = tasks.iter_mut().find(|t| t.id == source_id) else {
            tracing::warn!(target: "tasks", "Task {} not found", source_id);
            return Err(Error::TaskNotFound(source_id));
        };
        source_patch.apply_to(source);

        task.id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        tasks.push(task.clone());
        self.save(&tasks)?;
        tracing::debug!(
            target: "tasks",
            "Task added (id = {}) from task {}",
            task.id,
            source_id
        );
        Ok(task)
    }

    /// Merges `patch` over the task with `id` and persists it.
    pub fn update(&self, id: u64, patch: TaskPatch) -> Result<Task> {
        Self::check_id(id)?;

        let mut tasks = self.load();
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            tracing::warn!(target: "tasks", "Task {} not found", id);
            return Err(Error::TaskNotFound(id));
        };
        patch.apply_to(task);
        let updated = task.clone();
        self.save(&tasks)?;
        Ok(updated)
    }

    /// Flips `completed`. Reads, then updates: two separate storage round trips.
    pub fn toggle(&self, id: u64) -> Result<Task> {
        let task = self.get_by_id(id).ok_or_else(|| {
            tracing::warn!(target: "tasks", "Task {} not found", id);
            Error::TaskNotFound(id)
        })?;
        self.update(
            id,
            TaskPatch {
                completed: Some(!task.completed),
                ..Default::default()
            },
        )
    }

    /// Removes a task. Returns `false` if the id is invalid, unknown, or the
    /// write failed.
    pub fn delete(&self, id: u64) -> bool {
        if Self::check_id(id).is_err() {
            return false;
        }
        let mut tasks = self.load();
        let len_before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == len_before {
            tracing::warn!(target: "tasks", "Task {} not found", id);
            return false;
        }
        self.save(&tasks).is_ok()
    }

    pub fn get_by_id(&self, id: u64) -> Option<Task> {
        self.load().into_iter().find(|t| t.id == id)
    }

    /// All tasks in creation order.
    pub fn get_all(&self) -> Vec<Task> {
        self.load()
    }

    pub fn get_filtered(&self, filter: &TaskFilter) -> Vec<Task> {
        self.load()
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect()
    }

    /// Totals plus pending-only counts per priority.
    pub fn stats(&self) -> TaskStats {
        let tasks = self.load();
        let mut by_priority = PriorityCounts::default();
        let mut completed = 0;
        for t in &tasks {
            if t.completed {
                completed += 1;
                continue;
            }
            match t.priority {
                Priority::Low => by_priority.low += 1,
                Priority::Medium => by_priority.medium += 1,
                Priority::High => by_priority.high += 1,
            }
        }
        TaskStats {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
            by_priority,
        }
    }

    /// Sorted, de-duplicated categories.
    pub fn categories(&self) -> Vec<String> {
        self.load()
            .into_iter()
            .map(|t| t.category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Empties the collection.
    pub fn clear_all(&self) -> bool {
        self.save(&[]).is_ok()
    }

    /// Replaces a task's notes with the trimmed `notes`.
    pub fn set_notes(&self, id: u64, notes: &str) -> Result<Task> {
        Self::check_id(id)?;
        self.update(
            id,
            TaskPatch {
                notes: Some(notes.trim().to_string()),
                ..Default::default()
            },
        )
    }

    pub fn clear_notes(&self, id: u64) -> Result<Task> {
        self.set_notes(id, "")
    }

    /// Returns the notes of a task, empty if it has none; `None` if the task
    /// does not exist.
    pub fn notes(&self, id: u64) -> Option<String> {
        self.get_by_id(id).map(|t| t.notes.unwrap_or_default())
    }

    pub fn set_reminders(&self, id: u64, enabled: bool) -> Result<Task> {
        Self::check_id(id)?;
        self.update(
            id,
            TaskPatch {
                reminders_enabled: Some(enabled),
                ..Default::default()
            },
        )
    }
}
