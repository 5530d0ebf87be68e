//! Checklist items embedded in a task.

use ulid::Ulid;

use crate::error::{Error, Result};
use crate::models::{Subtask, SubtaskStats, Task, TaskPatch};
use crate::storage::KeyValueStore;
use crate::tasks::TaskRepository;

pub struct SubtaskManager<'a, S> {
    repo: &'a TaskRepository<S>,
}

/// Fresh subtask id: millisecond timestamp plus 80 random bits.
pub fn new_subtask_id() -> String {
    Ulid::new().to_string()
}

impl<'a, S: KeyValueStore> SubtaskManager<'a, S> {
    pub fn new(repo: &'a TaskRepository<S>) -> Self {
        SubtaskManager { repo }
    }

    pub fn add(&self, task_id: u64, title: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            tracing::warn!(target: "subtasks", "Subtask title cannot be empty");
            return Err(Error::EmptyTitle);
        }
        let task = self.find(task_id)?;
        let mut subtasks = task.subtasks.unwrap_or_default();
        subtasks.push(Subtask {
            id: new_subtask_id(),
            title: title.to_string(),
            completed: false,
        });
        self.save(task_id, subtasks)
    }

    pub fn toggle(&self, task_id: u64, subtask_id: &str) -> Result<Task> {
        self.modify(task_id, subtask_id, |st| st.completed = !st.completed)
    }

    pub fn delete(&self, task_id: u64, subtask_id: &str) -> Result<Task> {
        let mut subtasks = self.existing(task_id, subtask_id)?;
        let len_before = subtasks.len();
        subtasks.retain(|st| st.id != subtask_id);
        if subtasks.len() == len_before {
            return Err(self.missing(task_id, subtask_id));
        }
        self.save(task_id, subtasks)
    }

    pub fn update_title(&self, task_id: u64, subtask_id: &str, title: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            tracing::warn!(target: "subtasks", "Subtask title cannot be empty");
            return Err(Error::EmptyTitle);
        }
        self.modify(task_id, subtask_id, |st| st.title = title.to_string())
    }

    /// `None` only when the task itself is missing.
    pub fn stats(&self, task_id: u64) -> Option<SubtaskStats> {
        let task = self.repo.get_by_id(task_id)?;
        let subtasks = task.subtasks.unwrap_or_default();
        Some(SubtaskStats {
            total: subtasks.len(),
            completed: subtasks.iter().filter(|st| st.completed).count(),
        })
    }

    fn modify(&self, task_id: u64, subtask_id: &str, f: impl FnOnce(&mut Subtask)) -> Result<Task> {
        let mut subtasks = self.existing(task_id, subtask_id)?;
        let Some(subtask) = subtasks.iter_mut().find(|st| st.id == subtask_id) else {
            return Err(self.missing(task_id, subtask_id));
        };
        f(subtask);
        self.save(task_id, subtasks)
    }

    /// The task's subtask list; a task without one has nothing to find.
    fn existing(&self, task_id: u64, subtask_id: &str) -> Result<Vec<Subtask>> {
        self.find(task_id)?
            .subtasks
            .ok_or_else(|| self.missing(task_id, subtask_id))
    }

    fn save(&self, task_id: u64, subtasks: Vec<Subtask>) -> Result<Task> {
        self.repo.update(
            task_id,
            TaskPatch {
                subtasks: Some(subtasks),
                ..Default::default()
            },
        )
    }

    fn find(&self, task_id: u64) -> Result<Task> {
        self.repo.get_by_id(task_id).ok_or_else(|| {
            tracing::warn!(target: "subtasks", "Task {} not found", task_id);
            Error::TaskNotFound(task_id)
        })
    }

    fn missing(&self, task_id: u64, subtask_id: &str) -> Error {
        tracing::warn!(target: "subtasks", "Subtask {} not found on task {}", subtask_id, task_id);
        Error::SubtaskNotFound {
            task_id,
            subtask_id: subtask_id.to_string(),
        }
    }
}
