//! Tag read-model and tag mutations.
//!
//! Nothing here is cached: every call reads the repository afresh, and writes
//! go through [`TaskRepository::update`].

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::models::{Task, TaskPatch};
use crate::storage::KeyValueStore;
use crate::tasks::TaskRepository;

pub struct TagIndex<'a, S> {
    repo: &'a TaskRepository<S>,
}

impl<'a, S: KeyValueStore> TagIndex<'a, S> {
    pub fn new(repo: &'a TaskRepository<S>) -> Self {
        TagIndex { repo }
    }

    /// Unique non-empty tags across all tasks, case-sensitive, sorted.
    pub fn all_tags(&self) -> Vec<String> {
        self.repo
            .get_all()
            .iter()
            .flat_map(|t| t.tags.iter().flatten())
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Tag → number of occurrences. A tag stored twice on one task counts twice.
    pub fn tag_stats(&self) -> BTreeMap<String, usize> {
        let mut stats = BTreeMap::new();
        for task in self.repo.get_all() {
            for tag in task.tags.iter().flatten() {
                *stats.entry(tag.trim().to_string()).or_insert(0) += 1;
            }
        }
        stats
    }

    /// Appends `tag` (trimmed). Already present means no write and the task
    /// comes back unchanged.
    pub fn add_tag(&self, id: u64, tag: &str) -> Result<Task> {
        let tag = tag.trim();
        if tag.is_empty() {
            tracing::warn!(target: "tags", "Tag cannot be empty");
            return Err(Error::EmptyTag);
        }
        let task = self.find(id)?;
        if task.has_tag(tag) {
            return Ok(task);
        }
        let mut tags = task.tags.unwrap_or_default();
        tags.push(tag.to_string());
        self.repo.update(id, TaskPatch { tags: Some(tags), ..Default::default() })
    }

    /// Drops every exact match of `tag`. A task without tags is returned as is.
    pub fn remove_tag(&self, id: u64, tag: &str) -> Result<Task> {
        let task = self.find(id)?;
        if task.tags.is_none() {
            return Ok(task);
        }
        let tags = task.tags.iter().flatten().filter(|t| *t != tag).cloned().collect();
        self.repo.update(id, TaskPatch { tags: Some(tags), ..Default::default() })
    }

    /// Replaces the tag list. Elements are trimmed and blanks dropped;
    /// duplicates are kept as given.
    pub fn set_tags<T: AsRef<str>>(&self, id: u64, tags: &[T]) -> Result<Task> {
        let tags = tags
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        self.repo.update(id, TaskPatch { tags: Some(tags), ..Default::default() })
    }

    pub fn tasks_by_tag(&self, tag: &str) -> Vec<Task> {
        self.repo
            .get_all()
            .into_iter()
            .filter(|t| t.has_tag(tag))
            .collect()
    }

    fn find(&self, id: u64) -> Result<Task> {
        self.repo.get_by_id(id).ok_or_else(|| {
            tracing::warn!(target: "tags", "Task {} not found", id);
            Error::TaskNotFound(id)
        })
    }
}

/// Splits comma-separated CLI input into raw tag elements for [`TagIndex::set_tags`].
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_string).collect()
}
