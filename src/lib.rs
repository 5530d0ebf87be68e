//! # taskdeck
//!
//! A task manager core with a thin command-line front end. Tasks carry a
//! priority, category, optional due date, tags, notes, a subtask checklist
//! and an optional recurrence schedule. Everything lives in a key-value store
//! of JSON documents.
//!
//! ## Layout
//!
//! *   [`storage`]: the [`storage::KeyValueStore`] trait, file and memory
//!     stores, and the [`storage::Storage`] gateway that never fails loudly.
//! *   [`tasks`]: [`tasks::TaskRepository`], the owner of the task collection.
//! *   [`tags`], [`subtasks`], [`recurrence`]: services that borrow the
//!     repository, re-read it on every call and write back through it.
//! *   [`theme`]: the persisted light/dark preference.
//! *   [`commands`]: the `cmd_*` functions behind the CLI.
//!
//! ## Example
//!
//! ```
//! use taskdeck::models::{NewTask, Priority};
//! use taskdeck::storage::{MemoryStore, Storage};
//! use taskdeck::tags::TagIndex;
//! use taskdeck::tasks::TaskRepository;
//!
//! let repo = TaskRepository::new(Storage::new(MemoryStore::new()));
//! let task = repo.add(NewTask::new("Water plants").priority(Priority::High)).unwrap();
//! TagIndex::new(&repo).add_tag(task.id, "home").unwrap();
//! assert_eq!(TagIndex::new(&repo).all_tags(), vec!["home"]);
//! ```
//!
//! ## Data Storage
//!
//! The CLI keeps `tasks_v1.json` and `theme_preference.json` in your local
//! data directory:
//! *   Linux: `~/.local/share/taskdeck/`
//! *   macOS: `~/Library/Application Support/taskdeck/`
//! *   Windows: `%APPDATA%\taskdeck\`
//!
//! Override it with `--data-dir` or the `TASKDECK_DATA_DIR` environment variable.

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod storage;
pub mod subtasks;
pub mod tags;
pub mod tasks;
pub mod theme;

pub use error::{Error, Result};
