use std::io::{self, Write};

use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::error::{Error, Result};
use crate::models::{Frequency, NewTask, Priority, Task, TaskFilter, TaskPatch, Theme};
use crate::recurrence::{next_due_date, parse_timestamp, RecurrenceEngine};
use crate::storage::KeyValueStore;
use crate::subtasks::SubtaskManager;
use crate::tags::{parse_tag_list, TagIndex};
use crate::tasks::TaskRepository;
use crate::theme::{ThemeService, ThemeTarget};

/// Longest title accepted from the command line.
pub const MAX_TITLE_LEN: usize = 200;

/// Listing order.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum SortKey {
    #[default]
    Created,
    Due,
    Priority,
    Title,
}

/// Table styling for the active theme.
#[derive(Debug, Clone)]
pub struct Palette {
    pub preset: &'static str,
    pub done: Color,
    pub pending: Color,
    pub overdue: Color,
    pub accent: Color,
}

impl Default for Palette {
    fn default() -> Self {
        let mut palette = Palette {
            preset: UTF8_FULL,
            done: Color::Reset,
            pending: Color::Reset,
            overdue: Color::Reset,
            accent: Color::Reset,
        };
        palette.apply_theme(Theme::Light);
        palette
    }
}

impl ThemeTarget for Palette {
    fn apply_theme(&mut self, theme: Theme) {
        match theme {
            Theme::Light => {
                self.preset = UTF8_FULL;
                self.done = Color::DarkGreen;
                self.pending = Color::DarkYellow;
                self.overdue = Color::DarkRed;
                self.accent = Color::DarkBlue;
            }
            Theme::Dark => {
                self.preset = UTF8_FULL_CONDENSED;
                self.done = Color::Green;
                self.pending = Color::Yellow;
                self.overdue = Color::Red;
                self.accent = Color::Cyan;
            }
        }
    }
}

impl Palette {
    fn priority_color(&self, priority: Priority) -> Color {
        match priority {
            Priority::High => self.overdue,
            Priority::Medium => self.pending,
            Priority::Low => self.done,
        }
    }

    fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(self.preset)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(
                headers
                    .iter()
                    .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                    .collect::<Vec<_>>(),
            );
        table
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().chars().count() > MAX_TITLE_LEN {
        return Err(Error::invalid_input(format!(
            "title is longer than {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_due(due: &str) -> Result<()> {
    parse_timestamp(due).map(|_| ())
}

/// Due dates sort before tasks without one.
fn sort_tasks(tasks: &mut [Task], key: SortKey) {
    match key {
        SortKey::Created => {}
        SortKey::Due => tasks.sort_by_key(|t| {
            (
                t.due_date.is_none(),
                t.due_date.as_deref().and_then(|d| parse_timestamp(d).ok()),
            )
        }),
        SortKey::Priority => tasks.sort_by_key(|t| t.priority.rank()),
        SortKey::Title => tasks.sort_by_key(|t| t.title.to_lowercase()),
    }
}

fn is_overdue(task: &Task) -> bool {
    !task.completed
        && task
            .due_date
            .as_deref()
            .and_then(|d| parse_timestamp(d).ok())
            .map(|d| d < chrono::Utc::now())
            .unwrap_or(false)
}

/// Adds a new task.
pub fn cmd_add<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    title: String,
    priority: Priority,
    category: Option<String>,
    due: Option<String>,
) -> Result<Task> {
    validate_title(&title)?;
    let mut new = NewTask::new(title).priority(priority);
    if let Some(category) = category {
        new = new.category(category);
    }
    if let Some(due) = due {
        validate_due(&due)?;
        new = new.due(due);
    }
    let task = repo.add(new)?;
    println!("Task added (id = {})", task.id);
    Ok(task)
}

/// Edits an existing task's details.
pub fn cmd_edit<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    id: u64,
    title: Option<String>,
    priority: Option<Priority>,
    category: Option<String>,
    due: Option<String>,
    clear_due: bool,
) -> Result<Task> {
    if let Some(t) = &title {
        validate_title(t)?;
        if t.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
    }
    if let Some(d) = &due {
        validate_due(d)?;
    }
    let patch = TaskPatch {
        title: title.map(|t| t.trim().to_string()),
        priority,
        category,
        due_date: if clear_due { Some(None) } else { due.map(Some) },
        ..Default::default()
    };
    let task = repo.update(id, patch)?;
    println!("Task {} updated.", id);
    Ok(task)
}

pub fn cmd_toggle<S: KeyValueStore>(repo: &TaskRepository<S>, id: u64) -> Result<()> {
    let task = repo.toggle(id)?;
    let state = if task.completed { "complete" } else { "pending" };
    println!("Task {} marked as {}.", id, state);
    Ok(())
}

/// Removes a task from the database by ID.
pub fn cmd_remove<S: KeyValueStore>(repo: &TaskRepository<S>, id: u64) -> Result<()> {
    if !TaskRepository::<S>::is_valid_id(id) {
        return Err(Error::InvalidId(id));
    }
    if repo.delete(id) {
        println!("Task {} removed.", id);
        Ok(())
    } else if repo.get_by_id(id).is_some() {
        Err(Error::Storage(crate::config::TASKS_KEY.to_string()))
    } else {
        Err(Error::TaskNotFound(id))
    }
}

/// Lists tasks in a formatted table.
pub fn cmd_list<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    palette: &Palette,
    filter: &TaskFilter,
    sort: SortKey,
) {
    let mut tasks = repo.get_filtered(filter);
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    sort_tasks(&mut tasks, sort);

    let mut table = palette.table(&[
        "ID", "Title", "Priority", "Category", "Due", "Tags", "Subtasks", "Recurs", "Status",
    ]);
    for t in &tasks {
        let subtasks = t.subtasks.as_deref().unwrap_or_default();
        let done = subtasks.iter().filter(|st| st.completed).count();
        let due_cell = Cell::new(t.due_date.clone().unwrap_or_default());
        let due_cell = if is_overdue(t) { due_cell.fg(palette.overdue) } else { due_cell };
        let (status, status_color) = if t.completed {
            ("Done", palette.done)
        } else {
            ("Pending", palette.pending)
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.priority).fg(palette.priority_color(t.priority)),
            Cell::new(&t.category),
            due_cell,
            Cell::new(t.tags.as_deref().unwrap_or_default().join(", ")),
            Cell::new(if subtasks.is_empty() {
                String::new()
            } else {
                format!("{}/{}", done, subtasks.len())
            }),
            Cell::new(
                t.recurring_config
                    .as_ref()
                    .filter(|c| c.is_active)
                    .map(|c| c.frequency.to_string())
                    .unwrap_or_default(),
            ),
            Cell::new(status).fg(status_color),
        ]);
    }
    println!("{table}");
}

/// Prints every field of a single task.
pub fn cmd_show<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    palette: &Palette,
    id: u64,
) -> Result<()> {
    let task = repo.get_by_id(id).ok_or(Error::TaskNotFound(id))?;
    let mut table = palette.table(&["Field", "Value"]);
    table.add_row(vec!["ID".to_string(), task.id.to_string()]);
    table.add_row(vec!["Title".to_string(), task.title.clone()]);
    let status = if task.completed { "Done" } else { "Pending" };
    table.add_row(vec!["Status".to_string(), status.to_string()]);
    table.add_row(vec!["Priority".to_string(), task.priority.to_string()]);
    table.add_row(vec!["Category".to_string(), task.category.clone()]);
    table.add_row(vec!["Created".to_string(), task.created_at.to_rfc3339()]);
    table.add_row(vec!["Due".to_string(), task.due_date.clone().unwrap_or_else(|| "-".into())]);
    table.add_row(vec!["Tags".to_string(), task.tags.clone().unwrap_or_default().join(", ")]);
    table.add_row(vec!["Notes".to_string(), task.notes.clone().unwrap_or_default()]);
    table.add_row(vec![
        "Reminders".to_string(),
        if task.reminders_enabled.unwrap_or(false) { "on" } else { "off" }.to_string(),
    ]);
    if let Some(config) = &task.recurring_config {
        table.add_row(vec![
            "Recurrence".to_string(),
            format!(
                "{} ({}), last generated {}",
                config.frequency,
                if config.is_active { "active" } else { "inactive" },
                config.last_generated.to_rfc3339()
            ),
        ]);
    }
    println!("{table}");

    if let Some(subtasks) = task.subtasks.as_ref().filter(|s| !s.is_empty()) {
        let mut sub = palette.table(&["Subtask", "Title", "Done"]);
        for st in subtasks {
            sub.add_row(vec![
                Cell::new(&st.id),
                Cell::new(&st.title),
                Cell::new(if st.completed { "x" } else { "" }).fg(palette.done),
            ]);
        }
        println!("{sub}");
    }
    Ok(())
}

pub fn cmd_stats<S: KeyValueStore>(repo: &TaskRepository<S>, palette: &Palette) {
    let stats = repo.stats();
    let mut table = palette.table(&["Total", "Completed", "Pending", "High", "Medium", "Low"]);
    table.add_row(vec![
        Cell::new(stats.total),
        Cell::new(stats.completed).fg(palette.done),
        Cell::new(stats.pending).fg(palette.pending),
        Cell::new(stats.by_priority.high),
        Cell::new(stats.by_priority.medium),
        Cell::new(stats.by_priority.low),
    ]);
    println!("{table}");
}

pub fn cmd_categories<S: KeyValueStore>(repo: &TaskRepository<S>) {
    for category in repo.categories() {
        println!("{category}");
    }
}

pub fn cmd_tag_list<S: KeyValueStore>(repo: &TaskRepository<S>) {
    let tags = TagIndex::new(repo).all_tags();
    if tags.is_empty() {
        println!("No tags found.");
    }
    for tag in tags {
        println!("{tag}");
    }
}

pub fn cmd_tag_stats<S: KeyValueStore>(repo: &TaskRepository<S>, palette: &Palette) {
    let stats = TagIndex::new(repo).tag_stats();
    if stats.is_empty() {
        println!("No tags found.");
        return;
    }
    let mut table = palette.table(&["Tag", "Tasks"]);
    for (tag, count) in stats {
        table.add_row(vec![Cell::new(tag).fg(palette.accent), Cell::new(count)]);
    }
    println!("{table}");
}

pub fn cmd_tag_add<S: KeyValueStore>(repo: &TaskRepository<S>, id: u64, tag: &str) -> Result<()> {
    let task = TagIndex::new(repo).add_tag(id, tag)?;
    println!("Task {} tags: {}", id, task.tags.unwrap_or_default().join(", "));
    Ok(())
}

pub fn cmd_tag_remove<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    id: u64,
    tag: &str,
) -> Result<()> {
    let task = TagIndex::new(repo).remove_tag(id, tag)?;
    println!("Task {} tags: {}", id, task.tags.unwrap_or_default().join(", "));
    Ok(())
}

pub fn cmd_tag_set<S: KeyValueStore>(repo: &TaskRepository<S>, id: u64, raw: &str) -> Result<()> {
    let task = TagIndex::new(repo).set_tags(id, &parse_tag_list(raw))?;
    println!("Task {} tags: {}", id, task.tags.unwrap_or_default().join(", "));
    Ok(())
}

pub fn cmd_tag_find<S: KeyValueStore>(repo: &TaskRepository<S>, palette: &Palette, tag: &str) {
    let filter = TaskFilter { tag: Some(tag.to_string()), ..Default::default() };
    cmd_list(repo, palette, &filter, SortKey::Created);
}

pub fn cmd_subtask_add<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    id: u64,
    title: &str,
) -> Result<()> {
    validate_title(title)?;
    let task = SubtaskManager::new(repo).add(id, title)?;
    if let Some(st) = task.subtasks.as_ref().and_then(|s| s.last()) {
        println!("Subtask {} added to task {}.", st.id, id);
    }
    Ok(())
}

pub fn cmd_subtask_toggle<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    id: u64,
    subtask_id: &str,
) -> Result<()> {
    SubtaskManager::new(repo).toggle(id, subtask_id)?;
    println!("Subtask {} toggled.", subtask_id);
    Ok(())
}

pub fn cmd_subtask_remove<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    id: u64,
    subtask_id: &str,
) -> Result<()> {
    SubtaskManager::new(repo).delete(id, subtask_id)?;
    println!("Subtask {} removed.", subtask_id);
    Ok(())
}

pub fn cmd_subtask_rename<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    id: u64,
    subtask_id: &str,
    title: &str,
) -> Result<()> {
    validate_title(title)?;
    SubtaskManager::new(repo).update_title(id, subtask_id, title)?;
    println!("Subtask {} renamed.", subtask_id);
    Ok(())
}

pub fn cmd_subtask_stats<S: KeyValueStore>(repo: &TaskRepository<S>, id: u64) -> Result<()> {
    let stats = SubtaskManager::new(repo).stats(id).ok_or(Error::TaskNotFound(id))?;
    println!("{}/{} subtasks completed", stats.completed, stats.total);
    Ok(())
}

pub fn cmd_notes_set<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    id: u64,
    notes: &str,
) -> Result<()> {
    repo.set_notes(id, notes)?;
    println!("Notes saved for task {}.", id);
    Ok(())
}

pub fn cmd_notes_show<S: KeyValueStore>(repo: &TaskRepository<S>, id: u64) -> Result<()> {
    let notes = repo.notes(id).ok_or(Error::TaskNotFound(id))?;
    if notes.is_empty() {
        println!("No notes.");
    } else {
        println!("{notes}");
    }
    Ok(())
}

pub fn cmd_notes_clear<S: KeyValueStore>(repo: &TaskRepository<S>, id: u64) -> Result<()> {
    repo.clear_notes(id)?;
    println!("Notes cleared for task {}.", id);
    Ok(())
}

pub fn cmd_remind<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    id: u64,
    enabled: bool,
) -> Result<()> {
    repo.set_reminders(id, enabled)?;
    println!("Reminders {} for task {}.", if enabled { "enabled" } else { "disabled" }, id);
    Ok(())
}

pub fn cmd_recur_set<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    id: u64,
    frequency: Frequency,
) -> Result<()> {
    RecurrenceEngine::new(repo).make_recurring(id, frequency)?;
    println!("Task {} now recurs {}.", id, frequency);
    Ok(())
}

pub fn cmd_recur_stop<S: KeyValueStore>(repo: &TaskRepository<S>, id: u64) -> Result<()> {
    RecurrenceEngine::new(repo).stop_recurring(id)?;
    println!("Task {} no longer recurs.", id);
    Ok(())
}

pub fn cmd_recur_list<S: KeyValueStore>(repo: &TaskRepository<S>, palette: &Palette) {
    let filter = TaskFilter { recurring_only: true, ..Default::default() };
    cmd_list(repo, palette, &filter, SortKey::Created);
}

/// Prints the due date that follows `from` without touching any task.
pub fn cmd_recur_next(from: &str, frequency: Frequency) -> Result<()> {
    println!("{}", next_due_date(from, frequency)?);
    Ok(())
}

pub fn cmd_recur_generate<S: KeyValueStore>(repo: &TaskRepository<S>, id: u64) -> Result<()> {
    let task = repo.get_by_id(id).ok_or(Error::TaskNotFound(id))?;
    let created = RecurrenceEngine::new(repo).generate_next_occurrence(&task)?;
    println!(
        "Recurring task created (id = {}) due on {}",
        created.id,
        created.due_date.as_deref().unwrap_or("-")
    );
    Ok(())
}

/// Generates every recurring occurrence that is due. Quiet when nothing is.
pub fn cmd_recur_auto<S: KeyValueStore>(repo: &TaskRepository<S>) -> Vec<Task> {
    let created = RecurrenceEngine::new(repo).auto_generate_due();
    for t in &created {
        println!(
            "Recurring task created (id = {}) due on {}",
            t.id,
            t.due_date.as_deref().unwrap_or("-")
        );
    }
    created
}

pub fn cmd_theme_show<S: KeyValueStore>(themes: &ThemeService<'_, S>) {
    println!("{}", themes.get());
}

pub fn cmd_theme_set<S: KeyValueStore>(themes: &ThemeService<'_, S>, theme: Theme) -> Result<()> {
    if !themes.set(theme) {
        return Err(Error::Storage(crate::config::THEME_KEY.to_string()));
    }
    println!("Theme set to {}.", theme);
    Ok(())
}

pub fn cmd_theme_toggle<S: KeyValueStore>(themes: &ThemeService<'_, S>) {
    println!("Theme set to {}.", themes.toggle());
}

/// Deletes all tasks and the theme preference.
pub fn cmd_reset<S: KeyValueStore>(repo: &TaskRepository<S>, force: bool) -> Result<()> {
    if !force {
        print!(
            "Are you sure you want to delete all tasks and settings? This cannot be undone. [y/N] "
        );
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    if repo.storage().clear_all() {
        println!("Storage reset successfully.");
        Ok(())
    } else {
        Err(Error::Storage("all keys".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: u64, title: &str, priority: Priority, due: Option<&str>) -> Task {
        Task {
            id,
            title: title.into(),
            completed: false,
            created_at: Utc::now(),
            due_date: due.map(str::to_string),
            priority,
            category: "General".into(),
            tags: None,
            notes: None,
            subtasks: None,
            recurring_config: None,
            reminders_enabled: None,
        }
    }

    #[test]
    fn test_sort_by_due_puts_undated_last() {
        let mut tasks = vec![
            task(1, "a", Priority::Low, None),
            task(2, "b", Priority::Low, Some("2024-03-01")),
            task(3, "c", Priority::Low, Some("2024-01-01")),
        ];
        sort_tasks(&mut tasks, SortKey::Due);
        let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_by_priority_is_stable() {
        let mut tasks = vec![
            task(1, "a", Priority::Low, None),
            task(2, "b", Priority::High, None),
            task(3, "c", Priority::High, None),
        ];
        sort_tasks(&mut tasks, SortKey::Priority);
        let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_validate_title_length() {
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn test_palette_follows_theme() {
        let mut palette = Palette::default();
        palette.apply_theme(Theme::Dark);
        assert_eq!(palette.preset, UTF8_FULL_CONDENSED);
        palette.apply_theme(Theme::Light);
        assert_eq!(palette.preset, UTF8_FULL);
    }
}
