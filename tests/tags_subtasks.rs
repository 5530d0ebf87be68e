use taskdeck::models::{NewTask, TaskPatch};
use taskdeck::storage::{MemoryStore, Storage};
use taskdeck::subtasks::SubtaskManager;
use taskdeck::tags::TagIndex;
use taskdeck::tasks::TaskRepository;
use taskdeck::Error;

fn repo() -> TaskRepository<MemoryStore> {
    TaskRepository::new(Storage::new(MemoryStore::new()))
}

#[test]
fn test_all_tags_sorted_unique_case_sensitive() {
    let repo = repo();
    let a = repo.add(NewTask::new("a")).unwrap();
    let b = repo.add(NewTask::new("b")).unwrap();
    let tags = TagIndex::new(&repo);
    tags.set_tags(a.id, &["work", "Urgent"]).unwrap();
    tags.set_tags(b.id, &["work", "home"]).unwrap();

    assert_eq!(tags.all_tags(), vec!["Urgent", "home", "work"]);
}

#[test]
fn test_tag_stats_count_literally() {
    let repo = repo();
    let a = repo.add(NewTask::new("a")).unwrap();
    let b = repo.add(NewTask::new("b")).unwrap();
    let tags = TagIndex::new(&repo);
    tags.set_tags(a.id, &["work", "work"]).unwrap();
    tags.set_tags(b.id, &["work", "home"]).unwrap();

    let stats = tags.tag_stats();
    assert_eq!(stats["work"], 3);
    assert_eq!(stats["home"], 1);
}

#[test]
fn test_set_tags_trims_and_drops_blanks() {
    let repo = repo();
    let task = repo.add(NewTask::new("a")).unwrap();
    let updated = TagIndex::new(&repo).set_tags(task.id, &["a", "", "  b  "]).unwrap();
    assert_eq!(updated.tags, Some(vec!["a".to_string(), "b".to_string()]));
}

#[test]
fn test_set_tags_unknown_task() {
    let repo = repo();
    assert!(matches!(
        TagIndex::new(&repo).set_tags(3, &["x"]),
        Err(Error::TaskNotFound(3))
    ));
}

#[test]
fn test_add_tag_is_idempotent() {
    let repo = repo();
    let task = repo.add(NewTask::new("a")).unwrap();
    let tags = TagIndex::new(&repo);
    tags.add_tag(task.id, " urgent ").unwrap();
    let again = tags.add_tag(task.id, "urgent").unwrap();
    assert_eq!(again.tags, Some(vec!["urgent".to_string()]));
}

#[test]
fn test_add_tag_errors() {
    let repo = repo();
    let task = repo.add(NewTask::new("a")).unwrap();
    let tags = TagIndex::new(&repo);
    assert!(matches!(tags.add_tag(task.id, "   "), Err(Error::EmptyTag)));
    assert!(matches!(tags.add_tag(42, "x"), Err(Error::TaskNotFound(42))));
}

#[test]
fn test_remove_tag() {
    let repo = repo();
    let task = repo.add(NewTask::new("a")).unwrap();
    let tags = TagIndex::new(&repo);

    // No tags at all: unchanged, not an error.
    let untouched = tags.remove_tag(task.id, "x").unwrap();
    assert_eq!(untouched.tags, None);

    tags.set_tags(task.id, &["a", "b"]).unwrap();
    let updated = tags.remove_tag(task.id, "a").unwrap();
    assert_eq!(updated.tags, Some(vec!["b".to_string()]));
    assert!(matches!(tags.remove_tag(9, "a"), Err(Error::TaskNotFound(9))));
}

#[test]
fn test_tasks_by_tag() {
    let repo = repo();
    let a = repo.add(NewTask::new("a")).unwrap();
    repo.add(NewTask::new("b")).unwrap();
    let tags = TagIndex::new(&repo);
    tags.add_tag(a.id, "home").unwrap();

    let found = tags.tasks_by_tag("home");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, a.id);
    assert!(tags.tasks_by_tag("Home").is_empty());
}

#[test]
fn test_subtask_lifecycle() {
    let repo = repo();
    let task = repo.add(NewTask::new("parent")).unwrap();
    let subtasks = SubtaskManager::new(&repo);

    assert_eq!(subtasks.stats(task.id).unwrap().total, 0);

    let with_one = subtasks.add(task.id, "  first  ").unwrap();
    let first = with_one.subtasks.unwrap()[0].clone();
    assert_eq!(first.title, "first");
    assert!(!first.completed);

    let with_two = subtasks.add(task.id, "second").unwrap();
    let ids: Vec<String> = with_two.subtasks.unwrap().into_iter().map(|st| st.id).collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);

    let toggled = subtasks.toggle(task.id, &first.id).unwrap();
    assert!(toggled.subtasks.unwrap()[0].completed);
    let stats = subtasks.stats(task.id).unwrap();
    assert_eq!((stats.total, stats.completed), (2, 1));

    let renamed = subtasks.update_title(task.id, &first.id, "renamed").unwrap();
    assert_eq!(renamed.subtasks.unwrap()[0].title, "renamed");

    let remaining = subtasks.delete(task.id, &first.id).unwrap();
    assert_eq!(remaining.subtasks.unwrap().len(), 1);
}

#[test]
fn test_add_subtask_to_missing_task_leaves_storage_untouched() {
    let repo = repo();
    repo.add(NewTask::new("only")).unwrap();
    let before = repo.get_all();

    let result = SubtaskManager::new(&repo).add(99, "orphan");
    assert!(matches!(result, Err(Error::TaskNotFound(99))));
    assert_eq!(repo.get_all(), before);
}

#[test]
fn test_subtask_not_found_cases() {
    let repo = repo();
    let task = repo.add(NewTask::new("parent")).unwrap();
    let subtasks = SubtaskManager::new(&repo);

    // Task has no subtask list yet.
    assert!(matches!(subtasks.toggle(task.id, "nope"), Err(Error::SubtaskNotFound { .. })));

    subtasks.add(task.id, "real").unwrap();
    let before = repo.get_by_id(task.id).unwrap();
    assert!(matches!(subtasks.toggle(task.id, "nope"), Err(Error::SubtaskNotFound { .. })));
    assert!(matches!(subtasks.delete(task.id, "nope"), Err(Error::SubtaskNotFound { .. })));
    assert!(matches!(
        subtasks.update_title(task.id, "nope", "x"),
        Err(Error::SubtaskNotFound { .. })
    ));
    assert_eq!(repo.get_by_id(task.id).unwrap(), before);
}

#[test]
fn test_subtask_title_validation() {
    let repo = repo();
    let task = repo.add(NewTask::new("parent")).unwrap();
    let subtasks = SubtaskManager::new(&repo);
    assert!(matches!(subtasks.add(task.id, "  "), Err(Error::EmptyTitle)));

    let st = subtasks.add(task.id, "real").unwrap().subtasks.unwrap()[0].id.clone();
    assert!(matches!(subtasks.update_title(task.id, &st, " "), Err(Error::EmptyTitle)));
}

#[test]
fn test_subtask_stats_missing_task() {
    let repo = repo();
    assert_eq!(SubtaskManager::new(&repo).stats(1), None);
}

#[test]
fn test_subtasks_survive_unrelated_updates() {
    let repo = repo();
    let task = repo.add(NewTask::new("parent")).unwrap();
    SubtaskManager::new(&repo).add(task.id, "keep me").unwrap();
    repo.update(task.id, TaskPatch { title: Some("renamed".into()), ..Default::default() })
        .unwrap();
    assert_eq!(repo.get_by_id(task.id).unwrap().subtasks.unwrap().len(), 1);
}
