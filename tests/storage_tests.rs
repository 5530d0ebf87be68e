use taskdeck::config::{TASKS_KEY, THEME_KEY};
use taskdeck::models::{NewTask, Theme};
use taskdeck::storage::{FileStore, KeyValueStore, Storage};
use taskdeck::tasks::TaskRepository;
use taskdeck::theme::ThemeService;
use tempfile::TempDir;

#[test]
fn test_tasks_survive_reopening() {
    let dir = TempDir::new().unwrap();
    {
        let repo = TaskRepository::new(Storage::new(FileStore::new(dir.path())));
        repo.add(NewTask::new("persisted")).unwrap();
    }
    let repo = TaskRepository::new(Storage::new(FileStore::new(dir.path())));
    let tasks = repo.get_all();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "persisted");
}

#[test]
fn test_creates_missing_data_dir() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");
    let storage = Storage::new(FileStore::new(&nested));
    assert!(storage.set(THEME_KEY, &Theme::Dark));
    assert!(nested.join("theme_preference.json").exists());
}

#[test]
fn test_corrupt_file_reads_as_default() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tasks_v1.json"), "not json at all").unwrap();
    let repo = TaskRepository::new(Storage::new(FileStore::new(dir.path())));
    assert!(repo.get_all().is_empty());
}

#[test]
fn test_write_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.write(TASKS_KEY, "[]").unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["tasks_v1.json"]);
}

#[test]
fn test_delete_missing_key_is_ok() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::new(FileStore::new(dir.path()));
    assert!(storage.remove(TASKS_KEY));
    assert!(storage.clear_all());
}

#[test]
fn test_theme_falls_back_until_set() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::new(FileStore::new(dir.path()));
    let themes = ThemeService::new(&storage, Theme::Dark);
    assert_eq!(themes.get(), Theme::Dark);

    std::fs::write(dir.path().join("theme_preference.json"), "\"purple\"").unwrap();
    assert_eq!(themes.get(), Theme::Dark);

    assert!(themes.set(Theme::Light));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("theme_preference.json")).unwrap(),
        "\"light\""
    );
    assert_eq!(themes.get(), Theme::Light);
}

#[test]
fn test_failed_write_removes_temp_file() {
    let dir = TempDir::new().unwrap();
    // A directory where the data file should go makes the final rename fail.
    std::fs::create_dir(dir.path().join("tasks_v1.json")).unwrap();
    let store = FileStore::new(dir.path());

    assert!(store.write(TASKS_KEY, "[]").is_err());
    assert!(!dir.path().join("tasks_v1.json.tmp").exists());
}
