//! Light/dark preference.

use crate::config::THEME_KEY;
use crate::models::Theme;
use crate::storage::{KeyValueStore, Storage};

/// Something that can present itself in a theme.
pub trait ThemeTarget {
    fn apply_theme(&mut self, theme: Theme);
}

pub struct ThemeService<'a, S> {
    storage: &'a Storage<S>,
    fallback: Theme,
}

impl<'a, S: KeyValueStore> ThemeService<'a, S> {
    /// `fallback` is used whenever no valid preference is stored.
    pub fn new(storage: &'a Storage<S>, fallback: Theme) -> Self {
        ThemeService { storage, fallback }
    }

    pub fn get(&self) -> Theme {
        self.storage
            .get::<Option<Theme>>(THEME_KEY, None)
            .unwrap_or(self.fallback)
    }

    pub fn set(&self, theme: Theme) -> bool {
        self.storage.set(THEME_KEY, &theme)
    }

    pub fn apply(&self, theme: Theme, target: &mut impl ThemeTarget) {
        tracing::debug!(target: "theme", "Applying {} theme", theme);
        target.apply_theme(theme);
    }

    /// Flips the stored preference and returns the new one.
    pub fn toggle(&self) -> Theme {
        let next = self.get().toggled();
        if !self.set(next) {
            tracing::warn!(target: "theme", "Theme preference not saved");
        }
        next
    }

    /// Applies the current preference to `target`.
    pub fn initialize(&self, target: &mut impl ThemeTarget) {
        self.apply(self.get(), target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[derive(Default)]
    struct Recorder(Vec<Theme>);

    impl ThemeTarget for Recorder {
        fn apply_theme(&mut self, theme: Theme) {
            self.0.push(theme);
        }
    }

    #[test]
    fn test_get_falls_back_when_unset() {
        let storage = Storage::new(MemoryStore::new());
        assert_eq!(ThemeService::new(&storage, Theme::Dark).get(), Theme::Dark);
        assert_eq!(ThemeService::new(&storage, Theme::Light).get(), Theme::Light);
    }

    #[test]
    fn test_get_ignores_unknown_stored_value() {
        let storage = Storage::new(MemoryStore::new());
        storage.set(THEME_KEY, "sepia");
        assert_eq!(ThemeService::new(&storage, Theme::Light).get(), Theme::Light);
    }

    #[test]
    fn test_set_and_toggle() {
        let storage = Storage::new(MemoryStore::new());
        let themes = ThemeService::new(&storage, Theme::Light);
        assert!(themes.set(Theme::Dark));
        assert_eq!(themes.get(), Theme::Dark);
        assert_eq!(themes.toggle(), Theme::Light);
        assert_eq!(themes.get(), Theme::Light);
        assert_eq!(storage.get(THEME_KEY, String::new()), "light");
    }

    #[test]
    fn test_initialize_applies_current() {
        let storage = Storage::new(MemoryStore::new());
        let themes = ThemeService::new(&storage, Theme::Light);
        themes.set(Theme::Dark);
        let mut recorder = Recorder::default();
        themes.initialize(&mut recorder);
        assert_eq!(recorder.0, vec![Theme::Dark]);
    }
}
