//! Client-local UI preferences.
//!
//! A handful of flags that survive restarts without going through the
//! server: whether the sidebar is open, which sidebar areas are collapsed and
//! the color theme. They are read once at startup and written back on every
//! toggle.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::domain::AreaId;

const SIDEBAR_OPEN: &str = "sidebar-open";
const COLLAPSED_AREAS: &str = "collapsed-areas";
const THEME: &str = "theme";

/// A string key-value store owned by the embedding application.
pub trait PreferenceStore: Send + Sync {
    /// Reads the value stored under `name`.
    fn get(&self, name: &str) -> Option<String>;

    /// Stores `value` under `name`.
    fn set(&self, name: &str, value: String);
}

/// A [`PreferenceStore`] that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<FxHashMap<String, String>>,
}

impl MemoryPreferenceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, name: &str) -> Option<String> {
        self.values.read().get(name).cloned()
    }

    fn set(&self, name: &str, value: String) {
        self.values.write().insert(name.to_string(), value);
    }
}

/// Color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    /// Light colors.
    Light,
    /// Dark colors.
    Dark,
    /// Follow the operating system.
    #[default]
    System,
}

impl Theme {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

/// The persisted UI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiPreferences {
    /// The sidebar is shown.
    pub sidebar_open: bool,
    /// Areas whose project list is folded in the sidebar.
    pub collapsed_areas: BTreeSet<AreaId>,
    /// Color theme.
    pub theme: Theme,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            collapsed_areas: BTreeSet::new(),
            theme: Theme::System,
        }
    }
}

impl UiPreferences {
    /// Reads the flags from `store`. Missing or unreadable values fall back to
    /// their defaults.
    #[must_use]
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let defaults = Self::default();
        let sidebar_open = store
            .get(SIDEBAR_OPEN)
            .map_or(defaults.sidebar_open, |value| value != "false");
        let collapsed_areas = store
            .get(COLLAPSED_AREAS)
            .and_then(|value| match serde_json::from_str(&value) {
                Ok(areas) => Some(areas),
                Err(error) => {
                    tracing::debug!(error = %error, "ignored unreadable collapsed areas");
                    None
                }
            })
            .unwrap_or_default();
        let theme = store
            .get(THEME)
            .and_then(|value| Theme::parse(&value))
            .unwrap_or(defaults.theme);
        Self {
            sidebar_open,
            collapsed_areas,
            theme,
        }
    }

    /// Flips the sidebar flag and persists it. Returns the new value.
    pub fn toggle_sidebar(&mut self, store: &dyn PreferenceStore) -> bool {
        self.sidebar_open = !self.sidebar_open;
        store.set(SIDEBAR_OPEN, self.sidebar_open.to_string());
        self.sidebar_open
    }

    /// Folds or unfolds `area` and persists the set. Returns `true` if the
    /// area is now collapsed.
    ///
    /// # Errors
    ///
    /// Returns the encoding error; the in-memory flag is still flipped.
    pub fn toggle_area(
        &mut self,
        area: AreaId,
        store: &dyn PreferenceStore,
    ) -> Result<bool, serde_json::Error> {
        let collapsed = if self.collapsed_areas.remove(&area) {
            false
        } else {
            self.collapsed_areas.insert(area);
            true
        };
        store.set(COLLAPSED_AREAS, serde_json::to_string(&self.collapsed_areas)?);
        Ok(collapsed)
    }

    /// Sets and persists the theme.
    pub fn set_theme(&mut self, theme: Theme, store: &dyn PreferenceStore) {
        self.theme = theme;
        store.set(THEME, theme.as_str().to_string());
    }
}
