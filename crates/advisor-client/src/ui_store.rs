//! UI preferences: theme, language, layout, search history and display settings.
//!
//! Initialization has two phases. [`UiStore::load`] reads persisted values and
//! touches nothing interactive, so it is safe during pre-rendering.
//! [`UiStore::attach`] is only called once an interactive display exists; it resolves
//! `auto` against the system preference and starts reacting to its changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::persistence::PreferenceStore;

pub const THEME_KEY: &str = "ui-theme";
pub const LANGUAGE_KEY: &str = "ui-language";
pub const LAYOUT_KEY: &str = "ui-layout";
pub const SEARCH_HISTORY_KEY: &str = "ui-search-history";
pub const PREFERENCES_KEY: &str = "ui-preferences";

pub const MAX_SEARCH_HISTORY: usize = 20;
pub const RECENT_SEARCHES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }

    /// light -> dark -> auto -> light
    pub fn next(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Auto,
            Theme::Auto => Theme::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "auto" => Ok(Theme::Auto),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Hu,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hu => "hu",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Language::En),
            "hu" => Ok(Language::Hu),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Grid,
    List,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Grid => "grid",
            Layout::List => "list",
        }
    }

    pub fn toggled(&self) -> Layout {
        match self {
            Layout::Grid => Layout::List,
            Layout::List => Layout::Grid,
        }
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(Layout::Grid),
            "list" => Ok(Layout::List),
            other => Err(format!("unknown layout: {other}")),
        }
    }
}

/// Theme actually applied to the display once `auto` is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTheme {
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayPreferences {
    pub max_results: u32,
    pub enable_animations: bool,
    pub compact_mode: bool,
    pub show_confidence: bool,
    /// When false, preference updates stay in memory only.
    pub auto_save: bool,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            max_results: 3,
            enable_animations: true,
            compact_mode: false,
            show_confidence: true,
            auto_save: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencesPatch {
    pub max_results: Option<u32>,
    pub enable_animations: Option<bool>,
    pub compact_mode: Option<bool>,
    pub show_confidence: Option<bool>,
    pub auto_save: Option<bool>,
}

impl DisplayPreferences {
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(v) = patch.max_results {
            self.max_results = v;
        }
        if let Some(v) = patch.enable_animations {
            self.enable_animations = v;
        }
        if let Some(v) = patch.compact_mode {
            self.compact_mode = v;
        }
        if let Some(v) = patch.show_confidence {
            self.show_confidence = v;
        }
        if let Some(v) = patch.auto_save {
            self.auto_save = v;
        }
    }
}

/// An interactive display: knows the system color scheme and renders a theme.
pub trait DisplayContext: Send + Sync {
    fn prefers_dark(&self) -> bool;

    fn apply_theme(&self, theme: ResolvedTheme);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub theme: Theme,
    pub language: Language,
    pub layout: Layout,
    /// Oldest first.
    pub search_history: Vec<String>,
    pub preferences: DisplayPreferences,
}

pub struct UiStore<S> {
    store: S,
    state: UiState,
    context: Option<Box<dyn DisplayContext>>,
}

impl<S: PreferenceStore> UiStore<S> {
    /// Phase one: read persisted values. Unknown or malformed values fall back to
    /// defaults.
    pub async fn load(store: S) -> Self {
        let theme = parse_or_default(store.get(THEME_KEY).await, THEME_KEY);
        let language = parse_or_default(store.get(LANGUAGE_KEY).await, LANGUAGE_KEY);
        let layout = parse_or_default(store.get(LAYOUT_KEY).await, LAYOUT_KEY);

        let search_history = store
            .get(SEARCH_HISTORY_KEY)
            .await
            .and_then(|raw| {
                serde_json::from_str::<Vec<String>>(&raw)
                    .inspect_err(|e| warn!(error = %e, "malformed search history, starting empty"))
                    .ok()
            })
            .unwrap_or_default();

        let preferences = store
            .get(PREFERENCES_KEY)
            .await
            .and_then(|raw| {
                serde_json::from_str::<DisplayPreferences>(&raw)
                    .inspect_err(|e| warn!(error = %e, "malformed preferences, using defaults"))
                    .ok()
            })
            .unwrap_or_default();

        Self {
            store,
            state: UiState {
                theme,
                language,
                layout,
                search_history,
                preferences,
            },
            context: None,
        }
    }

    /// Phase two: bind to an interactive display and apply the resolved theme.
    pub fn attach(&mut self, context: Box<dyn DisplayContext>) {
        self.context = Some(context);
        self.apply_theme();
    }

    /// Called by the display when the system color scheme changes.
    pub fn system_theme_changed(&self) {
        if self.state.theme == Theme::Auto {
            self.apply_theme();
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn is_dark(&self) -> bool {
        self.resolved_theme() == ResolvedTheme::Dark
    }

    /// Without an attached display, `auto` resolves to light.
    pub fn resolved_theme(&self) -> ResolvedTheme {
        match self.state.theme {
            Theme::Light => ResolvedTheme::Light,
            Theme::Dark => ResolvedTheme::Dark,
            Theme::Auto => match &self.context {
                Some(ctx) if ctx.prefers_dark() => ResolvedTheme::Dark,
                _ => ResolvedTheme::Light,
            },
        }
    }

    /// Last five searches, most recent first.
    pub fn recent_searches(&self) -> Vec<&str> {
        self.state
            .search_history
            .iter()
            .rev()
            .take(RECENT_SEARCHES)
            .map(String::as_str)
            .collect()
    }

    pub async fn set_theme(&mut self, theme: Theme) {
        self.state.theme = theme;
        self.persist(THEME_KEY, theme.as_str()).await;
        self.apply_theme();
    }

    pub async fn toggle_theme(&mut self) {
        self.set_theme(self.state.theme.next()).await;
    }

    pub async fn set_language(&mut self, language: Language) {
        self.state.language = language;
        self.persist(LANGUAGE_KEY, language.as_str()).await;
    }

    pub async fn set_layout(&mut self, layout: Layout) {
        self.state.layout = layout;
        self.persist(LAYOUT_KEY, layout.as_str()).await;
    }

    pub async fn toggle_layout(&mut self) {
        self.set_layout(self.state.layout.toggled()).await;
    }

    /// Blank queries and exact duplicates are ignored; only the newest 20 are kept.
    pub async fn add_to_search_history(&mut self, query: &str) {
        if query.trim().is_empty() || self.state.search_history.iter().any(|q| q == query) {
            return;
        }
        self.state.search_history.push(query.to_string());
        if self.state.search_history.len() > MAX_SEARCH_HISTORY {
            let excess = self.state.search_history.len() - MAX_SEARCH_HISTORY;
            self.state.search_history.drain(..excess);
        }
        self.persist_history().await;
    }

    pub async fn remove_from_search_history(&mut self, query: &str) {
        let Some(index) = self.state.search_history.iter().position(|q| q == query) else {
            return;
        };
        self.state.search_history.remove(index);
        self.persist_history().await;
    }

    pub async fn clear_search_history(&mut self) {
        self.state.search_history.clear();
        self.persist_history().await;
    }

    pub async fn update_preferences(&mut self, patch: PreferencesPatch) {
        self.state.preferences.apply(patch);
        if !self.state.preferences.auto_save {
            return;
        }
        match serde_json::to_string(&self.state.preferences) {
            Ok(raw) => self.persist(PREFERENCES_KEY, &raw).await,
            Err(e) => warn!(error = %e, "failed to encode preferences"),
        }
    }

    fn apply_theme(&self) {
        if let Some(ctx) = &self.context {
            ctx.apply_theme(self.resolved_theme());
        }
    }

    async fn persist_history(&self) {
        match serde_json::to_string(&self.state.search_history) {
            Ok(raw) => self.persist(SEARCH_HISTORY_KEY, &raw).await,
            Err(e) => warn!(error = %e, "failed to encode search history"),
        }
    }

    async fn persist(&self, key: &str, value: &str) {
        if !self.store.set(key, value).await {
            debug!(key, "preference write not persisted");
        }
    }
}

fn parse_or_default<T: FromStr + Default>(raw: Option<String>, key: &str) -> T {
    match raw {
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unknown persisted value, using default");
            T::default()
        }),
        None => T::default(),
    }
}
