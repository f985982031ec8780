//! Locale detection on first load.
//!
//! Priority, short-circuiting: cached locale, locale in the current path,
//! preferred browser language. Each stage only yields supported locales.

use crate::cache::LocaleCache;
use crate::config::Settings;
use crate::i18n::LocaleSet;
use std::sync::Arc;
use tracing::debug;

/// What the host knows about the user's context.
pub trait HostEnvironment: Send + Sync {
    /// Current location path, e.g. `/fr/about?x=1`.
    fn current_path(&self) -> String;

    /// Preferred languages, most preferred first.
    fn preferred_languages(&self) -> Vec<String>;
}

/// Fixed environment values.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pub path: String,
    pub languages: Vec<String>,
}

impl StaticEnvironment {
    pub fn new(path: impl Into<String>, languages: Vec<String>) -> Self {
        Self {
            path: path.into(),
            languages,
        }
    }

    /// Languages from `LANGUAGE` (colon separated) or `LANG`.
    pub fn from_env(path: impl Into<String>) -> Self {
        let languages = std::env::var("LANGUAGE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.split(':').map(str::to_string).collect())
            .or_else(|| std::env::var("LANG").ok().map(|v| vec![v]))
            .unwrap_or_default();

        Self::new(path, languages)
    }
}

impl HostEnvironment for StaticEnvironment {
    fn current_path(&self) -> String {
        self.path.clone()
    }

    fn preferred_languages(&self) -> Vec<String> {
        self.languages.clone()
    }
}

/// Locale found in `url`, if any.
///
/// Fragment and query are dropped; the segment after the leading slash is
/// checked first, then the first token for paths without a leading slash.
pub fn location_locale(url: &str, locales: &LocaleSet) -> Option<String> {
    let path = url.split('#').next().unwrap_or("");
    let path = path.split('?').next().unwrap_or("");
    let slices: Vec<&str> = path.split('/').collect();

    if let Some(code) = slices.get(1).and_then(|s| locales.find(s)) {
        return Some(code);
    }
    slices.first().and_then(|s| locales.find(s))
}

/// Strip the region part of a language tag: `en-US` → `en`, `fr_CA.UTF-8` → `fr`.
fn normalize_language(tag: &str) -> &str {
    let tag = tag.split('.').next().unwrap_or(tag);
    match tag.find(|c: char| c == '-' || c == '_') {
        Some(index) => &tag[..index],
        None => tag,
    }
}

pub struct LocaleDetector {
    settings: Settings,
    cache: Arc<dyn LocaleCache>,
    environment: Arc<dyn HostEnvironment>,
}

impl LocaleDetector {
    pub fn new(
        settings: Settings,
        cache: Arc<dyn LocaleCache>,
        environment: Arc<dyn HostEnvironment>,
    ) -> Self {
        Self {
            settings,
            cache,
            environment,
        }
    }

    /// Pick the locale to activate, or `None` so the caller applies its default.
    pub fn detect(&self, locales: &LocaleSet) -> Option<String> {
        if let Some(locale) = self.cached_locale(locales) {
            debug!("Detected cached locale {}", locale);
            return Some(locale);
        }
        if let Some(locale) = location_locale(&self.environment.current_path(), locales) {
            debug!("Detected locale {} from location", locale);
            return Some(locale);
        }
        if let Some(locale) = self.browser_locale(locales) {
            debug!("Detected browser locale {}", locale);
            return Some(locale);
        }
        None
    }

    /// Remember `locale` once it is confirmed active.
    pub fn cache_locale(&self, locale: &str) {
        if self.settings.use_cached_locale {
            self.cache.set(locale);
        }
    }

    fn cached_locale(&self, locales: &LocaleSet) -> Option<String> {
        if !self.settings.use_cached_locale {
            return None;
        }
        self.cache.get().and_then(|cached| locales.find(&cached))
    }

    fn browser_locale(&self, locales: &LocaleSet) -> Option<String> {
        let preferred = self.environment.preferred_languages();
        let first = preferred.first()?;
        locales.find(normalize_language(first))
    }
}

impl std::fmt::Debug for LocaleDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleDetector")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
