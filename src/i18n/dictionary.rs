//! Route dictionaries and their providers.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Namespace prepended to every route segment before lookup.
pub const ROUTES_NAMESPACE: &str = "routes.";

/// Flat key → string mapping for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: HashMap<String, String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Flatten a JSON document into dotted keys.
    ///
    /// `{"routes": {"home": "accueil"}}` becomes `routes.home → accueil`.
    /// Non-string leaves are ignored.
    pub fn from_json(value: &Value) -> Self {
        let mut entries = HashMap::new();
        flatten_json(value, String::new(), &mut entries);
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Localized value of one route segment.
    ///
    /// `None` when the key is missing, empty, or resolves to the namespaced key
    /// itself (the value providers echo back for unresolved keys).
    pub fn route_segment(&self, segment: &str) -> Option<&str> {
        let key = format!("{}{}", ROUTES_NAMESPACE, segment);
        match self.get(&key) {
            Some(value) if value.is_empty() => None,
            Some(value) if value.eq_ignore_ascii_case(&key) => None,
            other => other,
        }
    }
}

fn flatten_json(value: &Value, prefix: String, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let next = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_json(child, next, out);
            }
        }
        Value::String(text) if !prefix.is_empty() => {
            out.insert(prefix, text.clone());
        }
        _ => {}
    }
}

/// Supplies dictionaries, one locale at a time.
pub trait DictionaryProvider: Send + Sync {
    /// Resolve the dictionary for `locale`. May suspend.
    fn dictionary<'a>(&'a self, locale: &'a str) -> BoxFuture<'a, Result<Dictionary>>;

    fn set_default_locale(&self, _locale: &str) {}

    fn set_active_locale(&self, _locale: &str) {}
}

/// In-memory provider, mainly for embedding prebuilt dictionaries.
///
/// Locales without a registered dictionary resolve to an empty one.
#[derive(Debug, Default)]
pub struct StaticDictionaryProvider {
    dictionaries: HashMap<String, Arc<Dictionary>>,
    default_locale: Mutex<Option<String>>,
    active_locale: Mutex<Option<String>>,
}

impl StaticDictionaryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: impl Into<String>, dictionary: Dictionary) -> Self {
        self.dictionaries.insert(locale.into(), Arc::new(dictionary));
        self
    }

    pub fn default_locale(&self) -> Option<String> {
        self.default_locale
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn active_locale(&self) -> Option<String> {
        self.active_locale
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl DictionaryProvider for StaticDictionaryProvider {
    fn dictionary<'a>(&'a self, locale: &'a str) -> BoxFuture<'a, Result<Dictionary>> {
        Box::pin(async move {
            Ok(self
                .dictionaries
                .get(locale)
                .map(|d| d.as_ref().clone())
                .unwrap_or_default())
        })
    }

    fn set_default_locale(&self, locale: &str) {
        *self.default_locale.lock().unwrap_or_else(|e| e.into_inner()) = Some(locale.to_string());
    }

    fn set_active_locale(&self, locale: &str) {
        *self.active_locale.lock().unwrap_or_else(|e| e.into_inner()) = Some(locale.to_string());
    }
}

/// Reads `<dir>/<locale>.json` on every request.
#[derive(Debug, Clone)]
pub struct JsonDirectoryProvider {
    dir: PathBuf,
}

impl JsonDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DictionaryProvider for JsonDirectoryProvider {
    fn dictionary<'a>(&'a self, locale: &'a str) -> BoxFuture<'a, Result<Dictionary>> {
        Box::pin(async move {
            let path = self.dir.join(format!("{}.json", locale));
            debug!("Loading dictionary from {}", path.display());

            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read dictionary {}", path.display()))?;
            let value: Value = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse dictionary {}", path.display()))?;

            Ok(Dictionary::from_json(&value))
        })
    }
}
