//! Persistent locale cache.
//!
//! Remembers the chosen locale between sessions. Every backend treats storage
//! failures as a cache miss on read and a no-op on write.

use crate::config::{CacheMechanism, Settings};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Cookie lifetime in days.
const COOKIE_EXPIRY_DAYS: i64 = 30;

const KEY_VALUE_FILE: &str = "locale-store.json";
const COOKIE_JAR_FILE: &str = "cookies.txt";

pub trait LocaleCache: Send + Sync {
    fn get(&self) -> Option<String>;

    fn set(&self, value: &str);
}

/// Cache that never remembers anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl LocaleCache for NoopCache {
    fn get(&self) -> Option<String> {
        None
    }

    fn set(&self, _value: &str) {}
}

/// Key-value store persisted as a JSON object file.
#[derive(Debug, Clone)]
pub struct KeyValueCache {
    path: PathBuf,
    key: String,
}

impl KeyValueCache {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    fn read_store(&self) -> std::io::Result<Map<String, Value>> {
        let raw = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "key-value store is not a JSON object",
            )),
        }
    }

    fn write_store(&self, store: &Map<String, Value>) -> std::io::Result<()> {
        let raw = serde_json::to_string_pretty(store)?;
        std::fs::write(&self.path, raw)
    }
}

impl LocaleCache for KeyValueCache {
    fn get(&self) -> Option<String> {
        match self.read_store() {
            Ok(store) => store
                .get(&self.key)
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                debug!("Locale store {} unavailable: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, value: &str) {
        let mut store = self.read_store().unwrap_or_default();
        store.insert(self.key.clone(), Value::String(value.to_string()));
        if let Err(e) = self.write_store(&store) {
            debug!("Failed to write locale store {}: {}", self.path.display(), e);
        }
    }
}

/// Cookie jar file with one `name=value;expires=<date>` line per cookie.
#[derive(Debug, Clone)]
pub struct CookieCache {
    path: PathBuf,
    name: String,
}

impl CookieCache {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// The jar as a `document.cookie`-style header, without expired cookies.
    fn cookie_header(&self, jar: &str, now: DateTime<Utc>) -> String {
        jar.lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| !is_expired(line, now))
            .map(|line| line.split(';').next().unwrap_or("").trim())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn lookup(&self, jar: &str, now: DateTime<Utc>) -> Option<String> {
        let name = urlencoding::encode(&self.name);
        let pattern = format!(
            r"(?:^{name}|;\s*{name})=(.*?)(?:;|$)",
            name = regex::escape(&name)
        );
        let regex = match Regex::new(&pattern) {
            Ok(regex) => regex,
            Err(e) => {
                debug!("Invalid cookie pattern for {}: {}", self.name, e);
                return None;
            }
        };

        let header = self.cookie_header(jar, now);
        let value = regex.captures(&header)?.get(1)?.as_str();
        percent_decode(value)
    }
}

impl LocaleCache for CookieCache {
    fn get(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(jar) => self.lookup(&jar, Utc::now()),
            Err(e) => {
                debug!("Cookie jar {} unavailable: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, value: &str) {
        let name = urlencoding::encode(&self.name);
        let expires = Utc::now() + Duration::days(COOKIE_EXPIRY_DAYS);
        let entry = format!(
            "{}={};expires={}",
            name,
            urlencoding::encode(value),
            expires.to_rfc2822()
        );

        let jar = std::fs::read_to_string(&self.path).unwrap_or_default();
        let prefix = format!("{}=", name);
        let mut lines: Vec<&str> = jar
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.starts_with(&prefix))
            .collect();
        lines.push(&entry);

        if let Err(e) = std::fs::write(&self.path, lines.join("\n") + "\n") {
            debug!("Failed to write cookie jar {}: {}", self.path.display(), e);
        }
    }
}

fn is_expired(line: &str, now: DateTime<Utc>) -> bool {
    line.split(';')
        .skip(1)
        .filter_map(|attr| attr.trim().strip_prefix("expires="))
        .filter_map(|date| DateTime::parse_from_rfc2822(date.trim()).ok())
        .any(|expires| expires.with_timezone(&Utc) <= now)
}

fn percent_decode(value: &str) -> Option<String> {
    urlencoding::decode(value).ok().map(Cow::into_owned)
}

/// Pick the cache backend for `settings`.
///
/// Without a storage directory every mechanism degrades to `NoopCache`.
pub fn cache_for(settings: &Settings, storage_dir: Option<&Path>) -> Arc<dyn LocaleCache> {
    match (settings.cache_mechanism, storage_dir) {
        (CacheMechanism::KeyValueStore, Some(dir)) => Arc::new(KeyValueCache::new(
            dir.join(KEY_VALUE_FILE),
            settings.cache_key.clone(),
        )),
        (CacheMechanism::Cookie, Some(dir)) => Arc::new(CookieCache::new(
            dir.join(COOKIE_JAR_FILE),
            settings.cache_key.clone(),
        )),
        _ => Arc::new(NoopCache),
    }
}
