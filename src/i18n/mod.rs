//! Locales and route dictionaries.
//!
//! # Architecture
//!
//! - `locale`: the ordered set of supported locales and its default
//! - `dictionary`: per-locale key → string mappings and the providers that supply them
//!
//! # Example
//!
//! ```rust,ignore
//! use route_localizer::i18n::{Dictionary, LocaleSet, StaticDictionaryProvider};
//!
//! let locales = LocaleSet::new(["en", "fr"], "en")?;
//! let provider = StaticDictionaryProvider::new()
//!     .with_locale("fr", Dictionary::from_pairs([("routes.about", "a-propos")]));
//! ```

mod dictionary;
mod locale;

pub use dictionary::{
    Dictionary, DictionaryProvider, JsonDirectoryProvider, StaticDictionaryProvider, ROUTES_NAMESPACE,
};
pub use locale::LocaleSet;
