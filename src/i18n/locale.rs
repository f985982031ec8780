//! Supported locales.

use crate::error::{LocalizeError, Result};

/// Ordered set of supported locale codes plus the default locale.
///
/// Immutable once built. An empty set is valid and disables localization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSet {
    locales: Vec<String>,
    default_locale: String,
}

impl LocaleSet {
    /// Build a locale set, dropping duplicates while keeping first-seen order.
    ///
    /// # Returns
    /// * `Ok(LocaleSet)` if `default_locale` is one of `locales`
    /// * `Err(InvalidLocaleSet)` if it is not, or if a code is blank
    pub fn new<I, S>(locales: I, default_locale: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let default_locale = default_locale.into();
        let mut codes: Vec<String> = Vec::new();

        for code in locales {
            let code = code.into();
            if code.trim().is_empty() {
                return Err(LocalizeError::InvalidLocaleSet(
                    "locale codes must not be blank".to_string(),
                ));
            }
            if !codes.contains(&code) {
                codes.push(code);
            }
        }

        if !codes.is_empty() && !codes.contains(&default_locale) {
            return Err(LocalizeError::InvalidLocaleSet(format!(
                "default locale '{}' is not one of {:?}",
                default_locale, codes
            )));
        }

        Ok(Self {
            locales: codes,
            default_locale,
        })
    }

    /// A set without locales; routes are left untouched.
    pub fn empty(default_locale: impl Into<String>) -> Self {
        Self {
            locales: Vec::new(),
            default_locale: default_locale.into(),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.locales.iter().any(|locale| locale == code)
    }

    /// Returns `code` as owned string when it is supported.
    pub fn find(&self, code: &str) -> Option<String> {
        self.contains(code).then(|| code.to_string())
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn as_slice(&self) -> &[String] {
        &self.locales
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }
}
