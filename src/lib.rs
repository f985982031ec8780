//! Locale-aware route trees.
//!
//! Takes a tree of route definitions and a set of supported locales and
//! produces, for the active locale, an equivalent tree whose path segments and
//! redirect targets are translated. The canonical values are frozen on first
//! translation so the tree can be re-translated whenever the locale changes,
//! and the live navigation state is replayed under the new locale.

pub mod cache;
pub mod config;
pub mod detection;
pub mod error;
pub mod host;
pub mod i18n;
pub mod loader;
pub mod reconciler;
pub mod retry;
pub mod route;
pub mod source;
pub mod translator;

pub use error::{LocalizeError, Result};
pub use reconciler::NavigationReconciler;
pub use route::RouteNode;
pub use translator::RouteTreeTranslator;
