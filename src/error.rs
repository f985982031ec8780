use thiserror::Error;

/// Errors surfaced by route localization.
///
/// Failures of external collaborators (dictionary provider, route source, host
/// router) are carried as their original `anyhow::Error`.
#[derive(Debug, Error)]
pub enum LocalizeError {
    /// The path contains more than one `?` block.
    #[error("malformed path '{path}': there should be only one query parameter block in the URL")]
    MalformedPath { path: String },

    /// An operation ran before `initialize` completed.
    #[error("route tree has not been initialized")]
    NotInitialized,

    #[error("route tree has already been initialized")]
    AlreadyInitialized,

    #[error("locale '{0}' is not supported")]
    UnsupportedLocale(String),

    #[error("invalid locale set: {0}")]
    InvalidLocaleSet(String),

    #[error("failed to load dictionary for locale '{locale}'")]
    Dictionary {
        locale: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load route definitions")]
    RouteSource(#[source] anyhow::Error),

    #[error("navigation failed")]
    Navigation(#[source] anyhow::Error),
}

pub type Result<T, E = LocalizeError> = std::result::Result<T, E>;
