//! Lazy subtree loading.

use crate::route::RouteNode;
use crate::translator::RouteTreeTranslator;
use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// Resolves the routes behind a node's `load_children` key.
pub trait SubtreeLoader: Send + Sync {
    fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<RouteNode>>>;
}

/// Loader that localizes every subtree it resolves and attaches it to the
/// tree, so later locale switches retranslate it.
pub struct LocalizingLoader<L> {
    inner: L,
    translator: Arc<RouteTreeTranslator>,
}

impl<L: SubtreeLoader> LocalizingLoader<L> {
    pub fn new(inner: L, translator: Arc<RouteTreeTranslator>) -> Self {
        Self { inner, translator }
    }
}

impl<L: SubtreeLoader> SubtreeLoader for LocalizingLoader<L> {
    fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<RouteNode>>> {
        Box::pin(async move {
            let routes = self.inner.load(key).await?;
            debug!("Localizing {} lazily loaded route(s) for '{}'", routes.len(), key);
            Ok(self.translator.attach_lazy_subtree(key, routes)?)
        })
    }
}
