//! Where the canonical route tree comes from.

use crate::route::RouteNode;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::path::PathBuf;

/// Produces the initial route tree handed to `RouteTreeTranslator::initialize`.
pub trait RouteSource: Send + Sync {
    fn load_routes(&self) -> BoxFuture<'_, Result<Vec<RouteNode>>>;
}

/// Route lists registered in code: one root registration plus any number of
/// child registrations, concatenated in registration order.
#[derive(Debug, Clone, Default)]
pub struct StaticRoutes {
    registrations: Vec<Vec<RouteNode>>,
}

impl StaticRoutes {
    pub fn new(routes: Vec<RouteNode>) -> Self {
        Self {
            registrations: vec![routes],
        }
    }

    pub fn with_child_routes(mut self, routes: Vec<RouteNode>) -> Self {
        self.registrations.push(routes);
        self
    }
}

impl From<Vec<RouteNode>> for StaticRoutes {
    fn from(routes: Vec<RouteNode>) -> Self {
        Self::new(routes)
    }
}

impl RouteSource for StaticRoutes {
    fn load_routes(&self) -> BoxFuture<'_, Result<Vec<RouteNode>>> {
        let routes = self.registrations.concat();
        Box::pin(async move { Ok(routes) })
    }
}

/// JSON array of route nodes on disk.
#[derive(Debug, Clone)]
pub struct JsonRouteFile {
    path: PathBuf,
}

impl JsonRouteFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RouteSource for JsonRouteFile {
    fn load_routes(&self) -> BoxFuture<'_, Result<Vec<RouteNode>>> {
        Box::pin(async move {
            let raw = tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("Failed to read routes file {}", self.path.display()))?;
            let routes: Vec<RouteNode> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse routes file {}", self.path.display()))?;
            Ok(routes)
        })
    }
}
