//! Boundary to the host routing engine.
//!
//! The host owns the active configuration, performs navigation and exposes a
//! snapshot of the activated routes. `InMemoryRouter` is a minimal host that
//! records what it is told to do.

use crate::route::RouteNode;
use anyhow::Result;
use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Outlet name of the primary route chain.
pub const PRIMARY_OUTLET: &str = "primary";

/// One element of a navigation command sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NavigationCommand {
    /// Path text; may contain `/` and may be absolute.
    Segment(String),
    /// Matrix parameters of the preceding segment.
    Params(BTreeMap<String, String>),
    /// Secondary outlet targets keyed by outlet name.
    Outlets { outlets: BTreeMap<String, String> },
}

impl NavigationCommand {
    pub fn segment(path: impl Into<String>) -> Self {
        NavigationCommand::Segment(path.into())
    }

    pub fn is_empty_segment(&self) -> bool {
        matches!(self, NavigationCommand::Segment(path) if path.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationExtras {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_params: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
}

/// Navigation-start event emitted by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationStart {
    pub url: String,
}

impl NavigationStart {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// One activated route in the host's live state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSnapshot {
    /// Configuration node that matched, `None` for the synthetic root
    pub route_config: Option<RouteNode>,
    /// URL segments consumed by this route
    pub url: Vec<String>,
    /// Matrix parameters of this route's segment
    pub params: BTreeMap<String, String>,
    pub outlet: String,
    pub children: Vec<RouteSnapshot>,
    pub query_params: BTreeMap<String, String>,
    pub fragment: Option<String>,
}

impl Default for RouteSnapshot {
    fn default() -> Self {
        Self {
            route_config: None,
            url: Vec::new(),
            params: BTreeMap::new(),
            outlet: PRIMARY_OUTLET.to_string(),
            children: Vec::new(),
            query_params: BTreeMap::new(),
            fragment: None,
        }
    }
}

impl RouteSnapshot {
    pub fn root() -> Self {
        Self::default()
    }

    /// Snapshot of `config` having consumed `url` segments.
    pub fn matched(config: RouteNode, url: &[&str]) -> Self {
        Self {
            route_config: Some(config),
            url: url.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_child(mut self, child: RouteSnapshot) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_outlet(mut self, outlet: impl Into<String>) -> Self {
        self.outlet = outlet.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    pub fn is_primary(&self) -> bool {
        self.outlet == PRIMARY_OUTLET
    }

    /// First child on the primary outlet.
    pub fn first_child(&self) -> Option<&RouteSnapshot> {
        self.children.iter().find(|child| child.is_primary())
    }

    /// Deepest snapshot along the primary chain.
    pub fn leaf(&self) -> &RouteSnapshot {
        let mut current = self;
        while let Some(child) = current.first_child() {
            current = child;
        }
        current
    }
}

pub trait HostRouter: Send + Sync {
    /// Replace the active route configuration.
    fn reset_config(&self, routes: Vec<RouteNode>);

    /// Navigate to `commands`; resolves once navigation settles.
    fn navigate(
        &self,
        commands: Vec<NavigationCommand>,
        extras: NavigationExtras,
    ) -> BoxFuture<'_, Result<()>>;

    /// Live state of activated routes.
    fn snapshot(&self) -> RouteSnapshot;
}

/// Render a command sequence as a URL path.
pub fn render_url(commands: &[NavigationCommand]) -> String {
    let mut url = String::new();

    for command in commands {
        match command {
            NavigationCommand::Segment(path) if path.is_empty() => {}
            NavigationCommand::Segment(path) if path.starts_with('/') => {
                url = path.trim_end_matches('/').to_string();
            }
            NavigationCommand::Segment(path) => {
                url.push('/');
                url.push_str(path.trim_matches('/'));
            }
            NavigationCommand::Params(params) => {
                for (key, value) in params {
                    url.push_str(&format!(";{}={}", key, value));
                }
            }
            NavigationCommand::Outlets { outlets } => {
                let rendered: Vec<String> = outlets
                    .iter()
                    .map(|(name, path)| format!("{}:{}", name, path))
                    .collect();
                url.push_str(&format!("/({})", rendered.join("//")));
            }
        }
    }

    if url.is_empty() {
        url.push('/');
    }
    url
}

/// A navigation performed by `InMemoryRouter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedNavigation {
    pub commands: Vec<NavigationCommand>,
    pub extras: NavigationExtras,
    pub url: String,
}

#[derive(Debug, Default)]
struct RouterState {
    config: Vec<RouteNode>,
    snapshot: RouteSnapshot,
    navigations: Vec<RecordedNavigation>,
    resets: usize,
}

/// Host router that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryRouter {
    state: Mutex<RouterState>,
}

impl InMemoryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_snapshot(&self, snapshot: RouteSnapshot) {
        self.lock().snapshot = snapshot;
    }

    pub fn config(&self) -> Vec<RouteNode> {
        self.lock().config.clone()
    }

    pub fn reset_count(&self) -> usize {
        self.lock().resets
    }

    pub fn navigations(&self) -> Vec<RecordedNavigation> {
        self.lock().navigations.clone()
    }

    pub fn last_navigation(&self) -> Option<RecordedNavigation> {
        self.lock().navigations.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HostRouter for InMemoryRouter {
    fn reset_config(&self, routes: Vec<RouteNode>) {
        let mut state = self.lock();
        state.config = routes;
        state.resets += 1;
    }

    fn navigate(
        &self,
        commands: Vec<NavigationCommand>,
        extras: NavigationExtras,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let url = render_url(&commands);
            self.lock().navigations.push(RecordedNavigation {
                commands,
                extras,
                url,
            });
            Ok(())
        })
    }

    fn snapshot(&self) -> RouteSnapshot {
        self.lock().snapshot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(path: &str) -> NavigationCommand {
        NavigationCommand::segment(path)
    }

    // ==================== render_url Tests ====================

    #[test]
    fn test_render_absolute_prefix_and_segments() {
        let commands = vec![segment("/fr"), segment("produits/42")];
        assert_eq!(render_url(&commands), "/fr/produits/42");
    }

    #[test]
    fn test_render_root() {
        assert_eq!(render_url(&[segment("")]), "/");
        assert_eq!(render_url(&[]), "/");
    }

    #[test]
    fn test_render_params_and_outlets() {
        let mut params = BTreeMap::new();
        params.insert("sort".to_string(), "asc".to_string());
        let mut outlets = BTreeMap::new();
        outlets.insert("aside".to_string(), "aide".to_string());

        let commands = vec![
            segment("/fr"),
            segment("produits"),
            NavigationCommand::Params(params),
            NavigationCommand::Outlets { outlets },
        ];
        assert_eq!(render_url(&commands), "/fr/produits;sort=asc/(aside:aide)");
    }

    #[test]
    fn test_commands_serialize_untagged() {
        let mut outlets = BTreeMap::new();
        outlets.insert("aside".to_string(), "help".to_string());
        let json = serde_json::to_string(&vec![
            segment("/en"),
            NavigationCommand::Outlets { outlets },
        ])
        .unwrap();
        assert_eq!(json, r#"["/en",{"outlets":{"aside":"help"}}]"#);
    }

    // ==================== Snapshot Tests ====================

    #[test]
    fn test_first_child_skips_secondary_outlets() {
        let snapshot = RouteSnapshot::root()
            .with_child(RouteSnapshot::matched(RouteNode::new("help"), &["help"]).with_outlet("aside"))
            .with_child(RouteSnapshot::matched(RouteNode::new("home"), &["home"]));

        let first = snapshot.first_child().expect("primary child");
        assert_eq!(first.url, vec!["home"]);
    }

    #[test]
    fn test_leaf_follows_primary_chain() {
        let snapshot = RouteSnapshot::root().with_child(
            RouteSnapshot::matched(RouteNode::new("en"), &["en"]).with_child(
                RouteSnapshot::matched(RouteNode::new("about"), &["about"]).with_fragment("team"),
            ),
        );
        assert_eq!(snapshot.leaf().fragment.as_deref(), Some("team"));
    }

    // ==================== InMemoryRouter Tests ====================

    #[tokio::test]
    async fn test_in_memory_router_records() {
        let router = InMemoryRouter::new();
        router.reset_config(vec![RouteNode::new("home")]);
        router
            .navigate(vec![segment("/en"), segment("home")], NavigationExtras::default())
            .await
            .unwrap();

        assert_eq!(router.reset_count(), 1);
        assert_eq!(router.config().len(), 1);
        let navigation = router.last_navigation().expect("navigation recorded");
        assert_eq!(navigation.url, "/en/home");
    }
}
