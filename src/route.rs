//! Route tree nodes.
//!
//! A `RouteNode` mirrors one entry of the host router's configuration. Path and
//! redirect values are only changed through named operations so the canonical
//! values frozen in `LocalizationOriginals` stay consistent with what the
//! translator wrote.

use serde::{Deserialize, Serialize};

/// Path token of the catch-all route.
pub const WILDCARD: &str = "**";

/// How the router matches a node's path against the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMatch {
    Prefix,
    Full,
}

/// Pre-translation values of a node, frozen on first translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationOriginals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect_to: Option<String>,
}

impl LocalizationOriginals {
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn redirect_to(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.redirect_to.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    path_match: Option<PathMatch>,

    /// Name of a secondary outlet; `None` means the primary outlet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outlet: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<RouteNode>,

    /// Key handed to the lazy subtree loader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    load_children: Option<String>,

    /// Subtree attached by the lazy loader once resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    loaded_routes: Option<Vec<RouteNode>>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    skip_localization: bool,

    #[serde(default, skip_serializing_if = "LocalizationOriginals::is_empty")]
    originals: LocalizationOriginals,
}

impl RouteNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// A node that redirects `path` to `target`.
    pub fn redirect(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            redirect_to: Some(target.into()),
            ..Default::default()
        }
    }

    pub fn wildcard() -> Self {
        Self::new(WILDCARD)
    }

    pub fn with_children(mut self, children: Vec<RouteNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_outlet(mut self, outlet: impl Into<String>) -> Self {
        self.outlet = Some(outlet.into());
        self
    }

    pub fn with_path_match(mut self, path_match: PathMatch) -> Self {
        self.path_match = Some(path_match);
        self
    }

    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }

    pub fn lazy(mut self, key: impl Into<String>) -> Self {
        self.load_children = Some(key.into());
        self
    }

    /// Opt this node (and its subtree) out of prefixing and translation.
    pub fn skip_localization(mut self) -> Self {
        self.skip_localization = true;
        self
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn redirect_to(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }

    pub fn path_match(&self) -> Option<PathMatch> {
        self.path_match
    }

    pub fn outlet(&self) -> Option<&str> {
        self.outlet.as_deref()
    }

    pub fn children(&self) -> &[RouteNode] {
        &self.children
    }

    pub fn load_children(&self) -> Option<&str> {
        self.load_children.as_deref()
    }

    pub fn loaded_routes(&self) -> Option<&[RouteNode]> {
        self.loaded_routes.as_deref()
    }

    pub fn is_skip_localization(&self) -> bool {
        self.skip_localization
    }

    pub fn is_wildcard(&self) -> bool {
        self.path.as_deref() == Some(WILDCARD)
    }

    pub fn originals(&self) -> &LocalizationOriginals {
        &self.originals
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    pub fn set_redirect(&mut self, target: impl Into<String>) {
        self.redirect_to = Some(target.into());
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<RouteNode> {
        &mut self.children
    }

    pub(crate) fn loaded_routes_mut(&mut self) -> Option<&mut Vec<RouteNode>> {
        self.loaded_routes.as_mut()
    }

    pub(crate) fn attach_loaded_routes(&mut self, routes: Vec<RouteNode>) {
        self.loaded_routes = Some(routes);
    }

    /// Returns the canonical path, freezing the current one on first call.
    pub(crate) fn freeze_path(&mut self) -> Option<String> {
        if self.originals.path.is_none() {
            self.originals.path = self.path.clone();
        }
        self.originals.path.clone()
    }

    /// Returns the canonical redirect, freezing the current one on first call.
    pub(crate) fn freeze_redirect(&mut self) -> Option<String> {
        if self.originals.redirect_to.is_none() {
            self.originals.redirect_to = self.redirect_to.clone();
        }
        self.originals.redirect_to.clone()
    }
}

/// Depth-first search for the node whose lazy key is `key`, including already
/// loaded subtrees.
pub(crate) fn find_lazy_mut<'a>(routes: &'a mut [RouteNode], key: &str) -> Option<&'a mut RouteNode> {
    for route in routes.iter_mut() {
        if route.load_children.as_deref() == Some(key) {
            return Some(route);
        }
        if let Some(found) = find_lazy_mut(&mut route.children, key) {
            return Some(found);
        }
        if let Some(loaded) = route.loaded_routes.as_mut() {
            if let Some(found) = find_lazy_mut(loaded, key) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freeze_path_only_once() {
        let mut node = RouteNode::new("about");
        assert_eq!(node.freeze_path().as_deref(), Some("about"));

        node.set_path("a-propos");
        assert_eq!(node.freeze_path().as_deref(), Some("about"));
        assert_eq!(node.originals().path(), Some("about"));
        assert_eq!(node.path(), Some("a-propos"));
    }

    #[test]
    fn test_freeze_redirect_only_once() {
        let mut node = RouteNode::redirect("", "/home");
        assert_eq!(node.freeze_redirect().as_deref(), Some("/home"));
        node.set_redirect("/fr/accueil");
        assert_eq!(node.freeze_redirect().as_deref(), Some("/home"));
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(RouteNode::wildcard().is_wildcard());
        assert!(!RouteNode::new("home").is_wildcard());
    }

    #[test]
    fn test_deserialize_route_tree() {
        let json = r#"[
            {"path": "", "redirectTo": "/home", "pathMatch": "full"},
            {"path": "products", "children": [{"path": ":id"}]},
            {"path": "admin", "skipLocalization": true},
            {"path": "shop", "loadChildren": "shop"},
            {"path": "**", "redirectTo": "/home"}
        ]"#;
        let routes: Vec<RouteNode> = serde_json::from_str(json).expect("deserialize");

        assert_eq!(routes.len(), 5);
        assert_eq!(routes[0].path_match(), Some(PathMatch::Full));
        assert_eq!(routes[1].children()[0].path(), Some(":id"));
        assert!(routes[2].is_skip_localization());
        assert_eq!(routes[3].load_children(), Some("shop"));
        assert!(routes[4].is_wildcard());
    }

    #[test]
    fn test_serialize_omits_empty_fields() {
        let json = serde_json::to_string(&RouteNode::new("home")).expect("serialize");
        assert_eq!(json, r#"{"path":"home"}"#);
    }

    #[test]
    fn test_find_lazy_searches_nested_and_loaded() {
        let mut loaded = RouteNode::new("shop").lazy("shop");
        loaded.attach_loaded_routes(vec![RouteNode::new("cart").lazy("cart")]);
        let mut routes = vec![RouteNode::new("a").with_children(vec![loaded])];

        assert!(find_lazy_mut(&mut routes, "shop").is_some());
        assert_eq!(
            find_lazy_mut(&mut routes, "cart").and_then(|n| n.path().map(String::from)),
            Some("cart".to_string())
        );
        assert!(find_lazy_mut(&mut routes, "missing").is_none());
    }
}
