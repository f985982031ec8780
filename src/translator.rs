//! Route tree translation.
//!
//! `RouteTreeTranslator` owns the canonical tree. `initialize` restructures it
//! once (language root, wildcard extraction, skipped routes) and every
//! later translation rewrites path and redirect values in place, always
//! starting from the values frozen on first translation.

use crate::config::Settings;
use crate::detection::LocaleDetector;
use crate::error::{LocalizeError, Result};
use crate::i18n::{Dictionary, DictionaryProvider, LocaleSet};
use crate::retry::{is_transient, retry_if, RetryConfig};
use crate::route::{find_lazy_mut, PathMatch, RouteNode, WILDCARD};
use crate::source::RouteSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
}

/// Result of a translation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationOutcome {
    /// The tree now reflects the requested locale.
    Applied,
    /// A newer request started before this one finished; nothing was changed.
    Superseded,
}

/// Positions of the synthetic and extracted nodes in the top-level list.
#[derive(Debug, Clone, Default)]
struct TreeLayout {
    base_redirect: Option<usize>,
    language_root: Option<usize>,
    wildcard: Option<usize>,
}

#[derive(Debug)]
struct TreeState {
    phase: Phase,
    routes: Vec<RouteNode>,
    layout: TreeLayout,
    dictionary: Option<Arc<Dictionary>>,
    current_locale: Option<String>,
}

/// Translates paths with one dictionary and URL prefix.
struct SegmentTranslator<'a> {
    dictionary: Option<&'a Dictionary>,
    url_prefix: &'a str,
}

impl SegmentTranslator<'_> {
    fn translate_route(&self, raw: &str) -> Result<String> {
        let mut parts = raw.split('?');
        let path = parts.next().unwrap_or("");
        let query = parts.next();
        if parts.next().is_some() {
            return Err(LocalizeError::MalformedPath {
                path: raw.to_string(),
            });
        }

        let translated = path
            .split('/')
            .map(|segment| {
                if segment.is_empty() {
                    String::new()
                } else {
                    self.translate_segment(segment)
                }
            })
            .collect::<Vec<_>>()
            .join("/");

        Ok(match query {
            Some(query) => format!("{}?{}", translated, query),
            None => translated,
        })
    }

    fn translate_segment(&self, key: &str) -> String {
        self.dictionary
            .and_then(|dictionary| dictionary.route_segment(key))
            .unwrap_or(key)
            .to_string()
    }

    /// Absolute form of an already translated path, led by the URL prefix.
    fn absolute(&self, translated: &str) -> String {
        let rest = translated.trim_start_matches('/');
        match (self.url_prefix.is_empty(), rest.is_empty()) {
            (true, _) => format!("/{}", rest),
            (false, true) => format!("/{}", self.url_prefix),
            (false, false) => format!("/{}/{}", self.url_prefix, rest),
        }
    }

    fn translate_routes(&self, routes: &mut [RouteNode]) -> Result<()> {
        for route in routes.iter_mut() {
            self.translate_node(route)?;
        }
        Ok(())
    }

    fn translate_node(&self, route: &mut RouteNode) -> Result<()> {
        if route.is_skip_localization() {
            return Ok(());
        }

        if route.path().is_some_and(|path| !path.is_empty() && path != WILDCARD) {
            if let Some(original) = route.freeze_path() {
                route.set_path(self.translate_route(&original)?);
            }
        }

        if route.redirect_to().is_some_and(|target| !target.is_empty()) {
            if let Some(original) = route.freeze_redirect() {
                let translated = self.translate_route(&original)?;
                if original.starts_with('/') {
                    route.set_redirect(self.absolute(&translated));
                } else {
                    route.set_redirect(translated);
                }
            }
        }

        self.translate_routes(route.children_mut())?;
        if let Some(loaded) = route.loaded_routes_mut() {
            self.translate_routes(loaded)?;
        }
        Ok(())
    }
}

pub struct RouteTreeTranslator {
    locales: LocaleSet,
    settings: Settings,
    provider: Arc<dyn DictionaryProvider>,
    detector: LocaleDetector,
    retry: RetryConfig,
    generation: AtomicU64,
    state: RwLock<TreeState>,
}

impl RouteTreeTranslator {
    pub fn new(
        locales: LocaleSet,
        settings: Settings,
        provider: Arc<dyn DictionaryProvider>,
        detector: LocaleDetector,
    ) -> Self {
        Self {
            locales,
            settings,
            provider,
            detector,
            retry: RetryConfig::dictionary_fetch(),
            generation: AtomicU64::new(0),
            state: RwLock::new(TreeState {
                phase: Phase::Uninitialized,
                routes: Vec::new(),
                layout: TreeLayout::default(),
                dictionary: None,
                current_locale: None,
            }),
        }
    }

    /// Retry policy for dictionary fetches.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build the localized tree from `source` and translate it for the
    /// detected locale.
    ///
    /// Runs once. The tree becomes readable only after the initial
    /// translation completed; on failure the translator can be initialized
    /// again.
    pub async fn initialize(&self, source: &dyn RouteSource) -> Result<Vec<RouteNode>> {
        {
            let mut state = self.write();
            if state.phase != Phase::Uninitialized {
                return Err(LocalizeError::AlreadyInitialized);
            }
            state.phase = Phase::Initializing;
        }

        let result = self.build(source).await;
        if result.is_err() {
            self.write().phase = Phase::Uninitialized;
        }
        result
    }

    async fn build(&self, source: &dyn RouteSource) -> Result<Vec<RouteNode>> {
        let raw = source
            .load_routes()
            .await
            .map_err(LocalizeError::RouteSource)?;

        if self.locales.is_empty() {
            info!("No locales configured, leaving {} routes untouched", raw.len());
            let mut state = self.write();
            state.routes = raw;
            state.phase = Phase::Ready;
            return Ok(state.routes.clone());
        }

        let selected = self
            .detector
            .detect(&self.locales)
            .unwrap_or_else(|| self.locales.default_locale().to_string());
        info!(
            "Initializing route localization for {} locale(s), selected {}",
            self.locales.len(),
            selected
        );

        self.provider.set_default_locale(&selected);
        self.provider.set_active_locale(&selected);

        let (routes, layout) = self.restructure(raw);
        {
            let mut state = self.write();
            state.routes = routes;
            state.layout = layout;
        }

        let generation = self.next_generation();
        let dictionary = self.fetch_dictionary(&selected).await?;
        self.commit(generation, &selected, dictionary)?;

        let mut state = self.write();
        state.phase = Phase::Ready;
        Ok(state.routes.clone())
    }

    /// Wrap localizable routes in the language root and move the wildcard and
    /// skipped routes outside of it.
    fn restructure(&self, raw: Vec<RouteNode>) -> (Vec<RouteNode>, TreeLayout) {
        let always = self.settings.always_set_prefix;
        let mut routes = raw;
        let mut wildcard = None;
        let mut base = None;

        if always {
            if let Some(index) = routes.iter().position(RouteNode::is_wildcard) {
                wildcard = Some(routes.remove(index));
            }
            base = Some(
                RouteNode::redirect("", self.locales.default_locale())
                    .with_path_match(PathMatch::Full),
            );
        }

        let (skipped, children): (Vec<_>, Vec<_>) = routes
            .into_iter()
            .partition(RouteNode::is_skip_localization);

        let mut top = Vec::new();
        let mut layout = TreeLayout::default();

        if let Some(base) = base {
            layout.base_redirect = Some(top.len());
            top.push(base);
        }

        if !children.is_empty() {
            if self.locales.len() > 1 || always {
                layout.language_root = Some(top.len());
                top.push(RouteNode::new("").with_children(children));
            } else {
                top.extend(children);
            }
        }

        if !skipped.is_empty() {
            debug!("Keeping {} route(s) outside localization", skipped.len());
        }
        top.extend(skipped);

        if let Some(wildcard) = wildcard {
            layout.wildcard = Some(top.len());
            top.push(wildcard);
        }

        (top, layout)
    }

    /// Retranslate the tree for `locale`.
    ///
    /// The dictionary fetch may suspend. If another translation is requested
    /// meanwhile, this one completes as `Superseded` without touching the tree.
    pub async fn translate_for_locale(&self, locale: &str) -> Result<TranslationOutcome> {
        self.ensure_ready()?;
        if !self.locales.contains(locale) {
            return Err(LocalizeError::UnsupportedLocale(locale.to_string()));
        }

        let generation = self.next_generation();
        info!("Translating routes to {}", locale);
        let dictionary = self.fetch_dictionary(locale).await?;
        self.commit(generation, locale, dictionary)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn fetch_dictionary(&self, locale: &str) -> Result<Dictionary> {
        let operation = format!("Dictionary fetch for {}", locale);
        retry_if(&self.retry, &operation, || self.provider.dictionary(locale), is_transient)
            .await
            .map_err(|source| LocalizeError::Dictionary {
                locale: locale.to_string(),
                source,
            })
    }

    fn commit(&self, generation: u64, locale: &str, dictionary: Dictionary) -> Result<TranslationOutcome> {
        let mut state = self.write();
        if generation != self.generation.load(Ordering::SeqCst) {
            debug!("Translation to {} superseded by a newer request", locale);
            return Ok(TranslationOutcome::Superseded);
        }

        let prefix = self.prefix_for(locale);
        let translator = SegmentTranslator {
            dictionary: Some(&dictionary),
            url_prefix: &prefix,
        };

        let mut routes = state.routes.clone();
        let layout = state.layout.clone();

        if let Some(index) = layout.base_redirect {
            routes[index].set_redirect(locale);
        }

        match layout.language_root {
            Some(index) => {
                let root = &mut routes[index];
                root.set_path(prefix.as_str());
                translator.translate_routes(root.children_mut())?;
            }
            None => {
                for (index, route) in routes.iter_mut().enumerate() {
                    if Some(index) == layout.base_redirect || Some(index) == layout.wildcard {
                        continue;
                    }
                    translator.translate_node(route)?;
                }
            }
        }

        if let Some(index) = layout.wildcard {
            let wildcard = &mut routes[index];
            if wildcard.redirect_to().is_some() {
                if let Some(original) = wildcard.freeze_redirect() {
                    let translated = translator.translate_route(&original)?;
                    wildcard.set_redirect(translator.absolute(&translated));
                }
            }
        }

        state.routes = routes;
        state.dictionary = Some(Arc::new(dictionary));
        state.current_locale = Some(locale.to_string());
        debug!("Route tree committed for {}", locale);
        Ok(TranslationOutcome::Applied)
    }

    /// Translate a path with the current dictionary.
    ///
    /// Segments without a translation are kept; the query part is kept
    /// verbatim. Fails when the path has more than one `?` block.
    pub fn translate_route(&self, path: &str) -> Result<String> {
        let state = self.read();
        let prefix = self.current_prefix(&state);
        SegmentTranslator {
            dictionary: state.dictionary.as_deref(),
            url_prefix: &prefix,
        }
        .translate_route(path)
    }

    /// Patch the root after the locale changed through host navigation.
    ///
    /// Only the language root path and the base redirect are rewritten; the
    /// rest of the tree keeps its current translation.
    pub fn mutate_root_on_external_locale_change(&self, locale: &str, previous: &str) -> Result<()> {
        self.ensure_ready()?;
        let previous_prefix = self.prefix_for(previous);
        let new_prefix = self.prefix_for(locale);

        let mut state = self.write();
        if let Some(root) = state
            .routes
            .iter_mut()
            .find(|route| route.path() == Some(previous_prefix.as_str()))
        {
            root.set_path(new_prefix.as_str());
        }
        if let Some(base) = state.routes.iter_mut().find(|route| {
            route.path() == Some("") && route.redirect_to() == Some(previous_prefix.as_str())
        }) {
            base.set_redirect(locale);
        }

        debug!("Root route switched from '{}' to '{}'", previous_prefix, new_prefix);
        Ok(())
    }

    /// Localize a route list that is not part of the tree yet.
    pub fn localize_child_routes(&self, mut routes: Vec<RouteNode>) -> Result<Vec<RouteNode>> {
        let state = self.read();
        if state.phase != Phase::Ready {
            return Err(LocalizeError::NotInitialized);
        }
        let prefix = self.current_prefix(&state);
        SegmentTranslator {
            dictionary: state.dictionary.as_deref(),
            url_prefix: &prefix,
        }
        .translate_routes(&mut routes)?;
        Ok(routes)
    }

    /// Localize a lazily resolved subtree and attach it to the node whose
    /// lazy key is `key`, so later switches retranslate it as well.
    pub fn attach_lazy_subtree(&self, key: &str, mut routes: Vec<RouteNode>) -> Result<Vec<RouteNode>> {
        let mut state = self.write();
        if state.phase != Phase::Ready {
            return Err(LocalizeError::NotInitialized);
        }

        let prefix = self.current_prefix(&state);
        let dictionary = state.dictionary.clone();
        SegmentTranslator {
            dictionary: dictionary.as_deref(),
            url_prefix: &prefix,
        }
        .translate_routes(&mut routes)?;

        match find_lazy_mut(&mut state.routes, key) {
            Some(node) => node.attach_loaded_routes(routes.clone()),
            None => warn!("No route loads '{}', subtree will not follow locale switches", key),
        }
        Ok(routes)
    }

    /// Published tree; readable once initialization completed.
    pub fn routes(&self) -> Result<Vec<RouteNode>> {
        let state = self.read();
        if state.phase != Phase::Ready {
            return Err(LocalizeError::NotInitialized);
        }
        Ok(state.routes.clone())
    }

    pub fn phase(&self) -> Phase {
        self.read().phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    /// Whether localizable routes sit under a language root node.
    pub fn has_language_root(&self) -> bool {
        self.read().layout.language_root.is_some()
    }

    /// Whether `node` is the language root of this tree under any locale.
    ///
    /// Skipped routes, the wildcard and the base redirect share the top
    /// level with it but never qualify.
    pub fn is_language_root(&self, node: &RouteNode) -> bool {
        self.has_language_root()
            && !node.is_skip_localization()
            && !node.is_wildcard()
            && node.redirect_to().is_none()
            && node
                .path()
                .is_some_and(|path| path.is_empty() || self.locales.contains(path))
    }

    pub fn current_locale(&self) -> Option<String> {
        self.read().current_locale.clone()
    }

    pub fn default_locale(&self) -> &str {
        self.locales.default_locale()
    }

    pub fn locales(&self) -> &LocaleSet {
        &self.locales
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn detector(&self) -> &LocaleDetector {
        &self.detector
    }

    pub fn provider(&self) -> &Arc<dyn DictionaryProvider> {
        &self.provider
    }

    /// URL prefix for `locale`: the locale itself, or empty for the default
    /// locale when prefixing is not enforced.
    pub fn prefix_for(&self, locale: &str) -> String {
        if self.settings.always_set_prefix || locale != self.locales.default_locale() {
            locale.to_string()
        } else {
            String::new()
        }
    }

    /// URL prefix of the current locale.
    pub fn url_prefix(&self) -> String {
        let state = self.read();
        self.current_prefix(&state)
    }

    fn current_prefix(&self, state: &TreeState) -> String {
        state
            .current_locale
            .as_deref()
            .map(|locale| self.prefix_for(locale))
            .unwrap_or_default()
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(LocalizeError::NotInitialized)
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TreeState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TreeState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for RouteTreeTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTreeTranslator")
            .field("locales", &self.locales)
            .field("settings", &self.settings)
            .field("phase", &self.phase())
            .field("current_locale", &self.current_locale())
            .finish_non_exhaustive()
    }
}
