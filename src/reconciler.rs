//! Keeps the host router in step with the active locale.
//!
//! An explicit switch retranslates the tree and replays the live navigation
//! state under the new locale. A host navigation that crosses a locale
//! boundary only patches the root of the tree.

use crate::detection::location_locale;
use crate::error::{LocalizeError, Result};
use crate::host::{render_url, HostRouter, NavigationCommand, NavigationExtras, NavigationStart, RouteSnapshot};
use crate::route::WILDCARD;
use crate::translator::{RouteTreeTranslator, TranslationOutcome};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Buffered locale-changed notifications per subscriber.
const LOCALE_EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Already on the requested locale.
    Unchanged,
    Switched,
    /// A newer switch took over before the dictionary arrived.
    Superseded,
}

pub struct NavigationReconciler {
    translator: Arc<RouteTreeTranslator>,
    router: Arc<dyn HostRouter>,
    events: broadcast::Sender<String>,
}

impl NavigationReconciler {
    pub fn new(translator: Arc<RouteTreeTranslator>, router: Arc<dyn HostRouter>) -> Self {
        let (events, _) = broadcast::channel(LOCALE_EVENT_CAPACITY);
        Self {
            translator,
            router,
            events,
        }
    }

    /// Hand the localized tree to the host router.
    pub fn init(&self) -> Result<()> {
        let routes = self.translator.routes()?;
        info!("Applying {} localized top-level route(s)", routes.len());
        self.router.reset_config(routes);
        Ok(())
    }

    /// Locale-changed notifications. Late subscribers only see later changes.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    pub fn translator(&self) -> &Arc<RouteTreeTranslator> {
        &self.translator
    }

    /// Switch to `target` and navigate to the equivalent of the current page.
    pub async fn switch_locale(&self, target: &str) -> Result<SwitchOutcome> {
        if self.translator.current_locale().as_deref() == Some(target) {
            debug!("Locale {} already active", target);
            return Ok(SwitchOutcome::Unchanged);
        }

        let snapshot = self.router.snapshot();
        if self.translator.translate_for_locale(target).await? == TranslationOutcome::Superseded {
            return Ok(SwitchOutcome::Superseded);
        }

        self.router.reset_config(self.translator.routes()?);

        let commands = self.commands_for(&snapshot)?;
        let extras = extras_for(&snapshot);
        info!("Switching locale to {}, navigating to {}", target, render_url(&commands));

        self.router
            .navigate(commands, extras)
            .await
            .map_err(LocalizeError::Navigation)?;

        self.translator.detector().cache_locale(target);
        self.translator.provider().set_active_locale(target);
        self.publish(target);
        Ok(SwitchOutcome::Switched)
    }

    /// Navigation commands reaching the page described by `root` under the
    /// current locale.
    pub fn commands_for(&self, root: &RouteSnapshot) -> Result<Vec<NavigationCommand>> {
        let Some(first) = root.first_child() else {
            return Ok(vec![NavigationCommand::segment("")]);
        };

        let at_language_root = first
            .route_config
            .as_ref()
            .is_some_and(|config| self.translator.is_language_root(config));

        let mut commands = Vec::new();
        if at_language_root {
            // The language root segment is replaced by the new prefix
            let prefix = self.translator.url_prefix();
            if !prefix.is_empty() {
                commands.push(NavigationCommand::segment(format!("/{}", prefix)));
            }
            if let Some(child) = first.first_child() {
                self.traverse(child, false, &mut commands)?;
            }
            if commands.is_empty() {
                commands.push(NavigationCommand::segment(""));
            }
        } else {
            self.traverse(root, false, &mut commands)?;
        }

        let mut index = 0;
        commands.retain(|command| {
            let keep = index == 0 || !command.is_empty_segment();
            index += 1;
            keep
        });
        Ok(commands)
    }

    /// Append commands for `snapshot` and its primary descendants.
    ///
    /// Everything below a skipped route stays untranslated.
    fn traverse(
        &self,
        snapshot: &RouteSnapshot,
        inside_skipped: bool,
        commands: &mut Vec<NavigationCommand>,
    ) -> Result<()> {
        let skipped = inside_skipped || is_skipped(snapshot);
        commands.push(NavigationCommand::Segment(self.segment_value(snapshot, skipped)?));

        if !snapshot.params.is_empty() {
            commands.push(NavigationCommand::Params(snapshot.params.clone()));
        }

        let mut outlets = BTreeMap::new();
        for child in snapshot.children.iter().filter(|child| !child.is_primary()) {
            let value = self.segment_value(child, skipped || is_skipped(child))?;
            outlets.insert(child.outlet.clone(), value);
        }
        if !outlets.is_empty() {
            commands.push(NavigationCommand::Outlets { outlets });
        }

        if let Some(child) = snapshot.first_child() {
            self.traverse(child, skipped, commands)?;
        }
        Ok(())
    }

    /// Localized URL text consumed by one activated route.
    ///
    /// Parameter placeholders take the live URL segment at the same position.
    fn segment_value(&self, snapshot: &RouteSnapshot, skipped: bool) -> Result<String> {
        let Some(config) = &snapshot.route_config else {
            return Ok(String::new());
        };

        if config.path() == Some(WILDCARD) {
            let matched = snapshot
                .url
                .iter()
                .filter(|segment| !segment.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("/");
            return self.translator.translate_route(&matched);
        }

        let Some(canonical) = config.originals().path().or(config.path()) else {
            return Ok(String::new());
        };
        let parts = canonical
            .split('/')
            .enumerate()
            .map(|(index, part)| {
                if part.starts_with(':') {
                    Ok(snapshot.url.get(index).cloned().unwrap_or_else(|| part.to_string()))
                } else if !skipped {
                    self.translator.translate_route(part)
                } else {
                    Ok(part.to_string())
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join("/"))
    }

    /// Handle a host navigation from `previous_url` to `current_url` and
    /// return the locale now in effect.
    pub fn on_navigation_boundary_crossed(&self, previous_url: &str, current_url: &str) -> Result<String> {
        let locales = self.translator.locales();
        let default = self.translator.default_locale();

        let previous = location_locale(previous_url, locales).unwrap_or_else(|| default.to_string());
        let current = if current_url == "/" {
            previous.clone()
        } else {
            location_locale(current_url, locales).unwrap_or_else(|| default.to_string())
        };

        if current != previous {
            info!("Locale changed by navigation: {} -> {}", previous, current);
            self.translator
                .mutate_root_on_external_locale_change(&current, &previous)?;
            self.router.reset_config(self.translator.routes()?);
        }

        self.publish(&current);
        Ok(current)
    }

    /// Consume navigation-start events pairwise until the channel closes.
    pub async fn track_navigation(&self, mut events: mpsc::Receiver<NavigationStart>) {
        let Some(mut previous) = events.recv().await else {
            return;
        };

        while let Some(current) = events.recv().await {
            if let Err(e) = self.on_navigation_boundary_crossed(&previous.url, &current.url) {
                warn!("Failed to follow navigation to {}: {}", current.url, e);
            }
            previous = current;
        }
        debug!("Navigation event stream closed");
    }

    fn publish(&self, locale: &str) {
        if self.events.send(locale.to_string()).is_err() {
            debug!("No locale subscribers for {}", locale);
        }
    }
}

fn is_skipped(snapshot: &RouteSnapshot) -> bool {
    snapshot
        .route_config
        .as_ref()
        .is_some_and(|config| config.is_skip_localization())
}

fn extras_for(snapshot: &RouteSnapshot) -> NavigationExtras {
    let leaf = snapshot.leaf();
    NavigationExtras {
        query_params: (!leaf.query_params.is_empty()).then(|| leaf.query_params.clone()),
        fragment: leaf.fragment.clone(),
    }
}

impl std::fmt::Debug for NavigationReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationReconciler")
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}
