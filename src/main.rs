use anyhow::{Context, Result};
use route_localizer::cache::cache_for;
use route_localizer::config::AppConfig;
use route_localizer::detection::{LocaleDetector, StaticEnvironment};
use route_localizer::host::InMemoryRouter;
use route_localizer::i18n::{JsonDirectoryProvider, LocaleSet};
use route_localizer::source::JsonRouteFile;
use route_localizer::{NavigationReconciler, RouteNode, RouteTreeTranslator};
use std::sync::Arc;
use tracing::info;

/// Localize a route file and print the resulting tree.
///
/// Usage: `route-localizer [locale]`. With a locale argument the tree is
/// switched to that locale after initialization and printed again.
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("route_localizer=info".parse()?),
        )
        .init();

    info!("Starting route localization");

    let config = AppConfig::from_env()?;
    let target = std::env::args().nth(1);

    let locales = LocaleSet::new(config.locales.iter().cloned(), config.default_locale.clone())
        .context("Invalid locale configuration")?;
    let cache = cache_for(&config.settings, config.storage_dir.as_deref());
    let environment = Arc::new(StaticEnvironment::from_env(config.initial_path.clone()));
    let detector = LocaleDetector::new(config.settings.clone(), cache, environment);
    let provider = Arc::new(JsonDirectoryProvider::new(config.dictionary_dir.clone()));

    let translator = Arc::new(RouteTreeTranslator::new(
        locales,
        config.settings.clone(),
        provider,
        detector,
    ));

    // Step 1: Build and translate the tree for the detected locale
    let routes = translator
        .initialize(&JsonRouteFile::new(config.routes_file.clone()))
        .await?;
    info!(
        "Localized {} top-level route(s) for '{}'",
        routes.len(),
        translator.current_locale().unwrap_or_default()
    );
    print_routes(&routes)?;

    // Step 2: Optionally switch locale
    if let Some(target) = target {
        let router = Arc::new(InMemoryRouter::new());
        let reconciler = NavigationReconciler::new(translator.clone(), router.clone());
        reconciler.init()?;

        let outcome = reconciler.switch_locale(&target).await?;
        info!("Switch to '{}': {:?}", target, outcome);
        if let Some(navigation) = router.last_navigation() {
            info!("Navigated to {}", navigation.url);
        }
        print_routes(&translator.routes()?)?;
    }

    Ok(())
}

fn print_routes(routes: &[RouteNode]) -> Result<()> {
    let json = serde_json::to_string_pretty(routes).context("Failed to serialize routes")?;
    println!("{}", json);
    Ok(())
}
