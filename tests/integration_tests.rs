//! Integration tests for route localization
//!
//! These tests drive the public API the way an application would: route and
//! dictionary files on disk, a persistent locale cache, the in-memory host
//! router and the navigation reconciler working together.

use std::sync::Arc;
use tempfile::TempDir;

use route_localizer::cache::cache_for;
use route_localizer::config::{CacheMechanism, Settings};
use route_localizer::detection::{location_locale, LocaleDetector, StaticEnvironment};
use route_localizer::host::{InMemoryRouter, NavigationStart, RouteSnapshot};
use route_localizer::i18n::{JsonDirectoryProvider, LocaleSet};
use route_localizer::loader::{LocalizingLoader, SubtreeLoader};
use route_localizer::reconciler::SwitchOutcome;
use route_localizer::source::JsonRouteFile;
use route_localizer::{LocalizeError, NavigationReconciler, RouteNode, RouteTreeTranslator};

// ==================== Test Helpers ====================

const ROUTES_JSON: &str = r#"[
    {"path": "home"},
    {"path": "products", "children": [{"path": ":id"}]},
    {"path": "about/team"},
    {"path": "old-home", "redirectTo": "/home"},
    {"path": "shop", "loadChildren": "shop"},
    {"path": "admin", "skipLocalization": true},
    {"path": "**", "redirectTo": "/home"}
]"#;

/// Write routes and dictionaries into a fresh directory
fn create_fixture() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("routes.json"), ROUTES_JSON).expect("Failed to write routes");

    let i18n = dir.path().join("i18n");
    std::fs::create_dir(&i18n).expect("Failed to create i18n dir");
    std::fs::write(i18n.join("en.json"), r#"{"routes": {"home": "home"}}"#)
        .expect("Failed to write en dictionary");
    std::fs::write(
        i18n.join("fr.json"),
        r#"{
            "routes": {
                "home": "accueil",
                "products": "produits",
                "about": "a-propos",
                "team": "equipe",
                "shop": "boutique",
                "cart": "panier",
                "old-home": "routes.old-home"
            }
        }"#,
    )
    .expect("Failed to write fr dictionary");
    dir
}

fn create_translator(dir: &TempDir, settings: Settings, path: &str) -> RouteTreeTranslator {
    let cache = cache_for(&settings, Some(dir.path()));
    let detector = LocaleDetector::new(
        settings.clone(),
        cache,
        Arc::new(StaticEnvironment::new(path, vec!["de-DE".to_string()])),
    );
    RouteTreeTranslator::new(
        LocaleSet::new(["en", "fr"], "en").unwrap(),
        settings,
        Arc::new(JsonDirectoryProvider::new(dir.path().join("i18n"))),
        detector,
    )
}

async fn initialized(dir: &TempDir, settings: Settings, path: &str) -> Arc<RouteTreeTranslator> {
    let translator = create_translator(dir, settings, path);
    translator
        .initialize(&JsonRouteFile::new(dir.path().join("routes.json")))
        .await
        .expect("initialize should succeed");
    Arc::new(translator)
}

fn child<'a>(routes: &'a [RouteNode], path: &str) -> &'a RouteNode {
    routes
        .iter()
        .find(|route| route.path() == Some(path))
        .unwrap_or_else(|| panic!("no route '{}'", path))
}

// ==================== Initialization Tests ====================

#[tokio::test]
async fn test_top_level_order_with_enforced_prefix() {
    let dir = create_fixture();
    let translator = initialized(&dir, Settings::default(), "/").await;
    let routes = translator.routes().unwrap();

    assert_eq!(routes.len(), 4);
    assert_eq!(routes[0].path(), Some(""));
    assert_eq!(routes[0].redirect_to(), Some("en"));
    assert_eq!(routes[1].path(), Some("en"));
    assert_eq!(routes[2].path(), Some("admin"));
    assert!(routes[3].is_wildcard());
    assert_eq!(routes[3].redirect_to(), Some("/en/home"));

    assert!(routes[1].children().iter().all(|r| r.path() != Some("admin")));
}

#[tokio::test]
async fn test_initialize_from_url_locale() {
    let dir = create_fixture();
    let translator = initialized(&dir, Settings::default(), "/fr/produits/3").await;
    let routes = translator.routes().unwrap();
    let root = &routes[1];

    assert_eq!(root.path(), Some("fr"));
    let products = child(root.children(), "produits");
    assert_eq!(products.children()[0].path(), Some(":id"));
    assert!(root.children().iter().any(|r| r.path() == Some("a-propos/equipe")));

    // Echoed key counts as missing
    let old_home = child(root.children(), "old-home");
    assert_eq!(old_home.redirect_to(), Some("/fr/accueil"));
    assert_eq!(routes[3].redirect_to(), Some("/fr/accueil"));
}

#[tokio::test]
async fn test_missing_dictionary_file_fails_initialize() {
    let dir = create_fixture();
    std::fs::remove_file(dir.path().join("i18n/fr.json")).unwrap();

    let translator = create_translator(&dir, Settings::default(), "/fr")
        .with_retry(route_localizer::retry::RetryConfig::no_retry());
    let result = translator
        .initialize(&JsonRouteFile::new(dir.path().join("routes.json")))
        .await;

    assert!(matches!(result, Err(LocalizeError::Dictionary { ref locale, .. }) if locale == "fr"));
    assert!(!translator.is_ready());
}

#[tokio::test]
async fn test_missing_routes_file_fails_initialize() {
    let dir = create_fixture();
    let translator = create_translator(&dir, Settings::default(), "/");
    let result = translator
        .initialize(&JsonRouteFile::new(dir.path().join("missing.json")))
        .await;

    assert!(matches!(result, Err(LocalizeError::RouteSource(_))));
}

// ==================== Translation Property Tests ====================

#[tokio::test]
async fn test_translate_route_examples() {
    let dir = create_fixture();
    let translator = initialized(&dir, Settings::default(), "/fr").await;

    assert_eq!(translator.translate_route("products/about?x=1").unwrap(), "produits/a-propos?x=1");
    assert!(matches!(
        translator.translate_route("a?x=1?y=2"),
        Err(LocalizeError::MalformedPath { .. })
    ));
}

#[tokio::test]
async fn test_idempotent_and_round_trip() {
    let dir = create_fixture();
    let translator = initialized(&dir, Settings::default(), "/fr").await;
    let french = translator.routes().unwrap();

    translator.translate_for_locale("fr").await.unwrap();
    assert_eq!(translator.routes().unwrap(), french);

    translator.translate_for_locale("en").await.unwrap();
    let english = translator.routes().unwrap();
    assert_eq!(child(english[1].children(), "products").path(), Some("products"));

    translator.translate_for_locale("fr").await.unwrap();
    assert_eq!(translator.routes().unwrap(), french);
}

#[tokio::test]
async fn test_skipped_route_identical_after_switches() {
    let dir = create_fixture();
    let translator = initialized(&dir, Settings::default(), "/").await;
    let expected = RouteNode::new("admin").skip_localization();

    for locale in ["fr", "en", "fr"] {
        translator.translate_for_locale(locale).await.unwrap();
        let routes = translator.routes().unwrap();
        assert_eq!(child(&routes, "admin"), &expected);
    }
}

#[test]
fn test_location_locale() {
    let locales = LocaleSet::new(["en", "fr"], "en").unwrap();
    assert_eq!(location_locale("/fr/about", &locales).as_deref(), Some("fr"));
    assert_eq!(location_locale("/xx/about", &locales), None);
}

// ==================== Reconciliation Tests ====================

#[tokio::test]
async fn test_switch_en_to_fr_carries_parameter() {
    let dir = create_fixture();
    let translator = initialized(&dir, Settings::default(), "/en/products/42").await;
    let router = Arc::new(InMemoryRouter::new());
    let reconciler = NavigationReconciler::new(translator.clone(), router.clone());
    reconciler.init().unwrap();

    let config = router.config();
    let root = &config[1];
    let products = child(root.children(), "products");
    router.set_snapshot(
        RouteSnapshot::root().with_child(
            RouteSnapshot::matched(root.clone(), &["en"]).with_child(
                RouteSnapshot::matched(products.clone(), &["products"])
                    .with_child(RouteSnapshot::matched(products.children()[0].clone(), &["42"])),
            ),
        ),
    );

    let outcome = reconciler.switch_locale("fr").await.unwrap();
    assert_eq!(outcome, SwitchOutcome::Switched);
    assert_eq!(router.last_navigation().unwrap().url, "/fr/produits/42");
    assert_eq!(router.config()[1].path(), Some("fr"));
}

#[tokio::test]
async fn test_cached_locale_survives_sessions() {
    let dir = create_fixture();
    let settings = Settings {
        cache_mechanism: CacheMechanism::Cookie,
        ..Settings::default()
    };

    {
        let translator = initialized(&dir, settings.clone(), "/en").await;
        let router = Arc::new(InMemoryRouter::new());
        let reconciler = NavigationReconciler::new(translator, router);
        reconciler.init().unwrap();
        reconciler.switch_locale("fr").await.unwrap();
    }

    // Cached value wins over the URL
    let translator = initialized(&dir, settings, "/en/home").await;
    assert_eq!(translator.current_locale().as_deref(), Some("fr"));
}

#[tokio::test]
async fn test_host_navigation_patches_root_and_notifies() {
    let dir = create_fixture();
    let translator = initialized(&dir, Settings::default(), "/en").await;
    let router = Arc::new(InMemoryRouter::new());
    let reconciler = Arc::new(NavigationReconciler::new(translator, router.clone()));
    reconciler.init().unwrap();
    let mut events = reconciler.subscribe();

    let (tx, rx) = tokio::sync::mpsc::channel(4);
    let tracker = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.track_navigation(rx).await })
    };

    tx.send(NavigationStart::new("/en/home")).await.unwrap();
    tx.send(NavigationStart::new("/fr/home")).await.unwrap();
    assert_eq!(events.recv().await.unwrap(), "fr");

    tx.send(NavigationStart::new("/")).await.unwrap();
    assert_eq!(events.recv().await.unwrap(), "fr");

    drop(tx);
    tracker.await.unwrap();

    let config = router.config();
    assert_eq!(config[0].redirect_to(), Some("fr"));
    assert_eq!(config[1].path(), Some("fr"));
}

// ==================== Lazy Loading Tests ====================

struct ShopModule;

impl SubtreeLoader for ShopModule {
    fn load<'a>(&'a self, _key: &'a str) -> futures::future::BoxFuture<'a, anyhow::Result<Vec<RouteNode>>> {
        Box::pin(async { Ok(vec![RouteNode::new("cart")]) })
    }
}

#[tokio::test]
async fn test_lazy_subtree_retranslated_on_switch() {
    let dir = create_fixture();
    let translator = initialized(&dir, Settings::default(), "/fr").await;
    let loader = LocalizingLoader::new(ShopModule, translator.clone());

    let loaded = loader.load("shop").await.unwrap();
    assert_eq!(loaded[0].path(), Some("panier"));

    translator.translate_for_locale("en").await.unwrap();
    let routes = translator.routes().unwrap();
    let shop = child(routes[1].children(), "shop");
    assert_eq!(shop.loaded_routes().unwrap()[0].path(), Some("cart"));
}
