/// twitch-helper — Channel Points Helper
///
/// Co dělá:
///   1. Otevře kanál v Chromiu (profil s přihlášením)
///   2. Bonus: kliká na "claim" kanálových bodů s náhodnou pauzou
///   3. Overlay: zavírá "Return to stream" překryv přes přehrávač
///   4. Predikce: když přijde dialog, počká na konec odpočtu,
///      vybere stranu podle strategie, vsadí a odešle
///   5. Každá změna settings.json (editor / ruční úprava) = restart subsystémů
///
/// Spuštění:
///   HELPER_CHANNEL_URL=https://www.twitch.tv/<kanal> cargo run --bin twitch-helper

mod bootstrap;

use anyhow::{Context, Result};
use bootstrap::{Bootstrap, Shared};
use dotenv::dotenv;
use logger::EventLogger;
use page_driver::{ChangeBridge, ChangeSource, ChromeOptions, ChromePage, Page};
use prediction_engine::Pacing;
use settings::SettingsStore;
use std::env;
use std::fs::File;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

// CDP volání běží přes block_in_place, potřebuje multi-thread runtime
#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!("=== twitch-helper — channel points ===");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("twitch_helper.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of twitch-helper is already running! Exiting.");
            return Ok(());
        }
    };

    let channel_url = env::var("HELPER_CHANNEL_URL").context("HELPER_CHANNEL_URL is not set")?;
    let settings_path = env::var("HELPER_SETTINGS_PATH").unwrap_or_else(|_| "settings.json".to_string());
    let log_dir = env::var("HELPER_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let ntfy_topic = env::var("NTFY_TOPIC").ok().filter(|t| !t.trim().is_empty());
    let watch_secs = env::var("HELPER_SETTINGS_POLL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(2);

    let store = Arc::new(
        SettingsStore::open(&settings_path)
            .with_context(|| format!("Cannot open settings at {}", settings_path))?,
    );
    info!("Settings: {} (re-read every {}s)", store.path().display(), watch_secs);
    let _file_watch = store.clone().spawn_file_watch(Duration::from_secs(watch_secs));
    let mut settings_rx = store.subscribe();

    // Chromium launch + navigace jsou blokující
    let chrome_opts = ChromeOptions::from_env();
    let url = channel_url.clone();
    let chrome = tokio::task::spawn_blocking(move || -> Result<ChromePage> {
        let page = ChromePage::launch(&chrome_opts)?;
        page.navigate(&url)?;
        Ok(page)
    })
    .await
    .context("Chrome launch task panicked")??;
    let chrome = Arc::new(chrome);
    info!("Page ready: {}", channel_url);

    let source: Arc<dyn ChangeSource> = chrome.clone();
    let bridge = ChangeBridge::spawn(source, "html", Duration::from_millis(250));

    let page: Arc<dyn Page> = chrome.clone();
    let mut boot = Bootstrap::new(Shared {
        page,
        changes: bridge.sender(),
        settings: settings_rx.clone(),
        logger: Arc::new(EventLogger::new(&log_dir)),
        pacing: Pacing::default(),
        ntfy_topic,
    });

    let initial = settings_rx.borrow_and_update().clone();
    boot.boot(&initial).await;
    info!("🚀 READY. Ctrl-C to stop.");

    loop {
        let changed = tokio::select! {
            _ = tokio::signal::ctrl_c() => false,
            res = settings_rx.changed() => res.is_ok(),
        };
        if !changed {
            break;
        }
        let snapshot = settings_rx.borrow_and_update().clone();
        info!("Settings changed → restarting subsystems");
        boot.boot(&snapshot).await;
    }

    info!("Shutting down...");
    boot.shutdown().await;
    Ok(())
}
