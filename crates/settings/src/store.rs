use crate::Settings;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Souborové úložiště nastavení s notifikací změn
pub struct SettingsStore {
    path: PathBuf,
    tx: watch::Sender<Arc<Settings>>,
}

impl SettingsStore {
    /// Otevře úložiště; chybějící soubor = defaulty (soubor se nevytváří)
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Self::read_file(&path)?;
        let (tx, _rx) = watch::channel(Arc::new(settings));
        Ok(Self { path, tx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Arc<Settings> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Settings>> {
        self.tx.subscribe()
    }

    /// Uloží celý snapshot a rozešle ho
    pub fn replace(&self, settings: Settings) -> Result<Arc<Settings>> {
        let settings = settings.sanitized();
        self.write_file(&settings)?;
        Ok(self.publish(settings))
    }

    /// Změní jeden klíč; neznámý klíč je chyba
    pub fn set_key(&self, key: &str, raw: Value) -> Result<Arc<Settings>> {
        let updated = self
            .current()
            .with_key(key, raw)
            .with_context(|| format!("unknown settings key '{key}'"))?;
        self.replace(updated)
    }

    pub fn reset(&self) -> Result<Arc<Settings>> {
        self.replace(Settings::default())
    }

    /// Znovu načte soubor; notifikuje jen při skutečné změně
    pub fn reload(&self) -> Result<bool> {
        let fresh = Self::read_file(&self.path)?;
        let changed = self.tx.send_if_modified(|cur| {
            if **cur == fresh {
                false
            } else {
                *cur = Arc::new(fresh.clone());
                true
            }
        });
        Ok(changed)
    }

    /// Sleduje mtime souboru a při změně přenačte
    pub fn spawn_file_watch(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut last_seen = modified_at(&self.path);
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                let now = modified_at(&self.path);
                if now == last_seen {
                    continue;
                }
                last_seen = now;
                match self.reload() {
                    Ok(true) => info!(path = %self.path.display(), "Settings changed on disk"),
                    Ok(false) => debug!("Settings file touched, content unchanged"),
                    Err(e) => warn!("Settings reload failed: {:#}", e),
                }
            }
        })
    }

    fn publish(&self, settings: Settings) -> Arc<Settings> {
        let settings = Arc::new(settings);
        self.tx.send_replace(settings.clone());
        settings
    }

    fn read_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        // Rozbitý JSON není fatální, jen se vrátí defaulty
        let value: Value = serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), "Settings file is not valid JSON ({}), using defaults", e);
            Value::Null
        });
        Ok(Settings::from_value(&value))
    }

    fn write_file(&self, settings: &Settings) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, body)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))?;
        Ok(())
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
