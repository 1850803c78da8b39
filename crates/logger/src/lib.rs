/// twitch-helper — Logger
/// JSONL event stream, NTFY alerts

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: Option<PathBuf>,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: Some(dir) }
    }

    /// Logger, který nic nezapisuje (replay, testy)
    pub fn disabled() -> Self {
        Self { log_dir: None }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let Some(dir) = &self.log_dir else {
            return Ok(());
        };
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct PredictionSubmittedEvent {
    pub ts:            String,
    pub event:         &'static str,   // "PREDICTION_SUBMITTED"
    pub dialog:        String,
    pub side:          String,         // "blue" | "pink"
    pub strategy:      String,
    pub wager_mode:    String,         // "fixed" | "percent" | "quick" | "none"
    pub wager_amount:  Option<u64>,
    pub via:           String,         // "custom_vote" | "quick_button" | "generic_submit"
    pub remaining_sec: Option<u32>,
    pub blue_pct:      Option<u32>,
    pub pink_pct:      Option<u32>,
    pub blue_points:   Option<u64>,
    pub pink_points:   Option<u64>,
}

#[derive(Serialize, Debug)]
pub struct PredictionSkippedEvent {
    pub ts:     String,
    pub event:  &'static str,   // "PREDICTION_SKIPPED"
    pub dialog: String,
    pub reason: String,
}

#[derive(Serialize, Debug)]
pub struct AutoClickEvent {
    pub ts:       String,
    pub event:    &'static str,   // "BONUS_CLAIMED" | "OVERLAY_CLOSED"
    pub target:   String,
    pub delay_ms: u64,
}

#[derive(Serialize, Debug)]
pub struct SettingsAppliedEvent {
    pub ts:             String,
    pub event:          &'static str,   // "SETTINGS_APPLIED"
    pub enable_bonus:   bool,
    pub enable_overlay: bool,
    pub enable_predict: bool,
    pub strategy:       String,
    pub wager_percent:  u32,
    pub wager_fixed:    u64,
    pub countdown_sec:  u32,
}

/// Pošli čitelný push alert
pub async fn send_ntfy_alert(topic: &str, msg: &str, title: &str) {
    let client = reqwest::Client::new();
    match client
        .post(format!("https://ntfy.sh/{topic}"))
        .header("Title", title)
        .header("Priority", "default")
        .header("Tags", "crystal_ball")
        .body(msg.to_string())
        .send()
        .await
    {
        Ok(_)  => tracing::info!("NTFY sent: {}", title),
        Err(e) => tracing::warn!("NTFY failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EventLogger::new(dir.path());
        for reason in ["locked", "no_submit_control"] {
            logger
                .log(&PredictionSkippedEvent {
                    ts: now_iso(),
                    event: "PREDICTION_SKIPPED",
                    dialog: "m12".into(),
                    reason: reason.into(),
                })
                .unwrap();
        }

        let file = fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap().path();
        let body = fs::read_to_string(file).unwrap();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"reason\":\"no_submit_control\""));
    }

    #[test]
    fn disabled_logger_writes_nothing() {
        let logger = EventLogger::disabled();
        assert!(logger
            .log(&AutoClickEvent { ts: now_iso(), event: "BONUS_CLAIMED", target: "x".into(), delay_ms: 1 })
            .is_ok());
    }
}
