/// Bootstrap — (re)start / stop subsystémů podle nastavení
///
/// Každá změna nastavení = zastavit a znovu spustit zapnuté subsystémy
/// s novým snapshotem, vypnuté jen zastavit. Cooldowny jsou sdílené,
/// restart je nenuluje.

use auto_clicker::{AutoClicker, BonusRule, ClickRule, OverlayRule};
use logger::{now_iso, EventLogger, SettingsAppliedEvent};
use page_driver::{AddedBatch, Cooldown, Page};
use prediction_engine::{EngineContext, Pacing, PredictionEngine, PREDICT_COOLDOWN};
use settings::Settings;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// Co dostanou všechny subsystémy
pub struct Shared {
    pub page: Arc<dyn Page>,
    pub changes: broadcast::Sender<AddedBatch>,
    pub settings: watch::Receiver<Arc<Settings>>,
    pub logger: Arc<EventLogger>,
    pub pacing: Pacing,
    pub ntfy_topic: Option<String>,
}

struct Running {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Running {
    fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(stop_rx));
        Self { stop, task }
    }

    async fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}

pub struct Bootstrap {
    shared: Shared,
    bonus_cooldown: Arc<Cooldown>,
    overlay_cooldown: Arc<Cooldown>,
    predict_cooldown: Arc<Cooldown>,
    bonus: Option<Running>,
    overlay: Option<Running>,
    predict: Option<Running>,
}

impl Bootstrap {
    pub fn new(shared: Shared) -> Self {
        Self {
            shared,
            bonus_cooldown: Arc::new(Cooldown::new(BonusRule::COOLDOWN)),
            overlay_cooldown: Arc::new(Cooldown::new(OverlayRule::COOLDOWN)),
            predict_cooldown: Arc::new(Cooldown::new(PREDICT_COOLDOWN)),
            bonus: None,
            overlay: None,
            predict: None,
        }
    }

    /// (bonus, overlay, predict)
    pub fn running(&self) -> (bool, bool, bool) {
        (self.bonus.is_some(), self.overlay.is_some(), self.predict.is_some())
    }

    pub async fn boot(&mut self, settings: &Arc<Settings>) {
        let _ = self.shared.logger.log(&SettingsAppliedEvent {
            ts: now_iso(),
            event: "SETTINGS_APPLIED",
            enable_bonus: settings.enable_bonus,
            enable_overlay: settings.enable_overlay,
            enable_predict: settings.enable_predict,
            strategy: settings.strategy.as_str().to_string(),
            wager_percent: settings.wager_percent,
            wager_fixed: settings.wager_fixed,
            countdown_sec: settings.predict_countdown_sec,
        });

        // BONUS
        stop(&mut self.bonus).await;
        if settings.enable_bonus {
            let clicker = self.clicker(BonusRule, self.bonus_cooldown.clone());
            let changes = self.shared.changes.subscribe();
            self.bonus = Some(Running::spawn(move |stop| clicker.run(changes, stop)));
        }

        // OVERLAY
        stop(&mut self.overlay).await;
        if settings.enable_overlay {
            let clicker = self.clicker(OverlayRule, self.overlay_cooldown.clone());
            let changes = self.shared.changes.subscribe();
            self.overlay = Some(Running::spawn(move |stop| clicker.run(changes, stop)));
        }

        // PREDICT
        stop(&mut self.predict).await;
        if settings.enable_predict {
            let engine = PredictionEngine::new(EngineContext {
                page: self.shared.page.clone(),
                settings: settings.clone(),
                cooldown: self.predict_cooldown.clone(),
                logger: self.shared.logger.clone(),
                pacing: self.shared.pacing,
                ntfy_topic: self.shared.ntfy_topic.clone(),
            });
            let changes = self.shared.changes.subscribe();
            self.predict = Some(Running::spawn(move |stop| engine.run(changes, stop)));
        }

        let (bonus, overlay, predict) = self.running();
        info!(bonus, overlay, predict, strategy = settings.strategy.as_str(), "Subsystems booted");
    }

    pub async fn shutdown(&mut self) {
        stop(&mut self.bonus).await;
        stop(&mut self.overlay).await;
        stop(&mut self.predict).await;
    }

    fn clicker<R: ClickRule>(&self, rule: R, cooldown: Arc<Cooldown>) -> AutoClicker<R> {
        AutoClicker::new(
            rule,
            self.shared.page.clone(),
            self.shared.settings.clone(),
            cooldown,
            self.shared.logger.clone(),
        )
    }
}

async fn stop(slot: &mut Option<Running>) {
    if let Some(running) = slot.take() {
        running.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_driver::MemoryPage;
    use std::time::Duration;

    fn shared(page: &Arc<MemoryPage>, settings: &Arc<Settings>) -> (Shared, watch::Sender<Arc<Settings>>) {
        let (changes, _) = broadcast::channel(16);
        let (tx, rx) = watch::channel(settings.clone());
        let page: Arc<dyn Page> = page.clone();
        let shared = Shared {
            page,
            changes,
            settings: rx,
            logger: Arc::new(EventLogger::disabled()),
            pacing: Pacing::instant(),
            ntfy_topic: None,
        };
        (shared, tx)
    }

    #[tokio::test(start_paused = true)]
    async fn boot_follows_toggles() {
        let page = Arc::new(MemoryPage::new("<div></div>"));
        let all_on = Arc::new(Settings { enable_predict: true, ..Settings::default() });
        let (shared, _tx) = shared(&page, &all_on);
        let mut boot = Bootstrap::new(shared);

        boot.boot(&all_on).await;
        assert_eq!(boot.running(), (true, true, true));

        let only_bonus = Arc::new(Settings { enable_overlay: false, enable_predict: false, ..Settings::default() });
        boot.boot(&only_bonus).await;
        assert_eq!(boot.running(), (true, false, false));

        boot.shutdown().await;
        assert_eq!(boot.running(), (false, false, false));
    }

    #[tokio::test(start_paused = true)]
    async fn bonus_cooldown_survives_restart() {
        let page = Arc::new(MemoryPage::new(
            r#"<button data-a-target="community-points-summary-claim-button" id="claim">+50</button>"#,
        ));
        let settings = Arc::new(Settings {
            enable_overlay: false,
            bonus_min_sec: 1,
            bonus_max_sec: 1,
            ..Settings::default()
        });
        let (shared, _tx) = shared(&page, &settings);
        let mut boot = Bootstrap::new(shared);

        boot.boot(&settings).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(page.click_count("#claim"), 1);

        // restart do 25 s nesmí kliknout znovu
        boot.boot(&settings).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(page.click_count("#claim"), 1);

        boot.shutdown().await;
    }
}
