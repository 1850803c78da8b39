//! twitch-helper — Auto-clickers
//!
//! Jednorázové klikače se stejnou kostrou:
//!   najdi cíl → naplánuj klik s náhodnou pauzou → při výstřelu ověř,
//!   že je funkce pořád zapnutá a tlačítko použitelné → klikni → cooldown.
//!
//! Co se hledá a jak dlouho čekat, určuje `ClickRule` (bonus, overlay).

pub mod bonus;
pub mod overlay;

pub use bonus::BonusRule;
pub use overlay::OverlayRule;

use logger::{now_iso, AutoClickEvent, EventLogger};
use page_driver::{finder, AddedBatch, Cooldown, ElementId, Fired, Page, Scheduler};
use settings::Settings;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Na co kliknout. `key` = element, podle kterého se hlídá jedno naplánování.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub key: ElementId,
    pub button: ElementId,
}

pub trait ClickRule: Send + 'static {
    /// Prefix do logu, např. "[Bonus]"
    const LABEL: &'static str;
    /// Typ eventu v JSONL logu
    const EVENT: &'static str;
    /// Min. odstup dvou kliků
    const COOLDOWN: Duration;

    fn enabled(&self, settings: &Settings) -> bool;

    /// Periodická kontrola; `None` = jen notifikace a start-up scan
    fn poll_every(&self) -> Option<Duration>;

    /// Cíle, které jsou na stránce teď
    fn scan(&self, page: &dyn Page) -> Vec<Target>;

    /// Cíle, které přinesl nově připojený element
    fn from_added(&self, page: &dyn Page, node: &ElementId) -> Vec<Target>;

    fn delay(&self, settings: &Settings) -> Duration;
}

#[derive(Debug)]
struct Pending {
    target: Target,
    delay: Duration,
}

enum Wake {
    Stop,
    Changes(Result<AddedBatch, broadcast::error::RecvError>),
    Poll,
    Fired(Fired<Pending>),
}

pub struct AutoClicker<R: ClickRule> {
    rule: R,
    page: Arc<dyn Page>,
    settings: watch::Receiver<Arc<Settings>>,
    cooldown: Arc<Cooldown>,
    logger: Arc<EventLogger>,
    scheduled: HashSet<ElementId>,
    scheduler: Scheduler<Pending>,
    fired: mpsc::UnboundedReceiver<Fired<Pending>>,
}

impl<R: ClickRule> AutoClicker<R> {
    pub fn new(
        rule: R,
        page: Arc<dyn Page>,
        settings: watch::Receiver<Arc<Settings>>,
        cooldown: Arc<Cooldown>,
        logger: Arc<EventLogger>,
    ) -> Self {
        let (scheduler, fired) = Scheduler::new();
        Self {
            rule,
            page,
            settings,
            cooldown,
            logger,
            scheduled: HashSet::new(),
            scheduler,
            fired,
        }
    }

    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    pub async fn run(mut self, mut changes: broadcast::Receiver<AddedBatch>, mut stop: oneshot::Receiver<()>) {
        info!("{} started", R::LABEL);
        self.scan();

        let polls = self.rule.poll_every();
        let mut poll = tokio::time::interval(polls.unwrap_or(Duration::from_secs(3600)));
        poll.tick().await;
        let mut changes_open = true;

        loop {
            let wake = tokio::select! {
                _ = &mut stop => Wake::Stop,
                batch = changes.recv(), if changes_open => Wake::Changes(batch),
                _ = poll.tick(), if polls.is_some() => Wake::Poll,
                Some(fired) = self.fired.recv() => Wake::Fired(fired),
            };

            match wake {
                Wake::Stop => break,
                Wake::Changes(Ok(batch)) => self.on_added(&batch),
                Wake::Changes(Err(broadcast::error::RecvError::Lagged(_))) => self.scan(),
                Wake::Changes(Err(broadcast::error::RecvError::Closed)) => {
                    warn!("{} change feed closed", R::LABEL);
                    changes_open = false;
                }
                Wake::Poll => self.poll(),
                Wake::Fired(fired) => self.fire(fired),
            }
        }

        self.scheduler.cancel_all();
        self.scheduled.clear();
        info!("{} stopped", R::LABEL);
    }

    /// Doručí jeden naplánovaný klik (testy)
    pub async fn step(&mut self) {
        if let Some(fired) = self.fired.recv().await {
            self.fire(fired);
        }
    }

    pub fn scan(&mut self) {
        let targets = self.rule.scan(self.page.as_ref());
        for target in targets {
            self.schedule(target);
        }
    }

    pub fn on_added(&mut self, batch: &[ElementId]) {
        let page = self.page.clone();
        for node in batch {
            for target in self.rule.from_added(page.as_ref(), node) {
                self.schedule(target);
            }
        }
    }

    fn poll(&mut self) {
        if self.rule.enabled(&self.settings.borrow()) {
            self.scan();
        }
    }

    fn schedule(&mut self, target: Target) {
        let settings = self.settings.borrow().clone();
        if !self.rule.enabled(&settings) {
            return;
        }
        if self.scheduled.contains(&target.key) {
            return;
        }
        if !self.cooldown.ready() {
            return;
        }

        let delay = self.rule.delay(&settings);
        self.scheduled.insert(target.key.clone());
        info!(target = %target.button, delay_ms = delay.as_millis() as u64, "{} detected, clicking soon", R::LABEL);
        self.scheduler.schedule(delay, Pending { target, delay });
    }

    fn fire(&mut self, fired: Fired<Pending>) {
        if !self.scheduler.complete(fired.handle) {
            return;
        }
        let Pending { target, delay } = fired.event;
        self.scheduled.remove(&target.key);

        if !self.rule.enabled(&self.settings.borrow()) {
            debug!("{} disabled before click", R::LABEL);
            return;
        }
        if !finder::is_usable(self.page.as_ref(), &target.button) {
            debug!(target = %target.button, "{} target gone before click", R::LABEL);
            return;
        }

        match self.page.click(&target.button) {
            Ok(()) => {
                self.cooldown.mark();
                info!(target = %target.button, "{} clicked", R::LABEL);
                let _ = self.logger.log(&AutoClickEvent {
                    ts: now_iso(),
                    event: R::EVENT,
                    target: target.button.to_string(),
                    delay_ms: delay.as_millis() as u64,
                });
            }
            Err(e) => warn!("{} click failed: {}", R::LABEL, e),
        }
    }
}
