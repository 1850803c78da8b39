//! Prediction Decision Engine.
//!
//! Jeden engine = jeden běh subsystému predikcí. Drží registry dialogů
//! (klíč = identita elementu), scheduler retry/pollů a sadu highlight
//! tlačítek, která se právě otevírají. Všechno se mění jen z `run` smyčky;
//! zpracování dialogu běží v samostatném tasku a výsledek posílá zpět.
//!
//! Drop enginu (stop) zruší všechny naplánované eventy a zahodí stav.
//! Rozběhnuté zpracování doběhne, jeho výsledek už nikdo nečte.

use crate::analyzer;
use crate::pacing::Pacing;
use crate::process::{process_dialog, ProcessOutcome};
use crate::selectors::{HIGHLIGHT_BUTTON, REWARD_DIALOG};
use crate::session::{DialogSession, Phase, TimerGate};
use logger::EventLogger;
use page_driver::{finder, AddedBatch, Cooldown, ElementId, Fired, Page, Scheduler};
use settings::Settings;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Min. odstup dvou odeslaných predikcí (napříč dialogy)
pub const PREDICT_COOLDOWN: Duration = Duration::from_secs(60);

const POLL_EVERY: Duration = Duration::from_secs(4);
const DIALOG_POLL_EVERY: Duration = Duration::from_millis(100);
const DIALOG_POLL_ATTEMPTS: u32 = 60;
const HIGHLIGHT_RELEASE: Duration = Duration::from_secs(4);

/// Všechno, co engine a zpracování dialogu sdílí
#[derive(Clone)]
pub struct EngineContext {
    pub page: Arc<dyn Page>,
    pub settings: Arc<Settings>,
    /// Sdílený přes restarty subsystému
    pub cooldown: Arc<Cooldown>,
    pub logger: Arc<EventLogger>,
    pub pacing: Pacing,
    pub ntfy_topic: Option<String>,
}

#[derive(Debug)]
enum EngineEvent {
    Retry(ElementId),
    OpenHighlight(ElementId),
    DialogPoll { attempt: u32 },
    ReleaseHighlight(ElementId),
}

#[derive(Debug)]
struct Processed {
    dialog: ElementId,
    outcome: ProcessOutcome,
}

enum Wake {
    Stop,
    Changes(Result<AddedBatch, broadcast::error::RecvError>),
    Poll,
    Fired(Fired<EngineEvent>),
    Processed(Processed),
}

pub struct PredictionEngine {
    ctx: EngineContext,
    sessions: HashMap<ElementId, DialogSession>,
    opening: HashSet<ElementId>,
    scheduler: Scheduler<EngineEvent>,
    fired: mpsc::UnboundedReceiver<Fired<EngineEvent>>,
    processed_tx: mpsc::UnboundedSender<Processed>,
    processed_rx: mpsc::UnboundedReceiver<Processed>,
}

impl PredictionEngine {
    pub fn new(ctx: EngineContext) -> Self {
        let (scheduler, fired) = Scheduler::new();
        let (processed_tx, processed_rx) = mpsc::unbounded_channel();
        Self {
            ctx,
            sessions: HashMap::new(),
            opening: HashSet::new(),
            scheduler,
            fired,
            processed_tx,
            processed_rx,
        }
    }

    pub fn phase(&self, dialog: &ElementId) -> Option<Phase> {
        self.sessions.get(dialog).map(DialogSession::phase)
    }

    pub fn sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Naplánované retry / polly / otevírání
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Hlavní smyčka subsystému, končí signálem `stop`
    pub async fn run(mut self, mut changes: broadcast::Receiver<AddedBatch>, mut stop: oneshot::Receiver<()>) {
        info!("[Predict] started");
        self.scan();

        let mut poll = tokio::time::interval(POLL_EVERY);
        poll.tick().await;
        let mut changes_open = true;

        loop {
            let wake = tokio::select! {
                _ = &mut stop => Wake::Stop,
                batch = changes.recv(), if changes_open => Wake::Changes(batch),
                _ = poll.tick() => Wake::Poll,
                Some(fired) = self.fired.recv() => Wake::Fired(fired),
                Some(done) = self.processed_rx.recv() => Wake::Processed(done),
            };

            match wake {
                Wake::Stop => break,
                Wake::Changes(Ok(batch)) => self.on_added(&batch),
                Wake::Changes(Err(broadcast::error::RecvError::Lagged(n))) => {
                    debug!(skipped = n, "[Predict] change feed lagged, rescanning");
                    self.scan();
                }
                Wake::Changes(Err(broadcast::error::RecvError::Closed)) => {
                    warn!("[Predict] change feed closed, continuing with polling only");
                    changes_open = false;
                }
                Wake::Poll => self.poll(),
                Wake::Fired(fired) => self.handle_fired(fired),
                Wake::Processed(done) => self.handle_processed(done),
            }
        }

        self.scheduler.cancel_all();
        self.sessions.clear();
        info!("[Predict] stopped");
    }

    /// Zpracuje jeden interní event (retry, poll, hotové zpracování).
    /// Smyčka bez změn stránky, hlavně pro testy a replay.
    pub async fn step(&mut self) {
        let wake = tokio::select! {
            Some(fired) = self.fired.recv() => Wake::Fired(fired),
            Some(done) = self.processed_rx.recv() => Wake::Processed(done),
        };
        match wake {
            Wake::Fired(fired) => self.handle_fired(fired),
            Wake::Processed(done) => self.handle_processed(done),
            _ => {}
        }
    }

    /// Start-up scan: už viditelné highlight tlačítko a otevřený dialog
    pub fn scan(&mut self) {
        let page = self.ctx.page.clone();
        if let Some(button) = finder::first_usable(page.as_ref(), None, &[HIGHLIGHT_BUTTON]) {
            self.schedule_open(&button);
        }
        if let Some(dialog) = finder::first_visible(page.as_ref(), None, &[REWARD_DIALOG]) {
            self.evaluate(&dialog);
        }
    }

    /// Nově připojené elementy z change bridge. Highlight tlačítko a dialog
    /// se hledají nezávisle, mohou přijít ve stejném uzlu.
    pub fn on_added(&mut self, batch: &[ElementId]) {
        let page = self.ctx.page.clone();
        for node in batch {
            if let Some(button) = finder::self_or_descendant(page.as_ref(), node, HIGHLIGHT_BUTTON) {
                if finder::is_usable(page.as_ref(), &button) {
                    self.schedule_open(&button);
                }
            }
            if let Some(dialog) = finder::self_or_descendant(page.as_ref(), node, REWARD_DIALOG) {
                if finder::is_visible(page.as_ref(), &dialog) {
                    self.evaluate(&dialog);
                }
            }
        }
    }

    /// Periodická kontrola: úklid odpojených dialogů + otevřený dialog
    pub fn poll(&mut self) {
        let page = self.ctx.page.clone();
        let gone: Vec<ElementId> = self
            .sessions
            .keys()
            .filter(|d| !is_attached(page.as_ref(), d))
            .cloned()
            .collect();
        for dialog in gone {
            debug!(dialog = %dialog, "[Predict] dialog left the page, dropping session");
            self.discard(&dialog);
        }

        if !self.ctx.settings.enable_predict {
            return;
        }
        if let Some(dialog) = finder::first_visible(page.as_ref(), None, &[REWARD_DIALOG]) {
            self.evaluate(&dialog);
        }
    }

    /// Jedno vyhodnocení dialogu podle stavového automatu
    pub fn evaluate(&mut self, dialog: &ElementId) {
        if !self.ctx.settings.enable_predict {
            return;
        }
        if let Some(left) = self.ctx.cooldown.remaining() {
            debug!(dialog = %dialog, left_ms = left.as_millis() as u64, "[Predict] cooldown active");
            return;
        }

        let page = self.ctx.page.clone();
        if !is_attached(page.as_ref(), dialog) {
            self.discard(dialog);
            return;
        }

        let session = self.sessions.entry(dialog.clone()).or_default();
        if session.is_busy() {
            return;
        }

        let remaining = analyzer::remaining(page.as_ref(), dialog);
        let target = self.ctx.settings.predict_countdown_sec;

        match session.gate(remaining, target) {
            TimerGate::Wait(delay) => {
                let handle = self.scheduler.schedule(delay, EngineEvent::Retry(dialog.clone()));
                if let Some(old) = session.wait(handle) {
                    self.scheduler.cancel(old);
                }
                match remaining {
                    Some(left) => info!(
                        dialog = %dialog,
                        "[Predict] Timer at {}s (target {}s), retry in {}s",
                        left,
                        target,
                        delay.as_secs()
                    ),
                    None => debug!(
                        dialog = %dialog,
                        attempt = session.timer_retries(),
                        "[Predict] Timer not visible yet, retry in {}ms",
                        delay.as_millis()
                    ),
                }
            }
            TimerGate::Ready { guarded } => {
                if let Some(old) = session.begin_processing() {
                    self.scheduler.cancel(old);
                }
                if !guarded {
                    info!(dialog = %dialog, "[Predict] Timer not found, proceeding without countdown guard");
                }

                let ctx = self.ctx.clone();
                let tx = self.processed_tx.clone();
                let dialog = dialog.clone();
                tokio::spawn(async move {
                    let outcome = process_dialog(&ctx, &dialog).await;
                    let _ = tx.send(Processed { dialog, outcome });
                });
            }
        }
    }

    fn handle_fired(&mut self, fired: Fired<EngineEvent>) {
        if !self.scheduler.complete(fired.handle) {
            return;
        }
        match fired.event {
            EngineEvent::Retry(dialog) => {
                let Some(session) = self.sessions.get_mut(&dialog) else {
                    return;
                };
                if session.retry_fired(fired.handle) {
                    self.evaluate(&dialog);
                }
            }
            EngineEvent::OpenHighlight(button) => self.open_highlight(button),
            EngineEvent::DialogPoll { attempt } => self.poll_for_dialog(attempt),
            EngineEvent::ReleaseHighlight(button) => {
                self.opening.remove(&button);
            }
        }
    }

    fn handle_processed(&mut self, done: Processed) {
        if let Some(session) = self.sessions.get_mut(&done.dialog) {
            session.finish();
        }
        match &done.outcome {
            ProcessOutcome::Submitted { side, route } => {
                info!(dialog = %done.dialog, side = %side, via = route.as_str(), "[Predict] prediction submitted")
            }
            other => info!(dialog = %done.dialog, outcome = ?other, "[Predict] dialog finished without submission"),
        }
    }

    fn schedule_open(&mut self, button: &ElementId) {
        if !self.ctx.settings.enable_predict {
            return;
        }
        if !self.opening.insert(button.clone()) {
            return;
        }
        let delay = self.ctx.pacing.open_highlight.sample();
        self.scheduler.schedule(delay, EngineEvent::OpenHighlight(button.clone()));
        debug!(button = %button, delay_ms = delay.as_millis() as u64, "[Predict] highlight open scheduled");
    }

    fn open_highlight(&mut self, button: ElementId) {
        let page = self.ctx.page.clone();
        if !self.ctx.settings.enable_predict || !finder::is_usable(page.as_ref(), &button) {
            self.opening.remove(&button);
            return;
        }

        match page.click(&button) {
            Ok(()) => {
                info!(button = %button, "[Predict] opened prediction from highlight");
                self.scheduler.schedule(Duration::ZERO, EngineEvent::DialogPoll { attempt: 0 });
            }
            Err(e) => warn!("[Predict] open failed: {}", e),
        }
        self.scheduler.schedule(HIGHLIGHT_RELEASE, EngineEvent::ReleaseHighlight(button));
    }

    fn poll_for_dialog(&mut self, attempt: u32) {
        let page = self.ctx.page.clone();
        if let Some(dialog) = finder::first_visible(page.as_ref(), None, &[REWARD_DIALOG]) {
            self.evaluate(&dialog);
            return;
        }
        if attempt + 1 < DIALOG_POLL_ATTEMPTS {
            self.scheduler
                .schedule(DIALOG_POLL_EVERY, EngineEvent::DialogPoll { attempt: attempt + 1 });
        } else {
            debug!("[Predict] reward dialog did not appear after opening");
        }
    }

    fn discard(&mut self, dialog: &ElementId) {
        if let Some(session) = self.sessions.remove(dialog) {
            if let Some(handle) = session.pending() {
                self.scheduler.cancel(handle);
            }
        }
    }
}

fn is_attached(page: &dyn Page, el: &ElementId) -> bool {
    page.state(el).map(|s| s.attached).unwrap_or(false)
}
