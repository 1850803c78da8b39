//! Stav jednoho predikčního dialogu.
//!
//! idle → waitingForTimer → processing → done. Retry vyhodnocuje znovu
//! od začátku. Z `done` už se nikam nejde.

use page_driver::TaskHandle;
use std::time::Duration;

/// Kolikrát max čekat na neviditelný timer, pak se jede bez něj
pub const MAX_TIMER_ATTEMPTS: u32 = 80;

const MIN_RETRY: Duration = Duration::from_millis(200);
const MIN_TIMER_WAIT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    WaitingForTimer,
    Processing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerGate {
    /// Naplánovat retry
    Wait(Duration),
    /// Jít do processing; `guarded = false` když timer nebyl nalezen
    Ready { guarded: bool },
}

#[derive(Debug, Default)]
pub struct DialogSession {
    phase: Phase,
    timer_retries: u32,
    pending: Option<TaskHandle>,
}

impl DialogSession {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timer_retries(&self) -> u32 {
        self.timer_retries
    }

    pub fn pending(&self) -> Option<TaskHandle> {
        self.pending
    }

    /// Processing nebo done: žádná další akce
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Processing | Phase::Done)
    }

    /// Rozhodne podle zbývajícího času, jestli už sázet
    pub fn gate(&mut self, remaining: Option<u32>, target_sec: u32) -> TimerGate {
        match remaining {
            None => {
                self.timer_retries += 1;
                if self.timer_retries <= MAX_TIMER_ATTEMPTS {
                    let backoff = 300 + 150 * u64::from(self.timer_retries);
                    TimerGate::Wait(Duration::from_millis(backoff.min(2000)).max(MIN_RETRY))
                } else {
                    TimerGate::Ready { guarded: false }
                }
            }
            Some(left) => {
                self.timer_retries = 0;
                if left > target_sec {
                    let wait = Duration::from_secs(u64::from(left - target_sec));
                    TimerGate::Wait(wait.max(MIN_TIMER_WAIT))
                } else {
                    TimerGate::Ready { guarded: true }
                }
            }
        }
    }

    /// Čeká na retry; vrací předchozí handle ke zrušení
    pub fn wait(&mut self, handle: TaskHandle) -> Option<TaskHandle> {
        self.phase = Phase::WaitingForTimer;
        self.pending.replace(handle)
    }

    /// Doručený retry. False = cizí / starý handle, ignorovat.
    pub fn retry_fired(&mut self, handle: TaskHandle) -> bool {
        if self.pending != Some(handle) {
            return false;
        }
        self.pending = None;
        if self.phase == Phase::WaitingForTimer {
            self.phase = Phase::Idle;
        }
        true
    }

    /// Vstup do processing; vrací čekající retry ke zrušení
    pub fn begin_processing(&mut self) -> Option<TaskHandle> {
        self.phase = Phase::Processing;
        self.timer_retries = 0;
        self.pending.take()
    }

    pub fn finish(&mut self) {
        self.phase = Phase::Done;
        self.pending = None;
    }
}
