//! Lidské tempo: náhodná pauza před každou interakcí.

use crate::{finder, ElementId, Page, PageError};
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDelay {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl HumanDelay {
    pub const ZERO: Self = Self { min_ms: 0, max_ms: 0 };

    pub const fn ms(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Náhodná délka v [min, max]
    pub fn sample(&self) -> Duration {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        if lo == hi {
            return Duration::from_millis(lo);
        }
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }

    pub async fn pause(&self) -> Duration {
        let d = self.sample();
        if !d.is_zero() {
            sleep(d).await;
        }
        d
    }
}

/// Počká a klikne, jen pokud je element pořád použitelný.
/// `Ok(false)` = element mezitím zmizel / zešedl, nic se nestalo.
pub async fn human_click(page: &dyn Page, el: &ElementId, delay: HumanDelay) -> Result<bool, PageError> {
    delay.pause().await;
    if !finder::is_usable(page, el) {
        return Ok(false);
    }
    page.click(el)?;
    Ok(true)
}
