use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Minimální odstup mezi dvěma akcemi stejného druhu (globální pro proces)
#[derive(Debug)]
pub struct Cooldown {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: Mutex::new(None) }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ready(&self) -> bool {
        self.remaining().is_none()
    }

    /// Kolik ještě zbývá, `None` = volno
    pub fn remaining(&self) -> Option<Duration> {
        let last = (*self.last.lock())?;
        let elapsed = last.elapsed();
        (elapsed < self.interval).then(|| self.interval - elapsed)
    }

    pub fn mark(&self) {
        *self.last.lock() = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn blocks_until_interval_elapsed() {
        let cd = Cooldown::new(Duration::from_secs(60));
        assert!(cd.ready());
        cd.mark();
        assert!(!cd.ready());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cd.remaining(), Some(Duration::from_secs(1)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cd.ready());
    }
}
