use page_driver::HumanDelay;
use std::time::Duration;

/// Pauzy před jednotlivými interakcemi s dialogem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub open_highlight: HumanDelay,
    pub focus: HumanDelay,
    pub toggle: HumanDelay,
    pub toggle_settle: Duration,
    pub max_button: HumanDelay,
    pub max_settle: Duration,
    pub custom_vote: HumanDelay,
    pub quick_button: HumanDelay,
    pub generic_submit: HumanDelay,
}

impl Pacing {
    pub const fn human() -> Self {
        Self {
            open_highlight: HumanDelay::ms(600, 1600),
            focus: HumanDelay::ms(300, 700),
            toggle: HumanDelay::ms(300, 700),
            toggle_settle: Duration::from_millis(200),
            max_button: HumanDelay::ms(200, 500),
            max_settle: Duration::from_millis(150),
            custom_vote: HumanDelay::ms(250, 700),
            quick_button: HumanDelay::ms(200, 500),
            generic_submit: HumanDelay::ms(250, 700),
        }
    }

    /// Bez pauz (replay, testy)
    pub const fn instant() -> Self {
        Self {
            open_highlight: HumanDelay::ZERO,
            focus: HumanDelay::ZERO,
            toggle: HumanDelay::ZERO,
            toggle_settle: Duration::ZERO,
            max_button: HumanDelay::ZERO,
            max_settle: Duration::ZERO,
            custom_vote: HumanDelay::ZERO,
            quick_button: HumanDelay::ZERO,
            generic_submit: HumanDelay::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::human()
    }
}

pub(crate) async fn settle(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}
