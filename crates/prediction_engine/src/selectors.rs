//! CSS pravidla pro predikční UI. Pořadí = priorita.

pub const REWARD_DIALOG: &str = r#"[role="dialog"][aria-labelledby="channel-points-reward-center-header"]"#;

pub const HIGHLIGHT_BUTTON: &str =
    r#"button[data-test-selector="community-prediction-highlight-header__action-button"]"#;

// ── Analyzer ──────────────────────────────────────────────────────────────────

pub const OUTCOME_COLUMN: &str = ".prediction-summary-outcome";

pub const OUTCOME_PERCENT: &str = r#"[data-test-selector="prediction-summary-outcome__percentage"], .prediction-summary-outcome__percent-hero"#;

pub const POINTS_ATTRIBUTES: &[&str] = &["data-points", "data-total-points", "data-totalpoints"];

pub const POINTS_STATS: &[&str] = &[
    r#"[data-test-selector="prediction-summary-outcome__stat"]"#,
    r#"[data-test-selector*="points"]"#,
    r#"[class*="points"]"#,
];

pub const POINTS_TEXT_NODES: &str = "p, span, div, strong";

pub const TIMERS: &[&str] = &[
    r#"[data-test-selector="prediction-timer__time-remaining"]"#,
    r#"[data-test-selector="progress-bar__time-remaining"]"#,
    r#"[data-test-selector="prediction-checkout-header__time-remaining"]"#,
    r#"[data-test-selector*="countdown"]"#,
    r#"time[data-test-selector*="countdown"]"#,
];

pub const TIMER_FALLBACK_NODES: &str = "time, p, span, div";

// ── Wager ─────────────────────────────────────────────────────────────────────

pub const CUSTOM_CONTAINER: &str = ".custom-prediction-button";
pub const CUSTOM_INPUT: &str = r#"input[type="number"]"#;
pub const CUSTOM_VOTE: &str = "button";
pub const CUSTOM_INTERACTIVE: &str = ".custom-prediction-button__interactive";

pub const MAX_BUTTONS: &[&str] = &[
    r#"button[data-a-target="community-prediction-amount-max-button"]"#,
    r#"button[aria-label*="Max" i]"#,
];

pub const WAGER_INPUTS: &[&str] = &[
    r#"input[data-a-target="community-prediction-wager-input"]"#,
    r#"input[data-test-selector="prediction-wager-input"]"#,
    r#"input[aria-label*="Predict" i]"#,
    r#"input[type="number"]"#,
];

pub const CUSTOM_TOGGLE: &[&str] =
    &[r#"button[data-test-selector="prediction-checkout-active-footer__input-type-toggle"]"#];

pub const QUICK_BLUE: &str = ".fixed-prediction-button--blue";
pub const QUICK_PINK: &str = ".fixed-prediction-button--pink";

// ── Submit ────────────────────────────────────────────────────────────────────

pub const SUBMIT_BUTTONS: &[&str] = &[
    r#"button[data-a-target="community-prediction-join-button"]"#,
    r#"button[data-test-selector="prediction-checkout-active-footer__submit-button"]"#,
    r#"button[aria-label*="Predict" i]"#,
    r#"button[aria-label*="Submit" i]"#,
    r#"button[aria-label*="Vote" i]"#,
    r#"button[type="submit"]"#,
];
