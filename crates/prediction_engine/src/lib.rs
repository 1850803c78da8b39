//! twitch-helper — Prediction engine
//!
//! Hlídá predikční dialog na stránce a jednou za dialog vsadí:
//!   1. timer gate — čeká, až do uzávěrky zbývá ≤ N sekund
//!   2. analyzer   — procenta / body / zbývající čas z textu dialogu
//!   3. strategy   — majority / minority / random / pevná strana
//!   4. wager      — fixní částka, % z balance, nebo rychlé tlačítko
//!   5. submit     — custom vote → quick button → obecné submit tlačítko
//!
//! Heuristiky místo API: stránka se může kdykoliv změnit, takže
//! "nenalezeno" je normální stav a nic z toho nesmí shodit proces.

pub mod analyzer;
pub mod engine;
pub mod pacing;
pub mod process;
pub mod selectors;
pub mod session;
pub mod strategy;
pub mod submit;
pub mod wager;

pub use analyzer::{analyze, parse_countdown_seconds, parse_points_value, OutcomeSnapshot, SideSignal};
pub use engine::{EngineContext, PredictionEngine, PREDICT_COOLDOWN};
pub use pacing::Pacing;
pub use process::{process_dialog, ProcessOutcome};
pub use session::{DialogSession, Phase, TimerGate};
pub use strategy::{select_side, Side};
pub use submit::{submit, SubmitRoute};
pub use wager::{plan_wager, WagerPlan};
