//! twitch-helper — Page driver
//!
//! Všechno, co sahá na živou stránku, jde přes tyto schopnosti:
//!   - `Page`         — hledání elementů podle CSS pravidel + interakce (klik, zápis do inputu)
//!   - `ChangeSource` — nově připojené elementy (MutationObserver)
//!   - `Scheduler`    — odložené callbacky se zrušitelným handle
//!   - `Cooldown`     — globální minimální odstup mezi akcemi
//!
//! Implementace:
//!   - `ChromePage` — reálný Chromium tab přes headless_chrome (CDP)
//!   - `MemoryPage` — HTML v paměti (scraper), pro replay a testy

pub mod bridge;
pub mod chrome;
pub mod cooldown;
pub mod finder;
pub mod memory;
pub mod pacing;
pub mod scheduler;

pub use bridge::{AddedBatch, ChangeBridge};
pub use chrome::{ChromeOptions, ChromePage};
pub use cooldown::Cooldown;
pub use memory::{MemoryPage, Reaction};
pub use pacing::{human_click, HumanDelay};
pub use scheduler::{Fired, Scheduler, TaskHandle};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identita elementu na stránce. Dva stejné id = stejný element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ElementState {
    pub attached: bool,
    pub visible: bool,
    pub enabled: bool,
}

impl ElementState {
    pub const DETACHED: Self = Self { attached: false, visible: false, enabled: false };

    /// Připojený, viditelný a ne-disabled
    pub fn usable(&self) -> bool {
        self.attached && self.visible && self.enabled
    }
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("element {0} is no longer attached")]
    Detached(ElementId),
    #[error("invalid selector '{0}'")]
    Selector(String),
    #[error("page script failed: {0}")]
    Script(String),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("unexpected page response: {0}")]
    Decode(String),
}

/// Element Locator + interakce se stránkou.
///
/// Selektory jsou CSS (včetně `[attr*="x" i]`). `scope = None` znamená celý dokument,
/// jinak se hledá jen uvnitř daného elementu (bez něj samotného).
pub trait Page: Send + Sync {
    fn query_all(&self, scope: Option<&ElementId>, selector: &str) -> Result<Vec<ElementId>, PageError>;

    fn matches(&self, el: &ElementId, selector: &str) -> Result<bool, PageError>;

    /// Nejbližší předek (včetně elementu samotného) odpovídající selektoru
    fn closest(&self, el: &ElementId, selector: &str) -> Result<Option<ElementId>, PageError>;

    /// Odpojený element vrací `ElementState::DETACHED`, ne chybu
    fn state(&self, el: &ElementId) -> Result<ElementState, PageError>;

    fn text(&self, el: &ElementId) -> Result<String, PageError>;

    fn outer_html(&self, el: &ElementId) -> Result<String, PageError>;

    fn attribute(&self, el: &ElementId, name: &str) -> Result<Option<String>, PageError>;

    /// Inline styl (`style="background-color: ..."`), ne computed
    fn inline_style(&self, el: &ElementId, property: &str) -> Result<Option<String>, PageError>;

    fn value(&self, el: &ElementId) -> Result<String, PageError>;

    fn click(&self, el: &ElementId) -> Result<(), PageError>;

    /// Focus + zápis hodnoty + `input`/`change` eventy, aby si toho
    /// všimnul i reaktivní stav stránky
    fn set_value(&self, el: &ElementId, value: &str) -> Result<(), PageError>;
}

/// Change Notifier: co se od posledního dotazu připojilo do stránky
pub trait ChangeSource: Send + Sync {
    fn observe(&self, root_selector: &str) -> Result<(), PageError>;

    fn take_added(&self) -> Result<Vec<ElementId>, PageError>;
}
