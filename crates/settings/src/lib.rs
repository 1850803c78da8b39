//! twitch-helper — Settings
//!
//! Jeden snapshot nastavení pro všechny subsystémy (bonus, overlay, predikce).
//! Snapshot se nikdy nemění na místě: při změně se celý nahradí a přes
//! `watch` kanál se rozešle všem, kdo poslouchají.
//!
//! Na disku je to JSON objekt se stejnými klíči, jaké používá editor nastavení:
//!   {"enableBonus":true,"strategy":"majority","wagerPercent":5, ...}

mod store;

pub use store::SettingsStore;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MAX_WAGER_PERCENT: u32 = 100;
pub const MAX_COUNTDOWN_SEC: u32 = 600;

/// Jak vybrat stranu predikce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Strana s víc body / vyšším podílem
    #[default]
    Majority,
    /// Strana s méně body / nižším podílem
    Minority,
    Random,
    /// Vždy první (modrá) strana
    #[serde(alias = "fixed-blue")]
    Blue,
    /// Vždy druhá (růžová) strana
    #[serde(alias = "fixed-pink")]
    Pink,
}

impl Strategy {
    /// Tolerantní parsování, neznámá hodnota → `None`
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "majority" => Some(Self::Majority),
            "minority" => Some(Self::Minority),
            "random" => Some(Self::Random),
            "blue" | "fixed-blue" => Some(Self::Blue),
            "pink" | "fixed-pink" => Some(Self::Pink),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Majority => "majority",
            Self::Minority => "minority",
            Self::Random => "random",
            Self::Blue => "blue",
            Self::Pink => "pink",
        }
    }
}

/// Aktivní režim sázky pro jedno rozhodnutí. Vždy právě jeden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WagerMode {
    Fixed(u64),
    Percent(u32),
    Quick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enable_bonus: bool,
    pub enable_overlay: bool,
    pub enable_predict: bool,

    pub strategy: Strategy,
    /// 0..=100
    pub wager_percent: u32,
    /// >0 přebíjí procenta
    pub wager_fixed: u64,
    /// Kolik sekund před uzávěrkou sázet, 0..=600
    pub predict_countdown_sec: u32,

    pub bonus_min_sec: u32,
    pub bonus_max_sec: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_bonus: true,
            enable_overlay: true,
            enable_predict: false,
            strategy: Strategy::Majority,
            wager_percent: 5,
            wager_fixed: 0,
            predict_countdown_sec: 10,
            bonus_min_sec: 5,
            bonus_max_sec: 20,
        }
    }
}

/// Klíče, které editor zná (v pořadí jako v UI)
pub const KEYS: &[&str] = &[
    "enableBonus",
    "enableOverlay",
    "enablePredict",
    "strategy",
    "wagerPercent",
    "wagerFixed",
    "predictCountdownSec",
    "bonusMinSec",
    "bonusMaxSec",
];

impl Settings {
    /// Načte snapshot z libovolného JSON. Chybějící nebo rozbité klíče
    /// dostanou default, čísla se ořežou do povolených mezí.
    pub fn from_value(raw: &Value) -> Self {
        let defaults = Self::default();
        let empty = Map::new();
        let obj = raw.as_object().unwrap_or(&empty);

        let settings = Self {
            enable_bonus: lenient_bool(obj.get("enableBonus")).unwrap_or(defaults.enable_bonus),
            enable_overlay: lenient_bool(obj.get("enableOverlay")).unwrap_or(defaults.enable_overlay),
            enable_predict: lenient_bool(obj.get("enablePredict")).unwrap_or(defaults.enable_predict),
            strategy: obj
                .get("strategy")
                .and_then(Value::as_str)
                .and_then(Strategy::parse)
                .unwrap_or(defaults.strategy),
            wager_percent: lenient_int(obj.get("wagerPercent"))
                .map(|v| v.clamp(0, MAX_WAGER_PERCENT as i64) as u32)
                .unwrap_or(defaults.wager_percent),
            wager_fixed: lenient_int(obj.get("wagerFixed"))
                .map(|v| v.max(0) as u64)
                .unwrap_or(defaults.wager_fixed),
            predict_countdown_sec: lenient_int(obj.get("predictCountdownSec"))
                .map(|v| v.clamp(0, MAX_COUNTDOWN_SEC as i64) as u32)
                .unwrap_or(defaults.predict_countdown_sec),
            bonus_min_sec: lenient_int(obj.get("bonusMinSec"))
                .map(|v| v.clamp(0, u32::MAX as i64) as u32)
                .unwrap_or(defaults.bonus_min_sec),
            bonus_max_sec: lenient_int(obj.get("bonusMaxSec"))
                .map(|v| v.clamp(0, u32::MAX as i64) as u32)
                .unwrap_or(defaults.bonus_max_sec),
        };

        settings.sanitized()
    }

    /// Ořízne hodnoty do mezí, prohodí obrácený rozsah bonusu
    pub fn sanitized(mut self) -> Self {
        self.wager_percent = self.wager_percent.min(MAX_WAGER_PERCENT);
        self.predict_countdown_sec = self.predict_countdown_sec.min(MAX_COUNTDOWN_SEC);
        self.bonus_min_sec = self.bonus_min_sec.max(1);
        self.bonus_max_sec = self.bonus_max_sec.max(1);
        if self.bonus_min_sec > self.bonus_max_sec {
            std::mem::swap(&mut self.bonus_min_sec, &mut self.bonus_max_sec);
        }
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Přepíše jeden klíč (syrová hodnota z editoru) a vrátí nový snapshot
    pub fn with_key(&self, key: &str, raw: Value) -> Option<Self> {
        if !KEYS.contains(&key) {
            return None;
        }
        let mut obj = match self.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        obj.insert(key.to_string(), raw);
        Some(Self::from_value(&Value::Object(obj)))
    }

    /// Fixní částka má přednost před procenty, jinak rychlé tlačítko
    pub fn wager_mode(&self) -> WagerMode {
        if self.wager_fixed > 0 {
            WagerMode::Fixed(self.wager_fixed)
        } else if self.wager_percent > 0 {
            WagerMode::Percent(self.wager_percent)
        } else {
            WagerMode::Quick
        }
    }
}

fn lenient_bool(v: Option<&Value>) -> Option<bool> {
    match v? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Some(true),
            "false" | "0" | "off" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Jako parseInt: "12abc" → 12, 7.9 → 7
fn lenient_int(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}
