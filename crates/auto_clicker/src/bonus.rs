//! Bonus: "claim" tlačítko kanálových bodů.

use crate::{ClickRule, Target};
use page_driver::{finder, ElementId, HumanDelay, Page};
use settings::Settings;
use std::time::Duration;

const STRICT_BUTTON: &str = r#"button[data-a-target="community-points-summary-claim-button"]"#;
const BONUS_ICON: &str = ".claimable-bonus__icon";

#[derive(Debug, Default, Clone, Copy)]
pub struct BonusRule;

impl BonusRule {
    /// Tlačítko kolem ikonky bonusu
    fn around_icon(page: &dyn Page, icon: &ElementId) -> Option<ElementId> {
        page.closest(icon, "button").ok().flatten()
    }
}

impl ClickRule for BonusRule {
    const LABEL: &'static str = "[Bonus]";
    const EVENT: &'static str = "BONUS_CLAIMED";
    const COOLDOWN: Duration = Duration::from_secs(25);

    fn enabled(&self, settings: &Settings) -> bool {
        settings.enable_bonus
    }

    fn poll_every(&self) -> Option<Duration> {
        Some(Duration::from_secs(5))
    }

    fn scan(&self, page: &dyn Page) -> Vec<Target> {
        let strict = finder::first_usable(page, None, &[STRICT_BUTTON]);
        let button = strict.or_else(|| {
            let icon = finder::first_present(page, None, &[BONUS_ICON])?;
            Self::around_icon(page, &icon).filter(|b| finder::is_usable(page, b))
        });
        button
            .map(|b| Target { key: b.clone(), button: b })
            .into_iter()
            .collect()
    }

    fn from_added(&self, page: &dyn Page, node: &ElementId) -> Vec<Target> {
        let button = if page.matches(node, BONUS_ICON).unwrap_or(false) {
            Self::around_icon(page, node)
        } else if page.matches(node, STRICT_BUTTON).unwrap_or(false) {
            Some(node.clone())
        } else {
            finder::first_present(page, Some(node), &[STRICT_BUTTON]).or_else(|| {
                let icon = finder::first_present(page, Some(node), &[BONUS_ICON])?;
                Self::around_icon(page, &icon)
            })
        };
        button
            .map(|b| Target { key: b.clone(), button: b })
            .into_iter()
            .collect()
    }

    /// Náhodně v rozsahu z nastavení (sekundy)
    fn delay(&self, settings: &Settings) -> Duration {
        let min = u64::from(settings.bonus_min_sec) * 1000;
        let max = u64::from(settings.bonus_max_sec) * 1000;
        HumanDelay::ms(min, max).sample()
    }
}
