//! Wager Planner — kolik vsadit a kam to napsat.
//!
//! Fixní částka > procenta z balance > rychlé tlačítko > nic.
//! Zápis do inputu jde přes `Page::set_value` (input/change eventy).

use crate::pacing::{settle, Pacing};
use crate::selectors::{
    CUSTOM_CONTAINER, CUSTOM_INPUT, CUSTOM_INTERACTIVE, CUSTOM_TOGGLE, CUSTOM_VOTE, MAX_BUTTONS, QUICK_BLUE,
    QUICK_PINK, WAGER_INPUTS,
};
use crate::strategy::Side;
use page_driver::{finder, human_click, ElementId, Page, PageError};
use settings::WagerMode;
use tracing::{debug, info};

const BLUE_COLORS: &[&str] = &["56, 122, 255", "0, 173, 255", "61, 113, 249"];
const PINK_COLORS: &[&str] = &["245, 0, 155", "255, 0, 214", "238, 12, 142"];

/// Jeden "custom" blok sázky (jedna strana)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEntry {
    pub container: ElementId,
    pub input: Option<ElementId>,
    pub vote_button: Option<ElementId>,
    pub interactive: Option<ElementId>,
    pub max_button: Option<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WagerPlan {
    /// Částka zapsaná do inputu, odeslat vote tlačítkem bloku
    Custom {
        entry: Option<CustomEntry>,
        input: ElementId,
        amount: u64,
    },
    /// Použít rychlé tlačítko strany
    UseQuick,
    NoWager,
}

impl WagerPlan {
    pub fn amount(&self) -> Option<u64> {
        match self {
            WagerPlan::Custom { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}

/// Viditelné custom bloky v dialogu
pub fn custom_entries(page: &dyn Page, dialog: &ElementId) -> Vec<CustomEntry> {
    finder::all_visible(page, Some(dialog), CUSTOM_CONTAINER)
        .into_iter()
        .map(|container| CustomEntry {
            input: finder::first_present(page, Some(&container), &[CUSTOM_INPUT]),
            vote_button: finder::first_present(page, Some(&container), &[CUSTOM_VOTE]),
            interactive: finder::first_present(page, Some(&container), &[CUSTOM_INTERACTIVE]),
            max_button: finder::first_present(page, Some(&container), MAX_BUTTONS),
            container,
        })
        .collect()
}

/// Blok pro stranu podle barvy pozadí; jinak první = modrá, poslední = růžová
pub fn pick_entry(page: &dyn Page, entries: &[CustomEntry], side: Side) -> Option<CustomEntry> {
    let (tokens, fallback) = match side {
        Side::Blue => (BLUE_COLORS, entries.first()),
        Side::Pink => (PINK_COLORS, entries.last()),
    };

    entries
        .iter()
        .find(|entry| {
            let color = entry
                .interactive
                .as_ref()
                .and_then(|el| page.inline_style(el, "background-color").ok().flatten())
                .unwrap_or_default()
                .to_lowercase();
            tokens.iter().any(|t| color.contains(t))
        })
        .or(fallback)
        .cloned()
}

/// Spočítá a zapíše sázku. Chyba stránky = přerušení zpracování dialogu.
pub async fn plan_wager(
    page: &dyn Page,
    dialog: &ElementId,
    side: Side,
    mode: WagerMode,
    pacing: &Pacing,
) -> Result<WagerPlan, PageError> {
    let (fixed, percent) = match mode {
        WagerMode::Fixed(n) => (Some(n), None),
        WagerMode::Percent(p) => (None, Some(p)),
        WagerMode::Quick => (None, None),
    };

    if fixed.is_none() && percent.is_none() {
        return Ok(quick_or_nothing(page));
    }

    let Some((input, entry)) = ensure_custom_input(page, dialog, side, pacing).await else {
        info!("[Predict] No input field for custom wager");
        return Ok(WagerPlan::UseQuick);
    };
    let entry = entry.or_else(|| pick_entry(page, &custom_entries(page, dialog), side));

    if let Some(amount) = fixed {
        page.set_value(&input, &amount.to_string())?;
        info!(amount, side = %side, "[Predict] Fixed wager");
        return Ok(WagerPlan::Custom { entry, input, amount });
    }

    let pct = u64::from(percent.unwrap_or_default());
    let Some(balance) = read_balance(page, dialog, &input, entry.as_ref(), pacing).await? else {
        info!("[Predict] Unable to detect balance for percent wager, falling back to quick");
        return Ok(WagerPlan::UseQuick);
    };

    let amount = (balance.saturating_mul(pct) / 100).max(1);
    page.set_value(&input, &amount.to_string())?;
    info!(balance, amount, pct, "[Predict] Percent wager");
    Ok(WagerPlan::Custom { entry, input, amount })
}

fn quick_or_nothing(page: &dyn Page) -> WagerPlan {
    if finder::first_present(page, None, &[QUICK_BLUE, QUICK_PINK]).is_some() {
        WagerPlan::UseQuick
    } else {
        WagerPlan::NoWager
    }
}

/// Viditelný input pro stranu; když chybí, přepne dialog do custom režimu a zkusí znovu
async fn ensure_custom_input(
    page: &dyn Page,
    dialog: &ElementId,
    side: Side,
    pacing: &Pacing,
) -> Option<(ElementId, Option<CustomEntry>)> {
    if let Some(found) = discover_input(page, dialog, side) {
        return Some(found);
    }

    let toggle = finder::first_visible(page, Some(dialog), CUSTOM_TOGGLE)?;
    debug!("[Predict] revealing custom wager input");
    if let Err(e) = human_click(page, &toggle, pacing.toggle).await {
        debug!("custom toggle click failed: {}", e);
    }
    settle(pacing.toggle_settle).await;

    discover_input(page, dialog, side)
}

fn discover_input(page: &dyn Page, dialog: &ElementId, side: Side) -> Option<(ElementId, Option<CustomEntry>)> {
    let entry = pick_entry(page, &custom_entries(page, dialog), side);
    let own = entry
        .as_ref()
        .and_then(|e| e.input.clone())
        .filter(|input| finder::is_visible(page, input));

    let input = own.or_else(|| finder::first_present(page, Some(dialog), WAGER_INPUTS))?;
    finder::is_visible(page, &input).then_some((input, entry))
}

/// Balance z mezí inputu, jinak přes "max" tlačítko a zpětné čtení hodnoty
async fn read_balance(
    page: &dyn Page,
    dialog: &ElementId,
    input: &ElementId,
    entry: Option<&CustomEntry>,
    pacing: &Pacing,
) -> Result<Option<u64>, PageError> {
    let from_input = ["max", "aria-valuemax", "data-max"]
        .iter()
        .find_map(|attr| page.attribute(input, attr).ok().flatten().and_then(|v| parse_int(&v)));
    let from_container = || {
        entry
            .and_then(|e| page.attribute(&e.container, "data-max").ok().flatten())
            .and_then(|v| parse_int(&v))
    };
    if let Some(balance) = from_input.or_else(from_container) {
        return Ok(Some(balance));
    }

    let max_button = entry
        .and_then(|e| e.max_button.clone())
        .or_else(|| finder::first_present(page, Some(dialog), MAX_BUTTONS));
    let Some(max_button) = max_button.filter(|b| finder::is_visible(page, b)) else {
        return Ok(None);
    };

    human_click(page, &max_button, pacing.max_button).await?;
    settle(pacing.max_settle).await;
    Ok(parse_int(&page.value(input)?))
}

/// Celé číslo na začátku textu; nula se bere jako "nic"
fn parse_int(raw: &str) -> Option<u64> {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u64>().ok().filter(|v| *v > 0)
}
