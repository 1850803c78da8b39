use crate::pacing::Pacing;
use crate::selectors::{QUICK_BLUE, QUICK_PINK, SUBMIT_BUTTONS};
use crate::strategy::Side;
use crate::wager::{custom_entries, pick_entry, WagerPlan};
use page_driver::{finder, human_click, ElementId, Page, PageError};
use tracing::info;

/// Kudy se predikce odeslala
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRoute {
    CustomVote,
    QuickButton,
    GenericSubmit,
}

impl SubmitRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitRoute::CustomVote => "custom_vote",
            SubmitRoute::QuickButton => "quick_button",
            SubmitRoute::GenericSubmit => "generic_submit",
        }
    }
}

/// Odešle volbu. `None` = nebylo na co kliknout.
pub async fn submit(
    page: &dyn Page,
    dialog: &ElementId,
    side: Side,
    plan: &WagerPlan,
    pacing: &Pacing,
) -> Result<Option<SubmitRoute>, PageError> {
    match plan {
        WagerPlan::Custom { entry, .. } => {
            let entry = entry
                .clone()
                .or_else(|| pick_entry(page, &custom_entries(page, dialog), side));
            let vote = entry.and_then(|e| e.vote_button);
            if let Some(vote) = vote.filter(|b| finder::is_usable(page, b)) {
                if human_click(page, &vote, pacing.custom_vote).await? {
                    info!(side = %side, "[Predict] Submitted via custom vote");
                    return Ok(Some(SubmitRoute::CustomVote));
                }
            }
        }
        WagerPlan::UseQuick => {
            let sel = match side {
                Side::Blue => QUICK_BLUE,
                Side::Pink => QUICK_PINK,
            };
            if let Some(quick) = finder::first_visible(page, Some(dialog), &[sel]) {
                if human_click(page, &quick, pacing.quick_button).await? {
                    info!(side = %side, "[Predict] Submitted via quick button");
                    return Ok(Some(SubmitRoute::QuickButton));
                }
            }
        }
        WagerPlan::NoWager => {}
    }

    if let Some(button) = finder::first_usable(page, Some(dialog), SUBMIT_BUTTONS) {
        if human_click(page, &button, pacing.generic_submit).await? {
            info!(side = %side, "[Predict] Submitted");
            return Ok(Some(SubmitRoute::GenericSubmit));
        }
    }

    info!("[Predict] Submit control not found");
    Ok(None)
}
