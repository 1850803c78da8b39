//! Jedno zpracování dialogu: zamčeno? → focus → analýza → strana → sázka → odeslání.
//!
//! Běží ve vlastním tasku, engine mezitím dál obsluhuje ostatní dialogy.
//! Cooldown se značí tady, takže platí i když se engine mezitím zastavil.

use crate::analyzer::{self, OutcomeSnapshot};
use crate::engine::EngineContext;
use crate::strategy::{select_side, Side};
use crate::submit::{submit, SubmitRoute};
use crate::wager::{plan_wager, WagerPlan};
use logger::{now_iso, PredictionSkippedEvent, PredictionSubmittedEvent};
use page_driver::{human_click, ElementId, PageError};
use settings::WagerMode;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Submitted { side: Side, route: SubmitRoute },
    Locked,
    /// Mezitím proběhla jiná sázka
    CooldownActive,
    NoSubmitControl,
    Failed(String),
}

impl ProcessOutcome {
    fn skip_reason(&self) -> Option<&str> {
        match self {
            ProcessOutcome::Submitted { .. } => None,
            ProcessOutcome::Locked => Some("locked"),
            ProcessOutcome::CooldownActive => Some("cooldown"),
            ProcessOutcome::NoSubmitControl => Some("no_submit_control"),
            ProcessOutcome::Failed(e) => Some(e.as_str()),
        }
    }
}

/// Nikdy nepanikaří, chyba stránky = `Failed`
pub async fn process_dialog(ctx: &EngineContext, dialog: &ElementId) -> ProcessOutcome {
    let outcome = match try_process(ctx, dialog).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(dialog = %dialog, "[Predict] processing failed: {}", e);
            ProcessOutcome::Failed(e.to_string())
        }
    };

    if let Some(reason) = outcome.skip_reason() {
        let _ = ctx.logger.log(&PredictionSkippedEvent {
            ts: now_iso(),
            event: "PREDICTION_SKIPPED",
            dialog: dialog.to_string(),
            reason: reason.to_string(),
        });
    }
    outcome
}

async fn try_process(ctx: &EngineContext, dialog: &ElementId) -> Result<ProcessOutcome, PageError> {
    let page = ctx.page.as_ref();

    let text = page.text(dialog)?;
    if analyzer::is_locked(&text) {
        info!(dialog = %dialog, "[Predict] locked, skip");
        return Ok(ProcessOutcome::Locked);
    }

    human_click(page, dialog, ctx.pacing.focus).await?;

    let snapshot = analyzer::analyze(page, dialog);
    let side = {
        let mut rng = rand::thread_rng();
        select_side(&snapshot, ctx.settings.strategy, &mut rng)
    };
    info!(
        dialog = %dialog,
        side = %side,
        strategy = ctx.settings.strategy.as_str(),
        blue_pct = ?snapshot.blue.percent,
        pink_pct = ?snapshot.pink.percent,
        blue_points = ?snapshot.blue.points,
        pink_points = ?snapshot.pink.points,
        "[Predict] side selected"
    );

    let mode = ctx.settings.wager_mode();
    let plan = plan_wager(page, dialog, side, mode, &ctx.pacing).await?;

    // mezitím mohl odeslat jiný dialog
    if !ctx.cooldown.ready() {
        info!(dialog = %dialog, "[Predict] cooldown hit before submit, skip");
        return Ok(ProcessOutcome::CooldownActive);
    }

    let Some(route) = submit(page, dialog, side, &plan, &ctx.pacing).await? else {
        return Ok(ProcessOutcome::NoSubmitControl);
    };

    ctx.cooldown.mark();
    record_submission(ctx, dialog, side, mode, &plan, route, &snapshot).await;
    Ok(ProcessOutcome::Submitted { side, route })
}

async fn record_submission(
    ctx: &EngineContext,
    dialog: &ElementId,
    side: Side,
    mode: WagerMode,
    plan: &WagerPlan,
    route: SubmitRoute,
    snapshot: &OutcomeSnapshot,
) {
    let wager_mode = match (plan, mode) {
        (WagerPlan::Custom { .. }, WagerMode::Fixed(_)) => "fixed",
        (WagerPlan::Custom { .. }, _) => "percent",
        (WagerPlan::UseQuick, _) => "quick",
        (WagerPlan::NoWager, _) => "none",
    };

    let _ = ctx.logger.log(&PredictionSubmittedEvent {
        ts: now_iso(),
        event: "PREDICTION_SUBMITTED",
        dialog: dialog.to_string(),
        side: side.as_str().to_string(),
        strategy: ctx.settings.strategy.as_str().to_string(),
        wager_mode: wager_mode.to_string(),
        wager_amount: plan.amount(),
        via: route.as_str().to_string(),
        remaining_sec: snapshot.remaining_sec,
        blue_pct: snapshot.blue.percent,
        pink_pct: snapshot.pink.percent,
        blue_points: snapshot.blue.points,
        pink_points: snapshot.pink.points,
    });

    if let Some(topic) = &ctx.ntfy_topic {
        let amount = plan
            .amount()
            .map(|a| format!("{a} points"))
            .unwrap_or_else(|| wager_mode.to_string());
        let msg = format!(
            "🔮 Predicted {side} ({amount}) via {}\nstrategy: {}\nblue {:?}% / pink {:?}%",
            route.as_str(),
            ctx.settings.strategy.as_str(),
            snapshot.blue.percent,
            snapshot.pink.percent,
        );
        logger::send_ntfy_alert(topic, &msg, "Prediction submitted").await;
    }
}
