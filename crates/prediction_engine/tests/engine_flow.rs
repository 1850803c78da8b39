use logger::EventLogger;
use page_driver::{ChangeBridge, Cooldown, MemoryPage, Page, Reaction};
use prediction_engine::{process_dialog, EngineContext, Pacing, Phase, PredictionEngine, ProcessOutcome, PREDICT_COOLDOWN};
use settings::Settings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{advance, sleep, Instant};

const QUICK_BLUE: &str = ".fixed-prediction-button--blue";

fn dialog(id: &str, timer: &str) -> String {
    format!(
        r#"<div role="dialog" aria-labelledby="channel-points-reward-center-header" id="{id}">
             <div class="prediction-summary-outcome">
               <p data-test-selector="prediction-summary-outcome__percentage">70%</p>
             </div>
             <div class="prediction-summary-outcome">
               <p data-test-selector="prediction-summary-outcome__percentage">30%</p>
             </div>
             <p data-test-selector="prediction-timer__time-remaining">{timer}</p>
             <button class="fixed-prediction-button--blue">10</button>
             <button class="fixed-prediction-button--pink">10</button>
           </div>"#
    )
}

fn predict_settings() -> Settings {
    Settings {
        enable_predict: true,
        predict_countdown_sec: 10,
        wager_fixed: 0,
        wager_percent: 0,
        ..Settings::default()
    }
}

fn context(page: &Arc<MemoryPage>, cooldown: &Arc<Cooldown>, settings: Settings) -> EngineContext {
    let page: Arc<dyn Page> = page.clone();
    EngineContext {
        page,
        settings: Arc::new(settings),
        cooldown: cooldown.clone(),
        logger: Arc::new(EventLogger::disabled()),
        pacing: Pacing::instant(),
        ntfy_topic: None,
    }
}

fn engine_for(page: &Arc<MemoryPage>, cooldown: &Arc<Cooldown>) -> PredictionEngine {
    PredictionEngine::new(context(page, cooldown, predict_settings()))
}

fn fresh_cooldown() -> Arc<Cooldown> {
    Arc::new(Cooldown::new(PREDICT_COOLDOWN))
}

#[tokio::test(start_paused = true)]
async fn waits_for_countdown_target_before_acting() {
    let page = Arc::new(MemoryPage::new(dialog("d1", "0:45")));
    let mut engine = engine_for(&page, &fresh_cooldown());
    let dlg = page.first("#d1").unwrap();

    engine.evaluate(&dlg);
    assert_eq!(engine.phase(&dlg), Some(Phase::WaitingForTimer));
    assert_eq!(engine.pending_timers(), 1);
    assert!(page.clicks().is_empty());

    // stránka mezitím odpočítá
    page.replace_source(dialog("d1", "0:10"));
    let start = Instant::now();
    engine.step().await;
    assert!(start.elapsed() >= Duration::from_secs(35));
    assert_eq!(engine.phase(&dlg), Some(Phase::Processing));

    engine.step().await;
    assert_eq!(engine.phase(&dlg), Some(Phase::Done));
    assert_eq!(page.click_count(QUICK_BLUE), 1);
}

#[tokio::test(start_paused = true)]
async fn done_dialog_ignores_further_triggers() {
    // bez submit tlačítek: pokus skončí bez odeslání, cooldown se neznačí
    let page = Arc::new(MemoryPage::new(
        r#"<div role="dialog" aria-labelledby="channel-points-reward-center-header" id="d1">
             <p data-test-selector="prediction-timer__time-remaining">0:05</p>
           </div>"#,
    ));
    let cooldown = fresh_cooldown();
    let mut engine = engine_for(&page, &cooldown);
    let dlg = page.first("#d1").unwrap();

    engine.evaluate(&dlg);
    engine.step().await;
    assert_eq!(engine.phase(&dlg), Some(Phase::Done));
    assert!(cooldown.ready());
    let clicks = page.clicks().len();

    engine.evaluate(&dlg);
    engine.on_added(&[dlg.clone()]);
    engine.poll();
    assert_eq!(engine.phase(&dlg), Some(Phase::Done));
    assert_eq!(engine.pending_timers(), 0);
    assert_eq!(page.clicks().len(), clicks);
}

#[tokio::test(start_paused = true)]
async fn submission_blocks_other_dialogs_for_a_minute() {
    let page = Arc::new(MemoryPage::new(format!("{}{}", dialog("d1", "0:05"), dialog("d2", "0:05"))));
    let cooldown = fresh_cooldown();
    let mut engine = engine_for(&page, &cooldown);
    let d1 = page.first("#d1").unwrap();
    let d2 = page.first("#d2").unwrap();

    engine.evaluate(&d1);
    engine.step().await;
    assert_eq!(page.click_count("#d1 .fixed-prediction-button--blue"), 1);
    assert!(!cooldown.ready());

    engine.evaluate(&d2);
    assert_eq!(engine.phase(&d2), None);

    advance(Duration::from_secs(59)).await;
    engine.evaluate(&d2);
    assert_eq!(engine.phase(&d2), None);

    advance(Duration::from_secs(1)).await;
    engine.evaluate(&d2);
    assert_eq!(engine.phase(&d2), Some(Phase::Processing));
    engine.step().await;
    assert_eq!(page.click_count("#d2 .fixed-prediction-button--blue"), 1);
}

#[tokio::test(start_paused = true)]
async fn locked_dialog_is_done_without_interaction() {
    let page = Arc::new(MemoryPage::new(
        r#"<div role="dialog" aria-labelledby="channel-points-reward-center-header" id="d1">
             <p>Prediction locked</p>
             <p data-test-selector="prediction-timer__time-remaining">0:05</p>
             <button class="fixed-prediction-button--blue">10</button>
           </div>"#,
    ));
    let cooldown = fresh_cooldown();
    let mut engine = engine_for(&page, &cooldown);
    let dlg = page.first("#d1").unwrap();

    engine.evaluate(&dlg);
    engine.step().await;
    assert_eq!(engine.phase(&dlg), Some(Phase::Done));
    assert!(page.clicks().is_empty());
    assert!(cooldown.ready());
}

#[tokio::test(start_paused = true)]
async fn missing_timer_gives_up_after_bounded_retries() {
    let page = Arc::new(MemoryPage::new(
        r#"<div role="dialog" aria-labelledby="channel-points-reward-center-header" id="d1">
             <button class="fixed-prediction-button--pink">10</button>
           </div>"#,
    ));
    let mut engine = engine_for(&page, &fresh_cooldown());
    let dlg = page.first("#d1").unwrap();

    let start = Instant::now();
    engine.evaluate(&dlg);
    let mut steps = 0;
    while engine.phase(&dlg) != Some(Phase::Done) {
        engine.step().await;
        steps += 1;
        assert!(steps <= 100, "engine never finished");
    }

    // 80 retry + jedno hotové zpracování
    assert_eq!(steps, 81);
    assert!(start.elapsed() < Duration::from_secs(170));
    assert_eq!(page.click_count(".fixed-prediction-button--pink"), 0);
    // bez dat majority → modrá, modré rychlé tlačítko chybí → nic k odeslání
    assert!(page.clicks().iter().all(|c| *c == dlg));
}

#[tokio::test(start_paused = true)]
async fn highlight_button_opens_and_evaluates_dialog() {
    let page = Arc::new(MemoryPage::new(format!(
        r#"<div class="highlight">
             <button data-test-selector="community-prediction-highlight-header__action-button" id="open">Predict</button>
           </div>{}"#,
        dialog("d1", "0:08")
    )));
    page.detach("#d1");
    page.on_click("#open", Reaction::Attach("#d1".into()));
    let mut engine = engine_for(&page, &fresh_cooldown());

    engine.scan();
    engine.step().await; // klik na highlight
    assert_eq!(page.click_count("#open"), 1);
    engine.step().await; // dialog je tu → vyhodnocení
    let dlg = page.first("#d1").unwrap();
    assert_eq!(engine.phase(&dlg), Some(Phase::Processing));
    engine.step().await;
    assert_eq!(engine.phase(&dlg), Some(Phase::Done));
    assert_eq!(page.click_count(QUICK_BLUE), 1);
}

#[tokio::test(start_paused = true)]
async fn detached_dialog_session_is_dropped() {
    let page = Arc::new(MemoryPage::new(dialog("d1", "0:45")));
    let mut engine = engine_for(&page, &fresh_cooldown());
    let dlg = page.first("#d1").unwrap();

    engine.evaluate(&dlg);
    assert_eq!(engine.sessions(), 1);
    page.detach("#d1");
    engine.poll();
    assert_eq!(engine.sessions(), 0);
    assert_eq!(engine.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn run_loop_reacts_to_change_notifications_and_stops() {
    let page = Arc::new(MemoryPage::new(dialog("d1", "0:05")));
    page.detach("#d1");
    let bridge = ChangeBridge::spawn(page.clone(), "html", Duration::from_millis(250));
    let engine = engine_for(&page, &fresh_cooldown());
    let (stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(engine.run(bridge.subscribe(), stop_rx));

    sleep(Duration::from_secs(1)).await;
    assert!(page.clicks().is_empty());
    page.attach("#d1");
    sleep(Duration::from_secs(1)).await;
    assert_eq!(page.click_count(QUICK_BLUE), 1);

    stop_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dialog_mounted_with_highlight_card_is_evaluated() {
    // neaktivní highlight tlačítko nesmí zastínit dialog ve stejném uzlu
    let page = Arc::new(MemoryPage::new(format!(
        r#"<div id="wrap">
             <button data-test-selector="community-prediction-highlight-header__action-button" id="open" disabled>Predict</button>
             {}
           </div>"#,
        dialog("d1", "0:05")
    )));
    let mut engine = engine_for(&page, &fresh_cooldown());
    let dlg = page.first("#d1").unwrap();

    engine.on_added(&[page.first("#wrap").unwrap()]);
    assert_eq!(engine.phase(&dlg), Some(Phase::Processing));
    assert_eq!(engine.pending_timers(), 0);

    engine.step().await;
    assert_eq!(engine.phase(&dlg), Some(Phase::Done));
    assert_eq!(page.click_count(QUICK_BLUE), 1);
    assert_eq!(page.click_count("#open"), 0);
}

const MAX_DETACHES_WAGER: &str = r#"
    <div role="dialog" aria-labelledby="channel-points-reward-center-header" id="d1">
      <p data-test-selector="prediction-timer__time-remaining">0:05</p>
      <div class="custom-prediction-button" id="c">
        <input type="number" id="in" value="1000">
        <button aria-label="Max points" id="max">Max</button>
      </div>
      <button class="fixed-prediction-button--blue">10</button>
    </div>"#;

fn percent_settings() -> Settings {
    Settings { wager_percent: 10, ..predict_settings() }
}

#[tokio::test(start_paused = true)]
async fn vanished_wager_input_is_a_failure() {
    let page = Arc::new(MemoryPage::new(MAX_DETACHES_WAGER));
    page.on_click("#max", Reaction::Detach("#c".into()));
    let cooldown = fresh_cooldown();
    let ctx = context(&page, &cooldown, percent_settings());
    let dlg = page.first("#d1").unwrap();

    let outcome = process_dialog(&ctx, &dlg).await;
    assert!(matches!(outcome, ProcessOutcome::Failed(_)), "got {outcome:?}");
    assert!(page.inputs().is_empty());
    assert!(cooldown.ready());
}

#[tokio::test(start_paused = true)]
async fn interaction_failure_finishes_session_without_retry() {
    let page = Arc::new(MemoryPage::new(MAX_DETACHES_WAGER));
    page.on_click("#max", Reaction::Detach("#c".into()));
    let cooldown = fresh_cooldown();
    let mut engine = PredictionEngine::new(context(&page, &cooldown, percent_settings()));
    let dlg = page.first("#d1").unwrap();

    engine.evaluate(&dlg);
    assert_eq!(engine.phase(&dlg), Some(Phase::Processing));
    engine.step().await;
    assert_eq!(engine.phase(&dlg), Some(Phase::Done));
    assert_eq!(engine.pending_timers(), 0);
    assert!(cooldown.ready());
    assert_eq!(page.click_count(QUICK_BLUE), 0);

    // další spouštěče už nic nedělají
    let clicks = page.clicks().len();
    engine.evaluate(&dlg);
    engine.poll();
    assert_eq!(engine.phase(&dlg), Some(Phase::Done));
    assert_eq!(engine.pending_timers(), 0);
    assert_eq!(page.clicks().len(), clicks);
}

#[tokio::test(start_paused = true)]
async fn dialog_detached_by_focus_click_is_done() {
    let page = Arc::new(MemoryPage::new(dialog("d1", "0:05")));
    page.on_click("#d1", Reaction::Detach("#d1".into()));
    let cooldown = fresh_cooldown();
    let mut engine = engine_for(&page, &cooldown);
    let dlg = page.first("#d1").unwrap();

    engine.evaluate(&dlg);
    engine.step().await;
    assert_eq!(engine.phase(&dlg), Some(Phase::Done));
    assert_eq!(engine.pending_timers(), 0);
    assert!(cooldown.ready());
    assert_eq!(page.click_count(QUICK_BLUE), 0);
}
