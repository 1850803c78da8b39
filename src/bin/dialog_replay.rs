/// dialog-replay — offline přehrání predikčního dialogu
///
/// Načte uložené HTML (např. "Save page as" z prohlížeče), najde dialog
/// a vypíše, co by s ním helper udělal: snapshot stran, zvolenou stranu
/// a plán sázky. S --submit projde celé zpracování nanečisto a vypíše
/// kliky a zápisy do inputů.
///
/// Spuštění:
///   cargo run --bin dialog-replay -- saved/prediction.html
///   cargo run --bin dialog-replay -- saved/prediction.html --submit --settings settings.json

use anyhow::{Context, Result};
use clap::Parser;
use logger::EventLogger;
use page_driver::{Cooldown, ElementId, MemoryPage, Page};
use prediction_engine::{
    analyze, plan_wager, process_dialog, select_side, selectors, EngineContext, Pacing, PREDICT_COOLDOWN,
};
use settings::{Settings, SettingsStore};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "dialog-replay", about = "Replay a saved prediction dialog offline")]
struct Cli {
    /// Uložené HTML stránky nebo jen dialogu
    html: PathBuf,

    /// CSS selektor dialogu (default: reward center dialog)
    #[arg(long)]
    dialog: Option<String>,

    /// Projít i sázku a odeslání (na kopii stránky v paměti)
    #[arg(long)]
    submit: bool,

    /// settings.json se strategií a sázkou; jinak defaulty
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn"))
        )
        .init();

    let cli = Cli::parse();
    let html = fs::read_to_string(&cli.html)
        .with_context(|| format!("Cannot read {}", cli.html.display()))?;
    let selector = cli.dialog.as_deref().unwrap_or(selectors::REWARD_DIALOG);

    let settings = match &cli.settings {
        Some(path) => SettingsStore::open(path)
            .with_context(|| format!("Cannot open settings at {}", path.display()))?
            .current(),
        None => Arc::new(Settings::default()),
    };

    let page = Arc::new(MemoryPage::new(html.clone()));
    let dialog = find_dialog(&page, selector)?;

    let snapshot = analyze(page.as_ref(), &dialog);
    println!("snapshot: {}", serde_json::to_string_pretty(&snapshot)?);

    let side = {
        let mut rng = rand::thread_rng();
        select_side(&snapshot, settings.strategy, &mut rng)
    };
    println!("strategy: {} → side: {}", settings.strategy.as_str(), side);

    let plan = plan_wager(page.as_ref(), &dialog, side, settings.wager_mode(), &Pacing::instant()).await?;
    println!("wager plan: {:?}", plan);

    if !cli.submit {
        return Ok(());
    }

    // Čistá kopie, plán výše už do stránky zapsal
    let page = Arc::new(MemoryPage::new(html));
    let dialog = find_dialog(&page, selector)?;
    let shared: Arc<dyn Page> = page.clone();
    let ctx = EngineContext {
        page: shared,
        settings,
        cooldown: Arc::new(Cooldown::new(PREDICT_COOLDOWN)),
        logger: Arc::new(EventLogger::disabled()),
        pacing: Pacing::instant(),
        ntfy_topic: None,
    };
    let outcome = process_dialog(&ctx, &dialog).await;
    println!("outcome: {:?}", outcome);

    for el in page.clicks() {
        println!("  click  {}", describe(page.as_ref(), &el));
    }
    for (el, value) in page.inputs() {
        println!("  input  {} = {}", describe(page.as_ref(), &el), value);
    }
    Ok(())
}

fn find_dialog(page: &MemoryPage, selector: &str) -> Result<ElementId> {
    page.first(selector)
        .with_context(|| format!("No element matches '{}'", selector))
}

/// Začátek outer HTML, ať je vidět, co to bylo za element
fn describe(page: &dyn Page, el: &ElementId) -> String {
    let html = page.outer_html(el).unwrap_or_default();
    let flat = html.split_whitespace().collect::<Vec<_>>().join(" ");
    let short: String = flat.chars().take(96).collect();
    if short.len() < flat.len() {
        format!("{short}…")
    } else {
        short
    }
}
