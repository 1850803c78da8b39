/// helper-settings — editor nastavení z příkazové řádky
///
/// Zapisuje do stejného settings.json, který čte běžící twitch-helper;
/// ten změnu zachytí a restartuje subsystémy.
///
/// Spuštění:
///   cargo run --bin helper-settings -- show
///   cargo run --bin helper-settings -- set strategy minority
///   cargo run --bin helper-settings -- set wagerFixed 250
///   cargo run --bin helper-settings -- reset

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde_json::Value;
use settings::{Settings, SettingsStore, KEYS};
use std::env;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "helper-settings", about = "Show or edit twitch-helper settings")]
struct Cli {
    /// Cesta k settings.json (jinak HELPER_SETTINGS_PATH, jinak ./settings.json)
    #[arg(long)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Vypíše aktuální nastavení
    Show,
    /// Nastaví jeden klíč (hodnota jako JSON, jinak jako text)
    Set { key: String, value: String },
    /// Vrátí všechno na defaulty
    Reset,
    /// Vypíše cestu k souboru
    Path,
}

fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let path = cli
        .path
        .or_else(|| env::var("HELPER_SETTINGS_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("settings.json"));
    let store = SettingsStore::open(&path)
        .with_context(|| format!("Cannot open settings at {}", path.display()))?;

    match cli.command {
        Command::Show => print_settings(&store.current())?,
        Command::Set { key, value } => {
            if !KEYS.contains(&key.as_str()) {
                anyhow::bail!("unknown key '{}', known keys: {}", key, KEYS.join(", "));
            }
            let updated = store.set_key(&key, parse_raw(&value))?;
            print_settings(&updated)?;
        }
        Command::Reset => {
            let updated = store.reset()?;
            print_settings(&updated)?;
        }
        Command::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

/// "true" / "25" → typovaná hodnota, "minority" → text
fn parse_raw(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_settings(settings: &Settings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&settings.to_value())?);
    Ok(())
}
