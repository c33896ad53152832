#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless runner for Skulls & Daggers.
//!
//! Plays a run with scripted players for a fixed number of ticks and can save,
//! load and list runs kept in a save directory.

mod autopilot;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use skulls_daggers_core::{CharacterKind, PlayMode, RunConfig, RunPhase};
use skulls_daggers_persistence::DirectoryStorage;
use skulls_daggers_session::{Session, SessionState};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ticks spent collecting boss loot before moving on to the next level.
const VICTORY_LAP_TICKS: u32 = 100;

/// Characters selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Hero {
    Knight,
    Fighter,
    Warrior,
}

impl From<Hero> for CharacterKind {
    fn from(hero: Hero) -> Self {
        match hero {
            Hero::Knight => Self::Knight,
            Hero::Fighter => Self::Fighter,
            Hero::Warrior => Self::Warrior,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "skulls-daggers", about = "Headless Skulls & Daggers runner")]
struct Cli {
    /// Character played by player one.
    #[arg(long, value_enum, default_value_t = Hero::Knight)]
    character: Hero,
    /// Adds a second player with the given character.
    #[arg(long, value_enum)]
    coop: Option<Hero>,
    /// Overrides the seed from the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 1_200)]
    ticks: u32,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// TOML file with the run configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding save files.
    #[arg(long, default_value = "saves")]
    save_dir: PathBuf,
    /// Saves the run under this name when the soak ends.
    #[arg(long)]
    save: Option<String>,
    /// Resumes the named save instead of starting fresh.
    #[arg(long)]
    load: Option<String>,
    /// Lists the saves and exits.
    #[arg(long)]
    list_saves: bool,
}

impl Cli {
    fn mode(&self) -> PlayMode {
        let first = self.character.into();
        match self.coop {
            Some(second) => PlayMode::Coop(first, second.into()),
            None => PlayMode::Single(first),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let storage = DirectoryStorage::new(&cli.save_dir);
    let mut session = Session::new(config, storage).context("invalid run configuration")?;

    if cli.list_saves {
        let saves = session.list_saves().context("failed to list saves")?;
        if saves.is_empty() {
            println!("no saves in {}", cli.save_dir.display());
        }
        for save in saves {
            println!("{}\t{}\t{}", save.name, save.timestamp, save.summary);
        }
        return Ok(());
    }

    match cli.load.as_deref() {
        Some(name) => {
            let _ = session
                .load_run(Some(name))
                .with_context(|| format!("failed to load save {name:?}"))?;
        }
        None => session.start_run(cli.mode()),
    }

    soak(&mut session, cli.ticks, Duration::from_millis(cli.tick_ms.max(1)));
    print_report(&session.current_state());

    if let Some(name) = cli.save.as_deref() {
        let summary = session
            .save_run(name)
            .with_context(|| format!("failed to save {name:?}"))?;
        println!("saved {}: {}", summary.name, summary.summary);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    let Some(path) = path else {
        return Ok(RunConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn soak(session: &mut Session<DirectoryStorage>, ticks: u32, dt: Duration) {
    let mut victory_ticks = 0;
    for _ in 0..ticks {
        let state = session.current_state();
        match state.status.phase {
            RunPhase::Defeated => {
                info!(level = state.status.level, "autopilot fell");
                return;
            }
            RunPhase::Victory => {
                victory_ticks += 1;
                if state.loot.is_empty() || victory_ticks > VICTORY_LAP_TICKS {
                    victory_ticks = 0;
                    session.advance_level();
                    continue;
                }
            }
            _ => {}
        }
        let inputs = autopilot::plan(&state);
        let _ = session.update(dt, &inputs);
    }
}

fn print_report(state: &SessionState) {
    let status = state.status;
    println!(
        "level {} {:?} after {:.1}s",
        status.level,
        status.phase,
        status.clock.as_secs_f32()
    );
    for view in &state.players {
        let player = &view.snapshot;
        println!(
            "  {} at ({}, {}): {}/{} hp",
            player.character.name(),
            player.tile.x(),
            player.tile.y(),
            player.health,
            player.max_health
        );
    }
    let economy = state.economy;
    println!(
        "  gold {} | gems {}/{}/{} | potions {}/{}/{}",
        economy.gold,
        economy.gems.blue,
        economy.gems.green,
        economy.gems.red,
        economy.inventory.health_potions,
        economy.inventory.speed_potions,
        economy.inventory.damage_potions
    );
    let alive = state.enemies.iter().filter(|enemy| enemy.alive).count();
    println!("  {alive} enemies alive, {} drops on the ground", state.loot.len());
}
