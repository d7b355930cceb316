#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a scripted run through a Delve level.

mod config;
mod session;
mod swipes;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use delve_system_level::LevelLayout;

use config::Settings;

/// Dungeon bundled with the binary, top level first, used when no layout
/// file is given.
const DEFAULT_LEVELS: [&str; 2] = [
    include_str!("../levels/default.txt"),
    include_str!("../levels/lower.txt"),
];
/// Swipes played when none are given.
const DEFAULT_SWIPES: &str = "E,E,E,E,E,E,E,S,S,S,S,E,E,S";

/// Plays a swipe script through a tile-based dungeon level.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Text layout of a dungeon level, repeated top level first; the bundled
    /// dungeon is used when omitted.
    #[arg(long = "layout", value_name = "PATH")]
    layouts: Vec<PathBuf>,

    /// TOML file with run settings.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Comma-separated compass directions, for example `E,E,SE`.
    #[arg(long, value_name = "SCRIPT")]
    swipes: Option<String>,

    /// Seed for player placement and axis fallback.
    #[arg(long)]
    seed: Option<u64>,

    /// Milliseconds a single step takes.
    #[arg(long, value_name = "MS")]
    step_ms: Option<u64>,

    /// Milliseconds advanced per simulation tick.
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Items that complete the level.
    #[arg(long)]
    item_goal: Option<u32>,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(step_ms) = self.step_ms {
            settings.step_duration_ms = step_ms;
        }
        if let Some(tick_ms) = self.tick_ms {
            settings.tick_ms = tick_ms;
        }
        if let Some(goal) = self.item_goal {
            settings.item_goal = Some(goal);
        }
        settings.validate()?;
        Ok(settings)
    }

    fn layouts(&self) -> Result<Vec<LevelLayout>> {
        if self.layouts.is_empty() {
            return DEFAULT_LEVELS
                .iter()
                .map(|text| LevelLayout::parse(text).context("failed to parse bundled level"))
                .collect();
        }
        self.layouts
            .iter()
            .map(|path| {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read layout from {}", path.display()))?;
                LevelLayout::parse(&text)
                    .with_context(|| format!("failed to parse level layout {}", path.display()))
            })
            .collect()
    }
}

/// Entry point for the Delve command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = cli.settings()?;
    let layouts = cli.layouts()?;
    let script = cli.swipes.as_deref().unwrap_or(DEFAULT_SWIPES);
    let directions = swipes::parse(script).context("failed to parse swipe script")?;

    let report = session::run(layouts, &directions, &settings)?;

    for line in &report.history {
        println!("{line}");
    }
    print!("{}", report.map);
    println!(
        "position ({}, {}) at depth {} after {} ticks",
        report.position.column(),
        report.position.row(),
        report.depth,
        report.ticks
    );
    let stats = report.stats;
    println!(
        "level {}: {} moves, {} items, {} collectables, {} doors opened",
        stats.level, stats.moves, stats.items, stats.collectables, stats.doors_opened
    );
    if report.complete {
        println!("Level complete.");
    }
    Ok(())
}
