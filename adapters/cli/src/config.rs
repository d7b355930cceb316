//! Run settings loaded from TOML and overridden by command-line flags.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Tunables for a single run.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    /// Time one swipe takes to travel a cell, in milliseconds.
    pub(crate) step_duration_ms: u64,
    /// Fixed simulation step, in milliseconds.
    pub(crate) tick_ms: u64,
    /// Seed shared by player placement and axis fallback.
    pub(crate) seed: u64,
    /// Tile height relative to its width.
    pub(crate) aspect_ratio: f32,
    /// Items required to complete the level.
    pub(crate) item_goal: Option<u32>,
    /// Upper bound on simulation steps before the run is abandoned.
    pub(crate) max_ticks: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            step_duration_ms: 250,
            tick_ms: 16,
            seed: 0x0de1_7e5e_ed,
            aspect_ratio: 1.0,
            item_goal: None,
            max_ticks: 10_000,
        }
    }
}

impl Settings {
    /// Reads settings from a TOML file; missing keys keep their defaults.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(contents).context("failed to parse settings toml contents")?;
        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            bail!("tick_ms must be positive");
        }
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            bail!("aspect_ratio must be a positive number, got {}", self.aspect_ratio);
        }
        Ok(())
    }

    pub(crate) const fn step_duration(&self) -> Duration {
        Duration::from_millis(self.step_duration_ms)
    }

    pub(crate) const fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
