use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::batch::BatchOptions;
use crate::scraper::SimulatedFetcher;

/// Runtime settings: optional `ccmeta.toml`, then `CCMETA_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    pub fetch_delay_min_ms: u64,
    pub fetch_delay_max_ms: u64,
    pub fetch_failure_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/ccmeta.sqlite"),
            export_dir: PathBuf::from("."),
            batch_size: 3,
            batch_pause_ms: 500,
            fetch_delay_min_ms: 1000,
            fetch_delay_max_ms: 3000,
            fetch_failure_rate: 0.10,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        ::config::Config::builder()
            .add_source(::config::File::with_name("ccmeta").required(false))
            .add_source(::config::Environment::with_prefix("CCMETA"))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Failed to load settings")
    }

    pub fn batch_options(&self, show_progress: bool) -> BatchOptions {
        BatchOptions {
            batch_size: self.batch_size.max(1),
            pause: Duration::from_millis(self.batch_pause_ms),
            show_progress,
        }
    }

    pub fn simulated_fetcher(&self) -> SimulatedFetcher {
        SimulatedFetcher::new(
            Duration::from_millis(self.fetch_delay_min_ms),
            Duration::from_millis(self.fetch_delay_max_ms),
            self.fetch_failure_rate,
        )
    }
}
