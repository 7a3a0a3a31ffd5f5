use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::parser;
use crate::record::{Status, UrlRecord};
use crate::scraper::Fetcher;
use crate::state::AppState;

pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(500);

pub struct BatchOptions {
    pub batch_size: usize,
    pub pause: Duration,
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pause: DEFAULT_BATCH_PAUSE,
            show_progress: false,
        }
    }
}

/// Run stats returned after the loop ends.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
    /// Pending records left untouched because the run was paused.
    pub skipped: usize,
}

/// Fetch → extract → classify → generate for one record. Never fails: any
/// error lands on the returned record.
pub async fn process_record(fetcher: &dyn Fetcher, record: UrlRecord) -> UrlRecord {
    match run_pipeline(fetcher, &record.url).await {
        Ok(analysis) => {
            let parser::Analysis {
                content,
                framework,
                copy,
            } = analysis;
            record.into_completed(framework, copy.titles, copy.meta_descriptions, content)
        }
        Err(e) => {
            warn!("{} failed: {}", record.url, e);
            record.into_failed(e.to_string())
        }
    }
}

async fn run_pipeline(fetcher: &dyn Fetcher, url: &str) -> Result<parser::Analysis, PipelineError> {
    let raw = fetcher.fetch(url).await?;
    Ok(parser::analyze(&raw))
}

/// Process every pending record in groups.
///
/// Each group is marked `processing`, run concurrently to completion, and
/// merged back by id before the next one starts. The run flag is checked
/// only between groups: a pause lets the in-flight group finish.
/// The store is claimed for the whole run; a second run on the same store
/// is refused.
pub async fn start(
    state: &mut AppState,
    fetcher: Arc<dyn Fetcher>,
    opts: &BatchOptions,
) -> Result<RunStats> {
    let pending = state.pending();
    if pending.is_empty() {
        return Ok(RunStats::default());
    }

    if !state.begin_run()? {
        anyhow::bail!("Another run is already in progress (use 'ccmeta unlock' if it was killed)");
    }
    let outcome = run_groups(state, fetcher, opts, pending).await;
    state.end_run()?;
    outcome
}

async fn run_groups(
    state: &mut AppState,
    fetcher: Arc<dyn Fetcher>,
    opts: &BatchOptions,
    pending: Vec<UrlRecord>,
) -> Result<RunStats> {
    let run = state.run_flag();
    let total = pending.len();
    let batch_size = opts.batch_size.max(1);
    let groups: Vec<&[UrlRecord]> = pending.chunks(batch_size).collect();
    let group_count = groups.len();
    info!("Processing {} pending URLs in {} groups of {}", total, group_count, batch_size);

    let pb = if opts.show_progress {
        ProgressBar::new(total as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut stats = RunStats {
        total,
        ..RunStats::default()
    };

    for (i, group) in groups.into_iter().enumerate() {
        if !run.is_running() {
            info!("Paused before group {}/{}", i + 1, group_count);
            break;
        }

        let picked: Vec<UrlRecord> = group.iter().cloned().map(UrlRecord::into_processing).collect();
        state.merge(picked.clone())?;

        let handles: Vec<_> = picked
            .into_iter()
            .map(|record| {
                let fetcher = Arc::clone(&fetcher);
                let fallback = record.clone();
                let handle =
                    tokio::spawn(async move { process_record(fetcher.as_ref(), record).await });
                (fallback, handle)
            })
            .collect();

        // Gather every outcome; a crashed task only fails its own record.
        let (fallbacks, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let outcomes = join_all(handles).await;
        let finished: Vec<UrlRecord> = fallbacks
            .into_iter()
            .zip(outcomes)
            .map(|(fallback, outcome)| match outcome {
                Ok(record) => record,
                Err(e) => {
                    let err = PipelineError::from_join(e);
                    warn!("{} crashed: {}", fallback.url, err);
                    fallback.into_failed(err.to_string())
                }
            })
            .collect();

        for r in &finished {
            match r.status {
                Status::Completed => stats.ok += 1,
                _ => stats.errors += 1,
            }
        }
        pb.inc(finished.len() as u64);
        state.merge(finished)?;

        if i + 1 < group_count {
            tokio::time::sleep(opts.pause).await;
        }
    }

    pb.finish_and_clear();
    stats.skipped = total - stats.ok - stats.errors;
    info!(
        "Run finished: {} ok, {} errors, {} left pending",
        stats.ok, stats.errors, stats.skipped
    );
    Ok(stats)
}
