mod batch;
mod config;
mod db;
mod error;
mod export;
mod import;
mod parser;
mod record;
mod scraper;
mod state;
mod validate;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::config::Settings;
use crate::parser::generator::check_copy;
use crate::record::Status;
use crate::scraper::{Fetcher, HttpFetcher};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "ccmeta", about = "Copywriting framework detection and SEO title/meta generation for URL lists")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add one or more URLs to the queue
    Add {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Import URLs from a CSV/text file (stdin when omitted)
    Import { file: Option<PathBuf> },
    /// List queued URLs
    List {
        /// Filter by status (pending, processing, completed, error)
        #[arg(short, long)]
        status: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show results for one URL
    Show { id: String },
    /// Remove one URL
    Delete { id: String },
    /// Remove all URLs
    Reset,
    /// Clear the run marker left by a run that was killed, requeueing its URLs
    Unlock,
    /// Process all pending URLs (Ctrl-C pauses after the current group)
    Run {
        /// Fetch pages over HTTP instead of the simulated fetcher
        #[arg(long)]
        live: bool,
    },
    /// Export completed results to CSV
    Export {
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Save a URL's extracted content as a .txt file
    SaveContent {
        id: String,
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Preview generated copy for text from a file (stdin when omitted)
    Preview {
        /// Framework tag to use instead of detecting one
        #[arg(short, long)]
        framework: Option<String>,
        file: Option<PathBuf>,
    },
    /// Show processing statistics
    Stats,
    /// Show or set the dark-mode preference
    DarkMode { value: Option<Toggle> },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let storage = db::Storage::open(&settings.db_path)?;
    let mut state = AppState::load(storage)?;

    let result = match cli.command {
        Commands::Add { urls } => {
            let valid = urls
                .iter()
                .map(|u| validate::validate_url(u))
                .collect::<Result<Vec<_>, _>>()?;
            state.add_urls(&valid)?;
            println!("Added {} URL(s).", valid.len());
            Ok(())
        }
        Commands::Import { file } => {
            let text = read_input(file.as_ref())?;
            let urls = import::accept_urls(&text)?;
            state.add_urls(&urls)?;
            println!("Imported {} URL(s).", urls.len());
            Ok(())
        }
        Commands::List { status, limit } => {
            let filter = match status.as_deref() {
                Some(s) => Some(
                    Status::parse(s).ok_or_else(|| anyhow::anyhow!("Unknown status: {}", s))?,
                ),
                None => None,
            };
            let rows: Vec<_> = state
                .records()
                .iter()
                .filter(|r| filter.map_or(true, |f| r.status == f))
                .take(limit)
                .collect();
            if rows.is_empty() {
                println!("No URLs. Use 'add' or 'import' first.");
                return Ok(());
            }

            println!("{:<8} | {:<48} | {:<10} | {:<6} | {:<19}", "ID", "URL", "Status", "Frame", "Added");
            println!("{}", "-".repeat(103));
            for r in &rows {
                let framework = r.framework.as_ref().map(|f| f.name()).unwrap_or("-");
                println!(
                    "{:<8} | {:<48} | {:<10} | {:<6} | {}",
                    short_id(&r.id),
                    truncate(&r.url, 45),
                    r.status,
                    framework,
                    r.created_at.format("%Y-%m-%d %H:%M:%S"),
                );
            }
            println!("\n{} of {} URLs", rows.len(), state.records().len());
            Ok(())
        }
        Commands::Show { id } => {
            let r = state
                .find(&id)
                .ok_or_else(|| anyhow::anyhow!("No URL with id {}", id))?;
            println!("URL:     {}", r.url);
            println!("ID:      {}", r.id);
            println!("Status:  {}", r.status);
            println!("Added:   {}", r.created_at.to_rfc3339());
            if let Some(e) = &r.error {
                println!("Error:   {}", e);
            }
            if let Some(f) = &r.framework {
                println!("\nFramework: {} ({}) [{}]", f.name(), f.description(), f.code.style());
                println!("Why:       {}", f.justification);
            }
            if let (Some(titles), Some(metas)) = (&r.titles, &r.meta_descriptions) {
                println!("\n--- Titles ---");
                for (i, (t, m)) in titles.iter().zip(metas).enumerate() {
                    let check = check_copy(t, m);
                    println!(
                        "{}. {} [{}/{} {}]",
                        i + 1,
                        t,
                        check.title_len,
                        parser::generator::TITLE_MAX_LEN,
                        if check.title_valid { "ok" } else { "too long" }
                    );
                }
                println!("\n--- Meta descriptions ---");
                for (i, (t, m)) in titles.iter().zip(metas).enumerate() {
                    let check = check_copy(t, m);
                    println!(
                        "{}. {} [{}/{} {}]",
                        i + 1,
                        m,
                        check.meta_len,
                        parser::generator::META_MAX_LEN,
                        if check.meta_valid { "ok" } else { "too long" }
                    );
                }
            }
            Ok(())
        }
        Commands::Delete { id } => {
            match state.delete(&id)? {
                Some(r) => println!("Deleted {}", r.url),
                None => println!("No URL with id {}", id),
            }
            Ok(())
        }
        Commands::Reset => {
            if state.reset()? {
                println!("All URLs removed.");
            } else {
                println!("Processing is running; reset refused.");
            }
            Ok(())
        }
        Commands::Unlock => {
            if state.unlock()? {
                println!("Run marker cleared.");
            } else {
                println!("No run in progress.");
            }
            Ok(())
        }
        Commands::Run { live } => {
            let pending = state.stats().pending;
            if pending == 0 {
                println!("No pending URLs. Use 'add' or 'import' first.");
                return Ok(());
            }

            let fetcher: Arc<dyn Fetcher> = if live {
                Arc::new(HttpFetcher::new()?)
            } else {
                Arc::new(settings.simulated_fetcher())
            };

            let run = state.run_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Pause requested, finishing current group");
                    run.pause();
                }
            });

            println!("Processing {} pending URLs...", pending);
            let opts = settings.batch_options(true);
            let stats = batch::start(&mut state, fetcher, &opts).await?;
            println!(
                "Done: {} processed ({} ok, {} errors), {} still pending.",
                stats.ok + stats.errors,
                stats.ok,
                stats.errors,
                stats.skipped
            );
            Ok(())
        }
        Commands::Export { dir } => {
            let dir = dir.unwrap_or_else(|| settings.export_dir.clone());
            match export::export_completed(state.records(), &dir, chrono::Utc::now())? {
                Some(path) => println!("Wrote {}", path.display()),
                None => println!("No completed URLs to export."),
            }
            Ok(())
        }
        Commands::SaveContent { id, dir } => {
            let r = state
                .find(&id)
                .ok_or_else(|| anyhow::anyhow!("No URL with id {}", id))?;
            let dir = dir.unwrap_or_else(|| settings.export_dir.clone());
            match export::save_content(r, &dir)? {
                Some(path) => println!("Wrote {}", path.display()),
                None => println!("No extracted content for {}", r.url),
            }
            Ok(())
        }
        Commands::Preview { framework, file } => {
            let text = read_input(file.as_ref())?;
            let content = parser::content::extract_main_content(&text);
            let copy = match framework.as_deref() {
                Some(tag) => {
                    println!("Framework: {} (forced)", tag);
                    parser::generator::generate_for_tag(&content, tag)
                }
                None => {
                    let f = parser::frameworks::detect(&content);
                    println!("Framework: {} ({})", f.name(), f.justification);
                    parser::generator::generate(&content, &f)
                }
            };
            println!("Keywords:  {}", parser::generator::keyword_excerpt(&content));
            for t in &copy.titles {
                println!("  title: {}", t);
            }
            for m in &copy.meta_descriptions {
                println!("  meta:  {}", m);
            }
            Ok(())
        }
        Commands::Stats => {
            let s = state.stats();
            println!("Total:      {}", s.total);
            println!("Pending:    {}", s.pending);
            println!("Processing: {}", s.processing);
            println!("Completed:  {}", s.completed);
            println!("Errors:     {}", s.errors);
            println!("Progress:   {:.0}%", s.progress());
            Ok(())
        }
        Commands::DarkMode { value } => {
            if let Some(v) = value {
                state.set_dark_mode(matches!(v, Toggle::On))?;
            }
            println!("Dark mode: {}", if state.dark_mode() { "on" } else { "off" });
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn read_input(file: Option<&PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
