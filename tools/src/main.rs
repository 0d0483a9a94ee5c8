//! panel-runner: headless batch runner for the monthly episode panel.
//!
//! Usage:
//!   panel-runner --year 2022 --db panel.db --episodes episodes.json
//!   panel-runner --year 2022 --db panel.db --run-id <id> --export panel.jsonl
//!
//! Flags:
//!   --year        reporting year (observation windows end in its December)
//!   --db          SQLite database (default: in-memory)
//!   --data-dir    rule and adjustment-factor tables (default: ./data)
//!   --episodes    JSON array of decoded episodes; replaces the year's
//!                 stored episodes (not allowed with --run-id)
//!   --batch-size  subjects per persisted batch
//!   --workers     worker threads per batch
//!   --run-id      resume an interrupted run instead of starting a new one
//!   --export      write the finished panel as JSON lines

use anyhow::{Context, Result};
use panel_core::{
    config::{PanelConfig, DEFAULT_BATCH_SIZE, DEFAULT_WORKERS},
    engine::{PanelEngine, RunSummary},
    episode::{Episode, EpisodeSource},
    store::PanelStore,
};
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let year = parse_arg(&args, "--year", chrono_year());
    let batch_size = parse_arg(&args, "--batch-size", DEFAULT_BATCH_SIZE);
    let workers = parse_arg(&args, "--workers", DEFAULT_WORKERS);
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");
    let episodes_path = str_arg(&args, "--episodes");
    let export_path = str_arg(&args, "--export");
    let resume_id = str_arg(&args, "--run-id");

    println!("Monthly episode panel: panel-runner");
    println!("  year:        {year}");
    println!("  db:          {db}");
    println!("  data_dir:    {data_dir}");
    println!("  batch_size:  {batch_size}");
    println!("  workers:     {workers}");
    println!();

    let config = PanelConfig::load(data_dir, year)?
        .with_batch_size(batch_size)
        .with_workers(workers);

    let mut store = PanelStore::open(db)?;
    store.migrate()?;

    anyhow::ensure!(
        episodes_path.is_none() || resume_id.is_none(),
        "--episodes cannot be combined with --run-id: a resumed run must read the episodes its saved batches were built from"
    );

    if let Some(path) = episodes_path {
        let episodes = read_episodes(path)?;
        store.replace_episodes(year, &episodes)?;
        log::info!("imported {} episodes from {path}", episodes.len());
    }

    let run_id = match resume_id {
        Some(id) => {
            let run_year = store
                .run_year(id)?
                .with_context(|| format!("run {id} not found in {db}"))?;
            anyhow::ensure!(
                run_year == year,
                "run {id} was started for {run_year}, not {year}"
            );
            id.to_string()
        }
        None => {
            let id = format!("run-{year}-{}", uuid::Uuid::new_v4());
            store.insert_run(&id, year, env!("CARGO_PKG_VERSION"))?;
            id
        }
    };

    let subjects = store.load_subjects(year)?;
    let engine = PanelEngine::new(run_id.clone(), config);
    let summary = engine.run(&subjects, &mut store)?;

    if let Some(path) = export_path {
        let written = export_jsonl(&store, &run_id, path)?;
        log::info!("exported {written} records to {path}");
    }

    print_summary(&store, &run_id, &summary)?;
    Ok(())
}

fn read_episodes(path: &str) -> Result<Vec<Episode>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    let episodes: Vec<Episode> =
        serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))?;
    Ok(episodes)
}

fn export_jsonl(store: &PanelStore, run_id: &str, path: &str) -> Result<usize> {
    let records = store.monthly_records(run_id)?;
    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("Cannot create {path}"))?,
    );
    for record in &records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(records.len())
}

fn print_summary(store: &PanelStore, run_id: &str, summary: &RunSummary) -> Result<()> {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:           {run_id}");
    println!("  subjects:         {}", summary.subjects);
    println!("  batches:          {}", summary.batches_total);
    println!("  batches written:  {}", summary.batches_written);
    println!("  batches skipped:  {}", summary.batches_skipped);
    println!("  records written:  {}", summary.records_written);
    println!("  records stored:   {}", store.record_count(run_id)?);
    Ok(())
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

/// Last completed calendar year.
fn chrono_year() -> i32 {
    use chrono::Datelike;
    chrono::Utc::now().year() - 1
}
