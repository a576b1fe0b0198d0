//! Command-line interface module for tidywatch.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Configuration loading with user-facing warnings
//! - The initial batch pass with progress reporting
//! - Starting and holding the watch session

use crate::config::{ConfigSource, SorterConfig};
use crate::file_organizer::Organizer;
use crate::output::OutputFormatter;
use crate::scanner::{BatchScanner, ScanReport};
use crate::watcher::{self, WatchSession};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Sort every file in a folder into category subfolders, then keep watching
/// for new ones.
#[derive(Debug, Parser)]
#[command(name = "tidywatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Folder to organize and watch
    pub folder: PathBuf,

    /// Category configuration file (JSON or TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use the built-in category table instead of a configuration file
    #[arg(long, conflicts_with = "config")]
    pub builtin: bool,

    /// Show what would be moved without moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Organize existing files and exit instead of watching
    #[arg(long)]
    pub once: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runs the application for parsed arguments.
///
/// In the default mode this only returns on error: once watching has
/// started it blocks until the process is terminated.
pub fn run(cli: &Cli) -> Result<()> {
    let config = if cli.builtin {
        OutputFormatter::info("Using built-in categories");
        SorterConfig::builtin()
    } else {
        load_config(cli.config.as_deref())
    };
    let organizer = Organizer::new(config);

    if cli.dry_run {
        return dry_run(&organizer, &cli.folder);
    }

    // Subscribe before the initial pass so files arriving during it are not missed.
    let session = if cli.once {
        None
    } else {
        Some(
            watcher::start_watching(organizer.clone(), &cli.folder)
                .with_context(|| format!("Could not watch {}", cli.folder.display()))?,
        )
    };

    let report = organize_existing(&organizer, &cli.folder)?;
    print_report(&report);

    match session {
        Some(session) => wait(session),
        None => {
            OutputFormatter::success("Done.");
            Ok(())
        }
    }
}

fn load_config(explicit: Option<&Path>) -> SorterConfig {
    let (config, source, error) = SorterConfig::load_or_fallback(explicit);

    if let Some(e) = error {
        OutputFormatter::warning(&format!(
            "Failed to load configuration: {}. Every file will go to Others.",
            e
        ));
    }

    match source {
        ConfigSource::File(path) => {
            OutputFormatter::info(&format!("Using configuration {}", path.display()))
        }
        ConfigSource::Fallback => {}
    }

    config
}

fn organize_existing(organizer: &Organizer, folder: &Path) -> Result<ScanReport> {
    OutputFormatter::info(&format!("Organizing contents of: {}", folder.display()));

    let entries = BatchScanner::snapshot(folder)
        .with_context(|| format!("Error reading directory {}", folder.display()))?;
    let pb = OutputFormatter::create_progress_bar(entries.len() as u64);

    let report = BatchScanner::new(organizer.clone())
        .organize_entries_with(entries, |path, _| {
            if let Some(name) = path.file_name() {
                pb.set_message(name.to_string_lossy().to_string());
            }
            pb.inc(1);
        })
        .with_context(|| format!("Organizing {} failed", folder.display()))?;

    pb.finish_and_clear();
    Ok(report)
}

fn print_report(report: &ScanReport) {
    if !report.moved.is_empty() {
        OutputFormatter::summary_table(&report.category_counts(), report.moved.len());
    } else {
        OutputFormatter::info("Nothing to organize.");
    }

    if !report.failed.is_empty() {
        OutputFormatter::warning(&format!("{} file(s) could not be organized:", report.failed.len()));
        for (path, reason) in &report.failed {
            OutputFormatter::error(&format!("{}: {}", path.display(), reason));
        }
    }
}

fn dry_run(organizer: &Organizer, folder: &Path) -> Result<()> {
    OutputFormatter::info(&format!("DRY RUN: Analyzing contents of: {}", folder.display()));

    let plan = BatchScanner::new(organizer.clone())
        .plan_existing(folder)
        .with_context(|| format!("Error reading directory {}", folder.display()))?;

    if plan.is_empty() {
        OutputFormatter::info("No files found to organize.");
        return Ok(());
    }

    OutputFormatter::dry_run_plan(&plan);

    let mut counts = std::collections::HashMap::new();
    for planned in &plan {
        *counts.entry(planned.category.clone()).or_insert(0) += 1;
    }
    OutputFormatter::summary_table(&counts, plan.len());
    OutputFormatter::success("Dry run complete. No files were modified.");
    Ok(())
}

fn wait(session: WatchSession) -> Result<()> {
    OutputFormatter::success(&format!(
        "Real-time watching started on {} (Ctrl+C to quit)",
        session.folder().display()
    ));
    session.join();
    Ok(())
}
