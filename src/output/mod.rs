//! Output module for run summaries and mirror statistics
//!
//! This module handles:
//! - Summarising a finished run (per-phase counters and timing)
//! - Reporting what an existing mirror holds on disk

pub mod stats;

pub use stats::{load_statistics, print_statistics, CategoryStats, MirrorStatistics};

use crate::crawler::{HarvestReport, PoolReport, WalkReport};
use chrono::{DateTime, Utc};

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Structural phase results, `None` when the phase was skipped
    pub structure: Option<(WalkReport, PoolReport)>,

    /// Harvest phase results, `None` when the phase was skipped
    pub harvest: Option<(HarvestReport, PoolReport)>,
}

impl RunSummary {
    fn pool_reports(&self) -> impl Iterator<Item = &PoolReport> {
        self.structure
            .iter()
            .map(|(_, pool)| pool)
            .chain(self.harvest.iter().map(|(_, pool)| pool))
    }

    /// Documents downloaded across both phases
    pub fn downloaded(&self) -> u64 {
        self.pool_reports().map(|p| p.downloaded).sum()
    }

    /// Jobs skipped because the file was already on disk
    pub fn already_present(&self) -> u64 {
        self.pool_reports().map(|p| p.already_present).sum()
    }

    /// Jobs that failed across both phases
    pub fn failed(&self) -> u64 {
        self.pool_reports().map(|p| p.failed).sum()
    }

    /// Bytes written across both phases
    pub fn bytes(&self) -> u64 {
        self.pool_reports().map(|p| p.bytes).sum()
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Crawl Summary ===\n");

    println!(
        "Started:  {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Finished: {}",
        summary.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Duration: {}s\n",
        (summary.finished_at - summary.started_at).num_seconds()
    );

    if let Some((walk, pool)) = &summary.structure {
        println!("Structure:");
        println!("  Nodes expanded: {}", walk.nodes_expanded);
        println!("  Nodes abandoned: {}", walk.nodes_abandoned);
        println!("  Children scheduled: {}", walk.children_scheduled);
        println!("  Children not expanded: {}", walk.children_skipped);
        if !walk.tiers.is_empty() {
            let tiers: Vec<_> = walk.tiers.iter().map(String::as_str).collect();
            println!("  Tiers: {}", tiers.join(", "));
        }
        print_pool(pool);
        println!();
    }

    if let Some((harvest, pool)) = &summary.harvest {
        println!("Harvest:");
        println!("  Leaf files scanned: {}", harvest.files_scanned);
        println!("  Leaf files skipped: {}", harvest.files_skipped);
        println!("  Result jobs: {}", harvest.result_jobs);
        println!("  Contest jobs: {}", harvest.contest_jobs);
        println!("  Duplicate contests suppressed: {}", harvest.duplicate_contests);
        println!("  Malformed entries: {}", harvest.malformed_entries);
        print_pool(pool);
        println!();
    }

    println!(
        "Total: {} downloaded ({} bytes), {} already present, {} failed",
        summary.downloaded(),
        summary.bytes(),
        summary.already_present(),
        summary.failed()
    );
}

fn print_pool(pool: &PoolReport) {
    println!(
        "  Fetches: {} downloaded, {} already present, {} failed",
        pool.downloaded, pool.already_present, pool.failed
    );
}
