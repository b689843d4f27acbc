//! Leaf resource harvesting
//!
//! Once the structural tree is on disk, every document of the lowest tier is
//! scanned for the flat resources it references:
//!
//! ```json
//! { "pps": [ { "vbs": [ { "url": "1234/12340001", "cs": [5, 17] } ] } ] }
//! ```
//!
//! Each unit yields one result job; each contest id yields one contest job
//! the first time it is seen. This pass never modifies structural files.

use crate::crawler::pool::{Job, WorkerPool};
use crate::crawler::walker::create_dir;
use crate::layout::{Layout, UnitPaths};
use crate::CanvassError;
use serde::Deserialize;
use serde_json::{Number, Value};
use std::collections::HashSet;
use std::path::Path;

/// Typed view of a lowest-tier document
#[derive(Debug, Deserialize)]
struct LeafDocument {
    pps: Vec<Value>,
}

/// A grouping entry (polling place) holding units
#[derive(Debug, Deserialize)]
struct Group {
    vbs: Vec<Value>,
}

/// A unit entry referencing its result and the contests it takes part in
#[derive(Debug, Deserialize)]
struct Unit {
    url: String,
    #[serde(default)]
    cs: Vec<Number>,
}

/// A fetch planned from a leaf document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedJob {
    /// Per-unit result document
    Result(UnitPaths),
    /// Per-contest document, identified by its numeric id
    Contest(u64),
}

/// Jobs planned from one leaf document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafPlan {
    pub jobs: Vec<PlannedJob>,

    /// Contest references suppressed because the id was already scheduled
    pub duplicate_contests: u64,

    /// Groups or units skipped because of their shape
    pub malformed_entries: u64,
}

/// Counters collected during a harvest pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// Leaf documents read
    pub files_scanned: u64,

    /// Leaf documents skipped (unreadable, invalid JSON or wrong shape)
    pub files_skipped: u64,

    /// Result jobs submitted
    pub result_jobs: u64,

    /// Contest jobs submitted
    pub contest_jobs: u64,

    /// Contest references suppressed by deduplication
    pub duplicate_contests: u64,

    /// Groups or units skipped because of their shape
    pub malformed_entries: u64,
}

/// Plans the fetch jobs referenced by one leaf document
///
/// Contest ids already in `seen` are skipped; newly planned ids are inserted.
/// Malformed groups and units are skipped without affecting their siblings.
/// An error is returned only when the document itself has the wrong shape.
pub fn plan_leaf_jobs(
    document: &Value,
    layout: &Layout,
    seen: &mut HashSet<u64>,
) -> Result<LeafPlan, String> {
    let leaf = LeafDocument::deserialize(document).map_err(|e| e.to_string())?;
    let mut plan = LeafPlan::default();

    for (group_index, group) in leaf.pps.iter().enumerate() {
        let group = match Group::deserialize(group) {
            Ok(group) => group,
            Err(e) => {
                tracing::warn!("Skipping malformed group {}: {}", group_index, e);
                plan.malformed_entries += 1;
                continue;
            }
        };

        for unit in group.vbs.iter().filter(|unit| unit.is_object()) {
            let unit = match decode_unit(unit) {
                Ok(unit) => unit,
                Err(e) => {
                    tracing::warn!("Skipping malformed unit in group {}: {}", group_index, e);
                    plan.malformed_entries += 1;
                    continue;
                }
            };

            let Some(paths) = layout.unit_paths(&unit.url) else {
                tracing::warn!("Skipping unit with unusable reference '{}'", unit.url);
                plan.malformed_entries += 1;
                continue;
            };
            plan.jobs.push(PlannedJob::Result(paths));

            for id in unit.contests {
                if seen.insert(id) {
                    plan.jobs.push(PlannedJob::Contest(id));
                } else {
                    plan.duplicate_contests += 1;
                }
            }
        }
    }

    Ok(plan)
}

/// A unit with its contest ids converted to integers
struct DecodedUnit {
    url: String,
    contests: Vec<u64>,
}

fn decode_unit(value: &Value) -> Result<DecodedUnit, String> {
    let unit = Unit::deserialize(value).map_err(|e| e.to_string())?;
    let contests = unit
        .cs
        .iter()
        .map(|n| contest_id(n).ok_or_else(|| format!("invalid contest id {}", n)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DecodedUnit {
        url: unit.url,
        contests,
    })
}

/// Contest ids arrive as JSON numbers, sometimes written as floats
fn contest_id(number: &Number) -> Option<u64> {
    if let Some(id) = number.as_u64() {
        return Some(id);
    }
    let value = number.as_f64()?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}

/// Harvests flat resources from the lowest structural tier
pub struct Harvester<'a> {
    layout: &'a Layout,
    pool: &'a WorkerPool,
}

impl<'a> Harvester<'a> {
    pub fn new(layout: &'a Layout, pool: &'a WorkerPool) -> Self {
        Self { layout, pool }
    }

    /// Scans every document in `leaf_dir` and submits its result and contest jobs
    ///
    /// The caller owns `seen` and should shut the pool down afterwards to
    /// wait for the submitted jobs.
    pub async fn harvest(
        &self,
        leaf_dir: &Path,
        seen: &mut HashSet<u64>,
    ) -> Result<HarvestReport, CanvassError> {
        for dir in [self.layout.results_dir(), self.layout.contests_dir()] {
            create_dir(&dir)
                .await
                .map_err(|source| CanvassError::Setup { path: dir, source })?;
        }

        let mut entries =
            tokio::fs::read_dir(leaf_dir)
                .await
                .map_err(|source| CanvassError::Setup {
                    path: leaf_dir.to_path_buf(),
                    source,
                })?;

        let mut report = HarvestReport::default();

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to list {}: {}", leaf_dir.display(), e);
                    break;
                }
            };

            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            self.harvest_file(&path, seen, &mut report).await?;
        }

        tracing::info!(
            "Harvest scanned {} files: {} result jobs, {} contest jobs, {} duplicate contests",
            report.files_scanned,
            report.result_jobs,
            report.contest_jobs,
            report.duplicate_contests
        );

        Ok(report)
    }

    async fn harvest_file(
        &self,
        path: &Path,
        seen: &mut HashSet<u64>,
        report: &mut HarvestReport,
    ) -> Result<(), CanvassError> {
        report.files_scanned += 1;

        let document: Value = match tokio::fs::read(path).await {
            Ok(raw) => match serde_json::from_slice(&raw) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    report.files_skipped += 1;
                    return Ok(());
                }
            },
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                report.files_skipped += 1;
                return Ok(());
            }
        };

        let plan = match plan_leaf_jobs(&document, self.layout, seen) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                report.files_skipped += 1;
                return Ok(());
            }
        };

        report.duplicate_contests += plan.duplicate_contests;
        report.malformed_entries += plan.malformed_entries;

        for job in plan.jobs {
            match job {
                PlannedJob::Result(paths) => {
                    if let Err(e) = create_dir(&paths.directory).await {
                        tracing::error!("Cannot create {}: {}", paths.directory.display(), e);
                        continue;
                    }
                    self.pool
                        .submit(Job::new(paths.destination, paths.remote_path))
                        .await?;
                    report.result_jobs += 1;
                }
                PlannedJob::Contest(id) => {
                    self.pool
                        .submit(Job::new(
                            self.layout.contest_destination(id),
                            self.layout.contest_remote_path(id),
                        ))
                        .await?;
                    report.contest_jobs += 1;
                }
            }
        }

        Ok(())
    }
}
