//! Crawler module for mirroring the remote tree
//!
//! This module contains the core crawling logic, including:
//! - Idempotent fetching of single documents
//! - Parsing structural nodes into child references
//! - A bounded pool of fetch workers
//! - Depth-first expansion of the structural tree
//! - Harvesting result and contest documents from the lowest tier
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod harvester;
mod parser;
mod pool;
mod walker;

pub use coordinator::{run, Coordinator, RunOptions};
pub use fetcher::{build_http_client, FetchOutcome, Fetcher};
pub use harvester::{plan_leaf_jobs, HarvestReport, Harvester, LeafPlan, PlannedJob};
pub use parser::{parse_listing, parse_node, ChildRef, NodeListing};
pub use pool::{Job, JobResult, PoolReport, WorkerPool};
pub use walker::{TreeWalker, WalkReport};
