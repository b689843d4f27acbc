//! Structural tree expansion
//!
//! The walker discovers the tree one node at a time on a single control flow.
//! For every node it submits a tracked fetch job per child, waits for that
//! level's jobs, then pushes the fetched children onto an explicit stack. A
//! child is therefore never parsed before its own download has finished, and
//! tree depth never grows the call stack.

use crate::crawler::parser::{parse_node, NodeListing};
use crate::crawler::pool::{Job, JobResult, WorkerPool};
use crate::layout::Layout;
use crate::CanvassError;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;

/// Counters collected while expanding the tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    /// Nodes parsed successfully (leaves included)
    pub nodes_expanded: u64,

    /// Nodes whose branch was abandoned after a parse or setup error
    pub nodes_abandoned: u64,

    /// Child fetch jobs submitted
    pub children_scheduled: u64,

    /// Children not expanded: fetch failed, no remote path, or a sibling
    /// already claimed the same destination
    pub children_skipped: u64,

    /// Tier labels seen, i.e. the structural directories written
    pub tiers: BTreeSet<String>,
}

/// Expands the structural tree below a root document
pub struct TreeWalker<'a> {
    layout: &'a Layout,
    pool: &'a WorkerPool,
}

impl<'a> TreeWalker<'a> {
    pub fn new(layout: &'a Layout, pool: &'a WorkerPool) -> Self {
        Self { layout, pool }
    }

    /// Expands the tree below `root`, which must already be on disk
    ///
    /// Per-node failures are logged and only abandon that node's branch. The
    /// only error returned is a closed pool.
    pub async fn expand(&self, root: &Path) -> Result<WalkReport, CanvassError> {
        let mut report = WalkReport::default();
        let mut stack = vec![root.to_path_buf()];

        while let Some(node) = stack.pop() {
            let listing = match parse_node(&node).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.nodes_abandoned += 1;
                    continue;
                }
            };
            report.nodes_expanded += 1;

            let fetched = self.fetch_children(&node, listing, &mut report).await?;

            // Reversed so the first child is expanded first
            stack.extend(fetched.into_iter().rev());
        }

        tracing::info!(
            "Structure expanded: {} nodes, {} children scheduled, {} abandoned",
            report.nodes_expanded,
            report.children_scheduled,
            report.nodes_abandoned
        );

        Ok(report)
    }

    /// Fetches every child of one node, returning the ones now on disk
    async fn fetch_children(
        &self,
        node: &Path,
        listing: NodeListing,
        report: &mut WalkReport,
    ) -> Result<Vec<PathBuf>, CanvassError> {
        let label = match listing.label {
            Some(label) if !listing.children.is_empty() => label,
            _ => return Ok(Vec::new()),
        };

        let dir = self.layout.tier_dir(&label);
        if let Err(e) = create_dir(&dir).await {
            tracing::error!(
                "Cannot create {} for children of {}: {}",
                dir.display(),
                node.display(),
                e
            );
            report.nodes_abandoned += 1;
            return Ok(Vec::new());
        }
        report.tiers.insert(label.clone());

        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut pending: Vec<(PathBuf, oneshot::Receiver<JobResult>)> = Vec::new();
        for child in &listing.children {
            let remote_path = match self
                .layout
                .child_remote_path(&child.code, child.fragment.as_deref())
            {
                Some(remote_path) => remote_path,
                None => {
                    tracing::warn!(
                        "Cannot build a remote path for child '{}' of {}",
                        child.code,
                        node.display()
                    );
                    report.children_skipped += 1;
                    continue;
                }
            };

            let destination = self.layout.node_destination(&label, &child.code);
            if !claimed.insert(destination.clone()) {
                tracing::warn!(
                    "Child '{}' of {} maps to {} which a sibling already claimed",
                    child.code,
                    node.display(),
                    destination.display()
                );
                report.children_skipped += 1;
                continue;
            }

            let done = self
                .pool
                .submit_tracked(Job::new(destination.clone(), remote_path))
                .await?;
            report.children_scheduled += 1;
            pending.push((destination, done));
        }

        let mut fetched = Vec::with_capacity(pending.len());
        for (destination, done) in pending {
            match done.await {
                Ok(Ok(_)) => fetched.push(destination),
                // The worker already logged the failure
                Ok(Err(_)) => report.children_skipped += 1,
                Err(_) => {
                    tracing::error!("Fetch worker dropped job for {}", destination.display());
                    report.children_skipped += 1;
                }
            }
        }

        Ok(fetched)
    }
}

/// Creates a directory and its parents, world-writable on unix
pub(crate) async fn create_dir(path: &Path) -> std::io::Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o777);
    builder.create(path).await
}
