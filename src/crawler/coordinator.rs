//! Crawl coordinator - runs the structural and harvest phases in order
//!
//! Setup failures (output directory, HTTP client, root document, harvest
//! directories) end the run with an error. Everything after setup is
//! contained per item: a failed node or job is logged and the run continues.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, Fetcher};
use crate::crawler::harvester::{HarvestReport, Harvester};
use crate::crawler::pool::{PoolReport, WorkerPool};
use crate::crawler::walker::{create_dir, TreeWalker, WalkReport};
use crate::layout::Layout;
use crate::output::RunSummary;
use crate::CanvassError;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

/// Phase selection for a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip the structural phase (harvest an existing mirror)
    pub skip_structure: bool,

    /// Skip the harvest phase
    pub skip_leaves: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    layout: Layout,
    fetcher: Arc<Fetcher>,
}

impl Coordinator {
    /// Creates a coordinator, building the HTTP client and the output root
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CanvassError)` - The output root or the client could not be set up
    pub async fn new(config: Config) -> Result<Self, CanvassError> {
        let layout = Layout::from_config(&config);

        let root = layout.output_root().to_path_buf();
        create_dir(&root)
            .await
            .map_err(|source| CanvassError::Setup { path: root, source })?;

        let client = build_http_client(&config.remote, &config.crawler)?;
        let fetcher = Arc::new(Fetcher::new(
            client,
            config.remote.base_url.clone(),
            config.crawler.request_delay(),
        ));

        Ok(Self {
            config,
            layout,
            fetcher,
        })
    }

    /// Runs the selected phases and returns their combined summary
    pub async fn run(&self, options: RunOptions) -> Result<RunSummary, CanvassError> {
        let started_at = Utc::now();
        tracing::info!(
            "Starting crawl of {} into {}",
            self.fetcher.base_url(),
            self.layout.output_root().display()
        );

        let structure = if options.skip_structure {
            tracing::info!("Skipping structural phase");
            None
        } else {
            Some(self.expand_structure().await?)
        };

        let harvest = if options.skip_leaves {
            tracing::info!("Skipping harvest phase");
            None
        } else {
            Some(self.harvest_leaves().await?)
        };

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            structure,
            harvest,
        };

        tracing::info!(
            "Crawl completed in {}s: {} downloaded, {} already present, {} failed",
            (summary.finished_at - summary.started_at).num_seconds(),
            summary.downloaded(),
            summary.already_present(),
            summary.failed()
        );

        Ok(summary)
    }

    /// Fetches the root document and expands the tree below it
    async fn expand_structure(&self) -> Result<(WalkReport, PoolReport), CanvassError> {
        let root = self.layout.root_document();
        let root_outcome = self
            .fetcher
            .ensure(&root, self.layout.root_remote_path())
            .await?;

        let pool = self.start_pool();
        let walked = TreeWalker::new(&self.layout, &pool).expand(&root).await;
        let mut fetched = pool.shutdown().await;
        fetched.record(&Ok(root_outcome));

        Ok((walked?, fetched))
    }

    /// Harvests result and contest documents from the leaf tier
    async fn harvest_leaves(&self) -> Result<(HarvestReport, PoolReport), CanvassError> {
        let leaf_dir = self.layout.leaf_dir();
        tracing::info!(
            "Harvesting {} documents in {}",
            self.layout.leaf_tier(),
            leaf_dir.display()
        );

        let mut seen_contests = HashSet::new();
        let pool = self.start_pool();
        let harvested = Harvester::new(&self.layout, &pool)
            .harvest(&leaf_dir, &mut seen_contests)
            .await;
        let fetched = pool.shutdown().await;

        Ok((harvested?, fetched))
    }

    fn start_pool(&self) -> WorkerPool {
        WorkerPool::start(
            Arc::clone(&self.fetcher),
            self.config.crawler.workers,
            self.config.crawler.queue_capacity,
        )
    }
}

/// Runs a complete crawl
///
/// # Example
///
/// ```no_run
/// use canvass::config::Config;
/// use canvass::crawler::{run, RunOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let summary = run(Config::default(), RunOptions::default()).await?;
/// println!("{} documents downloaded", summary.downloaded());
/// # Ok(())
/// # }
/// ```
pub async fn run(config: Config, options: RunOptions) -> Result<RunSummary, CanvassError> {
    let coordinator = Coordinator::new(config).await?;
    coordinator.run(options).await
}
