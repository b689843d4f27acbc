use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Canvass
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// How a child reference is turned into a remote path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChildPathShape {
    /// The child's `url` fragment (or its code) is the path below the regions prefix
    #[default]
    Fragment,
    /// The first two characters of the code form an extra path segment
    CodePrefix,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Origin every remote path is appended to
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Remote path of the tree root document
    #[serde(rename = "root-path")]
    pub root_path: String,

    /// Prefix for structural node documents
    #[serde(rename = "regions-prefix")]
    pub regions_prefix: String,

    /// Prefix for per-unit result documents
    #[serde(rename = "results-prefix")]
    pub results_prefix: String,

    /// Prefix for per-contest documents
    #[serde(rename = "contests-prefix")]
    pub contests_prefix: String,

    /// Shape used to build child paths
    #[serde(rename = "child-paths")]
    pub child_paths: ChildPathShape,

    /// Extra static headers added to every request
    pub headers: BTreeMap<String, String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://2022electionresults.comelec.gov.ph".to_string(),
            user_agent:
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:100.0) Gecko/20100101 Firefox/100.0"
                    .to_string(),
            root_path: "/data/regions/root.json".to_string(),
            regions_prefix: "/data/regions/".to_string(),
            results_prefix: "/data/results/".to_string(),
            contests_prefix: "/data/contests/".to_string(),
            child_paths: ChildPathShape::Fragment,
            headers: BTreeMap::new(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers per pool
    pub workers: usize,

    /// Capacity of the job queue between discovery and workers
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,

    /// Pause after every successful download (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Optional per-request timeout (seconds); transport default when absent
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: Option<u64>,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 1,
            request_delay_ms: 500,
            request_timeout_secs: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory of the local mirror
    pub directory: String,

    /// Tier label whose directory holds the lowest administrative units
    #[serde(rename = "leaf-tier")]
    pub leaf_tier: String,

    /// Directory name for per-unit result documents
    #[serde(rename = "results-dir")]
    pub results_dir: String,

    /// Directory name for per-contest documents
    #[serde(rename = "contests-dir")]
    pub contests_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "output".to_string(),
            leaf_tier: "Barangay".to_string(),
            results_dir: "Precinct".to_string(),
            contests_dir: "Contest".to_string(),
        }
    }
}
