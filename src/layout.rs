//! Local and remote path construction
//!
//! Every path the crawler reads, writes or requests is built here, so the
//! mapping between remote documents and the on-disk mirror lives in one place:
//!
//! ```text
//! output/root.json                         <- remote root-path
//! output/<Label>/<code>.json               <- regions-prefix + child path
//! output/<results>/<prefix>/<unit>.json    <- results-prefix + <prefix>/<unit>.json
//! output/<contests>/<id>.json              <- contests-prefix + <id>.json
//! ```

use crate::config::{ChildPathShape, Config};
use std::path::{Path, PathBuf};

/// Returns true if `segment` can be used as a single path component
///
/// Labels, codes and unit references come from remote documents and end up
/// as directory and file names, so they must not escape the output root.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

/// Local destination and remote path of one per-unit result document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPaths {
    /// Directory holding the result (keyed by the reference prefix)
    pub directory: PathBuf,
    /// Local file the result is written to
    pub destination: PathBuf,
    /// Remote path the result is fetched from
    pub remote_path: String,
}

/// Path scheme of a mirror
#[derive(Debug, Clone)]
pub struct Layout {
    output_root: PathBuf,
    root_path: String,
    regions_prefix: String,
    results_prefix: String,
    contests_prefix: String,
    child_paths: ChildPathShape,
    leaf_tier: String,
    results_dir: String,
    contests_dir: String,
}

impl Layout {
    /// Builds the layout described by a configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_root: PathBuf::from(&config.output.directory),
            root_path: config.remote.root_path.clone(),
            regions_prefix: config.remote.regions_prefix.clone(),
            results_prefix: config.remote.results_prefix.clone(),
            contests_prefix: config.remote.contests_prefix.clone(),
            child_paths: config.remote.child_paths,
            leaf_tier: config.output.leaf_tier.clone(),
            results_dir: config.output.results_dir.clone(),
            contests_dir: config.output.contests_dir.clone(),
        }
    }

    /// Replaces the output root, keeping every other setting
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Local copy of the tree root
    pub fn root_document(&self) -> PathBuf {
        self.output_root.join("root.json")
    }

    /// Remote path of the tree root
    pub fn root_remote_path(&self) -> &str {
        &self.root_path
    }

    /// Directory holding every node of one structural tier
    pub fn tier_dir(&self, label: &str) -> PathBuf {
        self.output_root.join(label)
    }

    /// Local destination of a structural node
    pub fn node_destination(&self, label: &str, code: &str) -> PathBuf {
        self.tier_dir(label).join(format!("{}.json", code))
    }

    /// Remote path of a structural child
    ///
    /// Returns `None` when the code-prefix shape is configured and the code
    /// is too short to yield a two-character prefix.
    pub fn child_remote_path(&self, code: &str, fragment: Option<&str>) -> Option<String> {
        match self.child_paths {
            ChildPathShape::Fragment => Some(format!(
                "{}{}.json",
                self.regions_prefix,
                fragment.unwrap_or(code)
            )),
            ChildPathShape::CodePrefix => {
                let prefix = code.get(..2).filter(|p| p.chars().count() == 2)?;
                Some(format!("{}{}/{}.json", self.regions_prefix, prefix, code))
            }
        }
    }

    /// Directory of lowest-tier documents scanned by the harvest pass
    pub fn leaf_dir(&self) -> PathBuf {
        self.tier_dir(&self.leaf_tier)
    }

    pub fn leaf_tier(&self) -> &str {
        &self.leaf_tier
    }

    pub fn results_dir(&self) -> PathBuf {
        self.output_root.join(&self.results_dir)
    }

    pub fn contests_dir(&self) -> PathBuf {
        self.output_root.join(&self.contests_dir)
    }

    /// Paths for a unit result reference such as `"1234/12340001"`
    ///
    /// The leading segments key the containing directory. Returns `None` if
    /// any segment is unsafe to use on disk.
    pub fn unit_paths(&self, reference: &str) -> Option<UnitPaths> {
        if !reference.split('/').all(is_safe_segment) {
            return None;
        }

        let (parents, unit) = match reference.rsplit_once('/') {
            Some((parents, unit)) => (Some(parents), unit),
            None => (None, reference),
        };

        let mut directory = self.results_dir();
        for segment in parents.into_iter().flat_map(|p| p.split('/')) {
            directory.push(segment);
        }
        let destination = directory.join(format!("{}.json", unit));

        Some(UnitPaths {
            directory,
            destination,
            remote_path: format!("{}{}.json", self.results_prefix, reference),
        })
    }

    /// Local destination of a contest document
    pub fn contest_destination(&self, id: u64) -> PathBuf {
        self.contests_dir().join(format!("{}.json", id))
    }

    /// Remote path of a contest document
    pub fn contest_remote_path(&self, id: u64) -> String {
        format!("{}{}.json", self.contests_prefix, id)
    }

    /// Names of the category directories that are not structural tiers
    pub fn flat_categories(&self) -> [&str; 2] {
        [&self.results_dir, &self.contests_dir]
    }
}
