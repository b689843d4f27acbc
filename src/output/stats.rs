//! Statistics generation from an existing mirror
//!
//! The mirror has no index: a file's existence is the only record that it was
//! fetched. Statistics are therefore gathered by walking the output root.

use crate::layout::Layout;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// File counts for one top-level category directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    /// Documents stored (recursively)
    pub documents: u64,

    /// Total size of those documents
    pub bytes: u64,

    /// `.part` files left behind by an interrupted run
    pub partial_files: u64,
}

/// What a mirror currently holds
#[derive(Debug, Clone, Default)]
pub struct MirrorStatistics {
    /// Whether the tree root has been downloaded
    pub has_root: bool,

    /// Structural tiers by label
    pub tiers: BTreeMap<String, CategoryStats>,

    /// Flat categories (results, contests) by directory name
    pub flat: BTreeMap<String, CategoryStats>,
}

impl MirrorStatistics {
    /// Total documents on disk, the root included
    pub fn total_documents(&self) -> u64 {
        let categories: u64 = self
            .tiers
            .values()
            .chain(self.flat.values())
            .map(|c| c.documents)
            .sum();
        categories + u64::from(self.has_root)
    }
}

/// Loads statistics by walking the output root of `layout`
///
/// A missing output root yields empty statistics.
pub fn load_statistics(layout: &Layout) -> io::Result<MirrorStatistics> {
    let root = layout.output_root();
    let mut stats = MirrorStatistics {
        has_root: layout.root_document().is_file(),
        ..Default::default()
    };

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(stats),
        Err(e) => return Err(e),
    };

    let flat = layout.flat_categories();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let mut category = CategoryStats::default();
        count_documents(&entry.path(), &mut category)?;

        if flat.contains(&name.as_str()) {
            stats.flat.insert(name, category);
        } else {
            stats.tiers.insert(name, category);
        }
    }

    Ok(stats)
}

fn count_documents(dir: &Path, stats: &mut CategoryStats) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_dir() {
            count_documents(&path, stats)?;
            continue;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                stats.documents += 1;
                stats.bytes += entry.metadata()?.len();
            }
            Some("part") => stats.partial_files += 1,
            _ => {}
        }
    }
    Ok(())
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &MirrorStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!(
        "Root document: {}",
        if stats.has_root { "present" } else { "missing" }
    );
    println!("Total documents: {}\n", stats.total_documents());

    println!("Structural Tiers ({}):", stats.tiers.len());
    for (label, category) in &stats.tiers {
        print_category(label, category);
    }
    println!();

    println!("Leaf Resources:");
    for (name, category) in &stats.flat {
        print_category(name, category);
    }

    let partial: u64 = stats
        .tiers
        .values()
        .chain(stats.flat.values())
        .map(|c| c.partial_files)
        .sum();
    if partial > 0 {
        println!(
            "\n{} partial downloads found; they are replaced on the next run",
            partial
        );
    }
}

fn print_category(name: &str, category: &CategoryStats) {
    println!(
        "  {}: {} documents ({} bytes)",
        name, category.documents, category.bytes
    );
}
