//! Node parser for structural documents
//!
//! A structural node lists its children under `srs`, an object whose entries
//! each carry an optional `url` fragment and the classification label `can`:
//!
//! ```json
//! { "srs": { "R01": { "url": "R01/0101", "can": "Province" } } }
//! ```
//!
//! The label of the first child names the tier directory every child of the
//! node is stored in.

use crate::layout::is_safe_segment;
use crate::NodeError;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Key holding the children of a node
const CHILDREN_KEY: &str = "srs";

/// A child reference extracted from a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    /// Filename stem of the child (last segment of its fragment, or its key)
    pub code: String,

    /// Remote path fragment below the regions prefix, when the document has one
    pub fragment: Option<String>,
}

/// Children of one node and the tier they belong to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeListing {
    /// Children in document order
    pub children: Vec<ChildRef>,

    /// Classification label of the children, `None` for a leaf
    pub label: Option<String>,

    /// Keys of children whose own label disagreed with `label`
    pub mislabelled: Vec<String>,
}

impl NodeListing {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Typed view of one entry under `srs`
#[derive(Debug, Deserialize)]
struct ChildEntry {
    url: Option<String>,
    can: Option<String>,
}

/// Parses the structural node stored at `path`
///
/// A file that is not valid JSON is deleted before `NodeError::Corrupt` is
/// returned, so the next run downloads it again. A document whose shape does
/// not match yields `NodeError::Schema` and is left in place.
///
/// # Example
///
/// ```no_run
/// use canvass::crawler::parse_node;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), canvass::NodeError> {
/// let listing = parse_node(Path::new("output/root.json")).await?;
/// println!("{} children labelled {:?}", listing.children.len(), listing.label);
/// # Ok(())
/// # }
/// ```
pub async fn parse_node(path: &Path) -> Result<NodeListing, NodeError> {
    let raw = tokio::fs::read(path).await.map_err(|source| NodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let document: Value = match serde_json::from_slice(&raw) {
        Ok(document) => document,
        Err(source) => {
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::warn!("Failed to remove corrupt file {}: {}", path.display(), e);
            }
            return Err(NodeError::Corrupt {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    parse_listing(&document).map_err(|message| NodeError::Schema {
        path: path.to_path_buf(),
        message,
    })
}

/// Extracts the listing from an already decoded node document
pub fn parse_listing(document: &Value) -> Result<NodeListing, String> {
    let root = document
        .as_object()
        .ok_or_else(|| "document is not a JSON object".to_string())?;

    let entries = match root.get(CHILDREN_KEY).and_then(Value::as_object) {
        Some(entries) => entries,
        None => return Ok(NodeListing::default()),
    };

    let mut listing = NodeListing::default();

    for (key, value) in entries {
        if !value.is_object() {
            continue;
        }

        let entry = ChildEntry::deserialize(value)
            .map_err(|e| format!("child '{}' is malformed: {}", key, e))?;

        match (&listing.label, entry.can) {
            (None, Some(label)) => {
                if !is_safe_segment(&label) {
                    return Err(format!("child '{}' has unusable label '{}'", key, label));
                }
                listing.label = Some(label);
            }
            (None, None) => {
                return Err(format!("child '{}' has no classification label", key));
            }
            (Some(first), Some(other)) if *first != other => {
                tracing::debug!(
                    "Child '{}' is labelled '{}' but its siblings are stored as '{}'",
                    key,
                    other,
                    first
                );
                listing.mislabelled.push(key.clone());
            }
            _ => {}
        }

        listing.children.push(child_ref(key, entry.url)?);
    }

    Ok(listing)
}

/// Builds a child reference, validating every segment that reaches the disk
fn child_ref(key: &str, fragment: Option<String>) -> Result<ChildRef, String> {
    let code = match &fragment {
        Some(fragment) => {
            if !fragment.split('/').all(is_safe_segment) {
                return Err(format!("child '{}' has unusable url '{}'", key, fragment));
            }
            fragment.rsplit('/').next().unwrap_or(fragment).to_string()
        }
        None => key.to_string(),
    };

    if !is_safe_segment(&code) {
        return Err(format!("child '{}' has unusable code '{}'", key, code));
    }

    Ok(ChildRef { code, fragment })
}
