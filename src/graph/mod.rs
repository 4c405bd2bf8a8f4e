//! Commit graph visibility engine
//!
//! Decides which code-intelligence uploads can answer queries at which
//! commits, without an upload having to exist for every commit.
//!
//! # Architecture
//!
//! - **types**: Input/output contract (CommitGraph, CommitMeta, ReachabilityMap)
//! - **interner**: Commit hash interning to dense ids
//! - **indexed**: Validated adjacency lists in both directions
//! - **reverse**: Parent map to child map inversion
//! - **toposort**: Descendants-first ordering with cycle detection
//! - **reachability**: Multi-source nearest-upload propagation
//! - **visibility**: Per-commit table plus the set visible at the tip
//!
//! Everything here is pure and single-threaded: no I/O and no state kept
//! between calls. Each call recomputes from scratch.

mod error;
mod indexed;
mod interner;
mod reachability;
mod reverse;
mod toposort;
mod types;
mod visibility;

pub use error::{GraphError, Result};
pub use indexed::IndexedGraph;
pub use interner::{CommitId, CommitInterner};
pub use reachability::calculate_reachability;
pub use reverse::reverse_graph;
pub use toposort::topological_sort;
pub use types::{attach_uploads, CommitGraph, CommitMeta, ReachabilityMap, UploadsByCommit};
pub use visibility::{calculate_visible_uploads, NearestUploadRow, VisibleUploads};
