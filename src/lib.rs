//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `navigator`: the tree navigation trait the clustering engine relies on.
//! - `snapshot`: immutable pre-order snapshot of a labelled Newick tree.
//! - `distances`: structural distance between two nodes + stride counting.
//! - `matrix`: sparse single-linkage distance matrix over clusters.
//! - `cluster`: the agglomerative clustering loop.
//! - `io`: reading Newick tree files and writing TSV results.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod cluster;
pub mod distances;
pub mod error;
pub mod io;
pub mod matrix;
pub mod navigator;
pub mod snapshot;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use cluster::{clusters, clusters_with, clusters_with_costs};
pub use distances::{distance, distance_with, num_strides, pairwise_distances, pairwise_matrix, DistanceCosts};
pub use error::{Error, Result};
pub use io::{read_newick_trees, write_clusters_tsv, write_matrix_tsv};
pub use matrix::{ClosestPair, Cluster, ClusterId, DistanceMatrix};
pub use navigator::{DocumentOrder, TreeNavigator};
pub use snapshot::TreeSnapshot;
