//! Agglomerative single-linkage clustering of tree nodes.
//!
//! Start with every node in its own cluster and keep merging the closest
//! pair until only one cluster is left or the closest pair is `too_far`
//! apart. Single linkage lets clusters grow by chaining along adjacent
//! nodes, which is how one content region scattered across a document
//! (paragraphs interleaved with links and markup) gets reassembled.
//!
//! ```
//! # use rust_python_tree_clusters::snapshot::TreeSnapshot;
//! # use rust_python_tree_clusters::cluster::clusters;
//! let snap = TreeSnapshot::from_newick("((p.1,p.2,p.3)div,(span)div)body;").unwrap();
//! let nodes = snap.resolve(&["p.1", "p.2", "p.3", "span"]).unwrap();
//!
//! let groups = clusters(&snap, &nodes, 2.0).unwrap();
//! assert_eq!(groups.len(), 2);
//! ```

use std::fmt::Debug;
use std::hash::Hash;

use log::debug;

use crate::distances::{distance_with, DistanceCosts};
use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;
use crate::navigator::TreeNavigator;

/// Cluster `nodes` with the default distance costs.
///
/// `too_far` is exclusive: merging stops as soon as the closest pair is at
/// least that far apart. `f64::INFINITY` merges everything into one cluster.
///
/// # Errors
/// [`Error::InvalidArgument`] for a NaN `too_far`,
/// [`Error::DuplicateNode`] for repeated nodes,
/// [`Error::DisjointNodes`] for nodes outside one tree.
pub fn clusters<T: TreeNavigator>(
    nav: &T,
    nodes: &[T::Node],
    too_far: f64,
) -> Result<Vec<Vec<T::Node>>> {
    clusters_with_costs(nav, nodes, too_far, &DistanceCosts::default())
}

/// Cluster `nodes` with tuned distance costs.
///
/// Invalid costs are rejected up front, whatever the number of nodes.
pub fn clusters_with_costs<T: TreeNavigator>(
    nav: &T,
    nodes: &[T::Node],
    too_far: f64,
    costs: &DistanceCosts,
) -> Result<Vec<Vec<T::Node>>> {
    costs.validate()?;
    clusters_with(nodes, too_far, |a, b| distance_with(nav, a, b, costs))
}

/// Cluster `nodes` under any caller-supplied metric.
///
/// The metric is called once per unordered pair, always with the later node
/// of the input first.
pub fn clusters_with<N, F>(nodes: &[N], too_far: f64, distance: F) -> Result<Vec<Vec<N>>>
where
    N: Copy + Eq + Hash + Debug,
    F: FnMut(N, N) -> Result<f64>,
{
    // NaN never compares >= too_far, so it would merge everything
    if too_far.is_nan() {
        return Err(Error::InvalidArgument("too_far must not be NaN".into()));
    }

    let mut matrix = DistanceMatrix::new(nodes, distance)?;

    while matrix.num_clusters() > 1 {
        let closest = matrix.closest()?;
        if closest.distance >= too_far {
            debug!(
                "stopping with {} clusters: closest pair {} / {} at {} >= {too_far}",
                matrix.num_clusters(),
                closest.a,
                closest.b,
                closest.distance
            );
            break;
        }
        let merged = matrix.merge(closest.a, closest.b)?;
        debug!(
            "merged {} + {} -> {merged} at distance {}",
            closest.a, closest.b, closest.distance
        );
    }

    Ok(matrix.clusters())
}
