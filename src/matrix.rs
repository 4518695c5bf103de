//! Sparse, incrementally merged matrix of distances between clusters.
//!
//! # Layout
//! Clusters live in an arena and are referred to by [`ClusterId`] handles,
//! allocated in increasing order. The table is lower-triangular: each live
//! cluster keys a row holding its distance to every live cluster created
//! before it, so every unordered pair is stored exactly once.
//!
//! ```text
//! after new([A, B, C, D, E])       after merge(B, A)         after merge(E, C)
//!   A: {}                            C: {}                     D: {}
//!   B: {A: 1}                        D: {C: 4}                 AB: {D: 4}
//!   C: {A: 4, B: 4}                  E: {C: 2, D: 4}           CE: {D: 4, AB: 4}
//!   D: {A: 4, B: 4, C: 4}            AB: {C: 4, D: 4, E: 4}
//!   E: {A: 4, B: 4, C: 2, D: 4}
//! ```
//!
//! Handles only grow, so ascending key order in the `BTreeMap`s is insertion
//! order. `closest` scans rows and entries in that order, which fixes the
//! tie-break: the first minimal entry wins.
//!
//! # Single linkage
//! A merged cluster's distance to any other cluster is the smaller of its two
//! halves' cached distances. The metric is only ever called while building
//! the initial singletons.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::Hash;

use log::trace;

use crate::error::{Error, Result};

/// Handle to a cluster in a [`DistanceMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(usize);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cluster is one original node or the merge of two earlier clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster<N> {
    Leaf(N),
    Merged(ClusterId, ClusterId),
}

/// Result of [`DistanceMatrix::closest`]: `a` keys the row, `b` the entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPair {
    pub a: ClusterId,
    pub b: ClusterId,
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub struct DistanceMatrix<N> {
    /// Every cluster ever created, live or retired
    arena: Vec<Cluster<N>>,
    /// Live cluster → (earlier live cluster → distance)
    rows: BTreeMap<ClusterId, BTreeMap<ClusterId, f64>>,
    num_clusters: usize,
}

impl<N: Copy + Eq + Hash + fmt::Debug> DistanceMatrix<N> {
    /// Wrap each node in a singleton cluster and compute the distance from
    /// each new singleton to every earlier one: `n(n-1)/2` metric calls.
    ///
    /// # Errors
    /// [`Error::DuplicateNode`] if a node occurs twice; otherwise any error
    /// returned by `distance`.
    pub fn new<F>(nodes: &[N], mut distance: F) -> Result<Self>
    where
        F: FnMut(N, N) -> Result<f64>,
    {
        let mut seen = HashSet::with_capacity(nodes.len());
        if let Some(dup) = nodes.iter().find(|&&n| !seen.insert(n)) {
            return Err(Error::DuplicateNode(format!("{dup:?}")));
        }

        let mut matrix = DistanceMatrix {
            arena: Vec::with_capacity(2 * nodes.len()),
            rows: BTreeMap::new(),
            num_clusters: 0,
        };

        // Singleton i gets handle i
        for (i, &node) in nodes.iter().enumerate() {
            let mut row = BTreeMap::new();
            for (j, &earlier) in nodes[..i].iter().enumerate() {
                row.insert(ClusterId(j), distance(node, earlier)?);
            }
            let id = matrix.push(Cluster::Leaf(node));
            trace!("singleton {id} for {node:?}: {} distances", row.len());
            matrix.rows.insert(id, row);
            matrix.num_clusters += 1;
        }

        Ok(matrix)
    }

    fn push(&mut self, cluster: Cluster<N>) -> ClusterId {
        let id = ClusterId(self.arena.len());
        self.arena.push(cluster);
        id
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Number of stored pairwise entries; always `n(n-1)/2` for `n` live
    /// clusters.
    pub fn num_entries(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Live cluster handles in insertion order.
    pub fn live_clusters(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.rows.keys().copied()
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster<N>> {
        self.arena.get(id.0)
    }

    /// Cached distance between two live clusters, looked up in both
    /// directions.
    pub fn distance_between(&self, a: ClusterId, b: ClusterId) -> Option<f64> {
        self.rows
            .get(&a)
            .and_then(|row| row.get(&b))
            .or_else(|| self.rows.get(&b).and_then(|row| row.get(&a)))
            .copied()
    }

    /// The pair of live clusters with the smallest stored distance.
    ///
    /// # Errors
    /// [`Error::InsufficientClusters`] with fewer than two live clusters.
    pub fn closest(&self) -> Result<ClosestPair> {
        if self.num_clusters < 2 {
            return Err(Error::InsufficientClusters {
                found: self.num_clusters,
            });
        }

        let mut best: Option<ClosestPair> = None;
        for (&a, row) in &self.rows {
            for (&b, &distance) in row {
                if best.is_none_or(|pair| distance < pair.distance) {
                    best = Some(ClosestPair { a, b, distance });
                }
            }
        }
        best.ok_or(Error::InsufficientClusters {
            found: self.num_clusters,
        })
    }

    /// Replace clusters `a` and `b` with one cluster holding both.
    ///
    /// The new row takes, for every other live cluster, the smaller of the
    /// two cached distances. Both operands disappear as rows and as entries.
    ///
    /// # Errors
    /// [`Error::SelfMerge`] if `a == b`, [`Error::UnknownCluster`] if either
    /// is not live.
    pub fn merge(&mut self, a: ClusterId, b: ClusterId) -> Result<ClusterId> {
        if a == b {
            return Err(Error::SelfMerge(a));
        }
        for id in [a, b] {
            if !self.rows.contains_key(&id) {
                return Err(Error::UnknownCluster(id));
            }
        }

        let mut new_row = BTreeMap::new();
        for &other in self.rows.keys() {
            if other == a || other == b {
                continue;
            }
            let to_a = self.distance_between(a, other).ok_or(Error::UnknownCluster(other))?;
            let to_b = self.distance_between(b, other).ok_or(Error::UnknownCluster(other))?;
            new_row.insert(other, to_a.min(to_b));
        }

        self.rows.remove(&a);
        self.rows.remove(&b);
        for row in self.rows.values_mut() {
            row.remove(&a);
            row.remove(&b);
        }

        let id = self.push(Cluster::Merged(a, b));
        self.rows.insert(id, new_row);
        self.num_clusters -= 1;
        Ok(id)
    }

    /// Original nodes of a cluster, left half before right half.
    pub fn flatten(&self, id: ClusterId) -> Vec<N> {
        let mut nodes = Vec::new();
        let mut stack = vec![id];
        while let Some(top) = stack.pop() {
            match self.arena.get(top.0) {
                Some(&Cluster::Leaf(node)) => nodes.push(node),
                Some(&Cluster::Merged(left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => {}
            }
        }
        nodes
    }

    /// Every live cluster, flattened, in insertion order.
    pub fn clusters(&self) -> Vec<Vec<N>> {
        self.live_clusters().map(|id| self.flatten(id)).collect()
    }
}
