//! Structural distance between two nodes of one tree.
//!
//! The metric walks down from the nodes' common ancestor to each node in
//! lock-step and charges for every level:
//!
//! 1. **Tag agreement**: a level where both paths pass through nodes with the
//!    same tag costs `same_tag`, otherwise `different_tag`.
//! 2. **Depth mismatch**: a level reached by only one path costs
//!    `different_depth`.
//! 3. **Strides**: unless one node contains the other, each level also costs
//!    `stride` per non-skippable sibling lying between the two paths.
//!
//! Same-tag siblings with nothing between them are therefore as close as two
//! distinct nodes can be, while nodes under unrelated containers pay for every
//! level of divergent structure.
//!
//! # Example
//! ```text
//!              body
//!            /      \
//!         div        div
//!       /  |  \       |
//!     p.1 p.2 p.3   span
//!
//! d(p.1, p.2)  = 1                      same tag
//! d(p.1, p.3)  = 1 + 1                  same tag, p.2 in between
//! d(p.3, span) = (1 + 0) + (2 + 0) = 3  div/div, then p/span
//! ```

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::navigator::TreeNavigator;

/// Per-level costs charged by [`distance_with`].
///
/// The defaults are the tuned values; change them only when deliberately
/// retuning, since thresholds passed to clustering depend on them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceCosts {
    /// One path ends above the other.
    pub different_depth: f64,
    /// Both paths pass through nodes with different tags.
    pub different_tag: f64,
    /// Both paths pass through nodes with the same tag.
    pub same_tag: f64,
    /// Each non-skippable sibling separating the two paths.
    pub stride: f64,
}

impl Default for DistanceCosts {
    fn default() -> Self {
        Self {
            different_depth: 2.0,
            different_tag: 2.0,
            same_tag: 1.0,
            stride: 1.0,
        }
    }
}

impl DistanceCosts {
    pub fn with_different_depth(mut self, cost: f64) -> Self {
        self.different_depth = cost;
        self
    }

    pub fn with_different_tag(mut self, cost: f64) -> Self {
        self.different_tag = cost;
        self
    }

    pub fn with_same_tag(mut self, cost: f64) -> Self {
        self.same_tag = cost;
        self
    }

    pub fn with_stride(mut self, cost: f64) -> Self {
        self.stride = cost;
        self
    }

    /// Check that every cost is finite and non-negative.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] naming the first offending cost.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("different_depth", self.different_depth),
            ("different_tag", self.different_tag),
            ("same_tag", self.same_tag),
            ("stride", self.stride),
        ];
        match named.iter().find(|(_, cost)| !cost.is_finite() || *cost < 0.0) {
            Some((name, cost)) => Err(Error::InvalidArgument(format!(
                "{name} cost must be finite and non-negative, got {cost}"
            ))),
            None => Ok(()),
        }
    }
}

/// Structural distance between two nodes using the default costs.
///
/// ```
/// # use rust_python_tree_clusters::snapshot::TreeSnapshot;
/// # use rust_python_tree_clusters::distances::distance;
/// let snap = TreeSnapshot::from_newick("((p.1,p.2,p.3)div,(span)div)body;").unwrap();
/// let id = |label| snap.find(label).unwrap();
/// assert_eq!(distance(&snap, id("p.1"), id("p.2")).unwrap(), 1.0);
/// assert_eq!(distance(&snap, id("p.3"), id("span")).unwrap(), 3.0);
/// ```
///
/// # Errors
/// [`Error::DisjointNodes`] if the nodes do not belong to one tree.
pub fn distance<T: TreeNavigator>(nav: &T, a: T::Node, b: T::Node) -> Result<f64> {
    distance_with(nav, a, b, &DistanceCosts::default())
}

/// Structural distance between two nodes.
///
/// # Algorithm
/// 1. Ascend from `a` to the first ancestor containing `b`; the nodes passed
///    on the way form `a`'s chain
/// 2. Ascend from `b` to that same ancestor, collecting `b`'s chain
/// 3. The chain of whichever node comes first in document order (or contains
///    the other) is the left one
/// 4. Pop both chains together from the ancestor end and charge each level
///
/// Chains stop strictly below the common ancestor. A node and its parent are
/// thus one `different_depth` apart, with no stride term.
///
/// # Errors
/// [`Error::InvalidArgument`] if `costs` fails [`DistanceCosts::validate`],
/// [`Error::DisjointNodes`] if the nodes do not belong to one tree.
pub fn distance_with<T: TreeNavigator>(
    nav: &T,
    a: T::Node,
    b: T::Node,
    costs: &DistanceCosts,
) -> Result<f64> {
    costs.validate()?;
    if a == b {
        return Ok(0.0);
    }

    let mut a_chain = Vec::new();
    let mut ancestor = a;
    while !nav.contains(ancestor, b) {
        a_chain.push(ancestor);
        ancestor = nav.parent(ancestor).ok_or_else(|| Error::disjoint(a, b))?;
    }

    let mut b_chain = Vec::new();
    let mut node = b;
    while node != ancestor {
        b_chain.push(node);
        node = nav.parent(node).ok_or_else(|| Error::disjoint(a, b))?;
    }

    let order = nav.order_compare(a, b)?;
    let might_stride = !order.is_nested();
    let (mut left, mut right) = if order.a_is_left() {
        (a_chain, b_chain)
    } else {
        (b_chain, a_chain)
    };

    let mut cost = 0.0;
    while !left.is_empty() || !right.is_empty() {
        let l = left.pop();
        let r = right.pop();
        cost += match (l, r) {
            (Some(l), Some(r)) if nav.tag_of(l) == nav.tag_of(r) => costs.same_tag,
            (Some(_), Some(_)) => costs.different_tag,
            _ => costs.different_depth,
        };
        if might_stride {
            cost += strides_between(nav, l, r) as f64 * costs.stride;
        }
    }
    Ok(cost)
}

/// Count the non-skippable nodes interposed between `left` and `right`.
///
/// Walks forward from `left` until reaching `right`. If `right` is never
/// reached, the two are not siblings of one another and every non-skippable
/// node before `right` in its own sibling list is counted as well, which can
/// include nodes that are not really "between" them.
///
/// ```
/// # use rust_python_tree_clusters::snapshot::TreeSnapshot;
/// # use rust_python_tree_clusters::distances::num_strides;
/// let snap = TreeSnapshot::from_newick("(a,ws,b,c,d)root;").unwrap();
/// let id = |label| snap.find(label).unwrap();
/// assert_eq!(num_strides(&snap, id("a"), id("c")), 1);
/// ```
pub fn num_strides<T: TreeNavigator>(nav: &T, left: T::Node, right: T::Node) -> usize {
    strides_between(nav, Some(left), Some(right))
}

/// [`num_strides`] for a chain level where one side may be exhausted. A
/// missing `left` counts everything before `right`; a missing `right` counts
/// everything after `left`.
fn strides_between<T: TreeNavigator>(
    nav: &T,
    left: Option<T::Node>,
    right: Option<T::Node>,
) -> usize {
    let mut num = 0;

    let mut sibling = left;
    while let Some(node) = sibling.filter(|&n| Some(n) != right) {
        sibling = nav.next_sibling(node);
        if let Some(next) = sibling.filter(|&n| Some(n) != right) {
            if !nav.is_skippable(next) {
                num += 1;
            }
        }
    }

    if sibling != right {
        let mut sibling = right.and_then(|r| nav.previous_sibling(r));
        while let Some(node) = sibling {
            if !nav.is_skippable(node) {
                num += 1;
            }
            sibling = nav.previous_sibling(node);
        }
    }

    num
}

/// Distances between every pair of `nodes`, as `(i, j, distance)` with
/// `i < j` indexing into `nodes`.
///
/// Pairs are evaluated in parallel; the tree is only read.
///
/// # Errors
/// [`Error::InvalidArgument`] for invalid `costs`, even with fewer than two
/// nodes; otherwise the first error of [`distance_with`].
pub fn pairwise_distances<T>(
    nav: &T,
    nodes: &[T::Node],
    costs: &DistanceCosts,
) -> Result<Vec<(usize, usize, f64)>>
where
    T: TreeNavigator + Sync,
    T::Node: Send + Sync,
{
    costs.validate()?;
    let n = nodes.len();
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| distance_with(nav, nodes[i], nodes[j], costs).map(|d| (i, j, d)))
        .collect()
}

/// Symmetric `n × n` matrix of [`pairwise_distances`], zero on the diagonal.
pub fn pairwise_matrix<T>(
    nav: &T,
    nodes: &[T::Node],
    costs: &DistanceCosts,
) -> Result<Vec<Vec<f64>>>
where
    T: TreeNavigator + Sync,
    T::Node: Send + Sync,
{
    let n = nodes.len();
    let mut matrix = vec![vec![0.0f64; n]; n];
    for (i, j, dist) in pairwise_distances(nav, nodes, costs)? {
        matrix[i][j] = dist;
        matrix[j][i] = dist;
    }
    Ok(matrix)
}
