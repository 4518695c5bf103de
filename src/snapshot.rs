//! Immutable, navigable snapshot of a labelled tree.
//!
//! # Overview
//! A `TreeSnapshot` flattens a `phylotree` tree into parallel arrays indexed
//! in document order (pre-order: a node comes before its descendants, and
//! earlier siblings come before later ones). Once built it never changes, so
//! it can be shared across threads and handed to any number of clustering
//! runs.
//!
//! # Labels
//! Each node label is `tag` or `tag.suffix`; the suffix only tells otherwise
//! identical nodes apart. The tag is what the distance metric compares.
//! A node tagged [`WHITESPACE_TAG`] stands for whitespace-only text and is
//! skippable when counting strides.
//!
//! ```text
//! ((p.1,ws,p.2)div,(span)div)body;
//!
//!            body            index  label
//!           /    \             0    body
//!        div      div          1    div
//!      /  |  \     |           2    p.1
//!    p.1  ws  p.2 span         3    ws
//!                              4    p.2
//!                              5    div
//!                              6    span
//! ```
//!
//! # Why pre-order indices
//! With pre-order numbering every subtree is a contiguous index range, so
//! containment is two comparisons and document order is integer order.

use phylotree::tree::Tree as PhyloTree;

use crate::error::{Error, Result};
use crate::navigator::{DocumentOrder, TreeNavigator};

/// Tag of nodes standing for whitespace-only text.
pub const WHITESPACE_TAG: &str = "ws";

/// An immutable snapshot of a labelled tree.
///
/// # Fields
/// - `labels`: raw node label, `None` for unnamed nodes
/// - `parents`: parent index, `None` for the root
/// - `next` / `prev`: sibling links within the parent's child list
/// - `subtree_end`: exclusive end of each node's pre-order subtree range
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    labels: Vec<Option<String>>,
    parents: Vec<Option<usize>>,
    next: Vec<Option<usize>>,
    prev: Vec<Option<usize>>,
    subtree_end: Vec<usize>,
}

impl TreeSnapshot {
    /// Parse a Newick string and snapshot the resulting tree.
    ///
    /// ```
    /// # use rust_python_tree_clusters::snapshot::TreeSnapshot;
    /// let snap = TreeSnapshot::from_newick("((p.1,p.2)div,(span)div)body;").unwrap();
    /// assert_eq!(snap.len(), 6);
    /// assert_eq!(snap.label(0), Some("body"));
    /// ```
    ///
    /// # Errors
    /// [`Error::Newick`] if the string is not valid Newick.
    pub fn from_newick(newick: &str) -> Result<Self> {
        let tree = PhyloTree::from_newick(newick).map_err(|e| Error::Newick(e.to_string()))?;
        Self::from_tree(&tree)
    }

    /// Snapshot a parsed tree.
    ///
    /// # Algorithm
    /// 1. Iterative DFS from the root, pushing children in reverse so they pop
    ///    in their original order
    /// 2. Each popped node gets the next pre-order index and is linked after
    ///    the last child already seen under the same parent
    /// 3. Subtree ends are folded bottom-up: children always carry larger
    ///    indices than their parent
    ///
    /// # Errors
    /// [`Error::Tree`] if the tree is empty or refers to missing nodes.
    pub fn from_tree(tree: &PhyloTree) -> Result<Self> {
        let root_id = tree.get_root().map_err(|e| Error::Tree(e.to_string()))?;

        let mut labels = Vec::new();
        let mut parents = Vec::new();
        let mut next: Vec<Option<usize>> = Vec::new();
        let mut prev = Vec::new();
        // Last child index seen so far under each node
        let mut last_child: Vec<Option<usize>> = Vec::new();

        let mut stack: Vec<(usize, Option<usize>)> = vec![(root_id, None)];
        while let Some((node_id, parent)) = stack.pop() {
            let node = tree.get(&node_id).map_err(|e| Error::Tree(e.to_string()))?;
            let idx = labels.len();

            labels.push(node.name.clone().filter(|name| !name.is_empty()));
            parents.push(parent);
            next.push(None);
            prev.push(None);
            last_child.push(None);

            if let Some(p) = parent {
                if let Some(left) = last_child[p] {
                    next[left] = Some(idx);
                    prev[idx] = Some(left);
                }
                last_child[p] = Some(idx);
            }

            for &child_id in node.children.iter().rev() {
                stack.push((child_id, Some(idx)));
            }
        }

        let mut subtree_end: Vec<usize> = (1..=labels.len()).collect();
        for idx in (1..labels.len()).rev() {
            if let Some(p) = parents[idx] {
                subtree_end[p] = subtree_end[p].max(subtree_end[idx]);
            }
        }

        Ok(TreeSnapshot {
            labels,
            parents,
            next,
            prev,
            subtree_end,
        })
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All node indices in document order.
    pub fn nodes(&self) -> std::ops::Range<usize> {
        0..self.len()
    }

    pub fn label(&self, node: usize) -> Option<&str> {
        self.labels.get(node)?.as_deref()
    }

    /// First node in document order carrying exactly this label.
    pub fn find(&self, label: &str) -> Option<usize> {
        self.labels
            .iter()
            .position(|l| l.as_deref() == Some(label))
    }

    /// Map labels to node indices, preserving their order.
    ///
    /// # Errors
    /// [`Error::UnknownLabel`] for the first label not present in the tree.
    pub fn resolve<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                self.find(label)
                    .ok_or_else(|| Error::UnknownLabel(label.to_string()))
            })
            .collect()
    }

    /// Leaves that are not skippable, in document order.
    pub fn content_leaves(&self) -> Vec<usize> {
        self.nodes()
            .filter(|&n| self.subtree_end[n] == n + 1 && !self.is_skippable(n))
            .collect()
    }
}

impl TreeNavigator for TreeSnapshot {
    type Node = usize;

    fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node).copied().flatten()
    }

    fn next_sibling(&self, node: usize) -> Option<usize> {
        self.next.get(node).copied().flatten()
    }

    fn previous_sibling(&self, node: usize) -> Option<usize> {
        self.prev.get(node).copied().flatten()
    }

    fn tag_of(&self, node: usize) -> Option<&str> {
        self.label(node)?.split('.').next()
    }

    fn is_skippable(&self, node: usize) -> bool {
        self.tag_of(node) == Some(WHITESPACE_TAG)
    }

    fn contains(&self, ancestor: usize, node: usize) -> bool {
        self.subtree_end
            .get(ancestor)
            .is_some_and(|&end| ancestor <= node && node < end)
    }

    fn order_compare(&self, a: usize, b: usize) -> Result<DocumentOrder> {
        if a >= self.len() || b >= self.len() {
            return Err(Error::disjoint(a, b));
        }
        let order = if a == b {
            DocumentOrder::Equal
        } else if self.contains(a, b) {
            DocumentOrder::Contains
        } else if self.contains(b, a) {
            DocumentOrder::ContainedBy
        } else if a < b {
            DocumentOrder::Before
        } else {
            DocumentOrder::After
        };
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "((p.1,ws,p.2)div,(span)div)body;";

    #[test]
    fn test_preorder_layout() {
        let snap = TreeSnapshot::from_newick(DOC).unwrap();
        let labels: Vec<_> = snap.nodes().map(|n| snap.label(n).unwrap()).collect();
        assert_eq!(labels, ["body", "div", "p.1", "ws", "p.2", "div", "span"]);

        assert_eq!(snap.parent(0), None);
        assert_eq!(snap.parent(2), Some(1));
        assert_eq!(snap.parent(5), Some(0));
        assert_eq!(snap.parent(6), Some(5));
    }

    #[test]
    fn test_sibling_links() {
        let snap = TreeSnapshot::from_newick(DOC).unwrap();

        assert_eq!(snap.next_sibling(2), Some(3));
        assert_eq!(snap.next_sibling(3), Some(4));
        assert_eq!(snap.next_sibling(4), None);
        assert_eq!(snap.previous_sibling(4), Some(3));
        assert_eq!(snap.previous_sibling(2), None);

        // The two divs are siblings even though p.* sit between them in index order
        assert_eq!(snap.next_sibling(1), Some(5));
        assert_eq!(snap.previous_sibling(5), Some(1));
        assert_eq!(snap.next_sibling(0), None);
    }

    #[test]
    fn test_tags_and_skippable() {
        let snap = TreeSnapshot::from_newick(DOC).unwrap();

        assert_eq!(snap.tag_of(2), Some("p"));
        assert_eq!(snap.tag_of(2), snap.tag_of(4));
        assert_eq!(snap.tag_of(6), Some("span"));
        assert!(snap.is_skippable(3));
        assert!(!snap.is_skippable(2));
    }

    #[test]
    fn test_unnamed_nodes_have_no_tag() {
        let snap = TreeSnapshot::from_newick("((a,b),c);").unwrap();
        assert_eq!(snap.label(0), None);
        assert_eq!(snap.tag_of(1), None);
        assert_eq!(snap.tag_of(2), Some("a"));
    }

    #[test]
    fn test_containment_ranges() {
        let snap = TreeSnapshot::from_newick(DOC).unwrap();

        assert!(snap.contains(0, 6));
        assert!(snap.contains(1, 4));
        assert!(snap.contains(4, 4));
        assert!(!snap.contains(1, 5));
        assert!(!snap.contains(2, 1));
        assert!(!snap.contains(42, 1));
    }

    #[test]
    fn test_order_compare() {
        let snap = TreeSnapshot::from_newick(DOC).unwrap();

        assert_eq!(snap.order_compare(2, 6).unwrap(), DocumentOrder::Before);
        assert_eq!(snap.order_compare(6, 2).unwrap(), DocumentOrder::After);
        assert_eq!(snap.order_compare(1, 3).unwrap(), DocumentOrder::Contains);
        assert_eq!(snap.order_compare(3, 1).unwrap(), DocumentOrder::ContainedBy);
        assert_eq!(snap.order_compare(5, 5).unwrap(), DocumentOrder::Equal);
        assert!(matches!(
            snap.order_compare(0, 99),
            Err(Error::DisjointNodes { .. })
        ));
    }

    #[test]
    fn test_find_and_resolve() {
        let snap = TreeSnapshot::from_newick(DOC).unwrap();

        assert_eq!(snap.find("div"), Some(1));
        assert_eq!(snap.resolve(&["span", "p.1"]).unwrap(), vec![6, 2]);
        match snap.resolve(&["p.1", "h1"]) {
            Err(Error::UnknownLabel(label)) => assert_eq!(label, "h1"),
            other => panic!("expected unknown label, got {other:?}"),
        }
    }

    #[test]
    fn test_content_leaves_skip_whitespace() {
        let snap = TreeSnapshot::from_newick(DOC).unwrap();
        assert_eq!(snap.content_leaves(), vec![2, 4, 6]);
    }

    #[test]
    fn test_invalid_newick() {
        // Branch length that is not a number
        assert!(TreeSnapshot::from_newick("((a:wide,b)c,d)e;").is_err());
    }
}
