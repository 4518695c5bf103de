//! Read-only navigation over the tree whose nodes are being clustered.
//!
//! The clustering engine never owns or mutates nodes. Everything it needs to
//! know about the tree goes through [`TreeNavigator`]: parent and sibling
//! links, the tag of a node, whether a node is ignorable (e.g. whitespace-only
//! text), reflexive containment and a document-order comparison.
//!
//! `contains` and `order_compare` have default implementations built on the
//! link primitives alone. They walk the tree on every call, so a concrete tree
//! that knows its own layout (see [`crate::snapshot::TreeSnapshot`]) should
//! override them.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};

/// Position of one node relative to another, in document order.
///
/// Read as "`a` is `order` `b`": `Contains` means `a` is an ancestor of `b`,
/// `ContainedBy` means `b` is an ancestor of `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOrder {
    Before,
    After,
    Contains,
    ContainedBy,
    Equal,
}

impl DocumentOrder {
    /// True when `a` comes first: it precedes `b` or is one of its ancestors.
    #[inline]
    pub fn a_is_left(self) -> bool {
        matches!(self, DocumentOrder::Before | DocumentOrder::Contains)
    }

    /// True when one node is an ancestor of the other.
    #[inline]
    pub fn is_nested(self) -> bool {
        matches!(self, DocumentOrder::Contains | DocumentOrder::ContainedBy)
    }
}

/// Capabilities the clustering engine requires from a tree.
///
/// The tree must not change while a clustering run is in progress: ancestor
/// chains and sibling links are consulted lazily and repeatedly.
pub trait TreeNavigator {
    /// Cheap handle identifying one node. Equality is node identity.
    type Node: Copy + Eq + Hash + Debug;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    fn previous_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// Tag identity of a node; `None` for untagged nodes such as text.
    fn tag_of(&self, node: Self::Node) -> Option<&str>;

    /// Whether the node is ignorable when counting strides.
    fn is_skippable(&self, node: Self::Node) -> bool;

    /// Reflexive "is ancestor of" test.
    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Compare `a` against `b` in document order.
    ///
    /// # Errors
    /// [`Error::DisjointNodes`] if the two nodes have no common ancestor.
    fn order_compare(&self, a: Self::Node, b: Self::Node) -> Result<DocumentOrder> {
        if a == b {
            return Ok(DocumentOrder::Equal);
        }
        if self.contains(a, b) {
            return Ok(DocumentOrder::Contains);
        }
        if self.contains(b, a) {
            return Ok(DocumentOrder::ContainedBy);
        }

        // Children of the common ancestor on the path to each node.
        let mut a_top = a;
        let common = loop {
            let parent = self.parent(a_top).ok_or_else(|| Error::disjoint(a, b))?;
            if self.contains(parent, b) {
                break parent;
            }
            a_top = parent;
        };
        let mut b_top = b;
        loop {
            let parent = self.parent(b_top).ok_or_else(|| Error::disjoint(a, b))?;
            if parent == common {
                break;
            }
            b_top = parent;
        }

        let mut sibling = self.next_sibling(a_top);
        while let Some(node) = sibling {
            if node == b_top {
                return Ok(DocumentOrder::Before);
            }
            sibling = self.next_sibling(node);
        }
        Ok(DocumentOrder::After)
    }
}

impl<T: TreeNavigator + ?Sized> TreeNavigator for &T {
    type Node = T::Node;

    fn parent(&self, node: Self::Node) -> Option<Self::Node> {
        (**self).parent(node)
    }

    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node> {
        (**self).next_sibling(node)
    }

    fn previous_sibling(&self, node: Self::Node) -> Option<Self::Node> {
        (**self).previous_sibling(node)
    }

    fn tag_of(&self, node: Self::Node) -> Option<&str> {
        (**self).tag_of(node)
    }

    fn is_skippable(&self, node: Self::Node) -> bool {
        (**self).is_skippable(node)
    }

    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool {
        (**self).contains(ancestor, node)
    }

    fn order_compare(&self, a: Self::Node, b: Self::Node) -> Result<DocumentOrder> {
        (**self).order_compare(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::TreeSnapshot;
    use itertools::Itertools;

    /// Forwards only the link primitives, so the default `contains` and
    /// `order_compare` get exercised.
    struct LinksOnly<'a>(&'a TreeSnapshot);

    impl TreeNavigator for LinksOnly<'_> {
        type Node = usize;

        fn parent(&self, node: usize) -> Option<usize> {
            self.0.parent(node)
        }
        fn next_sibling(&self, node: usize) -> Option<usize> {
            self.0.next_sibling(node)
        }
        fn previous_sibling(&self, node: usize) -> Option<usize> {
            self.0.previous_sibling(node)
        }
        fn tag_of(&self, node: usize) -> Option<&str> {
            self.0.tag_of(node)
        }
        fn is_skippable(&self, node: usize) -> bool {
            self.0.is_skippable(node)
        }
    }

    ///        body
    ///       /    \
    ///    div.a   div.b
    ///    /  \      |
    ///  p.1  p.2   span
    const DOC: &str = "((p.1,p.2)div.a,(span)div.b)body;";

    #[test]
    fn test_default_order_matches_snapshot() {
        let snap = TreeSnapshot::from_newick(DOC).unwrap();
        let links = LinksOnly(&snap);

        for (a, b) in (0..snap.len()).cartesian_product(0..snap.len()) {
            assert_eq!(
                links.order_compare(a, b).unwrap(),
                snap.order_compare(a, b).unwrap(),
                "order of {a} vs {b}"
            );
            assert_eq!(links.contains(a, b), snap.contains(a, b));
        }
    }

    #[test]
    fn test_order_cases() {
        let snap = TreeSnapshot::from_newick(DOC).unwrap();
        let links = LinksOnly(&snap);
        let id = |label: &str| snap.find(label).unwrap();

        assert_eq!(links.order_compare(id("p.1"), id("p.2")).unwrap(), DocumentOrder::Before);
        assert_eq!(links.order_compare(id("span"), id("p.2")).unwrap(), DocumentOrder::After);
        assert_eq!(links.order_compare(id("div.a"), id("p.2")).unwrap(), DocumentOrder::Contains);
        assert_eq!(links.order_compare(id("p.1"), id("body")).unwrap(), DocumentOrder::ContainedBy);
        assert_eq!(links.order_compare(id("span"), id("span")).unwrap(), DocumentOrder::Equal);
    }

    #[test]
    fn test_order_flags() {
        assert!(DocumentOrder::Before.a_is_left());
        assert!(DocumentOrder::Contains.a_is_left());
        assert!(!DocumentOrder::After.a_is_left());
        assert!(!DocumentOrder::ContainedBy.a_is_left());
        assert!(DocumentOrder::Contains.is_nested());
        assert!(DocumentOrder::ContainedBy.is_nested());
        assert!(!DocumentOrder::Before.is_nested());
    }
}
