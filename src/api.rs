//! Python binding layer for structural distances and clustering.
//!
//! Trees are passed in as Newick strings and nodes are addressed by label;
//! see [`crate::snapshot`] for the label conventions.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::cluster::clusters_with_costs;
use crate::distances::{distance_with, pairwise_matrix, DistanceCosts};
use crate::error::Error;
use crate::snapshot::TreeSnapshot;

fn to_py_err(e: Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn costs(same_tag: f64, different_tag: f64, different_depth: f64, stride: f64) -> DistanceCosts {
    DistanceCosts::default()
        .with_same_tag(same_tag)
        .with_different_tag(different_tag)
        .with_different_depth(different_depth)
        .with_stride(stride)
}

/// Structural distance between two labelled nodes of one tree.
///
/// Args:
///     newick: The tree, in Newick format
///     a: Label of the first node
///     b: Label of the second node
///     same_tag, different_tag, different_depth, stride: Per-level costs
///
/// Returns:
///     The distance, 0.0 when `a` and `b` are the same node
///
/// Raises:
///     ValueError: If the tree does not parse, a label is unknown or a cost
///     is negative or not finite
#[pyfunction]
#[pyo3(signature = (newick, a, b, same_tag=1.0, different_tag=2.0, different_depth=2.0, stride=1.0))]
fn distance(
    newick: &str,
    a: &str,
    b: &str,
    same_tag: f64,
    different_tag: f64,
    different_depth: f64,
    stride: f64,
) -> PyResult<f64> {
    let snap = TreeSnapshot::from_newick(newick).map_err(to_py_err)?;
    let nodes = snap.resolve(&[a, b]).map_err(to_py_err)?;
    let costs = costs(same_tag, different_tag, different_depth, stride);
    distance_with(&snap, nodes[0], nodes[1], &costs).map_err(to_py_err)
}

/// Pairwise structural distances between labelled nodes.
///
/// Args:
///     newick: The tree, in Newick format
///     labels: Node labels; every non-whitespace leaf when omitted
///     same_tag, different_tag, different_depth, stride: Per-level costs
///
/// Returns:
///     A tuple of (labels, distance_matrix) where distance_matrix is a
///     symmetric 2D list with zeros on the diagonal
///
/// Raises:
///     ValueError: If the tree does not parse, a label is unknown or a cost
///     is negative or not finite
#[pyfunction(name = "pairwise_distances")]
#[pyo3(signature = (newick, labels=None, same_tag=1.0, different_tag=2.0, different_depth=2.0, stride=1.0))]
fn pairwise(
    newick: &str,
    labels: Option<Vec<String>>,
    same_tag: f64,
    different_tag: f64,
    different_depth: f64,
    stride: f64,
) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    let snap = TreeSnapshot::from_newick(newick).map_err(to_py_err)?;
    let (labels, nodes) = select(&snap, labels).map_err(to_py_err)?;
    let costs = costs(same_tag, different_tag, different_depth, stride);

    let matrix = pairwise_matrix(&snap, &nodes, &costs).map_err(to_py_err)?;
    Ok((labels, matrix))
}

/// Group labelled nodes into structural clusters.
///
/// Args:
///     newick: The tree, in Newick format
///     too_far: Exclusive merge threshold (float("inf") merges everything)
///     labels: Node labels; every non-whitespace leaf when omitted
///     same_tag, different_tag, different_depth, stride: Per-level costs
///
/// Returns:
///     A list of clusters, each a list of labels in merge order
///
/// Raises:
///     ValueError: If the tree does not parse, a label is unknown or repeated,
///     too_far is NaN or a cost is negative or not finite
#[pyfunction]
#[pyo3(signature = (newick, too_far, labels=None, same_tag=1.0, different_tag=2.0, different_depth=2.0, stride=1.0))]
fn clusters(
    newick: &str,
    too_far: f64,
    labels: Option<Vec<String>>,
    same_tag: f64,
    different_tag: f64,
    different_depth: f64,
    stride: f64,
) -> PyResult<Vec<Vec<String>>> {
    let snap = TreeSnapshot::from_newick(newick).map_err(to_py_err)?;
    let (_, nodes) = select(&snap, labels).map_err(to_py_err)?;
    let costs = costs(same_tag, different_tag, different_depth, stride);

    let groups = clusters_with_costs(&snap, &nodes, too_far, &costs).map_err(to_py_err)?;
    Ok(groups
        .iter()
        .map(|g| g.iter().map(|&n| label_of(&snap, n)).collect())
        .collect())
}

fn label_of(snap: &TreeSnapshot, node: usize) -> String {
    snap.label(node).map_or_else(|| format!("#{node}"), str::to_string)
}

/// Resolve requested labels, or fall back to every content leaf.
fn select(
    snap: &TreeSnapshot,
    labels: Option<Vec<String>>,
) -> Result<(Vec<String>, Vec<usize>), Error> {
    match labels {
        Some(labels) => {
            let nodes = snap.resolve(&labels)?;
            Ok((labels, nodes))
        }
        None => {
            let nodes = snap.content_leaves();
            let labels = nodes.iter().map(|&n| label_of(snap, n)).collect();
            Ok((labels, nodes))
        }
    }
}

/// Python module definition
#[pymodule]
fn rust_python_tree_clusters(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(distance, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise, m)?)?;
    m.add_function(wrap_pyfunction!(clusters, m)?)?;
    Ok(())
}
