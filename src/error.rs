//! Error type shared by the metric, the distance matrix and the I/O layer.

use thiserror::Error;

use crate::matrix::ClusterId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("at least 2 clusters are needed to find the closest pair, found {found}")]
    InsufficientClusters { found: usize },

    #[error("nodes {a} and {b} share no common ancestor")]
    DisjointNodes { a: String, b: String },

    #[error("node {0} appears more than once in the input")]
    DuplicateNode(String),

    #[error("cluster {0} is not live in the distance matrix")]
    UnknownCluster(ClusterId),

    #[error("cluster {0} cannot be merged with itself")]
    SelfMerge(ClusterId),

    #[error("no node labelled '{0}'")]
    UnknownLabel(String),

    #[error("failed to parse newick: {0}")]
    Newick(String),

    #[error("malformed tree: {0}")]
    Tree(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn disjoint<N: std::fmt::Debug>(a: N, b: N) -> Self {
        Error::DisjointNodes {
            a: format!("{a:?}"),
            b: format!("{b:?}"),
        }
    }
}
