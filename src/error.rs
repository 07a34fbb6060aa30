use thiserror::Error;

use crate::{ClusterMethod, GeneId};

/// Possible errors that arise while validating or clustering a gene set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("too few genes to cluster: found {found}, need at least {minimum}")]
    TooFewGenes { found: usize, minimum: usize },

    #[error("too many genes to cluster: found {found}, limit is {maximum}")]
    TooManyGenes { found: usize, maximum: usize },

    #[error("requested node count {requested} is outside [1, {maximum}]")]
    InvalidNodeCount { requested: usize, maximum: usize },

    #[error("gene vectors have no sample dimensions")]
    NoSamples,

    #[error("gene vectors have mismatched dimensions: {0}")]
    WrongDimension(String),

    #[error("non finite expression value: {0}")]
    NonFiniteCoordinate(String),

    #[error("invalid mode combination: {0}")]
    InvalidModeCombination(String),

    #[error("unknown gene: {0}")]
    UnknownGene(String),

    #[error("gene id {0} appears more than once in the gene set")]
    DuplicateGene(GeneId),

    #[error("hierarchical tree construction failed: {0}")]
    TreeBuild(String),

    #[error("{0:?} clustering is not implemented")]
    NotImplemented(ClusterMethod),

    #[error("clustering was cancelled")]
    Cancelled,
}
