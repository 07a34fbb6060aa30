//! Gene expression clustering in Rust. Generic over floating point numeric types.
//!
//! Each gene is a vector of expression values, one per sample. Genes are grouped by one of
//! several methods, all run through a [`ClusterLifecycleManager`] which guarantees that only
//! one clustering session is active at a time:
//!  1. K-means: nodes are seeded by a maximin heuristic (each new node is the gene farthest
//!     from every node chosen so far), every gene is assigned to its nearest seed, centroids
//!     are recomputed as the member mean or median, and every gene is reassigned once to its
//!     nearest centroid. There is exactly one refinement pass;
//!  2. Hierarchical: a [`TreeBuilder`] agglomerates the genes with next-minimum,
//!     arithmetic-average or centroid-average linkage and the tree's leaves are flattened
//!     into a display order; and
//!  3. Similar genes and similar gene counts: genes within a distance threshold of the current
//!     gene, or of every gene.
//!
//! Pairwise distances are computed once into a lower-triangular [`DistanceMatrix`] which can
//! optionally be retained between sessions over the same gene set. Long loops poll a
//! [`CancelToken`].
//!
//! # Examples
//! ```
//!use geneclust::{CancelToken, ClusterLifecycleManager, ClusterMethod, ClusterParams,
//!                ClusterRequest, GeneVector};
//!
//!let genes: Vec<GeneVector<f32>> = vec![
//!    GeneVector::new(0, vec![1.5, 2.2, 0.3]),
//!    GeneVector::new(1, vec![1.0, 1.1, 0.4]),
//!    GeneVector::new(2, vec![1.2, 1.4, 0.2]),
//!    GeneVector::new(3, vec![3.7, 4.0, 2.9]),
//!    GeneVector::new(4, vec![3.9, 3.9, 3.1]),
//!    GeneVector::new(5, vec![3.6, 4.1, 3.0]),
//!];
//!let mut manager = ClusterLifecycleManager::new(genes.len(), ClusterParams::default());
//!let request = ClusterRequest::new(ClusterMethod::KMeans).k(2);
//!assert!(manager.activate(&request, &genes, &CancelToken::new()));
//!
//!let session = manager.session().unwrap();
//!let nodes: Vec<usize> = session.assignments().iter().map(|a| a.node_number).collect();
//!assert_eq!(nodes[..3], [nodes[0]; 3]);
//!assert_eq!(nodes[3..], [nodes[3]; 3]);
//!assert_ne!(nodes[0], nodes[3]);
//! ```

pub use crate::cancel::CancelToken;
pub use crate::centers::{Center, MEDIAN_HISTOGRAM_BINS};
pub use crate::data_wrappers::{Assignment, ClusterNode, Dendrogram, NodeStats, TreeNode};
pub use crate::distance::{Distance, DistanceMetric, FnDistance};
pub use crate::distance_matrix::{addr_1d, DistanceMatrix};
pub use crate::error::ClusterError;
pub use crate::gene::{GeneId, GeneVector, GeneVectorSource};
pub use crate::hierarchical::{
    ordered_leaves, Agglomerative, HierarchicalClusterAdapter, HierarchicalResult, LeafOrder,
    Linkage, TreeBuilder, TreeInput,
};
pub use crate::hyper_parameters::{ClusterParamBuilder, ClusterParams};
pub use crate::kmeans::{KMeansPartitioner, KMeansResult, Seed};
pub use crate::manager::{
    Annotations, ClusterLifecycleManager, ClusterMethod, ClusterOutput, ClusterRequest,
    ClusteringSession, ManagerState, Normalization, Notifier, NullNotifier,
};
pub use crate::similar::{similar_gene_counts, similar_genes, GeneCount, SimilarGene};

mod cancel;
mod centers;
mod data_wrappers;
mod distance;
mod distance_matrix;
mod error;
mod gene;
mod hierarchical;
mod hyper_parameters;
mod kmeans;
mod manager;
mod similar;
mod validation;
