use crate::GeneId;

/// Dispersion of the members' distances to their node's centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStats<T> {
    pub mean: T,
    pub std_dev: T,
    /// `std_dev / mean`, zero when the mean distance is zero.
    pub coeff_of_variation: T,
}

/// One K-means node: a representative gene, its centroid and the statistics
/// of the genes finally assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNode<T> {
    /// Ordinal node number, `1..=K`.
    pub node_number: usize,
    /// Index of the representative gene within the clustered gene set.
    pub gene_index: usize,
    pub gene_id: GeneId,
    pub n_members: usize,
    pub centroid: Vec<T>,
    /// Maximin distance at which the node was seeded (zero for node 1).
    pub seed_distance: T,
    /// Distance from this centroid to the nearest other node's centroid.
    /// Zero when there is only one node.
    pub nearest_node_distance: T,
    pub stats: NodeStats<T>,
}

/// Final placement of one gene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment<T> {
    pub gene_index: usize,
    pub gene_id: GeneId,
    pub node_number: usize,
    /// Distance from the gene to its node's centroid.
    pub distance: T,
    /// Whether the gene was picked as a node representative during seeding.
    pub is_representative: bool,
}

/// An internal merge of the hierarchical tree. Children use dendrogram
/// numbering: ids below the leaf count are genes, the rest are earlier merges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode<T> {
    pub left_child: usize,
    pub right_child: usize,
    pub distance: T,
    pub size: usize,
}

/// Binary merge tree over `n_leaves` genes. Merge `i` has id `n_leaves + i`,
/// so the root is the last merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram<T> {
    pub(crate) n_leaves: usize,
    pub(crate) merges: Vec<TreeNode<T>>,
}

impl<T> Dendrogram<T> {
    pub fn new(n_leaves: usize, merges: Vec<TreeNode<T>>) -> Self {
        Self { n_leaves, merges }
    }

    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    pub fn merges(&self) -> &[TreeNode<T>] {
        &self.merges
    }

    pub fn is_leaf(&self, id: usize) -> bool {
        id < self.n_leaves
    }

    pub fn root(&self) -> Option<usize> {
        if self.merges.is_empty() {
            None
        } else {
            Some(self.n_leaves + self.merges.len() - 1)
        }
    }

    pub fn merge(&self, id: usize) -> Option<&TreeNode<T>> {
        id.checked_sub(self.n_leaves).and_then(|i| self.merges.get(i))
    }
}
