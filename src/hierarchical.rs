use num_traits::Float;

use crate::centers::from_usize;
use crate::validation::validate_mode_combination;
use crate::{
    CancelToken, ClusterError, Dendrogram, Distance, DistanceMatrix, GeneId, GeneVector,
    Normalization, TreeNode,
};

/// How the distance between two clusters is derived when agglomerating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Distance between the closest pair of members (single linkage).
    NextMinimum,
    /// Mean of all member-to-member distances (UPGMA).
    ArithmeticAverage,
    /// Distance between the clusters' mean vectors.
    CentroidAverage,
}

/// Order in which the leaves of the finished tree are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOrder {
    LeftToRight,
    RightToLeft,
}

/// Everything a tree builder is handed by the adapter.
pub struct TreeInput<'a, T> {
    pub genes: &'a [GeneVector<T>],
    pub distances: &'a DistanceMatrix<T>,
    /// The metric the distances were built with, for linkages that compare
    /// derived vectors.
    pub dist: &'a dyn Distance<T>,
    pub linkage: Linkage,
}

/// Builds a binary merge tree over the input genes.
///
/// Implementations report insufficient data or allocation failure as an error;
/// anything they built before failing is dropped by the caller.
pub trait TreeBuilder<T> {
    fn build_tree(
        &self,
        input: &TreeInput<'_, T>,
        cancel: &CancelToken,
    ) -> Result<Dendrogram<T>, ClusterError>;
}

/// Naive agglomerative clustering. Repeatedly merges the closest pair of
/// clusters, lowest slots first on ties, updating cluster distances according
/// to the requested linkage. Cubic in the number of genes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Agglomerative;

impl<T: Float> TreeBuilder<T> for Agglomerative {
    fn build_tree(
        &self,
        input: &TreeInput<'_, T>,
        cancel: &CancelToken,
    ) -> Result<Dendrogram<T>, ClusterError> {
        let n = input.genes.len();
        if n < 2 {
            return Err(ClusterError::TooFewGenes { found: n, minimum: 2 });
        }

        // Working distances between slots; a merged cluster takes over the
        // lower of its two slots.
        let mut slot_dist = DistanceMatrix::try_zeros(n)?;
        for i in 0..n {
            for j in 0..i {
                slot_dist.set(i, j, input.distances.get(i, j));
            }
        }
        let mut active = vec![true; n];
        let mut node_id: Vec<usize> = (0..n).collect();
        let mut size = vec![1_usize; n];
        let mut sums: Vec<Vec<T>> = match input.linkage {
            Linkage::CentroidAverage => input.genes.iter().map(|g| g.values.clone()).collect(),
            _ => Vec::new(),
        };

        let mut merges = Vec::with_capacity(n - 1);
        for step in 0..n - 1 {
            cancel.check()?;
            let (a, b, distance) = closest_pair(&slot_dist, &active)
                .ok_or_else(|| ClusterError::TreeBuild(String::from("no clusters left to merge")))?;

            merges.push(TreeNode {
                left_child: node_id[a],
                right_child: node_id[b],
                distance,
                size: size[a] + size[b],
            });
            active[b] = false;
            node_id[a] = n + step;

            let (size_a, size_b) = (from_usize::<T>(size[a]), from_usize::<T>(size[b]));
            if input.linkage == Linkage::CentroidAverage {
                let moved = std::mem::take(&mut sums[b]);
                for (sum, value) in sums[a].iter_mut().zip(moved) {
                    *sum = *sum + value;
                }
            }
            size[a] += size[b];

            for k in (0..n).filter(|&k| active[k] && k != a) {
                let merged = match input.linkage {
                    Linkage::NextMinimum => slot_dist.get(k, a).min(slot_dist.get(k, b)),
                    Linkage::ArithmeticAverage => {
                        (size_a * slot_dist.get(k, a) + size_b * slot_dist.get(k, b))
                            / (size_a + size_b)
                    }
                    Linkage::CentroidAverage => {
                        let centroid_a = mean_of(&sums[a], size[a]);
                        let centroid_k = mean_of(&sums[k], size[k]);
                        input.dist.distance(&centroid_a, &centroid_k)
                    }
                };
                slot_dist.set(k, a, merged);
            }
        }
        Ok(Dendrogram::new(n, merges))
    }
}

fn closest_pair<T: Float>(dist: &DistanceMatrix<T>, active: &[bool]) -> Option<(usize, usize, T)> {
    let mut best: Option<(usize, usize, T)> = None;
    for i in (0..active.len()).filter(|&i| active[i]) {
        for j in (i + 1..active.len()).filter(|&j| active[j]) {
            let d = dist.get(i, j);
            if best.map_or(true, |(_, _, best_d)| d < best_d) {
                best = Some((i, j, d));
            }
        }
    }
    best
}

fn mean_of<T: Float>(sum: &[T], size: usize) -> Vec<T> {
    let size = from_usize::<T>(size);
    sum.iter().map(|&s| s / size).collect()
}

/// Output of a hierarchical run.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalResult<T> {
    pub dendrogram: Dendrogram<T>,
    /// Gene indices in leaf traversal order.
    pub leaf_order: Vec<usize>,
    /// Gene ids in leaf traversal order.
    pub leaf_ids: Vec<GeneId>,
}

/// Prepares the gene set for a [`TreeBuilder`], runs it, and flattens the tree
/// into an ordered leaf sequence for reporting.
pub struct HierarchicalClusterAdapter<'a, T> {
    genes: &'a [GeneVector<T>],
    distances: &'a DistanceMatrix<T>,
    dist: &'a dyn Distance<T>,
    linkage: Linkage,
    leaf_order: LeafOrder,
    all_genes: bool,
    normalization: Normalization,
}

impl<'a, T: Float> HierarchicalClusterAdapter<'a, T> {
    pub fn new(
        genes: &'a [GeneVector<T>],
        distances: &'a DistanceMatrix<T>,
        dist: &'a dyn Distance<T>,
        linkage: Linkage,
        leaf_order: LeafOrder,
    ) -> Self {
        Self {
            genes,
            distances,
            dist,
            linkage,
            leaf_order,
            all_genes: false,
            normalization: Normalization::None,
        }
    }

    /// Declares whether the whole gene universe is being clustered and under
    /// which normalization, so invalid combinations can be refused.
    pub fn with_mode(mut self, all_genes: bool, normalization: Normalization) -> Self {
        self.all_genes = all_genes;
        self.normalization = normalization;
        self
    }

    /// Checks the inputs without building anything.
    pub fn validate(&self) -> Result<(), ClusterError> {
        validate_mode_combination(self.all_genes, self.normalization)?;
        let found = self.genes.len();
        if found < 2 {
            return Err(ClusterError::TooFewGenes { found, minimum: 2 });
        }
        if self.genes.iter().any(|g| g.n_samples() == 0) {
            return Err(ClusterError::NoSamples);
        }
        Ok(())
    }

    /// Validates, builds the tree with `builder` and orders its leaves.
    pub fn run(
        &self,
        builder: &dyn TreeBuilder<T>,
        cancel: &CancelToken,
    ) -> Result<HierarchicalResult<T>, ClusterError> {
        self.validate()?;

        let ids: Vec<GeneId> = self.genes.iter().map(|g| g.id).collect();
        let names: Vec<&str> = self.genes.iter().map(|g| g.name.as_str()).collect();
        tracing::trace!(?ids, ?names, "hierarchical input");
        tracing::debug!(genes = ids.len(), linkage = ?self.linkage, "building hierarchical tree");

        let input = TreeInput {
            genes: self.genes,
            distances: self.distances,
            dist: self.dist,
            linkage: self.linkage,
        };
        let dendrogram = builder.build_tree(&input, cancel)?;
        check_tree_shape(&dendrogram, self.genes.len())?;

        let leaf_order = ordered_leaves(&dendrogram, self.leaf_order, cancel)?;
        let leaf_ids = leaf_order.iter().map(|&i| ids[i]).collect();
        Ok(HierarchicalResult { dendrogram, leaf_order, leaf_ids })
    }
}

/// A tree from an outside builder must be a single binary tree over exactly
/// the input leaves, with every child merged before its parent.
fn check_tree_shape<T>(tree: &Dendrogram<T>, n_leaves: usize) -> Result<(), ClusterError> {
    if tree.n_leaves() != n_leaves || tree.merges().len() + 1 != n_leaves {
        return Err(ClusterError::TreeBuild(format!(
            "expected {} merges over {n_leaves} leaves, got {} over {}",
            n_leaves.saturating_sub(1),
            tree.merges().len(),
            tree.n_leaves()
        )));
    }
    let mut used = vec![false; n_leaves + tree.merges().len()];
    for (i, merge) in tree.merges().iter().enumerate() {
        let id = n_leaves + i;
        for child in [merge.left_child, merge.right_child] {
            if child >= id || used[child] {
                return Err(ClusterError::TreeBuild(format!(
                    "merge {id} has invalid child {child}"
                )));
            }
            used[child] = true;
        }
    }
    Ok(())
}

/// Depth-first walk from the root collecting leaves. The token is polled once
/// per internal node visited.
pub fn ordered_leaves<T>(
    tree: &Dendrogram<T>,
    order: LeafOrder,
    cancel: &CancelToken,
) -> Result<Vec<usize>, ClusterError> {
    let mut leaves = Vec::with_capacity(tree.n_leaves());
    let Some(root) = tree.root() else {
        return Ok((0..tree.n_leaves()).collect());
    };
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if tree.is_leaf(id) {
            leaves.push(id);
            continue;
        }
        cancel.check()?;
        let merge = tree
            .merge(id)
            .ok_or_else(|| ClusterError::TreeBuild(format!("unknown tree node {id}")))?;
        // The child pushed last is visited first
        match order {
            LeafOrder::LeftToRight => stack.extend([merge.right_child, merge.left_child]),
            LeafOrder::RightToLeft => stack.extend([merge.left_child, merge.right_child]),
        }
    }
    Ok(leaves)
}
