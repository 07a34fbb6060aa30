use num_traits::Float;

use crate::centers::within_cluster_stats;
use crate::{
    Assignment, CancelToken, Center, ClusterError, ClusterNode, Distance, DistanceMatrix,
    GeneVector,
};

/// A seeding slot. `gene_index` is `None` when no candidate gene was left to
/// fill the slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed<T> {
    pub gene_index: Option<usize>,
    /// The seed's maximin distance to the nodes chosen before it.
    pub distance: T,
}

/// Output of one K-means partitioning.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult<T> {
    /// Every requested slot, including absent ones.
    pub seeds: Vec<Seed<T>>,
    /// One node per present seed, numbered `1..=nodes.len()`.
    pub nodes: Vec<ClusterNode<T>>,
    /// One assignment per gene, in gene order.
    pub assignments: Vec<Assignment<T>>,
}

/// Partitions genes into at most K nodes: maximin seeding over the distance
/// matrix, assignment to the nearest seed, one centroid recompute and a single
/// reassignment to the nearest centroid.
///
/// There is no iteration to convergence. Reported distances are those of the
/// single reassignment.
pub struct KMeansPartitioner<'a, T, D: ?Sized> {
    genes: &'a [GeneVector<T>],
    distances: &'a DistanceMatrix<T>,
    dist: &'a D,
    center: Center,
}

impl<'a, T, D> KMeansPartitioner<'a, T, D>
where
    T: Float,
    D: Distance<T> + ?Sized,
{
    /// # Parameters
    /// * `genes` - the gene set to partition, validated beforehand.
    /// * `distances` - the distance matrix built over `genes` with `dist`.
    /// * `dist` - the distance used to compare genes against centroids.
    /// * `center` - how centroids are estimated.
    pub fn new(
        genes: &'a [GeneVector<T>],
        distances: &'a DistanceMatrix<T>,
        dist: &'a D,
        center: Center,
    ) -> Self {
        debug_assert_eq!(genes.len(), distances.len());
        Self { genes, distances, dist, center }
    }

    /// Runs seeding and assignment.
    ///
    /// # Parameters
    /// * `k` - the number of nodes to seed, already clamped by the caller. Zero
    ///   is rejected with [`ClusterError::InvalidNodeCount`].
    /// * `hint` - index of the gene to use as node 1, if any.
    /// * `cancel` - polled once per seeded node and once per assigned gene.
    pub fn partition(
        &self,
        k: usize,
        hint: Option<usize>,
        cancel: &CancelToken,
    ) -> Result<KMeansResult<T>, ClusterError> {
        let seeds = self.select_seeds(k, hint, cancel)?;
        let seed_genes: Vec<usize> = seeds.iter().filter_map(|s| s.gene_index).collect();
        tracing::debug!(requested = k, seeded = seed_genes.len(), "kmeans seeding done");

        let initial = self.assign_to_seeds(&seed_genes, cancel)?;
        let initial_labels: Vec<usize> = initial.iter().map(|(slot, _)| *slot).collect();
        let centroids = self
            .center
            .calc_centers(self.genes, &initial_labels, seed_genes.len());

        let assignments = self.assign_to_centroids(&seed_genes, &centroids, cancel)?;
        let nodes = self.make_nodes(&seeds, &seed_genes, centroids, &assignments);
        tracing::debug!(nodes = nodes.len(), genes = assignments.len(), "kmeans assignment done");

        Ok(KMeansResult { seeds, nodes, assignments })
    }

    /// Maximin seeding. Node 1 is `hint`, or else the gene with the least total
    /// distance to all others. Every further node is the non-node gene whose
    /// distance to its nearest node is largest. Ties go to the lowest index.
    pub fn select_seeds(
        &self,
        k: usize,
        hint: Option<usize>,
        cancel: &CancelToken,
    ) -> Result<Vec<Seed<T>>, ClusterError> {
        let n = self.genes.len();
        if k == 0 {
            return Err(ClusterError::InvalidNodeCount { requested: k, maximum: n.max(1) });
        }
        let mut seeds = Vec::with_capacity(k);
        if n == 0 {
            return Ok(seeds);
        }
        let first = match hint {
            Some(index) if index < n => index,
            _ => self.least_total_distance_gene(),
        };
        let mut is_node = vec![false; n];
        is_node[first] = true;
        seeds.push(Seed { gene_index: Some(first), distance: T::zero() });

        // Distance from each gene to its nearest node so far, refreshed against
        // each newly added node only.
        let mut nearest_node: Vec<T> = (0..n).map(|i| self.distances.get(i, first)).collect();

        for _ in 1..k {
            cancel.check()?;
            let mut best: Option<(usize, T)> = None;
            for candidate in (0..n).filter(|&i| !is_node[i]) {
                let d = nearest_node[candidate];
                if best.map_or(true, |(_, best_d)| d > best_d) {
                    best = Some((candidate, d));
                }
            }
            match best {
                Some((gene, distance)) => {
                    is_node[gene] = true;
                    seeds.push(Seed { gene_index: Some(gene), distance });
                    for (i, nearest) in nearest_node.iter_mut().enumerate() {
                        *nearest = (*nearest).min(self.distances.get(i, gene));
                    }
                }
                None => seeds.push(Seed { gene_index: None, distance: T::zero() }),
            }
        }
        Ok(seeds)
    }

    fn least_total_distance_gene(&self) -> usize {
        let mut best = 0;
        let mut best_total = T::infinity();
        for i in 0..self.genes.len() {
            let total = self.distances.row_sum(i);
            if total < best_total {
                best_total = total;
                best = i;
            }
        }
        best
    }

    /// Phase A: each gene goes to the seed nearest by raw pairwise distance.
    /// Seeds claim themselves at distance zero.
    fn assign_to_seeds(
        &self,
        seed_genes: &[usize],
        cancel: &CancelToken,
    ) -> Result<Vec<(usize, T)>, ClusterError> {
        (0..self.genes.len())
            .map(|gene| -> Result<(usize, T), ClusterError> {
                cancel.check()?;
                if let Some(slot) = seed_genes.iter().position(|&s| s == gene) {
                    return Ok((slot, T::zero()));
                }
                Ok(nearest(seed_genes.iter().map(|&s| self.distances.get(gene, s))))
            })
            .collect()
    }

    /// Phase C: every gene, seeds included, goes to the nearest centroid.
    fn assign_to_centroids(
        &self,
        seed_genes: &[usize],
        centroids: &[Vec<T>],
        cancel: &CancelToken,
    ) -> Result<Vec<Assignment<T>>, ClusterError> {
        self.genes
            .iter()
            .enumerate()
            .map(|(gene_index, gene)| -> Result<Assignment<T>, ClusterError> {
                cancel.check()?;
                let (slot, distance) = nearest(
                    centroids.iter().map(|c| self.dist.distance(&gene.values, c)),
                );
                Ok(Assignment {
                    gene_index,
                    gene_id: gene.id,
                    node_number: slot + 1,
                    distance,
                    is_representative: seed_genes.contains(&gene_index),
                })
            })
            .collect()
    }

    fn make_nodes(
        &self,
        seeds: &[Seed<T>],
        seed_genes: &[usize],
        centroids: Vec<Vec<T>>,
        assignments: &[Assignment<T>],
    ) -> Vec<ClusterNode<T>> {
        let n_nodes = seed_genes.len();
        let labels: Vec<usize> = assignments.iter().map(|a| a.node_number - 1).collect();
        let distances: Vec<T> = assignments.iter().map(|a| a.distance).collect();
        let stats = within_cluster_stats(&distances, &labels, n_nodes);
        let mut counts = vec![0_usize; n_nodes];
        labels.iter().for_each(|&slot| counts[slot] += 1);

        let nearest_node: Vec<T> = (0..n_nodes)
            .map(|s| {
                (0..n_nodes)
                    .filter(|&t| t != s)
                    .map(|t| self.dist.distance(&centroids[s], &centroids[t]))
                    .fold(None, |acc: Option<T>, d| Some(acc.map_or(d, |a| a.min(d))))
                    .unwrap_or_else(T::zero)
            })
            .collect();

        // Present seeds are packed at the front: once a slot is absent no
        // candidate remains for any later slot.
        centroids
            .into_iter()
            .enumerate()
            .map(|(slot, centroid)| {
                let gene_index = seed_genes[slot];
                ClusterNode {
                    node_number: slot + 1,
                    gene_index,
                    gene_id: self.genes[gene_index].id,
                    n_members: counts[slot],
                    centroid,
                    seed_distance: seeds[slot].distance,
                    nearest_node_distance: nearest_node[slot],
                    stats: stats[slot],
                }
            })
            .collect()
    }
}

/// Position and value of the smallest distance, first one on ties.
fn nearest<T: Float>(distances: impl Iterator<Item = T>) -> (usize, T) {
    let mut best = (0, T::infinity());
    for (slot, d) in distances.enumerate() {
        if d < best.1 {
            best = (slot, d);
        }
    }
    best
}
