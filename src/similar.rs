use std::cmp::Ordering;

use num_traits::Float;

use crate::{CancelToken, ClusterError, DistanceMatrix, GeneId, GeneVector};

/// A gene found within the similarity threshold of the current gene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarGene<T> {
    pub gene_index: usize,
    pub gene_id: GeneId,
    pub distance: T,
}

/// How many other genes lie within the similarity threshold of a gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneCount {
    pub gene_index: usize,
    pub gene_id: GeneId,
    pub count: usize,
}

/// Lists the genes within `threshold` of `current`, nearest first. Genes at
/// equal distance keep their input order.
pub fn similar_genes<T: Float>(
    genes: &[GeneVector<T>],
    distances: &DistanceMatrix<T>,
    current: usize,
    threshold: T,
    cancel: &CancelToken,
) -> Result<Vec<SimilarGene<T>>, ClusterError> {
    let mut hits = Vec::new();
    for (gene_index, gene) in genes.iter().enumerate() {
        cancel.check()?;
        if gene_index == current {
            continue;
        }
        let distance = distances.get(current, gene_index);
        if distance <= threshold {
            hits.push(SimilarGene { gene_index, gene_id: gene.id, distance });
        }
    }
    hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    Ok(hits)
}

/// Counts, for every gene, the other genes within `threshold` of it. Returned
/// most connected first; equal counts keep their input order.
pub fn similar_gene_counts<T: Float>(
    genes: &[GeneVector<T>],
    distances: &DistanceMatrix<T>,
    threshold: T,
    cancel: &CancelToken,
) -> Result<Vec<GeneCount>, ClusterError> {
    let n = genes.len();
    let mut counts = Vec::with_capacity(n);
    for (gene_index, gene) in genes.iter().enumerate() {
        cancel.check()?;
        let count = (0..n)
            .filter(|&j| j != gene_index && distances.get(gene_index, j) <= threshold)
            .count();
        counts.push(GeneCount { gene_index, gene_id: gene.id, count });
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(counts)
}
