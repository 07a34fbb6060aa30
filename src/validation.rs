use num_traits::Float;

use crate::{ClusterError, ClusterParams, GeneVector, Normalization};

const MIN_GENES: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataValidator<'a, T> {
    genes: &'a [GeneVector<T>],
    params: &'a ClusterParams,
}

impl<'a, T: Float> DataValidator<'a, T> {
    pub(crate) fn new(genes: &'a [GeneVector<T>], params: &'a ClusterParams) -> Self {
        Self { genes, params }
    }

    pub(crate) fn validate_gene_count(&self) -> Result<(), ClusterError> {
        let found = self.genes.len();
        if found < MIN_GENES {
            return Err(ClusterError::TooFewGenes { found, minimum: MIN_GENES });
        }
        if found > self.params.max_genes {
            return Err(ClusterError::TooManyGenes { found, maximum: self.params.max_genes });
        }
        Ok(())
    }

    pub(crate) fn validate_input_data(&self) -> Result<(), ClusterError> {
        self.validate_gene_count()?;
        let dims_0th = self.genes[0].n_samples();
        if dims_0th == 0 {
            return Err(ClusterError::NoSamples);
        }
        for (n, gene) in self.genes.iter().enumerate() {
            if gene.values.iter().any(|v| !v.is_finite()) {
                return Err(ClusterError::NonFiniteCoordinate(format!(
                    "{n}th gene ({}) contains non-finite value(s)",
                    gene.name
                )));
            }
            let dims_nth = gene.n_samples();
            if dims_nth != dims_0th {
                return Err(ClusterError::WrongDimension(format!(
                    "0th gene has {dims_0th} samples, but {n}th has {dims_nth}"
                )));
            }
        }
        Ok(())
    }

    /// Clamps `requested` to the configured maximum. Zero nodes is an error.
    pub(crate) fn validate_node_count(&self, requested: usize) -> Result<usize, ClusterError> {
        let maximum = self.params.max_nodes;
        if requested == 0 {
            return Err(ClusterError::InvalidNodeCount { requested, maximum });
        }
        if requested > maximum {
            tracing::warn!("node count ({requested}) cannot be higher than {maximum}. Set to {maximum}.");
            return Ok(maximum);
        }
        Ok(requested)
    }
}

/// Clustering every gene is undefined while each sample is normalized on its own.
pub(crate) fn validate_mode_combination(
    all_genes: bool,
    normalization: Normalization,
) -> Result<(), ClusterError> {
    if all_genes && normalization == Normalization::PerSample {
        return Err(ClusterError::InvalidModeCombination(String::from(
            "cannot cluster all genes while per-sample normalization is active",
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genes(rows: Vec<Vec<f64>>) -> Vec<GeneVector<f64>> {
        rows.into_iter()
            .enumerate()
            .map(|(id, values)| GeneVector::new(id, values))
            .collect()
    }

    #[test]
    fn too_few_genes() {
        let data = genes(vec![vec![1.0, 2.0]]);
        let params = ClusterParams::default();
        let result = DataValidator::new(&data, &params).validate_input_data();
        assert!(matches!(result, Err(ClusterError::TooFewGenes { found: 1, minimum: 2 })));
    }

    #[test]
    fn too_many_genes() {
        let data = genes(vec![vec![1.0]; 3]);
        let params = ClusterParams::builder().max_genes(2).build();
        let result = DataValidator::new(&data, &params).validate_gene_count();
        assert!(matches!(result, Err(ClusterError::TooManyGenes { found: 3, maximum: 2 })));
    }

    #[test]
    fn no_samples() {
        let data = genes(vec![vec![], vec![]]);
        let params = ClusterParams::default();
        let result = DataValidator::new(&data, &params).validate_input_data();
        assert!(matches!(result, Err(ClusterError::NoSamples)));
    }

    #[test]
    fn non_finite_and_mismatched() {
        let params = ClusterParams::default();
        let data = genes(vec![vec![1.0, f64::NAN], vec![1.0, 2.0]]);
        let result = DataValidator::new(&data, &params).validate_input_data();
        assert!(matches!(result, Err(ClusterError::NonFiniteCoordinate(..))));

        let data = genes(vec![vec![1.0, 2.0], vec![1.0]]);
        let result = DataValidator::new(&data, &params).validate_input_data();
        assert!(matches!(result, Err(ClusterError::WrongDimension(..))));
    }

    #[test]
    fn node_count_is_clamped() {
        let data = genes(vec![vec![1.0], vec![2.0]]);
        let params = ClusterParams::builder().max_nodes(4).build();
        let validator = DataValidator::new(&data, &params);
        assert_eq!(validator.validate_node_count(9), Ok(4));
        assert_eq!(validator.validate_node_count(3), Ok(3));
        assert!(matches!(
            validator.validate_node_count(0),
            Err(ClusterError::InvalidNodeCount { requested: 0, maximum: 4 })
        ));
    }

    #[test]
    fn all_genes_with_per_sample_normalization() {
        assert!(validate_mode_combination(true, Normalization::PerSample).is_err());
        assert!(validate_mode_combination(false, Normalization::PerSample).is_ok());
        assert!(validate_mode_combination(true, Normalization::Global).is_ok());
    }
}
