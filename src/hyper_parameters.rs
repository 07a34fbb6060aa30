use crate::{Center, DistanceMetric, LeafOrder, Linkage};

// Defaults for parameters
const MAX_NODES_DEFAULT: usize = 100;
const MAX_GENES_DEFAULT: usize = 50_000;
const CENTER_DEFAULT: Center = Center::Mean;
const DISTANCE_METRIC_DEFAULT: DistanceMetric = DistanceMetric::Euclidean;
const LINKAGE_DEFAULT: Linkage = Linkage::ArithmeticAverage;
const LEAF_ORDER_DEFAULT: LeafOrder = LeafOrder::RightToLeft;
const RETAIN_DISTANCE_MATRIX_DEFAULT: bool = false;
const SIMILARITY_THRESHOLD_DEFAULT: f64 = 0.5;

// Valid minimums/left bounds of parameters
const MAX_NODES_MINIMUM: usize = 1;
const MAX_GENES_MINIMUM: usize = 2;

/// Session-independent settings of the clustering engine. Use
/// `ClusterParams::default()` unless something needs tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub(crate) max_nodes: usize,
    pub(crate) max_genes: usize,
    pub(crate) center: Center,
    pub(crate) dist_metric: DistanceMetric,
    pub(crate) linkage: Linkage,
    pub(crate) leaf_order: LeafOrder,
    pub(crate) retain_distance_matrix: bool,
    pub(crate) similarity_threshold: f64,
}

/// Builder object to set custom parameters.
#[derive(Debug, Clone, Default)]
pub struct ClusterParamBuilder {
    max_nodes: Option<usize>,
    max_genes: Option<usize>,
    center: Option<Center>,
    dist_metric: Option<DistanceMetric>,
    linkage: Option<Linkage>,
    leaf_order: Option<LeafOrder>,
    retain_distance_matrix: Option<bool>,
    similarity_threshold: Option<f64>,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClusterParams {
    /// Enters the builder pattern, allowing custom parameters to be set using
    /// various setter methods.
    pub fn builder() -> ClusterParamBuilder {
        ClusterParamBuilder::default()
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    pub fn max_genes(&self) -> usize {
        self.max_genes
    }

    pub fn center(&self) -> Center {
        self.center
    }

    pub fn dist_metric(&self) -> DistanceMetric {
        self.dist_metric
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn leaf_order(&self) -> LeafOrder {
        self.leaf_order
    }

    pub fn retain_distance_matrix(&self) -> bool {
        self.retain_distance_matrix
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }
}

impl ClusterParamBuilder {
    /// Sets the largest number of K-means nodes that may be requested. Larger
    /// requests are clamped to this value. Defaults to 100.
    pub fn max_nodes(mut self, max_nodes: usize) -> ClusterParamBuilder {
        self.max_nodes = Some(Self::validate_input_left_bound(
            max_nodes,
            MAX_NODES_MINIMUM,
            "max_nodes",
        ));
        self
    }

    /// Sets the largest gene set a session will accept. Larger sets are
    /// rejected. Defaults to 50,000.
    pub fn max_genes(mut self, max_genes: usize) -> ClusterParamBuilder {
        self.max_genes = Some(Self::validate_input_left_bound(
            max_genes,
            MAX_GENES_MINIMUM,
            "max_genes",
        ));
        self
    }

    /// Sets how K-means centroids are estimated. Defaults to the mean.
    pub fn center(mut self, center: Center) -> ClusterParamBuilder {
        self.center = Some(center);
        self
    }

    /// Sets the distance metric used to fill the distance matrix and to compare
    /// genes to centroids. Defaults to Euclidean.
    pub fn dist_metric(mut self, dist_metric: DistanceMetric) -> ClusterParamBuilder {
        self.dist_metric = Some(dist_metric);
        self
    }

    /// Sets the linkage passed to the hierarchical tree builder. Defaults to
    /// arithmetic average.
    pub fn linkage(mut self, linkage: Linkage) -> ClusterParamBuilder {
        self.linkage = Some(linkage);
        self
    }

    /// Sets the order in which hierarchical leaves are reported. Defaults to
    /// right to left.
    pub fn leaf_order(mut self, leaf_order: LeafOrder) -> ClusterParamBuilder {
        self.leaf_order = Some(leaf_order);
        self
    }

    /// Keeps the distance matrix between sessions over the same gene set,
    /// trading memory for speed on repeated re-clustering. Defaults to false.
    pub fn retain_distance_matrix(mut self, retain: bool) -> ClusterParamBuilder {
        self.retain_distance_matrix = Some(retain);
        self
    }

    /// Sets the distance at or below which two genes count as similar in the
    /// similar-genes methods. Negative or non-finite values fall back to the
    /// default of 0.5.
    pub fn similarity_threshold(mut self, threshold: f64) -> ClusterParamBuilder {
        if threshold.is_finite() && threshold >= 0.0 {
            self.similarity_threshold = Some(threshold);
        } else {
            tracing::warn!(
                threshold,
                "similarity_threshold must be a finite non-negative distance. \
                Set to {SIMILARITY_THRESHOLD_DEFAULT}."
            );
        }
        self
    }

    /// Finishes the building of the parameter configuration.
    pub fn build(self) -> ClusterParams {
        ClusterParams {
            max_nodes: self.max_nodes.unwrap_or(MAX_NODES_DEFAULT),
            max_genes: self.max_genes.unwrap_or(MAX_GENES_DEFAULT),
            center: self.center.unwrap_or(CENTER_DEFAULT),
            dist_metric: self.dist_metric.unwrap_or(DISTANCE_METRIC_DEFAULT),
            linkage: self.linkage.unwrap_or(LINKAGE_DEFAULT),
            leaf_order: self.leaf_order.unwrap_or(LEAF_ORDER_DEFAULT),
            retain_distance_matrix: self
                .retain_distance_matrix
                .unwrap_or(RETAIN_DISTANCE_MATRIX_DEFAULT),
            similarity_threshold: self
                .similarity_threshold
                .unwrap_or(SIMILARITY_THRESHOLD_DEFAULT),
        }
    }

    fn validate_input_left_bound(input_param: usize, left_bound: usize, param: &str) -> usize {
        if input_param < left_bound {
            tracing::warn!("{param} ({input_param}) cannot be lower than {left_bound}. Set to {left_bound}.");
            left_bound
        } else {
            input_param
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = ClusterParams::default();
        assert_eq!(params.max_nodes(), MAX_NODES_DEFAULT);
        assert_eq!(params.max_genes(), MAX_GENES_DEFAULT);
        assert_eq!(params.center(), Center::Mean);
        assert!(!params.retain_distance_matrix());
    }

    #[test]
    fn left_bounds_are_clamped() {
        let params = ClusterParams::builder().max_nodes(0).max_genes(1).build();
        assert_eq!(params.max_nodes(), 1);
        assert_eq!(params.max_genes(), 2);
    }

    #[test]
    fn bad_threshold_keeps_default() {
        let params = ClusterParams::builder().similarity_threshold(-1.0).build();
        assert_eq!(params.similarity_threshold(), SIMILARITY_THRESHOLD_DEFAULT);
    }
}
