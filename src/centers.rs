use num_traits::Float;

use crate::NodeStats;

/// Resolution of the per-dimension histogram used by [`Center::Median`].
pub const MEDIAN_HISTOGRAM_BINS: usize = 10_000;

/// Possible methodologies for calculating the center of clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Center {
    /// The elementwise mean of all member vectors.
    Mean,
    /// The elementwise median of all member vectors, estimated per dimension from
    /// a fixed resolution histogram spanning the members' observed range. A
    /// cluster with no members repeats the last median computed in the same pass.
    Median,
}

impl Center {
    /// Calculates one centroid per cluster.
    ///
    /// # Parameters
    /// * `data` - the member vectors, all of the same length.
    /// * `labels` - the cluster slot (`0..n_clusters`) of each row of `data`.
    /// * `n_clusters` - the number of clusters.
    ///
    /// # Returns
    /// * `n_clusters` centroids, in slot order.
    pub fn calc_centers<T, V>(&self, data: &[V], labels: &[usize], n_clusters: usize) -> Vec<Vec<T>>
    where
        T: Float,
        V: AsRef<[T]>,
    {
        assert_eq!(data.len(), labels.len());
        match self {
            Center::Mean => calc_means(data, labels, n_clusters),
            Center::Median => calc_medians(data, labels, n_clusters),
        }
    }
}

fn n_dims<T, V: AsRef<[T]>>(data: &[V]) -> usize {
    data.first().map_or(0, |row| row.as_ref().len())
}

fn calc_means<T: Float, V: AsRef<[T]>>(data: &[V], labels: &[usize], n_clusters: usize) -> Vec<Vec<T>> {
    let n_dims = n_dims::<T, V>(data);
    let mut sums = vec![vec![T::zero(); n_dims]; n_clusters];
    let mut counts = vec![0_usize; n_clusters];
    for (row, &label) in data.iter().zip(labels) {
        counts[label] += 1;
        for (sum, &value) in sums[label].iter_mut().zip(row.as_ref()) {
            *sum = *sum + value;
        }
    }
    // An empty cluster keeps a zero centroid rather than dividing by zero
    for (sum, &count) in sums.iter_mut().zip(&counts) {
        if count > 0 {
            let count = from_usize::<T>(count);
            sum.iter_mut().for_each(|element| *element = *element / count);
        }
    }
    sums
}

fn calc_medians<T: Float, V: AsRef<[T]>>(
    data: &[V],
    labels: &[usize],
    n_clusters: usize,
) -> Vec<Vec<T>> {
    let n_dims = n_dims::<T, V>(data);
    // Shared across clusters and dimensions: an empty cluster inherits the most
    // recent median computed before it.
    let mut last_median = T::zero();
    let mut centers = Vec::with_capacity(n_clusters);
    let mut column = Vec::with_capacity(data.len());
    for cluster in 0..n_clusters {
        let mut center = Vec::with_capacity(n_dims);
        for dim in 0..n_dims {
            column.clear();
            for (row, &label) in data.iter().zip(labels) {
                if label == cluster {
                    column.push(row.as_ref()[dim]);
                }
            }
            if !column.is_empty() {
                last_median = histogram_median(&column);
            }
            center.push(last_median);
        }
        centers.push(center);
    }
    centers
}

/// Median of `values` to within one histogram bin. For an even count the lower
/// middle value's bin is used.
pub(crate) fn histogram_median<T: Float>(values: &[T]) -> T {
    let (min, max) = values
        .iter()
        .fold((T::infinity(), T::neg_infinity()), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if max <= min {
        return min;
    }
    let bins = MEDIAN_HISTOGRAM_BINS;
    let width = (max - min) / from_usize(bins);
    let mut histogram = vec![0_usize; bins];
    for &value in values {
        let bin = ((value - min) / width).to_usize().unwrap_or(0).min(bins - 1);
        histogram[bin] += 1;
    }

    let half = (values.len() + 1) / 2;
    let mut cumulative = 0;
    for (bin, &count) in histogram.iter().enumerate() {
        cumulative += count;
        if cumulative >= half {
            return min + width * (from_usize::<T>(bin) + from_usize::<T>(1) / from_usize(2));
        }
    }
    max
}

/// Mean, standard deviation and coefficient of variation of member distances,
/// one entry per cluster slot.
pub(crate) fn within_cluster_stats<T: Float>(
    distances: &[T],
    labels: &[usize],
    n_clusters: usize,
) -> Vec<NodeStats<T>> {
    let mut sums = vec![T::zero(); n_clusters];
    let mut sq_sums = vec![T::zero(); n_clusters];
    let mut counts = vec![0_usize; n_clusters];
    for (&dist, &label) in distances.iter().zip(labels) {
        sums[label] = sums[label] + dist;
        sq_sums[label] = sq_sums[label] + dist * dist;
        counts[label] += 1;
    }

    (0..n_clusters)
        .map(|c| {
            if counts[c] == 0 {
                return NodeStats { mean: T::zero(), std_dev: T::zero(), coeff_of_variation: T::zero() };
            }
            let n = from_usize::<T>(counts[c]);
            let mean = sums[c] / n;
            // Population variance, clipped at zero against cancellation error
            let variance = (sq_sums[c] / n - mean * mean).max(T::zero());
            let std_dev = variance.sqrt();
            let coeff_of_variation = if mean > T::zero() { std_dev / mean } else { T::zero() };
            NodeStats { mean, std_dev, coeff_of_variation }
        })
        .collect()
}

pub(crate) fn from_usize<T: Float>(n: usize) -> T {
    T::from(n).unwrap_or_else(T::max_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn means() {
        let data: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![10.0, 10.0]];
        let centers = Center::Mean.calc_centers(&data, &[0, 0, 1], 2);
        assert_eq!(centers, vec![vec![2.0, 3.0], vec![10.0, 10.0]]);
    }

    #[test]
    fn mean_recompute_is_idempotent() {
        let data: Vec<Vec<f64>> = vec![vec![0.1, 0.7], vec![0.3, 0.2], vec![0.9, 0.4], vec![0.5, 0.5]];
        let labels = [1, 0, 1, 0];
        let first: Vec<Vec<f64>> = Center::Mean.calc_centers(&data, &labels, 2);
        let second: Vec<Vec<f64>> = Center::Mean.calc_centers(&data, &labels, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_mean_cluster_is_zero() {
        let data: Vec<Vec<f64>> = vec![vec![1.0, 2.0]];
        let centers = Center::Mean.calc_centers(&data, &[1], 2);
        assert_eq!(centers[0], vec![0.0, 0.0]);
    }

    #[test]
    fn histogram_median_resolution() {
        let m = histogram_median(&[5.0, 1.0, 3.0, 2.0, 4.0]);
        assert!(close(m, 3.0, 1e-3));
        // Even count resolves to the lower middle value
        let m = histogram_median(&[1.0, 2.0, 3.0, 4.0]);
        assert!(close(m, 2.0, 1e-3));
        assert_eq!(histogram_median(&[7.0, 7.0]), 7.0);
    }

    #[test]
    fn median_populated_cluster() {
        let data: Vec<Vec<f64>> = vec![vec![1.0, 10.0], vec![2.0, 30.0], vec![9.0, 20.0]];
        let centers = Center::Median.calc_centers(&data, &[0, 0, 0], 1);
        assert!(close(centers[0][0], 2.0, 1e-3));
        assert!(close(centers[0][1], 20.0, 1e-2));
    }

    #[test]
    fn median_empty_cluster_repeats_last_median() {
        // Cluster 1 has no members, so each of its dimensions takes the last
        // median computed, which is cluster 0's final dimension.
        let data: Vec<Vec<f64>> = vec![vec![1.0, 10.0], vec![3.0, 30.0], vec![2.0, 20.0]];
        let centers = Center::Median.calc_centers(&data, &[0, 0, 0], 2);
        let last = centers[0][1];
        assert!(close(last, 20.0, 1e-2));
        assert_eq!(centers[1], vec![last, last]);
    }

    #[test]
    fn median_leading_empty_cluster_is_zero() {
        let data: Vec<Vec<f64>> = vec![vec![4.0], vec![6.0]];
        let centers = Center::Median.calc_centers(&data, &[1, 1], 2);
        assert_eq!(centers[0], vec![0.0]);
        assert!(close(centers[1][0], 4.0, 1e-3));
    }

    #[test]
    fn stats() {
        let stats = within_cluster_stats(&[1.0, 3.0, 0.0], &[0, 0, 1], 3);
        assert!(close(stats[0].mean, 2.0, 1e-12));
        assert!(close(stats[0].std_dev, 1.0, 1e-12));
        assert!(close(stats[0].coeff_of_variation, 0.5, 1e-12));
        assert_eq!(stats[1].coeff_of_variation, 0.0);
        assert_eq!(stats[2].mean, 0.0);
    }
}
