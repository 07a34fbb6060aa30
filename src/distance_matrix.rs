use num_traits::Float;

use crate::{CancelToken, ClusterError, Distance};

/// Maps an unordered pair of indices onto the flat lower-triangular cache.
///
/// The pair is canonicalised so the larger index selects the row, which makes
/// `addr_1d(x, y) == addr_1d(y, x)` for every pair.
pub fn addr_1d(x: usize, y: usize) -> usize {
    let (row, col) = if x >= y { (x, y) } else { (y, x) };
    col + row * (row + 1) / 2
}

/// Symmetric pairwise distance cache stored as a lower triangle (diagonal
/// included), `1 + n*(n+1)/2` entries long.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix<T> {
    cache: Vec<T>,
    n: usize,
}

impl<T: Float> DistanceMatrix<T> {
    /// Computes every pairwise distance once. The token is polled once per row.
    ///
    /// # Parameters
    /// * `vectors` - the expression vectors, all of the same length. At least two are required.
    /// * `dist` - the pairwise distance function.
    /// * `cancel` - cooperative cancellation token.
    pub fn build<V, D>(vectors: &[V], dist: &D, cancel: &CancelToken) -> Result<Self, ClusterError>
    where
        V: AsRef<[T]>,
        D: Distance<T> + ?Sized,
    {
        let n = vectors.len();
        if n < 2 {
            return Err(ClusterError::TooFewGenes { found: n, minimum: 2 });
        }
        let mut cache = vec![T::zero(); Self::cache_len(n)];
        for x in 0..n {
            cancel.check()?;
            for y in 0..x {
                cache[addr_1d(x, y)] = dist.distance(vectors[x].as_ref(), vectors[y].as_ref());
            }
        }
        Ok(Self { cache, n })
    }

    /// An all-zero matrix for `n` items, filled in later with [`set`](Self::set).
    /// Reports allocation failure instead of aborting.
    pub(crate) fn try_zeros(n: usize) -> Result<Self, ClusterError> {
        let len = Self::cache_len(n);
        let mut cache = Vec::new();
        cache.try_reserve_exact(len).map_err(|e| {
            ClusterError::TreeBuild(format!("cannot allocate {len} distances: {e}"))
        })?;
        cache.resize(len, T::zero());
        Ok(Self { cache, n })
    }

    fn cache_len(n: usize) -> usize {
        1 + n * (n + 1) / 2
    }

    pub fn get(&self, i: usize, j: usize) -> T {
        self.cache[addr_1d(i, j)]
    }

    pub(crate) fn set(&mut self, i: usize, j: usize, value: T) {
        self.cache[addr_1d(i, j)] = value;
    }

    /// Number of items the matrix was built over.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Sum of the distances from `i` to every other item.
    pub fn row_sum(&self, i: usize) -> T {
        (0..self.n)
            .filter(|&j| j != i)
            .fold(T::zero(), |acc, j| acc + self.get(i, j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DistanceMetric;

    #[test]
    fn addr_is_symmetric() {
        for x in 0..50 {
            for y in 0..50 {
                assert_eq!(addr_1d(x, y), addr_1d(y, x));
            }
        }
    }

    #[test]
    fn addr_is_dense_over_lower_triangle() {
        let n = 6;
        let mut seen = vec![false; 1 + n * (n + 1) / 2];
        for x in 0..n {
            for y in 0..=x {
                let a = addr_1d(x, y);
                assert!(!seen[a]);
                seen[a] = true;
            }
        }
        assert_eq!(seen.iter().filter(|s| !**s).count(), 1);
    }

    #[test]
    fn build_and_get() {
        let data: Vec<Vec<f64>> = vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![6.0, 8.0]];
        let m = DistanceMatrix::<f64>::build(&data, &DistanceMetric::Euclidean, &CancelToken::new()).unwrap();
        assert_eq!(m.len(), 3);
        assert!((m.get(0, 1) - 5.0).abs() < 1e-12);
        assert!((m.get(2, 0) - 10.0).abs() < 1e-12);
        assert_eq!(m.get(1, 1), 0.0);
        assert!((m.row_sum(1) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn build_needs_two_vectors() {
        let data: Vec<Vec<f64>> = vec![vec![1.0, 2.0]];
        let result = DistanceMatrix::<f64>::build(&data, &DistanceMetric::Euclidean, &CancelToken::new());
        assert!(matches!(result, Err(ClusterError::TooFewGenes { found: 1, .. })));
    }

    #[test]
    fn build_stops_when_cancelled() {
        let data: Vec<Vec<f64>> = vec![vec![1.0], vec![2.0], vec![3.0]];
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = DistanceMatrix::<f64>::build(&data, &DistanceMetric::Euclidean, &cancel);
        assert!(matches!(result, Err(ClusterError::Cancelled)));
    }
}
