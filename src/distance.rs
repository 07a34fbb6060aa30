use num_traits::Float;

/// A pairwise distance between two expression vectors of equal length.
///
/// Implementations must return non-negative values and be symmetric, since the
/// distance matrix only stores one triangle.
pub trait Distance<T> {
    fn distance(&self, a: &[T], b: &[T]) -> T;
}

/// Possible distance metrics that can be used when comparing gene expression
/// vectors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Straight line distance over all sample dimensions.
    Euclidean,
    /// Sum of absolute per-sample differences.
    Manhattan,
    /// `1 - r` where `r` is the Pearson correlation of the two profiles.
    /// Ranges over `[0, 2]`; a flat profile has no defined correlation and is
    /// treated as uncorrelated (distance 1).
    Correlation,
}

impl DistanceMetric {
    pub(crate) fn calc_dist<T: Float>(&self, a: &[T], b: &[T]) -> T {
        match *self {
            Self::Euclidean => euclidean_distance(a, b),
            Self::Manhattan => manhattan_distance(a, b),
            Self::Correlation => correlation_distance(a, b),
        }
    }
}

impl<T: Float> Distance<T> for DistanceMetric {
    fn distance(&self, a: &[T], b: &[T]) -> T {
        self.calc_dist(a, b)
    }
}

/// Wraps a caller supplied closure so it can be used wherever a [`Distance`] is
/// expected.
///
/// ```
/// use geneclust::{Distance, FnDistance};
///
/// let chebyshev = FnDistance(|a: &[f64], b: &[f64]| {
///     a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
/// });
/// assert_eq!(chebyshev.distance(&[0.0, 1.0], &[3.0, 5.0]), 4.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnDistance<F>(pub F);

impl<T, F> Distance<T> for FnDistance<F>
where
    F: Fn(&[T], &[T]) -> T,
{
    fn distance(&self, a: &[T], b: &[T]) -> T {
        (self.0)(a, b)
    }
}

pub(crate) fn euclidean_distance<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x - *y) * (*x - *y))
        .fold(T::zero(), std::ops::Add::add)
        .sqrt()
}

pub(crate) fn manhattan_distance<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x - *y).abs())
        .fold(T::zero(), std::ops::Add::add)
}

pub(crate) fn correlation_distance<T: Float>(a: &[T], b: &[T]) -> T {
    let n = T::from(a.len().min(b.len())).unwrap_or_else(T::one);
    if n <= T::zero() {
        return T::one();
    }
    let mean_a = a.iter().fold(T::zero(), |acc, &x| acc + x) / n;
    let mean_b = b.iter().fold(T::zero(), |acc, &x| acc + x) / n;

    let (mut cov, mut var_a, mut var_b) = (T::zero(), T::zero(), T::zero());
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov = cov + dx * dy;
        var_a = var_a + dx * dx;
        var_b = var_b + dy * dy;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= T::zero() {
        return T::one();
    }
    // Rounding can push |r| marginally past 1
    let r = (cov / denom).max(-T::one()).min(T::one());
    T::one() - r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean() {
        let d: f64 = DistanceMetric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn manhattan() {
        let d: f64 = DistanceMetric::Manhattan.distance(&[1.0, -1.0], &[3.0, 4.0]);
        assert!((d - 7.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_of_scaled_profiles_is_zero() {
        let d: f64 = DistanceMetric::Correlation.distance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!(d.abs() < 1e-12);
    }

    #[test]
    fn correlation_of_inverted_profiles_is_two() {
        let d: f64 = DistanceMetric::Correlation.distance(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]);
        assert!((d - 2.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_of_flat_profile_is_one() {
        let d: f64 = DistanceMetric::Correlation.distance(&[1.0, 1.0, 1.0], &[3.0, 2.0, 1.0]);
        assert_eq!(d, 1.0);
    }
}
