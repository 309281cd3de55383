//! Structural masks over the `k x k` residual.

use ndarray::Array2;

/// Mask for conditionally independent sources.
///
/// Each source is its own clique, so only the `c x c` block pairing a source with
/// itself is excluded; those entries are covered by the marginal term of the loss.
pub fn independent_sources_mask(num_sources: usize, num_classes: usize) -> Array2<bool> {
    let k = num_sources * num_classes;
    Array2::from_shape_fn((k, k), |(i, j)| {
        num_classes == 0 || i / num_classes != j / num_classes
    })
}
