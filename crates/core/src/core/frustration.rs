//! Local and global frustration metrics.
//!
//! Sign convention: two equal binary colours contribute `+1`, opposite colours `-1`.
//! This is intentionally the reverse of the usual Ising energy sign.

/// Colour of a vertex, conventionally `0.0` or `1.0`.
pub type Color = f64;

/// Frustration of one vertex: `sum_j (1 - 2 c_i) * (1 - 2 c_j)` over its neighbours.
///
/// ```
/// use latticelab::frustration::local_metric;
/// assert_eq!(local_metric(0.0, [0.0, 1.0, 0.0]), 1.0);
/// assert_eq!(local_metric(1.0, []), 0.0);
/// ```
#[inline]
pub fn local_metric<I>(c_i: Color, neighbour_colors: I) -> f64
where
    I: IntoIterator<Item = Color>,
{
    let s_i = 1.0 - 2.0 * c_i;
    neighbour_colors
        .into_iter()
        .map(|c_j| s_i * (1.0 - 2.0 * c_j))
        .sum()
}

/// Total frustration: half the sum of the per-vertex values.
#[inline]
pub fn global_metric(vertex_frustrations: &[f64]) -> f64 {
    0.5 * vertex_frustrations.iter().sum::<f64>()
}

/// Binary toggle on `{0, 1}`, extended to continuous colours as `1 - c`.
#[inline]
pub fn flip(c: Color) -> Color {
    1.0 - c
}
