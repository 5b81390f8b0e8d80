//! Point-level preprocessing outside the training loop.
//!
//! Provides L2 normalization, a sparse max-abs feature scaler and
//! centroid/recentering helpers built on `DataPoint` arithmetic. Every
//! transform keeps sparsity: zero values stay implicit.
use crate::data_point::DataPoint;

/// Scale `point` to unit Euclidean norm in place. The `bias` feature, when
/// given, is left out of the norm and keeps its value. Points with nothing
/// else to scale are left as they are.
pub fn normalize_l2(point: &mut DataPoint, bias: Option<usize>) {
    let norm = point
        .features()
        .iter()
        .filter(|&&(id, _)| Some(id) != bias)
        .map(|&(_, v)| v * v)
        .sum::<f64>()
        .sqrt();
    if norm > 0.0 {
        point.map_values(|id, v| if Some(id) == bias { v } else { v / norm });
    }
}

/// Per-feature max-abs scaler: divides every value by the largest absolute
/// value seen for that feature during fitting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureScaler {
    pub max_abs: Vec<f64>,
}

impl FeatureScaler {
    /// Features never seen while fitting pass through unchanged.
    pub fn transform(&self, point: &mut DataPoint) {
        point.map_values(|id, v| match self.max_abs.get(id) {
            Some(&m) if m > 0.0 => v / m,
            _ => v,
        });
    }

    pub fn transform_all(&self, points: &mut [DataPoint]) {
        for p in points.iter_mut() {
            self.transform(p);
        }
    }
}

/// Fit a `FeatureScaler` over `points`.
pub fn fit_scaler<'a, I>(points: I) -> FeatureScaler
where
    I: IntoIterator<Item = &'a DataPoint>,
{
    let mut max_abs: Vec<f64> = Vec::new();
    for p in points {
        for &(id, v) in p.features() {
            if id >= max_abs.len() {
                max_abs.resize(id + 1, 0.0);
            }
            max_abs[id] = max_abs[id].max(v.abs());
        }
    }
    FeatureScaler { max_abs }
}

/// Optional convenience: fit a scaler and apply it in one call.
pub fn fit_transform(points: &mut [DataPoint]) -> FeatureScaler {
    let scaler = fit_scaler(points.iter());
    scaler.transform_all(points);
    scaler
}

/// Mean of `points`, named `name`; `None` for an empty slice.
pub fn centroid(points: &[DataPoint], name: &str) -> Option<DataPoint> {
    if points.is_empty() {
        return None;
    }
    let mut center = points
        .iter()
        .fold(DataPoint::empty(name), |acc, p| acc.sum(p));
    center.scale_in_place(1.0 / points.len() as f64);
    Some(center)
}

/// Subtract `center` from every point, keeping names and labels.
pub fn recenter(points: &mut [DataPoint], center: &DataPoint) {
    let negated = center.scale(-1.0);
    for p in points.iter_mut() {
        let shifted = p.sum(&negated);
        p.replace_features(shifted.features().to_vec());
    }
}
