//! Weight-space geometry: boxes, measures, shapes, and flexible bounds.

use serde::{Deserialize, Serialize};

/// Scalar measure used to compare candidate boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Sum of interval widths. Linear, so it can be optimized directly.
    Perimeter,
    /// Product of interval widths.
    Volume,
}

/// Weight-space shape the box search runs inside.
///
/// Shapes exist to pin the scale of the weight vector; without one, any
/// feasible weighting could be scaled arbitrarily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Attributes `1..n-1` free, the last weight implied by `1 - Σw`.
    Triangle,
    /// All attributes free, upper bounds jointly below the simplex.
    Pyramid,
    /// All attributes free, each bound capped at 1 independently. Least
    /// restrictive; typically yields the largest boxes.
    Cube,
}

impl Shape {
    /// Number of free attributes out of `n` ranking attributes.
    pub fn used_attributes(self, n: usize) -> usize {
        match self {
            Shape::Triangle => n - 1,
            Shape::Pyramid | Shape::Cube => n,
        }
    }

    /// Theoretical supremum of the perimeter, used to seed binary search.
    pub fn perimeter_ceiling(self, n: usize) -> f64 {
        match self {
            Shape::Triangle | Shape::Pyramid => 1.0,
            Shape::Cube => n as f64,
        }
    }
}

/// A hyper-rectangle of weight vectors: one `(lower, upper)` interval per
/// free attribute, plus the measure reported by the optimizer.
///
/// An invalid box (measure ≤ 0) means "no box found".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightBox {
    measure: f64,
    intervals: Vec<(f64, f64)>,
}

impl WeightBox {
    /// The "no box found" sentinel.
    pub fn invalid() -> Self {
        Self {
            measure: -1.0,
            intervals: Vec::new(),
        }
    }

    pub fn new(measure: f64, intervals: Vec<(f64, f64)>) -> Self {
        Self { measure, intervals }
    }

    pub fn valid(&self) -> bool {
        self.measure > 0.0
    }

    /// The optimizer's reported measure.
    pub fn measure(&self) -> f64 {
        self.measure
    }

    pub fn intervals(&self) -> &[(f64, f64)] {
        &self.intervals
    }

    /// Perimeter recomputed directly from the stored bounds.
    pub fn perimeter(&self) -> f64 {
        self.intervals.iter().map(|(lo, hi)| hi - lo).sum()
    }

    /// Volume recomputed directly from the stored bounds.
    pub fn volume(&self) -> f64 {
        self.intervals.iter().map(|(lo, hi)| hi - lo).product()
    }

    /// Whether `point` (one value per free attribute) lies inside the box.
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.intervals.len()
            && point
                .iter()
                .zip(self.intervals.iter())
                .all(|(v, (lo, hi))| *v >= lo - 1e-9 && *v <= hi + 1e-9)
    }
}

/// Kind of a user-supplied flexible bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundKind {
    /// Lower bound of the interval must be at least `value`.
    Min,
    /// Upper bound of the interval must be at most `value`.
    Max,
    /// Interval width must be at least `value`.
    Space,
}

/// A user-supplied restriction on one attribute's interval, attached to a
/// query and consumed once by the robust encoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundConstraint {
    /// Zero-based index among the shape's free attributes.
    pub attribute: usize,
    pub kind: BoundKind,
    pub value: f64,
}

impl BoundConstraint {
    pub fn min(attribute: usize, value: f64) -> Self {
        Self {
            attribute,
            kind: BoundKind::Min,
            value,
        }
    }

    pub fn max(attribute: usize, value: f64) -> Self {
        Self {
            attribute,
            kind: BoundKind::Max,
            value,
        }
    }

    pub fn space(attribute: usize, value: f64) -> Self {
        Self {
            attribute,
            kind: BoundKind::Space,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_box_is_invalid() {
        assert!(!WeightBox::invalid().valid());
    }

    #[test]
    fn measures_recompute_from_bounds() {
        let b = WeightBox::new(0.5, vec![(0.1, 0.4), (0.2, 0.4)]);
        assert!((b.perimeter() - 0.5).abs() < 1e-12);
        assert!((b.volume() - 0.06).abs() < 1e-12);
        assert!(b.contains(&[0.25, 0.3]));
        assert!(!b.contains(&[0.5, 0.3]));
    }

    #[test]
    fn shape_free_attributes() {
        assert_eq!(Shape::Triangle.used_attributes(3), 2);
        assert_eq!(Shape::Pyramid.used_attributes(3), 3);
        assert_eq!(Shape::Cube.perimeter_ceiling(3), 3.0);
    }
}
