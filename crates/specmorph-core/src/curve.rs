//! Piecewise-linear parameter curves
//!
//! A [`PiecewiseCurve`] maps normalized log-frequency x ∈ [0, 1] to a
//! normalized parameter value y. Every bank holds sixteen of them.
//!
//! Invariants held after every mutation:
//! - at least two points, sorted by x
//! - the first point sits at x = 0 and the last at x = 1
//! - `version` changes whenever the shape changes, so lookup tables know
//!   which rows to rebuild

use serde::{Deserialize, Serialize};

/// Interior points are kept this far from the fixed endpoints
const INTERIOR_X_MARGIN: f32 = 0.001;

/// Segments narrower than this evaluate to their left point
const DEGENERATE_SEGMENT: f32 = 1e-8;

/// Default tolerance for [`PiecewiseCurve::is_flat`]
pub const FLAT_TOLERANCE: f32 = 1e-6;

/// One control point of a curve
///
/// `y` is usually in [0, 1] but may exceed it for above-unity gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f32,
    pub y: f32,
}

impl ControlPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Ordered, linearly interpolated function on [0, 1]
#[derive(Debug, Clone)]
pub struct PiecewiseCurve {
    points: Vec<ControlPoint>,
    version: u32,
}

impl PiecewiseCurve {
    /// Create a flat curve with two endpoints at `default_y`
    pub fn new(default_y: f32) -> Self {
        Self {
            points: vec![ControlPoint::new(0.0, default_y), ControlPoint::new(1.0, default_y)],
            version: 0,
        }
    }

    /// Control points, sorted by x
    #[inline]
    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Number of control points (always ≥ 2)
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; a curve has at least its two endpoints
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Change counter observed by lookup-table caches
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Evaluate the curve at `x` (clamped to [0, 1])
    pub fn evaluate(&self, x: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };
        let x = x.clamp(0.0, 1.0);
        if x <= first.x {
            return first.y;
        }
        if x >= last.x {
            return last.y;
        }

        // First point at or beyond x; always an interior index here
        let hi = self.points.partition_point(|p| p.x < x);
        let a = self.points[hi - 1];
        let b = self.points[hi];
        let dx = b.x - a.x;
        if dx < DEGENERATE_SEGMENT {
            return a.y;
        }
        a.y + (x - a.x) / dx * (b.y - a.y)
    }

    /// Insert a point in x order and return its index
    ///
    /// Only `x` is clamped; `y` is stored as given.
    pub fn add_point(&mut self, x: f32, y: f32) -> usize {
        let x = x.clamp(0.0, 1.0);
        let index = self.points.partition_point(|p| p.x <= x);
        self.points.insert(index, ControlPoint::new(x, y));
        self.ensure_endpoints();
        self.bump();
        index
    }

    /// Remove an interior point
    ///
    /// Returns false (and leaves the version untouched) for the endpoints
    /// or an index past the end.
    pub fn remove_point(&mut self, index: usize) -> bool {
        if index == 0 || index + 1 >= self.points.len() {
            return false;
        }
        self.points.remove(index);
        self.bump();
        true
    }

    /// Move a point
    ///
    /// Endpoints only move in y. Interior points have x clamped away from the
    /// endpoints and the list is re-sorted.
    pub fn update_point(&mut self, index: usize, x: f32, y: f32) -> bool {
        let last = self.points.len() - 1;
        if index > last {
            return false;
        }
        if index == 0 || index == last {
            self.points[index].y = y;
        } else {
            self.points[index] =
                ControlPoint::new(x.clamp(INTERIOR_X_MARGIN, 1.0 - INTERIOR_X_MARGIN), y);
            self.sort();
        }
        self.bump();
        true
    }

    /// Index of the point nearest (x, y), if within `max_distance`
    pub fn find_closest_point(&self, x: f32, y: f32, max_distance: f32) -> Option<usize> {
        let max_sq = max_distance * max_distance;
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, (p.x - x).powi(2) + (p.y - y).powi(2)))
            .filter(|&(_, d)| d <= max_sq)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Collapse to two flat endpoints at `default_y`
    pub fn reset(&mut self, default_y: f32) {
        self.points.clear();
        self.points.push(ControlPoint::new(0.0, default_y));
        self.points.push(ControlPoint::new(1.0, default_y));
        self.bump();
    }

    /// Pin the segment containing `x` flat at `y`
    ///
    /// Adds two points just inside the segment's ends so the span between
    /// them is constant while the neighbouring shape is kept.
    pub fn flatten_segment_at(&mut self, x: f32, y: f32) {
        let x = x.clamp(0.0, 1.0);
        let hi = self.points.partition_point(|p| p.x < x).clamp(1, self.points.len() - 1);
        let left = self.points[hi - 1].x;
        let right = self.points[hi].x;
        let eps = ((right - left) * 0.001).max(1e-6);
        self.add_point(left + eps, y);
        self.add_point(right - eps, y);
    }

    /// Replace the shape with another curve's points
    ///
    /// The version is bumped rather than copied, so caches keyed on this
    /// curve always see the change.
    pub fn copy_from(&mut self, other: &PiecewiseCurve) {
        self.points.clear();
        self.points.extend_from_slice(&other.points);
        self.bump();
    }

    /// Replace the shape with a persisted point list
    ///
    /// An empty list resets to a flat curve at `default_y`. Otherwise x values
    /// are clamped and sorted, and missing endpoints are re-inserted holding
    /// the nearest point's y.
    pub fn set_points(&mut self, points: &[ControlPoint], default_y: f32) {
        if points.is_empty() {
            self.reset(default_y);
            return;
        }
        self.points.clear();
        self.points.extend(
            points
                .iter()
                .map(|p| ControlPoint::new(p.x.clamp(0.0, 1.0), p.y)),
        );
        self.sort();
        self.ensure_endpoints();
        self.bump();
    }

    /// True iff every point's y is within `tolerance` of `value`
    pub fn is_flat(&self, value: f32, tolerance: f32) -> bool {
        self.points.iter().all(|p| (p.y - value).abs() <= tolerance)
    }

    fn sort(&mut self) {
        self.points.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    fn ensure_endpoints(&mut self) {
        match self.points.first() {
            Some(first) if first.x > 0.0 => {
                let y = first.y;
                self.points.insert(0, ControlPoint::new(0.0, y));
            }
            Some(_) => {}
            None => self.points.push(ControlPoint::new(0.0, 0.0)),
        }
        if let Some(last) = self.points.last().copied() {
            if last.x < 1.0 || self.points.len() < 2 {
                self.points.push(ControlPoint::new(1.0, last.y));
            }
        }
    }

    #[inline]
    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

impl Default for PiecewiseCurve {
    fn default() -> Self {
        Self::new(0.0)
    }
}
