//! R-tree over the segments of a route polyline.
//!
//! ## Two-Stage Lookup
//!
//! 1. **R-tree filter**: planar (Euclidean) distance in degree space picks the
//!    nearest segment.
//! 2. **Haversine distance**: measured from the point to the closest point on
//!    that segment.
//!
//! Over the few miles a shuttle route spans, the planar nearest segment is the
//! great-circle nearest one as well.

use std::fmt;

use geo::Line;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::models::types::GeoPoint;
use crate::spatial::queries::{closest_point_on_line, haversine_distance_to_line};

// ============================================================================
// Route Segment Spatial Node
// ============================================================================

#[derive(Clone, Debug)]
pub struct RouteSegmentNode {
    pub segment: Line,
    /// Position of the segment along the polyline
    pub ordinal: usize,
    aabb: AABB<[f64; 2]>,
}

impl RouteSegmentNode {
    pub fn new(segment: Line, ordinal: usize) -> Self {
        let start = [segment.start.x, segment.start.y];
        let end = [segment.end.x, segment.end.y];

        Self {
            segment,
            ordinal,
            aabb: AABB::from_corners(start, end),
        }
    }
}

impl RTreeObject for RouteSegmentNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

impl PointDistance for RouteSegmentNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        // Squared Euclidean distance from point to the segment
        let a = [self.segment.start.x, self.segment.start.y];
        let b = [self.segment.end.x, self.segment.end.y];

        let ab = [b[0] - a[0], b[1] - a[1]];
        let ap = [point[0] - a[0], point[1] - a[1]];

        let ab_ab = ab[0] * ab[0] + ab[1] * ab[1];

        if ab_ab == 0.0 {
            // Degenerate segment (repeated vertex)
            return ap[0] * ap[0] + ap[1] * ap[1];
        }

        let t = ((ab[0] * ap[0] + ab[1] * ap[1]) / ab_ab).clamp(0.0, 1.0);

        let dx = point[0] - (a[0] + t * ab[0]);
        let dy = point[1] - (a[1] + t * ab[1]);
        dx * dx + dy * dy
    }
}

// ============================================================================
// Segment Index
// ============================================================================

/// Immutable spatial index of one polyline.
#[derive(Clone)]
pub struct SegmentIndex {
    tree: RTree<RouteSegmentNode>,
}

impl fmt::Debug for SegmentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentIndex")
            .field("segments", &self.tree.size())
            .finish()
    }
}

impl SegmentIndex {
    pub fn from_polyline(polyline: &[GeoPoint]) -> Self {
        let segments = polyline
            .windows(2)
            .enumerate()
            .map(|(ordinal, pair)| RouteSegmentNode::new(Line::new(pair[0], pair[1]), ordinal))
            .collect();

        Self {
            tree: RTree::bulk_load(segments),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn nearest_segment(&self, point: GeoPoint) -> Option<&RouteSegmentNode> {
        self.tree.nearest_neighbor(&[point.longitude, point.latitude])
    }

    /// Closest point on the polyline to `point`.
    pub fn closest_point(&self, point: GeoPoint) -> Option<GeoPoint> {
        self.nearest_segment(point)
            .and_then(|node| closest_point_on_line(point, node.segment))
    }

    /// Haversine distance in miles to the closest point on the polyline.
    pub fn distance(&self, point: GeoPoint) -> f64 {
        self.nearest_segment(point)
            .map_or(f64::INFINITY, |node| haversine_distance_to_line(point, node.segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::queries::degrees_to_miles;
    use approx::assert_relative_eq;

    fn l_shape() -> SegmentIndex {
        SegmentIndex::from_polyline(&[
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(1.0, 1.0),
        ])
    }

    #[test]
    fn test_index_has_one_node_per_segment() {
        let index = l_shape();
        assert_eq!(index.len(), 2);
        assert!(SegmentIndex::from_polyline(&[GeoPoint::new(0.0, 0.0)]).is_empty());
    }

    #[test]
    fn test_nearest_segment_ordinal() {
        let index = l_shape();
        let first = index.nearest_segment(GeoPoint::new(-0.1, 0.5)).unwrap();
        let second = index.nearest_segment(GeoPoint::new(0.5, 1.1)).unwrap();

        assert_eq!(first.ordinal, 0);
        assert_eq!(second.ordinal, 1);
    }

    #[test]
    fn test_closest_point_between_vertices() {
        let index = l_shape();
        let closest = index.closest_point(GeoPoint::new(0.2, 0.5)).unwrap();

        assert_relative_eq!(closest.latitude, 0.0, epsilon = 1e-12);
        assert_relative_eq!(closest.longitude, 0.5, epsilon = 1e-12);
        let distance = index.distance(GeoPoint::new(0.2, 0.5));
        assert_relative_eq!(distance, degrees_to_miles(0.2), epsilon = 1e-6);
    }

    #[test]
    fn test_empty_index_distance_is_infinite() {
        let index = SegmentIndex::from_polyline(&[]);
        assert!(index.distance(GeoPoint::new(0.0, 0.0)).is_infinite());
        assert!(index.closest_point(GeoPoint::new(0.0, 0.0)).is_none());
    }
}
