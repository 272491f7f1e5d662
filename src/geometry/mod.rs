//! Geometric predicates and measures.
//!
//! The spatial join and the renderers rely on a small set of primitives
//! implemented here rather than on an external geometry engine, so their
//! semantics are explicit and unit-tested: point-in-polygon, segment and
//! polygon intersection, bounding boxes, and centroids.

pub mod crs;

use crate::models::Geometry;
use geo_types::{Coord, LineString, Polygon};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// An inverted box that any point expands.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// True when no point has been absorbed yet.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Expand to cover a coordinate.
    pub fn absorb(&mut self, c: Coord<f64>) {
        self.min_x = self.min_x.min(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_x = self.max_x.max(c.x);
        self.max_y = self.max_y.max(c.y);
    }

    /// Expand to cover another box.
    pub fn merge(&mut self, other: &BoundingBox) {
        if !other.is_empty() {
            self.min_x = self.min_x.min(other.min_x);
            self.min_y = self.min_y.min(other.min_y);
            self.max_x = self.max_x.max(other.max_x);
            self.max_y = self.max_y.max(other.max_y);
        }
    }

    /// True when the two boxes share any area or edge.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || self.max_x < other.min_x
            || other.max_x < self.min_x
            || self.max_y < other.min_y
            || other.max_y < self.min_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Bounding box of a single geometry.
pub fn geometry_bbox(geometry: &Geometry) -> BoundingBox {
    let mut bbox = BoundingBox::empty();
    match geometry {
        Geometry::Point(p) => bbox.absorb(p.0),
        Geometry::Polygon(poly) => absorb_polygon(&mut bbox, poly),
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                absorb_polygon(&mut bbox, poly);
            }
        }
    }
    bbox
}

fn absorb_polygon(bbox: &mut BoundingBox, poly: &Polygon<f64>) {
    for c in &poly.exterior().0 {
        bbox.absorb(*c);
    }
    // Interior rings cannot extend the bounds of a valid polygon; skipping
    // them keeps malformed inputs from inflating the box.
}

/// Even-odd crossing count over one ring.
///
/// Points exactly on an edge count as inside; the renderers and the spatial
/// join both want boundary features attributed rather than dropped.
fn crossings(point: Coord<f64>, ring: &LineString<f64>) -> usize {
    let coords = &ring.0;
    if coords.len() < 2 {
        return 0;
    }

    let mut count = 0;
    for window in coords.windows(2) {
        let (a, b) = (window[0], window[1]);
        if (a.y > point.y) != (b.y > point.y) {
            let t = (point.y - a.y) / (b.y - a.y);
            let x = a.x + t * (b.x - a.x);
            if x > point.x {
                count += 1;
            }
        }
    }
    count
}

/// True when the point lies on any edge of the ring (within f64 tolerance).
fn on_ring(point: Coord<f64>, ring: &LineString<f64>) -> bool {
    ring.0
        .windows(2)
        .any(|w| point_on_segment(point, w[0], w[1]))
}

fn point_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let scale = (b.x - a.x).abs().max((b.y - a.y).abs()).max(1.0);
    if cross.abs() > f64::EPSILON * 16.0 * scale * scale {
        return false;
    }
    p.x >= a.x.min(b.x) - f64::EPSILON
        && p.x <= a.x.max(b.x) + f64::EPSILON
        && p.y >= a.y.min(b.y) - f64::EPSILON
        && p.y <= a.y.max(b.y) + f64::EPSILON
}

/// Point-in-polygon by even-odd ray casting, holes respected.
pub fn point_in_polygon(point: Coord<f64>, polygon: &Polygon<f64>) -> bool {
    if on_ring(point, polygon.exterior()) {
        return true;
    }
    if crossings(point, polygon.exterior()) % 2 == 0 {
        return false;
    }
    for hole in polygon.interiors() {
        if on_ring(point, hole) {
            return true;
        }
        if crossings(point, hole) % 2 == 1 {
            return false;
        }
    }
    true
}

/// Orientation of the ordered triple (a, b, c).
fn orientation(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> i8 {
    let v = (b.y - a.y) * (c.x - b.x) - (b.x - a.x) * (c.y - b.y);
    let scale = (b.x - a.x)
        .abs()
        .max((b.y - a.y).abs())
        .max((c.x - b.x).abs())
        .max((c.y - b.y).abs())
        .max(1.0);
    if v.abs() <= f64::EPSILON * 16.0 * scale * scale {
        0
    } else if v > 0.0 {
        1
    } else {
        -1
    }
}

/// True when segments a1–a2 and b1–b2 intersect, including touching and
/// collinear overlap.
pub fn segments_intersect(
    a1: Coord<f64>,
    a2: Coord<f64>,
    b1: Coord<f64>,
    b2: Coord<f64>,
) -> bool {
    let o1 = orientation(a1, a2, b1);
    let o2 = orientation(a1, a2, b2);
    let o3 = orientation(b1, b2, a1);
    let o4 = orientation(b1, b2, a2);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    // Collinear cases: an endpoint of one segment lies on the other.
    (o1 == 0 && point_on_segment(b1, a1, a2))
        || (o2 == 0 && point_on_segment(b2, a1, a2))
        || (o3 == 0 && point_on_segment(a1, b1, b2))
        || (o4 == 0 && point_on_segment(a2, b1, b2))
}

fn rings_cross(a: &LineString<f64>, b: &LineString<f64>) -> bool {
    for wa in a.0.windows(2) {
        for wb in b.0.windows(2) {
            if segments_intersect(wa[0], wa[1], wb[0], wb[1]) {
                return true;
            }
        }
    }
    false
}

fn polygon_rings(poly: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(poly.exterior()).chain(poly.interiors().iter())
}

/// True when two polygons share any point: edges cross, or one contains
/// the other.
pub fn polygons_intersect(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    let (bbox_a, bbox_b) = (polygon_bbox(a), polygon_bbox(b));
    if !bbox_a.overlaps(&bbox_b) {
        return false;
    }

    for ra in polygon_rings(a) {
        for rb in polygon_rings(b) {
            if rings_cross(ra, rb) {
                return true;
            }
        }
    }

    // No edge crossings: containment is the only remaining possibility.
    let a_first = a.exterior().0.first();
    let b_first = b.exterior().0.first();
    match (a_first, b_first) {
        (Some(&pa), Some(&pb)) => point_in_polygon(pa, b) || point_in_polygon(pb, a),
        _ => false,
    }
}

fn polygon_bbox(poly: &Polygon<f64>) -> BoundingBox {
    let mut bbox = BoundingBox::empty();
    absorb_polygon(&mut bbox, poly);
    bbox
}

/// True when the two feature geometries share any point.
///
/// This is the predicate behind the spatial join: points test against
/// polygon interiors, polygons test edge crossings and containment.
/// Point–point pairs never intersect here; the join has no use for them.
pub fn geometries_intersect(a: &Geometry, b: &Geometry) -> bool {
    match (a, b) {
        (Geometry::Point(p), other) | (other, Geometry::Point(p)) => match other {
            Geometry::Point(_) => false,
            Geometry::Polygon(poly) => point_in_polygon(p.0, poly),
            Geometry::MultiPolygon(mp) => mp.0.iter().any(|poly| point_in_polygon(p.0, poly)),
        },
        (Geometry::Polygon(pa), Geometry::Polygon(pb)) => polygons_intersect(pa, pb),
        (Geometry::Polygon(pa), Geometry::MultiPolygon(mb)) => {
            mb.0.iter().any(|pb| polygons_intersect(pa, pb))
        }
        (Geometry::MultiPolygon(ma), Geometry::Polygon(pb)) => {
            ma.0.iter().any(|pa| polygons_intersect(pa, pb))
        }
        (Geometry::MultiPolygon(ma), Geometry::MultiPolygon(mb)) => ma
            .0
            .iter()
            .any(|pa| mb.0.iter().any(|pb| polygons_intersect(pa, pb))),
    }
}

/// Area-weighted centroid of a polygon exterior (shoelace formula).
///
/// Degenerate rings (zero area) fall back to the vertex mean.
pub fn polygon_centroid(poly: &Polygon<f64>) -> Coord<f64> {
    let coords = &poly.exterior().0;
    if coords.len() < 3 {
        return vertex_mean(coords);
    }

    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for w in coords.windows(2) {
        let (a, b) = (w[0], w[1]);
        let cross = a.x * b.y - b.x * a.y;
        area2 += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }

    if area2.abs() < f64::EPSILON {
        return vertex_mean(coords);
    }
    Coord {
        x: cx / (3.0 * area2),
        y: cy / (3.0 * area2),
    }
}

fn vertex_mean(coords: &[Coord<f64>]) -> Coord<f64> {
    if coords.is_empty() {
        return Coord { x: 0.0, y: 0.0 };
    }
    let n = coords.len() as f64;
    Coord {
        x: coords.iter().map(|c| c.x).sum::<f64>() / n,
        y: coords.iter().map(|c| c.y).sum::<f64>() / n,
    }
}

/// Anchor point for a geometry: the point itself, or the centroid of the
/// (largest, for multi-polygons) polygon exterior.
pub fn anchor_point(geometry: &Geometry) -> Coord<f64> {
    match geometry {
        Geometry::Point(p) => p.0,
        Geometry::Polygon(poly) => polygon_centroid(poly),
        Geometry::MultiPolygon(mp) => {
            let largest = mp
                .0
                .iter()
                .max_by(|a, b| {
                    ring_area_abs(a.exterior())
                        .partial_cmp(&ring_area_abs(b.exterior()))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            match largest {
                Some(poly) => polygon_centroid(poly),
                None => Coord { x: 0.0, y: 0.0 },
            }
        }
    }
}

fn ring_area_abs(ring: &LineString<f64>) -> f64 {
    let mut area2 = 0.0;
    for w in ring.0.windows(2) {
        area2 += w[0].x * w[1].y - w[1].x * w[0].y;
    }
    (area2 / 2.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Point};

    fn unit_square() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ]
    }

    fn square_with_hole() -> Polygon<f64> {
        Polygon::new(
            geo_types::LineString::from(vec![
                (0.0, 0.0),
                (4.0, 0.0),
                (4.0, 4.0),
                (0.0, 4.0),
                (0.0, 0.0),
            ]),
            vec![geo_types::LineString::from(vec![
                (1.0, 1.0),
                (3.0, 1.0),
                (3.0, 3.0),
                (1.0, 3.0),
                (1.0, 1.0),
            ])],
        )
    }

    #[test]
    fn test_point_in_polygon_basic() {
        let square = unit_square();
        assert!(point_in_polygon(Coord { x: 2.0, y: 2.0 }, &square));
        assert!(!point_in_polygon(Coord { x: 5.0, y: 2.0 }, &square));
        assert!(!point_in_polygon(Coord { x: -0.1, y: 2.0 }, &square));
    }

    #[test]
    fn test_point_on_boundary_counts_as_inside() {
        let square = unit_square();
        assert!(point_in_polygon(Coord { x: 0.0, y: 2.0 }, &square));
        assert!(point_in_polygon(Coord { x: 4.0, y: 4.0 }, &square));
    }

    #[test]
    fn test_point_in_polygon_respects_holes() {
        let donut = square_with_hole();
        assert!(point_in_polygon(Coord { x: 0.5, y: 0.5 }, &donut));
        assert!(!point_in_polygon(Coord { x: 2.0, y: 2.0 }, &donut));
        // Hole boundary still counts as the polygon's point set.
        assert!(point_in_polygon(Coord { x: 1.0, y: 2.0 }, &donut));
    }

    #[test]
    fn test_segments_intersect() {
        let o = |x, y| Coord { x, y };
        assert!(segments_intersect(
            o(0.0, 0.0),
            o(2.0, 2.0),
            o(0.0, 2.0),
            o(2.0, 0.0)
        ));
        assert!(!segments_intersect(
            o(0.0, 0.0),
            o(1.0, 0.0),
            o(0.0, 1.0),
            o(1.0, 1.0)
        ));
        // Touching endpoints intersect.
        assert!(segments_intersect(
            o(0.0, 0.0),
            o(1.0, 1.0),
            o(1.0, 1.0),
            o(2.0, 0.0)
        ));
        // Collinear overlap intersects.
        assert!(segments_intersect(
            o(0.0, 0.0),
            o(2.0, 0.0),
            o(1.0, 0.0),
            o(3.0, 0.0)
        ));
    }

    #[test]
    fn test_polygons_intersect_overlap() {
        let a = unit_square();
        let b = polygon![
            (x: 2.0, y: 2.0),
            (x: 6.0, y: 2.0),
            (x: 6.0, y: 6.0),
            (x: 2.0, y: 6.0),
            (x: 2.0, y: 2.0),
        ];
        assert!(polygons_intersect(&a, &b));
    }

    #[test]
    fn test_polygons_intersect_containment() {
        let outer = unit_square();
        let inner = polygon![
            (x: 1.0, y: 1.0),
            (x: 2.0, y: 1.0),
            (x: 2.0, y: 2.0),
            (x: 1.0, y: 2.0),
            (x: 1.0, y: 1.0),
        ];
        assert!(polygons_intersect(&outer, &inner));
        assert!(polygons_intersect(&inner, &outer));
    }

    #[test]
    fn test_polygons_disjoint() {
        let a = unit_square();
        let b = polygon![
            (x: 10.0, y: 10.0),
            (x: 12.0, y: 10.0),
            (x: 12.0, y: 12.0),
            (x: 10.0, y: 12.0),
            (x: 10.0, y: 10.0),
        ];
        assert!(!polygons_intersect(&a, &b));
    }

    #[test]
    fn test_point_geometry_against_polygon() {
        let square = Geometry::Polygon(unit_square());
        let inside = Geometry::Point(Point::new(1.0, 1.0));
        let outside = Geometry::Point(Point::new(9.0, 9.0));

        assert!(geometries_intersect(&inside, &square));
        assert!(geometries_intersect(&square, &inside));
        assert!(!geometries_intersect(&outside, &square));
    }

    #[test]
    fn test_bbox_overlap_and_merge() {
        let mut a = BoundingBox::empty();
        a.absorb(Coord { x: 0.0, y: 0.0 });
        a.absorb(Coord { x: 2.0, y: 2.0 });

        let mut b = BoundingBox::empty();
        b.absorb(Coord { x: 1.0, y: 1.0 });
        b.absorb(Coord { x: 3.0, y: 3.0 });

        assert!(a.overlaps(&b));

        let mut c = BoundingBox::empty();
        c.absorb(Coord { x: 10.0, y: 10.0 });
        assert!(!a.overlaps(&c));

        a.merge(&c);
        assert_eq!(a.max_x, 10.0);
        assert_eq!(a.min_x, 0.0);
    }

    #[test]
    fn test_polygon_centroid_of_square() {
        let c = polygon_centroid(&unit_square());
        assert!((c.x - 2.0).abs() < 1e-9);
        assert!((c.y - 2.0).abs() < 1e-9);
    }
}
