//! Separating-axis hit tests between the hull and course shapes
//!
//! Two convex shapes are apart iff some axis separates their projections.
//! For the hull (a triangle) the candidate axes are its edge normals plus the
//! target's own axes. Touching at zero overlap counts as a hit.

use glam::Vec2;

use super::geometry::{PosedHull, Shape};

/// Tolerance for degenerate axes
const AXIS_EPSILON: f32 = 1e-6;

/// Does the hull overlap `shape`?
pub fn test(hull: &PosedHull, shape: &Shape) -> bool {
    match *shape {
        Shape::Circle { center, radius } => hull_circle(hull, center, radius),
        Shape::Segment { start, end } => hull_segment(hull, start, end),
    }
}

/// Hull against a circle
pub fn hull_circle(hull: &PosedHull, center: Vec2, radius: f32) -> bool {
    let circle_interval = |axis: Vec2| {
        let c = center.dot(axis);
        (c - radius, c + radius)
    };

    for (a, b) in hull.edges() {
        if let Some(axis) = edge_normal(a, b) {
            if separated(hull.project(axis), circle_interval(axis)) {
                return false;
            }
        }
    }

    // Axis toward the vertex nearest the circle catches the corner regions
    let nearest = hull
        .points
        .iter()
        .copied()
        .min_by(|p, q| {
            p.distance_squared(center)
                .partial_cmp(&q.distance_squared(center))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(center);
    let to_center = center - nearest;
    if to_center.length_squared() > AXIS_EPSILON {
        let axis = to_center.normalize();
        if separated(hull.project(axis), circle_interval(axis)) {
            return false;
        }
    }

    true
}

/// Hull against a line segment (a two-point polygon)
pub fn hull_segment(hull: &PosedHull, start: Vec2, end: Vec2) -> bool {
    let segment_interval = |axis: Vec2| {
        let (a, b) = (start.dot(axis), end.dot(axis));
        (a.min(b), a.max(b))
    };

    let mut axes: Vec<Vec2> = hull.edges().filter_map(|(a, b)| edge_normal(a, b)).collect();
    match edge_normal(start, end) {
        Some(normal) => axes.push(normal),
        // Degenerate segment: behaves like a point
        None => return hull_circle(hull, start, 0.0),
    }

    axes.into_iter()
        .all(|axis| !separated(hull.project(axis), segment_interval(axis)))
}

/// Unit normal of the edge a→b, None when the edge has no length
fn edge_normal(a: Vec2, b: Vec2) -> Option<Vec2> {
    let edge = b - a;
    if edge.length_squared() < AXIS_EPSILON {
        return None;
    }
    Some(edge.perp().normalize())
}

#[inline]
fn separated((a_min, a_max): (f32, f32), (b_min, b_max): (f32, f32)) -> bool {
    a_max < b_min || b_max < a_min
}
