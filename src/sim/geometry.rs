//! Shapes for marks, lines and the hull
//!
//! Frame coordinates: x grows right (east), y grows down (south). Headings are
//! compass degrees, 0° pointing up the screen.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Hull outline in boat space: bow at the pivot, stern corners astern
pub const HULL_POINTS: [Vec2; 3] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(25.0, 100.0),
    Vec2::new(-25.0, 100.0),
];

/// A collision target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Circle { center: Vec2, radius: f32 },
    Segment { start: Vec2, end: Vec2 },
}

impl Shape {
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Shape::Circle { center, radius }
    }

    pub fn segment(start: Vec2, end: Vec2) -> Self {
        Shape::Segment { start, end }
    }

    /// Representative point (circle centre, segment midpoint)
    pub fn center(&self) -> Vec2 {
        match *self {
            Shape::Circle { center, .. } => center,
            Shape::Segment { start, end } => (start + end) * 0.5,
        }
    }
}

/// The hull placed at a bow position and heading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosedHull {
    pub points: [Vec2; 3],
}

impl PosedHull {
    /// Rotate the outline by `heading_deg` about the bow, then move the bow to `bow`
    pub fn new(bow: Vec2, heading_deg: f32) -> Self {
        let rotation = Vec2::from_angle(heading_deg.to_radians());
        Self {
            points: HULL_POINTS.map(|p| bow + rotation.rotate(p)),
        }
    }

    /// Edges as (start, end) pairs, closing back to the bow
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Smallest y of any vertex (the part furthest up the course)
    pub fn min_y(&self) -> f32 {
        self.points.iter().fold(f32::MAX, |acc, p| acc.min(p.y))
    }

    /// Geometric centre of the outline
    pub fn centroid(&self) -> Vec2 {
        self.points.iter().copied().sum::<Vec2>() / self.points.len() as f32
    }

    /// Project every vertex onto `axis`, returning (min, max)
    pub fn project(&self, axis: Vec2) -> (f32, f32) {
        self.points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
            let d = p.dot(axis);
            (lo.min(d), hi.max(d))
        })
    }
}
