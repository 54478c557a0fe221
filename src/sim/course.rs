//! Course layout and the sector grid
//!
//! The visible water is a fixed frame. When the bow sails off one edge it
//! re-enters on the opposite edge and the sector counter steps by one. The
//! sector row is the boat's coarse progress up the course: each row is
//! `step` nautical miles.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::Shape;
use crate::error::SetupError;

/// Coarse course position (column east, row north)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Sector {
    pub col: i32,
    pub row: i32,
}

impl Sector {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

/// Mark identifier, stable for the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkId(pub u8);

impl std::fmt::Display for MarkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkKind {
    /// Must be rounded before finishing
    Rounding,
    /// Pin or committee boat at an end of the start/finish line
    LineEnd,
}

/// Side the mark is left on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundingSide {
    Port,
    Starboard,
}

/// Direction the boat sails when it passes the mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Approach {
    Northbound,
    Southbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingRequirement {
    pub side: RoundingSide,
    pub approach: Approach,
}

impl RoundingRequirement {
    /// +1 when the boat must pass east of the mark, -1 when west
    pub fn required_side_sign(&self) -> f32 {
        match (self.side, self.approach) {
            // Heading north, a mark left to port sits west of the boat
            (RoundingSide::Port, Approach::Northbound) => 1.0,
            (RoundingSide::Port, Approach::Southbound) => -1.0,
            (RoundingSide::Starboard, Approach::Northbound) => -1.0,
            (RoundingSide::Starboard, Approach::Southbound) => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub id: MarkId,
    pub name: String,
    pub kind: MarkKind,
    /// Sector in which the mark is laid
    pub sector: Sector,
    /// Shape in frame coordinates of that sector
    pub shape: Shape,
    /// Required for rounding marks, ignored for line ends
    pub rounding: Option<RoundingRequirement>,
}

/// The start/finish line, laid in `sector` between two line-end marks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartLine {
    pub sector: Sector,
    /// Frame y of the line; the pre-start side is below it (larger y)
    pub y: f32,
    pub x_min: f32,
    pub x_max: f32,
}

impl StartLine {
    pub fn shape(&self) -> Shape {
        Shape::segment(Vec2::new(self.x_min, self.y), Vec2::new(self.x_max, self.y))
    }

    /// Strictly between the line ends
    pub fn spans(&self, x: f32) -> bool {
        x > self.x_min && x < self.x_max
    }
}

/// Viewport frame and grid step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: f32,
    pub height: f32,
    /// Nautical miles per sector
    pub step: f32,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 500.0,
            step: 0.2,
        }
    }
}

impl Frame {
    /// Re-enter the frame from the opposite edge when `pos` has left it.
    /// Returns the new position and sector.
    pub fn wrap(&self, mut pos: Vec2, mut sector: Sector) -> (Vec2, Sector) {
        if pos.y < 0.0 {
            pos.y += self.height;
            sector.row += 1;
        } else if pos.y > self.height {
            pos.y -= self.height;
            sector.row -= 1;
        }
        if pos.x > self.width {
            pos.x -= self.width;
            sector.col += 1;
        } else if pos.x < 0.0 {
            pos.x += self.width;
            sector.col -= 1;
        }
        (pos, sector)
    }

    /// Forward progress indicator (nm) for a sector
    pub fn progress(&self, sector: Sector) -> f32 {
        sector.row as f32 * self.step
    }
}

/// Where the boat starts its pre-start manoeuvres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartingPosition {
    pub sector: Sector,
    pub position: Vec2,
    pub heading: f32,
    pub sheet: f32,
}

/// Complete course description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub frame: Frame,
    pub start_line: Option<StartLine>,
    pub marks: Vec<Mark>,
    pub starting_position: StartingPosition,
}

impl Default for Course {
    fn default() -> Self {
        Self::default_triangle()
    }
}

impl Course {
    /// Windward mark, then two leeward marks, all left to port
    pub fn default_triangle() -> Self {
        let center = Vec2::new(300.0, 250.0);
        let rounding = |id: u8, name: &str, sector: Sector, approach: Approach| Mark {
            id: MarkId(id),
            name: name.to_string(),
            kind: MarkKind::Rounding,
            sector,
            shape: Shape::circle(center, 10.0),
            rounding: Some(RoundingRequirement {
                side: RoundingSide::Port,
                approach,
            }),
        };
        let line_end = |id: u8, name: &str, at: Vec2, radius: f32| Mark {
            id: MarkId(id),
            name: name.to_string(),
            kind: MarkKind::LineEnd,
            sector: Sector::new(0, 0),
            shape: Shape::circle(at, radius),
            rounding: None,
        };

        Self {
            frame: Frame::default(),
            start_line: Some(StartLine {
                sector: Sector::new(0, 0),
                y: 250.0,
                x_min: 100.0,
                x_max: 500.0,
            }),
            marks: vec![
                rounding(1, "Windward", Sector::new(0, 1), Approach::Northbound),
                rounding(2, "Wing", Sector::new(-3, 0), Approach::Southbound),
                rounding(3, "Leeward", Sector::new(0, -3), Approach::Southbound),
                line_end(10, "Pin", Vec2::new(100.0, 250.0), 12.0),
                line_end(11, "Committee", Vec2::new(500.0, 250.0), 30.0),
            ],
            starting_position: StartingPosition {
                sector: Sector::new(0, 0),
                position: Vec2::new(450.0, 400.0),
                heading: 315.0,
                sheet: 15.0,
            },
        }
    }

    /// Fail setup when required course elements are missing or inconsistent
    pub fn validate(&self) -> Result<(), SetupError> {
        let f = self.frame;
        if !(f.width > 0.0 && f.height > 0.0 && f.step > 0.0) {
            return Err(SetupError::InvalidFrame {
                width: f.width,
                height: f.height,
                step: f.step,
            });
        }
        let line = self.start_line.as_ref().ok_or(SetupError::MissingStartLine)?;
        if !(line.x_min < line.x_max && line.y > 0.0 && line.y < f.height) {
            return Err(SetupError::MissingStartLine);
        }
        if self.rounding_marks().next().is_none() {
            return Err(SetupError::NoRoundingMarks);
        }
        let mut seen = BTreeSet::new();
        for mark in &self.marks {
            if !seen.insert(mark.id) {
                return Err(SetupError::DuplicateMark(mark.id.0));
            }
            if mark.kind == MarkKind::Rounding && mark.rounding.is_none() {
                return Err(SetupError::InvalidSetting {
                    name: "course.marks",
                    reason: format!("rounding mark {} has no rounding requirement", mark.id),
                });
            }
        }
        Ok(())
    }

    pub fn rounding_marks(&self) -> impl Iterator<Item = &Mark> {
        self.marks.iter().filter(|m| m.kind == MarkKind::Rounding)
    }

    pub fn marks_in(&self, sector: Sector) -> impl Iterator<Item = &Mark> {
        self.marks.iter().filter(move |m| m.sector == sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_course_is_valid() {
        assert!(Course::default_triangle().validate().is_ok());
        assert_eq!(Course::default_triangle().rounding_marks().count(), 3);
    }

    #[test]
    fn test_default_triangle_layout() {
        let course = Course::default_triangle();
        let sectors: Vec<Sector> = course.rounding_marks().map(|m| m.sector).collect();
        assert_eq!(sectors, vec![Sector::new(0, 1), Sector::new(-3, 0), Sector::new(0, -3)]);
        assert!((course.frame.progress(Sector::new(0, -3)) + 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_missing_line_is_fatal() {
        let mut course = Course::default_triangle();
        course.start_line = None;
        assert!(matches!(course.validate(), Err(SetupError::MissingStartLine)));
    }

    #[test]
    fn test_no_rounding_marks_is_fatal() {
        let mut course = Course::default_triangle();
        course.marks.retain(|m| m.kind == MarkKind::LineEnd);
        assert!(matches!(course.validate(), Err(SetupError::NoRoundingMarks)));
    }

    #[test]
    fn test_duplicate_mark_is_fatal() {
        let mut course = Course::default_triangle();
        let copy = course.marks[0].clone();
        course.marks.push(copy);
        assert!(matches!(course.validate(), Err(SetupError::DuplicateMark(1))));
    }

    #[test]
    fn test_frame_wraps_and_steps_sector() {
        let frame = Frame::default();
        let (pos, sector) = frame.wrap(Vec2::new(300.0, -2.0), Sector::default());
        assert_eq!(sector, Sector::new(0, 1));
        assert_eq!(pos, Vec2::new(300.0, 498.0));

        let (pos, sector) = frame.wrap(Vec2::new(-1.0, 502.0), Sector::new(0, 1));
        assert_eq!(sector, Sector::new(-1, 0));
        assert_eq!(pos, Vec2::new(599.0, 2.0));

        let (pos, sector) = frame.wrap(Vec2::new(10.0, 10.0), Sector::new(2, 2));
        assert_eq!((pos, sector), (Vec2::new(10.0, 10.0), Sector::new(2, 2)));
    }

    #[test]
    fn test_progress_follows_row() {
        let frame = Frame::default();
        assert_eq!(frame.progress(Sector::new(3, 0)), 0.0);
        assert!((frame.progress(Sector::new(0, 2)) - 0.4).abs() < 1e-6);
        assert!(frame.progress(Sector::new(0, -1)) < 0.0);
    }

    #[test]
    fn test_required_side() {
        let port_up = RoundingRequirement {
            side: RoundingSide::Port,
            approach: Approach::Northbound,
        };
        let port_down = RoundingRequirement {
            side: RoundingSide::Port,
            approach: Approach::Southbound,
        };
        assert_eq!(port_up.required_side_sign(), 1.0);
        assert_eq!(port_down.required_side_sign(), -1.0);
    }

    #[test]
    fn test_course_round_trips_through_json() {
        let course = Course::default_triangle();
        let json = serde_json::to_string(&course).unwrap();
        let back: Course = serde_json::from_str(&json).unwrap();
        assert_eq!(back, course);
    }
}
