//! ILCA Sim - single-handed dinghy race simulator core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (wind, polar, boat physics, collisions, racing rules, clock)
//! - `input`: Control input provider with documented defaults
//! - `leaderboard`: Finish results handed to the external leaderboard
//! - `settings`: Data-driven tuning constants
//! - `error`: Setup and persistence error types

pub mod error;
pub mod input;
pub mod leaderboard;
pub mod settings;
pub mod sim;

pub use error::{InputError, PersistenceError, SetupError};
pub use input::{ControlReader, InputProvider, TextControls};
pub use leaderboard::{Leaderboard, RaceResult, ResultsStore, SubmissionOutcome};
pub use settings::Settings;

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Frame rate the per-tick constants are tuned for
    pub const SIM_HZ: f64 = 60.0;
    /// Fixed simulation timestep in seconds
    pub const SIM_DT: f64 = 1.0 / SIM_HZ;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Polar table reference wind speed (knots)
    pub const POLAR_REFERENCE_WIND: f32 = 10.0;

    /// Fallback wind when no wind source has reported yet
    pub const DEFAULT_WIND_SPEED: f32 = 10.0;
    pub const DEFAULT_WIND_SHIFT: f32 = 0.0;

    /// Control defaults used before any value has been read
    pub const DEFAULT_TILLER: f32 = 0.0;
    pub const DEFAULT_SHEET: f32 = 15.0;

    /// Control limits
    pub const TILLER_LIMIT: f32 = 90.0;
    pub const SHEET_MAX: f32 = 90.0;
    pub const TUNING_LIMIT: i8 = 2;
}

/// Wrap an angle in degrees into [0, 360)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Normalize an angle in degrees to [-180, 180)
#[inline]
pub fn signed_degrees(angle: f32) -> f32 {
    wrap_degrees(angle + 180.0) - 180.0
}

/// Unit direction of travel for a compass heading (0° = up, 90° = right, screen y down)
#[inline]
pub fn heading_vector(heading_deg: f32) -> Vec2 {
    let rad = heading_deg.to_radians();
    Vec2::new(rad.sin(), -rad.cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert_eq!(wrap_degrees(725.0), 5.0);
        assert!(wrap_degrees(-1e-7) < 360.0);
    }

    #[test]
    fn test_signed_degrees() {
        assert_eq!(signed_degrees(190.0), -170.0);
        assert_eq!(signed_degrees(-190.0), 170.0);
        assert_eq!(signed_degrees(45.0), 45.0);
        assert_eq!(signed_degrees(180.0), -180.0);
    }

    #[test]
    fn test_heading_vector() {
        let north = heading_vector(0.0);
        assert!(north.x.abs() < 1e-6 && (north.y + 1.0).abs() < 1e-6);
        let east = heading_vector(90.0);
        assert!((east.x - 1.0).abs() < 1e-6 && east.y.abs() < 1e-6);
    }
}
