//! Race settings
//!
//! Every tuning constant of the physics, rules, clock and wind lives here so
//! a race can be re-balanced from a JSON file without touching code.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// How the wind evolves between updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WindStrategy {
    /// Deterministic oscillation through a fixed ramp sequence
    #[default]
    Pattern,
    /// Bounded random walk redrawn every interval
    RandomWalk,
}

impl WindStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindStrategy::Pattern => "pattern",
            WindStrategy::RandomWalk => "random-walk",
        }
    }
}

/// Boat dynamics constants (per tick at 60 Hz)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Heading change per tick per degree of tiller
    pub turn_rate: f32,
    /// Tiller angles at or below this are treated as centred
    pub tiller_deadband: f32,
    /// TWA below which the sail cannot drive the boat
    pub no_go_zone: f32,
    /// Tiller deflection that starts an automatic tack from the no-go zone
    pub tack_trigger: f32,
    /// Relative wind the automatic tack settles on
    pub tack_target: f32,
    /// Heading change per tick while tacking
    pub tack_turn_rate: f32,
    /// Tack completes once within this many degrees of target
    pub tack_settle: f32,
    /// Fraction of wind speed carried through a tack
    pub tack_speed_fraction: f32,
    /// Sheet error (degrees) at which trim efficiency falls to 1/e
    pub trim_tolerance: f32,
    /// Lowest trim efficiency
    pub trim_floor: f32,
    /// Efficiency lost per step of outhaul/vang/downhaul error
    pub tune_error_cost: f32,
    /// Lowest tuning efficiency
    pub tune_floor: f32,
    /// Quadratic drag coefficient on current speed
    pub drag_coefficient: f32,
    /// Tiller angle at which turning drag would stop the boat
    pub turn_drag_factor: f32,
    /// Inertia rate when speeding up
    pub accel_rate: f32,
    /// Inertia rate when slowing down
    pub decel_rate: f32,
    /// Frame units travelled per knot per tick
    pub distance_scale: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            turn_rate: 0.04,
            tiller_deadband: 2.0,
            no_go_zone: 30.0,
            tack_trigger: 9.0,
            tack_target: 45.0,
            tack_turn_rate: 2.0,
            tack_settle: 2.0,
            tack_speed_fraction: 0.25,
            trim_tolerance: 18.0,
            trim_floor: 0.25,
            tune_error_cost: 0.03,
            tune_floor: 0.75,
            drag_coefficient: 0.01,
            turn_drag_factor: 150.0,
            accel_rate: 0.015,
            decel_rate: 0.04,
            distance_scale: 10.6 / 60.0,
        }
    }
}

/// Racing rules constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    /// Progress (nm past the start row) above which the boat is over early
    pub ocs_progress_threshold: f32,
    /// Half-height of the band around a mark's centre line that counts as alongside
    pub rounding_alignment: f32,
    /// Distance past a mark's centre line required to count a rounding
    pub rounding_clearance: f32,
    /// Seconds after the start before the finish line is armed
    pub finish_arm_delay: f64,
    /// Seconds added for being over early
    pub ocs_penalty: f64,
    /// Seconds added for touching a start/finish line end
    pub finish_mark_penalty: f64,
    /// Fraction of elapsed time added per rounding mark touched
    pub rounding_touch_fraction: f64,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            ocs_progress_threshold: 0.01,
            rounding_alignment: 50.0,
            rounding_clearance: 20.0,
            finish_arm_delay: 20.0,
            ocs_penalty: 30.0,
            finish_mark_penalty: 30.0,
            rounding_touch_fraction: 0.20,
        }
    }
}

/// Start sequence timing (seconds before the start signal)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    pub pre_start: f64,
    pub preparatory_up: f64,
    pub preparatory_down: f64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            pre_start: 180.0,
            preparatory_up: 120.0,
            preparatory_down: 60.0,
        }
    }
}

/// Wind model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindSettings {
    pub strategy: WindStrategy,
    /// Seconds between wind updates
    pub interval: f64,
    /// Fixed favoured speed; drawn from `favoured_min..=favoured_max` when unset
    pub base_speed: Option<f32>,
    pub favoured_min: u32,
    pub favoured_max: u32,
    /// Random walk: shift drawn from -shift_limit..=shift_limit
    pub shift_limit: i32,
    /// Random walk: speed varies by up to this many knots
    pub gust_range: i32,
    /// Random walk: speed never drops below this
    pub min_speed: f32,
}

impl Default for WindSettings {
    fn default() -> Self {
        Self {
            strategy: WindStrategy::Pattern,
            interval: 10.0,
            base_speed: None,
            favoured_min: 8,
            favoured_max: 14,
            shift_limit: 20,
            gust_range: 2,
            min_speed: 5.0,
        }
    }
}

/// All race settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seed for the wind RNG
    pub seed: u64,
    pub physics: PhysicsSettings,
    pub rules: RuleSettings,
    pub clock: ClockSettings,
    pub wind: WindSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 0x1_1CA,
            physics: PhysicsSettings::default(),
            rules: RuleSettings::default(),
            clock: ClockSettings::default(),
            wind: WindSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, SetupError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SetupError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SetupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would make the simulation meaningless
    pub fn validate(&self) -> Result<(), SetupError> {
        let p = &self.physics;
        let positive = [
            ("physics.tack_turn_rate", p.tack_turn_rate),
            ("physics.trim_tolerance", p.trim_tolerance),
            ("physics.turn_drag_factor", p.turn_drag_factor),
            ("physics.accel_rate", p.accel_rate),
            ("physics.decel_rate", p.decel_rate),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SetupError::InvalidSetting {
                    name,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        if p.accel_rate > 1.0 || p.decel_rate > 1.0 {
            return Err(SetupError::InvalidSetting {
                name: "physics.accel_rate/decel_rate",
                reason: "inertia rates above 1 overshoot".to_string(),
            });
        }
        if !(p.tack_settle.is_finite() && p.tack_settle >= 0.0) {
            return Err(SetupError::InvalidSetting {
                name: "physics.tack_settle",
                reason: format!("must be non-negative, got {}", p.tack_settle),
            });
        }
        if !(p.no_go_zone >= 0.0 && p.no_go_zone < 180.0) {
            return Err(SetupError::InvalidSetting {
                name: "physics.no_go_zone",
                reason: format!("must be in [0, 180), got {}", p.no_go_zone),
            });
        }
        let c = &self.clock;
        // Signals must fall strictly before the gun, in schedule order
        if !(c.pre_start.is_finite()
            && c.preparatory_up < c.pre_start
            && c.preparatory_down < c.preparatory_up
            && c.preparatory_down > 0.0)
        {
            return Err(SetupError::InvalidSetting {
                name: "clock",
                reason: "expected pre_start > preparatory_up > preparatory_down > 0".to_string(),
            });
        }
        let w = &self.wind;
        if !(w.interval > 0.0) || w.favoured_min > w.favoured_max {
            return Err(SetupError::InvalidSetting {
                name: "wind",
                reason: "interval must be positive and favoured_min <= favoured_max".to_string(),
            });
        }
        if !(0..=180).contains(&w.shift_limit) || w.gust_range < 0 {
            return Err(SetupError::InvalidSetting {
                name: "wind",
                reason: format!(
                    "shift_limit must be in [0, 180] and gust_range non-negative, got {} and {}",
                    w.shift_limit, w.gust_range
                ),
            });
        }
        Ok(())
    }
}
