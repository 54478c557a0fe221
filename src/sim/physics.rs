//! Boat dynamics
//!
//! One call per frame turns helm, sheet and sail controls plus the current
//! wind into a new heading, speed, boom angle and position. Angles are kept
//! in degrees; radians only appear at the trig call sites.

use super::polar::PolarTable;
use super::state::{Boat, SailState, SailTuning, TackState};
use super::tick::TickInput;
use super::wind::Wind;
use crate::consts::{DEFAULT_TILLER, DEFAULT_WIND_SHIFT, DEFAULT_WIND_SPEED, POLAR_REFERENCE_WIND};
use crate::settings::PhysicsSettings;
use crate::{heading_vector, signed_degrees, wrap_degrees};

/// What the step saw and decided, for telemetry and tests
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    /// Wind angle relative to the bow, [-180, 180), negative on port tack
    pub relative_wind: f32,
    /// True wind angle, [0, 180]
    pub twa: f32,
    pub on_port_tack: bool,
    pub in_no_go_zone: bool,
    pub luffing: bool,
    pub potential_speed: f32,
    pub trim_efficiency: f32,
    pub tune_efficiency: f32,
    pub tack_started: bool,
    pub tack_completed: bool,
}

/// Wind angle relative to the bow, [-180, 180)
#[inline]
pub fn relative_wind(heading: f32, direction_shift: f32) -> f32 {
    signed_degrees(heading - direction_shift)
}

/// Ideal outhaul/vang/downhaul setting for the wind strength: loose in light air, tight in a breeze
pub fn ideal_tuning(wind_speed: f32) -> f32 {
    if wind_speed <= 9.0 {
        2.0
    } else if wind_speed <= 11.0 {
        1.0
    } else if wind_speed <= 12.0 {
        0.0
    } else if wind_speed <= 13.0 {
        -1.0
    } else {
        -2.0
    }
}

/// Bell-curve efficiency for sheet error against the polar target
pub fn trim_efficiency(sheet: f32, target_sheet: f32, cfg: &PhysicsSettings) -> f32 {
    let error = (sheet - target_sheet) / cfg.trim_tolerance;
    (-(error * error)).exp().max(cfg.trim_floor)
}

/// Linear efficiency for tuning controls away from their ideal
pub fn tuning_efficiency(tuning: &SailTuning, wind_speed: f32, cfg: &PhysicsSettings) -> f32 {
    let ideal = ideal_tuning(wind_speed);
    let error: f32 = [tuning.outhaul, tuning.vang, tuning.downhaul]
        .iter()
        .map(|&v| (v as f32 - ideal).abs())
        .sum();
    (1.0 - error * cfg.tune_error_cost).max(cfg.tune_floor)
}

/// Non-finite wind readings fall back to 10 kn at 0°
pub(crate) fn finite_wind(wind: Wind) -> Wind {
    let speed = if wind.speed.is_finite() {
        wind.speed
    } else {
        log::warn!("Ignoring non-finite wind speed {}", wind.speed);
        DEFAULT_WIND_SPEED
    };
    let direction_shift = if wind.direction_shift.is_finite() {
        wind.direction_shift
    } else {
        log::warn!("Ignoring non-finite wind shift {}", wind.direction_shift);
        DEFAULT_WIND_SHIFT
    };
    Wind {
        speed,
        direction_shift,
    }
}

/// Tiller and sheet with non-finite values replaced: centred tiller, sheet held
fn finite_controls(input: &TickInput, held_sheet: f32) -> (f32, f32) {
    let tiller = if input.tiller.is_finite() {
        input.tiller
    } else {
        log::warn!("Ignoring non-finite tiller {}", input.tiller);
        DEFAULT_TILLER
    };
    let sheet = if input.sheet.is_finite() {
        input.sheet
    } else {
        log::warn!("Ignoring non-finite sheet {}, holding {held_sheet}", input.sheet);
        held_sheet
    };
    (tiller, sheet)
}

/// Advance the boat by one tick
pub fn step(
    boat: &mut Boat,
    wind: Wind,
    input: &TickInput,
    polar: &PolarTable,
    cfg: &PhysicsSettings,
) -> StepReport {
    let wind = finite_wind(wind);
    let wind_speed = wind.speed.max(0.0);
    let (raw_tiller, sheet) = finite_controls(input, boat.sheet_angle);

    // 1. Helm. The automatic tack owns the heading while committed.
    let tiller = if raw_tiller.abs() <= cfg.tiller_deadband {
        0.0
    } else {
        raw_tiller
    };
    boat.tiller_angle = tiller;
    boat.sheet_angle = sheet;
    if !boat.tack.is_committed() {
        boat.heading = wrap_degrees(boat.heading + tiller * cfg.turn_rate);
    }

    // 2-3. Wind geometry
    let relative = relative_wind(boat.heading, wind.direction_shift);
    let twa = relative.abs().min(180.0);
    let on_port_tack = relative < 0.0;
    let in_no_go_zone = twa < cfg.no_go_zone;
    let luffing = boat.sheet_angle > twa;

    let mut report = StepReport {
        relative_wind: relative,
        twa,
        on_port_tack,
        in_no_go_zone,
        luffing,
        trim_efficiency: 1.0,
        tune_efficiency: 1.0,
        ..Default::default()
    };

    // 4. Tack trigger
    if tiller.abs() >= cfg.tack_trigger && in_no_go_zone && !boat.tack.is_committed() {
        let target = if on_port_tack {
            cfg.tack_target
        } else {
            -cfg.tack_target
        };
        boat.tack = TackState::Committed {
            target_relative_wind: target,
        };
        report.tack_started = true;
        log::debug!("Tack committed: relative wind {relative:.1} -> {target:.1}");
    }

    let potential = match boat.tack {
        TackState::Committed {
            target_relative_wind,
        } => {
            let diff = signed_degrees(target_relative_wind - relative);
            let turn = diff.signum() * diff.abs().min(cfg.tack_turn_rate);
            boat.heading = wrap_degrees(boat.heading + turn);

            let remaining = signed_degrees(
                target_relative_wind - relative_wind(boat.heading, wind.direction_shift),
            );
            if remaining.abs() <= cfg.tack_settle {
                boat.tack = TackState::Idle;
                report.tack_completed = true;
                log::debug!("Tack complete at heading {:.1}", boat.heading);
            }

            boat.boom_angle = -relative;
            boat.sail = SailState::Luffing;
            wind_speed * cfg.tack_speed_fraction
        }

        // 5. Head to wind or sheet eased past the wind: no drive
        TackState::Idle if in_no_go_zone || luffing => {
            boat.boom_angle = -relative;
            boat.sail = SailState::Luffing;
            0.0
        }

        // 6. Sailing
        TackState::Idle => {
            let target = polar.lookup(twa);
            let base = target.speed * (wind_speed / POLAR_REFERENCE_WIND);

            let trim = trim_efficiency(boat.sheet_angle, target.sheet, cfg);
            let tune = tuning_efficiency(&input.tuning, wind_speed, cfg);
            let drag = cfg.drag_coefficient * boat.speed * boat.speed;
            let turn_penalty = (1.0 - tiller.abs() / cfg.turn_drag_factor).max(0.0);

            report.trim_efficiency = trim;
            report.tune_efficiency = tune;

            boat.boom_angle = if on_port_tack {
                boat.sheet_angle
            } else {
                -boat.sheet_angle
            };
            boat.sail = if on_port_tack {
                SailState::Port
            } else {
                SailState::Starboard
            };

            (base - drag).max(0.0) * trim * turn_penalty * tune
        }
    };
    report.potential_speed = potential;

    // 7. Inertia: drag dominates, so the boat sheds speed faster than it builds it
    let rate = if potential > boat.speed {
        cfg.accel_rate
    } else {
        cfg.decel_rate
    };
    boat.speed = (boat.speed + (potential - boat.speed) * rate).max(0.0);

    // 8. Position (heading 0 = up the screen)
    boat.position += heading_vector(boat.heading) * boat.speed * cfg.distance_scale;

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::course::Course;
    use glam::Vec2;
    use proptest::prelude::*;

    fn boat(heading: f32, speed: f32) -> Boat {
        let mut boat = Boat::at(&Course::default_triangle().starting_position);
        boat.heading = heading;
        boat.speed = speed;
        boat
    }

    fn input(tiller: f32, sheet: f32) -> TickInput {
        TickInput {
            tiller,
            sheet,
            ..Default::default()
        }
    }

    fn ten_knots() -> Wind {
        Wind {
            speed: 10.0,
            direction_shift: 0.0,
        }
    }

    #[test]
    fn test_relative_wind() {
        assert_eq!(relative_wind(45.0, 0.0), 45.0);
        assert_eq!(relative_wind(315.0, 0.0), -45.0);
        assert_eq!(relative_wind(10.0, 20.0), -10.0);
        assert_eq!(relative_wind(180.0, 0.0), -180.0);
    }

    #[test]
    fn test_head_to_wind_decelerates_at_fast_rate() {
        let mut b = boat(0.0, 5.0);
        let report = step(&mut b, ten_knots(), &input(0.0, 50.0), &PolarTable::default(), &PhysicsSettings::default());
        assert!(report.in_no_go_zone);
        assert_eq!(report.potential_speed, 0.0);
        assert!((b.speed - 4.8).abs() < 1e-5);
        assert_eq!(b.sail, SailState::Luffing);
    }

    #[test]
    fn test_close_hauled_starboard_uses_polar_row() {
        let cfg = PhysicsSettings::default();
        let mut b = boat(45.0, 0.0);
        let report = step(&mut b, ten_knots(), &input(0.0, 10.0), &PolarTable::default(), &cfg);
        assert!(!report.on_port_tack);
        assert!(!report.luffing);
        assert_eq!(report.trim_efficiency, 1.0);
        // Tuning at 0 in 10 knots: ideal is +1, three controls one step off
        assert!((report.tune_efficiency - 0.91).abs() < 1e-5);
        assert!((report.potential_speed - 5.2 * 0.91).abs() < 1e-4);
        assert!((b.speed - 5.2 * 0.91 * 0.015).abs() < 1e-4);
        assert_eq!(b.sail, SailState::Starboard);
        assert_eq!(b.boom_angle, -10.0);
    }

    #[test]
    fn test_port_tack_boom_and_sail() {
        let mut b = boat(300.0, 3.0);
        let report = step(&mut b, ten_knots(), &input(0.0, 20.0), &PolarTable::default(), &PhysicsSettings::default());
        assert!(report.on_port_tack);
        assert_eq!(b.sail, SailState::Port);
        assert_eq!(b.boom_angle, 20.0);
    }

    #[test]
    fn test_sheet_eased_past_wind_luffs() {
        let mut b = boat(60.0, 4.0);
        let report = step(&mut b, ten_knots(), &input(0.0, 70.0), &PolarTable::default(), &PhysicsSettings::default());
        assert!(report.luffing);
        assert_eq!(report.potential_speed, 0.0);
        assert!(b.speed < 4.0);
    }

    #[test]
    fn test_tiller_deadband() {
        let mut b = boat(90.0, 0.0);
        step(&mut b, ten_knots(), &input(1.5, 45.0), &PolarTable::default(), &PhysicsSettings::default());
        assert_eq!(b.heading, 90.0);
        assert_eq!(b.tiller_angle, 0.0);
        step(&mut b, ten_knots(), &input(10.0, 45.0), &PolarTable::default(), &PhysicsSettings::default());
        assert!((b.heading - 90.4).abs() < 1e-4);
    }

    #[test]
    fn test_moves_along_heading() {
        let mut b = boat(90.0, 6.0);
        let start = b.position;
        step(&mut b, ten_knots(), &input(0.0, 45.0), &PolarTable::default(), &PhysicsSettings::default());
        let moved = b.position - start;
        assert!(moved.x > 0.0);
        assert!(moved.y.abs() < 1e-4);
    }

    #[test]
    fn test_tack_commits_and_completes() {
        let cfg = PhysicsSettings::default();
        let polar = PolarTable::default();
        // Port tack, 20 degrees off the wind, hard tiller
        let mut b = boat(340.0, 4.0);
        let report = step(&mut b, ten_knots(), &input(30.0, 15.0), &polar, &cfg);
        assert!(report.tack_started);
        assert_eq!(
            b.tack,
            TackState::Committed {
                target_relative_wind: 45.0
            }
        );
        assert!((report.potential_speed - 2.5).abs() < 1e-5);

        // A new trigger while committed does nothing
        let mut ticks = 1;
        while b.tack.is_committed() {
            let report = step(&mut b, ten_knots(), &input(30.0, 15.0), &polar, &cfg);
            assert!(!report.tack_started);
            ticks += 1;
            assert!(ticks < 100, "tack never settled");
        }
        let settled = relative_wind(b.heading, 0.0);
        assert!((settled - 45.0).abs() <= cfg.tack_settle);
        assert!(ticks <= 34);
    }

    #[test]
    fn test_starboard_tack_targets_port() {
        let mut b = boat(15.0, 4.0);
        step(&mut b, ten_knots(), &input(-20.0, 15.0), &PolarTable::default(), &PhysicsSettings::default());
        assert_eq!(
            b.tack,
            TackState::Committed {
                target_relative_wind: -45.0
            }
        );
    }

    #[test]
    fn test_tuning_efficiency_ideal_and_floor() {
        let cfg = PhysicsSettings::default();
        let ideal = SailTuning {
            outhaul: 2,
            vang: 2,
            downhaul: 2,
        };
        assert_eq!(tuning_efficiency(&ideal, 8.0, &cfg), 1.0);
        // 12 steps of error would be 0.64, floored at 0.75
        let worst = SailTuning {
            outhaul: -2,
            vang: -2,
            downhaul: -2,
        };
        assert_eq!(tuning_efficiency(&worst, 8.0, &cfg), 0.75);
    }

    #[test]
    fn test_trim_efficiency_shape() {
        let cfg = PhysicsSettings::default();
        assert_eq!(trim_efficiency(45.0, 45.0, &cfg), 1.0);
        assert!((trim_efficiency(63.0, 45.0, &cfg) - (-1.0f32).exp()).abs() < 1e-6);
        assert_eq!(trim_efficiency(0.0, 90.0, &cfg), 0.25);
    }

    #[test]
    fn test_ideal_tuning_bands() {
        assert_eq!(ideal_tuning(8.0), 2.0);
        assert_eq!(ideal_tuning(10.0), 1.0);
        assert_eq!(ideal_tuning(12.0), 0.0);
        assert_eq!(ideal_tuning(13.0), -1.0);
        assert_eq!(ideal_tuning(20.0), -2.0);
    }

    #[test]
    fn test_non_finite_controls_and_wind_are_replaced() {
        let cfg = PhysicsSettings::default();
        let polar = PolarTable::default();
        let mut b = boat(45.0, 4.0);
        b.sheet_angle = 20.0;
        let nan_wind = Wind {
            speed: f32::NAN,
            direction_shift: f32::NAN,
        };
        let report = step(&mut b, nan_wind, &input(f32::NAN, f32::INFINITY), &polar, &cfg);
        assert_eq!(b.heading, 45.0);
        assert_eq!(b.tiller_angle, 0.0);
        assert_eq!(b.sheet_angle, 20.0);
        assert_eq!(report.relative_wind, 45.0);
        assert!(b.speed.is_finite());

        for _ in 0..10 {
            step(&mut b, ten_knots(), &input(5.0, 20.0), &polar, &cfg);
        }
        assert!(b.heading >= 0.0 && b.heading < 360.0);
        assert!(b.position.is_finite());
        assert!(b.speed.is_finite());
    }

    proptest! {
        #[test]
        fn prop_heading_and_speed_stay_in_range(
            heading in 0.0f32..360.0,
            speed in 0.0f32..20.0,
            shift in -20.0f32..20.0,
            wind_speed in 0.0f32..30.0,
            steps in proptest::collection::vec((-90.0f32..90.0, 0.0f32..90.0), 1..60),
        ) {
            let cfg = PhysicsSettings::default();
            let polar = PolarTable::default();
            let wind = Wind { speed: wind_speed, direction_shift: shift };
            let mut b = boat(heading, speed);
            for (tiller, sheet) in steps {
                step(&mut b, wind, &input(tiller, sheet), &polar, &cfg);
                prop_assert!(b.heading >= 0.0 && b.heading < 360.0);
                prop_assert!(b.speed >= 0.0);
                prop_assert!(b.position.is_finite());
            }
        }

        #[test]
        fn prop_tack_terminates(heading in -25.0f32..25.0,tiller in prop_oneof![-90.0f32..-9.0, 9.0f32..90.0]) {
            let cfg = PhysicsSettings::default();
            let polar = PolarTable::default();
            let mut b = boat(wrap_degrees(heading), 3.0);
            b.position = Vec2::new(300.0, 250.0);
            step(&mut b, ten_knots(), &input(tiller, 15.0), &polar, &cfg);
            prop_assert!(b.tack.is_committed());
            let mut ticks = 0;
            while b.tack.is_committed() {
                step(&mut b, ten_knots(), &input(tiller, 15.0), &polar, &cfg);
                ticks += 1;
                // 45 + 30 degrees at 2 per tick
                prop_assert!(ticks <= 40);
            }
        }
    }
}
