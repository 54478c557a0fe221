//! True wind model
//!
//! Wind speed and direction shift, advanced on a fixed cadence. The shift is
//! an offset from the course axis (0° = wind straight down the course).

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_WIND_SHIFT, DEFAULT_WIND_SPEED};
use crate::settings::{WindSettings, WindStrategy};

/// Oscillation ramp (0 → +5 with pauses)
pub const SHIFT_PATTERN: [f32; 10] = [0.0, 0.0, 1.0, 1.0, 2.0, 3.0, 4.0, 4.0, 5.0, 5.0];

/// Current true wind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Knots, never negative
    pub speed: f32,
    /// Degrees, positive = veered
    pub direction_shift: f32,
}

impl Default for Wind {
    fn default() -> Self {
        Self {
            speed: DEFAULT_WIND_SPEED,
            direction_shift: DEFAULT_WIND_SHIFT,
        }
    }
}

impl Wind {
    /// Display label, e.g. `12 kn at +3°`
    pub fn label(&self) -> String {
        let sign = if self.direction_shift >= 0.0 { "+" } else { "" };
        format!("{:.0} kn at {}{:.0}°", self.speed, sign, self.direction_shift)
    }
}

/// Wind generator owned by the race context
#[derive(Debug, Clone)]
pub struct WindModel {
    settings: WindSettings,
    rng: Pcg32,
    current: Wind,
    favoured_speed: f32,
    /// Quarter of the oscillation: up, down, negative up, negative down
    phase: u8,
    pattern_index: usize,
    next_update: Option<f64>,
}

impl WindModel {
    pub fn new(settings: &WindSettings, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let favoured_speed = match settings.base_speed {
            Some(speed) => speed.max(0.0),
            None => rng.random_range(settings.favoured_min..=settings.favoured_max) as f32,
        };
        Self {
            settings: settings.clone(),
            rng,
            current: Wind {
                speed: favoured_speed,
                direction_shift: 0.0,
            },
            favoured_speed,
            phase: 0,
            pattern_index: 0,
            next_update: None,
        }
    }

    pub fn current(&self) -> Wind {
        self.current
    }

    pub fn favoured_speed(&self) -> f32 {
        self.favoured_speed
    }

    /// Advance to `now` (seconds). Steps at most once per call; the first call steps immediately.
    pub fn advance(&mut self, now: f64) -> Wind {
        let due = match self.next_update {
            None => true,
            Some(at) => now >= at,
        };
        if due {
            self.step();
            let interval = self.settings.interval;
            self.next_update = Some(match self.next_update {
                // Keep the cadence, but don't queue a backlog after a long stall
                Some(at) if now - at < interval => at + interval,
                _ => now + interval,
            });
        }
        self.current
    }

    fn step(&mut self) {
        let previous = self.current;
        match self.settings.strategy {
            WindStrategy::Pattern => self.step_pattern(),
            WindStrategy::RandomWalk => self.step_random_walk(),
        }
        if previous != self.current {
            log::debug!("Wind now {}", self.current.label());
        }
    }

    fn step_pattern(&mut self) {
        let last = SHIFT_PATTERN.len() - 1;
        let rising = SHIFT_PATTERN[self.pattern_index];
        let falling = SHIFT_PATTERN[last - self.pattern_index];
        self.current.direction_shift = match self.phase {
            0 => rising,
            1 => falling,
            2 => -rising,
            _ => -falling,
        };
        self.current.speed = self.favoured_speed;

        self.pattern_index += 1;
        if self.pattern_index > last {
            self.pattern_index = 0;
            self.phase = (self.phase + 1) % 4;
        }
    }

    fn step_random_walk(&mut self) {
        let limit = self.settings.shift_limit.abs();
        let gust = self.settings.gust_range.abs();
        self.current.direction_shift = self.rng.random_range(-limit..=limit) as f32;
        let fluctuation = self.rng.random_range(-gust..=gust) as f32;
        self.current.speed = (self.favoured_speed + fluctuation).max(self.settings.min_speed.max(0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pattern_settings() -> WindSettings {
        WindSettings {
            base_speed: Some(10.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_advance_is_immediate() {
        let mut model = WindModel::new(&pattern_settings(), 1);
        let wind = model.advance(0.0);
        assert_eq!(wind.speed, 10.0);
        assert_eq!(wind.direction_shift, 0.0);
    }

    #[test]
    fn test_advances_on_cadence_only() {
        let mut model = WindModel::new(&pattern_settings(), 1);
        model.advance(0.0);
        model.advance(5.0);
        assert_eq!(model.pattern_index, 1);
        model.advance(10.0);
        assert_eq!(model.pattern_index, 2);
        model.advance(19.9);
        assert_eq!(model.pattern_index, 2);
    }

    #[test]
    fn test_pattern_cycles_through_all_quarters() {
        let mut model = WindModel::new(&pattern_settings(), 1);
        let shifts: Vec<f32> = (0..40).map(|i| model.advance(i as f64 * 10.0).direction_shift).collect();
        assert_eq!(&shifts[0..10], &SHIFT_PATTERN);
        assert_eq!(shifts[10], 5.0);
        assert_eq!(shifts[19], 0.0);
        assert_eq!(shifts[28], -5.0);
        assert_eq!(shifts[39], 0.0);
        // Loops back to the first quarter
        assert_eq!(model.advance(400.0).direction_shift, 0.0);
        assert_eq!(model.phase, 0);
    }

    #[test]
    fn test_favoured_speed_drawn_in_range() {
        let settings = WindSettings::default();
        for seed in 0..50 {
            let model = WindModel::new(&settings, seed);
            assert!((8.0..=14.0).contains(&model.favoured_speed()));
        }
    }

    #[test]
    fn test_same_seed_same_wind() {
        let settings = WindSettings {
            strategy: WindStrategy::RandomWalk,
            ..Default::default()
        };
        let mut a = WindModel::new(&settings, 42);
        let mut b = WindModel::new(&settings, 42);
        for i in 0..20 {
            assert_eq!(a.advance(i as f64 * 10.0), b.advance(i as f64 * 10.0));
        }
    }

    proptest! {
        #[test]
        fn prop_random_walk_stays_bounded(seed in any::<u64>(), base in 0.0f32..30.0) {
            let settings = WindSettings {
                strategy: WindStrategy::RandomWalk,
                base_speed: Some(base),
                ..Default::default()
            };
            let mut model = WindModel::new(&settings, seed);
            for i in 0..30 {
                let wind = model.advance(i as f64 * 10.0);
                prop_assert!(wind.speed >= 5.0);
                prop_assert!(wind.direction_shift.abs() <= 20.0);
                prop_assert!(wind.speed <= base.max(5.0) + 2.0);
            }
        }
    }
}
