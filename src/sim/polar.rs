//! Polar performance table
//!
//! Target boat speed and sheet angle by true wind angle, referenced at
//! 10 knots of wind. Lookups clamp to the table domain and interpolate
//! linearly between rows.

use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// One row of the polar table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarPoint {
    /// True wind angle (degrees, 0-180)
    pub twa: f32,
    /// Target speed (knots at reference wind)
    pub speed: f32,
    /// Target sheet angle (degrees)
    pub sheet: f32,
}

/// Interpolated target for a given TWA
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolarSample {
    pub speed: f32,
    pub sheet: f32,
}

const fn row(twa: f32, speed: f32, sheet: f32) -> PolarPoint {
    PolarPoint { twa, speed, sheet }
}

/// ILCA reference polar at 10 knots
pub const ILCA_POLAR: [PolarPoint; 6] = [
    row(30.0, 4.8, 3.0),
    row(45.0, 5.2, 10.0),
    row(60.0, 6.2, 20.0),
    row(90.0, 8.5, 45.0),
    row(135.0, 7.2, 75.0),
    row(175.0, 4.5, 90.0),
];

/// Validated, immutable polar table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<PolarPoint>", into = "Vec<PolarPoint>")]
pub struct PolarTable {
    rows: Vec<PolarPoint>,
}

impl Default for PolarTable {
    fn default() -> Self {
        Self {
            rows: ILCA_POLAR.to_vec(),
        }
    }
}

impl TryFrom<Vec<PolarPoint>> for PolarTable {
    type Error = SetupError;

    fn try_from(rows: Vec<PolarPoint>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

impl From<PolarTable> for Vec<PolarPoint> {
    fn from(table: PolarTable) -> Self {
        table.rows
    }
}

impl PolarTable {
    /// Build a table, rejecting anything interpolation can't handle
    pub fn new(rows: Vec<PolarPoint>) -> Result<Self, SetupError> {
        if rows.len() < 2 {
            return Err(SetupError::InvalidPolar(format!(
                "need at least 2 rows, got {}",
                rows.len()
            )));
        }
        for (i, p) in rows.iter().enumerate() {
            if !(p.twa.is_finite() && p.speed.is_finite() && p.sheet.is_finite()) {
                return Err(SetupError::InvalidPolar(format!("row {i} is not finite")));
            }
            if !(0.0..=180.0).contains(&p.twa) {
                return Err(SetupError::InvalidPolar(format!(
                    "row {i} twa {} outside 0-180",
                    p.twa
                )));
            }
            if p.speed < 0.0 {
                return Err(SetupError::InvalidPolar(format!("row {i} has negative speed")));
            }
        }
        if rows.windows(2).any(|w| w[1].twa <= w[0].twa) {
            return Err(SetupError::InvalidPolar(
                "twa must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[PolarPoint] {
        &self.rows
    }

    /// Smallest and largest TWA in the table
    pub fn domain(&self) -> (f32, f32) {
        (self.rows[0].twa, self.rows[self.rows.len() - 1].twa)
    }

    /// Interpolated target speed and sheet for `twa`
    pub fn lookup(&self, twa: f32) -> PolarSample {
        let (min, max) = self.domain();
        let twa = twa.clamp(min, max);

        // First row strictly past twa; the segment ends there
        let upper = self.rows.partition_point(|p| p.twa <= twa);
        if upper == self.rows.len() {
            let last = self.rows[upper - 1];
            return PolarSample {
                speed: last.speed,
                sheet: last.sheet,
            };
        }
        if upper == 0 {
            // Only reachable with a NaN query
            log::warn!("Polar lookup outside every segment (twa {twa})");
            return PolarSample::default();
        }

        let a = self.rows[upper - 1];
        let b = self.rows[upper];
        let t = (twa - a.twa) / (b.twa - a.twa);
        PolarSample {
            speed: a.speed + t * (b.speed - a.speed),
            sheet: a.sheet + t * (b.sheet - a.sheet),
        }
    }

    /// Lowest and highest target speed in the table
    pub fn speed_bounds(&self) -> (f32, f32) {
        self.rows
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.speed), hi.max(p.speed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_breakpoint() {
        let table = PolarTable::default();
        let sample = table.lookup(45.0);
        assert_eq!(sample.speed, 5.2);
        assert_eq!(sample.sheet, 10.0);
    }

    #[test]
    fn test_interpolates_midpoint() {
        let table = PolarTable::default();
        let sample = table.lookup(75.0);
        assert!((sample.speed - 7.35).abs() < 1e-4);
        assert!((sample.sheet - 32.5).abs() < 1e-4);
    }

    #[test]
    fn test_clamps_outside_domain() {
        let table = PolarTable::default();
        assert_eq!(table.lookup(0.0), table.lookup(30.0));
        assert_eq!(table.lookup(10.0).speed, 4.8);
        let last = table.lookup(180.0);
        assert_eq!(last.speed, 4.5);
        assert_eq!(last.sheet, 90.0);
    }

    #[test]
    fn test_nan_falls_back_to_zero() {
        let table = PolarTable::default();
        assert_eq!(table.lookup(f32::NAN), PolarSample::default());
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(PolarTable::new(vec![row(30.0, 4.0, 3.0)]).is_err());
        assert!(PolarTable::new(vec![row(60.0, 4.0, 3.0), row(30.0, 5.0, 9.0)]).is_err());
        assert!(PolarTable::new(vec![row(30.0, 4.0, 3.0), row(30.0, 5.0, 9.0)]).is_err());
        assert!(PolarTable::new(vec![row(30.0, f32::NAN, 3.0), row(60.0, 5.0, 9.0)]).is_err());
        assert!(PolarTable::new(vec![row(30.0, 4.0, 3.0), row(200.0, 5.0, 9.0)]).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<PolarTable, _> =
            serde_json::from_str(r#"[{"twa":30,"speed":4,"sheet":3},{"twa":90,"speed":8,"sheet":45}]"#);
        assert!(ok.is_ok());
        let bad: Result<PolarTable, _> = serde_json::from_str(r#"[{"twa":30,"speed":4,"sheet":3}]"#);
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn prop_lookup_bounded_by_table(twa in -90.0f32..270.0) {
            let table = PolarTable::default();
            let (lo, hi) = table.speed_bounds();
            let sample = table.lookup(twa);
            prop_assert!(sample.speed >= lo - 1e-4 && sample.speed <= hi + 1e-4);
        }

        #[test]
        fn prop_lookup_continuous(twa in 30.0f32..175.0) {
            let table = PolarTable::default();
            let eps = 1e-3;
            let a = table.lookup(twa);
            let b = table.lookup(twa + eps);
            // Steepest segment slope is under 1.3 deg of sheet per deg of twa
            prop_assert!((a.speed - b.speed).abs() < 0.01);
            prop_assert!((a.sheet - b.sheet).abs() < 0.01);
        }
    }

    #[test]
    fn test_continuous_at_each_breakpoint() {
        let table = PolarTable::default();
        for p in table.rows() {
            let below = table.lookup(p.twa - 1e-3);
            let above = table.lookup(p.twa + 1e-3);
            assert!((below.speed - p.speed).abs() < 1e-2);
            assert!((above.speed - p.speed).abs() < 1e-2);
            assert!((below.sheet - p.sheet).abs() < 1e-2);
        }
    }
}
