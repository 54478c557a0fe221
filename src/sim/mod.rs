//! Deterministic simulation module
//!
//! All race logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (marks in course order, ids in sorted maps)
//! - No rendering, input-device or persistence dependencies

pub mod clock;
pub mod collision;
pub mod course;
pub mod geometry;
pub mod physics;
pub mod polar;
pub mod rules;
pub mod state;
pub mod tick;
pub mod wind;

pub use clock::{ClockPhase, FlagBoard, FlagSignal, RaceClock, format_elapsed};
pub use course::{Course, Frame, Mark, MarkId, MarkKind, Sector, StartLine};
pub use geometry::{PosedHull, Shape};
pub use physics::StepReport;
pub use polar::{PolarPoint, PolarSample, PolarTable};
pub use rules::{FinishRecord, PenaltyState, RacePhase, RaceRules, TouchState};
pub use state::{Boat, RaceEvent, RaceState, SailState, SailTuning, TackState};
pub use tick::{FrameStepper, MarkView, MarkVisibility, TickInput, TickReport, tick};
pub use wind::{Wind, WindModel};
