//! Fixed timestep simulation tick
//!
//! One call advances the race by one frame in a fixed order: clock, wind,
//! boat physics, frame wrap, collisions and rules, then the display outputs.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{FlagBoard, FlagSignal};
use super::course::{MarkId, Sector};
use super::physics::{self, StepReport};
use super::rules::RacePhase;
use super::state::{RaceEvent, RaceState, SailState, SailTuning};
use super::wind::Wind;
use crate::consts::*;

/// Control values for a single tick, already validated and clamped
#[derive(Debug, Clone, PartialEq)]
pub struct TickInput {
    /// Degrees, positive turns to starboard
    pub tiller: f32,
    /// Degrees, 0..=90
    pub sheet: f32,
    pub tuning: SailTuning,
    /// External wind reading; the race's own wind model is used when absent
    pub wind: Option<Wind>,
    /// A penalty turn was just completed for this mark
    pub penalty_turn_complete: Option<MarkId>,
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            tiller: DEFAULT_TILLER,
            sheet: DEFAULT_SHEET,
            tuning: SailTuning::default(),
            wind: None,
            penalty_turn_complete: None,
        }
    }
}

/// How a mark should be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkVisibility {
    /// Not in the boat's sector
    Hidden,
    Untouched,
    Touched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkView {
    pub id: MarkId,
    pub visibility: MarkVisibility,
}

/// Everything the presentation layer needs after a tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub position: Vec2,
    pub sector: Sector,
    pub heading: f32,
    pub speed: f32,
    pub boom_angle: f32,
    pub sail: SailState,
    pub marks: Vec<MarkView>,
    pub penalty_active: bool,
    pub over_early: bool,
    pub flags: FlagBoard,
    /// `T-M:SS` or `+M:SS`
    pub clock: String,
    pub elapsed: f64,
    pub phase: RacePhase,
    pub wind: Wind,
    pub physics: StepReport,
    pub events: Vec<RaceEvent>,
}

/// Advance the race to caller time `now` (seconds)
pub fn tick(state: &mut RaceState, input: &TickInput, now: f64) -> TickReport {
    let mut events = Vec::new();

    // Clock first so a signal due this frame is seen by the rules this frame
    let elapsed = state.clock.tick(now);
    let signals = state.clock.take_signals();
    events.extend(signals.iter().copied().map(RaceEvent::Signal));

    // Wind
    let previous_wind = state.wind.current();
    let modelled = state.wind.advance(now);
    if modelled != previous_wind {
        events.push(RaceEvent::WindShift(modelled));
    }
    let wind = physics::finite_wind(input.wind.unwrap_or(modelled));

    // Boat
    let step = physics::step(&mut state.boat, wind, input, &state.polar, &state.settings.physics);
    let (position, sector) = state.course.frame.wrap(state.boat.position, state.boat.sector);
    if sector != state.boat.sector {
        log::debug!("Sector {:?} -> {:?}", state.boat.sector, sector);
    }
    state.boat.position = position;
    state.boat.sector = sector;

    // Rules
    let fix = state.fix();
    if signals.contains(&FlagSignal::StartSignal) {
        state.rules.on_start_signal(&fix, &state.course, &mut events);
    }
    if let Some(mark) = input.penalty_turn_complete {
        state.rules.complete_penalty_turn(mark, &state.course, &mut events);
    }
    let before = state.rules.phase();
    state.rules.update(elapsed, &fix, &state.course, &mut events);
    let phase = state.rules.phase();
    if phase.is_over() && !before.is_over() {
        state.clock.stop();
        if let Some(record) = state.rules.finish().copied() {
            state.issue_finish_ticket(record);
        }
    }
    state.clock.set_individual_recall(state.rules.over_early());

    // Display
    let penalty = state.rules.penalty();
    let marks = state
        .course
        .marks
        .iter()
        .map(|m| MarkView {
            id: m.id,
            visibility: if m.sector != sector {
                MarkVisibility::Hidden
            } else if penalty.is_touched(m.id) {
                MarkVisibility::Touched
            } else {
                MarkVisibility::Untouched
            },
        })
        .collect();

    TickReport {
        position,
        sector,
        heading: state.boat.heading,
        speed: state.boat.speed,
        boom_angle: state.boat.boom_angle,
        sail: state.boat.sail,
        marks,
        penalty_active: penalty.active,
        over_early: state.rules.over_early(),
        flags: state.clock.flags(),
        clock: state.clock.display(),
        elapsed: state.clock.elapsed(),
        phase,
        wind,
        physics: step,
        events,
    }
}

/// Turns variable frame times into whole fixed ticks
#[derive(Debug, Clone, Default)]
pub struct FrameStepper {
    accumulator: f64,
    sim_time: f64,
}

impl FrameStepper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulation time of the last tick
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Run as many ticks as `frame_dt` covers, capped at `MAX_SUBSTEPS`.
    /// Leftover time beyond the cap is dropped.
    pub fn advance(&mut self, state: &mut RaceState, input: &TickInput, frame_dt: f64) -> Vec<TickReport> {
        if !frame_dt.is_finite() || frame_dt < 0.0 {
            log::warn!("Ignoring frame time {frame_dt}");
            return Vec::new();
        }
        self.accumulator += frame_dt;
        let mut reports = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.sim_time += SIM_DT;
            reports.push(tick(state, input, self.sim_time));
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS && self.accumulator >= SIM_DT {
            log::debug!("Dropping {:.3}s of frame time", self.accumulator);
            self.accumulator = 0.0;
        }
        reports
    }

    /// Forget accumulated time (after a reset or a pause)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.sim_time = 0.0;
    }
}
