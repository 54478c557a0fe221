//! Race state and core simulation types
//!
//! Everything a race mutates lives in one `RaceState`, owned by the driving
//! loop and handed to `tick` by reference. Reset rebuilds all of it at once.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{FlagSignal, RaceClock};
use super::course::{Course, MarkId, Sector, StartingPosition};
use super::geometry::PosedHull;
use super::polar::PolarTable;
use super::rules::{FinishRecord, Fix, RaceRules};
use super::wind::{Wind, WindModel};
use crate::error::SetupError;
use crate::leaderboard::FinishTicket;
use crate::settings::Settings;

/// Which side the sail is drawing on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SailState {
    Port,
    Starboard,
    #[default]
    Luffing,
}

impl SailState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SailState::Port => "port",
            SailState::Starboard => "starboard",
            SailState::Luffing => "luffing",
        }
    }
}

/// Automatic tack through the no-go zone
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TackState {
    #[default]
    Idle,
    /// Turning onto the new tack; heading is driven toward this relative wind
    Committed { target_relative_wind: f32 },
}

impl TackState {
    pub fn is_committed(&self) -> bool {
        matches!(self, TackState::Committed { .. })
    }
}

/// Outhaul, vang and downhaul settings, each in -2..=2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SailTuning {
    pub outhaul: i8,
    pub vang: i8,
    pub downhaul: i8,
}

/// The single boat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boat {
    /// Bow position in frame coordinates
    pub position: Vec2,
    pub sector: Sector,
    /// Degrees, [0, 360)
    pub heading: f32,
    /// Knots, never negative
    pub speed: f32,
    pub sheet_angle: f32,
    pub tiller_angle: f32,
    pub boom_angle: f32,
    pub tack: TackState,
    pub sail: SailState,
}

impl Boat {
    pub fn at(start: &StartingPosition) -> Self {
        Self {
            position: start.position,
            sector: start.sector,
            heading: crate::wrap_degrees(start.heading),
            speed: 0.0,
            sheet_angle: start.sheet,
            tiller_angle: 0.0,
            boom_angle: 0.0,
            tack: TackState::Idle,
            sail: SailState::Luffing,
        }
    }

    pub fn hull(&self) -> PosedHull {
        PosedHull::new(self.position, self.heading)
    }
}

/// Discrete things that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    Signal(FlagSignal),
    WindShift(Wind),
    /// Over the line at the start signal
    OverEarly,
    OverEarlyCleared,
    MarkTouched(MarkId),
    PenaltyCleared(MarkId),
    MarkRounded(MarkId),
    Finished(FinishRecord),
    DidNotFinish { missing: Vec<MarkId> },
}

/// Complete race context
#[derive(Debug, Clone)]
pub struct RaceState {
    pub settings: Settings,
    pub course: Course,
    pub polar: PolarTable,
    pub wind: WindModel,
    pub boat: Boat,
    pub rules: RaceRules,
    pub clock: RaceClock,
    /// Incremented by every reset; stale finish tickets carry an older value
    epoch: u64,
    finish_ticket: Option<FinishTicket>,
}

impl RaceState {
    /// Build a race on the reference polar, failing if the course or settings are unusable
    pub fn new(settings: Settings, course: Course) -> Result<Self, SetupError> {
        Self::with_polar(settings, course, PolarTable::default())
    }

    pub fn with_polar(settings: Settings, course: Course, polar: PolarTable) -> Result<Self, SetupError> {
        settings.validate()?;
        course.validate()?;
        log::info!(
            "Race set up: {} marks, seed {:#x}, wind {}",
            course.marks.len(),
            settings.seed,
            settings.wind.strategy.as_str()
        );
        Ok(Self {
            wind: WindModel::new(&settings.wind, settings.seed),
            boat: Boat::at(&course.starting_position),
            rules: RaceRules::new(&settings.rules),
            clock: RaceClock::new(&settings.clock),
            epoch: 0,
            finish_ticket: None,
            settings,
            course,
            polar,
        })
    }

    /// Return boat, penalties, clock and wind to their initial values together.
    /// Pending signals and any unsubmitted finish are dropped.
    pub fn reset(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.boat = Boat::at(&self.course.starting_position);
        self.rules = RaceRules::new(&self.settings.rules);
        self.clock.reset();
        self.wind = WindModel::new(&self.settings.wind, self.settings.seed.wrapping_add(self.epoch));
        if self.finish_ticket.take().is_some() {
            log::info!("Reset discarded an unsubmitted finish");
        }
        log::info!("Race reset (epoch {})", self.epoch);
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Begin the start sequence at caller time `now`
    pub fn start(&mut self, now: f64) {
        self.clock.start(now);
    }

    /// The boat's position as the rules see it
    pub fn fix(&self) -> Fix {
        let line_row = self.course.start_line.as_ref().map_or(0, |l| l.sector.row);
        let frame = self.course.frame;
        Fix {
            sector: self.boat.sector,
            position: self.boat.position,
            hull: self.boat.hull(),
            progress: frame.progress(self.boat.sector) - frame.progress(Sector::new(0, line_row)),
        }
    }

    pub(crate) fn issue_finish_ticket(&mut self, record: FinishRecord) {
        self.finish_ticket = Some(FinishTicket {
            epoch: self.epoch,
            record,
        });
    }

    /// Hand over the pending finish for submission, at most once
    pub fn take_finish_ticket(&mut self) -> Option<FinishTicket> {
        self.finish_ticket.take()
    }

    /// Does the ticket belong to the race currently in progress?
    pub fn is_current(&self, ticket: &FinishTicket) -> bool {
        ticket.epoch == self.epoch
    }
}
