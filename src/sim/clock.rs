//! Race clock and start sequence
//!
//! Elapsed time starts at minus the pre-start duration and counts up through
//! the start signal. Flag signals are a virtual schedule keyed by elapsed
//! time: each tick pops whatever has come due, so a long frame still fires
//! every signal, in order, exactly once. `reset` drops the schedule.

use serde::{Deserialize, Serialize};

use crate::settings::ClockSettings;

/// Discrete start-sequence events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagSignal {
    /// Warning signal: class flag up
    ClassFlagUp,
    /// Preparatory flag up
    PreparatoryUp,
    /// One minute: preparatory flag down
    PreparatoryDown,
    /// Class flag down, race starts
    StartSignal,
}

impl FlagSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagSignal::ClassFlagUp => "class flag up",
            FlagSignal::PreparatoryUp => "preparatory flag up",
            FlagSignal::PreparatoryDown => "preparatory flag down",
            FlagSignal::StartSignal => "start",
        }
    }
}

/// Flags currently flown by the committee boat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlagBoard {
    pub class: bool,
    pub preparatory: bool,
    /// X flag, flown while the boat is over early
    pub individual_recall: bool,
}

impl FlagBoard {
    fn apply(&mut self, signal: FlagSignal) {
        match signal {
            FlagSignal::ClassFlagUp => self.class = true,
            FlagSignal::PreparatoryUp => self.preparatory = true,
            FlagSignal::PreparatoryDown => self.preparatory = false,
            FlagSignal::StartSignal => self.class = false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockPhase {
    /// Not started; elapsed holds at the pre-start offset
    Idle,
    Countdown,
    Running,
    /// Frozen at the finish
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Scheduled {
    at: f64,
    signal: FlagSignal,
}

/// Single race clock, owned by the race context
#[derive(Debug, Clone)]
pub struct RaceClock {
    settings: ClockSettings,
    /// Caller time at which elapsed reaches zero
    start_time: Option<f64>,
    elapsed: f64,
    phase: ClockPhase,
    /// Pending signals, ascending by `at`
    schedule: Vec<Scheduled>,
    fired: Vec<FlagSignal>,
    flags: FlagBoard,
    epoch: u64,
}

impl RaceClock {
    pub fn new(settings: &ClockSettings) -> Self {
        Self {
            settings: settings.clone(),
            start_time: None,
            elapsed: -settings.pre_start,
            phase: ClockPhase::Idle,
            schedule: Vec::new(),
            fired: Vec::new(),
            flags: FlagBoard::default(),
            epoch: 0,
        }
    }

    /// Begin the countdown at caller time `now`. The warning signal fires immediately.
    pub fn start(&mut self, now: f64) {
        if self.phase != ClockPhase::Idle {
            log::warn!("Clock already started (epoch {}), ignoring start", self.epoch);
            return;
        }
        if !now.is_finite() {
            log::warn!("Ignoring clock start at non-finite time {now}");
            return;
        }
        let c = &self.settings;
        self.start_time = Some(now + c.pre_start);
        self.elapsed = -c.pre_start;
        self.schedule = vec![
            Scheduled { at: -c.pre_start, signal: FlagSignal::ClassFlagUp },
            Scheduled { at: -c.preparatory_up, signal: FlagSignal::PreparatoryUp },
            Scheduled { at: -c.preparatory_down, signal: FlagSignal::PreparatoryDown },
            Scheduled { at: 0.0, signal: FlagSignal::StartSignal },
        ];
        self.phase = ClockPhase::Countdown;
        log::info!("Start sequence begun, {:.0}s to the gun", c.pre_start);
        self.fire_due();
    }

    /// Advance to caller time `now` and return elapsed seconds
    pub fn tick(&mut self, now: f64) -> f64 {
        let Some(start_time) = self.start_time else {
            return self.elapsed;
        };
        if !matches!(self.phase, ClockPhase::Countdown | ClockPhase::Running) {
            return self.elapsed;
        }
        if !now.is_finite() {
            log::warn!("Ignoring non-finite clock time {now}");
            return self.elapsed;
        }

        self.elapsed = now - start_time;
        self.fire_due();
        if self.elapsed >= 0.0 {
            self.phase = ClockPhase::Running;
        }
        self.elapsed
    }

    fn fire_due(&mut self) {
        let due = self.schedule.partition_point(|s| s.at <= self.elapsed);
        for entry in self.schedule.drain(..due) {
            log::debug!("Signal {} at {:.2}", entry.signal.as_str(), self.elapsed);
            self.flags.apply(entry.signal);
            self.fired.push(entry.signal);
        }
    }

    /// Signals fired since the last call, in schedule order
    pub fn take_signals(&mut self) -> Vec<FlagSignal> {
        std::mem::take(&mut self.fired)
    }

    /// Freeze the clock (finish or DNF)
    pub fn stop(&mut self) {
        if self.phase != ClockPhase::Idle {
            self.phase = ClockPhase::Stopped;
        }
    }

    /// Return to the pre-start state and cancel every pending signal
    pub fn reset(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.start_time = None;
        self.elapsed = -self.settings.pre_start;
        self.phase = ClockPhase::Idle;
        self.schedule.clear();
        self.fired.clear();
        self.flags = FlagBoard::default();
    }

    pub fn set_individual_recall(&mut self, flown: bool) {
        self.flags.individual_recall = flown;
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn flags(&self) -> FlagBoard {
        self.flags
    }

    /// Bumped on every reset
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn pending_signals(&self) -> usize {
        self.schedule.len()
    }

    /// `T-M:SS` before the gun, `+M:SS` after
    pub fn display(&self) -> String {
        format_elapsed(self.elapsed)
    }
}

/// Format signed elapsed seconds for the timer readout
pub fn format_elapsed(elapsed: f64) -> String {
    if elapsed < 0.0 {
        // Count down in whole seconds still to go
        let secs = (-elapsed).ceil() as u64;
        format!("T-{}:{:02}", secs / 60, secs % 60)
    } else {
        let secs = elapsed.floor() as u64;
        format!("+{}:{:02}", secs / 60, secs % 60)
    }
}
