//! Racing rules state machine
//!
//! Consumes one position fix per tick and turns it into discrete rule events:
//! over early at the gun, mark touches, roundings and the finish. Every flag
//! here only moves forward except a touch, which goes back to untouched on an
//! explicit penalty-turn completion and nothing else.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision;
use super::course::{Course, MarkId, MarkKind, Sector};
use super::geometry::PosedHull;
use super::state::RaceEvent;
use crate::settings::RuleSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    /// Counting down to the start signal
    PreStart,
    Racing,
    Finished,
    /// Crossed the finish without rounding every mark
    Dnf,
}

impl RacePhase {
    pub fn is_over(&self) -> bool {
        matches!(self, RacePhase::Finished | RacePhase::Dnf)
    }
}

/// Per-mark contact state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TouchState {
    #[default]
    Untouched,
    /// Stays set until a penalty turn is completed for the mark
    Touched,
}

/// Penalties and progress accumulated by the boat
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyState {
    /// Any mark currently touched and not yet exonerated
    pub active: bool,
    pub marks_hit: BTreeMap<MarkId, TouchState>,
    /// Over the line at the start signal
    pub ocs: bool,
    pub rounded: BTreeSet<MarkId>,
    /// A start/finish line end is currently touched
    pub finish_mark_hit: bool,
}

impl PenaltyState {
    pub fn touch(&self, id: MarkId) -> TouchState {
        self.marks_hit.get(&id).copied().unwrap_or_default()
    }

    pub fn is_touched(&self, id: MarkId) -> bool {
        self.touch(id) == TouchState::Touched
    }

    fn refresh(&mut self, course: &Course) {
        self.active = self.marks_hit.values().any(|t| *t == TouchState::Touched);
        self.finish_mark_hit = course
            .marks
            .iter()
            .filter(|m| m.kind == MarkKind::LineEnd)
            .any(|m| self.is_touched(m.id));
    }
}

/// Where the boat is this tick, as the rules see it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub sector: Sector,
    /// Bow, in frame coordinates
    pub position: Vec2,
    pub hull: PosedHull,
    /// Nautical miles up the course from the start line's row
    pub progress: f32,
}

/// Scored result of a valid finish
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinishRecord {
    /// Race time at the crossing
    pub elapsed: f64,
    pub ocs_penalty: f64,
    pub finish_mark_penalty: f64,
    pub rounding_penalty: f64,
    pub rounding_touches: usize,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct RaceRules {
    settings: RuleSettings,
    phase: RacePhase,
    penalty: PenaltyState,
    over_early: bool,
    last_fix: Option<Fix>,
    finish: Option<FinishRecord>,
}

impl RaceRules {
    pub fn new(settings: &RuleSettings) -> Self {
        Self {
            settings: settings.clone(),
            phase: RacePhase::PreStart,
            penalty: PenaltyState::default(),
            over_early: false,
            last_fix: None,
            finish: None,
        }
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn penalty(&self) -> &PenaltyState {
        &self.penalty
    }

    /// Individual recall indicator
    pub fn over_early(&self) -> bool {
        self.over_early
    }

    pub fn finish(&self) -> Option<&FinishRecord> {
        self.finish.as_ref()
    }

    /// The gun: switch to racing and check for a boat over the line
    pub fn on_start_signal(&mut self, fix: &Fix, course: &Course, events: &mut Vec<RaceEvent>) {
        if self.phase != RacePhase::PreStart {
            return;
        }
        self.phase = RacePhase::Racing;
        log::info!("Start signal, racing");

        let Some(line) = course.start_line.as_ref() else {
            return;
        };
        let bow_over = fix.sector == line.sector && fix.position.y < line.y;
        if fix.progress > self.settings.ocs_progress_threshold || bow_over {
            self.penalty.ocs = true;
            self.over_early = true;
            log::info!(
                "Over early: progress {:.2} nm, bow y {:.1}",
                fix.progress,
                fix.position.y
            );
            events.push(RaceEvent::OverEarly);
        }
    }

    /// Evaluate touches, recall clearing, roundings and the finish for this tick
    pub fn update(&mut self, elapsed: f64, fix: &Fix, course: &Course, events: &mut Vec<RaceEvent>) {
        if self.phase.is_over() {
            return;
        }

        self.check_touches(fix, course, events);

        if self.phase == RacePhase::Racing {
            self.check_recall_cleared(fix, course, events);
            self.check_roundings(fix, course, events);
            self.check_finish(elapsed, fix, course, events);
        }

        self.last_fix = Some(*fix);
    }

    fn check_touches(&mut self, fix: &Fix, course: &Course, events: &mut Vec<RaceEvent>) {
        let mut touched = false;
        for mark in course.marks_in(fix.sector) {
            // Edge-triggered: a mark already touched is not re-tested
            if self.penalty.is_touched(mark.id) {
                continue;
            }
            if collision::test(&fix.hull, &mark.shape) {
                self.penalty.marks_hit.insert(mark.id, TouchState::Touched);
                log::info!("Mark {} ({}) touched", mark.id, mark.name);
                events.push(RaceEvent::MarkTouched(mark.id));
                touched = true;
            }
        }
        if touched {
            self.penalty.refresh(course);
        }
    }

    fn check_recall_cleared(&mut self, fix: &Fix, course: &Course, events: &mut Vec<RaceEvent>) {
        if !self.over_early {
            return;
        }
        let Some(line) = course.start_line.as_ref() else {
            return;
        };
        // Progress and the whole hull must both be back behind the line
        let hull_behind = fix.sector.row < line.sector.row || fix.hull.min_y() >= line.y;
        if fix.progress <= self.settings.ocs_progress_threshold && hull_behind {
            self.over_early = false;
            log::info!("Returned behind the line, recall cleared");
            events.push(RaceEvent::OverEarlyCleared);
        }
    }

    fn check_roundings(&mut self, fix: &Fix, course: &Course, events: &mut Vec<RaceEvent>) {
        for mark in course.rounding_marks() {
            if mark.sector != fix.sector || self.penalty.rounded.contains(&mark.id) {
                continue;
            }
            let Some(requirement) = mark.rounding else {
                continue;
            };
            let center = mark.shape.center();
            let aligned = (fix.position.y - center.y).abs() < self.settings.rounding_alignment;
            let past = (fix.position.x - center.x) * requirement.required_side_sign();
            if aligned && past > self.settings.rounding_clearance {
                self.penalty.rounded.insert(mark.id);
                log::info!("Mark {} ({}) rounded", mark.id, mark.name);
                events.push(RaceEvent::MarkRounded(mark.id));
            }
        }
    }

    fn check_finish(&mut self, elapsed: f64, fix: &Fix, course: &Course, events: &mut Vec<RaceEvent>) {
        if elapsed <= self.settings.finish_arm_delay.max(0.0) {
            return;
        }
        let (Some(line), Some(prev)) = (course.start_line.as_ref(), self.last_fix) else {
            return;
        };
        // A vertical wrap also changes the sector, so it never looks like a crossing
        if fix.sector != line.sector || prev.sector != fix.sector {
            return;
        }
        let crossed = prev.position.y >= line.y && fix.position.y < line.y;
        if !crossed || !line.spans(fix.position.x) {
            return;
        }

        let missing: Vec<MarkId> = course
            .rounding_marks()
            .map(|m| m.id)
            .filter(|id| !self.penalty.rounded.contains(id))
            .collect();
        if !missing.is_empty() {
            self.phase = RacePhase::Dnf;
            log::info!("Crossed the finish with marks missing: {missing:?}");
            events.push(RaceEvent::DidNotFinish { missing });
            return;
        }

        let record = self.score(elapsed, course);
        self.phase = RacePhase::Finished;
        self.finish = Some(record);
        log::info!(
            "Finished: {:.2}s elapsed, {:.2}s with penalties",
            record.elapsed,
            record.total
        );
        events.push(RaceEvent::Finished(record));
    }

    fn score(&self, elapsed: f64, course: &Course) -> FinishRecord {
        let s = &self.settings;
        let rounding_touches = course
            .rounding_marks()
            .filter(|m| self.penalty.is_touched(m.id))
            .count();
        let ocs_penalty = if self.penalty.ocs { s.ocs_penalty } else { 0.0 };
        let finish_mark_penalty = if self.penalty.finish_mark_hit {
            s.finish_mark_penalty
        } else {
            0.0
        };
        let rounding_penalty = elapsed * s.rounding_touch_fraction * rounding_touches as f64;
        FinishRecord {
            elapsed,
            ocs_penalty,
            finish_mark_penalty,
            rounding_penalty,
            rounding_touches,
            total: elapsed + ocs_penalty + finish_mark_penalty + rounding_penalty,
        }
    }

    /// Exonerate a touch. Returns false when the mark was not touched.
    pub fn complete_penalty_turn(&mut self, mark: MarkId, course: &Course, events: &mut Vec<RaceEvent>) -> bool {
        if !self.penalty.is_touched(mark) {
            return false;
        }
        self.penalty.marks_hit.insert(mark, TouchState::Untouched);
        self.penalty.refresh(course);
        log::info!("Penalty turn completed for mark {mark}");
        events.push(RaceEvent::PenaltyCleared(mark));
        true
    }
}
