//! ILCA Sim headless driver
//!
//! Runs one race with a simple scripted helm and logs telemetry. Rendering
//! and pointer input live elsewhere; this binary exists to exercise the core.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use ilca_sim::consts::SIM_DT;
use ilca_sim::leaderboard::{self, Leaderboard, SubmissionOutcome};
use ilca_sim::settings::{Settings, WindStrategy};
use ilca_sim::sim::{Course, FrameStepper, PolarTable, RaceEvent, RaceState, TickInput, TickReport};
use ilca_sim::{ControlReader, TextControls};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindArg {
    Pattern,
    RandomWalk,
}

/// Single-handed dinghy race simulator
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings JSON; defaults are used for anything it leaves out
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Course JSON; the default triangle when omitted
    #[arg(long)]
    course: Option<PathBuf>,

    /// Override the wind RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the wind strategy
    #[arg(long, value_enum)]
    wind: Option<WindArg>,

    /// Seconds of race time to simulate, counted from the warning signal
    #[arg(long, default_value_t = 900.0)]
    duration: f64,

    /// Seconds on each tack before the helm tacks
    #[arg(long, default_value_t = 45.0)]
    leg: f64,

    /// Name submitted with a finish
    #[arg(long, default_value = "Sailor")]
    sailor: String,

    /// Leaderboard JSON to submit a finish to
    #[arg(long)]
    leaderboard: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Holds a close-hauled angle and tacks on a timer
struct Helm {
    leg: f64,
    port: bool,
    next_tack: f64,
}

impl Helm {
    fn new(leg: f64) -> Self {
        Self {
            leg,
            port: true,
            next_tack: leg,
        }
    }

    /// Fill in the text controls the way a UI would
    fn steer(&mut self, now: f64, last: Option<&TickReport>, polar: &PolarTable, controls: &mut TextControls) {
        if now >= self.next_tack {
            self.port = !self.port;
            self.next_tack = now + self.leg;
            log::debug!("Helm tacks onto {}", if self.port { "port" } else { "starboard" });
        }
        let target = if self.port { -45.0 } else { 45.0 };
        let (relative, sheet) = last
            .map(|r| (r.physics.relative_wind, polar.lookup(r.physics.twa).sheet))
            .unwrap_or((target, 10.0));
        let tiller = ((target - relative) * 2.0).clamp(-30.0, 30.0);
        controls.tiller = Some(format!("{tiller:+.1}°"));
        controls.sheet = Some(format!("{sheet:.1}"));
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut settings = match &args.settings {
        Some(path) => Settings::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(wind) = args.wind {
        settings.wind.strategy = match wind {
            WindArg::Pattern => WindStrategy::Pattern,
            WindArg::RandomWalk => WindStrategy::RandomWalk,
        };
    }
    let course = match &args.course {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<Course>(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Course::default_triangle(),
    };

    let mut state = RaceState::new(settings, course).context("race setup failed")?;
    log::info!("ILCA Sim starting (seed {:#x})", state.settings.seed);

    let mut stepper = FrameStepper::new();
    let mut reader = ControlReader::new();
    let mut controls = TextControls::default();
    let mut helm = Helm::new(args.leg);
    let mut last: Option<TickReport> = None;
    let mut next_log = 0.0;

    state.start(0.0);
    while stepper.sim_time() < args.duration && !state.rules.phase().is_over() {
        helm.steer(stepper.sim_time(), last.as_ref(), &state.polar, &mut controls);
        let input: TickInput = reader.read(&mut controls);

        for report in stepper.advance(&mut state, &input, SIM_DT) {
            for event in &report.events {
                log_event(event);
            }
            if stepper.sim_time() >= next_log {
                log::info!(
                    "{} {:?} pos ({:.0},{:.0}) hdg {:03.0} {:.2} kn {} | wind {}",
                    report.clock,
                    report.sector,
                    report.position.x,
                    report.position.y,
                    report.heading,
                    report.speed,
                    report.sail.as_str(),
                    report.wind.label()
                );
                next_log += 10.0;
            }
            last = Some(report);
        }
    }

    if let Some(ticket) = state.take_finish_ticket() {
        log::info!("Final time {:.2}s", ticket.record.total);
        if let Some(path) = &args.leaderboard {
            let mut board = Leaderboard::load(path);
            match leaderboard::submit(&mut board, &ticket, state.epoch(), &args.sailor) {
                SubmissionOutcome::Posted { top_ten, .. } => {
                    for (i, entry) in top_ten.iter().enumerate() {
                        log::info!("{:2}. {:<16} {:.2}s", i + 1, entry.sailor_name, entry.final_time);
                    }
                    if let Err(e) = board.save(path) {
                        log::warn!("Finish recorded locally, couldn't save the leaderboard: {e}");
                    }
                }
                SubmissionOutcome::LocalOnly { reason, .. } => {
                    log::warn!("Finish recorded locally only: {reason}");
                }
                SubmissionOutcome::Stale => {}
            }
        }
    } else {
        log::info!(
            "Race ended {:?} after {:.0}s, rounded {} of {} marks",
            state.rules.phase(),
            stepper.sim_time(),
            state.rules.penalty().rounded.len(),
            state.course.rounding_marks().count()
        );
    }
    Ok(())
}

fn log_event(event: &RaceEvent) {
    match event {
        RaceEvent::Signal(signal) => log::info!("Signal: {}", signal.as_str()),
        RaceEvent::WindShift(wind) => log::debug!("Wind {}", wind.label()),
        RaceEvent::Finished(record) => log::info!(
            "Finished in {:.2}s (+{:.0}s OCS, +{:.0}s line mark, +{:.1}s roundings)",
            record.total,
            record.ocs_penalty,
            record.finish_mark_penalty,
            record.rounding_penalty
        ),
        RaceEvent::DidNotFinish { missing } => log::info!("DNF, missing marks {missing:?}"),
        // The rules log these themselves
        _ => {}
    }
}
