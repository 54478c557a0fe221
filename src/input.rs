//! Control input
//!
//! The presentation layer exposes controls through `InputProvider`. Every
//! getter may report a missing or malformed value; `ControlReader` turns
//! that into a clean `TickInput` using the last good value (or the
//! documented default) so a bad reading never reaches the physics.

use crate::consts::*;
use crate::error::InputError;
use crate::sim::course::MarkId;
use crate::sim::state::SailTuning;
use crate::sim::tick::TickInput;
use crate::sim::wind::Wind;

/// Typed access to the controls. `Ok(None)` means the source is unavailable.
pub trait InputProvider {
    fn tiller(&self) -> Result<Option<f32>, InputError>;
    fn sheet(&self) -> Result<Option<f32>, InputError>;
    fn outhaul(&self) -> Result<Option<i8>, InputError>;
    fn vang(&self) -> Result<Option<i8>, InputError>;
    fn downhaul(&self) -> Result<Option<i8>, InputError>;

    /// External wind display, knots
    fn wind_speed(&self) -> Result<Option<f32>, InputError> {
        Ok(None)
    }

    /// External wind display, degrees of shift
    fn wind_shift(&self) -> Result<Option<f32>, InputError> {
        Ok(None)
    }

    /// Consume a penalty-turn-complete signal, if one is pending
    fn take_penalty_turn(&mut self) -> Option<MarkId> {
        None
    }
}

/// Builds each tick's input from a provider
#[derive(Debug, Clone)]
pub struct ControlReader {
    last: TickInput,
    /// Wind comes from an external display rather than the race's wind model
    external_wind: bool,
    last_wind: Wind,
}

impl Default for ControlReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlReader {
    pub fn new() -> Self {
        Self {
            last: TickInput::default(),
            external_wind: false,
            last_wind: Wind::default(),
        }
    }

    /// Read wind from the provider; missing readings fall back to 10 kn at 0°
    pub fn with_external_wind(mut self) -> Self {
        self.external_wind = true;
        self
    }

    pub fn read(&mut self, provider: &mut impl InputProvider) -> TickInput {
        let last = &mut self.last;
        last.tiller = pick("tiller", provider.tiller(), last.tiller).clamp(-TILLER_LIMIT, TILLER_LIMIT);
        last.sheet = pick("sheet", provider.sheet(), last.sheet).clamp(0.0, SHEET_MAX);
        last.tuning = SailTuning {
            outhaul: pick_step("outhaul", provider.outhaul(), last.tuning.outhaul),
            vang: pick_step("vang", provider.vang(), last.tuning.vang),
            downhaul: pick_step("downhaul", provider.downhaul(), last.tuning.downhaul),
        };

        let wind = if self.external_wind {
            // An unavailable display means the documented default, not the last reading
            let speed = match provider.wind_speed() {
                Ok(None) => DEFAULT_WIND_SPEED,
                other => pick("wind speed", other, self.last_wind.speed).max(0.0),
            };
            let direction_shift = match provider.wind_shift() {
                Ok(None) => DEFAULT_WIND_SHIFT,
                other => pick("wind shift", other, self.last_wind.direction_shift),
            };
            self.last_wind = Wind {
                speed,
                direction_shift,
            };
            Some(self.last_wind)
        } else {
            None
        };

        TickInput {
            wind,
            penalty_turn_complete: provider.take_penalty_turn(),
            ..last.clone()
        }
    }
}

fn pick(control: &str, reading: Result<Option<f32>, InputError>, fallback: f32) -> f32 {
    match reading {
        Ok(Some(v)) if v.is_finite() => v,
        Ok(Some(v)) => {
            log::warn!("Ignoring non-finite {control} value {v}, keeping {fallback}");
            fallback
        }
        Ok(None) => fallback,
        Err(e) => {
            log::warn!("{e}, keeping {fallback}");
            fallback
        }
    }
}

fn pick_step(control: &str, reading: Result<Option<i8>, InputError>, fallback: i8) -> i8 {
    match reading {
        Ok(Some(v)) => v.clamp(-TUNING_LIMIT, TUNING_LIMIT),
        Ok(None) => fallback,
        Err(e) => {
            log::warn!("{e} for {control}, keeping {fallback}");
            fallback
        }
    }
}

/// Controls as the raw strings a form or console would hand over,
/// e.g. `"+5°"`, `" -3 "`, `"12 kn"`
#[derive(Debug, Clone, Default)]
pub struct TextControls {
    pub tiller: Option<String>,
    pub sheet: Option<String>,
    pub outhaul: Option<String>,
    pub vang: Option<String>,
    pub downhaul: Option<String>,
    pub wind_speed: Option<String>,
    pub wind_shift: Option<String>,
    pub penalty_turn: Option<MarkId>,
}

fn clean(raw: &str) -> &str {
    let s = raw.trim();
    let s = s.strip_suffix('°').unwrap_or(s);
    let s = s.strip_suffix("kn").unwrap_or(s);
    s.trim()
}

fn parse_angle(control: &'static str, raw: &Option<String>) -> Result<Option<f32>, InputError> {
    raw.as_deref()
        .map(|r| {
            clean(r).parse::<f32>().map_err(|_| InputError::Malformed {
                control,
                raw: r.to_string(),
            })
        })
        .transpose()
}

fn parse_step(control: &'static str, raw: &Option<String>) -> Result<Option<i8>, InputError> {
    raw.as_deref()
        .map(|r| {
            clean(r).parse::<i8>().map_err(|_| InputError::Malformed {
                control,
                raw: r.to_string(),
            })
        })
        .transpose()
}

impl InputProvider for TextControls {
    fn tiller(&self) -> Result<Option<f32>, InputError> {
        parse_angle("tiller", &self.tiller)
    }

    fn sheet(&self) -> Result<Option<f32>, InputError> {
        parse_angle("sheet", &self.sheet)
    }

    fn outhaul(&self) -> Result<Option<i8>, InputError> {
        parse_step("outhaul", &self.outhaul)
    }

    fn vang(&self) -> Result<Option<i8>, InputError> {
        parse_step("vang", &self.vang)
    }

    fn downhaul(&self) -> Result<Option<i8>, InputError> {
        parse_step("downhaul", &self.downhaul)
    }

    fn wind_speed(&self) -> Result<Option<f32>, InputError> {
        parse_angle("wind speed", &self.wind_speed)
    }

    fn wind_shift(&self) -> Result<Option<f32>, InputError> {
        parse_angle("wind shift", &self.wind_shift)
    }

    fn take_penalty_turn(&mut self) -> Option<MarkId> {
        self.penalty_turn.take()
    }
}
