pub mod levy;
pub mod placement;
pub mod stationary;

pub use levy::LevyWalk;
pub use placement::RandomDisc;
pub use stationary::Stationary;

use crate::error::{ConfigError, MobilityError};
use crate::geometry::{Rectangle, Vec2};
use crate::time::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position source for one agent.
///
/// Implementations own their random stream so an agent's trajectory does not
/// depend on how many other agents draw numbers in between.
pub trait Mobility: Send + fmt::Debug {
    /// Position at `now`. Always inside `bounds()`.
    fn position(&self, now: SimTime) -> Vec2;
    fn velocity(&self, now: SimTime) -> Vec2;
    fn bounds(&self) -> Rectangle;

    /// Moves the agent directly. Points outside the bounds are rejected
    /// without touching the current state.
    fn set_position(&mut self, position: Vec2, now: SimTime) -> Result<(), MobilityError>;

    /// Draws a new heading and returns when the next resample is due,
    /// or `None` if this model never moves.
    fn resample(&mut self, now: SimTime) -> Option<SimTime>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MobilityKind {
    Levy,
    Stationary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobilityConfig {
    pub kind: MobilityKind,
    pub bounds: Rectangle,
    /// Interval between heading resamples.
    pub mode_time: SimTime,
    pub speed_min: f64,
    pub speed_max: f64,
    /// Pareto shape of the step length.
    pub alpha: f64,
    /// Pareto scale (minimum step length).
    pub step_scale: f64,
}

impl Default for MobilityConfig {
    fn default() -> Self {
        Self {
            kind: MobilityKind::Levy,
            bounds: Rectangle::default(),
            mode_time: SimTime::from_secs(1),
            speed_min: 2.0,
            speed_max: 4.0,
            alpha: 2.0,
            step_scale: 10.0,
        }
    }
}

impl MobilityConfig {
    pub fn stationary(bounds: Rectangle) -> Self {
        Self {
            kind: MobilityKind::Stationary,
            bounds,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bounds.is_degenerate() {
            return Err(ConfigError::DegenerateBounds(self.bounds));
        }
        if self.kind == MobilityKind::Stationary {
            return Ok(());
        }
        if self.mode_time.is_zero() {
            return Err(ConfigError::NonPositive { name: "mode_time", value: 0.0 });
        }
        if !(self.speed_min >= 0.0) {
            return Err(ConfigError::NonPositive { name: "speed_min", value: self.speed_min });
        }
        if self.speed_min > self.speed_max || !self.speed_max.is_finite() {
            return Err(ConfigError::InvalidRange {
                name: "speed",
                min: self.speed_min,
                max: self.speed_max,
            });
        }
        if !(self.alpha > 0.0) {
            return Err(ConfigError::NonPositive { name: "alpha", value: self.alpha });
        }
        if !(self.step_scale > 0.0) {
            return Err(ConfigError::NonPositive { name: "step_scale", value: self.step_scale });
        }
        Ok(())
    }

    /// Builds the configured model starting at `start`.
    pub fn build(&self, start: Vec2, seed: u64) -> Result<Box<dyn Mobility>, MobilityError> {
        match self.kind {
            MobilityKind::Levy => Ok(Box::new(LevyWalk::new(self.clone(), start, seed)?)),
            MobilityKind::Stationary => Ok(Box::new(Stationary::new(self.bounds, start)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MobilityConfig::default().validate().is_ok());
    }

    #[test]
    fn default_step_scale_matches_levy_model() {
        let config = MobilityConfig::default();
        assert_eq!(config.step_scale, 10.0);
        assert_eq!(config.alpha, 2.0);
    }

    #[test]
    fn inverted_speed_range_is_rejected() {
        let config = MobilityConfig {
            speed_min: 5.0,
            speed_max: 1.0,
            ..MobilityConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { name: "speed", .. })));
    }

    #[test]
    fn build_rejects_start_outside_bounds() {
        let config = MobilityConfig::default();
        let err = config.build(Vec2::new(-1.0, 50.0), 0).unwrap_err();
        assert!(matches!(err, MobilityError::OutOfBounds { .. }));
    }

    #[test]
    fn kind_uses_kebab_case() {
        let kind: MobilityKind = serde_json::from_str("\"stationary\"").unwrap();
        assert_eq!(kind, MobilityKind::Stationary);
    }
}
