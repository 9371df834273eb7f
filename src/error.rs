use crate::geometry::{Rectangle, Vec2};
use thiserror::Error;

/// Rejected configuration. Raised while building agents, tasks or a
/// simulation, never mid-run.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid range for {name}: min {min} > max {max}")]
    InvalidRange { name: &'static str, min: f64, max: f64 },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("degenerate bounds {0:?}")]
    DegenerateBounds(Rectangle),

    #[error("placement disc centred at {center:?} with radius {radius} does not fit in {bounds:?}")]
    PlacementOutsideBounds { center: Vec2, radius: f64, bounds: Rectangle },

    #[error("simulation needs at least one publisher")]
    NoPublishers,

    #[error("failed to read config: {0}")]
    Parse(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("task {field} must be positive")]
    NonPositive { field: &'static str },

    #[error("agent {0} is not a publisher and never runs a publish cycle")]
    NotPublisher(u32),
}

#[derive(Debug, Error, PartialEq)]
pub enum MobilityError {
    #[error("position {position:?} lies outside {bounds:?}")]
    OutOfBounds { position: Vec2, bounds: Rectangle },

    #[error("unknown agent {0}")]
    UnknownAgent(u32),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
