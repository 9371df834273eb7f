use super::Mobility;
use crate::error::MobilityError;
use crate::geometry::{Rectangle, Vec2};
use crate::time::SimTime;

#[derive(Debug, Clone)]
pub struct Stationary {
    bounds: Rectangle,
    position: Vec2,
}

impl Stationary {
    pub fn new(bounds: Rectangle, position: Vec2) -> Result<Self, MobilityError> {
        if !bounds.contains(position) {
            return Err(MobilityError::OutOfBounds { position, bounds });
        }
        Ok(Self { bounds, position })
    }
}

impl Mobility for Stationary {
    fn position(&self, _now: SimTime) -> Vec2 {
        self.position
    }

    fn velocity(&self, _now: SimTime) -> Vec2 {
        Vec2::ZERO
    }

    fn bounds(&self) -> Rectangle {
        self.bounds
    }

    fn set_position(&mut self, position: Vec2, _now: SimTime) -> Result<(), MobilityError> {
        if !self.bounds.contains(position) {
            return Err(MobilityError::OutOfBounds {
                position,
                bounds: self.bounds,
            });
        }
        self.position = position;
        Ok(())
    }

    fn resample(&mut self, _now: SimTime) -> Option<SimTime> {
        None
    }

    fn name(&self) -> &str {
        "stationary"
    }
}
