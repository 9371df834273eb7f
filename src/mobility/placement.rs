use crate::error::ConfigError;
use crate::geometry::{Rectangle, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Initial placement: uniform angle, uniform distance from `center`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomDisc {
    pub center: Vec2,
    pub rho_min: f64,
    pub rho_max: f64,
}

impl Default for RandomDisc {
    fn default() -> Self {
        Self {
            center: Vec2::new(50.0, 50.0),
            rho_min: 0.0,
            rho_max: 30.0,
        }
    }
}

impl RandomDisc {
    pub fn validate(&self, bounds: &Rectangle) -> Result<(), ConfigError> {
        if self.rho_min < 0.0 || self.rho_min > self.rho_max {
            return Err(ConfigError::InvalidRange {
                name: "rho",
                min: self.rho_min,
                max: self.rho_max,
            });
        }
        if !bounds.contains_disc(self.center, self.rho_max) {
            return Err(ConfigError::PlacementOutsideBounds {
                center: self.center,
                radius: self.rho_max,
                bounds: *bounds,
            });
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        let theta = rng.gen_range(0.0..TAU);
        let rho = if self.rho_max > self.rho_min {
            rng.gen_range(self.rho_min..=self.rho_max)
        } else {
            self.rho_min
        };
        self.center + Vec2::from_polar(theta, rho)
    }
}
