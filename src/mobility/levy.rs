// Levy flight over a bounded rectangle.
//
// Between resamples an agent moves in a straight line at velocity * step.
// Walls reflect: the coordinate is folded back into the bounds and the
// matching velocity component flips, so there is no retry loop near edges.

use super::{Mobility, MobilityConfig};
use crate::error::MobilityError;
use crate::geometry::{reflect_axis, Rectangle, Vec2};
use crate::time::SimTime;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Pareto, Uniform};
use std::f64::consts::TAU;
use tracing::trace;

#[derive(Debug)]
pub struct LevyWalk {
    config: MobilityConfig,
    // Unreflected motion anchored at `anchored_at`.
    origin: Vec2,
    velocity: Vec2,
    step_length: f64,
    anchored_at: SimTime,
    direction: Uniform<f64>,
    speed: Uniform<f64>,
    step: Pareto<f64>,
    rng: StdRng,
}

impl LevyWalk {
    pub fn new(config: MobilityConfig, start: Vec2, seed: u64) -> Result<Self, MobilityError> {
        config.validate()?;
        if !config.bounds.contains(start) {
            return Err(MobilityError::OutOfBounds {
                position: start,
                bounds: config.bounds,
            });
        }
        let step = Pareto::new(config.step_scale, config.alpha).map_err(|_| {
            crate::error::ConfigError::NonPositive {
                name: "alpha",
                value: config.alpha,
            }
        })?;

        Ok(Self {
            direction: Uniform::new(0.0, TAU),
            speed: Uniform::new_inclusive(config.speed_min, config.speed_max),
            step,
            origin: start,
            velocity: Vec2::ZERO,
            step_length: 0.0,
            anchored_at: SimTime::ZERO,
            rng: StdRng::seed_from_u64(seed),
            config,
        })
    }

    pub fn step_length(&self) -> f64 {
        self.step_length
    }

    fn displacement(&self, now: SimTime) -> Vec2 {
        let dt = now.saturating_sub(self.anchored_at).as_secs_f64();
        self.origin + self.velocity * (self.step_length * dt)
    }

    fn anchor(&mut self, position: Vec2, velocity: Vec2, now: SimTime) {
        self.origin = position;
        self.velocity = velocity;
        self.anchored_at = now;
    }
}

impl Mobility for LevyWalk {
    fn position(&self, now: SimTime) -> Vec2 {
        let raw = self.displacement(now);
        let b = &self.config.bounds;
        let (x, _) = reflect_axis(raw.x, b.x_min, b.x_max);
        let (y, _) = reflect_axis(raw.y, b.y_min, b.y_max);
        Vec2::new(x, y)
    }

    fn velocity(&self, now: SimTime) -> Vec2 {
        let raw = self.displacement(now);
        let b = &self.config.bounds;
        let (_, flip_x) = reflect_axis(raw.x, b.x_min, b.x_max);
        let (_, flip_y) = reflect_axis(raw.y, b.y_min, b.y_max);
        Vec2::new(
            if flip_x { -self.velocity.x } else { self.velocity.x },
            if flip_y { -self.velocity.y } else { self.velocity.y },
        )
    }

    fn bounds(&self) -> Rectangle {
        self.config.bounds
    }

    fn set_position(&mut self, position: Vec2, now: SimTime) -> Result<(), MobilityError> {
        if !self.config.bounds.contains(position) {
            return Err(MobilityError::OutOfBounds {
                position,
                bounds: self.config.bounds,
            });
        }
        let velocity = self.velocity(now);
        self.anchor(position, velocity, now);
        Ok(())
    }

    fn resample(&mut self, now: SimTime) -> Option<SimTime> {
        let here = self.position(now);
        let heading = self.direction.sample(&mut self.rng);
        let speed = self.speed.sample(&mut self.rng);
        self.step_length = self.step.sample(&mut self.rng);
        self.anchor(here, Vec2::from_polar(heading, speed), now);

        trace!(
            x = here.x,
            y = here.y,
            heading,
            speed,
            step = self.step_length,
            "levy resample"
        );
        Some(now + self.config.mode_time)
    }

    fn name(&self) -> &str {
        "levy"
    }
}
