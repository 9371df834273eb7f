use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_polar(angle: f64, magnitude: f64) -> Self {
        Self::new(angle.cos() * magnitude, angle.sin() * magnitude)
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(&self, other: Vec2) -> f64 {
        (*self - other).length()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis aligned area an agent may roam in. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Rectangle {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0) || !self.width().is_finite() || !self.height().is_finite()
    }

    /// True when a disc of `radius` around `center` stays inside.
    pub fn contains_disc(&self, center: Vec2, radius: f64) -> bool {
        center.x - radius >= self.x_min
            && center.x + radius <= self.x_max
            && center.y - radius >= self.y_min
            && center.y + radius <= self.y_max
    }
}

impl Default for Rectangle {
    fn default() -> Self {
        Self::new(0.0, 100.0, 0.0, 100.0)
    }
}

/// Folds an unconstrained coordinate back into `[min, max]` as if it had
/// bounced off both walls. Returns the folded coordinate and whether the
/// number of bounces was odd (the velocity component is then inverted).
pub fn reflect_axis(value: f64, min: f64, max: f64) -> (f64, bool) {
    let span = max - min;
    if span <= 0.0 || !value.is_finite() {
        return (min, false);
    }
    let period = 2.0 * span;
    let mut u = (value - min).rem_euclid(period);
    // rem_euclid can round up to exactly `period`
    if u >= period {
        u = 0.0;
    }
    if u <= span {
        (min + u, false)
    } else {
        ((min + period - u).clamp(min, max), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_inside_is_identity() {
        assert_eq!(reflect_axis(42.0, 0.0, 100.0), (42.0, false));
    }

    #[test]
    fn reflect_past_upper_wall_bounces_back() {
        let (x, flipped) = reflect_axis(110.0, 0.0, 100.0);
        assert!((x - 90.0).abs() < 1e-9);
        assert!(flipped);
    }

    #[test]
    fn reflect_past_lower_wall_bounces_back() {
        let (x, flipped) = reflect_axis(-15.0, 0.0, 100.0);
        assert!((x - 15.0).abs() < 1e-9);
        assert!(flipped);
    }

    #[test]
    fn two_bounces_keep_direction() {
        let (x, flipped) = reflect_axis(230.0, 0.0, 100.0);
        assert!((x - 30.0).abs() < 1e-9);
        assert!(!flipped);
    }

    #[test]
    fn disc_fit() {
        let r = Rectangle::default();
        assert!(r.contains_disc(Vec2::new(50.0, 50.0), 30.0));
        assert!(!r.contains_disc(Vec2::new(100.0, 100.0), 30.0));
    }
}
