use serde::{Deserialize, Serialize};

/// Number of scene units (screen-like pixels, y down) per simulation meter.
///
/// All geometry is authored in scene units and converted once when it is
/// handed to the physics binding. The simulation itself runs in meters with
/// y up, so the conversion also flips the Y axis. The same constant and flip
/// apply to positions, shape extents, polygon vertices, and joint anchors;
/// mixing conventions misaligns cross-shape interactions.
pub const SCENE_UNITS_PER_METER: f32 = 20.0;

/// Convert a scene-unit length into simulation meters.
pub fn to_sim_len(len: f32) -> f32 {
    len / SCENE_UNITS_PER_METER
}

/// Convert a simulation length back into scene units.
pub fn to_scene_len(len: f32) -> f32 {
    len * SCENE_UNITS_PER_METER
}

/// 2D vector type used throughout Playbox2D. Scene or simulation units
/// depending on context; conversion happens at the physics boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the squared length of the vector (faster than `length()`).
    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len == 0.0 {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    /// Computes the distance between two points.
    pub fn distance(self, rhs: Self) -> f32 {
        (self - rhs).length()
    }

    /// Scene units (y down) to simulation meters (y up).
    pub fn to_sim(self) -> Self {
        Self::new(
            self.x / SCENE_UNITS_PER_METER,
            -self.y / SCENE_UNITS_PER_METER,
        )
    }

    /// Simulation meters (y up) back to scene units (y down).
    pub fn to_scene(self) -> Self {
        Self::new(
            self.x * SCENE_UNITS_PER_METER,
            -self.y * SCENE_UNITS_PER_METER,
        )
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from(value: (f32, f32)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Div<f32> for Vec2 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle in scene units, used for item geometry and
/// bounding boxes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_center(center: Vec2, w: f32, h: f32) -> Self {
        Self::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.w, self.y + self.h)
    }

    /// Grow the rectangle by `d` on every side. Negative values shrink it.
    pub fn expanded(&self, d: f32) -> Self {
        Self::new(self.x - d, self.y - d, self.w + 2.0 * d, self.h + 2.0 * d)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    /// Smallest rectangle containing every point in `points`. Empty input
    /// yields the zero rect.
    pub fn bounding(points: &[Vec2]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_conversion_round_trips_and_flips_y() {
        let p = Vec2::new(40.0, 100.0);
        let sim = p.to_sim();
        assert_eq!(sim, Vec2::new(2.0, -5.0));
        assert_eq!(sim.to_scene(), p);
    }

    #[test]
    fn rect_expand_and_bounds() {
        let r = Rect::new(0.0, 0.0, 10.0, 20.0).expanded(1.5);
        assert_eq!(r, Rect::new(-1.5, -1.5, 13.0, 23.0));

        let b = Rect::bounding(&[
            Vec2::new(-3.0, 2.0),
            Vec2::new(5.0, -1.0),
            Vec2::new(0.0, 7.0),
        ]);
        assert_eq!(b, Rect::new(-3.0, -1.0, 8.0, 8.0));
    }
}
