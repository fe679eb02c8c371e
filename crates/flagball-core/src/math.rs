use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A point or offset in world space. The field runs along the Z axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        (self - other).length()
    }

    /// Rotate around the vertical axis. A yaw of 0 faces +Z, positive yaw turns toward +X.
    pub fn rotate_y(self, yaw: f32) -> Vec3 {
        let (sin, cos) = yaw.sin_cos();
        Vec3 {
            x: self.x * cos + self.z * sin,
            y: self.y,
            z: -self.x * sin + self.z * cos,
        }
    }

    /// Same point moved `distance` along the field axis.
    pub fn along_field(self, distance: f32) -> Vec3 {
        Vec3 {
            z: self.z + distance,
            ..self
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Body position plus facing of a player, as reported by the host each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    /// Yaw in radians, 0 = facing +Z.
    pub heading: f32,
}

impl Pose {
    pub const fn new(position: Vec3, heading: f32) -> Self {
        Self { position, heading }
    }

    pub const fn at(x: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, 0.0, z),
            heading: 0.0,
        }
    }

    /// Transform a body-local offset into world space.
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.position + local.rotate_y(self.heading)
    }
}
