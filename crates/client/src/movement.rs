use glam::Vec3;

use netmesh::{Rotation, Transform};

const DEFAULT_ANGULAR_SPEED: f32 = 0.8;

/// Scripted local movement: walks a circle around the spawn point, facing along the path.
#[derive(Debug, Clone)]
pub struct CircleWalk {
    center: Vec3,
    radius: f32,
    angular_speed: f32,
    angle: f32,
}

impl CircleWalk {
    pub fn new(spawn: Vec3, radius: f32) -> Self {
        Self {
            center: spawn,
            radius,
            angular_speed: DEFAULT_ANGULAR_SPEED,
            angle: 0.0,
        }
    }

    pub fn with_angular_speed(mut self, angular_speed: f32) -> Self {
        self.angular_speed = angular_speed;
        self
    }

    pub fn step(&mut self, dt: f32) -> Transform {
        self.angle = (self.angle + self.angular_speed * dt) % std::f32::consts::TAU;
        self.current()
    }

    pub fn current(&self) -> Transform {
        let (sin, cos) = self.angle.sin_cos();
        let position = self.center + Vec3::new(cos * self.radius, 0.0, sin * self.radius);
        // Tangent of the circle, expressed as a heading about +Y.
        let yaw = -self.angle;
        Transform::new(position, Rotation::from_yaw(yaw))
    }
}
