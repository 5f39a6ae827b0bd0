//! Analytic solid shapes and a rigid-body collider built from them.
//!
//! Signed distances are negative inside the solid.

use glam::DVec3;

use crate::field::{Collider3, Surface3};

/// Half-space. Solid lies on the side opposite `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane3 {
    pub normal: DVec3,
    pub point: DVec3,
}

impl Plane3 {
    pub fn new(normal: DVec3, point: DVec3) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
            point,
        }
    }
}

impl Surface3 for Plane3 {
    fn signed_distance(&self, p: DVec3) -> f64 {
        (p - self.point).dot(self.normal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere3 {
    pub center: DVec3,
    pub radius: f64,
}

impl Sphere3 {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl Surface3 for Sphere3 {
    fn signed_distance(&self, p: DVec3) -> f64 {
        (p - self.center).length() - self.radius
    }
}

/// Solid axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    pub lower: DVec3,
    pub upper: DVec3,
}

impl Box3 {
    pub fn new(lower: DVec3, upper: DVec3) -> Self {
        Self {
            lower: lower.min(upper),
            upper: lower.max(upper),
        }
    }
}

impl Surface3 for Box3 {
    fn signed_distance(&self, p: DVec3) -> f64 {
        let center = 0.5 * (self.lower + self.upper);
        let half = 0.5 * (self.upper - self.lower);
        let q = (p - center).abs() - half;
        // Outside: distance to the nearest point; inside: -(distance to nearest face)
        q.max(DVec3::ZERO).length() + q.max_element().min(0.0)
    }
}

/// Surface given by an arbitrary signed distance function.
pub struct ImplicitSurface3<F> {
    sdf: F,
}

impl<F> ImplicitSurface3<F>
where
    F: Fn(DVec3) -> f64 + Send + Sync,
{
    pub fn new(sdf: F) -> Self {
        Self { sdf }
    }
}

impl<F> Surface3 for ImplicitSurface3<F>
where
    F: Fn(DVec3) -> f64 + Send + Sync,
{
    fn signed_distance(&self, p: DVec3) -> f64 {
        (self.sdf)(p)
    }
}

/// Surface moving as a rigid body: `v(p) = linear + angular x (p - center_of_rotation)`.
pub struct RigidBodyCollider3 {
    surface: Box<dyn Surface3>,
    pub linear_velocity: DVec3,
    pub angular_velocity: DVec3,
    pub center_of_rotation: DVec3,
    pub friction_coefficient: f64,
}

impl RigidBodyCollider3 {
    /// Stationary, frictionless collider.
    pub fn new(surface: impl Surface3 + 'static) -> Self {
        Self {
            surface: Box::new(surface),
            linear_velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            center_of_rotation: DVec3::ZERO,
            friction_coefficient: 0.0,
        }
    }

    pub fn with_linear_velocity(mut self, velocity: DVec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular: DVec3, center: DVec3) -> Self {
        self.angular_velocity = angular;
        self.center_of_rotation = center;
        self
    }

    pub fn with_friction(mut self, coefficient: f64) -> Self {
        self.friction_coefficient = coefficient;
        self
    }
}

impl Collider3 for RigidBodyCollider3 {
    fn surface(&self) -> &dyn Surface3 {
        self.surface.as_ref()
    }

    fn velocity_at(&self, p: DVec3) -> DVec3 {
        self.linear_velocity + self.angular_velocity.cross(p - self.center_of_rotation)
    }

    fn friction_coefficient(&self) -> f64 {
        self.friction_coefficient
    }
}
