//! Sampling interfaces for scalar fields, vector fields, surfaces and
//! colliders.
//!
//! Closures implement the field traits directly, so `|p: DVec3| p.y - 0.5`
//! works anywhere a [`ScalarField3`] is expected.

use glam::DVec3;

/// A scalar function of position. Used for signed distance fields.
pub trait ScalarField3: Send + Sync {
    fn sample(&self, p: DVec3) -> f64;
}

/// A vector function of position.
pub trait VectorField3: Send + Sync {
    fn sample(&self, p: DVec3) -> DVec3;
}

impl<F> ScalarField3 for F
where
    F: Fn(DVec3) -> f64 + Send + Sync,
{
    fn sample(&self, p: DVec3) -> f64 {
        self(p)
    }
}

impl<F> VectorField3 for F
where
    F: Fn(DVec3) -> DVec3 + Send + Sync,
{
    fn sample(&self, p: DVec3) -> DVec3 {
        self(p)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantScalarField(pub f64);

impl ScalarField3 for ConstantScalarField {
    fn sample(&self, _p: DVec3) -> f64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantVectorField(pub DVec3);

impl VectorField3 for ConstantVectorField {
    fn sample(&self, _p: DVec3) -> DVec3 {
        self.0
    }
}

/// Closed surface described by its signed distance (negative inside).
pub trait Surface3: Send + Sync {
    fn signed_distance(&self, p: DVec3) -> f64;

    fn is_inside(&self, p: DVec3) -> bool {
        self.signed_distance(p) < 0.0
    }
}

/// A solid obstacle with a surface and a velocity field.
pub trait Collider3: Send + Sync {
    fn surface(&self) -> &dyn Surface3;

    fn velocity_at(&self, p: DVec3) -> DVec3;

    /// Coulomb-style coefficient applied to tangential slip.
    fn friction_coefficient(&self) -> f64 {
        0.0
    }
}
