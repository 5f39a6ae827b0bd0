//! Level-set helpers: inside tests, smeared kernels, interface fractions and
//! boundary friction.
//!
//! Signed distances are negative inside. Smeared kernels take `phi` in grid
//! units (distance divided by cell size).

use std::f64::consts::PI;

use glam::DVec3;

use crate::constants::SMEARING_HALF_WIDTH;

#[inline]
pub fn is_inside_sdf(phi: f64) -> bool {
    phi < 0.0
}

/// Smooth step from 0 (`phi <= -1.5`) to 1 (`phi >= 1.5`).
pub fn smeared_heaviside_sdf(phi: f64) -> f64 {
    if phi > SMEARING_HALF_WIDTH {
        1.0
    } else if phi < -SMEARING_HALF_WIDTH {
        0.0
    } else {
        0.5 + phi / (2.0 * SMEARING_HALF_WIDTH)
            + 0.5 / PI * (PI * phi / SMEARING_HALF_WIDTH).sin()
    }
}

/// Derivative of [`smeared_heaviside_sdf`]; zero outside `|phi| <= 1.5`.
pub fn smeared_delta_sdf(phi: f64) -> f64 {
    if phi.abs() > SMEARING_HALF_WIDTH {
        0.0
    } else {
        1.0 / (2.0 * SMEARING_HALF_WIDTH)
            + 1.0 / (2.0 * SMEARING_HALF_WIDTH) * (PI * phi / SMEARING_HALF_WIDTH).cos()
    }
}

/// Fraction of the segment between two samples that lies inside.
pub fn fraction_inside_sdf(phi0: f64, phi1: f64) -> f64 {
    match (is_inside_sdf(phi0), is_inside_sdf(phi1)) {
        (true, true) => 1.0,
        (true, false) => phi0 / (phi0 - phi1),
        (false, true) => phi1 / (phi1 - phi0),
        (false, false) => 0.0,
    }
}

/// Fraction of a square cell inside the level set, from its four corners.
pub fn fraction_inside(
    phi_bottom_left: f64,
    phi_bottom_right: f64,
    phi_top_left: f64,
    phi_top_right: f64,
) -> f64 {
    // Counter-clockwise corner order.
    let mut c = [phi_bottom_left, phi_bottom_right, phi_top_right, phi_top_left];
    let inside_count = c.iter().filter(|&&phi| is_inside_sdf(phi)).count();

    match inside_count {
        4 => 1.0,
        3 => {
            // Put the single outside corner first; cut off its triangle.
            rotate_until(&mut c, |c| !is_inside_sdf(c[0]));
            let side0 = 1.0 - fraction_inside_sdf(c[0], c[3]);
            let side1 = 1.0 - fraction_inside_sdf(c[0], c[1]);
            1.0 - 0.5 * side0 * side1
        }
        2 => {
            rotate_until(&mut c, |c| {
                is_inside_sdf(c[0]) && (is_inside_sdf(c[1]) || is_inside_sdf(c[2]))
            });
            if is_inside_sdf(c[1]) {
                // Adjacent: a trapezoid.
                let side_left = fraction_inside_sdf(c[0], c[3]);
                let side_right = fraction_inside_sdf(c[1], c[2]);
                0.5 * (side_left + side_right)
            } else {
                // Diagonal: the cell center decides which corners connect.
                let middle = 0.25 * c.iter().sum::<f64>();
                if is_inside_sdf(middle) {
                    let side1 = 1.0 - fraction_inside_sdf(c[0], c[3]);
                    let side3 = 1.0 - fraction_inside_sdf(c[2], c[3]);
                    let side2 = 1.0 - fraction_inside_sdf(c[2], c[1]);
                    let side0 = 1.0 - fraction_inside_sdf(c[0], c[1]);
                    1.0 - 0.5 * (side1 * side3 + side0 * side2)
                } else {
                    let side0 = fraction_inside_sdf(c[0], c[1]);
                    let side1 = fraction_inside_sdf(c[0], c[3]);
                    let side2 = fraction_inside_sdf(c[2], c[1]);
                    let side3 = fraction_inside_sdf(c[2], c[3]);
                    0.5 * (side0 * side1 + side2 * side3)
                }
            }
        }
        1 => {
            rotate_until(&mut c, |c| is_inside_sdf(c[0]));
            let side0 = fraction_inside_sdf(c[0], c[3]);
            let side1 = fraction_inside_sdf(c[0], c[1]);
            0.5 * side0 * side1
        }
        _ => 0.0,
    }
}

fn rotate_until(c: &mut [f64; 4], done: impl Fn(&[f64; 4]) -> bool) {
    for _ in 0..4 {
        if done(c) {
            return;
        }
        c.rotate_left(1);
    }
}

/// Maps NaN to 0 and clamps to `[0, 1]`.
#[inline]
pub fn sanitize_fraction(f: f64) -> f64 {
    if f.is_nan() {
        0.0
    } else {
        f.clamp(0.0, 1.0)
    }
}

/// Open (non-solid) fraction of a face whose endpoints see `phi0` and `phi1`
/// in the solid's level set.
#[inline]
pub fn open_fraction(phi0: f64, phi1: f64) -> f64 {
    1.0 - sanitize_fraction(fraction_inside_sdf(phi0, phi1))
}

/// Removes the normal component of `velocity` and damps the tangential part
/// by `friction` times the magnitude of the inward normal component.
pub fn project_and_apply_friction(velocity: DVec3, normal: DVec3, friction: f64) -> DVec3 {
    let velt = velocity - velocity.dot(normal) * normal;
    let speed_t = velt.length();
    if speed_t > 0.0 {
        let veln = (-velocity.dot(normal)).max(0.0);
        velt * (1.0 - friction * veln / speed_t).max(0.0)
    } else {
        velt
    }
}
