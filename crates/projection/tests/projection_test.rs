//! Pressure projection scenario tests
//!
//! Full project() calls on planar grids: still fluid, a piston pushing a
//! liquid column, inflow through an open wall, and agreement between the
//! storage and solver options.

use std::sync::Arc;

use glam::DVec3;
use projection::boundary::GridBoundaryConditionSolver3;
use projection::level_set::is_inside_sdf;
use projection::prelude::*;
use projection::RecordingObserver;

fn planar_shape(nx: usize, ny: usize) -> GridShape {
    let h = 1.0 / nx as f64;
    GridShape::new(Size3::new(nx, ny, 1), DVec3::splat(h), DVec3::ZERO).unwrap()
}

fn divergence_in_fluid(velocity: &FaceCenteredGrid3, fluid: &dyn ScalarField3) -> f64 {
    let shape = *velocity.shape();
    velocity.max_abs_divergence(|i, j, k| is_inside_sdf(fluid.sample(shape.cell_center(i, j, k))))
}

/// Piston occupying `x < 0.25`, pushing right at 0.5.
fn piston() -> Arc<dyn Collider3> {
    let body = Box3::new(DVec3::splat(-1.0), DVec3::new(0.25, 2.0, 2.0));
    Arc::new(RigidBodyCollider3::new(body).with_linear_velocity(DVec3::new(0.5, 0.0, 0.0)))
}

fn column(p: DVec3) -> f64 {
    p.x - 0.75
}

/// Test that a still pool next to a still collider stays still
#[test]
fn test_zero_velocity_unchanged() {
    let shape = planar_shape(16, 16);
    let ball: Arc<dyn Collider3> = Arc::new(RigidBodyCollider3::new(Sphere3::new(DVec3::new(0.5, 0.3, 0.0), 0.15)));
    let fluid = |p: DVec3| p.y - 0.6;

    for variant in [SolverVariant::Fractional, SolverVariant::Blocked] {
        let mut projection = PressureProjection3::new(PressureSolverConfig::default(), variant).unwrap();
        projection.update_collider(Some(ball.clone()), &shape).unwrap();

        let input = FaceCenteredGrid3::new(shape);
        let mut output = FaceCenteredGrid3::new(shape);
        let stats = projection.project(&input, 1.0 / 60.0, &mut output, &fluid).unwrap();

        assert!(stats.converged, "{variant:?}: {stats:?}");
        for axis in 0..3 {
            assert!(
                output.component(axis).iter().all(|&v| v.abs() < 1e-9),
                "{variant:?}: axis {axis} picked up velocity"
            );
        }
    }
}

/// Test that fluid pushed by a piston moves with it (no-flux at the piston)
#[test]
fn test_piston_no_flux_fractional() {
    let shape = planar_shape(32, 8);
    let config = PressureSolverConfig {
        number_of_cg_iterations: 200,
        ..Default::default()
    };
    let mut projection = PressureProjection3::new(config, SolverVariant::Fractional).unwrap();
    projection.update_collider(Some(piston()), &shape).unwrap();

    let input = FaceCenteredGrid3::new(shape);
    let mut output = FaceCenteredGrid3::new(shape);
    let stats = projection.project(&input, 1.0 / 60.0, &mut output, &column).unwrap();
    assert!(stats.converged, "{stats:?}");

    // u faces from the piston face (x = 0.25) to the free surface (x = 0.75).
    for j in 0..8 {
        for i in 8..=24 {
            let u = output.u()[(i, j, 0)];
            assert!((u - 0.5).abs() < 1e-4, "u({i}, {j}) = {u}");
        }
        for i in 8..24 {
            let v = output.v()[(i, j, 0)];
            assert!(v.abs() < 1e-4, "v({i}, {j}) = {v}");
        }
    }
}

/// Test the piston with whole-cell boundaries and Gauss-Seidel
#[test]
fn test_piston_no_flux_blocked() {
    let shape = planar_shape(32, 8);
    let config = PressureSolverConfig {
        number_of_gauss_seidel_iterations: 20_000,
        ..Default::default()
    };
    let mut projection = PressureProjection3::new(config, SolverVariant::Blocked).unwrap();
    assert_eq!(
        projection.pressure_solver().linear_system_solver().kind(),
        LinearSolverKind::GaussSeidel
    );
    projection.update_collider(Some(piston()), &shape).unwrap();

    let input = FaceCenteredGrid3::new(shape);
    let mut output = FaceCenteredGrid3::new(shape);
    let stats = projection.project(&input, 1.0 / 60.0, &mut output, &column).unwrap();
    assert!(stats.converged, "{stats:?}");

    for j in 0..8 {
        for i in 8..=24 {
            let u = output.u()[(i, j, 0)];
            assert!((u - 0.5).abs() < 1e-4, "u({i}, {j}) = {u}");
        }
    }
    assert!(divergence_in_fluid(&output, &|p: DVec3| column(p).max(0.25 - p.x)) < 1e-6);
}

/// Test that inflow through an open wall leaves a divergence-free pool
#[test]
fn test_open_wall_inflow_divergence_free() {
    let n = 128;
    let shape = planar_shape(n, n);
    let config = PressureSolverConfig {
        closed_domain_boundary_flag: ClosedDomainBoundary::ALL
            .without(ClosedDomainBoundary::LEFT)
            .without(ClosedDomainBoundary::UP),
        tolerance: 1e-7,
        number_of_cg_iterations: 200,
        ..Default::default()
    };
    let mut projection = PressureProjection3::new(config, SolverVariant::Fractional).unwrap();
    projection.update_collider(None, &shape).unwrap();

    let fluid = |p: DVec3| p.y - 0.25;
    let mut input = FaceCenteredGrid3::new(shape);
    for j in 0..n {
        if shape.u_position(0, j, 0).y < 0.25 {
            input.u_mut()[(0, j, 0)] = 1.0;
        }
    }
    assert!(divergence_in_fluid(&input, &fluid) > 100.0);

    let mut output = FaceCenteredGrid3::new(shape);
    let stats = projection.project(&input, 1.0, &mut output, &fluid).unwrap();

    assert!(stats.converged, "{stats:?}");
    let divergence = divergence_in_fluid(&output, &fluid);
    assert!(divergence < 1e-6, "max divergence {divergence:e}");
    // The open wall keeps its inflow.
    assert_eq!(output.u()[(0, 5, 0)], 1.0);
}

/// Test that colliders with NaN distances or no volume still give a finite
/// velocity and open fractions inside [0, 1]
#[test]
fn test_degenerate_colliders_stay_finite() {
    let shape = planar_shape(16, 16);
    let fluid = |p: DVec3| p.y - 0.6;
    let colliders: [(&str, Arc<dyn Collider3>); 3] = [
        (
            "nan sdf",
            Arc::new(
                RigidBodyCollider3::new(ImplicitSurface3::new(|_: DVec3| f64::NAN))
                    .with_linear_velocity(DVec3::new(0.2, 0.0, 0.0)),
            ),
        ),
        (
            "flat box",
            Arc::new(RigidBodyCollider3::new(Box3::new(
                DVec3::new(0.3, 0.2, 0.0),
                DVec3::new(0.7, 0.2, 0.0),
            ))),
        ),
        (
            "point sphere",
            Arc::new(RigidBodyCollider3::new(Sphere3::new(DVec3::new(0.5, 0.3, 0.0), 0.0))),
        ),
    ];

    let mut input = FaceCenteredGrid3::new(shape);
    input.fill(DVec3::new(0.3, -0.2, 0.0));

    for (name, collider) in colliders {
        for variant in [SolverVariant::Fractional, SolverVariant::Blocked] {
            let mut projection = PressureProjection3::new(PressureSolverConfig::default(), variant).unwrap();
            projection.update_collider(Some(collider.clone()), &shape).unwrap();

            for (axis, fractions) in projection.boundary_solver().open_fractions().iter().enumerate() {
                assert!(
                    fractions.iter().all(|f| (0.0..=1.0).contains(f)),
                    "{name} / {variant:?}: open fraction out of range on axis {axis}"
                );
            }

            let mut output = FaceCenteredGrid3::new(shape);
            projection.project(&input, 1.0 / 60.0, &mut output, &fluid).unwrap();
            for axis in 0..3 {
                assert!(
                    output.component(axis).iter().all(|v| v.is_finite()),
                    "{name} / {variant:?}: non-finite velocity on axis {axis}"
                );
            }
        }
    }
}

/// Test that compressed and grid storage give the same projection
#[test]
fn test_compressed_matches_grid() {
    let shape = planar_shape(32, 32);
    let fluid = |p: DVec3| (p - DVec3::new(0.5, 0.4, 0.0)).length() - 0.3;
    let mut input = FaceCenteredGrid3::new(shape);
    input.fill_from(&|p: DVec3| DVec3::new(p.y - 0.5, 0.5 - p.x, 0.0) + DVec3::new(0.2, 0.0, 0.0));

    let project = |use_compressed: bool| {
        let config = PressureSolverConfig {
            use_compressed,
            linear_solver: Some(LinearSolverKind::Pcg),
            number_of_cg_iterations: 1000,
            tolerance: 1e-10,
            ..Default::default()
        };
        let mut projection = PressureProjection3::new(config, SolverVariant::Fractional).unwrap();
        projection.update_collider(None, &shape).unwrap();
        let mut output = FaceCenteredGrid3::new(shape);
        projection.project(&input, 0.1, &mut output, &fluid).unwrap();
        output
    };

    let grid = project(false);
    let compressed = project(true);
    for axis in 0..2 {
        for (a, b) in grid.component(axis).iter().zip(compressed.component(axis).iter()) {
            assert!((a - b).abs() < 1e-6, "axis {axis}: {a} vs {b}");
        }
    }
    assert!(divergence_in_fluid(&compressed, &fluid) < 1e-6);
}

/// Test that compressed storage with MGPCG selected still solves
#[test]
fn test_compressed_with_multigrid_falls_back() {
    let shape = planar_shape(16, 16);
    let config = PressureSolverConfig {
        use_compressed: true,
        number_of_cg_iterations: 500,
        ..Default::default()
    };
    let mut projection = PressureProjection3::new(config, SolverVariant::Fractional).unwrap();
    projection.update_collider(None, &shape).unwrap();

    let fluid = |p: DVec3| p.y - 0.5;
    let mut input = FaceCenteredGrid3::new(shape);
    input.fill_from(&|p: DVec3| DVec3::new(0.0, (std::f64::consts::PI * p.x).sin(), 0.0));
    let mut output = FaceCenteredGrid3::new(shape);
    let stats = projection.project(&input, 0.1, &mut output, &fluid).unwrap();

    assert!(stats.converged, "{stats:?}");
    assert!(divergence_in_fluid(&output, &fluid) < 1e-6);
}

/// Test that binding the same collider twice gives identical caches
#[test]
fn test_update_collider_idempotent() {
    let shape = planar_shape(24, 16);
    let collider: Arc<dyn Collider3> = Arc::new(
        RigidBodyCollider3::new(Sphere3::new(DVec3::new(0.4, 0.3, 0.0), 0.2))
            .with_angular_velocity(DVec3::Z, DVec3::new(0.4, 0.3, 0.0)),
    );

    for variant in [SolverVariant::Fractional, SolverVariant::Blocked] {
        let mut projection = PressureProjection3::new(PressureSolverConfig::default(), variant).unwrap();
        projection.update_collider(Some(collider.clone()), &shape).unwrap();
        let sdf = projection.boundary_solver().collider_sdf().data().clone();
        let velocity = projection.boundary_solver().collider_velocity_field().data().clone();
        let markers = match projection.boundary_solver() {
            GridBoundaryConditionSolver3::Blocked(s) => Some(s.marker().clone()),
            GridBoundaryConditionSolver3::Fractional(_) => None,
        };

        projection.update_collider(Some(collider.clone()), &shape).unwrap();
        let boundary = projection.boundary_solver();
        assert_eq!(boundary.collider_sdf().data(), &sdf);
        assert_eq!(boundary.collider_velocity_field().data(), &velocity);
        if let GridBoundaryConditionSolver3::Blocked(s) = boundary {
            assert_eq!(Some(s.marker()), markers.as_ref());
        }
    }
}

/// Test that a resized grid rebinds the collider on the next projection
#[test]
fn test_grid_change_rebinds_collider() {
    let mut projection = PressureProjection3::new(PressureSolverConfig::default(), SolverVariant::Fractional).unwrap();
    projection.update_collider(Some(piston()), &planar_shape(16, 8)).unwrap();

    let shape = planar_shape(32, 8);
    let input = FaceCenteredGrid3::new(shape);
    let mut output = FaceCenteredGrid3::new(shape);
    projection.project(&input, 1.0 / 60.0, &mut output, &column).unwrap();

    let boundary = projection.boundary_solver();
    assert_eq!(boundary.shape(), Some(&shape));
    assert!(boundary.collider().is_some());
    assert_eq!(boundary.collider_sdf().data().size(), shape.resolution);
}

/// Test that the observer sees every PCG iteration
#[test]
fn test_observer_records_residuals() {
    let shape = planar_shape(16, 16);
    let config = PressureSolverConfig {
        linear_solver: Some(LinearSolverKind::Pcg),
        number_of_cg_iterations: 500,
        ..Default::default()
    };
    let mut projection = PressureProjection3::new(config, SolverVariant::Fractional).unwrap();
    let observer = Arc::new(RecordingObserver::new());
    projection.set_observer(observer.clone());
    projection.update_collider(None, &shape).unwrap();

    let fluid = |p: DVec3| p.y - 0.5;
    let mut input = FaceCenteredGrid3::new(shape);
    input.fill_from(&|p: DVec3| DVec3::new(p.y, 0.0, 0.0));
    let mut output = FaceCenteredGrid3::new(shape);
    let stats = projection.project(&input, 0.1, &mut output, &fluid).unwrap();

    let history = observer.history();
    assert!(!history.is_empty());
    assert!(history.iter().all(|&(kind, _, _)| kind == LinearSolverKind::Pcg));
    assert_eq!(history.len() as u32, stats.iterations);
    assert_eq!(projection.pressure_solver().last_stats(), stats);
}

/// Test that Gauss-Seidel stopping at its cap still projects and says so
#[test]
fn test_capped_gauss_seidel_reports_not_converged() {
    let shape = planar_shape(16, 16);
    let config = PressureSolverConfig {
        number_of_gauss_seidel_iterations: 5,
        ..Default::default()
    };
    let mut projection = PressureProjection3::new(config, SolverVariant::Blocked).unwrap();
    projection.update_collider(None, &shape).unwrap();

    let fluid = |p: DVec3| p.y - 0.6;
    let mut input = FaceCenteredGrid3::new(shape);
    input.fill(DVec3::new(0.0, -9.8 / 60.0, 0.0));
    let mut output = FaceCenteredGrid3::new(shape);
    let stats = projection.project(&input, 1.0 / 60.0, &mut output, &fluid).unwrap();

    assert_eq!(stats.iterations, 5);
    assert!(!stats.converged, "{stats:?}");
    assert!(stats.residual.is_finite() && stats.residual > 1e-9);
    assert!(output.v().iter().all(|v| v.is_finite()));
}

/// Test that a bad time step is reported rather than projected
#[test]
fn test_invalid_time_step_is_an_error() {
    let shape = planar_shape(8, 8);
    let mut projection = PressureProjection3::new(PressureSolverConfig::default(), SolverVariant::Blocked).unwrap();
    let input = FaceCenteredGrid3::new(shape);
    let mut output = FaceCenteredGrid3::new(shape);
    let result = projection.project(&input, f64::NAN, &mut output, &|p: DVec3| p.y - 0.5);
    assert!(matches!(result, Err(ProjectionError::InvalidTimeStep(_))));
}
