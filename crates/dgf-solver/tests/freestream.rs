//! Freestream preservation: a constant primitive state must be a discrete
//! steady state of the operator on every mesh and boundary kind that admits
//! it.

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::DVector;

use dgf_mesh::{GridTags, StructuredMesh, ingest};
use dgf_model::PhysicalModel;
use dgf_solver::{
    BoundaryKind, ConvectiveFluxScheme, DgSolver, SolverConfig, TimeScheme,
};

fn max_coefficient_change(solver: &DgSolver) -> f64 {
    let mut delta: f64 = 0.0;
    for group in &solver.groups {
        for element in &group.elements {
            for (a, b) in element
                .coefficient
                .iter()
                .zip(element.coefficient_last.iter())
            {
                delta = delta.max((a - b).abs());
            }
        }
    }
    delta
}

#[test]
fn farfield_preserves_a_uniform_flow_in_2d() {
    let source = StructuredMesh::quad_grid(
        (0.0, 2.0),
        (0.0, 1.0),
        4,
        3,
        2,
        GridTags::default(),
        false,
        false,
    );
    let mesh = ingest(&source, 2).unwrap();
    let model = PhysicalModel::compressible_euler(2.5);
    let freestream = [1.0, 0.4, 0.2, 1.0];
    let kinds: HashMap<usize, BoundaryKind> = [1, 2, 3, 4]
        .into_iter()
        .map(|tag| (tag, BoundaryKind::RiemannFarfield))
        .collect();
    let config = SolverConfig {
        convective_flux: ConvectiveFluxScheme::Hllc,
        ..Default::default()
    };
    let mut solver = DgSolver::new(
        &mesh,
        model,
        config,
        kinds,
        Some(Arc::new(move |_coordinate: &DVector<f64>, _time, _physical| {
            DVector::from_row_slice(&freestream)
        })),
    )
    .unwrap();
    solver.apply_initial_condition(&mesh, &move |_x| DVector::from_row_slice(&freestream));

    solver.step(&mesh, TimeScheme::SspRk3, 1e-3);
    assert!(
        max_coefficient_change(&solver) < 1e-10,
        "coefficients moved by {}",
        max_coefficient_change(&solver)
    );
    for error in solver.relative_error.iter() {
        assert!(*error < 1e-10, "residual signal {error}");
    }
}

#[test]
fn slip_walls_preserve_a_resting_gas() {
    let source = StructuredMesh::quad_grid(
        (0.0, 1.0),
        (0.0, 1.0),
        3,
        3,
        2,
        GridTags::default(),
        false,
        false,
    );
    let mesh = ingest(&source, 2).unwrap();
    let model = PhysicalModel::compressible_euler(2.5);
    let rest = [1.0, 0.0, 0.0, 1.0];
    let kinds: HashMap<usize, BoundaryKind> = [1, 2, 3, 4]
        .into_iter()
        .map(|tag| (tag, BoundaryKind::AdiabaticSlipWall))
        .collect();
    let mut solver = DgSolver::new(
        &mesh,
        model,
        SolverConfig::default(),
        kinds,
        Some(Arc::new(move |_coordinate: &DVector<f64>, _time, _physical| {
            DVector::from_row_slice(&rest)
        })),
    )
    .unwrap();
    solver.apply_initial_condition(&mesh, &move |_x| DVector::from_row_slice(&rest));

    solver.step(&mesh, TimeScheme::ForwardEuler, 1e-3);
    assert!(max_coefficient_change(&solver) < 1e-11);
}

#[test]
fn periodic_mesh_preserves_a_uniform_flow() {
    let source = StructuredMesh::quad_grid(
        (0.0, 1.0),
        (0.0, 1.0),
        3,
        3,
        3,
        GridTags::default(),
        true,
        true,
    );
    let mesh = ingest(&source, 3).unwrap();
    let model = PhysicalModel::compressible_euler(2.5);
    let freestream = [1.0, 0.3, -0.5, 1.2];
    let mut solver = DgSolver::new(
        &mesh,
        model,
        SolverConfig {
            convective_flux: ConvectiveFluxScheme::Roe,
            ..Default::default()
        },
        HashMap::new(),
        None,
    )
    .unwrap();
    solver.apply_initial_condition(&mesh, &move |_x| DVector::from_row_slice(&freestream));

    solver.step(&mesh, TimeScheme::SspRk3, 1e-3);
    assert!(max_coefficient_change(&solver) < 1e-10);
}
