//! Checkpoint round-trip through the solver and the lower-order embedding.

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::DVector;

use dgf_io::checkpoint::{read_checkpoint, write_checkpoint};
use dgf_mesh::{GridTags, StructuredMesh, ingest};
use dgf_model::{PhysicalModel, TransportModel};
use dgf_solver::{
    BoundaryKind, ConvectiveFluxScheme, DgSolver, SolverConfig, ViscousFluxScheme,
};

const PI: f64 = std::f64::consts::PI;

fn wavy(x: &DVector<f64>) -> DVector<f64> {
    let rho = 1.0 + 0.1 * (PI * x[0]).sin() * (PI * x[1]).cos();
    DVector::from_vec(vec![rho, 0.3, -0.1, 1.0 + 0.05 * (PI * x[0]).cos()])
}

fn build_solver(p: usize, viscous: bool) -> (dgf_mesh::Mesh, DgSolver) {
    let source = StructuredMesh::quad_grid(
        (0.0, 1.0),
        (0.0, 1.0),
        3,
        2,
        p,
        GridTags::default(),
        false,
        false,
    );
    let mesh = ingest(&source, p).unwrap();
    let model = if viscous {
        PhysicalModel::compressible_ns(2.5, TransportModel::Constant { dynamic_viscosity: 1e-2 })
    } else {
        PhysicalModel::compressible_euler(2.5)
    };
    let kinds: HashMap<usize, BoundaryKind> = [1, 2, 3, 4]
        .into_iter()
        .map(|tag| (tag, BoundaryKind::RiemannFarfield))
        .collect();
    let config = SolverConfig {
        convective_flux: ConvectiveFluxScheme::LaxFriedrichs,
        viscous_flux: if viscous { ViscousFluxScheme::Br2 } else { ViscousFluxScheme::None },
        ..Default::default()
    };
    let mut solver = DgSolver::new(
        &mesh,
        model,
        config,
        kinds,
        Some(Arc::new(|_x: &DVector<f64>, _t, _phys| {
            DVector::from_row_slice(&[1.0, 0.3, -0.1, 1.0])
        })),
    )
    .unwrap();
    solver.apply_initial_condition(&mesh, &wavy);
    (mesh, solver)
}

#[test]
fn write_then_read_is_the_identity_on_modal_coefficients() {
    let (mesh, mut solver) = build_solver(2, false);
    let layout = solver.checkpoint_layout(&mesh);
    let data = solver.checkpoint_data(&mesh);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state_100.zst");
    write_checkpoint(&path, &data).unwrap();
    let loaded = read_checkpoint(&path, &layout).unwrap();

    let originals: Vec<_> = solver.groups[0]
        .elements
        .iter()
        .map(|e| e.coefficient.clone())
        .collect();
    // Perturb, then restore from the file.
    for element in &mut solver.groups[0].elements {
        element.coefficient.fill(7.0);
    }
    solver.load_checkpoint(&loaded);
    for (element, original) in solver.groups[0].elements.iter().zip(&originals) {
        assert_eq!(&element.coefficient, original);
    }
}

#[test]
fn viscous_checkpoints_carry_gradient_blocks() {
    let (mesh, mut solver) = build_solver(2, true);
    // One step populates ∇U.
    solver.step(&mesh, dgf_solver::TimeScheme::ForwardEuler, 1e-5);
    let layout = solver.checkpoint_layout(&mesh);
    assert!(layout.gradient_rows > 0);
    let data = solver.checkpoint_data(&mesh);
    assert_eq!(data.gradients.len(), data.coefficients.len());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("viscous_10.zst");
    write_checkpoint(&path, &data).unwrap();
    let loaded = read_checkpoint(&path, &layout).unwrap();
    assert_eq!(
        loaded.gradients[0][0],
        solver.groups[0].elements[0]
            .gradient
            .as_ref()
            .unwrap()
            .coefficient
    );
}

#[test]
fn lower_order_checkpoint_embeds_by_zero_padding() {
    let (mesh_lo, solver_lo) = build_solver(2, false);
    let (mesh_hi, mut solver_hi) = build_solver(3, false);
    let data = solver_lo.checkpoint_data(&mesh_lo);
    let lower_basis: Vec<usize> = mesh_lo
        .element_groups
        .iter()
        .map(|g| g.basis.basis_count())
        .collect();
    solver_hi.load_embedded_checkpoint(&data, &lower_basis);

    // The embedded field evaluated at the lower-order reference nodes must
    // match the lower-order field exactly: the leading basis functions agree
    // between nested orders.
    let probe = dgf_mesh::ElementShape::Quadrangle.reference_nodes(2);
    let lo_basis = &mesh_lo.element_groups[0].basis;
    let hi_basis = &mesh_hi.element_groups[0].basis;
    let lo_values = lo_basis.evaluate(&probe);
    let hi_values = hi_basis.evaluate(&probe);
    for (lo_state, hi_state) in solver_lo.groups[0]
        .elements
        .iter()
        .zip(&solver_hi.groups[0].elements)
    {
        let lo_field = &lo_state.coefficient * lo_values.transpose();
        let hi_field = &hi_state.coefficient * hi_values.transpose();
        for v in 0..lo_field.nrows() {
            for q in 0..lo_field.ncols() {
                assert!(
                    (lo_field[(v, q)] - hi_field[(v, q)]).abs() < 1e-9,
                    "({v},{q}): {} vs {}",
                    lo_field[(v, q)],
                    hi_field[(v, q)]
                );
            }
        }
    }
}
