//! Built-in demo cases.

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::DVector;

use dgf_mesh::{GridTags, Mesh, StructuredMesh, ingest};
use dgf_model::{PhysicalModel, SPECIFIC_HEAT_RATIO};
use dgf_solver::{
    ArtificialViscosityConfig, BoundaryKind, ConvectiveFluxScheme, DgSolver, Result, SolverConfig,
    TimeConfig, TimeScheme, ViewVariable,
};

const PI: f64 = std::f64::consts::PI;

/// A configured demo case, ready to run.
pub struct Case {
    pub name: &'static str,
    pub mesh: Mesh,
    pub solver: DgSolver,
    pub time: TimeConfig,
    pub view_variables: Vec<ViewVariable>,
}

pub fn available() -> &'static [&'static str] {
    &["advect-1d", "sod-1d", "vortex-2d"]
}

pub fn build(name: &str, iterations: Option<usize>, io_interval: usize) -> Result<Case> {
    match name {
        "advect-1d" => advect_1d(iterations.unwrap_or(20_000), io_interval),
        "sod-1d" => sod_1d(iterations.unwrap_or(2_000), io_interval),
        "vortex-2d" => vortex_2d(iterations.unwrap_or(5_000), io_interval),
        other => panic!("unknown case {other}; available: {:?}", available()),
    }
}

/// Periodic sinusoidal density advection at unit speed and uniform pressure.
fn advect_1d(iterations: usize, io_interval: usize) -> Result<Case> {
    let order = 3;
    let source = StructuredMesh::line(0.0, 2.0, 41, order, GridTags::default(), true);
    let mesh = ingest(&source, order)?;
    let model = PhysicalModel::compressible_euler(2.5);
    let mut solver = DgSolver::new(
        &mesh,
        model,
        SolverConfig {
            convective_flux: ConvectiveFluxScheme::LaxFriedrichs,
            ..Default::default()
        },
        HashMap::new(),
        None,
    )?;
    solver.apply_initial_condition(&mesh, &|x: &DVector<f64>| {
        let rho = 1.0 + 0.2 * (PI * x[0]).sin();
        DVector::from_vec(vec![rho, 1.0, SPECIFIC_HEAT_RATIO / rho])
    });
    Ok(Case {
        name: "advect-1d",
        mesh,
        solver,
        time: TimeConfig {
            scheme: TimeScheme::ForwardEuler,
            courant_friedrichs_lewy: 0.01,
            fixed_delta_time: Some(1e-4),
            iteration_start: 0,
            iteration_end: iterations,
            io_interval,
        },
        view_variables: vec![
            ViewVariable::Density,
            ViewVariable::Velocity,
            ViewVariable::Pressure,
        ],
    })
}

/// Sod shock tube with HLLC and shock-capturing artificial viscosity.
fn sod_1d(iterations: usize, io_interval: usize) -> Result<Case> {
    let order = 3;
    let source = StructuredMesh::line(0.0, 1.0, 101, order, GridTags::default(), false);
    let mesh = ingest(&source, order)?;
    let model = PhysicalModel::compressible_euler(2.5);
    let kinds: HashMap<usize, BoundaryKind> = [
        (1, BoundaryKind::RiemannFarfield),
        (2, BoundaryKind::RiemannFarfield),
    ]
    .into();
    let left = [1.0, 0.75, 1.4];
    let right = [0.125, 0.0, 0.8 * 1.4];
    let mut solver = DgSolver::new(
        &mesh,
        model,
        SolverConfig {
            convective_flux: ConvectiveFluxScheme::Hllc,
            shock_capturing: Some(ArtificialViscosityConfig {
                factor: 0.5,
                empirical_tolerance: 1.0,
            }),
            ..Default::default()
        },
        kinds,
        Some(Arc::new(move |_x: &DVector<f64>, _t, physical| {
            if physical == 1 {
                DVector::from_row_slice(&left)
            } else {
                DVector::from_row_slice(&right)
            }
        })),
    )?;
    solver.apply_initial_condition(&mesh, &move |x: &DVector<f64>| {
        if x[0] <= 0.5 {
            DVector::from_row_slice(&left)
        } else {
            DVector::from_row_slice(&right)
        }
    });
    Ok(Case {
        name: "sod-1d",
        mesh,
        solver,
        time: TimeConfig {
            scheme: TimeScheme::SspRk3,
            courant_friedrichs_lewy: 0.1,
            fixed_delta_time: Some(1e-4),
            iteration_start: 0,
            iteration_end: iterations,
            io_interval,
        },
        view_variables: vec![
            ViewVariable::Density,
            ViewVariable::Velocity,
            ViewVariable::Pressure,
            ViewVariable::MachNumber,
            ViewVariable::ArtificialViscosity,
        ],
    })
}

/// Doubly periodic isentropic vortex with the central flux.
fn vortex_2d(iterations: usize, io_interval: usize) -> Result<Case> {
    let order = 3;
    let source = StructuredMesh::quad_grid(
        (0.0, 1.0),
        (0.0, 1.0),
        40,
        40,
        order,
        GridTags::default(),
        true,
        true,
    );
    let mesh = ingest(&source, order)?;
    let model = PhysicalModel::compressible_euler(2.5);
    let mut solver = DgSolver::new(
        &mesh,
        model,
        SolverConfig {
            convective_flux: ConvectiveFluxScheme::Central,
            ..Default::default()
        },
        HashMap::new(),
        None,
    )?;
    let gamma = SPECIFIC_HEAT_RATIO;
    let beta = 5.0;
    let radius = 0.1;
    solver.apply_initial_condition(&mesh, &move |x: &DVector<f64>| {
        let dx = (x[0] - 0.5) / radius;
        let dy = (x[1] - 0.5) / radius;
        let r2 = dx * dx + dy * dy;
        let envelope = (beta / (2.0 * PI)) * ((1.0 - r2) / 2.0).exp();
        let temperature =
            1.0 - (gamma - 1.0) * beta * beta / (8.0 * gamma * PI * PI) * (1.0 - r2).exp();
        let rho = temperature.powf(1.0 / (gamma - 1.0));
        DVector::from_vec(vec![
            rho,
            1.0 - envelope * dy,
            envelope * dx,
            temperature,
        ])
    });
    Ok(Case {
        name: "vortex-2d",
        mesh,
        solver,
        time: TimeConfig {
            scheme: TimeScheme::SspRk3,
            courant_friedrichs_lewy: 0.1,
            fixed_delta_time: None,
            iteration_start: 0,
            iteration_end: iterations,
            io_interval,
        },
        view_variables: vec![
            ViewVariable::Density,
            ViewVariable::Velocity,
            ViewVariable::Pressure,
            ViewVariable::Entropy,
        ],
    })
}
