//! The DG solver: configuration, setup and state ownership.
//!
//! [`DgSolver`] owns per-element modal state in arrays parallel to the mesh
//! arrays; the per-stage spatial operator lives in `spatial`, the iteration
//! loop in `time`.

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use dgf_io::checkpoint::{BlockLayout, CheckpointData, CheckpointLayout};
use dgf_mesh::Mesh;
use dgf_model::{PhysicalModel, VariableBatch, conserved_count, primitive_count};

use crate::boundary::{BoundaryKind, BoundaryTime};
use crate::error::{Result, SolverError};
use crate::flux::{ConvectiveFluxScheme, ViscousFluxScheme};
use crate::source::SourceTerm;
use crate::state::{AdjacencyFluxState, AdjacencyGroupState, ElementGroupState, ElementState};
use crate::viscosity::ArtificialViscosityConfig;

/// A pure initial-condition callback: primitive vector from coordinates.
pub type InitialConditionFn = dyn Fn(&DVector<f64>) -> DVector<f64> + Send + Sync;

/// A pure boundary-condition callback: primitive vector from coordinates,
/// time and the physical group index.
pub type BoundaryConditionFn = dyn Fn(&DVector<f64>, f64, usize) -> DVector<f64> + Send + Sync;

/// Spatial-operator configuration.
#[derive(Clone)]
pub struct SolverConfig {
    pub convective_flux: ConvectiveFluxScheme,
    pub viscous_flux: ViscousFluxScheme,
    pub shock_capturing: Option<ArtificialViscosityConfig>,
    pub source_term: SourceTerm,
    pub boundary_time: BoundaryTime,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            convective_flux: ConvectiveFluxScheme::LaxFriedrichs,
            viscous_flux: ViscousFluxScheme::None,
            shock_capturing: None,
            source_term: SourceTerm::None,
            boundary_time: BoundaryTime::Steady,
        }
    }
}

/// The DG solver state.
pub struct DgSolver {
    pub model: PhysicalModel,
    pub config: SolverConfig,
    pub groups: Vec<ElementGroupState>,
    pub adjacency: Vec<AdjacencyGroupState>,
    /// Artificial viscosity per mesh node.
    pub node_artificial_viscosity: DVector<f64>,
    /// Per-variable relative error of the last step.
    pub relative_error: DVector<f64>,
    pub(crate) boundary_kinds: HashMap<usize, BoundaryKind>,
    pub(crate) boundary_condition: Option<Arc<BoundaryConditionFn>>,
}

impl DgSolver {
    /// Build the solver state for a mesh, validating the configuration
    /// before the first step.
    pub fn new(
        mesh: &Mesh,
        model: PhysicalModel,
        config: SolverConfig,
        boundary_kinds: HashMap<usize, BoundaryKind>,
        boundary_condition: Option<Arc<BoundaryConditionFn>>,
    ) -> Result<Self> {
        validate_flux(&config, &model)?;
        let viscous = model.equation.is_viscous();
        let needs_gradient = viscous || config.shock_capturing.is_some();
        let needs_source = config.source_term.is_active();
        let dimension = mesh.dimension;

        let groups = mesh
            .element_groups
            .iter()
            .map(|group| ElementGroupState {
                elements: group
                    .elements
                    .iter()
                    .map(|_| {
                        ElementState::new(
                            dimension,
                            &group.basis,
                            if viscous { config.viscous_flux } else { ViscousFluxScheme::None },
                            needs_gradient,
                            needs_source,
                        )
                    })
                    .collect(),
            })
            .collect();

        let mut adjacency = Vec::with_capacity(mesh.adjacency_groups.len());
        for group in &mesh.adjacency_groups {
            let n_q = group.quadrature.len();
            let flux = group
                .elements
                .iter()
                .map(|_| AdjacencyFluxState::new(dimension, n_q, needs_gradient, viscous))
                .collect();
            let boundary_dummy = group
                .boundary()
                .iter()
                .map(|record| {
                    let physical_index = record
                        .physical_index
                        .expect("boundary faces carry a physical group after ingest");
                    let kind = boundary_kinds.get(&physical_index).copied().ok_or(
                        SolverError::MissingBoundaryCondition { physical_index },
                    )?;
                    if kind == BoundaryKind::Periodic {
                        return Err(SolverError::UnsupportedBoundaryKind {
                            kind: format!("{kind:?}"),
                            detail: format!(
                                "physical group {physical_index} still has boundary faces; \
                                 periodic groups must be paired at mesh ingest"
                            ),
                        });
                    }
                    if boundary_condition.is_none() {
                        return Err(SolverError::MissingBoundaryCondition { physical_index });
                    }
                    Ok(VariableBatch::zeros(dimension, n_q))
                })
                .collect::<Result<Vec<_>>>()?;
            adjacency.push(AdjacencyGroupState { flux, boundary_dummy });
        }

        let mut solver = Self {
            model,
            config,
            groups,
            adjacency,
            node_artificial_viscosity: DVector::zeros(mesh.node_count()),
            relative_error: DVector::zeros(conserved_count(dimension)),
            boundary_kinds,
            boundary_condition,
        };
        solver.refresh_boundary_dummy(mesh, 0.0);
        Ok(solver)
    }

    /// Sample the boundary callback into the dummy states.
    pub fn refresh_boundary_dummy(&mut self, mesh: &Mesh, time: f64) {
        let Some(callback) = self.boundary_condition.clone() else {
            return;
        };
        let model = self.model;
        let dimension = mesh.dimension;
        for (group_state, group) in self.adjacency.iter_mut().zip(&mesh.adjacency_groups) {
            group_state
                .boundary_dummy
                .par_iter_mut()
                .zip(group.boundary().par_iter())
                .for_each(|(dummy, record)| {
                    let physical_index =
                        record.physical_index.expect("boundary face has a group");
                    for j in 0..dummy.len() {
                        let coordinate = DVector::from_fn(dimension, |i, _| {
                            record.quadrature_node_coordinate[(i, j)]
                        });
                        let primitive = callback(&coordinate, time, physical_index);
                        debug_assert_eq!(primitive.len(), primitive_count(dimension));
                        dummy.set_primitive_column(&model, &primitive, j);
                    }
                    dummy.conserved_from_computational(&model);
                });
        }
    }

    /// Project an initial-condition callback onto the modal basis.
    pub fn apply_initial_condition(&mut self, mesh: &Mesh, initial: &InitialConditionFn) {
        let model = self.model;
        let dimension = mesh.dimension;
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            let basis = &group.basis;
            group_state
                .elements
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .for_each(|(state, record)| {
                    let n_q = basis.quadrature_count();
                    let mut batch = VariableBatch::zeros(dimension, n_q);
                    for j in 0..n_q {
                        let coordinate = DVector::from_fn(dimension, |i, _| {
                            record.quadrature_node_coordinate[(i, j)]
                        });
                        let primitive = initial(&coordinate);
                        batch.set_primitive_column(&model, &primitive, j);
                    }
                    batch.conserved_from_computational(&model);
                    // U = samples · ((ΦᵀΦ)⁻¹Φᵀ)ᵀ
                    state.coefficient = &batch.conserved * basis.least_squares.transpose();
                });
        }
    }

    /// Load modal coefficients (and gradients, when present) from checkpoint
    /// data with the same layout.
    pub fn load_checkpoint(&mut self, data: &CheckpointData) {
        for (group_state, group_data) in self.groups.iter_mut().zip(&data.coefficients) {
            for (state, coefficient) in group_state.elements.iter_mut().zip(group_data) {
                state.coefficient.copy_from(coefficient);
            }
        }
        if !data.gradients.is_empty() {
            for (group_state, group_data) in self.groups.iter_mut().zip(&data.gradients) {
                for (state, gradient) in group_state.elements.iter_mut().zip(group_data) {
                    if let Some(g) = state.gradient.as_mut() {
                        g.coefficient.copy_from(gradient);
                    }
                }
            }
        }
        self.node_artificial_viscosity
            .copy_from(&data.node_artificial_viscosity);
    }

    /// Load an order-(p−1) checkpoint by zero-padding the higher modal
    /// indices; `lower` maps each group's lower-order basis count.
    pub fn load_embedded_checkpoint(&mut self, data: &CheckpointData, lower_basis: &[usize]) {
        for ((group_state, group_data), &n_lower) in
            self.groups.iter_mut().zip(&data.coefficients).zip(lower_basis)
        {
            for (state, coefficient) in group_state.elements.iter_mut().zip(group_data) {
                state.coefficient.fill(0.0);
                for v in 0..coefficient.nrows() {
                    for b in 0..n_lower {
                        state.coefficient[(v, b)] = coefficient[(v, b)];
                    }
                }
            }
        }
        self.node_artificial_viscosity
            .copy_from(&data.node_artificial_viscosity);
    }

    /// The checkpoint layout of this solver/mesh pairing.
    pub fn checkpoint_layout(&self, mesh: &Mesh) -> CheckpointLayout {
        let n_c = conserved_count(mesh.dimension);
        let gradient_rows = if self.model.equation.is_viscous() {
            n_c * mesh.dimension
        } else {
            0
        };
        let volume = mesh
            .element_groups
            .iter()
            .map(|group| BlockLayout {
                element_count: group.elements.len(),
                basis_count: group.basis.basis_count(),
            })
            .collect();
        let boundary = mesh
            .adjacency_groups
            .iter()
            .map(|group| {
                group
                    .boundary()
                    .iter()
                    .map(|record| {
                        let parent = record.parents[0];
                        mesh.group(parent.shape)
                            .expect("parent group exists")
                            .basis
                            .basis_count()
                    })
                    .collect()
            })
            .collect();
        CheckpointLayout {
            conserved_rows: n_c,
            gradient_rows,
            volume,
            boundary,
            node_count: mesh.node_count(),
        }
    }

    /// Snapshot the modal state for a checkpoint write.
    pub fn checkpoint_data(&self, mesh: &Mesh) -> CheckpointData {
        let viscous = self.model.equation.is_viscous();
        let coefficients: Vec<Vec<DMatrix<f64>>> = self
            .groups
            .iter()
            .map(|g| g.elements.iter().map(|e| e.coefficient.clone()).collect())
            .collect();
        let gradients: Vec<Vec<DMatrix<f64>>> = if viscous {
            self.groups
                .iter()
                .map(|g| {
                    g.elements
                        .iter()
                        .map(|e| {
                            e.gradient
                                .as_ref()
                                .expect("viscous runs carry gradient state")
                                .coefficient
                                .clone()
                        })
                        .collect()
                })
                .collect()
        } else {
            Vec::new()
        };
        let mut boundary_coefficients = Vec::with_capacity(mesh.adjacency_groups.len());
        let mut boundary_gradients = Vec::with_capacity(mesh.adjacency_groups.len());
        for group in &mesh.adjacency_groups {
            let mut block = Vec::new();
            let mut gradient_block = Vec::new();
            for record in group.boundary() {
                let parent = record.parents[0];
                let group_index = mesh.group_index(parent.shape).expect("parent group");
                let state = &self.groups[group_index].elements[parent.element_index];
                block.push(state.coefficient.clone());
                if viscous {
                    gradient_block.push(
                        state
                            .gradient
                            .as_ref()
                            .expect("viscous runs carry gradient state")
                            .coefficient
                            .clone(),
                    );
                }
            }
            boundary_coefficients.push(block);
            boundary_gradients.push(gradient_block);
        }
        CheckpointData {
            coefficients,
            gradients,
            boundary_coefficients,
            boundary_gradients: if viscous { boundary_gradients } else { Vec::new() },
            node_artificial_viscosity: self.node_artificial_viscosity.clone(),
        }
    }

    /// Resume from the last checkpoint recorded in the run summary,
    /// returning the iteration to restart from.
    pub fn load_last_step(
        &mut self,
        mesh: &Mesh,
        output: &crate::time::OutputConfig,
    ) -> Result<usize> {
        let summary = dgf_io::RunSummary::load(&output.summary_path())?;
        let layout = self.checkpoint_layout(mesh);
        let data =
            dgf_io::read_checkpoint(&output.checkpoint_path(summary.iteration), &layout)?;
        self.load_checkpoint(&data);
        Ok(summary.iteration)
    }
}

fn validate_flux(config: &SolverConfig, model: &PhysicalModel) -> Result<()> {
    let compressible = model.equation.is_compressible();
    if model.equation.is_viscous() && config.viscous_flux == ViscousFluxScheme::None {
        return Err(SolverError::FluxModelMismatch {
            flux: "a Navier-Stokes run".into(),
            requirement: "the BR1 or BR2 viscous flux".into(),
        });
    }
    match config.convective_flux {
        ConvectiveFluxScheme::Hllc | ConvectiveFluxScheme::Roe if !compressible => {
            Err(SolverError::FluxModelMismatch {
                flux: format!("{:?}", config.convective_flux),
                requirement: "a compressible model".into(),
            })
        }
        ConvectiveFluxScheme::ExactAcoustic if compressible => {
            Err(SolverError::FluxModelMismatch {
                flux: "ExactAcoustic".into(),
                requirement: "a weakly compressible model".into(),
            })
        }
        _ => Ok(()),
    }
}

/// Find the group-state index and element index of a parent link.
pub(crate) fn parent_location(mesh: &Mesh, parent: &dgf_mesh::ParentLink) -> (usize, usize) {
    (
        mesh.group_index(parent.shape).expect("parent group exists"),
        parent.element_index,
    )
}
