//! Per-element and per-adjacency solver state.
//!
//! State arrays are indexed parallel to the mesh's element and adjacency
//! groups; each element owns its modal tensors and quadrature buffers, each
//! adjacency owns the flux values it computes, which the elements then
//! gather. No state references another by pointer.

use nalgebra::{DMatrix, DVector};

use dgf_mesh::BasisTable;
use dgf_model::{GradientBatch, PhysicalModel, VariableBatch, conserved_count};

use crate::flux::ViscousFluxScheme;

/// Modal and quadrature state of one volume element.
#[derive(Debug, Clone)]
pub struct ElementState {
    /// Modal coefficients `U`, `N_c × N_b`.
    pub coefficient: DMatrix<f64>,
    /// Snapshot at RK-step entry.
    pub coefficient_last: DMatrix<f64>,
    /// Residual `R`, `N_c × N_b`.
    pub residual: DMatrix<f64>,
    /// Volume flux buffer `V`, `N_c × d·N_q`.
    pub volume_quadrature: DMatrix<f64>,
    /// Adjacency flux buffer `A`, `N_c × Σ N_qa`.
    pub adjacency_quadrature: DMatrix<f64>,
    /// Source buffer `S`, `N_c × N_q` (empty when no source is active).
    pub source_quadrature: DMatrix<f64>,
    /// Artificial viscosity per basic vertex.
    pub artificial_viscosity: DVector<f64>,
    /// Auxiliary gradient state (viscous or shock-capturing runs).
    pub gradient: Option<GradientState>,
}

/// Auxiliary-gradient tensors of one element.
#[derive(Debug, Clone)]
pub struct GradientState {
    /// Volume gradient quadrature buffer, `(N_c·d) × (d·N_q)`.
    pub volume_quadrature: DMatrix<f64>,
    /// Volume-gradient face flux buffer, `(N_c·d) × Σ N_qa`.
    pub volume_adjacency_quadrature: DMatrix<f64>,
    /// Interface-gradient face flux buffer (viscous only).
    pub interface_adjacency_quadrature: DMatrix<f64>,
    /// Volume gradient residual, `(N_c·d) × N_b`.
    pub volume_residual: DMatrix<f64>,
    /// Interface residuals: one for BR1, one per face for BR2.
    pub interface_residual: Vec<DMatrix<f64>>,
    /// `G = M⁻¹ · volume residual`.
    pub volume_coefficient: DMatrix<f64>,
    /// Lifted interface coefficients `H` (one for BR1, per face for BR2).
    pub interface_coefficient: Vec<DMatrix<f64>>,
    /// Full gradient coefficients ∇U = G + Σ H.
    pub coefficient: DMatrix<f64>,
}

impl ElementState {
    pub fn new(
        dimension: usize,
        basis: &BasisTable,
        viscous: ViscousFluxScheme,
        needs_gradient: bool,
        needs_source: bool,
    ) -> Self {
        let n_c = conserved_count(dimension);
        let n_b = basis.basis_count();
        let n_q = basis.quadrature_count();
        let n_qa = basis.adjacency_quadrature_count();
        let gradient = needs_gradient.then(|| {
            let lift_count = match viscous {
                ViscousFluxScheme::None => 0,
                ViscousFluxScheme::Br1 => 1,
                ViscousFluxScheme::Br2 => basis.shape.face_count(),
            };
            GradientState {
                volume_quadrature: DMatrix::zeros(n_c * dimension, dimension * n_q),
                volume_adjacency_quadrature: DMatrix::zeros(n_c * dimension, n_qa),
                interface_adjacency_quadrature: if lift_count > 0 {
                    DMatrix::zeros(n_c * dimension, n_qa)
                } else {
                    DMatrix::zeros(0, 0)
                },
                volume_residual: DMatrix::zeros(n_c * dimension, n_b),
                interface_residual: vec![DMatrix::zeros(n_c * dimension, n_b); lift_count],
                volume_coefficient: DMatrix::zeros(n_c * dimension, n_b),
                interface_coefficient: vec![DMatrix::zeros(n_c * dimension, n_b); lift_count],
                coefficient: DMatrix::zeros(n_c * dimension, n_b),
            }
        });
        Self {
            coefficient: DMatrix::zeros(n_c, n_b),
            coefficient_last: DMatrix::zeros(n_c, n_b),
            residual: DMatrix::zeros(n_c, n_b),
            volume_quadrature: DMatrix::zeros(n_c, dimension * n_q),
            adjacency_quadrature: DMatrix::zeros(n_c, n_qa),
            source_quadrature: if needs_source {
                DMatrix::zeros(n_c, n_q)
            } else {
                DMatrix::zeros(0, 0)
            },
            artificial_viscosity: DVector::zeros(basis.shape.vertex_count()),
            gradient,
        }
    }

    /// Conserved values at the interior quadrature points, `N_c × N_q`.
    pub fn quadrature_variable(
        &self,
        basis: &BasisTable,
        model: &PhysicalModel,
        dimension: usize,
    ) -> VariableBatch {
        let mut batch = VariableBatch::zeros(dimension, basis.quadrature_count());
        batch.conserved = &self.coefficient * basis.modal_value.transpose();
        batch.computational_from_conserved(model);
        batch
    }

    /// Conserved values at the quadrature points of face `face_id`.
    pub fn face_variable(
        &self,
        basis: &BasisTable,
        model: &PhysicalModel,
        dimension: usize,
        face_id: usize,
    ) -> VariableBatch {
        let (start, end) = basis.face_rows(face_id);
        let rows = basis.modal_adjacency_value.rows(start, end - start);
        let mut batch = VariableBatch::zeros(dimension, end - start);
        batch.conserved = &self.coefficient * rows.transpose();
        batch.computational_from_conserved(model);
        batch
    }

    /// Gradient values at the interior quadrature points from the selected
    /// coefficient tensor.
    pub fn quadrature_gradient(
        &self,
        basis: &BasisTable,
        dimension: usize,
        scheme: ViscousFluxScheme,
    ) -> GradientBatch {
        let gradient = self.gradient.as_ref().expect("gradient state allocated");
        let coefficient = match scheme {
            ViscousFluxScheme::None => &gradient.volume_coefficient,
            _ => &gradient.coefficient,
        };
        let mut batch = GradientBatch::zeros(dimension, basis.quadrature_count());
        batch.conserved = coefficient * basis.modal_value.transpose();
        batch
    }

    /// Gradient values at the quadrature points of face `face_id`. For BR2
    /// the per-face lifting of that face is added to the volume part.
    pub fn face_gradient(
        &self,
        basis: &BasisTable,
        dimension: usize,
        scheme: ViscousFluxScheme,
        face_id: usize,
    ) -> GradientBatch {
        let gradient = self.gradient.as_ref().expect("gradient state allocated");
        let (start, end) = basis.face_rows(face_id);
        let rows = basis.modal_adjacency_value.rows(start, end - start);
        let mut batch = GradientBatch::zeros(dimension, end - start);
        batch.conserved = match scheme {
            ViscousFluxScheme::None => &gradient.volume_coefficient * rows.transpose(),
            ViscousFluxScheme::Br1 => &gradient.coefficient * rows.transpose(),
            ViscousFluxScheme::Br2 => {
                (&gradient.volume_coefficient + &gradient.interface_coefficient[face_id])
                    * rows.transpose()
            }
        };
        batch
    }

    /// Artificial-viscosity values at the quadrature points of face
    /// `face_id`, spread from the per-vertex values.
    pub fn face_artificial_viscosity(&self, basis: &BasisTable, face_id: usize) -> DVector<f64> {
        let (start, end) = basis.face_rows(face_id);
        let rows = basis.vertex_adjacency_value.rows(start, end - start);
        rows * &self.artificial_viscosity
    }
}

/// Flux values owned by one adjacency element, gathered by its parents.
#[derive(Debug, Clone)]
pub struct AdjacencyFluxState {
    /// (convective − viscous − artificial) · |J_f| w, `N_c × N_qa`.
    pub flux: DMatrix<f64>,
    /// Volume-gradient flux · |J_f| w, `(N_c·d) × N_qa`.
    pub volume_gradient: DMatrix<f64>,
    /// Interface-gradient flux · |J_f| w, `(N_c·d) × N_qa`.
    pub interface_gradient: DMatrix<f64>,
}

impl AdjacencyFluxState {
    pub fn new(dimension: usize, n_quadrature: usize, needs_gradient: bool, viscous: bool) -> Self {
        let n_c = conserved_count(dimension);
        Self {
            flux: DMatrix::zeros(n_c, n_quadrature),
            volume_gradient: if needs_gradient {
                DMatrix::zeros(n_c * dimension, n_quadrature)
            } else {
                DMatrix::zeros(0, 0)
            },
            interface_gradient: if viscous {
                DMatrix::zeros(n_c * dimension, n_quadrature)
            } else {
                DMatrix::zeros(0, 0)
            },
        }
    }
}

/// State of one element group, parallel to the mesh group.
#[derive(Debug, Clone)]
pub struct ElementGroupState {
    pub elements: Vec<ElementState>,
}

/// State of one adjacency group: flux buffers for every adjacency and dummy
/// boundary variables for the boundary tail.
#[derive(Debug, Clone)]
pub struct AdjacencyGroupState {
    pub flux: Vec<AdjacencyFluxState>,
    /// Dummy states per boundary adjacency (indexed from `interior_count`).
    pub boundary_dummy: Vec<VariableBatch>,
}
