//! Mesh data structures for the DG solver.
//!
//! Volume elements and adjacency (face) elements are stored in per-shape
//! groups; adjacencies reference their parent elements by integer index, and
//! every volume element carries an inverted face table so residual gathers
//! stay element-parallel.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::basis::{BasisRegistry, BasisTable};
use crate::quadrature::FaceQuadrature;
use crate::shape::ElementShape;

/// Which side of an interior adjacency a parent element sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Back-pointer from an adjacency to one parent element.
#[derive(Debug, Clone, Copy)]
pub struct ParentLink {
    pub shape: ElementShape,
    pub element_index: usize,
    pub face_id: usize,
}

/// Forward link from a volume element face to its adjacency element.
#[derive(Debug, Clone, Copy)]
pub struct FaceLink {
    pub shape: ElementShape,
    pub adjacency_index: usize,
    pub side: Side,
}

/// One volume element.
#[derive(Debug, Clone)]
pub struct ElementRecord {
    pub tag: usize,
    pub physical_index: usize,
    /// All-order node tags, catalog node order.
    pub node_tag: Vec<usize>,
    /// Geometric node coordinates, `d × N_p`.
    pub node_coordinate: DMatrix<f64>,
    /// Physical coordinates of the interior quadrature points, `d × N_q`.
    pub quadrature_node_coordinate: DMatrix<f64>,
    /// |J(ξ_q)| · w_q per interior quadrature point.
    pub jacobian_determinant_weight: DVector<f64>,
    /// (Jᵀ)⁻¹(ξ_q) · |J| · w flattened column-major, `d² × N_q`.
    pub jacobian_transpose_inverse_weight: DMatrix<f64>,
    pub minimum_edge: f64,
    pub inner_radius: f64,
    /// `(Φᵀ diag(JW) Φ)⁻¹`, `N_b × N_b`.
    pub local_mass_matrix_inverse: DMatrix<f64>,
    /// Adjacency link per face id.
    pub faces: Vec<FaceLink>,
}

/// One adjacency (face/edge/endpoint) element.
#[derive(Debug, Clone)]
pub struct AdjacencyRecord {
    /// Vertex tags in the left parent's face order.
    pub node_tag: Vec<usize>,
    /// Vertex coordinates, `d × N_vertex(face)`.
    pub node_coordinate: DMatrix<f64>,
    /// Physical coordinates of the face quadrature points, `d × N_qa`.
    pub quadrature_node_coordinate: DMatrix<f64>,
    /// |J_face(ξ_q)| · w_q per face quadrature point.
    pub jacobian_determinant_weight: DVector<f64>,
    /// Outward normals (out of the left parent), `d × N_qa`.
    pub normal_vector: DMatrix<f64>,
    /// One parent for boundary faces, two for interior.
    pub parents: Vec<ParentLink>,
    /// Face rotation aligning the right parent's vertex sequence (interior).
    pub rotation: usize,
    /// Physical group of a boundary face.
    pub physical_index: Option<usize>,
}

impl AdjacencyRecord {
    pub fn is_interior(&self) -> bool {
        self.parents.len() == 2
    }
}

/// All volume elements of one shape.
#[derive(Debug, Clone)]
pub struct ElementGroup {
    pub shape: ElementShape,
    pub basis: Arc<BasisTable>,
    pub elements: Vec<ElementRecord>,
}

/// All adjacency elements of one shape, interior first.
#[derive(Debug, Clone)]
pub struct AdjacencyGroup {
    pub shape: ElementShape,
    pub quadrature: Arc<FaceQuadrature>,
    pub interior_count: usize,
    pub elements: Vec<AdjacencyRecord>,
}

impl AdjacencyGroup {
    pub fn boundary_count(&self) -> usize {
        self.elements.len() - self.interior_count
    }

    pub fn interior(&self) -> &[AdjacencyRecord] {
        &self.elements[..self.interior_count]
    }

    pub fn boundary(&self) -> &[AdjacencyRecord] {
        &self.elements[self.interior_count..]
    }
}

/// The complete ingested mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub dimension: usize,
    pub order: usize,
    /// Geometric node coordinates keyed by tag - 1, `d × node_count`.
    pub node_coordinates: DMatrix<f64>,
    pub element_groups: Vec<ElementGroup>,
    pub adjacency_groups: Vec<AdjacencyGroup>,
    pub registry: BasisRegistry,
}

impl Mesh {
    pub fn node_count(&self) -> usize {
        self.node_coordinates.ncols()
    }

    pub fn element_count(&self) -> usize {
        self.element_groups.iter().map(|g| g.elements.len()).sum()
    }

    pub fn group(&self, shape: ElementShape) -> Option<&ElementGroup> {
        self.element_groups.iter().find(|g| g.shape == shape)
    }

    pub fn group_index(&self, shape: ElementShape) -> Option<usize> {
        self.element_groups.iter().position(|g| g.shape == shape)
    }

    pub fn adjacency_group(&self, shape: ElementShape) -> Option<&AdjacencyGroup> {
        self.adjacency_groups.iter().find(|g| g.shape == shape)
    }

    pub fn adjacency_group_index(&self, shape: ElementShape) -> Option<usize> {
        self.adjacency_groups.iter().position(|g| g.shape == shape)
    }

    /// Summary counts for progress reporting.
    pub fn statistics(&self) -> MeshStatistics {
        MeshStatistics {
            node_count: self.node_count(),
            element_count: self.element_count(),
            interior_adjacency_count: self
                .adjacency_groups
                .iter()
                .map(|g| g.interior_count)
                .sum(),
            boundary_adjacency_count: self
                .adjacency_groups
                .iter()
                .map(|g| g.boundary_count())
                .sum(),
        }
    }
}

/// Mesh summary for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshStatistics {
    pub node_count: usize,
    pub element_count: usize,
    pub interior_adjacency_count: usize,
    pub boundary_adjacency_count: usize,
}
