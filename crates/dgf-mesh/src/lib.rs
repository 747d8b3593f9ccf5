//! Element catalog, basis/quadrature tables and mesh ingest for the DG flow
//! solver.
//!
//! The crate owns everything upstream of the spatial operator: the reference
//! shape catalog, Gauss quadrature and modal basis tables, the meshing
//! collaborator contract, and the adjacency ingest that turns raw element
//! blocks into interior/boundary face groups with rotation bookkeeping.

pub mod basis;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod mesh;
pub mod quadrature;
pub mod shape;
pub mod source;

pub use basis::{BasisRegistry, BasisTable};
pub use error::{MeshError, Result};
pub use ingest::ingest;
pub use mesh::{
    AdjacencyGroup, AdjacencyRecord, ElementGroup, ElementRecord, FaceLink, Mesh, MeshStatistics,
    ParentLink, Side,
};
pub use quadrature::{FaceQuadrature, QuadratureRule};
pub use shape::{ElementShape, FaceDef};
pub use source::{BoundaryBlock, ElementBlock, GridTags, MeshSource, PeriodicLink, StructuredMesh};
