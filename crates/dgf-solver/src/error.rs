//! Error types for solver setup and the iteration loop.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("no boundary condition registered for physical group {physical_index}")]
    MissingBoundaryCondition { physical_index: usize },

    #[error("boundary kind {kind} is not usable with the configured model: {detail}")]
    UnsupportedBoundaryKind { kind: String, detail: String },

    #[error("{flux} is not usable with the configured model: requires {requirement}")]
    FluxModelMismatch { flux: String, requirement: String },

    #[error("relative error became NaN at iteration {iteration}; final state flushed")]
    DivergenceDetected { iteration: usize },

    #[error(transparent)]
    Mesh(#[from] dgf_mesh::MeshError),

    #[error(transparent)]
    Io(#[from] dgf_io::IoError),
}
