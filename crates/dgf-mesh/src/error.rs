//! Error types for mesh ingest.

use thiserror::Error;

use crate::shape::ElementShape;

pub type Result<T> = std::result::Result<T, MeshError>;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("element shape {shape:?} is declared but contributes no elements")]
    EmptyElement { shape: ElementShape },

    #[error("face with vertex tags {node_tags:?} is shared by more than two elements")]
    DuplicateAdjacency { node_tags: Vec<usize> },

    #[error(
        "boundary face with vertex tags {node_tags:?} does not match any element face \
         (mis-tagged physical group?)"
    )]
    OrphanFace { node_tags: Vec<usize> },

    #[error("periodic groups {master} and {slave}: {detail}")]
    PeriodicMismatch {
        master: usize,
        slave: usize,
        detail: String,
    },

    #[error("element {tag} references unknown node tag {node_tag}")]
    UnknownNode { tag: usize, node_tag: usize },

    #[error("element {tag} carries {actual} nodes, expected {expected} at this order")]
    NodeCountMismatch {
        tag: usize,
        expected: usize,
        actual: usize,
    },

    #[error("element {tag} has a non-positive Jacobian determinant ({determinant})")]
    InvertedElement { tag: usize, determinant: f64 },

    #[error("element {tag} produced a singular local mass matrix")]
    SingularMassMatrix { tag: usize },

    #[error(
        "interior face with vertex tags {node_tags:?} is seen with the same orientation from \
         both parents"
    )]
    InconsistentOrientation { node_tags: Vec<usize> },
}
