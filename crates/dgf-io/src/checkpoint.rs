//! Raw-binary checkpoints of modal coefficients.
//!
//! Uncompressed layout, in order: per volume shape, per element, the
//! column-major f64 modal tensor `U` (and the gradient tensor ∇U when the
//! run is viscous); then per boundary adjacency the same blocks of its
//! unique parent; then the per-node artificial-viscosity vector. The file
//! carries a single little-endian u64 uncompressed-size header followed by a
//! zstd frame.

use std::fs;
use std::path::Path;

use nalgebra::{DMatrix, DVector};

use crate::error::{IoError, Result};

/// Element counts and tensor sizes of one volume group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub element_count: usize,
    pub basis_count: usize,
}

/// Expected checkpoint layout, derived from the mesh and run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointLayout {
    /// Conserved variable count N_c.
    pub conserved_rows: usize,
    /// Gradient rows d·N_c, zero for inviscid runs.
    pub gradient_rows: usize,
    /// Per volume group in catalog order.
    pub volume: Vec<BlockLayout>,
    /// Per adjacency group: parent basis count per boundary element.
    pub boundary: Vec<Vec<usize>>,
    pub node_count: usize,
}

impl CheckpointLayout {
    /// Total uncompressed payload size in bytes.
    pub fn payload_size(&self) -> usize {
        let mut doubles = 0;
        for block in &self.volume {
            doubles += block.element_count
                * block.basis_count
                * (self.conserved_rows + self.gradient_rows);
        }
        for group in &self.boundary {
            for &basis_count in group {
                doubles += basis_count * (self.conserved_rows + self.gradient_rows);
            }
        }
        doubles += self.node_count;
        doubles * 8
    }
}

/// The modal state carried by a checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointData {
    /// Per volume group, per element: `N_c × N_b`.
    pub coefficients: Vec<Vec<DMatrix<f64>>>,
    /// Per volume group, per element: `d·N_c × N_b` (empty when inviscid).
    pub gradients: Vec<Vec<DMatrix<f64>>>,
    /// Per adjacency group, per boundary element: the parent's `U`.
    pub boundary_coefficients: Vec<Vec<DMatrix<f64>>>,
    /// Per adjacency group, per boundary element: the parent's ∇U.
    pub boundary_gradients: Vec<Vec<DMatrix<f64>>>,
    /// Artificial viscosity per mesh node.
    pub node_artificial_viscosity: DVector<f64>,
}

fn push_matrix(payload: &mut Vec<u8>, matrix: &DMatrix<f64>) {
    // Column-major, matching the in-memory layout.
    for value in matrix.iter() {
        payload.extend_from_slice(&value.to_le_bytes());
    }
}

/// Serialize to the uncompressed payload.
pub fn serialize_checkpoint(data: &CheckpointData) -> Vec<u8> {
    let mut payload = Vec::new();
    for (group_index, group) in data.coefficients.iter().enumerate() {
        for (element_index, coefficient) in group.iter().enumerate() {
            push_matrix(&mut payload, coefficient);
            if let Some(gradient) = data
                .gradients
                .get(group_index)
                .and_then(|g| g.get(element_index))
            {
                push_matrix(&mut payload, gradient);
            }
        }
    }
    for (group_index, group) in data.boundary_coefficients.iter().enumerate() {
        for (element_index, coefficient) in group.iter().enumerate() {
            push_matrix(&mut payload, coefficient);
            if let Some(gradient) = data
                .boundary_gradients
                .get(group_index)
                .and_then(|g| g.get(element_index))
            {
                push_matrix(&mut payload, gradient);
            }
        }
    }
    for value in data.node_artificial_viscosity.iter() {
        payload.extend_from_slice(&value.to_le_bytes());
    }
    payload
}

/// Write a checkpoint file: u64 LE uncompressed size, then a zstd frame.
pub fn write_checkpoint(path: &Path, data: &CheckpointData) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serialize_checkpoint(data);
    let mut file = Vec::with_capacity(payload.len() / 4 + 8);
    file.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    let compressed = zstd::stream::encode_all(payload.as_slice(), 1)?;
    file.extend_from_slice(&compressed);
    fs::write(path, file)?;
    Ok(())
}

/// Read and validate a checkpoint against the expected layout.
pub fn read_checkpoint(path: &Path, layout: &CheckpointLayout) -> Result<CheckpointData> {
    let bytes = fs::read(path)?;
    if bytes.len() < 8 {
        return Err(IoError::TruncatedHeader);
    }
    let declared = u64::from_le_bytes(bytes[..8].try_into().expect("eight header bytes")) as usize;
    let payload = zstd::stream::decode_all(&bytes[8..])?;
    if payload.len() != declared {
        return Err(IoError::CorruptFrame);
    }
    let expected = layout.payload_size();
    if payload.len() != expected {
        return Err(IoError::PayloadSizeMismatch { expected, actual: payload.len() });
    }

    let mut cursor = 0usize;
    let mut take_matrix = |rows: usize, columns: usize| -> DMatrix<f64> {
        let mut matrix = DMatrix::zeros(rows, columns);
        for c in 0..columns {
            for r in 0..rows {
                matrix[(r, c)] = f64::from_le_bytes(
                    payload[cursor..cursor + 8].try_into().expect("eight bytes"),
                );
                cursor += 8;
            }
        }
        matrix
    };

    let viscous = layout.gradient_rows > 0;
    let mut coefficients = Vec::with_capacity(layout.volume.len());
    let mut gradients = Vec::new();
    if viscous {
        gradients.reserve(layout.volume.len());
    }
    for block in &layout.volume {
        let mut group = Vec::with_capacity(block.element_count);
        let mut gradient_group = Vec::new();
        for _ in 0..block.element_count {
            group.push(take_matrix(layout.conserved_rows, block.basis_count));
            if viscous {
                gradient_group.push(take_matrix(layout.gradient_rows, block.basis_count));
            }
        }
        coefficients.push(group);
        if viscous {
            gradients.push(gradient_group);
        }
    }
    let mut boundary_coefficients = Vec::with_capacity(layout.boundary.len());
    let mut boundary_gradients = Vec::new();
    if viscous {
        boundary_gradients.reserve(layout.boundary.len());
    }
    for group_layout in &layout.boundary {
        let mut group = Vec::with_capacity(group_layout.len());
        let mut gradient_group = Vec::new();
        for &basis_count in group_layout {
            group.push(take_matrix(layout.conserved_rows, basis_count));
            if viscous {
                gradient_group.push(take_matrix(layout.gradient_rows, basis_count));
            }
        }
        boundary_coefficients.push(group);
        if viscous {
            boundary_gradients.push(gradient_group);
        }
    }
    let mut node_artificial_viscosity = DVector::zeros(layout.node_count);
    for i in 0..layout.node_count {
        node_artificial_viscosity[i] =
            f64::from_le_bytes(payload[cursor..cursor + 8].try_into().expect("eight bytes"));
        cursor += 8;
    }
    debug_assert_eq!(cursor, payload.len());
    Ok(CheckpointData {
        coefficients,
        gradients,
        boundary_coefficients,
        boundary_gradients,
        node_artificial_viscosity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> (CheckpointData, CheckpointLayout) {
        let coefficient = DMatrix::from_fn(3, 4, |r, c| (r * 4 + c) as f64 / 7.0);
        let data = CheckpointData {
            coefficients: vec![vec![coefficient.clone(), coefficient.map(|v| v + 1.0)]],
            gradients: Vec::new(),
            boundary_coefficients: vec![vec![coefficient.clone()]],
            boundary_gradients: Vec::new(),
            node_artificial_viscosity: DVector::from_vec(vec![0.0, 0.5, 0.25]),
        };
        let layout = CheckpointLayout {
            conserved_rows: 3,
            gradient_rows: 0,
            volume: vec![BlockLayout { element_count: 2, basis_count: 4 }],
            boundary: vec![vec![4]],
            node_count: 3,
        };
        (data, layout)
    }

    #[test]
    fn round_trip_preserves_every_block() {
        let (data, layout) = sample_data();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case_10.zst");
        write_checkpoint(&path, &data).unwrap();
        let loaded = read_checkpoint(&path, &layout).unwrap();
        for (a, b) in data.coefficients[0].iter().zip(&loaded.coefficients[0]) {
            assert_eq!(a, b);
        }
        assert_eq!(
            data.boundary_coefficients[0][0],
            loaded.boundary_coefficients[0][0]
        );
        assert_eq!(
            data.node_artificial_viscosity,
            loaded.node_artificial_viscosity
        );
    }

    #[test]
    fn header_declares_the_uncompressed_size() {
        let (data, layout) = sample_data();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case_1.zst");
        write_checkpoint(&path, &data).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let declared = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        assert_eq!(declared, layout.payload_size());
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let (data, mut layout) = sample_data();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case_2.zst");
        write_checkpoint(&path, &data).unwrap();
        layout.node_count = 5;
        let err = read_checkpoint(&path, &layout).unwrap_err();
        assert!(matches!(err, IoError::PayloadSizeMismatch { .. }));
    }

    #[test]
    fn garbage_frame_is_rejected() {
        let (_, layout) = sample_data();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.zst");
        let mut bytes = (layout.payload_size() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(b"this is not a zstd frame");
        std::fs::write(&path, bytes).unwrap();
        assert!(read_checkpoint(&path, &layout).is_err());
    }
}
