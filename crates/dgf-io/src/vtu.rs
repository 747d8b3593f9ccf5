//! VTU (XML unstructured-grid) writer for external visualization tools.
//!
//! Emits one piece per frame with point coordinates, cell connectivity and
//! named per-point fields in ASCII data arrays.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::DMatrix;

use crate::error::Result;

/// VTK cell type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VtkCellType {
    Vertex = 1,
    Line = 3,
    Triangle = 5,
    Quad = 9,
    Tetra = 10,
    Hexahedron = 12,
    Wedge = 13,
    Pyramid = 14,
}

/// One cell: its VTK type and point indices into the frame's point list.
#[derive(Debug, Clone)]
pub struct VtuCell {
    pub cell_type: VtkCellType,
    pub connectivity: Vec<usize>,
}

/// A named per-point field with one or more components.
#[derive(Debug, Clone)]
pub struct PointField {
    pub name: String,
    pub components: usize,
    /// `components × point_count` values.
    pub values: DMatrix<f64>,
}

/// Write one VTU frame. `points` is `d × n` with d ≤ 3; coordinates are
/// zero-padded to three components.
pub fn write_vtu(
    path: &Path,
    points: &DMatrix<f64>,
    cells: &[VtuCell],
    fields: &[PointField],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    let point_count = points.ncols();
    let dimension = points.nrows();

    writeln!(out, r#"<?xml version="1.0"?>"#)?;
    writeln!(
        out,
        r#"<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian">"#
    )?;
    writeln!(out, "  <UnstructuredGrid>")?;
    writeln!(
        out,
        r#"    <Piece NumberOfPoints="{point_count}" NumberOfCells="{}">"#,
        cells.len()
    )?;

    writeln!(out, "      <Points>")?;
    writeln!(
        out,
        r#"        <DataArray type="Float64" NumberOfComponents="3" format="ascii">"#
    )?;
    for j in 0..point_count {
        let mut coordinate = [0.0; 3];
        for i in 0..dimension {
            coordinate[i] = points[(i, j)];
        }
        writeln!(out, "          {} {} {}", coordinate[0], coordinate[1], coordinate[2])?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(out, "      </Points>")?;

    writeln!(out, "      <Cells>")?;
    writeln!(
        out,
        r#"        <DataArray type="Int64" Name="connectivity" format="ascii">"#
    )?;
    for cell in cells {
        write!(out, "         ")?;
        for index in &cell.connectivity {
            write!(out, " {index}")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(
        out,
        r#"        <DataArray type="Int64" Name="offsets" format="ascii">"#
    )?;
    let mut offset = 0usize;
    for cell in cells {
        offset += cell.connectivity.len();
        writeln!(out, "          {offset}")?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(
        out,
        r#"        <DataArray type="UInt8" Name="types" format="ascii">"#
    )?;
    for cell in cells {
        writeln!(out, "          {}", cell.cell_type as u8)?;
    }
    writeln!(out, "        </DataArray>")?;
    writeln!(out, "      </Cells>")?;

    writeln!(out, "      <PointData>")?;
    for field in fields {
        writeln!(
            out,
            r#"        <DataArray type="Float64" Name="{}" NumberOfComponents="{}" format="ascii">"#,
            field.name, field.components
        )?;
        for j in 0..field.values.ncols() {
            write!(out, "         ")?;
            for i in 0..field.components {
                write!(out, " {}", field.values[(i, j)])?;
            }
            writeln!(out)?;
        }
        writeln!(out, "        </DataArray>")?;
    }
    writeln!(out, "      </PointData>")?;

    writeln!(out, "    </Piece>")?;
    writeln!(out, "  </UnstructuredGrid>")?;
    writeln!(out, "</VTKFile>")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_contains_points_cells_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.vtu");
        let points =
            DMatrix::from_column_slice(2, 4, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        let cells = vec![VtuCell {
            cell_type: VtkCellType::Quad,
            connectivity: vec![0, 1, 2, 3],
        }];
        let fields = vec![PointField {
            name: "Density".into(),
            components: 1,
            values: DMatrix::from_row_slice(1, 4, &[1.0, 1.1, 1.2, 1.3]),
        }];
        write_vtu(&path, &points, &cells, &fields).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(r#"NumberOfPoints="4""#));
        assert!(content.contains(r#"Name="Density""#));
        assert!(content.contains("UnstructuredGrid"));
        // Quad type code.
        assert!(content.contains("          9"));
    }
}
