//! Reference-to-physical geometry: Jacobians, face normals, element quality.
//!
//! The geometric mapping is vertex-based (linear on simplices, bi/tri-linear
//! on tensor shapes), evaluated from the basic vertex coordinates of each
//! element.

use nalgebra::{DMatrix, DVector};
use tracing::warn;

use crate::basis::BasisTable;
use crate::error::{MeshError, Result};
use crate::quadrature::{FaceQuadrature, QuadratureRule};
use crate::shape::{ElementShape, vertex_gradients, vertex_values};

/// Volume geometry of one element at its interior quadrature points.
#[derive(Debug)]
pub struct VolumeGeometry {
    pub quadrature_node_coordinate: DMatrix<f64>,
    pub jacobian_determinant_weight: DVector<f64>,
    pub jacobian_transpose_inverse_weight: DMatrix<f64>,
    pub local_mass_matrix_inverse: DMatrix<f64>,
}

/// Compute the volume geometry from the basic vertex coordinates
/// (`d × N_vertex`).
pub fn volume_geometry(
    shape: ElementShape,
    vertices: &DMatrix<f64>,
    basis: &BasisTable,
    tag: usize,
) -> Result<VolumeGeometry> {
    let dim = shape.dimension();
    let rule = &basis.rule;
    let n_q = rule.len();
    let mut coords = DMatrix::zeros(dim, n_q);
    let mut jdw = DVector::zeros(n_q);
    let mut jtiw = DMatrix::zeros(dim * dim, n_q);
    for q in 0..n_q {
        let xi: Vec<f64> = (0..dim).map(|i| rule.points[(i, q)]).collect();
        let n = vertex_values(shape, &xi);
        let dn = vertex_gradients(shape, &xi);
        for i in 0..dim {
            coords[(i, q)] = (0..shape.vertex_count())
                .map(|v| n[v] * vertices[(i, v)])
                .sum();
        }
        // J[i][j] = ∂x_i/∂ξ_j
        let mut jac: DMatrix<f64> = DMatrix::zeros(dim, dim);
        for v in 0..shape.vertex_count() {
            for i in 0..dim {
                for j in 0..dim {
                    jac[(i, j)] += vertices[(i, v)] * dn[v][j];
                }
            }
        }
        let det = jac.determinant();
        if det <= 0.0 {
            return Err(MeshError::InvertedElement { tag, determinant: det });
        }
        jdw[q] = det * rule.weights[q];
        let jac_transpose_inverse = jac
            .transpose()
            .try_inverse()
            .ok_or(MeshError::InvertedElement { tag, determinant: det })?;
        for c in 0..dim {
            for r in 0..dim {
                jtiw[(c * dim + r, q)] = jac_transpose_inverse[(r, c)] * jdw[q];
            }
        }
    }
    let n_b = basis.basis_count();
    let mut mass = DMatrix::zeros(n_b, n_b);
    for a in 0..n_b {
        for b in a..n_b {
            let m: f64 = (0..n_q)
                .map(|q| basis.modal_value[(q, a)] * basis.modal_value[(q, b)] * jdw[q])
                .sum();
            mass[(a, b)] = m;
            mass[(b, a)] = m;
        }
    }
    let local_mass_matrix_inverse = mass
        .try_inverse()
        .ok_or(MeshError::SingularMassMatrix { tag })?;
    Ok(VolumeGeometry {
        quadrature_node_coordinate: coords,
        jacobian_determinant_weight: jdw,
        jacobian_transpose_inverse_weight: jtiw,
        local_mass_matrix_inverse,
    })
}

/// Face geometry of one adjacency at its quadrature points: physical
/// coordinates, |J_face| · w and the outward normal of the left parent.
///
/// For a point face of a 1D parent, `parent_vertices` supplies the parent
/// line endpoints so the outward direction can be resolved.
pub struct FaceGeometry {
    pub quadrature_node_coordinate: DMatrix<f64>,
    pub jacobian_determinant_weight: DVector<f64>,
    pub normal_vector: DMatrix<f64>,
}

pub fn face_geometry(
    face_shape: ElementShape,
    face_vertices: &DMatrix<f64>,
    parent_dimension: usize,
    parent_vertices: &DMatrix<f64>,
    quadrature: &FaceQuadrature,
) -> FaceGeometry {
    let rule = &quadrature.rule;
    let n_q = rule.len();
    let mut coords = DMatrix::zeros(parent_dimension, n_q);
    let mut jdw = DVector::zeros(n_q);
    let mut normals = DMatrix::zeros(parent_dimension, n_q);
    let mut warned = false;
    let mut previous_normal: Option<DVector<f64>> = None;
    for q in 0..n_q {
        let face_dim = face_shape.dimension().max(1);
        let xi: Vec<f64> = (0..face_dim).map(|i| rule.points[(i, q)]).collect();
        let n = vertex_values(face_shape, &xi);
        for i in 0..parent_dimension {
            coords[(i, q)] = (0..face_shape.vertex_count())
                .map(|v| n[v] * face_vertices[(i, v)])
                .sum();
        }
        match parent_dimension {
            1 => {
                // Point face: outward direction away from the opposite end.
                let face_x = coords[(0, q)];
                let center =
                    (parent_vertices[(0, 0)] + parent_vertices[(0, 1)]) / 2.0;
                normals[(0, q)] = if face_x >= center { 1.0 } else { -1.0 };
                jdw[q] = rule.weights[q];
            }
            2 => {
                let dn = vertex_gradients(face_shape, &xi);
                let mut tangent = [0.0; 2];
                for v in 0..face_shape.vertex_count() {
                    for i in 0..2 {
                        tangent[i] += face_vertices[(i, v)] * dn[v][0];
                    }
                }
                let len = (tangent[0] * tangent[0] + tangent[1] * tangent[1]).sqrt();
                jdw[q] = len * rule.weights[q];
                let normal = resolve_normal(
                    DVector::from_vec(vec![tangent[1], -tangent[0]]),
                    len,
                    &mut previous_normal,
                    &mut warned,
                );
                normals.set_column(q, &normal);
            }
            _ => {
                let dn = vertex_gradients(face_shape, &xi);
                let mut t1 = [0.0; 3];
                let mut t2 = [0.0; 3];
                for v in 0..face_shape.vertex_count() {
                    for i in 0..3 {
                        t1[i] += face_vertices[(i, v)] * dn[v][0];
                        t2[i] += face_vertices[(i, v)] * dn[v][1];
                    }
                }
                let cross = [
                    t1[1] * t2[2] - t1[2] * t2[1],
                    t1[2] * t2[0] - t1[0] * t2[2],
                    t1[0] * t2[1] - t1[1] * t2[0],
                ];
                let len =
                    (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
                jdw[q] = len * rule.weights[q];
                let normal = resolve_normal(
                    DVector::from_vec(cross.to_vec()),
                    len,
                    &mut previous_normal,
                    &mut warned,
                );
                normals.set_column(q, &normal);
            }
        }
    }
    FaceGeometry {
        quadrature_node_coordinate: coords,
        jacobian_determinant_weight: jdw,
        normal_vector: normals,
    }
}

fn resolve_normal(
    raw: DVector<f64>,
    length: f64,
    previous: &mut Option<DVector<f64>>,
    warned: &mut bool,
) -> DVector<f64> {
    if length > 1e-14 {
        let normal = raw / length;
        *previous = Some(normal.clone());
        normal
    } else if let Some(prev) = previous.clone() {
        if !*warned {
            warn!("degenerate face tangents, falling back to the previous normal");
            *warned = true;
        }
        prev
    } else {
        if !*warned {
            warn!("degenerate face tangents with no prior normal, using the first axis");
            *warned = true;
        }
        let mut fallback = DVector::zeros(raw.len());
        fallback[0] = 1.0;
        fallback
    }
}

/// Shortest edge of the element, from vertex coordinates.
pub fn minimum_edge(shape: ElementShape, vertices: &DMatrix<f64>) -> f64 {
    let dim = vertices.nrows();
    shape
        .edges()
        .iter()
        .map(|e| {
            (0..dim)
                .map(|i| (vertices[(i, e[0])] - vertices[(i, e[1])]).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .fold(f64::MAX, f64::min)
}

/// Inner radius estimate `d · V / S` (exact insphere radius on simplices).
pub fn inner_radius(
    shape: ElementShape,
    vertices: &DMatrix<f64>,
    volume_rule: &QuadratureRule,
    face_rules: &dyn Fn(ElementShape) -> QuadratureRule,
) -> f64 {
    let dim = shape.dimension();
    if dim == 1 {
        return (vertices[(0, 1)] - vertices[(0, 0)]).abs() / 2.0;
    }
    let volume = integrate_measure(shape, vertices, volume_rule, dim);
    let mut surface = 0.0;
    for face in shape.faces() {
        let mut face_vertices = DMatrix::zeros(dim, face.vertices.len());
        for (t, &v) in face.vertices.iter().enumerate() {
            for i in 0..dim {
                face_vertices[(i, t)] = vertices[(i, v)];
            }
        }
        let rule = face_rules(face.shape);
        surface += surface_measure(face.shape, &face_vertices, &rule, dim);
    }
    dim as f64 * volume / surface
}

fn integrate_measure(
    shape: ElementShape,
    vertices: &DMatrix<f64>,
    rule: &QuadratureRule,
    dim: usize,
) -> f64 {
    let mut total = 0.0;
    for q in 0..rule.len() {
        let xi: Vec<f64> = (0..dim).map(|i| rule.points[(i, q)]).collect();
        let dn = vertex_gradients(shape, &xi);
        let mut jac: DMatrix<f64> = DMatrix::zeros(dim, dim);
        for v in 0..shape.vertex_count() {
            for i in 0..dim {
                for j in 0..dim {
                    jac[(i, j)] += vertices[(i, v)] * dn[v][j];
                }
            }
        }
        total += jac.determinant().abs() * rule.weights[q];
    }
    total
}

fn surface_measure(
    face_shape: ElementShape,
    face_vertices: &DMatrix<f64>,
    rule: &QuadratureRule,
    dim: usize,
) -> f64 {
    let face_dim = face_shape.dimension().max(1);
    let mut total = 0.0;
    for q in 0..rule.len() {
        let xi: Vec<f64> = (0..face_dim).map(|i| rule.points[(i, q)]).collect();
        let dn = vertex_gradients(face_shape, &xi);
        let mut tangents = vec![[0.0; 3]; face_dim];
        for v in 0..face_shape.vertex_count() {
            for t in 0..face_dim {
                for i in 0..dim {
                    tangents[t][i] += face_vertices[(i, v)] * dn[v][t];
                }
            }
        }
        let measure = if face_dim == 1 {
            (0..dim).map(|i| tangents[0][i].powi(2)).sum::<f64>().sqrt()
        } else {
            let (a, b) = (tangents[0], tangents[1]);
            let cross = [
                a[1] * b[2] - a[2] * b[1],
                a[2] * b[0] - a[0] * b[2],
                a[0] * b[1] - a[1] * b[0],
            ];
            (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt()
        };
        total += measure * rule.weights[q];
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadrature::interior_rule;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn basis(shape: ElementShape, p: usize) -> BasisTable {
        let mut face_rules = HashMap::new();
        for face in shape.faces() {
            face_rules
                .entry(face.shape)
                .or_insert_with(|| Arc::new(FaceQuadrature::build(face.shape, p)));
        }
        BasisTable::build(shape, p, &face_rules)
    }

    #[test]
    fn mass_matrix_inverse_satisfies_the_identity() {
        // A skewed quadrangle: M · M⁻¹ must be the identity.
        let shape = ElementShape::Quadrangle;
        let b = basis(shape, 2);
        let vertices =
            DMatrix::from_column_slice(2, 4, &[0.0, 0.0, 1.2, 0.1, 1.4, 1.1, -0.2, 0.9]);
        let g = volume_geometry(shape, &vertices, &b, 1).unwrap();
        let n_b = b.basis_count();
        let mut mass = DMatrix::zeros(n_b, n_b);
        for a in 0..n_b {
            for c in 0..n_b {
                mass[(a, c)] = (0..b.quadrature_count())
                    .map(|q| {
                        b.modal_value[(q, a)]
                            * b.modal_value[(q, c)]
                            * g.jacobian_determinant_weight[q]
                    })
                    .sum();
            }
        }
        let identity = mass * &g.local_mass_matrix_inverse;
        for a in 0..n_b {
            for c in 0..n_b {
                let expected = if a == c { 1.0 } else { 0.0 };
                assert!(
                    (identity[(a, c)] - expected).abs() < 1e-9,
                    "({a},{c}) = {}",
                    identity[(a, c)]
                );
            }
        }
    }

    #[test]
    fn inverted_element_is_rejected() {
        let shape = ElementShape::Quadrangle;
        let b = basis(shape, 1);
        // Vertices in clockwise order produce a negative Jacobian.
        let vertices =
            DMatrix::from_column_slice(2, 4, &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
        let err = volume_geometry(shape, &vertices, &b, 7).unwrap_err();
        assert!(matches!(err, MeshError::InvertedElement { tag: 7, .. }));
    }

    #[test]
    fn edge_normal_of_a_unit_square_points_outward() {
        let quadrature = FaceQuadrature::build(ElementShape::Line, 2);
        // Bottom edge of the unit square [0,1]², traversed (0,0) → (1,0).
        let face_vertices = DMatrix::from_column_slice(2, 2, &[0.0, 0.0, 1.0, 0.0]);
        let parent_vertices =
            DMatrix::from_column_slice(2, 4, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        let g = face_geometry(
            ElementShape::Line,
            &face_vertices,
            2,
            &parent_vertices,
            &quadrature,
        );
        for q in 0..quadrature.len() {
            assert!((g.normal_vector[(0, q)]).abs() < 1e-12);
            assert!((g.normal_vector[(1, q)] + 1.0).abs() < 1e-12);
        }
        // Edge length 1 split across the rule.
        let total: f64 = g.jacobian_determinant_weight.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inner_radius_of_the_unit_triangle() {
        let shape = ElementShape::Triangle;
        let vertices = DMatrix::from_column_slice(2, 3, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        let rule = interior_rule(shape, 2);
        let r = inner_radius(shape, &vertices, &rule, &|s| {
            FaceQuadrature::build(s, 2).rule
        });
        // Insphere radius of the right unit triangle: (2 - √2)/2 · (1/ (1 + √2)) …
        // analytically r = (a + b - c)/2 with legs 1, 1 and hypotenuse √2.
        let expected = (2.0 - 2.0_f64.sqrt()) / 2.0;
        assert!((r - expected).abs() < 1e-10, "r = {r}, expected {expected}");
    }
}
