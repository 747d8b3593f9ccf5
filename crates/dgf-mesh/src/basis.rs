//! Modal basis tables.
//!
//! For every (shape, polynomial order) pair the solver needs, this module
//! builds the modal basis by orthonormalizing the shape's monomial space
//! against the reference-domain inner product, then tabulates basis values
//! and gradients at the interior quadrature points, at the all-order nodes,
//! and at every face's quadrature points.
//!
//! Monomials are ordered so that the leading `basis_count(p - 1)` functions
//! span exactly the order-(p-1) space; the shock indicator and the
//! lower-order checkpoint embedding both rely on this nesting.

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::quadrature::{FaceQuadrature, QuadratureRule, interior_rule};
use crate::shape::{ElementShape, vertex_values};

/// Monomial exponent tuples of the shape's polynomial space at order `p`,
/// ordered by nested sub-space level.
pub fn monomial_exponents(shape: ElementShape, p: usize) -> Vec<Vec<usize>> {
    let mut exps: Vec<Vec<usize>> = Vec::new();
    match shape {
        ElementShape::Point => exps.push(vec![]),
        ElementShape::Line => {
            for i in 0..=p {
                exps.push(vec![i]);
            }
        }
        ElementShape::Triangle => {
            for j in 0..=p {
                for i in 0..=p {
                    if i + j <= p {
                        exps.push(vec![i, j]);
                    }
                }
            }
        }
        ElementShape::Quadrangle => {
            for j in 0..=p {
                for i in 0..=p {
                    exps.push(vec![i, j]);
                }
            }
        }
        ElementShape::Tetrahedron => {
            for k in 0..=p {
                for j in 0..=p {
                    for i in 0..=p {
                        if i + j + k <= p {
                            exps.push(vec![i, j, k]);
                        }
                    }
                }
            }
        }
        ElementShape::Pyramid => {
            for k in 0..=p {
                for j in 0..=(p - k) {
                    for i in 0..=(p - k) {
                        exps.push(vec![i, j, k]);
                    }
                }
            }
        }
        ElementShape::Hexahedron => {
            for k in 0..=p {
                for j in 0..=p {
                    for i in 0..=p {
                        exps.push(vec![i, j, k]);
                    }
                }
            }
        }
    }
    exps.sort_by_key(|e| (monomial_level(shape, e), e.clone()));
    debug_assert_eq!(exps.len(), shape.basis_count(p));
    exps
}

/// The smallest order whose space contains the monomial.
fn monomial_level(shape: ElementShape, e: &[usize]) -> usize {
    match shape {
        ElementShape::Point => 0,
        ElementShape::Line => e[0],
        ElementShape::Triangle | ElementShape::Tetrahedron => e.iter().sum(),
        ElementShape::Quadrangle | ElementShape::Hexahedron => {
            e.iter().copied().max().unwrap_or(0)
        }
        ElementShape::Pyramid => e[2] + e[0].max(e[1]),
    }
}

fn monomial_value(e: &[usize], x: &[f64]) -> f64 {
    e.iter()
        .zip(x.iter())
        .map(|(&e, &x)| x.powi(e as i32))
        .product()
}

fn monomial_gradient(e: &[usize], x: &[f64], dim: usize) -> f64 {
    if e[dim] == 0 {
        return 0.0;
    }
    let mut v = e[dim] as f64 * x[dim].powi(e[dim] as i32 - 1);
    for (i, (&ei, &xi)) in e.iter().zip(x.iter()).enumerate() {
        if i != dim {
            v *= xi.powi(ei as i32);
        }
    }
    v
}

/// Basis tables of one volume shape at one polynomial order.
#[derive(Debug, Clone)]
pub struct BasisTable {
    pub shape: ElementShape,
    pub order: usize,
    /// Interior quadrature rule on the reference domain.
    pub rule: QuadratureRule,
    /// Monomial-combination coefficients defining the modal basis; column j
    /// holds basis function j.
    coefficients: DMatrix<f64>,
    exponents: Vec<Vec<usize>>,
    /// Modal basis values at interior quadrature points, `N_q × N_b`.
    pub modal_value: DMatrix<f64>,
    /// Reference-space modal gradients, `(N_q · d) × N_b`; row `q·d + dim`.
    pub modal_gradient_value: DMatrix<f64>,
    /// Linear vertex shape functions at interior quadrature points,
    /// `N_q × N_vertex` (spreads per-vertex artificial viscosity).
    pub vertex_value: DMatrix<f64>,
    /// Modal basis values at the all-order reference nodes, `N_p × N_b`.
    pub node_modal_value: DMatrix<f64>,
    /// Linear vertex shape functions at the all-order nodes, `N_p × N_vertex`.
    pub vertex_node_value: DMatrix<f64>,
    /// Modal basis at every face's quadrature points, faces stacked in face-id
    /// order, `(Σ N_qa) × N_b`.
    pub modal_adjacency_value: DMatrix<f64>,
    /// Linear vertex shape functions at the stacked face quadrature points.
    pub vertex_adjacency_value: DMatrix<f64>,
    /// Modal basis at the all-order nodes of each face, `N_p(face) × N_b` per
    /// face id (boundary-field reconstruction).
    pub face_node_value: Vec<DMatrix<f64>>,
    /// Accumulated face quadrature offsets, length `face_count + 1`.
    pub adjacency_offsets: Vec<usize>,
    /// Least-squares projector `(ΦᵀΦ)⁻¹ Φᵀ`, `N_b × N_q`.
    pub least_squares: DMatrix<f64>,
}

impl BasisTable {
    pub fn build(
        shape: ElementShape,
        p: usize,
        face_rules: &HashMap<ElementShape, Arc<FaceQuadrature>>,
    ) -> Self {
        let dim = shape.dimension();
        let rule = interior_rule(shape, p);
        let exponents = monomial_exponents(shape, p);
        let n_b = exponents.len();
        let n_q = rule.len();

        let monomials = values_at(&exponents, &rule.points);
        let coefficients = orthonormalize(&monomials, &rule.weights);
        let modal_value = &monomials * &coefficients;

        let mut modal_gradient_value = DMatrix::zeros(n_q * dim, n_b);
        for q in 0..n_q {
            let x: Vec<f64> = (0..dim).map(|i| rule.points[(i, q)]).collect();
            for d in 0..dim {
                for (m, e) in exponents.iter().enumerate() {
                    let g = monomial_gradient(e, &x, d);
                    for b in 0..n_b {
                        modal_gradient_value[(q * dim + d, b)] += g * coefficients[(m, b)];
                    }
                }
            }
        }

        let vertex_value = vertex_table(shape, &rule.points);

        let nodes = shape.reference_nodes(p);
        let node_modal_value = &values_at(&exponents, &nodes) * &coefficients;
        let vertex_node_value = vertex_table(shape, &nodes);

        // Face tables: map each face's quadrature rule and all-order nodes
        // into the parent reference domain, then evaluate the modal basis.
        let faces = shape.faces();
        let mut adjacency_offsets = vec![0usize];
        let mut face_points: Vec<DMatrix<f64>> = Vec::with_capacity(faces.len());
        let mut face_node_points: Vec<DMatrix<f64>> = Vec::with_capacity(faces.len());
        let parent_vertices = shape.reference_vertices();
        for face in faces {
            let face_rule = &face_rules[&face.shape];
            face_points.push(map_to_parent(
                face.vertices,
                &parent_vertices,
                face.shape,
                &face_rule.rule.points,
            ));
            face_node_points.push(map_to_parent(
                face.vertices,
                &parent_vertices,
                face.shape,
                &face.shape.reference_nodes(p),
            ));
            adjacency_offsets.push(adjacency_offsets.last().unwrap() + face_rule.len());
        }
        let total_qa = *adjacency_offsets.last().unwrap();
        let mut modal_adjacency_value = DMatrix::zeros(total_qa, n_b);
        let mut vertex_adjacency_value = DMatrix::zeros(total_qa, shape.vertex_count());
        let mut face_node_value = Vec::with_capacity(faces.len());
        for (k, points) in face_points.iter().enumerate() {
            let block = &values_at(&exponents, points) * &coefficients;
            let vblock = vertex_table(shape, points);
            let off = adjacency_offsets[k];
            for r in 0..points.ncols() {
                for b in 0..n_b {
                    modal_adjacency_value[(off + r, b)] = block[(r, b)];
                }
                for v in 0..shape.vertex_count() {
                    vertex_adjacency_value[(off + r, v)] = vblock[(r, v)];
                }
            }
            face_node_value.push(&values_at(&exponents, &face_node_points[k]) * &coefficients);
        }

        let gram = modal_value.transpose() * &modal_value;
        let least_squares = gram
            .try_inverse()
            .expect("modal value matrix has full column rank")
            * modal_value.transpose();

        Self {
            shape,
            order: p,
            rule,
            coefficients,
            exponents,
            modal_value,
            modal_gradient_value,
            vertex_value,
            node_modal_value,
            vertex_node_value,
            modal_adjacency_value,
            vertex_adjacency_value,
            face_node_value,
            adjacency_offsets,
            least_squares,
        }
    }

    pub fn basis_count(&self) -> usize {
        self.modal_value.ncols()
    }

    pub fn quadrature_count(&self) -> usize {
        self.rule.len()
    }

    pub fn adjacency_quadrature_count(&self) -> usize {
        *self.adjacency_offsets.last().unwrap()
    }

    /// Modal basis values at arbitrary reference points, one column per
    /// point in the input.
    pub fn evaluate(&self, points: &DMatrix<f64>) -> DMatrix<f64> {
        &values_at(&self.exponents, points) * &self.coefficients
    }

    /// Rows of `modal_adjacency_value` for face `k`.
    pub fn face_rows(&self, k: usize) -> (usize, usize) {
        (self.adjacency_offsets[k], self.adjacency_offsets[k + 1])
    }
}

fn values_at(exponents: &[Vec<usize>], points: &DMatrix<f64>) -> DMatrix<f64> {
    let dim = points.nrows();
    DMatrix::from_fn(points.ncols(), exponents.len(), |q, m| {
        let x: Vec<f64> = (0..dim).map(|i| points[(i, q)]).collect();
        monomial_value(&exponents[m], &x)
    })
}

fn vertex_table(shape: ElementShape, points: &DMatrix<f64>) -> DMatrix<f64> {
    let dim = points.nrows();
    let mut out = DMatrix::zeros(points.ncols(), shape.vertex_count());
    for q in 0..points.ncols() {
        let x: Vec<f64> = (0..dim).map(|i| points[(i, q)]).collect();
        let values = vertex_values(shape, &x);
        for (v, n) in values.iter().enumerate() {
            out[(q, v)] = *n;
        }
    }
    out
}

/// Map points from a face's reference domain into the parent reference
/// domain through the face's vertex sequence.
pub fn map_to_parent(
    face_vertices: &[usize],
    parent_vertices: &DMatrix<f64>,
    face_shape: ElementShape,
    points: &DMatrix<f64>,
) -> DMatrix<f64> {
    let parent_dim = parent_vertices.nrows();
    let face_dim = face_shape.dimension().max(1);
    let mut out = DMatrix::zeros(parent_dim, points.ncols());
    for q in 0..points.ncols() {
        let xi: Vec<f64> = (0..face_dim).map(|i| points[(i, q)]).collect();
        let lambda = vertex_values(face_shape, &xi);
        for (t, &v) in face_vertices.iter().enumerate() {
            for i in 0..parent_dim {
                out[(i, q)] += lambda[t] * parent_vertices[(i, v)];
            }
        }
    }
    out
}

/// Modified Gram–Schmidt with one re-orthogonalization pass, against the
/// weighted inner product of the interior rule. Returns the coefficient
/// matrix C with basis functions as columns over the monomial set.
fn orthonormalize(values: &DMatrix<f64>, weights: &DVector<f64>) -> DMatrix<f64> {
    let n = values.ncols();
    let mut coeff = DMatrix::<f64>::identity(n, n);
    let mut vals = values.clone();
    for j in 0..n {
        for _pass in 0..2 {
            for i in 0..j {
                let r = weighted_dot(&vals, j, i, weights);
                for q in 0..vals.nrows() {
                    let vi = vals[(q, i)];
                    vals[(q, j)] -= r * vi;
                }
                for m in 0..n {
                    let ci = coeff[(m, i)];
                    coeff[(m, j)] -= r * ci;
                }
            }
        }
        let norm = weighted_dot(&vals, j, j, weights).sqrt();
        assert!(norm > 1e-13, "degenerate monomial set at column {j}");
        for q in 0..vals.nrows() {
            vals[(q, j)] /= norm;
        }
        for m in 0..n {
            coeff[(m, j)] /= norm;
        }
    }
    coeff
}

fn weighted_dot(vals: &DMatrix<f64>, a: usize, b: usize, weights: &DVector<f64>) -> f64 {
    (0..vals.nrows())
        .map(|q| vals[(q, a)] * vals[(q, b)] * weights[q])
        .sum()
}

/// Shared basis and face-rule tables for one (dimension, order) model.
#[derive(Debug, Clone)]
pub struct BasisRegistry {
    pub order: usize,
    volume: HashMap<ElementShape, Arc<BasisTable>>,
    face: HashMap<ElementShape, Arc<FaceQuadrature>>,
}

impl BasisRegistry {
    pub fn build(dimension: usize, p: usize) -> Self {
        let mut face = HashMap::new();
        for &shape in ElementShape::adjacency_shapes(dimension) {
            face.insert(shape, Arc::new(FaceQuadrature::build(shape, p)));
        }
        let mut volume = HashMap::new();
        for &shape in ElementShape::volume_shapes(dimension) {
            volume.insert(shape, Arc::new(BasisTable::build(shape, p, &face)));
        }
        Self { order: p, volume, face }
    }

    pub fn basis(&self, shape: ElementShape) -> Arc<BasisTable> {
        Arc::clone(&self.volume[&shape])
    }

    pub fn face_quadrature(&self, shape: ElementShape) -> Arc<FaceQuadrature> {
        Arc::clone(&self.face[&shape])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(shape: ElementShape, p: usize) -> BasisTable {
        let mut face_rules = HashMap::new();
        for face in shape.faces() {
            face_rules
                .entry(face.shape)
                .or_insert_with(|| Arc::new(FaceQuadrature::build(face.shape, p)));
        }
        BasisTable::build(shape, p, &face_rules)
    }

    #[test]
    fn modal_basis_is_orthonormal_under_the_reference_inner_product() {
        for shape in [
            ElementShape::Line,
            ElementShape::Triangle,
            ElementShape::Quadrangle,
            ElementShape::Tetrahedron,
            ElementShape::Pyramid,
            ElementShape::Hexahedron,
        ] {
            let t = table(shape, 2);
            let n_b = t.basis_count();
            for a in 0..n_b {
                for b in 0..n_b {
                    let dot: f64 = (0..t.quadrature_count())
                        .map(|q| t.modal_value[(q, a)] * t.modal_value[(q, b)] * t.rule.weights[q])
                        .sum();
                    let expected = if a == b { 1.0 } else { 0.0 };
                    assert!(
                        (dot - expected).abs() < 1e-10,
                        "{shape:?} <{a},{b}> = {dot}"
                    );
                }
            }
        }
    }

    #[test]
    fn first_basis_function_is_constant() {
        let t = table(ElementShape::Triangle, 3);
        let v0 = t.modal_value[(0, 0)];
        for q in 1..t.quadrature_count() {
            assert!((t.modal_value[(q, 0)] - v0).abs() < 1e-12);
        }
    }

    #[test]
    fn leading_block_spans_the_lower_order_space() {
        // Orthonormalizing the same ordered monomial sequence at order p and
        // p-1 must produce the same leading functions: compare values at the
        // shared reference nodes.
        let lo = table(ElementShape::Quadrangle, 2);
        let hi = table(ElementShape::Quadrangle, 3);
        let probe = ElementShape::Quadrangle.reference_nodes(2);
        let lo_vals = lo.evaluate(&probe);
        let hi_vals = hi.evaluate(&probe);
        for b in 0..lo.basis_count() {
            for q in 0..probe.ncols() {
                assert!(
                    (lo_vals[(q, b)] - hi_vals[(q, b)]).abs() < 1e-9,
                    "basis {b} differs between orders at node {q}"
                );
            }
        }
    }

    #[test]
    fn modal_gradients_match_finite_differences() {
        let t = table(ElementShape::Triangle, 3);
        let h = 1e-6;
        let probe = DMatrix::from_column_slice(2, 1, &[0.21, 0.34]);
        for dim in 0..2 {
            let mut plus = probe.clone();
            let mut minus = probe.clone();
            plus[(dim, 0)] += h;
            minus[(dim, 0)] -= h;
            let vp = t.evaluate(&plus);
            let vm = t.evaluate(&minus);
            // Re-evaluate the analytic gradient at the probe point.
            let n_b = t.basis_count();
            for b in 0..n_b {
                let fd = (vp[(0, b)] - vm[(0, b)]) / (2.0 * h);
                let x = [probe[(0, 0)], probe[(1, 0)]];
                let mut analytic = 0.0;
                for (m, e) in t.exponents.iter().enumerate() {
                    analytic += monomial_gradient(e, &x, dim) * t.coefficients[(m, b)];
                }
                assert!(
                    (fd - analytic).abs() < 1e-5,
                    "basis {b} dim {dim}: fd {fd} vs {analytic}"
                );
            }
        }
    }

    #[test]
    fn adjacency_offsets_cover_all_faces() {
        let t = table(ElementShape::Tetrahedron, 2);
        assert_eq!(t.adjacency_offsets.len(), 5);
        assert_eq!(
            t.adjacency_quadrature_count(),
            t.modal_adjacency_value.nrows()
        );
    }

    #[test]
    fn least_squares_recovers_a_polynomial_field() {
        let t = table(ElementShape::Quadrangle, 2);
        // Sample f(x, y) = 1 + 2x - y + x y at the quadrature points and
        // project; re-evaluating must reproduce f.
        let samples = DVector::from_fn(t.quadrature_count(), |q, _| {
            let x = t.rule.points[(0, q)];
            let y = t.rule.points[(1, q)];
            1.0 + 2.0 * x - y + x * y
        });
        let coeff = &t.least_squares * &samples;
        let recon = &t.modal_value * &coeff;
        for q in 0..t.quadrature_count() {
            assert!((recon[q] - samples[q]).abs() < 1e-10);
        }
    }

    #[test]
    fn registry_builds_all_shapes_of_a_model() {
        let reg = BasisRegistry::build(2, 3);
        assert_eq!(reg.basis(ElementShape::Triangle).order, 3);
        assert_eq!(reg.basis(ElementShape::Quadrangle).order, 3);
        assert_eq!(reg.face_quadrature(ElementShape::Line).len(), 4);
    }
}
