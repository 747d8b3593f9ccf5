//! Gauss quadrature rules on the reference shapes.
//!
//! Tensor Gauss–Legendre rules on the tensor-product shapes, Duffy-collapsed
//! tensor rules on the simplices and the pyramid. Adjacency (face) rules are
//! additionally symmetrized under the face's vertex symmetries so that the
//! rotation permutation between the two parents of a shared face is an exact
//! point-matching permutation.

use nalgebra::{DMatrix, DVector};

use crate::shape::{ElementShape, vertex_values};

/// A quadrature rule: reference points (one per column) and weights.
#[derive(Debug, Clone)]
pub struct QuadratureRule {
    pub points: DMatrix<f64>,
    pub weights: DVector<f64>,
}

impl QuadratureRule {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.len() == 0
    }
}

/// Gauss–Legendre nodes and weights on [-1, 1], by Newton iteration on the
/// Legendre polynomial.
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    assert!(n >= 1);
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    for i in 0..n.div_ceil(2) {
        // Chebyshev initial guess.
        let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 0.0;
        for _ in 0..100 {
            let (p, d) = legendre_with_derivative(n, x);
            dp = d;
            let dx = p / d;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        nodes[i] = -x;
        nodes[n - 1 - i] = x;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }
    (nodes, weights)
}

fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let k = k as f64;
        let p2 = ((2.0 * k - 1.0) * x * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    let d = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, d)
}

/// Interior quadrature rule for `shape` exact for the order-`p` DG operator
/// (products of two basis functions and a gradient).
pub fn interior_rule(shape: ElementShape, p: usize) -> QuadratureRule {
    let n = p + 1;
    let nc = p + 2; // collapsed directions carry an extra polynomial degree
    match shape {
        ElementShape::Point => QuadratureRule {
            points: DMatrix::zeros(1, 1),
            weights: DVector::from_element(1, 1.0),
        },
        ElementShape::Line => {
            let (x, w) = gauss_legendre(n);
            QuadratureRule {
                points: DMatrix::from_fn(1, n, |_, j| x[j]),
                weights: DVector::from_vec(w),
            }
        }
        ElementShape::Quadrangle => tensor_rule_2d(n),
        ElementShape::Hexahedron => tensor_rule_3d(n),
        ElementShape::Triangle => duffy_triangle(nc),
        ElementShape::Tetrahedron => duffy_tetrahedron(nc),
        ElementShape::Pyramid => duffy_pyramid(nc),
    }
}

fn tensor_rule_2d(n: usize) -> QuadratureRule {
    let (x, w) = gauss_legendre(n);
    let mut points = DMatrix::zeros(2, n * n);
    let mut weights = DVector::zeros(n * n);
    let mut q = 0;
    for j in 0..n {
        for i in 0..n {
            points[(0, q)] = x[i];
            points[(1, q)] = x[j];
            weights[q] = w[i] * w[j];
            q += 1;
        }
    }
    QuadratureRule { points, weights }
}

fn tensor_rule_3d(n: usize) -> QuadratureRule {
    let (x, w) = gauss_legendre(n);
    let m = n * n * n;
    let mut points = DMatrix::zeros(3, m);
    let mut weights = DVector::zeros(m);
    let mut q = 0;
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                points[(0, q)] = x[i];
                points[(1, q)] = x[j];
                points[(2, q)] = x[k];
                weights[q] = w[i] * w[j] * w[k];
                q += 1;
            }
        }
    }
    QuadratureRule { points, weights }
}

/// Duffy map of the tensor rule onto the unit triangle:
/// x = u(1-v), y = v with Jacobian (1-v)/4 from [-1,1]².
fn duffy_triangle(n: usize) -> QuadratureRule {
    let (x, w) = gauss_legendre(n);
    let m = n * n;
    let mut points = DMatrix::zeros(2, m);
    let mut weights = DVector::zeros(m);
    let mut q = 0;
    for j in 0..n {
        let v = (1.0 + x[j]) / 2.0;
        for i in 0..n {
            let u = (1.0 + x[i]) / 2.0;
            points[(0, q)] = u * (1.0 - v);
            points[(1, q)] = v;
            weights[q] = w[i] * w[j] * (1.0 - v) / 4.0;
            q += 1;
        }
    }
    QuadratureRule { points, weights }
}

/// Double Duffy collapse onto the unit tetrahedron.
fn duffy_tetrahedron(n: usize) -> QuadratureRule {
    let (x, w) = gauss_legendre(n);
    let m = n * n * n;
    let mut points = DMatrix::zeros(3, m);
    let mut weights = DVector::zeros(m);
    let mut q = 0;
    for k in 0..n {
        let t = (1.0 + x[k]) / 2.0;
        for j in 0..n {
            let v = (1.0 + x[j]) / 2.0;
            for i in 0..n {
                let u = (1.0 + x[i]) / 2.0;
                points[(0, q)] = u * (1.0 - v) * (1.0 - t);
                points[(1, q)] = v * (1.0 - t);
                points[(2, q)] = t;
                weights[q] = w[i] * w[j] * w[k] * (1.0 - v) * (1.0 - t) * (1.0 - t) / 8.0;
                q += 1;
            }
        }
    }
    QuadratureRule { points, weights }
}

/// Collapse of the tensor rule onto the pyramid with base [-1,1]² and apex
/// (0,0,1): ξ = u(1-t), η = v(1-t), ζ = t with Jacobian (1-t)²/2.
fn duffy_pyramid(n: usize) -> QuadratureRule {
    let (x, w) = gauss_legendre(n);
    let m = n * n * n;
    let mut points = DMatrix::zeros(3, m);
    let mut weights = DVector::zeros(m);
    let mut q = 0;
    for k in 0..n {
        let t = (1.0 + x[k]) / 2.0;
        for j in 0..n {
            for i in 0..n {
                points[(0, q)] = x[i] * (1.0 - t);
                points[(1, q)] = x[j] * (1.0 - t);
                points[(2, q)] = t;
                weights[q] = w[i] * w[j] * w[k] * (1.0 - t) * (1.0 - t) / 2.0;
                q += 1;
            }
        }
    }
    QuadratureRule { points, weights }
}

/// Quadrature and rotation bookkeeping for one adjacency (face) shape.
///
/// The rule is invariant under the face's vertex symmetries, so the points
/// seen from the two parents of a shared face differ only by a permutation.
/// `sequence[r][j]` maps the left parent's quadrature index `j` to the right
/// parent's index under face rotation `r` (the right parent views the face
/// with reversed orientation).
#[derive(Debug, Clone)]
pub struct FaceQuadrature {
    pub shape: ElementShape,
    pub rule: QuadratureRule,
    pub sequence: Vec<Vec<usize>>,
}

impl FaceQuadrature {
    pub fn build(shape: ElementShape, p: usize) -> Self {
        let rule = match shape {
            ElementShape::Point => QuadratureRule {
                points: DMatrix::zeros(1, 1),
                weights: DVector::from_element(1, 1.0),
            },
            ElementShape::Line => {
                let (x, w) = gauss_legendre(p + 1);
                QuadratureRule {
                    points: DMatrix::from_fn(1, x.len(), |_, j| x[j]),
                    weights: DVector::from_vec(w),
                }
            }
            ElementShape::Quadrangle => tensor_rule_2d(p + 1),
            ElementShape::Triangle => symmetrized_triangle(p + 2),
            _ => panic!("{shape:?} is not an adjacency shape"),
        };
        let sequence = rotation_sequences(shape, &rule);
        Self { shape, rule, sequence }
    }

    pub fn len(&self) -> usize {
        self.rule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule.is_empty()
    }

    /// The permutation for rotation `r`.
    pub fn rotation(&self, r: usize) -> &[usize] {
        &self.sequence[r]
    }
}

/// Triangle rule symmetrized over the six vertex permutations, making the
/// point set invariant under every rotation/reflection of the triangle.
fn symmetrized_triangle(n: usize) -> QuadratureRule {
    let base = duffy_triangle(n);
    let maps: [[usize; 3]; 6] = [
        [0, 1, 2],
        [1, 2, 0],
        [2, 0, 1],
        [0, 2, 1],
        [2, 1, 0],
        [1, 0, 2],
    ];
    let m = base.len() * maps.len();
    let mut points = DMatrix::zeros(2, m);
    let mut weights = DVector::zeros(m);
    let verts = ElementShape::Triangle.reference_vertices();
    let mut q = 0;
    for map in maps {
        for j in 0..base.len() {
            let (x, y) = (base.points[(0, j)], base.points[(1, j)]);
            let bary = [1.0 - x - y, x, y];
            for dim in 0..2 {
                points[(dim, q)] = (0..3).map(|t| bary[map[t]] * verts[(dim, t)]).sum();
            }
            weights[q] = base.weights[j] / maps.len() as f64;
            q += 1;
        }
    }
    QuadratureRule { points, weights }
}

/// For each rotation r, find the permutation matching left quadrature points
/// to right quadrature points through the vertex identification
/// w_t = v_{(r - t) mod m} (reversed orientation as seen from the right).
fn rotation_sequences(shape: ElementShape, rule: &QuadratureRule) -> Vec<Vec<usize>> {
    let m = shape.vertex_count();
    let n = rule.len();
    let verts = shape.reference_vertices();
    let dim = shape.dimension().max(1);
    let mut out = Vec::with_capacity(m);
    for r in 0..m {
        let mut seq = vec![usize::MAX; n];
        for j in 0..n {
            let point: Vec<f64> = (0..dim).map(|i| rule.points[(i, j)]).collect();
            let lambda = vertex_values(shape, &point);
            // The physical point of left index j has right-parametrization
            // coordinates with vertex weights permuted by σ(t) = (r - t) mod m.
            let mut mapped = vec![0.0; dim];
            for t in 0..m {
                let sigma = (r + m - t) % m;
                for i in 0..dim {
                    mapped[i] += lambda[sigma] * verts[(i, t)];
                }
            }
            let mut best = usize::MAX;
            let mut best_dist = f64::MAX;
            for k in 0..n {
                let dist: f64 = (0..dim)
                    .map(|i| (rule.points[(i, k)] - mapped[i]).powi(2))
                    .sum();
                if dist < best_dist {
                    best_dist = dist;
                    best = k;
                }
            }
            assert!(
                best_dist < 1e-16,
                "face rule of {shape:?} is not symmetric under rotation {r} (residual {best_dist:.3e})"
            );
            seq[j] = best;
        }
        out.push(seq);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrate_monomial(rule: &QuadratureRule, exps: &[usize]) -> f64 {
        let mut total = 0.0;
        for q in 0..rule.len() {
            let mut v = 1.0;
            for (i, &e) in exps.iter().enumerate() {
                v *= rule.points[(i, q)].powi(e as i32);
            }
            total += v * rule.weights[q];
        }
        total
    }

    #[test]
    fn gauss_legendre_integrates_high_order_monomials() {
        let (x, w) = gauss_legendre(4);
        // Exact for degree 7: ∫ x⁶ dx = 2/7 on [-1,1].
        let got: f64 = x.iter().zip(w.iter()).map(|(x, w)| w * x.powi(6)).sum();
        assert!((got - 2.0 / 7.0).abs() < 1e-13, "got {got}");
        let odd: f64 = x.iter().zip(w.iter()).map(|(x, w)| w * x.powi(5)).sum();
        assert!(odd.abs() < 1e-13);
    }

    #[test]
    fn interior_rules_reproduce_reference_measures() {
        let cases = [
            (ElementShape::Line, 2.0),
            (ElementShape::Triangle, 0.5),
            (ElementShape::Quadrangle, 4.0),
            (ElementShape::Tetrahedron, 1.0 / 6.0),
            (ElementShape::Pyramid, 4.0 / 3.0),
            (ElementShape::Hexahedron, 8.0),
        ];
        for (shape, volume) in cases {
            let rule = interior_rule(shape, 3);
            let total: f64 = rule.weights.iter().sum();
            assert!(
                (total - volume).abs() < 1e-12,
                "{shape:?}: weights sum to {total}, expected {volume}"
            );
        }
    }

    #[test]
    fn duffy_triangle_integrates_polynomials_exactly() {
        let rule = interior_rule(ElementShape::Triangle, 3);
        // ∫_T x² y dA = 1/60 on the unit triangle.
        let got = integrate_monomial(&rule, &[2, 1]);
        assert!((got - 1.0 / 60.0).abs() < 1e-13, "got {got}");
    }

    #[test]
    fn tetrahedron_rule_integrates_polynomials_exactly() {
        let rule = interior_rule(ElementShape::Tetrahedron, 2);
        // ∫ x y z dV = 1/720 on the unit tetrahedron.
        let got = integrate_monomial(&rule, &[1, 1, 1]);
        assert!((got - 1.0 / 720.0).abs() < 1e-13, "got {got}");
    }

    #[test]
    fn face_rotation_sequences_are_involutions() {
        for (shape, p) in [
            (ElementShape::Line, 3),
            (ElementShape::Triangle, 2),
            (ElementShape::Quadrangle, 2),
        ] {
            let face = FaceQuadrature::build(shape, p);
            let m = shape.vertex_count();
            for r in 0..m {
                // Pairing rotation seen from the other side: the left parent's
                // leading vertex sits at position r in the right sequence and
                // vice versa, so the paired rotation is r itself under the
                // reversed-orientation convention.
                let seq = face.rotation(r);
                for j in 0..face.len() {
                    assert_eq!(
                        seq[seq[j]], j,
                        "{shape:?} rotation {r} is not an involution at {j}"
                    );
                }
            }
        }
    }

    #[test]
    fn line_face_reversal_flips_the_rule() {
        let face = FaceQuadrature::build(ElementShape::Line, 3);
        let n = face.len();
        let seq = face.rotation(1);
        for j in 0..n {
            assert_eq!(seq[j], n - 1 - j);
        }
    }
}
