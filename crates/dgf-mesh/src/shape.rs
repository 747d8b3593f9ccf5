//! Reference element shape catalog.
//!
//! Enumerates the element shapes the solver supports, their reference-domain
//! geometry and their adjacency structure (faces, edges, vertex orderings).
//! All-order node layouts follow the convention: vertices first, then edge
//! chains in edge order, then face interiors, then volume interiors.

use nalgebra::DMatrix;

/// Element shape tag.
///
/// Reference domains:
/// - `Line`: ξ ∈ [-1, 1]
/// - `Triangle`: unit triangle (0,0)-(1,0)-(0,1)
/// - `Quadrangle`: [-1, 1]²
/// - `Tetrahedron`: unit tetrahedron (0,0,0)-(1,0,0)-(0,1,0)-(0,0,1)
/// - `Pyramid`: base [-1,1]² at ζ = 0, apex (0,0,1)
/// - `Hexahedron`: [-1, 1]³
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementShape {
    Point,
    Line,
    Triangle,
    Quadrangle,
    Tetrahedron,
    Pyramid,
    Hexahedron,
}

/// One face of a parent shape: the sub-shape and the parent-vertex indices
/// listed in outward orientation.
#[derive(Debug, Clone, Copy)]
pub struct FaceDef {
    pub shape: ElementShape,
    pub vertices: &'static [usize],
}

impl ElementShape {
    /// Spatial dimension of the reference domain.
    pub fn dimension(&self) -> usize {
        match self {
            ElementShape::Point => 0,
            ElementShape::Line => 1,
            ElementShape::Triangle | ElementShape::Quadrangle => 2,
            ElementShape::Tetrahedron | ElementShape::Pyramid | ElementShape::Hexahedron => 3,
        }
    }

    /// Number of basic (vertex) nodes.
    pub fn vertex_count(&self) -> usize {
        match self {
            ElementShape::Point => 1,
            ElementShape::Line => 2,
            ElementShape::Triangle => 3,
            ElementShape::Quadrangle => 4,
            ElementShape::Tetrahedron => 4,
            ElementShape::Pyramid => 5,
            ElementShape::Hexahedron => 8,
        }
    }

    /// Number of all-order nodes at polynomial order `p`.
    pub fn node_count(&self, p: usize) -> usize {
        match self {
            ElementShape::Point => 1,
            ElementShape::Line => p + 1,
            ElementShape::Triangle => (p + 1) * (p + 2) / 2,
            ElementShape::Quadrangle => (p + 1) * (p + 1),
            ElementShape::Tetrahedron => (p + 1) * (p + 2) * (p + 3) / 6,
            ElementShape::Pyramid => (1..=p + 1).map(|i| i * i).sum(),
            ElementShape::Hexahedron => (p + 1) * (p + 1) * (p + 1),
        }
    }

    /// Number of modal basis functions at order `p` (equals the all-order
    /// node count: the modal spaces are nodal-complete).
    pub fn basis_count(&self, p: usize) -> usize {
        self.node_count(p)
    }

    /// Number of adjacency faces.
    pub fn face_count(&self) -> usize {
        self.faces().len()
    }

    /// Face table: sub-shape and outward-oriented parent-vertex indices per
    /// face id.
    pub fn faces(&self) -> &'static [FaceDef] {
        const POINT: &[FaceDef] = &[];
        const LINE: &[FaceDef] = &[
            FaceDef { shape: ElementShape::Point, vertices: &[0] },
            FaceDef { shape: ElementShape::Point, vertices: &[1] },
        ];
        const TRIANGLE: &[FaceDef] = &[
            FaceDef { shape: ElementShape::Line, vertices: &[0, 1] },
            FaceDef { shape: ElementShape::Line, vertices: &[1, 2] },
            FaceDef { shape: ElementShape::Line, vertices: &[2, 0] },
        ];
        const QUADRANGLE: &[FaceDef] = &[
            FaceDef { shape: ElementShape::Line, vertices: &[0, 1] },
            FaceDef { shape: ElementShape::Line, vertices: &[1, 2] },
            FaceDef { shape: ElementShape::Line, vertices: &[2, 3] },
            FaceDef { shape: ElementShape::Line, vertices: &[3, 0] },
        ];
        const TETRAHEDRON: &[FaceDef] = &[
            FaceDef { shape: ElementShape::Triangle, vertices: &[0, 2, 1] },
            FaceDef { shape: ElementShape::Triangle, vertices: &[0, 1, 3] },
            FaceDef { shape: ElementShape::Triangle, vertices: &[0, 3, 2] },
            FaceDef { shape: ElementShape::Triangle, vertices: &[1, 2, 3] },
        ];
        const PYRAMID: &[FaceDef] = &[
            FaceDef { shape: ElementShape::Quadrangle, vertices: &[0, 3, 2, 1] },
            FaceDef { shape: ElementShape::Triangle, vertices: &[0, 1, 4] },
            FaceDef { shape: ElementShape::Triangle, vertices: &[1, 2, 4] },
            FaceDef { shape: ElementShape::Triangle, vertices: &[2, 3, 4] },
            FaceDef { shape: ElementShape::Triangle, vertices: &[3, 0, 4] },
        ];
        const HEXAHEDRON: &[FaceDef] = &[
            FaceDef { shape: ElementShape::Quadrangle, vertices: &[0, 3, 2, 1] },
            FaceDef { shape: ElementShape::Quadrangle, vertices: &[4, 5, 6, 7] },
            FaceDef { shape: ElementShape::Quadrangle, vertices: &[0, 1, 5, 4] },
            FaceDef { shape: ElementShape::Quadrangle, vertices: &[1, 2, 6, 5] },
            FaceDef { shape: ElementShape::Quadrangle, vertices: &[2, 3, 7, 6] },
            FaceDef { shape: ElementShape::Quadrangle, vertices: &[3, 0, 4, 7] },
        ];
        match self {
            ElementShape::Point => POINT,
            ElementShape::Line => LINE,
            ElementShape::Triangle => TRIANGLE,
            ElementShape::Quadrangle => QUADRANGLE,
            ElementShape::Tetrahedron => TETRAHEDRON,
            ElementShape::Pyramid => PYRAMID,
            ElementShape::Hexahedron => HEXAHEDRON,
        }
    }

    /// Edge table (vertex index pairs), used for minimum-edge queries.
    pub fn edges(&self) -> &'static [[usize; 2]] {
        const POINT: &[[usize; 2]] = &[];
        const LINE: &[[usize; 2]] = &[[0, 1]];
        const TRIANGLE: &[[usize; 2]] = &[[0, 1], [1, 2], [2, 0]];
        const QUADRANGLE: &[[usize; 2]] = &[[0, 1], [1, 2], [2, 3], [3, 0]];
        const TETRAHEDRON: &[[usize; 2]] =
            &[[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];
        const PYRAMID: &[[usize; 2]] =
            &[[0, 1], [1, 2], [2, 3], [3, 0], [0, 4], [1, 4], [2, 4], [3, 4]];
        const HEXAHEDRON: &[[usize; 2]] = &[
            [0, 1], [1, 2], [2, 3], [3, 0],
            [4, 5], [5, 6], [6, 7], [7, 4],
            [0, 4], [1, 5], [2, 6], [3, 7],
        ];
        match self {
            ElementShape::Point => POINT,
            ElementShape::Line => LINE,
            ElementShape::Triangle => TRIANGLE,
            ElementShape::Quadrangle => QUADRANGLE,
            ElementShape::Tetrahedron => TETRAHEDRON,
            ElementShape::Pyramid => PYRAMID,
            ElementShape::Hexahedron => HEXAHEDRON,
        }
    }

    /// Reference coordinates of the basic vertices, one column per vertex.
    pub fn reference_vertices(&self) -> DMatrix<f64> {
        let coords: &[&[f64]] = match self {
            ElementShape::Point => &[&[]],
            ElementShape::Line => &[&[-1.0], &[1.0]],
            ElementShape::Triangle => &[&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]],
            ElementShape::Quadrangle => {
                &[&[-1.0, -1.0], &[1.0, -1.0], &[1.0, 1.0], &[-1.0, 1.0]]
            }
            ElementShape::Tetrahedron => &[
                &[0.0, 0.0, 0.0],
                &[1.0, 0.0, 0.0],
                &[0.0, 1.0, 0.0],
                &[0.0, 0.0, 1.0],
            ],
            ElementShape::Pyramid => &[
                &[-1.0, -1.0, 0.0],
                &[1.0, -1.0, 0.0],
                &[1.0, 1.0, 0.0],
                &[-1.0, 1.0, 0.0],
                &[0.0, 0.0, 1.0],
            ],
            ElementShape::Hexahedron => &[
                &[-1.0, -1.0, -1.0],
                &[1.0, -1.0, -1.0],
                &[1.0, 1.0, -1.0],
                &[-1.0, 1.0, -1.0],
                &[-1.0, -1.0, 1.0],
                &[1.0, -1.0, 1.0],
                &[1.0, 1.0, 1.0],
                &[-1.0, 1.0, 1.0],
            ],
        };
        let dim = self.dimension().max(1);
        let mut out = DMatrix::zeros(dim, coords.len());
        for (v, c) in coords.iter().enumerate() {
            for (i, x) in c.iter().enumerate() {
                out[(i, v)] = *x;
            }
        }
        out
    }

    /// All-order reference node layout at order `p`: vertices first, then
    /// edge chains in edge order, then the remaining lattice in
    /// lexicographic order.
    pub fn reference_nodes(&self, p: usize) -> DMatrix<f64> {
        let dim = self.dimension().max(1);
        let mut nodes: Vec<Vec<f64>> = Vec::with_capacity(self.node_count(p));
        let vertices = self.reference_vertices();
        for v in 0..self.vertex_count() {
            nodes.push(vertices.column(v).iter().copied().collect());
        }
        if p > 1 {
            // Edge interior nodes, p-1 per edge, walked from the first vertex.
            for edge in self.edges() {
                let a = vertices.column(edge[0]);
                let b = vertices.column(edge[1]);
                for k in 1..p {
                    let t = k as f64 / p as f64;
                    nodes.push((0..dim).map(|i| a[i] + t * (b[i] - a[i])).collect());
                }
            }
            self.push_interior_nodes(p, &mut nodes);
        }
        debug_assert_eq!(nodes.len(), self.node_count(p));
        let mut out = DMatrix::zeros(dim, nodes.len());
        for (j, n) in nodes.iter().enumerate() {
            for i in 0..dim {
                out[(i, j)] = n[i];
            }
        }
        out
    }

    fn push_interior_nodes(&self, p: usize, nodes: &mut Vec<Vec<f64>>) {
        let h = 1.0 / p as f64;
        match self {
            ElementShape::Point | ElementShape::Line => {}
            ElementShape::Triangle => {
                for j in 1..p {
                    for i in 1..p {
                        if i + j < p {
                            nodes.push(vec![i as f64 * h, j as f64 * h]);
                        }
                    }
                }
            }
            ElementShape::Quadrangle => {
                for j in 1..p {
                    for i in 1..p {
                        nodes.push(vec![-1.0 + 2.0 * i as f64 * h, -1.0 + 2.0 * j as f64 * h]);
                    }
                }
            }
            ElementShape::Tetrahedron => {
                // Face interiors in face order, then the volume lattice.
                for face in self.faces() {
                    let verts = self.reference_vertices();
                    for j in 1..p {
                        for i in 1..p {
                            if i + j < p {
                                let (a, b, c) = (
                                    verts.column(face.vertices[0]),
                                    verts.column(face.vertices[1]),
                                    verts.column(face.vertices[2]),
                                );
                                let (u, v) = (i as f64 * h, j as f64 * h);
                                nodes.push(
                                    (0..3)
                                        .map(|t| a[t] + u * (b[t] - a[t]) + v * (c[t] - a[t]))
                                        .collect(),
                                );
                            }
                        }
                    }
                }
                for k in 1..p {
                    for j in 1..p {
                        for i in 1..p {
                            if i + j + k < p {
                                nodes.push(vec![i as f64 * h, j as f64 * h, k as f64 * h]);
                            }
                        }
                    }
                }
            }
            ElementShape::Pyramid | ElementShape::Hexahedron => {
                // Remaining lattice points in lexicographic order; for the
                // pyramid the lattice shrinks with height.
                let start = nodes.len();
                let want = self.node_count(p);
                'outer: for k in 0..=p {
                    let layers: Vec<Vec<f64>> = match self {
                        ElementShape::Pyramid => {
                            let m = p - k;
                            let z = k as f64 / p as f64;
                            let mut layer = Vec::new();
                            for j in 0..=m {
                                for i in 0..=m {
                                    let s = if m == 0 { 0.0 } else { 1.0 - z };
                                    let (x, y) = if m == 0 {
                                        (0.0, 0.0)
                                    } else {
                                        (
                                            s * (-1.0 + 2.0 * i as f64 / m as f64),
                                            s * (-1.0 + 2.0 * j as f64 / m as f64),
                                        )
                                    };
                                    layer.push(vec![x, y, z]);
                                }
                            }
                            layer
                        }
                        _ => {
                            let mut layer = Vec::new();
                            for j in 0..=p {
                                for i in 0..=p {
                                    layer.push(vec![
                                        -1.0 + 2.0 * i as f64 * h,
                                        -1.0 + 2.0 * j as f64 * h,
                                        -1.0 + 2.0 * k as f64 * h,
                                    ]);
                                }
                            }
                            layer
                        }
                    };
                    for cand in layers {
                        if nodes.len() == want {
                            break 'outer;
                        }
                        let dup = nodes.iter().any(|n| {
                            n.iter()
                                .zip(cand.iter())
                                .all(|(a, b)| (a - b).abs() < 1e-12)
                        });
                        if !dup {
                            nodes.push(cand);
                        }
                    }
                }
                debug_assert!(nodes.len() >= start);
            }
        }
    }

    /// Volume shapes of a `d`-dimensional model in catalog (serialization)
    /// order.
    pub fn volume_shapes(dimension: usize) -> &'static [ElementShape] {
        match dimension {
            1 => &[ElementShape::Line],
            2 => &[ElementShape::Triangle, ElementShape::Quadrangle],
            3 => &[
                ElementShape::Tetrahedron,
                ElementShape::Pyramid,
                ElementShape::Hexahedron,
            ],
            _ => &[],
        }
    }

    /// Adjacency shapes of a `d`-dimensional model in catalog order.
    pub fn adjacency_shapes(dimension: usize) -> &'static [ElementShape] {
        match dimension {
            1 => &[ElementShape::Point],
            2 => &[ElementShape::Line],
            3 => &[ElementShape::Triangle, ElementShape::Quadrangle],
            _ => &[],
        }
    }
}

/// Linear vertex shape function values at a reference point.
///
/// These are the geometric mapping functions: barycentric on simplices,
/// bi/tri-linear on tensor shapes, and the rational pyramid functions
/// (finite everywhere on the closed reference pyramid).
pub fn vertex_values(shape: ElementShape, point: &[f64]) -> Vec<f64> {
    match shape {
        ElementShape::Point => vec![1.0],
        ElementShape::Line => {
            let x = point[0];
            vec![(1.0 - x) / 2.0, (1.0 + x) / 2.0]
        }
        ElementShape::Triangle => {
            let (x, y) = (point[0], point[1]);
            vec![1.0 - x - y, x, y]
        }
        ElementShape::Quadrangle => {
            let (x, y) = (point[0], point[1]);
            vec![
                (1.0 - x) * (1.0 - y) / 4.0,
                (1.0 + x) * (1.0 - y) / 4.0,
                (1.0 + x) * (1.0 + y) / 4.0,
                (1.0 - x) * (1.0 + y) / 4.0,
            ]
        }
        ElementShape::Tetrahedron => {
            let (x, y, z) = (point[0], point[1], point[2]);
            vec![1.0 - x - y - z, x, y, z]
        }
        ElementShape::Pyramid => {
            let (x, y, z) = (point[0], point[1], point[2]);
            let m = 1.0 - z;
            if m.abs() < 1e-14 {
                return vec![0.0, 0.0, 0.0, 0.0, 1.0];
            }
            let (a, b) = (x / m, y / m);
            vec![
                m * (1.0 - a) * (1.0 - b) / 4.0,
                m * (1.0 + a) * (1.0 - b) / 4.0,
                m * (1.0 + a) * (1.0 + b) / 4.0,
                m * (1.0 - a) * (1.0 + b) / 4.0,
                z,
            ]
        }
        ElementShape::Hexahedron => {
            let (x, y, z) = (point[0], point[1], point[2]);
            let mut out = Vec::with_capacity(8);
            for (sx, sy, sz) in [
                (-1.0, -1.0, -1.0),
                (1.0, -1.0, -1.0),
                (1.0, 1.0, -1.0),
                (-1.0, 1.0, -1.0),
                (-1.0, -1.0, 1.0),
                (1.0, -1.0, 1.0),
                (1.0, 1.0, 1.0),
                (-1.0, 1.0, 1.0),
            ] {
                out.push((1.0 + sx * x) * (1.0 + sy * y) * (1.0 + sz * z) / 8.0);
            }
            out
        }
    }
}

/// Gradients of the linear vertex shape functions at a reference point,
/// returned as a `vertex_count × dimension` row-major table.
pub fn vertex_gradients(shape: ElementShape, point: &[f64]) -> Vec<Vec<f64>> {
    match shape {
        ElementShape::Point => vec![vec![]],
        ElementShape::Line => vec![vec![-0.5], vec![0.5]],
        ElementShape::Triangle => vec![vec![-1.0, -1.0], vec![1.0, 0.0], vec![0.0, 1.0]],
        ElementShape::Quadrangle => {
            let (x, y) = (point[0], point[1]);
            vec![
                vec![-(1.0 - y) / 4.0, -(1.0 - x) / 4.0],
                vec![(1.0 - y) / 4.0, -(1.0 + x) / 4.0],
                vec![(1.0 + y) / 4.0, (1.0 + x) / 4.0],
                vec![-(1.0 + y) / 4.0, (1.0 - x) / 4.0],
            ]
        }
        ElementShape::Tetrahedron => vec![
            vec![-1.0, -1.0, -1.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ],
        ElementShape::Pyramid => {
            let (x, y, z) = (point[0], point[1], point[2]);
            let m = 1.0 - z;
            // N_i = (m ± x)(m ± y)/(4m) for the base; interior quadrature
            // points keep m > 0.
            let m = if m.abs() < 1e-14 { 1e-14 } else { m };
            let signs = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
            let mut out = Vec::with_capacity(5);
            for (sx, sy) in signs {
                let u = m + sx * x;
                let v = m + sy * y;
                // N = u v / (4 m)
                out.push(vec![
                    sx * v / (4.0 * m),
                    sy * u / (4.0 * m),
                    (-(u + v) * m + u * v) / (4.0 * m * m),
                ]);
            }
            out.push(vec![0.0, 0.0, 1.0]);
            out
        }
        ElementShape::Hexahedron => {
            let (x, y, z) = (point[0], point[1], point[2]);
            let signs = [
                (-1.0, -1.0, -1.0),
                (1.0, -1.0, -1.0),
                (1.0, 1.0, -1.0),
                (-1.0, 1.0, -1.0),
                (-1.0, -1.0, 1.0),
                (1.0, -1.0, 1.0),
                (1.0, 1.0, 1.0),
                (-1.0, 1.0, 1.0),
            ];
            signs
                .iter()
                .map(|(sx, sy, sz)| {
                    vec![
                        sx * (1.0 + sy * y) * (1.0 + sz * z) / 8.0,
                        (1.0 + sx * x) * sy * (1.0 + sz * z) / 8.0,
                        (1.0 + sx * x) * (1.0 + sy * y) * sz / 8.0,
                    ]
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_counts_match_known_values() {
        assert_eq!(ElementShape::Line.node_count(3), 4);
        assert_eq!(ElementShape::Triangle.node_count(3), 10);
        assert_eq!(ElementShape::Quadrangle.node_count(3), 16);
        assert_eq!(ElementShape::Tetrahedron.node_count(2), 10);
        assert_eq!(ElementShape::Pyramid.node_count(1), 5);
        assert_eq!(ElementShape::Pyramid.node_count(2), 14);
        assert_eq!(ElementShape::Hexahedron.node_count(2), 27);
    }

    #[test]
    fn reference_nodes_have_expected_count() {
        for shape in [
            ElementShape::Line,
            ElementShape::Triangle,
            ElementShape::Quadrangle,
            ElementShape::Tetrahedron,
            ElementShape::Pyramid,
            ElementShape::Hexahedron,
        ] {
            for p in 1..=3 {
                let nodes = shape.reference_nodes(p);
                assert_eq!(
                    nodes.ncols(),
                    shape.node_count(p),
                    "{shape:?} order {p}: got {} nodes",
                    nodes.ncols()
                );
            }
        }
    }

    #[test]
    fn vertex_values_are_a_partition_of_unity() {
        let probes: &[(ElementShape, &[f64])] = &[
            (ElementShape::Line, &[0.3]),
            (ElementShape::Triangle, &[0.2, 0.3]),
            (ElementShape::Quadrangle, &[0.1, -0.4]),
            (ElementShape::Tetrahedron, &[0.1, 0.2, 0.3]),
            (ElementShape::Pyramid, &[0.1, -0.2, 0.4]),
            (ElementShape::Hexahedron, &[0.3, -0.1, 0.5]),
        ];
        for (shape, point) in probes {
            let sum: f64 = vertex_values(*shape, point).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "{shape:?}: sum = {sum}");
        }
    }

    #[test]
    fn vertex_values_interpolate_vertices() {
        for shape in [
            ElementShape::Line,
            ElementShape::Triangle,
            ElementShape::Quadrangle,
            ElementShape::Tetrahedron,
            ElementShape::Pyramid,
            ElementShape::Hexahedron,
        ] {
            let verts = shape.reference_vertices();
            for v in 0..shape.vertex_count() {
                let point: Vec<f64> = verts.column(v).iter().copied().collect();
                let values = vertex_values(shape, &point);
                for (i, n) in values.iter().enumerate() {
                    let expected = if i == v { 1.0 } else { 0.0 };
                    assert!(
                        (n - expected).abs() < 1e-12,
                        "{shape:?} N[{i}] = {n} at vertex {v}"
                    );
                }
            }
        }
    }

    #[test]
    fn vertex_gradients_match_finite_differences() {
        let probes: &[(ElementShape, &[f64])] = &[
            (ElementShape::Quadrangle, &[0.1, -0.4]),
            (ElementShape::Tetrahedron, &[0.1, 0.2, 0.3]),
            (ElementShape::Pyramid, &[0.1, -0.2, 0.4]),
            (ElementShape::Hexahedron, &[0.3, -0.1, 0.5]),
        ];
        let h = 1e-6;
        for (shape, point) in probes {
            let grads = vertex_gradients(*shape, point);
            for dim in 0..shape.dimension() {
                let mut plus = point.to_vec();
                let mut minus = point.to_vec();
                plus[dim] += h;
                minus[dim] -= h;
                let vp = vertex_values(*shape, &plus);
                let vm = vertex_values(*shape, &minus);
                for v in 0..shape.vertex_count() {
                    let fd = (vp[v] - vm[v]) / (2.0 * h);
                    assert!(
                        (grads[v][dim] - fd).abs() < 1e-6,
                        "{shape:?} vertex {v} dim {dim}: {} vs {fd}",
                        grads[v][dim]
                    );
                }
            }
        }
    }

    #[test]
    fn face_vertices_orient_outward_on_the_hexahedron() {
        let shape = ElementShape::Hexahedron;
        let verts = shape.reference_vertices();
        for face in shape.faces() {
            let a = verts.column(face.vertices[0]);
            let b = verts.column(face.vertices[1]);
            let d = verts.column(face.vertices[3]);
            let t1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let t2 = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
            let n = [
                t1[1] * t2[2] - t1[2] * t2[1],
                t1[2] * t2[0] - t1[0] * t2[2],
                t1[0] * t2[1] - t1[1] * t2[0],
            ];
            // The face centroid dotted with the normal must be positive for a
            // centered reference cube.
            let c: Vec<f64> = (0..3)
                .map(|i| face.vertices.iter().map(|&v| verts[(i, v)]).sum::<f64>() / 4.0)
                .collect();
            let dot = n[0] * c[0] + n[1] * c[1] + n[2] * c[2];
            assert!(dot > 0.0, "face {:?} not outward", face.vertices);
        }
    }
}
