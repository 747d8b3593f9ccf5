//! The mesh-collaborator contract and a built-in structured generator.
//!
//! The solver consumes meshes through [`MeshSource`]; an external mesh file
//! reader and the built-in [`StructuredMesh`] generator both implement it.
//! Node tags are 1-based and contiguous.

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::shape::ElementShape;

/// All elements of one shape, with per-element all-order node tag lists in
/// catalog node order.
#[derive(Debug, Clone)]
pub struct ElementBlock {
    pub shape: ElementShape,
    pub physical_index: usize,
    pub tags: Vec<usize>,
    pub nodes: Vec<Vec<usize>>,
}

/// Boundary faces of one physical group, as vertex tag lists.
#[derive(Debug, Clone)]
pub struct BoundaryBlock {
    pub physical_index: usize,
    pub shape: ElementShape,
    pub faces: Vec<Vec<usize>>,
}

/// A periodic identification between two boundary physical groups; the node
/// map sends slave node tags to master node tags.
#[derive(Debug, Clone)]
pub struct PeriodicLink {
    pub master_physical: usize,
    pub slave_physical: usize,
    pub node_map: HashMap<usize, usize>,
}

/// The meshing collaborator contract.
pub trait MeshSource {
    fn dimension(&self) -> usize;
    /// Geometric node coordinates, `d × node_count`, keyed by tag - 1.
    fn node_coordinates(&self) -> DMatrix<f64>;
    fn element_blocks(&self) -> Vec<ElementBlock>;
    fn boundary_blocks(&self) -> Vec<BoundaryBlock>;
    fn periodic_links(&self) -> Vec<PeriodicLink>;
}

/// Structured line / quadrangle-grid generator with high-order lattice nodes
/// and optional periodic pairing. Used by the built-in demo cases and the
/// test suite.
#[derive(Debug, Clone)]
pub struct StructuredMesh {
    dimension: usize,
    coordinates: Vec<Vec<f64>>,
    elements: Vec<ElementBlock>,
    boundaries: Vec<BoundaryBlock>,
    periodic: Vec<PeriodicLink>,
}

/// Physical-group tags used by the generator.
#[derive(Debug, Clone, Copy)]
pub struct GridTags {
    pub volume: usize,
    pub left: usize,
    pub right: usize,
    pub bottom: usize,
    pub top: usize,
}

impl Default for GridTags {
    fn default() -> Self {
        Self { volume: 10, left: 1, right: 2, bottom: 3, top: 4 }
    }
}

impl StructuredMesh {
    /// Uniform 1D mesh with `node_count` vertex nodes on `[x0, x1]` at
    /// polynomial order `p`.
    pub fn line(
        x0: f64,
        x1: f64,
        node_count: usize,
        p: usize,
        tags: GridTags,
        periodic: bool,
    ) -> Self {
        assert!(node_count >= 2);
        let cells = node_count - 1;
        let h = (x1 - x0) / cells as f64;
        let mut coordinates: Vec<Vec<f64>> = (0..node_count)
            .map(|i| vec![x0 + i as f64 * h])
            .collect();
        let mut nodes = Vec::with_capacity(cells);
        let mut tags_list = Vec::with_capacity(cells);
        for c in 0..cells {
            let mut list = vec![c + 1, c + 2];
            for k in 1..p {
                coordinates.push(vec![x0 + (c as f64 + k as f64 / p as f64) * h]);
                list.push(coordinates.len());
            }
            nodes.push(list);
            tags_list.push(c + 1);
        }
        let elements = vec![ElementBlock {
            shape: ElementShape::Line,
            physical_index: tags.volume,
            tags: tags_list,
            nodes,
        }];
        let boundaries = vec![
            BoundaryBlock {
                physical_index: tags.left,
                shape: ElementShape::Point,
                faces: vec![vec![1]],
            },
            BoundaryBlock {
                physical_index: tags.right,
                shape: ElementShape::Point,
                faces: vec![vec![node_count]],
            },
        ];
        let periodic = if periodic {
            let mut node_map = HashMap::new();
            node_map.insert(node_count, 1);
            vec![PeriodicLink {
                master_physical: tags.left,
                slave_physical: tags.right,
                node_map,
            }]
        } else {
            Vec::new()
        };
        Self { dimension: 1, coordinates, elements, boundaries, periodic }
    }

    /// Uniform quadrangle grid with `nx × ny` cells on the given rectangle at
    /// polynomial order `p`.
    pub fn quad_grid(
        x_range: (f64, f64),
        y_range: (f64, f64),
        nx: usize,
        ny: usize,
        p: usize,
        tags: GridTags,
        periodic_x: bool,
        periodic_y: bool,
    ) -> Self {
        assert!(nx >= 1 && ny >= 1);
        let hx = (x_range.1 - x_range.0) / nx as f64;
        let hy = (y_range.1 - y_range.0) / ny as f64;
        let vx = nx + 1;
        let vy = ny + 1;
        let vertex_tag = |i: usize, j: usize| j * vx + i + 1;
        let mut coordinates: Vec<Vec<f64>> = Vec::new();
        for j in 0..vy {
            for i in 0..vx {
                coordinates.push(vec![
                    x_range.0 + i as f64 * hx,
                    y_range.0 + j as f64 * hy,
                ]);
            }
        }
        // High-order edge chains in canonical direction (left→right,
        // bottom→top), then cell interiors.
        let mut horizontal_edges: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        let mut vertical_edges: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        if p > 1 {
            for j in 0..vy {
                for i in 0..nx {
                    let mut chain = Vec::with_capacity(p - 1);
                    for k in 1..p {
                        coordinates.push(vec![
                            x_range.0 + (i as f64 + k as f64 / p as f64) * hx,
                            y_range.0 + j as f64 * hy,
                        ]);
                        chain.push(coordinates.len());
                    }
                    horizontal_edges.insert((i, j), chain);
                }
            }
            for j in 0..ny {
                for i in 0..vx {
                    let mut chain = Vec::with_capacity(p - 1);
                    for k in 1..p {
                        coordinates.push(vec![
                            x_range.0 + i as f64 * hx,
                            y_range.0 + (j as f64 + k as f64 / p as f64) * hy,
                        ]);
                        chain.push(coordinates.len());
                    }
                    vertical_edges.insert((i, j), chain);
                }
            }
        }
        let mut nodes = Vec::with_capacity(nx * ny);
        let mut tag_list = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let v = [
                    vertex_tag(i, j),
                    vertex_tag(i + 1, j),
                    vertex_tag(i + 1, j + 1),
                    vertex_tag(i, j + 1),
                ];
                let mut list = v.to_vec();
                if p > 1 {
                    // Catalog edge order (0,1), (1,2), (2,3), (3,0), walked
                    // from the first vertex of each edge.
                    list.extend(horizontal_edges[&(i, j)].iter());
                    list.extend(vertical_edges[&(i + 1, j)].iter());
                    list.extend(horizontal_edges[&(i, j + 1)].iter().rev());
                    list.extend(vertical_edges[&(i, j)].iter().rev());
                    for kj in 1..p {
                        for ki in 1..p {
                            coordinates.push(vec![
                                x_range.0 + (i as f64 + ki as f64 / p as f64) * hx,
                                y_range.0 + (j as f64 + kj as f64 / p as f64) * hy,
                            ]);
                            list.push(coordinates.len());
                        }
                    }
                }
                nodes.push(list);
                tag_list.push(j * nx + i + 1);
            }
        }
        let elements = vec![ElementBlock {
            shape: ElementShape::Quadrangle,
            physical_index: tags.volume,
            tags: tag_list,
            nodes,
        }];

        let mut boundaries = Vec::new();
        let side = |faces: Vec<Vec<usize>>, physical_index: usize| BoundaryBlock {
            physical_index,
            shape: ElementShape::Line,
            faces,
        };
        boundaries.push(side(
            (0..ny).map(|j| vec![vertex_tag(0, j), vertex_tag(0, j + 1)]).collect(),
            tags.left,
        ));
        boundaries.push(side(
            (0..ny)
                .map(|j| vec![vertex_tag(nx, j), vertex_tag(nx, j + 1)])
                .collect(),
            tags.right,
        ));
        boundaries.push(side(
            (0..nx).map(|i| vec![vertex_tag(i, 0), vertex_tag(i + 1, 0)]).collect(),
            tags.bottom,
        ));
        boundaries.push(side(
            (0..nx)
                .map(|i| vec![vertex_tag(i, ny), vertex_tag(i + 1, ny)])
                .collect(),
            tags.top,
        ));

        let mut periodic = Vec::new();
        if periodic_x {
            let mut node_map = HashMap::new();
            for j in 0..vy {
                node_map.insert(vertex_tag(nx, j), vertex_tag(0, j));
            }
            if p > 1 {
                for j in 0..ny {
                    for (a, b) in vertical_edges[&(nx, j)]
                        .iter()
                        .zip(vertical_edges[&(0, j)].iter())
                    {
                        node_map.insert(*a, *b);
                    }
                }
            }
            periodic.push(PeriodicLink {
                master_physical: tags.left,
                slave_physical: tags.right,
                node_map,
            });
        }
        if periodic_y {
            let mut node_map = HashMap::new();
            for i in 0..vx {
                node_map.insert(vertex_tag(i, ny), vertex_tag(i, 0));
            }
            if p > 1 {
                for i in 0..nx {
                    for (a, b) in horizontal_edges[&(i, ny)]
                        .iter()
                        .zip(horizontal_edges[&(i, 0)].iter())
                    {
                        node_map.insert(*a, *b);
                    }
                }
            }
            periodic.push(PeriodicLink {
                master_physical: tags.bottom,
                slave_physical: tags.top,
                node_map,
            });
        }

        Self { dimension: 2, coordinates, elements, boundaries, periodic }
    }
}

impl MeshSource for StructuredMesh {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn node_coordinates(&self) -> DMatrix<f64> {
        let n = self.coordinates.len();
        DMatrix::from_fn(self.dimension, n, |i, j| self.coordinates[j][i])
    }

    fn element_blocks(&self) -> Vec<ElementBlock> {
        self.elements.clone()
    }

    fn boundary_blocks(&self) -> Vec<BoundaryBlock> {
        self.boundaries.clone()
    }

    fn periodic_links(&self) -> Vec<PeriodicLink> {
        self.periodic.clone()
    }
}
