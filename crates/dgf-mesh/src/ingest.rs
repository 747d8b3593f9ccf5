//! Mesh ingest: builds the solver mesh from a [`MeshSource`].
//!
//! Every face produced by a volume element is collected under a canonical
//! vertex-tag key; interior faces are exactly those seen twice, boundary
//! faces once. Periodic physical groups are collapsed at ingest time: the
//! slave face's parent is merged into the master face, which then behaves
//! like an interior face with a recorded rotation.

use std::collections::HashMap;

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::info;

use crate::basis::BasisRegistry;
use crate::error::{MeshError, Result};
use crate::geometry::{face_geometry, inner_radius, minimum_edge, volume_geometry};
use crate::mesh::{
    AdjacencyGroup, AdjacencyRecord, ElementGroup, ElementRecord, FaceLink, Mesh, ParentLink, Side,
};
use crate::shape::ElementShape;
use crate::source::MeshSource;

struct RawElement {
    tag: usize,
    physical_index: usize,
    node_tags: Vec<usize>,
}

struct PendingAdjacency {
    shape: ElementShape,
    /// Vertex tags in the left parent's face order.
    node_tags: Vec<usize>,
    left: ParentLink,
    right: Option<ParentLink>,
    rotation: usize,
    physical_index: Option<usize>,
}

/// Ingest a mesh at polynomial order `p`.
pub fn ingest(source: &dyn MeshSource, p: usize) -> Result<Mesh> {
    let dimension = source.dimension();
    let registry = BasisRegistry::build(dimension, p);
    let node_coordinates = source.node_coordinates();
    let node_count = node_coordinates.ncols();

    // Collect volume elements per shape in catalog order.
    let blocks = source.element_blocks();
    let mut raw_groups: Vec<(ElementShape, Vec<RawElement>)> = Vec::new();
    for &shape in ElementShape::volume_shapes(dimension) {
        let mut elements = Vec::new();
        let mut declared = false;
        for block in blocks.iter().filter(|b| b.shape == shape) {
            declared = true;
            for (tag, nodes) in block.tags.iter().zip(block.nodes.iter()) {
                let expected = shape.node_count(p);
                if nodes.len() != expected {
                    return Err(MeshError::NodeCountMismatch {
                        tag: *tag,
                        expected,
                        actual: nodes.len(),
                    });
                }
                for &node_tag in nodes {
                    if node_tag == 0 || node_tag > node_count {
                        return Err(MeshError::UnknownNode { tag: *tag, node_tag });
                    }
                }
                elements.push(RawElement {
                    tag: *tag,
                    physical_index: block.physical_index,
                    node_tags: nodes.clone(),
                });
            }
        }
        if declared && elements.is_empty() {
            return Err(MeshError::EmptyElement { shape });
        }
        if !elements.is_empty() {
            raw_groups.push((shape, elements));
        }
    }
    if raw_groups.is_empty() {
        return Err(MeshError::EmptyElement {
            shape: ElementShape::volume_shapes(dimension)[0],
        });
    }

    // First/second sighting of every face.
    let mut pending: HashMap<(ElementShape, Vec<usize>), PendingAdjacency> = HashMap::new();
    for (shape, elements) in &raw_groups {
        for (element_index, element) in elements.iter().enumerate() {
            for (face_id, face) in shape.faces().iter().enumerate() {
                let tags: Vec<usize> =
                    face.vertices.iter().map(|&v| element.node_tags[v]).collect();
                let mut key = tags.clone();
                key.sort_unstable();
                let link = ParentLink {
                    shape: *shape,
                    element_index,
                    face_id,
                };
                match pending.entry((face.shape, key)) {
                    std::collections::hash_map::Entry::Vacant(slot) => {
                        slot.insert(PendingAdjacency {
                            shape: face.shape,
                            node_tags: tags,
                            left: link,
                            right: None,
                            rotation: 0,
                            physical_index: None,
                        });
                    }
                    std::collections::hash_map::Entry::Occupied(mut slot) => {
                        let entry = slot.get_mut();
                        if entry.right.is_some() {
                            return Err(MeshError::DuplicateAdjacency {
                                node_tags: entry.node_tags.clone(),
                            });
                        }
                        entry.rotation = face_rotation(&entry.node_tags, &tags)?;
                        entry.right = Some(link);
                    }
                }
            }
        }
    }

    // Boundary physical groups.
    for block in source.boundary_blocks() {
        for face in &block.faces {
            let mut key = face.clone();
            key.sort_unstable();
            match pending.get_mut(&(block.shape, key)) {
                Some(entry) if entry.right.is_none() => {
                    entry.physical_index = Some(block.physical_index);
                }
                _ => {
                    return Err(MeshError::OrphanFace { node_tags: face.clone() });
                }
            }
        }
    }

    // Periodic collapse: the slave's parent merges into the master face.
    for link in source.periodic_links() {
        let slave_keys: Vec<(ElementShape, Vec<usize>)> = pending
            .iter()
            .filter(|(_, e)| e.physical_index == Some(link.slave_physical) && e.right.is_none())
            .map(|(k, _)| k.clone())
            .collect();
        let master_count = pending
            .values()
            .filter(|e| e.physical_index == Some(link.master_physical) && e.right.is_none())
            .count();
        if slave_keys.len() != master_count {
            return Err(MeshError::PeriodicMismatch {
                master: link.master_physical,
                slave: link.slave_physical,
                detail: format!(
                    "{} master faces vs {} slave faces",
                    master_count,
                    slave_keys.len()
                ),
            });
        }
        for slave_key in slave_keys {
            let slave = pending.remove(&slave_key).expect("slave key was just listed");
            let mapped: Vec<usize> = slave
                .node_tags
                .iter()
                .map(|t| {
                    link.node_map.get(t).copied().ok_or_else(|| {
                        MeshError::PeriodicMismatch {
                            master: link.master_physical,
                            slave: link.slave_physical,
                            detail: format!("node map is missing slave tag {t}"),
                        }
                    })
                })
                .collect::<Result<_>>()?;
            let mut master_key = mapped.clone();
            master_key.sort_unstable();
            let master = pending
                .get_mut(&(slave.shape, master_key))
                .filter(|e| e.right.is_none())
                .ok_or_else(|| MeshError::PeriodicMismatch {
                    master: link.master_physical,
                    slave: link.slave_physical,
                    detail: format!(
                        "no master face matches mapped slave tags {mapped:?}"
                    ),
                })?;
            master.rotation = face_rotation(&master.node_tags, &mapped)?;
            master.right = Some(slave.left);
            master.physical_index = None;
        }
    }

    // Partition into per-shape adjacency groups, interior first, with
    // face geometry from the left parent's view.
    let mut adjacency_groups: Vec<AdjacencyGroup> = Vec::new();
    let mut face_links: HashMap<(ElementShape, usize, usize), FaceLink> = HashMap::new();
    for &shape in ElementShape::adjacency_shapes(dimension) {
        let mut entries: Vec<PendingAdjacency> = Vec::new();
        let keys: Vec<_> = pending
            .keys()
            .filter(|(s, _)| *s == shape)
            .cloned()
            .collect();
        for key in keys {
            entries.push(pending.remove(&key).expect("key just listed"));
        }
        entries.sort_by(|a, b| {
            (a.right.is_none(), &a.node_tags).cmp(&(b.right.is_none(), &b.node_tags))
        });
        let interior_count = entries.iter().filter(|e| e.right.is_some()).count();
        let quadrature = registry.face_quadrature(shape);
        let mut records = Vec::with_capacity(entries.len());
        for (adjacency_index, entry) in entries.into_iter().enumerate() {
            if entry.right.is_none() && entry.physical_index.is_none() {
                return Err(MeshError::OrphanFace { node_tags: entry.node_tags });
            }
            let face_vertices = gather_coordinates(&node_coordinates, &entry.node_tags);
            let left_raw = find_raw(&raw_groups, &entry.left);
            let parent_vertices = gather_coordinates(
                &node_coordinates,
                &left_raw.node_tags[..entry.left.shape.vertex_count()],
            );
            let geometry = face_geometry(
                shape,
                &face_vertices,
                dimension,
                &parent_vertices,
                &quadrature,
            );
            let mut parents = vec![entry.left];
            face_links.insert(
                (entry.left.shape, entry.left.element_index, entry.left.face_id),
                FaceLink { shape, adjacency_index, side: Side::Left },
            );
            if let Some(right) = entry.right {
                parents.push(right);
                face_links.insert(
                    (right.shape, right.element_index, right.face_id),
                    FaceLink { shape, adjacency_index, side: Side::Right },
                );
            }
            records.push(AdjacencyRecord {
                node_tag: entry.node_tags,
                node_coordinate: face_vertices,
                quadrature_node_coordinate: geometry.quadrature_node_coordinate,
                jacobian_determinant_weight: geometry.jacobian_determinant_weight,
                normal_vector: geometry.normal_vector,
                parents,
                rotation: entry.rotation,
                physical_index: entry.physical_index,
            });
        }
        if !records.is_empty() {
            adjacency_groups.push(AdjacencyGroup {
                shape,
                quadrature,
                interior_count,
                elements: records,
            });
        }
    }

    // Volume element records, geometry computed element-parallel.
    let mut element_groups = Vec::with_capacity(raw_groups.len());
    for (shape, elements) in &raw_groups {
        let basis = registry.basis(*shape);
        let records: Vec<ElementRecord> = elements
            .par_iter()
            .enumerate()
            .map(|(element_index, element)| {
                let node_coordinate = gather_coordinates(&node_coordinates, &element.node_tags);
                let vertices = gather_coordinates(
                    &node_coordinates,
                    &element.node_tags[..shape.vertex_count()],
                );
                let geometry = volume_geometry(*shape, &vertices, &basis, element.tag)?;
                let faces = (0..shape.face_count())
                    .map(|face_id| {
                        *face_links
                            .get(&(*shape, element_index, face_id))
                            .expect("every face is linked to an adjacency")
                    })
                    .collect();
                Ok(ElementRecord {
                    tag: element.tag,
                    physical_index: element.physical_index,
                    node_tag: element.node_tags.clone(),
                    node_coordinate,
                    quadrature_node_coordinate: geometry.quadrature_node_coordinate,
                    jacobian_determinant_weight: geometry.jacobian_determinant_weight,
                    jacobian_transpose_inverse_weight: geometry.jacobian_transpose_inverse_weight,
                    minimum_edge: minimum_edge(*shape, &vertices),
                    inner_radius: inner_radius(*shape, &vertices, &basis.rule, &|s| {
                        registry.face_quadrature(s).rule.clone()
                    }),
                    local_mass_matrix_inverse: geometry.local_mass_matrix_inverse,
                    faces,
                })
            })
            .collect::<Result<_>>()?;
        element_groups.push(ElementGroup { shape: *shape, basis, elements: records });
    }

    let mesh = Mesh {
        dimension,
        order: p,
        node_coordinates,
        element_groups,
        adjacency_groups,
        registry,
    };
    let stats = mesh.statistics();
    info!(
        nodes = stats.node_count,
        elements = stats.element_count,
        interior_faces = stats.interior_adjacency_count,
        boundary_faces = stats.boundary_adjacency_count,
        "mesh ingested"
    );
    Ok(mesh)
}

/// Rotation r such that the right parent's face-vertex sequence, viewed with
/// reversed orientation, aligns with the left parent's: w[(r - t) mod m] =
/// v[t].
fn face_rotation(left: &[usize], right: &[usize]) -> Result<usize> {
    let m = left.len();
    if m == 1 {
        return Ok(0);
    }
    let r = right
        .iter()
        .position(|&t| t == left[0])
        .ok_or_else(|| MeshError::InconsistentOrientation { node_tags: left.to_vec() })?;
    for t in 0..m {
        if right[(r + m - t) % m] != left[t] {
            return Err(MeshError::InconsistentOrientation { node_tags: left.to_vec() });
        }
    }
    Ok(r)
}

fn find_raw<'a>(
    raw_groups: &'a [(ElementShape, Vec<RawElement>)],
    link: &ParentLink,
) -> &'a RawElement {
    let (_, elements) = raw_groups
        .iter()
        .find(|(shape, _)| *shape == link.shape)
        .expect("parent group exists");
    &elements[link.element_index]
}

fn gather_coordinates(coordinates: &DMatrix<f64>, tags: &[usize]) -> DMatrix<f64> {
    let dim = coordinates.nrows();
    DMatrix::from_fn(dim, tags.len(), |i, j| coordinates[(i, tags[j] - 1)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BoundaryBlock, ElementBlock, GridTags, StructuredMesh};

    #[test]
    fn line_mesh_topology() {
        let source = StructuredMesh::line(0.0, 1.0, 5, 2, GridTags::default(), false);
        let mesh = ingest(&source, 2).unwrap();
        assert_eq!(mesh.element_count(), 4);
        let points = mesh.adjacency_group(ElementShape::Point).unwrap();
        assert_eq!(points.interior_count, 3);
        assert_eq!(points.boundary_count(), 2);
        for adjacency in points.interior() {
            assert_eq!(adjacency.parents.len(), 2);
        }
        for adjacency in points.boundary() {
            assert!(adjacency.physical_index.is_some());
        }
    }

    #[test]
    fn periodic_line_collapses_to_all_interior() {
        let source = StructuredMesh::line(0.0, 1.0, 5, 2, GridTags::default(), true);
        let mesh = ingest(&source, 2).unwrap();
        let points = mesh.adjacency_group(ElementShape::Point).unwrap();
        assert_eq!(points.interior_count, 4);
        assert_eq!(points.boundary_count(), 0);
    }

    #[test]
    fn quad_grid_topology() {
        let source =
            StructuredMesh::quad_grid((0.0, 1.0), (0.0, 1.0), 3, 2, 2, GridTags::default(), false, false);
        let mesh = ingest(&source, 2).unwrap();
        assert_eq!(mesh.element_count(), 6);
        let lines = mesh.adjacency_group(ElementShape::Line).unwrap();
        // 3×2 grid: 7 interior edges, 10 boundary edges.
        assert_eq!(lines.interior_count, 7);
        assert_eq!(lines.boundary_count(), 10);
    }

    #[test]
    fn doubly_periodic_grid_has_no_boundary() {
        let source =
            StructuredMesh::quad_grid((0.0, 1.0), (0.0, 1.0), 3, 3, 2, GridTags::default(), true, true);
        let mesh = ingest(&source, 2).unwrap();
        let lines = mesh.adjacency_group(ElementShape::Line).unwrap();
        assert_eq!(lines.boundary_count(), 0);
        assert_eq!(lines.interior_count, 18);
    }

    #[test]
    fn interior_normals_oppose_between_parents() {
        let source =
            StructuredMesh::quad_grid((0.0, 1.0), (0.0, 1.0), 2, 2, 2, GridTags::default(), false, false);
        let mesh = ingest(&source, 2).unwrap();
        let lines = mesh.adjacency_group(ElementShape::Line).unwrap();
        let quads = mesh.group(ElementShape::Quadrangle).unwrap();
        for adjacency in lines.interior() {
            // Recompute the normal from the right parent's face view; it must
            // be the negation of the stored left normal.
            let right = adjacency.parents[1];
            let element = &quads.elements[right.element_index];
            let face = &right.shape.faces()[right.face_id];
            let tags: Vec<usize> =
                face.vertices.iter().map(|&v| element.node_tag[v]).collect();
            let face_vertices = gather_coordinates(&mesh.node_coordinates, &tags);
            let parent_vertices = gather_coordinates(
                &mesh.node_coordinates,
                &element.node_tag[..4],
            );
            let geometry = face_geometry(
                ElementShape::Line,
                &face_vertices,
                2,
                &parent_vertices,
                &lines.quadrature,
            );
            let sequence = lines.quadrature.rotation(adjacency.rotation);
            for j in 0..lines.quadrature.len() {
                for i in 0..2 {
                    let left = adjacency.normal_vector[(i, j)];
                    let right = geometry.normal_vector[(i, sequence[j])];
                    assert!(
                        (left + right).abs() < 1e-12,
                        "normal mismatch: {left} vs {right}"
                    );
                }
            }
        }
    }

    #[test]
    fn third_sighting_is_a_duplicate_adjacency() {
        // Three line elements all sharing the same endpoint pair.
        struct Bad;
        impl MeshSource for Bad {
            fn dimension(&self) -> usize {
                1
            }
            fn node_coordinates(&self) -> DMatrix<f64> {
                DMatrix::from_column_slice(1, 3, &[0.0, 1.0, 2.0])
            }
            fn element_blocks(&self) -> Vec<ElementBlock> {
                vec![ElementBlock {
                    shape: ElementShape::Line,
                    physical_index: 10,
                    tags: vec![1, 2, 3],
                    nodes: vec![vec![1, 2], vec![2, 3], vec![3, 2]],
                }]
            }
            fn boundary_blocks(&self) -> Vec<BoundaryBlock> {
                Vec::new()
            }
            fn periodic_links(&self) -> Vec<crate::source::PeriodicLink> {
                Vec::new()
            }
        }
        let err = ingest(&Bad, 1).unwrap_err();
        assert!(matches!(err, MeshError::DuplicateAdjacency { .. }));
    }

    #[test]
    fn untagged_boundary_face_is_an_orphan() {
        struct NoTags;
        impl MeshSource for NoTags {
            fn dimension(&self) -> usize {
                1
            }
            fn node_coordinates(&self) -> DMatrix<f64> {
                DMatrix::from_column_slice(1, 2, &[0.0, 1.0])
            }
            fn element_blocks(&self) -> Vec<ElementBlock> {
                vec![ElementBlock {
                    shape: ElementShape::Line,
                    physical_index: 10,
                    tags: vec![1],
                    nodes: vec![vec![1, 2]],
                }]
            }
            fn boundary_blocks(&self) -> Vec<BoundaryBlock> {
                Vec::new()
            }
            fn periodic_links(&self) -> Vec<crate::source::PeriodicLink> {
                Vec::new()
            }
        }
        let err = ingest(&NoTags, 1).unwrap_err();
        assert!(matches!(err, MeshError::OrphanFace { .. }));
    }

    #[test]
    fn mass_matrix_identity_holds_across_the_mesh() {
        let source =
            StructuredMesh::quad_grid((0.0, 2.0), (0.0, 1.0), 2, 2, 3, GridTags::default(), false, false);
        let mesh = ingest(&source, 3).unwrap();
        let group = mesh.group(ElementShape::Quadrangle).unwrap();
        let basis = &group.basis;
        for element in &group.elements {
            let n_b = basis.basis_count();
            let mut mass = DMatrix::zeros(n_b, n_b);
            for a in 0..n_b {
                for b in 0..n_b {
                    mass[(a, b)] = (0..basis.quadrature_count())
                        .map(|q| {
                            basis.modal_value[(q, a)]
                                * basis.modal_value[(q, b)]
                                * element.jacobian_determinant_weight[q]
                        })
                        .sum();
                }
            }
            let identity = mass * &element.local_mass_matrix_inverse;
            for a in 0..n_b {
                for b in 0..n_b {
                    let expected = if a == b { 1.0 } else { 0.0 };
                    assert!((identity[(a, b)] - expected).abs() < 1e-8);
                }
            }
        }
    }
}
