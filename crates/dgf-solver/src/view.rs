//! View output: per-physical-group VTU frames of nodal fields.
//!
//! Nodal values are reconstructed on demand from the modal coefficients
//! through the basis tables; boundary groups reconstruct from the unique
//! parent element through the face-node evaluation tables. Cells are
//! emitted at their geometric vertices.

use nalgebra::{DMatrix, DVector};
use tracing::warn;

use dgf_io::vtu::{PointField, VtkCellType, VtuCell, write_vtu};
use dgf_mesh::{ElementShape, Mesh};
use dgf_model::{GradientBatch, SPECIFIC_HEAT_RATIO, VariableBatch, conserved_count};

use crate::error::Result;
use crate::solver::DgSolver;
use crate::time::OutputConfig;

/// Per-node fields selectable for view output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewVariable {
    Density,
    Velocity,
    Temperature,
    Pressure,
    SoundSpeed,
    MachNumber,
    Entropy,
    Vorticity,
    HeatFlux,
    ArtificialViscosity,
}

impl ViewVariable {
    fn needs_gradient(&self) -> bool {
        matches!(self, ViewVariable::Vorticity | ViewVariable::HeatFlux)
    }
}

fn cell_type(shape: ElementShape) -> VtkCellType {
    match shape {
        ElementShape::Point => VtkCellType::Vertex,
        ElementShape::Line => VtkCellType::Line,
        ElementShape::Triangle => VtkCellType::Triangle,
        ElementShape::Quadrangle => VtkCellType::Quad,
        ElementShape::Tetrahedron => VtkCellType::Tetra,
        ElementShape::Pyramid => VtkCellType::Pyramid,
        ElementShape::Hexahedron => VtkCellType::Hexahedron,
    }
}

impl DgSolver {
    /// Write one VTU frame per physical group for the given iteration.
    pub fn write_view(
        &self,
        mesh: &Mesh,
        variables: &[ViewVariable],
        output: &OutputConfig,
        iteration: usize,
    ) -> Result<()> {
        let variables: Vec<ViewVariable> = variables
            .iter()
            .copied()
            .filter(|v| {
                if v.needs_gradient() && !self.needs_gradient() {
                    warn!(variable = ?v, "skipped: run carries no gradient state");
                    false
                } else {
                    true
                }
            })
            .collect();

        // Volume groups.
        let mut volume_physical: Vec<usize> = mesh
            .element_groups
            .iter()
            .flat_map(|g| g.elements.iter().map(|e| e.physical_index))
            .collect();
        volume_physical.sort_unstable();
        volume_physical.dedup();
        for physical_index in volume_physical {
            let frame = self.volume_frame(mesh, physical_index, &variables);
            let path = output
                .view_directory()
                .join(format!("{}_{iteration}_{physical_index}.vtu", output.prefix));
            write_vtu(&path, &frame.points, &frame.cells, &frame.fields)?;
        }

        // Boundary groups.
        let mut boundary_physical: Vec<usize> = mesh
            .adjacency_groups
            .iter()
            .flat_map(|g| g.boundary().iter().filter_map(|e| e.physical_index))
            .collect();
        boundary_physical.sort_unstable();
        boundary_physical.dedup();
        for physical_index in boundary_physical {
            let frame = self.boundary_frame(mesh, physical_index, &variables);
            let path = output
                .view_directory()
                .join(format!("{}_{iteration}_{physical_index}.vtu", output.prefix));
            write_vtu(&path, &frame.points, &frame.cells, &frame.fields)?;
        }
        Ok(())
    }

    fn volume_frame(
        &self,
        mesh: &Mesh,
        physical_index: usize,
        variables: &[ViewVariable],
    ) -> Frame {
        let d = mesh.dimension;
        let mut frame = FrameBuilder::new(d, variables);
        for (group_state, group) in self.groups.iter().zip(&mesh.element_groups) {
            let basis = &group.basis;
            let vertex_count = group.shape.vertex_count();
            for (state, record) in group_state.elements.iter().zip(&group.elements) {
                if record.physical_index != physical_index {
                    continue;
                }
                // Modal evaluation at the all-order nodes, vertices first.
                let nodal = &state.coefficient * basis.node_modal_value.transpose();
                let gradient_nodal = state.gradient.as_ref().map(|g| {
                    &g.coefficient * basis.node_modal_value.transpose()
                });
                frame.push_cell(
                    cell_type(group.shape),
                    &record.node_coordinate,
                    vertex_count,
                    &nodal,
                    gradient_nodal.as_ref(),
                    &record.node_tag,
                    &self.node_artificial_viscosity,
                    &self.model,
                );
            }
        }
        frame.finish()
    }

    fn boundary_frame(
        &self,
        mesh: &Mesh,
        physical_index: usize,
        variables: &[ViewVariable],
    ) -> Frame {
        let d = mesh.dimension;
        let mut frame = FrameBuilder::new(d, variables);
        for group in &mesh.adjacency_groups {
            let vertex_count = group.shape.vertex_count();
            for record in group.boundary() {
                if record.physical_index != Some(physical_index) {
                    continue;
                }
                let parent = record.parents[0];
                let group_index = mesh.group_index(parent.shape).expect("parent group");
                let basis = &mesh.element_groups[group_index].basis;
                let state = &self.groups[group_index].elements[parent.element_index];
                let face_values = &basis.face_node_value[parent.face_id];
                let nodal = &state.coefficient * face_values.transpose();
                let gradient_nodal = state
                    .gradient
                    .as_ref()
                    .map(|g| &g.coefficient * face_values.transpose());
                frame.push_cell(
                    cell_type(group.shape),
                    &record.node_coordinate,
                    vertex_count,
                    &nodal,
                    gradient_nodal.as_ref(),
                    &record.node_tag,
                    &self.node_artificial_viscosity,
                    &self.model,
                );
            }
        }
        frame.finish()
    }
}

struct Frame {
    points: DMatrix<f64>,
    cells: Vec<VtuCell>,
    fields: Vec<PointField>,
}

struct FrameBuilder {
    dimension: usize,
    variables: Vec<ViewVariable>,
    points: Vec<f64>,
    cells: Vec<VtuCell>,
    values: Vec<Vec<f64>>,
}

impl FrameBuilder {
    fn new(dimension: usize, variables: &[ViewVariable]) -> Self {
        Self {
            dimension,
            variables: variables.to_vec(),
            points: Vec::new(),
            cells: Vec::new(),
            values: vec![Vec::new(); variables.len()],
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_cell(
        &mut self,
        cell_type: VtkCellType,
        node_coordinate: &DMatrix<f64>,
        vertex_count: usize,
        nodal_conserved: &DMatrix<f64>,
        nodal_gradient: Option<&DMatrix<f64>>,
        node_tags: &[usize],
        node_artificial_viscosity: &DVector<f64>,
        model: &dgf_model::PhysicalModel,
    ) {
        let d = self.dimension;
        let base = self.points.len() / d;
        let mut batch = VariableBatch::zeros(d, vertex_count);
        for v in 0..vertex_count {
            for i in 0..conserved_count(d) {
                batch.conserved[(i, v)] = nodal_conserved[(i, v)];
            }
        }
        batch.computational_from_conserved(model);
        let gradient = nodal_gradient.map(|g| {
            let mut gradients = GradientBatch::zeros(d, vertex_count);
            for v in 0..vertex_count {
                for r in 0..conserved_count(d) * d {
                    gradients.conserved[(r, v)] = g[(r, v)];
                }
            }
            gradients.primitive_from_conserved(model, &batch);
            gradients
        });
        for v in 0..vertex_count {
            for i in 0..d {
                self.points.push(node_coordinate[(i, v)]);
            }
            for (slot, variable) in self.variables.iter().enumerate() {
                let values = &mut self.values[slot];
                match variable {
                    ViewVariable::Density => values.push(batch.density(v)),
                    ViewVariable::Velocity => {
                        let velocity = batch.velocity(v);
                        for i in 0..3 {
                            values.push(if i < d { velocity[i] } else { 0.0 });
                        }
                    }
                    ViewVariable::Temperature => values.push(
                        model.temperature_from_internal_energy(batch.internal_energy(v)),
                    ),
                    ViewVariable::Pressure => values.push(batch.pressure(v)),
                    ViewVariable::SoundSpeed => values.push(
                        model.sound_speed_from_density_pressure(
                            batch.density(v),
                            batch.pressure(v),
                        ),
                    ),
                    ViewVariable::MachNumber => {
                        let speed = batch.velocity_squared_norm(v).sqrt();
                        let sound = model.sound_speed_from_density_pressure(
                            batch.density(v),
                            batch.pressure(v),
                        );
                        values.push(speed / sound);
                    }
                    ViewVariable::Entropy => values.push(
                        batch.pressure(v) / batch.density(v).powf(SPECIFIC_HEAT_RATIO),
                    ),
                    ViewVariable::Vorticity => {
                        let g = gradient.as_ref().expect("gradient-backed variable");
                        let vg = g.velocity_gradient(v);
                        if d == 2 {
                            values.push(vg[(1, 0)] - vg[(0, 1)]);
                        } else if d == 3 {
                            values.push(vg[(2, 1)] - vg[(1, 2)]);
                            values.push(vg[(0, 2)] - vg[(2, 0)]);
                            values.push(vg[(1, 0)] - vg[(0, 1)]);
                        } else {
                            values.push(0.0);
                        }
                    }
                    ViewVariable::HeatFlux => {
                        let g = gradient.as_ref().expect("gradient-backed variable");
                        let temperature = model
                            .temperature_from_internal_energy(batch.internal_energy(v));
                        let conductivity = model.thermal_conductivity(temperature);
                        let flux = g.temperature_gradient(v) * (-conductivity);
                        for i in 0..3 {
                            values.push(if i < d { flux[i] } else { 0.0 });
                        }
                    }
                    ViewVariable::ArtificialViscosity => {
                        values.push(node_artificial_viscosity[node_tags[v] - 1]);
                    }
                }
            }
        }
        self.cells.push(VtuCell {
            cell_type,
            connectivity: (base..base + vertex_count).collect(),
        });
    }

    fn finish(self) -> Frame {
        let d = self.dimension;
        let point_count = self.points.len() / d;
        let points = DMatrix::from_fn(d, point_count, |i, j| self.points[j * d + i]);
        let fields = self
            .variables
            .iter()
            .zip(self.values)
            .map(|(variable, values)| {
                let components = component_count(*variable, d);
                let n = values.len() / components;
                PointField {
                    name: field_name(*variable).to_string(),
                    components,
                    values: DMatrix::from_fn(components, n, |i, j| values[j * components + i]),
                }
            })
            .collect();
        Frame { points, cells: self.cells, fields }
    }
}

fn component_count(variable: ViewVariable, dimension: usize) -> usize {
    match variable {
        ViewVariable::Velocity | ViewVariable::HeatFlux => 3,
        ViewVariable::Vorticity if dimension == 3 => 3,
        _ => 1,
    }
}

fn field_name(variable: ViewVariable) -> &'static str {
    match variable {
        ViewVariable::Density => "Density",
        ViewVariable::Velocity => "Velocity",
        ViewVariable::Temperature => "Temperature",
        ViewVariable::Pressure => "Pressure",
        ViewVariable::SoundSpeed => "SoundSpeed",
        ViewVariable::MachNumber => "MachNumber",
        ViewVariable::Entropy => "Entropy",
        ViewVariable::Vorticity => "Vorticity",
        ViewVariable::HeatFlux => "HeatFlux",
        ViewVariable::ArtificialViscosity => "ArtificialViscosity",
    }
}
