//! The per-stage DG spatial operator.
//!
//! Each sub-step is a data-parallel loop over elements or adjacencies with a
//! barrier between sub-steps. Interior face fluxes are computed once per
//! adjacency into adjacency-owned buffers, then gathered by both parents
//! through the per-element face table; each `(parent, face, quadrature)`
//! slot is written by exactly one adjacency, so the gathers are
//! conflict-free.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use dgf_mesh::{Mesh, Side};
use dgf_model::{GradientBatch, conserved_count};

use crate::boundary::{
    boundary_gradient_variable, boundary_variable, modify_boundary_variable,
};
use crate::flux::{
    ViscousFluxScheme, artificial_viscous_interface_flux, artificial_viscous_normal_flux,
    artificial_viscous_raw_flux, convective_flux, convective_normal_flux, convective_raw_flux,
    gradient_raw_flux, interface_gradient_flux, viscous_interface_flux, viscous_raw_flux,
    volume_gradient_flux,
};
use crate::solver::DgSolver;
use crate::viscosity::element_viscosity;

impl DgSolver {
    /// Snapshot `U_last := U` at step entry.
    pub fn copy_coefficient(&mut self) {
        for group in &mut self.groups {
            group.elements.par_iter_mut().for_each(|state| {
                state.coefficient_last.copy_from(&state.coefficient);
            });
        }
    }

    /// Per-element shock indicator, nodal max-reduction and broadcast.
    pub fn calculate_artificial_viscosity(&mut self, mesh: &Mesh) {
        let Some(config) = self.config.shock_capturing else {
            return;
        };
        // Per-element indicator value, constant per vertex.
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            let basis = &group.basis;
            group_state
                .elements
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .for_each(|(state, record)| {
                    let density_coefficient =
                        DVector::from_fn(state.coefficient.ncols(), |b, _| {
                            state.coefficient[(0, b)]
                        });
                    let epsilon =
                        element_viscosity(&config, basis, record, &density_coefficient);
                    state.artificial_viscosity.fill(epsilon);
                });
        }
        // Max over the elements sharing each node, deterministic under any
        // thread schedule.
        let node_count = mesh.node_count();
        let mut node_viscosity = DVector::zeros(node_count);
        for (group_state, group) in self.groups.iter().zip(&mesh.element_groups) {
            let partial = group_state
                .elements
                .par_iter()
                .zip(group.elements.par_iter())
                .fold(
                    || DVector::zeros(node_count),
                    |mut acc: DVector<f64>, (state, record)| {
                        for v in 0..state.artificial_viscosity.len() {
                            let node = record.node_tag[v] - 1;
                            acc[node] = acc[node].max(state.artificial_viscosity[v]);
                        }
                        acc
                    },
                )
                .reduce(
                    || DVector::zeros(node_count),
                    |a, b| a.zip_map(&b, f64::max),
                );
            node_viscosity = node_viscosity.zip_map(&partial, f64::max);
        }
        // Broadcast the nodal value back to every containing element.
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            group_state
                .elements
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .for_each(|(state, record)| {
                    for v in 0..state.artificial_viscosity.len() {
                        state.artificial_viscosity[v] = node_viscosity[record.node_tag[v] - 1];
                    }
                });
        }
        self.node_artificial_viscosity = node_viscosity;
    }

    /// Whether the auxiliary-gradient sub-step runs at all.
    pub fn needs_gradient(&self) -> bool {
        self.model.equation.is_viscous() || self.config.shock_capturing.is_some()
    }

    /// Volume contribution of the auxiliary gradient: U ⊗ (Jᵀ)⁻¹|J|w per
    /// quadrature point.
    pub fn calculate_gradient_quadrature(&mut self, mesh: &Mesh) {
        if !self.needs_gradient() {
            return;
        }
        let d = mesh.dimension;
        let n_c = conserved_count(d);
        let model = self.model;
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            let basis = &group.basis;
            group_state
                .elements
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .for_each(|(state, record)| {
                    let variable = state.quadrature_variable(basis, &model, d);
                    let gradient = state.gradient.as_mut().expect("gradient state allocated");
                    for j in 0..basis.quadrature_count() {
                        for k in 0..n_c {
                            for c in 0..d {
                                for r in 0..d {
                                    gradient.volume_quadrature[(k * d + r, j * d + c)] =
                                        variable.conserved[(k, j)]
                                            * record.jacobian_transpose_inverse_weight
                                                [(c * d + r, j)];
                                }
                            }
                        }
                    }
                });
        }
    }

    /// Gradient fluxes on every adjacency, then the per-parent gather.
    pub fn calculate_adjacency_gradient_quadrature(&mut self, mesh: &Mesh) {
        if !self.needs_gradient() {
            return;
        }
        let d = mesh.dimension;
        let viscous = self.model.equation.is_viscous();
        let model = self.model;
        let groups = &self.groups;
        for (group_index, group) in mesh.adjacency_groups.iter().enumerate() {
            let group_state = &mut self.adjacency[group_index];
            let boundary_dummy = &group_state.boundary_dummy;
            let interior = group.interior_count;
            let boundary_kinds = &self.boundary_kinds;
            group_state
                .flux
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .enumerate()
                .for_each(|(index, (flux, record))| {
                    let n_q = group.quadrature.len();
                    if record.is_interior() {
                        let sequence = group.quadrature.rotation(record.rotation);
                        let (left_group, left_index) =
                            super::solver::parent_location(mesh, &record.parents[0]);
                        let (right_group, right_index) =
                            super::solver::parent_location(mesh, &record.parents[1]);
                        let left = groups[left_group].elements[left_index].face_variable(
                            &mesh.element_groups[left_group].basis,
                            &model,
                            d,
                            record.parents[0].face_id,
                        );
                        let right = groups[right_group].elements[right_index].face_variable(
                            &mesh.element_groups[right_group].basis,
                            &model,
                            d,
                            record.parents[1].face_id,
                        );
                        for j in 0..n_q {
                            let normal = record.normal_vector.column(j).clone_owned();
                            let jw = record.jacobian_determinant_weight[j];
                            let volume =
                                volume_gradient_flux(&normal, &left, &right, j, sequence[j]);
                            set_flattened(&mut flux.volume_gradient, j, &volume, jw);
                            if viscous {
                                let interface = interface_gradient_flux(
                                    &normal,
                                    &left,
                                    &right,
                                    j,
                                    sequence[j],
                                );
                                set_flattened(&mut flux.interface_gradient, j, &interface, jw);
                            }
                        }
                    } else {
                        let parent = record.parents[0];
                        let (parent_group, parent_index) =
                            super::solver::parent_location(mesh, &parent);
                        let left = groups[parent_group].elements[parent_index].face_variable(
                            &mesh.element_groups[parent_group].basis,
                            &model,
                            d,
                            parent.face_id,
                        );
                        let dummy = &boundary_dummy[index - interior];
                        let kind = boundary_kinds[&record
                            .physical_index
                            .expect("boundary face has a group")];
                        for j in 0..n_q {
                            let normal = record.normal_vector.column(j).clone_owned();
                            let jw = record.jacobian_determinant_weight[j];
                            let (volume_state, interface_state) = boundary_gradient_variable(
                                kind, &model, &normal, &left, j, dummy, j,
                            );
                            let volume = gradient_raw_flux(&normal, &volume_state);
                            set_flattened(&mut flux.volume_gradient, j, &volume, jw);
                            if viscous {
                                let interface = gradient_raw_flux(&normal, &interface_state);
                                set_flattened(&mut flux.interface_gradient, j, &interface, jw);
                            }
                        }
                    }
                });
        }
        self.gather_gradient_fluxes(mesh);
    }

    fn gather_gradient_fluxes(&mut self, mesh: &Mesh) {
        let viscous = self.model.equation.is_viscous();
        let adjacency = &self.adjacency;
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            let basis = &group.basis;
            group_state
                .elements
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .for_each(|(state, record)| {
                    let gradient = state.gradient.as_mut().expect("gradient state allocated");
                    for (face_id, link) in record.faces.iter().enumerate() {
                        let adjacency_group_index = mesh
                            .adjacency_group_index(link.shape)
                            .expect("adjacency group exists");
                        let adjacency_group = &mesh.adjacency_groups[adjacency_group_index];
                        let adjacency_record =
                            &adjacency_group.elements[link.adjacency_index];
                        let flux = &adjacency[adjacency_group_index].flux[link.adjacency_index];
                        let (offset, _) = basis.face_rows(face_id);
                        let n_q = adjacency_group.quadrature.len();
                        match link.side {
                            Side::Left => {
                                for j in 0..n_q {
                                    for r in 0..gradient.volume_adjacency_quadrature.nrows() {
                                        gradient.volume_adjacency_quadrature
                                            [(r, offset + j)] = flux.volume_gradient[(r, j)];
                                    }
                                    if viscous {
                                        for r in 0..flux.interface_gradient.nrows() {
                                            gradient.interface_adjacency_quadrature
                                                [(r, offset + j)] =
                                                flux.interface_gradient[(r, j)];
                                        }
                                    }
                                }
                            }
                            Side::Right => {
                                let sequence = adjacency_group
                                    .quadrature
                                    .rotation(adjacency_record.rotation);
                                for j in 0..n_q {
                                    let slot = offset + sequence[j];
                                    for r in 0..gradient.volume_adjacency_quadrature.nrows() {
                                        gradient.volume_adjacency_quadrature[(r, slot)] =
                                            -flux.volume_gradient[(r, j)];
                                    }
                                    if viscous {
                                        // The jump flux seen from the right
                                        // side keeps its sign: the flipped
                                        // normal cancels the flipped jump.
                                        for r in 0..flux.interface_gradient.nrows() {
                                            gradient.interface_adjacency_quadrature
                                                [(r, slot)] = flux.interface_gradient[(r, j)];
                                        }
                                    }
                                }
                            }
                        }
                    }
                });
        }
    }

    /// Gradient residual assembly and local lifting.
    pub fn calculate_gradient_residual(&mut self, mesh: &Mesh) {
        if !self.needs_gradient() {
            return;
        }
        let viscous_flux = if self.model.equation.is_viscous() {
            self.config.viscous_flux
        } else {
            ViscousFluxScheme::None
        };
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            let basis = &group.basis;
            group_state
                .elements
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .for_each(|(state, record)| {
                    let gradient = state.gradient.as_mut().expect("gradient state allocated");
                    gradient.volume_residual = &gradient.volume_adjacency_quadrature
                        * &basis.modal_adjacency_value
                        - &gradient.volume_quadrature * &basis.modal_gradient_value;
                    match viscous_flux {
                        ViscousFluxScheme::None => {}
                        ViscousFluxScheme::Br1 => {
                            gradient.interface_residual[0] =
                                &gradient.interface_adjacency_quadrature
                                    * &basis.modal_adjacency_value;
                        }
                        ViscousFluxScheme::Br2 => {
                            for face_id in 0..basis.shape.face_count() {
                                let (start, end) = basis.face_rows(face_id);
                                let columns = gradient
                                    .interface_adjacency_quadrature
                                    .columns(start, end - start);
                                let rows =
                                    basis.modal_adjacency_value.rows(start, end - start);
                                gradient.interface_residual[face_id] =
                                    columns * rows;
                            }
                        }
                    }
                    // G = residual · M⁻¹, then the lifted pieces.
                    gradient.volume_coefficient =
                        &gradient.volume_residual * &record.local_mass_matrix_inverse;
                    gradient.coefficient.copy_from(&gradient.volume_coefficient);
                    for (coefficient, residual) in gradient
                        .interface_coefficient
                        .iter_mut()
                        .zip(&gradient.interface_residual)
                    {
                        *coefficient = residual * &record.local_mass_matrix_inverse;
                        gradient.coefficient += &*coefficient;
                    }
                });
        }
    }

    /// Volume flux quadrature: convective − viscous − artificial plus the
    /// source term.
    pub fn calculate_quadrature(&mut self, mesh: &Mesh) {
        let d = mesh.dimension;
        let n_c = conserved_count(d);
        let model = self.model;
        let viscous = model.equation.is_viscous();
        let shock_capturing = self.config.shock_capturing.is_some();
        let source_term = self.config.source_term;
        let viscous_flux = self.config.viscous_flux;
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            let basis = &group.basis;
            group_state
                .elements
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .for_each(|(state, record)| {
                    let variable = state.quadrature_variable(basis, &model, d);
                    let gradient = viscous.then(|| {
                        let mut batch = state.quadrature_gradient(basis, d, viscous_flux);
                        batch.primitive_from_conserved(&model, &variable);
                        batch
                    });
                    let artificial = shock_capturing.then(|| {
                        let batch =
                            state.quadrature_gradient(basis, d, ViscousFluxScheme::None);
                        let epsilon = &basis.vertex_value * &state.artificial_viscosity;
                        (batch, epsilon)
                    });
                    for j in 0..basis.quadrature_count() {
                        let mut raw = convective_raw_flux(&model, &variable, j);
                        if let Some(gradient) = &gradient {
                            raw -= viscous_raw_flux(&model, &variable, gradient, j);
                        }
                        if let Some((volume_gradient, epsilon)) = &artificial {
                            raw -= artificial_viscous_raw_flux(epsilon[j], volume_gradient, j);
                        }
                        for c in 0..d {
                            for v in 0..n_c {
                                let mut value = 0.0;
                                for s in 0..d {
                                    value += raw[(s, v)]
                                        * record.jacobian_transpose_inverse_weight
                                            [(c * d + s, j)];
                                }
                                state.volume_quadrature[(v, j * d + c)] = value;
                            }
                        }
                        if source_term.is_active() {
                            let source = source_term.evaluate(&model, &variable, j);
                            for v in 0..n_c {
                                state.source_quadrature[(v, j)] =
                                    source[v] * record.jacobian_determinant_weight[j];
                            }
                        }
                    }
                });
        }
    }

    /// Interface fluxes on every adjacency, then the per-parent gather.
    pub fn calculate_adjacency_quadrature(&mut self, mesh: &Mesh) {
        let d = mesh.dimension;
        let model = self.model;
        let viscous = model.equation.is_viscous();
        let shock_capturing = self.config.shock_capturing.is_some();
        let scheme = self.config.convective_flux;
        let viscous_flux = self.config.viscous_flux;
        let groups = &self.groups;
        for (group_index, group) in mesh.adjacency_groups.iter().enumerate() {
            let group_state = &mut self.adjacency[group_index];
            let boundary_dummy = &group_state.boundary_dummy;
            let interior = group.interior_count;
            let boundary_kinds = &self.boundary_kinds;
            group_state
                .flux
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .enumerate()
                .for_each(|(index, (flux, record))| {
                    let n_q = group.quadrature.len();
                    if record.is_interior() {
                        let sequence = group.quadrature.rotation(record.rotation);
                        let left_link = record.parents[0];
                        let right_link = record.parents[1];
                        let (left_group, left_index) =
                            super::solver::parent_location(mesh, &left_link);
                        let (right_group, right_index) =
                            super::solver::parent_location(mesh, &right_link);
                        let left_basis = &mesh.element_groups[left_group].basis;
                        let right_basis = &mesh.element_groups[right_group].basis;
                        let left_state = &groups[left_group].elements[left_index];
                        let right_state = &groups[right_group].elements[right_index];
                        let left =
                            left_state.face_variable(left_basis, &model, d, left_link.face_id);
                        let right = right_state.face_variable(
                            right_basis,
                            &model,
                            d,
                            right_link.face_id,
                        );
                        let gradients = viscous.then(|| {
                            let mut left_gradient = left_state.face_gradient(
                                left_basis,
                                d,
                                viscous_flux,
                                left_link.face_id,
                            );
                            left_gradient.primitive_from_conserved(&model, &left);
                            let mut right_gradient = right_state.face_gradient(
                                right_basis,
                                d,
                                viscous_flux,
                                right_link.face_id,
                            );
                            right_gradient.primitive_from_conserved(&model, &right);
                            (left_gradient, right_gradient)
                        });
                        let artificial = shock_capturing.then(|| {
                            (
                                left_state.face_gradient(
                                    left_basis,
                                    d,
                                    ViscousFluxScheme::None,
                                    left_link.face_id,
                                ),
                                left_state
                                    .face_artificial_viscosity(left_basis, left_link.face_id),
                                right_state.face_gradient(
                                    right_basis,
                                    d,
                                    ViscousFluxScheme::None,
                                    right_link.face_id,
                                ),
                                right_state
                                    .face_artificial_viscosity(right_basis, right_link.face_id),
                            )
                        });
                        for j in 0..n_q {
                            let normal = record.normal_vector.column(j).clone_owned();
                            let jw = record.jacobian_determinant_weight[j];
                            let mut value = convective_flux(
                                scheme,
                                &model,
                                &normal,
                                &left,
                                &right,
                                j,
                                sequence[j],
                            );
                            if let Some((left_gradient, right_gradient)) = &gradients {
                                value -= viscous_interface_flux(
                                    &model,
                                    &normal,
                                    &left,
                                    left_gradient,
                                    j,
                                    &right,
                                    right_gradient,
                                    sequence[j],
                                );
                            }
                            if let Some((
                                left_gradient,
                                left_epsilon,
                                right_gradient,
                                right_epsilon,
                            )) = &artificial
                            {
                                value -= artificial_viscous_interface_flux(
                                    &normal,
                                    left_epsilon[j],
                                    left_gradient,
                                    j,
                                    right_epsilon[sequence[j]],
                                    right_gradient,
                                    sequence[j],
                                );
                            }
                            for v in 0..value.len() {
                                flux.flux[(v, j)] = value[v] * jw;
                            }
                        }
                    } else {
                        let parent = record.parents[0];
                        let (parent_group, parent_index) =
                            super::solver::parent_location(mesh, &parent);
                        let parent_basis = &mesh.element_groups[parent_group].basis;
                        let parent_state = &groups[parent_group].elements[parent_index];
                        let mut left =
                            parent_state.face_variable(parent_basis, &model, d, parent.face_id);
                        let left_gradient = viscous.then(|| {
                            let mut gradient = parent_state.face_gradient(
                                parent_basis,
                                d,
                                viscous_flux,
                                parent.face_id,
                            );
                            gradient.primitive_from_conserved(&model, &left);
                            gradient
                        });
                        let artificial = shock_capturing.then(|| {
                            (
                                parent_state.face_gradient(
                                    parent_basis,
                                    d,
                                    ViscousFluxScheme::None,
                                    parent.face_id,
                                ),
                                parent_state
                                    .face_artificial_viscosity(parent_basis, parent.face_id),
                            )
                        });
                        let dummy = &boundary_dummy[index - interior];
                        let kind = boundary_kinds[&record
                            .physical_index
                            .expect("boundary face has a group")];
                        for j in 0..n_q {
                            let normal = record.normal_vector.column(j).clone_owned();
                            let jw = record.jacobian_determinant_weight[j];
                            let boundary =
                                boundary_variable(kind, &model, &normal, &left, j, dummy, j);
                            let mut value =
                                convective_normal_flux(&model, &normal, &boundary, 0);
                            if let Some(left_gradient) = &left_gradient {
                                let mut boundary_gradient = GradientBatch::zeros(d, 1);
                                modify_boundary_variable(
                                    kind,
                                    &mut left,
                                    left_gradient,
                                    j,
                                    &boundary,
                                    &mut boundary_gradient,
                                );
                                value -= viscous_interface_flux(
                                    &model,
                                    &normal,
                                    &left,
                                    left_gradient,
                                    j,
                                    &boundary,
                                    &boundary_gradient,
                                    0,
                                );
                            }
                            if let Some((volume_gradient, epsilon)) = &artificial {
                                value -= artificial_viscous_normal_flux(
                                    &normal,
                                    epsilon[j],
                                    volume_gradient,
                                    j,
                                );
                            }
                            for v in 0..value.len() {
                                flux.flux[(v, j)] = value[v] * jw;
                            }
                        }
                    }
                });
        }
        self.gather_adjacency_fluxes(mesh);
    }

    fn gather_adjacency_fluxes(&mut self, mesh: &Mesh) {
        let adjacency = &self.adjacency;
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            let basis = &group.basis;
            group_state
                .elements
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .for_each(|(state, record)| {
                    for (face_id, link) in record.faces.iter().enumerate() {
                        let adjacency_group_index = mesh
                            .adjacency_group_index(link.shape)
                            .expect("adjacency group exists");
                        let adjacency_group = &mesh.adjacency_groups[adjacency_group_index];
                        let adjacency_record = &adjacency_group.elements[link.adjacency_index];
                        let flux = &adjacency[adjacency_group_index].flux[link.adjacency_index];
                        let (offset, _) = basis.face_rows(face_id);
                        let n_q = adjacency_group.quadrature.len();
                        match link.side {
                            Side::Left => {
                                for j in 0..n_q {
                                    for v in 0..state.adjacency_quadrature.nrows() {
                                        state.adjacency_quadrature[(v, offset + j)] =
                                            flux.flux[(v, j)];
                                    }
                                }
                            }
                            Side::Right => {
                                let sequence = adjacency_group
                                    .quadrature
                                    .rotation(adjacency_record.rotation);
                                for j in 0..n_q {
                                    let slot = offset + sequence[j];
                                    for v in 0..state.adjacency_quadrature.nrows() {
                                        state.adjacency_quadrature[(v, slot)] =
                                            -flux.flux[(v, j)];
                                    }
                                }
                            }
                        }
                    }
                });
        }
    }

    /// Residual assembly: `R = V · ∇Φ − A · Φ_adj (+ S · Φ)`.
    pub fn calculate_residual(&mut self, mesh: &Mesh) {
        let source = self.config.source_term.is_active();
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            let basis = &group.basis;
            group_state.elements.par_iter_mut().for_each(|state| {
                state.residual = &state.volume_quadrature * &basis.modal_gradient_value;
                state.residual -= &state.adjacency_quadrature * &basis.modal_adjacency_value;
                if source {
                    state.residual += &state.source_quadrature * &basis.modal_value;
                }
            });
        }
    }

    /// RK combine: `U := a·U_last + b·U + c·δt·R·M⁻¹`.
    pub fn update_coefficient(&mut self, stage: [f64; 3], delta_time: f64, mesh: &Mesh) {
        let [a, b, c] = stage;
        for (group_state, group) in self.groups.iter_mut().zip(&mesh.element_groups) {
            group_state
                .elements
                .par_iter_mut()
                .zip(group.elements.par_iter())
                .for_each(|(state, record)| {
                    let update = &state.residual * &record.local_mass_matrix_inverse;
                    state.coefficient *= b;
                    state.coefficient += &state.coefficient_last * a;
                    state.coefficient += update * (c * delta_time);
                });
        }
    }

    /// Per-variable mean absolute residual at the quadrature points,
    /// averaged over elements.
    pub fn calculate_relative_error(&mut self, mesh: &Mesh) {
        let n_c = conserved_count(mesh.dimension);
        let mut total = DVector::zeros(n_c);
        for (group_state, group) in self.groups.iter().zip(&mesh.element_groups) {
            let basis = &group.basis;
            let partial = group_state
                .elements
                .par_iter()
                .fold(
                    || DVector::zeros(n_c),
                    |mut acc: DVector<f64>, state| {
                        let values = &state.residual * basis.modal_value.transpose();
                        for v in 0..n_c {
                            let mut row = 0.0;
                            for q in 0..values.ncols() {
                                row += values[(v, q)].abs();
                            }
                            acc[v] += row / values.ncols() as f64;
                        }
                        acc
                    },
                )
                .reduce(|| DVector::zeros(n_c), |a, b| a + b);
            total += partial;
        }
        self.relative_error = total / mesh.element_count() as f64;
    }

    /// CFL time step: min over elements and quadrature points of
    /// CFL · h_min / ((|v| + c)(p + 1)²).
    pub fn calculate_delta_time(&self, mesh: &Mesh, cfl: f64) -> f64 {
        let d = mesh.dimension;
        let model = self.model;
        let p = mesh.order as f64;
        let mut delta_time = f64::MAX;
        for (group_state, group) in self.groups.iter().zip(&mesh.element_groups) {
            let basis = &group.basis;
            let partial = group_state
                .elements
                .par_iter()
                .zip(group.elements.par_iter())
                .map(|(state, record)| {
                    let variable = state.quadrature_variable(basis, &model, d);
                    let mut local = f64::MAX;
                    for j in 0..basis.quadrature_count() {
                        let sound_speed = model.sound_speed_from_density_pressure(
                            variable.density(j),
                            variable.pressure(j),
                        );
                        let spectral_radius =
                            variable.velocity_squared_norm(j).sqrt() + sound_speed;
                        local = local.min(
                            cfl * record.minimum_edge
                                / (spectral_radius * (p + 1.0) * (p + 1.0)),
                        );
                    }
                    local
                })
                .reduce(|| f64::MAX, f64::min);
            delta_time = delta_time.min(partial);
        }
        delta_time
    }
}

/// Column-major flatten of a `d × N_c` flux matrix times a weight into the
/// column of a flattened buffer: row `v·d + s` takes `flux[(s, v)] · w`.
fn set_flattened(buffer: &mut DMatrix<f64>, column: usize, flux: &DMatrix<f64>, weight: f64) {
    let d = flux.nrows();
    for v in 0..flux.ncols() {
        for s in 0..d {
            buffer[(v * d + s, column)] = flux[(s, v)] * weight;
        }
    }
}
