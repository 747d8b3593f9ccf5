//! Boundary operator: dummy-state derivation per boundary-condition kind.
//!
//! For each kind three operations are dispatched at every boundary
//! quadrature point: the boundary state used by the convective flux, the
//! (volume, interface) gradient states used by the auxiliary-gradient
//! sub-step, and a modification of the left state and boundary gradient
//! ahead of the viscous flux.

use nalgebra::DVector;

use dgf_model::{PhysicalModel, SPECIFIC_HEAT_RATIO, GradientBatch, VariableBatch};

/// Boundary-condition kind per physical group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    RiemannFarfield,
    VelocityInflow,
    PressureOutflow,
    IsoThermalNonSlipWall,
    AdiabaticSlipWall,
    AdiabaticNonSlipWall,
    /// Collapsed to interior faces at mesh ingest; never dispatched.
    Periodic,
}

/// Whether boundary dummy states are sampled once or re-sampled every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryTime {
    #[default]
    Steady,
    TimeVarying,
}

/// Boundary state B at one quadrature point (computational view filled).
pub fn boundary_variable(
    kind: BoundaryKind,
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    left_column: usize,
    dummy: &VariableBatch,
    dummy_column: usize,
) -> VariableBatch {
    let d = left.dimension;
    let mut boundary = VariableBatch::zeros(d, 1);
    match kind {
        BoundaryKind::RiemannFarfield => {
            riemann_farfield(model, normal, left, left_column, dummy, dummy_column, &mut boundary);
        }
        BoundaryKind::VelocityInflow => {
            for i in 0..boundary.computational.nrows() {
                boundary.computational[(i, 0)] = dummy.computational[(i, dummy_column)];
            }
            if normal_mach_number(model, left, left_column, normal) > -1.0 {
                boundary.set_pressure(left.pressure(left_column), 0);
            }
        }
        BoundaryKind::PressureOutflow => {
            for i in 0..boundary.computational.nrows() {
                boundary.computational[(i, 0)] = left.computational[(i, left_column)];
            }
            if normal_mach_number(model, left, left_column, normal) < 1.0 {
                boundary.set_pressure(dummy.pressure(dummy_column), 0);
            }
        }
        BoundaryKind::IsoThermalNonSlipWall => {
            let density = left.density(left_column);
            boundary.set_density(density, 0);
            boundary.set_velocity(&dummy.velocity(dummy_column), 0);
            let internal_energy = dummy.internal_energy(dummy_column);
            boundary.set_internal_energy(internal_energy, 0);
            boundary.set_pressure(
                model.pressure_from_density_internal_energy(density, internal_energy),
                0,
            );
        }
        BoundaryKind::AdiabaticSlipWall => {
            for i in 0..boundary.computational.nrows() {
                boundary.computational[(i, 0)] = left.computational[(i, left_column)];
            }
            let velocity = left.velocity(left_column);
            let reflected = &velocity - normal * velocity.dot(normal);
            boundary.set_velocity(&reflected, 0);
        }
        BoundaryKind::AdiabaticNonSlipWall => {
            for i in 0..boundary.computational.nrows() {
                boundary.computational[(i, 0)] = left.computational[(i, left_column)];
            }
            boundary.set_velocity(&dummy.velocity(dummy_column), 0);
        }
        BoundaryKind::Periodic => unreachable!("periodic faces are interior after ingest"),
    }
    boundary
}

/// (B_V, B_I): conserved boundary states for the volume- and
/// interface-gradient fluxes.
pub fn boundary_gradient_variable(
    kind: BoundaryKind,
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    left_column: usize,
    dummy: &VariableBatch,
    dummy_column: usize,
) -> (DVector<f64>, DVector<f64>) {
    let d = left.dimension;
    let n_c = d + 2;
    match kind {
        BoundaryKind::RiemannFarfield
        | BoundaryKind::VelocityInflow
        | BoundaryKind::PressureOutflow => {
            let volume = DVector::from_fn(n_c, |v, _| left.conserved[(v, left_column)]);
            (volume, DVector::zeros(n_c))
        }
        BoundaryKind::IsoThermalNonSlipWall
        | BoundaryKind::AdiabaticSlipWall
        | BoundaryKind::AdiabaticNonSlipWall => {
            let mut boundary =
                boundary_variable(kind, model, normal, left, left_column, dummy, dummy_column);
            boundary.conserved_from_computational(model);
            let volume = DVector::from_fn(n_c, |v, _| boundary.conserved[(v, 0)]);
            let interface =
                DVector::from_fn(n_c, |v, _| boundary.conserved[(v, 0)] - left.conserved[(v, left_column)]);
            (volume, interface)
        }
        BoundaryKind::Periodic => unreachable!("periodic faces are interior after ingest"),
    }
}

/// Pre-viscous-flux modification: copy the left gradient onto the boundary
/// gradient, impose the boundary state on the left state at walls, and zero
/// the boundary temperature gradient for the adiabatic kinds.
pub fn modify_boundary_variable(
    kind: BoundaryKind,
    left: &mut VariableBatch,
    left_gradient: &GradientBatch,
    left_column: usize,
    boundary: &VariableBatch,
    boundary_gradient: &mut GradientBatch,
) {
    for i in 0..boundary_gradient.primitive.nrows() {
        boundary_gradient.primitive[(i, 0)] = left_gradient.primitive[(i, left_column)];
    }
    match kind {
        BoundaryKind::RiemannFarfield
        | BoundaryKind::VelocityInflow
        | BoundaryKind::PressureOutflow => {}
        BoundaryKind::IsoThermalNonSlipWall => {
            for i in 0..left.computational.nrows() {
                left.computational[(i, left_column)] = boundary.computational[(i, 0)];
            }
        }
        BoundaryKind::AdiabaticSlipWall | BoundaryKind::AdiabaticNonSlipWall => {
            for i in 0..left.computational.nrows() {
                left.computational[(i, left_column)] = boundary.computational[(i, 0)];
            }
            let zero = DVector::zeros(boundary_gradient.dimension);
            boundary_gradient.set_temperature_gradient(&zero, 0);
        }
        BoundaryKind::Periodic => unreachable!("periodic faces are interior after ingest"),
    }
}

fn normal_mach_number(
    model: &PhysicalModel,
    left: &VariableBatch,
    left_column: usize,
    normal: &DVector<f64>,
) -> f64 {
    let sound_speed = model
        .sound_speed_from_density_pressure(left.density(left_column), left.pressure(left_column));
    left.velocity(left_column).dot(normal) / sound_speed
}

fn riemann_farfield(
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    left_column: usize,
    dummy: &VariableBatch,
    dummy_column: usize,
    boundary: &mut VariableBatch,
) {
    let mach = normal_mach_number(model, left, left_column, normal);
    if mach.abs() > 1.0 {
        let (source, column) = if mach < 0.0 {
            (dummy, dummy_column) // supersonic inflow
        } else {
            (left, left_column) // supersonic outflow
        };
        for i in 0..boundary.computational.nrows() {
            boundary.computational[(i, 0)] = source.computational[(i, column)];
        }
        return;
    }
    if model.equation.is_compressible() {
        subsonic_invariants(model, normal, left, left_column, dummy, dummy_column, mach, boundary);
    } else {
        subsonic_acoustic(model, normal, left, left_column, dummy, dummy_column, mach, boundary);
    }
}

/// Subsonic compressible farfield through the Riemann invariants
/// R± = v·n̂ ± 2c/(γ−1); density reconstructed from the interior entropy.
#[allow(clippy::too_many_arguments)]
fn subsonic_invariants(
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    left_column: usize,
    dummy: &VariableBatch,
    dummy_column: usize,
    mach: f64,
    boundary: &mut VariableBatch,
) {
    let gamma = SPECIFIC_HEAT_RATIO;
    let dummy_sound_speed = model
        .sound_speed_from_density_pressure(dummy.density(dummy_column), dummy.pressure(dummy_column));
    let left_sound_speed = model
        .sound_speed_from_density_pressure(left.density(left_column), left.pressure(left_column));
    let inward_invariant =
        dummy.velocity(dummy_column).dot(normal) - 2.0 * dummy_sound_speed / (gamma - 1.0);
    let outward_invariant =
        left.velocity(left_column).dot(normal) + 2.0 * left_sound_speed / (gamma - 1.0);
    let boundary_normal_velocity = (inward_invariant + outward_invariant) / 2.0;
    let boundary_sound_speed = (gamma - 1.0) * (outward_invariant - inward_invariant) / 4.0;
    // Tangential velocity and entropy come from the exterior (dummy) side on
    // inflow, the interior side on outflow.
    let (carrier, carrier_column) = if mach < 0.0 {
        (dummy, dummy_column)
    } else {
        (left, left_column)
    };
    let carrier_velocity = carrier.velocity(carrier_column);
    let boundary_velocity = &carrier_velocity
        + normal * (boundary_normal_velocity - carrier_velocity.dot(normal));
    let entropy = model.entropy_from_density_pressure(
        carrier.density(carrier_column),
        carrier.pressure(carrier_column),
    );
    let boundary_density = (boundary_sound_speed * boundary_sound_speed / (gamma * entropy))
        .powf(1.0 / (gamma - 1.0));
    let boundary_pressure =
        boundary_density * boundary_sound_speed * boundary_sound_speed / gamma;
    let boundary_internal_energy =
        boundary_pressure / ((gamma - 1.0) * boundary_density);
    boundary.set_density(boundary_density, 0);
    boundary.set_velocity(&boundary_velocity, 0);
    boundary.set_internal_energy(boundary_internal_energy, 0);
    boundary.set_pressure(boundary_pressure, 0);
}

/// Subsonic weakly-compressible farfield through the exact acoustic
/// construction; tangential velocity and internal energy from the dummy
/// (inflow) or interior (outflow) side.
#[allow(clippy::too_many_arguments)]
fn subsonic_acoustic(
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    left_column: usize,
    dummy: &VariableBatch,
    dummy_column: usize,
    mach: f64,
    boundary: &mut VariableBatch,
) {
    let sound_speed = model.sound_speed_from_density_pressure(0.0, 0.0);
    let left_normal_velocity = left.velocity(left_column).dot(normal);
    let dummy_normal_velocity = dummy.velocity(dummy_column).dot(normal);
    let boundary_density = (left.density(left_column)
        * dummy.density(dummy_column)
        * ((left_normal_velocity - dummy_normal_velocity) / sound_speed).exp())
    .sqrt();
    let boundary_normal_velocity = (left_normal_velocity + dummy_normal_velocity) / 2.0
        + (left.density(left_column) / dummy.density(dummy_column)).ln() * sound_speed / 2.0;
    let (carrier, carrier_column) = if mach < 0.0 {
        (dummy, dummy_column)
    } else {
        (left, left_column)
    };
    let boundary_internal_energy = carrier.internal_energy(carrier_column)
        * carrier.density(carrier_column)
        / boundary_density;
    let carrier_velocity = carrier.velocity(carrier_column);
    let boundary_velocity = &carrier_velocity
        + normal * (boundary_normal_velocity - carrier_velocity.dot(normal));
    boundary.set_density(boundary_density, 0);
    boundary.set_velocity(&boundary_velocity, 0);
    boundary.set_internal_energy(boundary_internal_energy, 0);
    boundary.set_pressure(
        model.pressure_from_density_internal_energy(boundary_density, boundary_internal_energy),
        0,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(model: &PhysicalModel, d: usize, primitive: &[f64]) -> VariableBatch {
        let mut batch = VariableBatch::zeros(d, 1);
        batch.set_primitive_column(model, &DVector::from_row_slice(primitive), 0);
        batch.conserved_from_computational(model);
        batch
    }

    #[test]
    fn slip_wall_reflects_the_normal_velocity() {
        let model = PhysicalModel::compressible_euler(2.5);
        let left = state(&model, 2, &[1.0, 0.7, 0.3, 1.0]);
        let dummy = VariableBatch::zeros(2, 1);
        let normal = DVector::from_vec(vec![0.0, 1.0]);
        let boundary = boundary_variable(
            BoundaryKind::AdiabaticSlipWall,
            &model,
            &normal,
            &left,
            0,
            &dummy,
            0,
        );
        assert!(boundary.velocity(0).dot(&normal).abs() < 1e-14);
        // Tangential component, density and pressure are untouched.
        assert!((boundary.velocity(0)[0] - 0.7).abs() < 1e-14);
        assert!((boundary.density(0) - 1.0).abs() < 1e-14);
        assert!((boundary.pressure(0) - left.pressure(0)).abs() < 1e-14);
    }

    #[test]
    fn isothermal_wall_keeps_interior_density_and_wall_temperature() {
        let model = PhysicalModel::compressible_euler(2.5);
        let left = state(&model, 2, &[1.3, 0.4, 0.1, 1.2]);
        let wall = state(&model, 2, &[1.0, 0.0, 0.0, 0.8]);
        let normal = DVector::from_vec(vec![0.0, -1.0]);
        let boundary = boundary_variable(
            BoundaryKind::IsoThermalNonSlipWall,
            &model,
            &normal,
            &left,
            0,
            &wall,
            0,
        );
        assert!((boundary.density(0) - 1.3).abs() < 1e-14);
        assert!(boundary.velocity(0).norm() < 1e-14);
        let wall_temperature = model.temperature_from_internal_energy(boundary.internal_energy(0));
        assert!((wall_temperature - 0.8).abs() < 1e-13);
    }

    #[test]
    fn supersonic_riemann_farfield_selects_a_side() {
        let model = PhysicalModel::compressible_euler(2.5);
        // Supersonic outflow: M_n ≈ 2.5 along the normal.
        let left = state(&model, 1, &[1.0, 3.0, 1.0]);
        let dummy = state(&model, 1, &[0.5, 1.0, 0.9]);
        let normal = DVector::from_vec(vec![1.0]);
        let boundary = boundary_variable(
            BoundaryKind::RiemannFarfield,
            &model,
            &normal,
            &left,
            0,
            &dummy,
            0,
        );
        assert!((boundary.density(0) - 1.0).abs() < 1e-14);
        // Supersonic inflow (flow entering against the outward normal).
        let left_in = state(&model, 1, &[1.0, -3.0, 1.0]);
        let boundary_in = boundary_variable(
            BoundaryKind::RiemannFarfield,
            &model,
            &normal,
            &left_in,
            0,
            &dummy,
            0,
        );
        assert!((boundary_in.density(0) - 0.5).abs() < 1e-14);
    }

    #[test]
    fn subsonic_farfield_preserves_a_uniform_state() {
        let model = PhysicalModel::compressible_euler(2.5);
        // Dummy equals the interior state: the reconstruction must return it.
        let left = state(&model, 2, &[1.0, 0.3, 0.0, 1.0]);
        let dummy = state(&model, 2, &[1.0, 0.3, 0.0, 1.0]);
        let normal = DVector::from_vec(vec![1.0, 0.0]);
        let boundary = boundary_variable(
            BoundaryKind::RiemannFarfield,
            &model,
            &normal,
            &left,
            0,
            &dummy,
            0,
        );
        for i in 0..boundary.computational.nrows() {
            assert!(
                (boundary.computational[(i, 0)] - left.computational[(i, 0)]).abs() < 1e-10,
                "row {i}"
            );
        }
    }

    #[test]
    fn adiabatic_modification_zeroes_the_boundary_temperature_gradient() {
        let model = PhysicalModel::compressible_euler(2.5);
        let mut left = state(&model, 2, &[1.0, 0.5, 0.2, 1.0]);
        let mut left_gradient = GradientBatch::zeros(2, 1);
        for i in 0..left_gradient.primitive.nrows() {
            left_gradient.primitive[(i, 0)] = 0.3 + i as f64;
        }
        let normal = DVector::from_vec(vec![0.0, 1.0]);
        let dummy = VariableBatch::zeros(2, 1);
        let boundary = boundary_variable(
            BoundaryKind::AdiabaticSlipWall,
            &model,
            &normal,
            &left,
            0,
            &dummy,
            0,
        );
        let mut boundary_gradient = GradientBatch::zeros(2, 1);
        modify_boundary_variable(
            BoundaryKind::AdiabaticSlipWall,
            &mut left,
            &left_gradient,
            0,
            &boundary,
            &mut boundary_gradient,
        );
        let t_grad = boundary_gradient.temperature_gradient(0);
        assert!(t_grad.norm() < 1e-14);
        // Velocity gradients were copied from the left side.
        assert!(
            (boundary_gradient.velocity_gradient(0) - left_gradient.velocity_gradient(0)).norm()
                < 1e-14
        );
        // The left state now carries the reflected wall velocity.
        assert!(left.velocity(0).dot(&normal).abs() < 1e-14);
    }

    #[test]
    fn gradient_states_carry_the_wall_jump() {
        let model = PhysicalModel::compressible_euler(2.5);
        let left = state(&model, 2, &[1.0, 0.6, 0.0, 1.0]);
        let dummy = state(&model, 2, &[1.0, 0.0, 0.0, 1.0]);
        let normal = DVector::from_vec(vec![0.0, 1.0]);
        let (volume, interface) = boundary_gradient_variable(
            BoundaryKind::AdiabaticNonSlipWall,
            &model,
            &normal,
            &left,
            0,
            &dummy,
            0,
        );
        // B keeps the left density, so the density jump is zero while the
        // momentum jump cancels the tangential momentum.
        assert!((volume[0] - 1.0).abs() < 1e-14);
        assert!(interface[0].abs() < 1e-14);
        assert!((interface[1] + 0.6).abs() < 1e-13);
    }
}
