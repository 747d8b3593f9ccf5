//! Convective, viscous, gradient and artificial-viscous flux kernels.
//!
//! All kernels act on column-indexed variable batches and a unit outward
//! normal; raw fluxes are `d × N_c` matrices, normal fluxes length-`N_c`
//! vectors.

use nalgebra::{DMatrix, DVector};

use dgf_model::{GradientBatch, PhysicalModel, SPECIFIC_HEAT_RATIO, VariableBatch};

/// Numerical interface flux selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvectiveFluxScheme {
    Central,
    LaxFriedrichs,
    /// Three-wave HLLC; compressible models only.
    Hllc,
    /// Roe with the Harten entropy fix; compressible models only.
    Roe,
    /// Exact acoustic Riemann solution; weakly compressible models only.
    ExactAcoustic,
}

/// Viscous discretization of the auxiliary gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViscousFluxScheme {
    None,
    Br1,
    Br2,
}

/// Raw convective flux F(u), `d × N_c`.
pub fn convective_raw_flux(
    model: &PhysicalModel,
    variable: &VariableBatch,
    column: usize,
) -> DMatrix<f64> {
    let d = variable.dimension;
    let density = variable.density(column);
    let velocity = variable.velocity(column);
    let pressure = variable.pressure(column);
    let mut flux = DMatrix::zeros(d, d + 2);
    for s in 0..d {
        flux[(s, 0)] = density * velocity[s];
        for i in 0..d {
            flux[(s, 1 + i)] = density * velocity[s] * velocity[i];
        }
        flux[(s, 1 + s)] += pressure;
    }
    if model.equation.is_compressible() {
        let total_energy =
            variable.internal_energy(column) + variable.velocity_squared_norm(column) / 2.0;
        for s in 0..d {
            flux[(s, d + 1)] = (density * total_energy + pressure) * velocity[s];
        }
    } else {
        let internal_energy = variable.internal_energy(column);
        for s in 0..d {
            flux[(s, d + 1)] = density * internal_energy * velocity[s];
        }
    }
    flux
}

/// Convective flux projected on a unit normal, length `N_c`.
pub fn convective_normal_flux(
    model: &PhysicalModel,
    normal: &DVector<f64>,
    variable: &VariableBatch,
    column: usize,
) -> DVector<f64> {
    let d = variable.dimension;
    let density = variable.density(column);
    let velocity = variable.velocity(column);
    let pressure = variable.pressure(column);
    let normal_velocity = velocity.dot(normal);
    let mut flux = DVector::zeros(d + 2);
    flux[0] = density * normal_velocity;
    for i in 0..d {
        flux[1 + i] = density * normal_velocity * velocity[i] + pressure * normal[i];
    }
    if model.equation.is_compressible() {
        let total_energy =
            variable.internal_energy(column) + variable.velocity_squared_norm(column) / 2.0;
        flux[d + 1] = (density * total_energy + pressure) * normal_velocity;
    } else {
        flux[d + 1] = density * variable.internal_energy(column) * normal_velocity;
    }
    flux
}

/// Numerical interface flux between a left and a right state.
pub fn convective_flux(
    scheme: ConvectiveFluxScheme,
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    right: &VariableBatch,
    left_column: usize,
    right_column: usize,
) -> DVector<f64> {
    match scheme {
        ConvectiveFluxScheme::Central => {
            let fl = convective_normal_flux(model, normal, left, left_column);
            let fr = convective_normal_flux(model, normal, right, right_column);
            (fl + fr) / 2.0
        }
        ConvectiveFluxScheme::LaxFriedrichs => {
            lax_friedrichs_flux(model, normal, left, right, left_column, right_column)
        }
        ConvectiveFluxScheme::Hllc => {
            hllc_flux(model, normal, left, right, left_column, right_column)
        }
        ConvectiveFluxScheme::Roe => roe_flux(model, normal, left, right, left_column, right_column),
        ConvectiveFluxScheme::ExactAcoustic => {
            exact_acoustic_flux(model, normal, left, right, left_column, right_column)
        }
    }
}

fn lax_friedrichs_flux(
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    right: &VariableBatch,
    left_column: usize,
    right_column: usize,
) -> DVector<f64> {
    let fl = convective_normal_flux(model, normal, left, left_column);
    let fr = convective_normal_flux(model, normal, right, right_column);
    let left_normal_velocity = left.velocity(left_column).dot(normal);
    let right_normal_velocity = right.velocity(right_column).dot(normal);
    let left_sound_speed = model
        .sound_speed_from_density_pressure(left.density(left_column), left.pressure(left_column));
    let right_sound_speed = model.sound_speed_from_density_pressure(
        right.density(right_column),
        right.pressure(right_column),
    );
    let spectral_radius = (left_normal_velocity.abs() + left_sound_speed)
        .max(right_normal_velocity.abs() + right_sound_speed);
    let n_c = fl.len();
    let mut flux = DVector::zeros(n_c);
    for v in 0..n_c {
        flux[v] = (fl[v] + fr[v]
            - spectral_radius
                * (right.conserved[(v, right_column)] - left.conserved[(v, left_column)]))
            / 2.0;
    }
    flux
}

fn hllc_flux(
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    right: &VariableBatch,
    left_column: usize,
    right_column: usize,
) -> DVector<f64> {
    let d = left.dimension;
    let gamma = SPECIFIC_HEAT_RATIO;
    let left_density = left.density(left_column);
    let right_density = right.density(right_column);
    let left_pressure = left.pressure(left_column);
    let right_pressure = right.pressure(right_column);
    let left_velocity = left.velocity(left_column);
    let right_velocity = right.velocity(right_column);
    let left_normal_velocity = left_velocity.dot(normal);
    let right_normal_velocity = right_velocity.dot(normal);
    let left_sound_speed = model.sound_speed_from_density_pressure(left_density, left_pressure);
    let right_sound_speed = model.sound_speed_from_density_pressure(right_density, right_pressure);

    let average_density = (left_density + right_density) / 2.0;
    let average_sound_speed = (left_sound_speed + right_sound_speed) / 2.0;
    let contact_pressure = (0.0_f64).max(
        (left_pressure + right_pressure) / 2.0
            - (right_normal_velocity - left_normal_velocity) * average_density * average_sound_speed,
    );

    let wave_factor = |pressure: f64| -> f64 {
        if contact_pressure <= pressure {
            1.0
        } else {
            (1.0 + (gamma + 1.0) * (contact_pressure / pressure - 1.0) / (2.0 * gamma)).sqrt()
        }
    };
    let left_wave_speed =
        left_normal_velocity - left_sound_speed * wave_factor(left_pressure);
    if left_wave_speed >= 0.0 {
        return convective_normal_flux(model, normal, left, left_column);
    }
    let right_wave_speed =
        right_normal_velocity + right_sound_speed * wave_factor(right_pressure);
    if right_wave_speed <= 0.0 {
        return convective_normal_flux(model, normal, right, right_column);
    }
    let contact_wave_speed = (right_pressure - left_pressure
        + left_density * left_normal_velocity * (left_wave_speed - left_normal_velocity)
        - right_density * right_normal_velocity * (right_wave_speed - right_normal_velocity))
        / (left_density * (left_wave_speed - left_normal_velocity)
            - right_density * (right_wave_speed - right_normal_velocity));

    let star_state = |batch: &VariableBatch,
                      column: usize,
                      density: f64,
                      pressure: f64,
                      normal_velocity: f64,
                      wave_speed: f64|
     -> DVector<f64> {
        let mut star = DVector::zeros(d + 2);
        let coefficient = wave_speed - normal_velocity;
        star[0] = density * coefficient / (wave_speed - contact_wave_speed);
        let velocity = batch.velocity(column);
        for i in 0..d {
            star[1 + i] = (coefficient * density * velocity[i]
                + (contact_pressure - pressure) * normal[i])
                / (wave_speed - contact_wave_speed);
        }
        let total_energy =
            batch.internal_energy(column) + batch.velocity_squared_norm(column) / 2.0;
        star[d + 1] = (coefficient * density * total_energy - pressure * normal_velocity
            + contact_pressure * contact_wave_speed)
            / (wave_speed - contact_wave_speed);
        star
    };

    if contact_wave_speed >= 0.0 {
        let flux = convective_normal_flux(model, normal, left, left_column);
        let star = star_state(
            left,
            left_column,
            left_density,
            left_pressure,
            left_normal_velocity,
            left_wave_speed,
        );
        let mut out = flux;
        for v in 0..d + 2 {
            out[v] += left_wave_speed * (star[v] - left.conserved[(v, left_column)]);
        }
        out
    } else {
        let flux = convective_normal_flux(model, normal, right, right_column);
        let star = star_state(
            right,
            right_column,
            right_density,
            right_pressure,
            right_normal_velocity,
            right_wave_speed,
        );
        let mut out = flux;
        for v in 0..d + 2 {
            out[v] += right_wave_speed * (star[v] - right.conserved[(v, right_column)]);
        }
        out
    }
}

fn roe_flux(
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    right: &VariableBatch,
    left_column: usize,
    right_column: usize,
) -> DVector<f64> {
    let d = left.dimension;
    let n_c = d + 2;
    let gamma = SPECIFIC_HEAT_RATIO;
    let fl = convective_normal_flux(model, normal, left, left_column);
    let fr = convective_normal_flux(model, normal, right, right_column);

    let left_density = left.density(left_column);
    let right_density = right.density(right_column);
    let left_sqrt = left_density.sqrt();
    let right_sqrt = right_density.sqrt();
    let sqrt_sum = left_sqrt + right_sqrt;

    let roe_density = (left_density * right_density).sqrt();
    let left_velocity = left.velocity(left_column);
    let right_velocity = right.velocity(right_column);
    let roe_velocity = (&left_velocity * left_sqrt + &right_velocity * right_sqrt) / sqrt_sum;
    let left_total_enthalpy = left.internal_energy(left_column) * gamma
        + left.velocity_squared_norm(left_column) / 2.0;
    let right_total_enthalpy = right.internal_energy(right_column) * gamma
        + right.velocity_squared_norm(right_column) / 2.0;
    let roe_total_enthalpy =
        (left_sqrt * left_total_enthalpy + right_sqrt * right_total_enthalpy) / sqrt_sum;
    let roe_velocity_squared = roe_velocity.dot(&roe_velocity);
    let roe_internal_energy = (roe_total_enthalpy - roe_velocity_squared / 2.0) / gamma;
    let roe_pressure =
        model.pressure_from_density_internal_energy(roe_density, roe_internal_energy);
    let roe_normal_velocity = roe_velocity.dot(normal);
    let roe_sound_speed = model.sound_speed_from_density_pressure(roe_density, roe_pressure);

    let delta_density = right_density - left_density;
    let delta_pressure = right.pressure(right_column) - left.pressure(left_column);
    let delta_velocity = &right_velocity - &left_velocity;
    let delta_normal_velocity = delta_velocity.dot(normal);

    // Harten entropy fix on the acoustic eigenvalues, δ = c̄/20.
    let harten_delta = roe_sound_speed / 20.0;
    let fix = |lambda: f64| -> f64 {
        if lambda.abs() > harten_delta {
            lambda.abs()
        } else {
            (lambda * lambda + harten_delta * harten_delta) / (2.0 * harten_delta)
        }
    };
    let lambda_minus = fix(roe_normal_velocity - roe_sound_speed);
    let lambda_plus = fix(roe_normal_velocity + roe_sound_speed);

    let mut dissipation: DVector<f64> = DVector::zeros(n_c);
    // Acoustic wave u - c.
    {
        let strength = lambda_minus
            * (delta_pressure - roe_density * roe_sound_speed * delta_normal_velocity)
            / (2.0 * roe_sound_speed * roe_sound_speed);
        dissipation[0] += strength;
        for i in 0..d {
            dissipation[1 + i] += strength * (roe_velocity[i] - roe_sound_speed * normal[i]);
        }
        dissipation[d + 1] +=
            strength * (roe_total_enthalpy - roe_sound_speed * roe_normal_velocity);
    }
    // Entropy wave.
    {
        let strength = roe_normal_velocity.abs()
            * (delta_density - delta_pressure / (roe_sound_speed * roe_sound_speed));
        dissipation[0] += strength;
        for i in 0..d {
            dissipation[1 + i] += strength * roe_velocity[i];
        }
        dissipation[d + 1] += strength * roe_velocity_squared / 2.0;
    }
    // Shear wave (tangential velocity jump), absent in 1D.
    if d >= 2 {
        let strength = roe_normal_velocity.abs() * roe_density;
        for i in 0..d {
            dissipation[1 + i] +=
                strength * (delta_velocity[i] - delta_normal_velocity * normal[i]);
        }
        dissipation[d + 1] += strength
            * (roe_velocity.dot(&delta_velocity) - roe_normal_velocity * delta_normal_velocity);
    }
    // Acoustic wave u + c.
    {
        let strength = lambda_plus
            * (delta_pressure + roe_density * roe_sound_speed * delta_normal_velocity)
            / (2.0 * roe_sound_speed * roe_sound_speed);
        dissipation[0] += strength;
        for i in 0..d {
            dissipation[1 + i] += strength * (roe_velocity[i] + roe_sound_speed * normal[i]);
        }
        dissipation[d + 1] +=
            strength * (roe_total_enthalpy + roe_sound_speed * roe_normal_velocity);
    }

    let mut flux = DVector::zeros(n_c);
    for v in 0..n_c {
        flux[v] = (fl[v] + fr[v] - dissipation[v]) / 2.0;
    }
    flux
}

fn exact_acoustic_flux(
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    right: &VariableBatch,
    left_column: usize,
    right_column: usize,
) -> DVector<f64> {
    let d = left.dimension;
    let sound_speed = model.sound_speed_from_density_pressure(0.0, 0.0);
    let left_density = left.density(left_column);
    let right_density = right.density(right_column);
    let left_normal_velocity = left.velocity(left_column).dot(normal);
    let right_normal_velocity = right.velocity(right_column).dot(normal);

    let star_density = (left_density
        * right_density
        * ((left_normal_velocity - right_normal_velocity) / sound_speed).exp())
    .sqrt();
    let star_normal_velocity = (left_normal_velocity + right_normal_velocity) / 2.0
        + (left_density / right_density).ln() * sound_speed / 2.0;

    // Tangential velocity and internal energy from the upwind side.
    let (upwind, upwind_column) = if star_normal_velocity < 0.0 {
        (right, right_column)
    } else {
        (left, left_column)
    };
    let star_internal_energy =
        upwind.internal_energy(upwind_column) * upwind.density(upwind_column) / star_density;
    let upwind_velocity = upwind.velocity(upwind_column);
    let upwind_normal_velocity = upwind_velocity.dot(normal);
    let star_velocity =
        &upwind_velocity + normal * (star_normal_velocity - upwind_normal_velocity);

    let mut star = VariableBatch::zeros(d, 1);
    star.set_density(star_density, 0);
    star.set_velocity(&star_velocity, 0);
    star.set_internal_energy(star_internal_energy, 0);
    star.set_pressure(
        model.pressure_from_density_internal_energy(star_density, star_internal_energy),
        0,
    );
    convective_normal_flux(model, normal, &star, 0)
}

/// Raw viscous flux, `d × N_c`: Stokes-hypothesis stress tensor plus heat
/// conduction on the energy row.
pub fn viscous_raw_flux(
    model: &PhysicalModel,
    variable: &VariableBatch,
    gradient: &GradientBatch,
    column: usize,
) -> DMatrix<f64> {
    let d = variable.dimension;
    let mut flux = DMatrix::zeros(d, d + 2);
    let velocity_gradient = gradient.velocity_gradient(column);
    let temperature =
        model.temperature_from_internal_energy(variable.internal_energy(column));
    let viscosity = model.dynamic_viscosity(temperature);
    let conductivity = model.thermal_conductivity(temperature);
    let divergence = velocity_gradient.trace();
    let mut stress = DMatrix::zeros(d, d);
    for i in 0..d {
        for j in 0..d {
            stress[(i, j)] =
                viscosity * (velocity_gradient[(i, j)] + velocity_gradient[(j, i)]);
        }
        stress[(i, i)] -= 2.0 / 3.0 * viscosity * divergence;
    }
    for s in 0..d {
        for i in 0..d {
            flux[(s, 1 + i)] = stress[(i, s)];
        }
    }
    let temperature_gradient = gradient.temperature_gradient(column);
    if model.equation.is_compressible() {
        let velocity = variable.velocity(column);
        for s in 0..d {
            let mut work = 0.0;
            for i in 0..d {
                work += stress[(s, i)] * velocity[i];
            }
            flux[(s, d + 1)] = work + conductivity * temperature_gradient[s];
        }
    } else {
        for s in 0..d {
            flux[(s, d + 1)] = conductivity * temperature_gradient[s];
        }
    }
    flux
}

/// Interface viscous flux: average of the two raw fluxes dotted with the
/// normal (shared by BR1 and BR2).
pub fn viscous_interface_flux(
    model: &PhysicalModel,
    normal: &DVector<f64>,
    left: &VariableBatch,
    left_gradient: &GradientBatch,
    left_column: usize,
    right: &VariableBatch,
    right_gradient: &GradientBatch,
    right_column: usize,
) -> DVector<f64> {
    let d = left.dimension;
    let fl = viscous_raw_flux(model, left, left_gradient, left_column);
    let fr = viscous_raw_flux(model, right, right_gradient, right_column);
    let mut flux = DVector::zeros(d + 2);
    for v in 0..d + 2 {
        for s in 0..d {
            flux[v] += (fl[(s, v)] + fr[(s, v)]) / 2.0 * normal[s];
        }
    }
    flux
}

/// Auxiliary-gradient volume flux on a face: n̂ ⊗ ½(U_L + U_R), `d × N_c`.
pub fn volume_gradient_flux(
    normal: &DVector<f64>,
    left: &VariableBatch,
    right: &VariableBatch,
    left_column: usize,
    right_column: usize,
) -> DMatrix<f64> {
    let d = left.dimension;
    DMatrix::from_fn(d, d + 2, |s, v| {
        normal[s] * (left.conserved[(v, left_column)] + right.conserved[(v, right_column)]) / 2.0
    })
}

/// Auxiliary-gradient interface flux on a face: n̂ ⊗ ½(U_R − U_L).
pub fn interface_gradient_flux(
    normal: &DVector<f64>,
    left: &VariableBatch,
    right: &VariableBatch,
    left_column: usize,
    right_column: usize,
) -> DMatrix<f64> {
    let d = left.dimension;
    DMatrix::from_fn(d, d + 2, |s, v| {
        normal[s] * (right.conserved[(v, right_column)] - left.conserved[(v, left_column)]) / 2.0
    })
}

/// Gradient flux of a single boundary state: n̂ ⊗ U.
pub fn gradient_raw_flux(normal: &DVector<f64>, conserved: &DVector<f64>) -> DMatrix<f64> {
    let d = normal.len();
    DMatrix::from_fn(d, conserved.len(), |s, v| normal[s] * conserved[v])
}

/// Raw artificial viscous flux ε ∇U, `d × N_c`, from the volume-only
/// conserved gradient.
pub fn artificial_viscous_raw_flux(
    epsilon: f64,
    gradient: &GradientBatch,
    column: usize,
) -> DMatrix<f64> {
    let d = gradient.dimension;
    let n_c = d + 2;
    DMatrix::from_fn(d, n_c, |s, v| epsilon * gradient.conserved[(v * d + s, column)])
}

/// Normal artificial viscous flux of one side.
pub fn artificial_viscous_normal_flux(
    normal: &DVector<f64>,
    epsilon: f64,
    gradient: &GradientBatch,
    column: usize,
) -> DVector<f64> {
    let d = gradient.dimension;
    let n_c = d + 2;
    DVector::from_fn(n_c, |v, _| {
        (0..d)
            .map(|s| normal[s] * epsilon * gradient.conserved[(v * d + s, column)])
            .sum()
    })
}

/// Interface artificial viscous flux: average of the two one-sided fluxes.
pub fn artificial_viscous_interface_flux(
    normal: &DVector<f64>,
    left_epsilon: f64,
    left_gradient: &GradientBatch,
    left_column: usize,
    right_epsilon: f64,
    right_gradient: &GradientBatch,
    right_column: usize,
) -> DVector<f64> {
    let fl = artificial_viscous_normal_flux(normal, left_epsilon, left_gradient, left_column);
    let fr = artificial_viscous_normal_flux(normal, right_epsilon, right_gradient, right_column);
    (fl + fr) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use dgf_model::TransportModel;

    fn state(model: &PhysicalModel, d: usize, primitive: &[f64]) -> VariableBatch {
        let mut batch = VariableBatch::zeros(d, 1);
        batch.set_primitive_column(model, &DVector::from_row_slice(primitive), 0);
        batch.conserved_from_computational(model);
        batch
    }

    #[test]
    fn all_schemes_are_consistent_on_equal_states() {
        let model = PhysicalModel::compressible_euler(2.5);
        let batch = state(&model, 2, &[1.2, 0.4, -0.3, 1.1]);
        let normal = DVector::from_vec(vec![0.6, 0.8]);
        let exact = convective_normal_flux(&model, &normal, &batch, 0);
        for scheme in [
            ConvectiveFluxScheme::Central,
            ConvectiveFluxScheme::LaxFriedrichs,
            ConvectiveFluxScheme::Hllc,
            ConvectiveFluxScheme::Roe,
        ] {
            let flux = convective_flux(scheme, &model, &normal, &batch, &batch, 0, 0);
            for v in 0..4 {
                assert!(
                    (flux[v] - exact[v]).abs() < 1e-11,
                    "{scheme:?} row {v}: {} vs {}",
                    flux[v],
                    exact[v]
                );
            }
        }
    }

    #[test]
    fn exact_acoustic_is_consistent_on_equal_states() {
        let model = PhysicalModel::weakly_compressible_euler(10.0, 1.0, 2.5);
        let batch = state(&model, 2, &[1.0, 0.3, 0.1, 1.0]);
        let normal = DVector::from_vec(vec![1.0, 0.0]);
        let exact = convective_normal_flux(&model, &normal, &batch, 0);
        let flux = convective_flux(
            ConvectiveFluxScheme::ExactAcoustic,
            &model,
            &normal,
            &batch,
            &batch,
            0,
            0,
        );
        for v in 0..4 {
            assert!((flux[v] - exact[v]).abs() < 1e-11, "row {v}");
        }
    }

    #[test]
    fn hllc_upwinds_fully_supersonic_flow() {
        let model = PhysicalModel::compressible_euler(2.5);
        // Mach 3 flow to the right: the flux must be the left flux.
        let left = state(&model, 1, &[1.0, 3.55, 1.0]);
        let right = state(&model, 1, &[0.9, 3.4, 0.9]);
        let normal = DVector::from_vec(vec![1.0]);
        let flux = convective_flux(ConvectiveFluxScheme::Hllc, &model, &normal, &left, &right, 0, 0);
        let expected = convective_normal_flux(&model, &normal, &left, 0);
        for v in 0..3 {
            assert!((flux[v] - expected[v]).abs() < 1e-12);
        }
    }

    #[test]
    fn lax_friedrichs_adds_dissipation_against_the_jump() {
        let model = PhysicalModel::compressible_euler(2.5);
        let left = state(&model, 1, &[1.0, 0.0, 1.0]);
        let right = state(&model, 1, &[0.5, 0.0, 1.0]);
        let normal = DVector::from_vec(vec![1.0]);
        let flux =
            convective_flux(ConvectiveFluxScheme::LaxFriedrichs, &model, &normal, &left, &right, 0, 0);
        let central =
            convective_flux(ConvectiveFluxScheme::Central, &model, &normal, &left, &right, 0, 0);
        // Density jump is negative left→right, so the dissipation adds mass
        // flux relative to central.
        assert!(flux[0] > central[0]);
    }

    #[test]
    fn viscous_flux_vanishes_for_a_uniform_flow() {
        let model = PhysicalModel::compressible_ns(
            2.5,
            TransportModel::Constant { dynamic_viscosity: 1e-2 },
        );
        let batch = state(&model, 2, &[1.0, 0.5, 0.2, 1.0]);
        let gradient = GradientBatch::zeros(2, 1);
        let flux = viscous_raw_flux(&model, &batch, &gradient, 0);
        for s in 0..2 {
            for v in 0..4 {
                assert!(flux[(s, v)].abs() < 1e-14);
            }
        }
    }

    #[test]
    fn shear_flow_produces_the_expected_stress() {
        let model = PhysicalModel::compressible_ns(
            2.5,
            TransportModel::Constant { dynamic_viscosity: 2.0 },
        );
        let batch = state(&model, 2, &[1.0, 0.0, 0.0, 1.0]);
        let mut gradient = GradientBatch::zeros(2, 1);
        // du/dy = 1 (row block of u, second derivative slot), all else zero.
        gradient.primitive[(3, 0)] = 1.0;
        let flux = viscous_raw_flux(&model, &batch, &gradient, 0);
        // τ_xy = μ (du/dy + dv/dx) = 2
        assert!((flux[(1, 1)] - 2.0).abs() < 1e-13);
        assert!((flux[(0, 2)] - 2.0).abs() < 1e-13);
        // No normal stress.
        assert!(flux[(0, 1)].abs() < 1e-13);
        assert!(flux[(1, 2)].abs() < 1e-13);
    }

    #[test]
    fn gradient_fluxes_average_and_jump() {
        let model = PhysicalModel::compressible_euler(2.5);
        let left = state(&model, 1, &[1.0, 0.0, 1.0]);
        let right = state(&model, 1, &[3.0, 0.0, 1.0]);
        let normal = DVector::from_vec(vec![1.0]);
        let volume = volume_gradient_flux(&normal, &left, &right, 0, 0);
        let interface = interface_gradient_flux(&normal, &left, &right, 0, 0);
        assert!((volume[(0, 0)] - 2.0).abs() < 1e-14);
        assert!((interface[(0, 0)] - 1.0).abs() < 1e-14);
    }
}
