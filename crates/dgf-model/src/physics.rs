//! Thermodynamic, equation-of-state and transport sub-models.
//!
//! The combined [`PhysicalModel`] is a small immutable value type built once
//! at setup and passed by reference through the solver call graph.

/// Equation family being solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquationModel {
    CompressibleEuler,
    CompressibleNs,
    WeaklyCompressibleEuler,
    WeaklyCompressibleNs,
}

impl EquationModel {
    /// Whether the energy row carries ρE (total) rather than ρe (internal).
    pub fn is_compressible(&self) -> bool {
        matches!(
            self,
            EquationModel::CompressibleEuler | EquationModel::CompressibleNs
        )
    }

    pub fn is_viscous(&self) -> bool {
        matches!(
            self,
            EquationModel::CompressibleNs | EquationModel::WeaklyCompressibleNs
        )
    }
}

/// Constant-specific-heat thermodynamic relations.
#[derive(Debug, Clone, Copy)]
pub struct ThermodynamicModel {
    pub specific_heat_volume: f64,
    pub specific_heat_pressure: f64,
}

impl ThermodynamicModel {
    pub fn internal_energy_from_temperature(&self, temperature: f64) -> f64 {
        self.specific_heat_volume * temperature
    }

    pub fn temperature_from_internal_energy(&self, internal_energy: f64) -> f64 {
        internal_energy / self.specific_heat_volume
    }
}

/// Ideal-gas specific heat ratio.
pub const SPECIFIC_HEAT_RATIO: f64 = 1.4;

/// Equation of state.
#[derive(Debug, Clone, Copy)]
pub enum EquationOfState {
    IdealGas,
    /// Tait-like weakly compressible fluid with fixed reference sound speed.
    WeaklyCompressible {
        reference_sound_speed: f64,
        reference_density: f64,
        reference_pressure_shift: f64,
    },
}

impl EquationOfState {
    pub fn weakly_compressible(reference_sound_speed: f64, reference_density: f64) -> Self {
        EquationOfState::WeaklyCompressible {
            reference_sound_speed,
            reference_density,
            reference_pressure_shift: 0.01
                * reference_density
                * reference_sound_speed
                * reference_sound_speed,
        }
    }

    pub fn pressure(&self, density: f64, internal_energy: f64) -> f64 {
        match self {
            EquationOfState::IdealGas => (SPECIFIC_HEAT_RATIO - 1.0) * density * internal_energy,
            EquationOfState::WeaklyCompressible {
                reference_sound_speed,
                reference_density,
                reference_pressure_shift,
            } => {
                reference_sound_speed * reference_sound_speed * (density - reference_density)
                    + reference_pressure_shift
            }
        }
    }

    pub fn sound_speed(&self, density: f64, pressure: f64) -> f64 {
        match self {
            EquationOfState::IdealGas => (SPECIFIC_HEAT_RATIO * pressure / density).sqrt(),
            EquationOfState::WeaklyCompressible { reference_sound_speed, .. } => {
                *reference_sound_speed
            }
        }
    }
}

/// Prandtl number for the supported gases.
pub const PRANDTL_NUMBER: f64 = 0.71;

/// Non-dimensional Sutherland reference temperature (110.4 K / 273.15 K).
pub const SUTHERLAND_TEMPERATURE: f64 = 110.4 / 273.15;

/// Transport (viscosity / conduction) model.
#[derive(Debug, Clone, Copy)]
pub enum TransportModel {
    Inviscid,
    Constant { dynamic_viscosity: f64 },
    Sutherland { dynamic_viscosity: f64 },
}

impl TransportModel {
    fn sutherland_ratio(temperature: f64) -> f64 {
        (temperature * temperature * temperature).sqrt() * (1.0 + SUTHERLAND_TEMPERATURE)
            / (temperature + SUTHERLAND_TEMPERATURE)
    }

    pub fn dynamic_viscosity(&self, temperature: f64) -> f64 {
        match self {
            TransportModel::Inviscid => 0.0,
            TransportModel::Constant { dynamic_viscosity } => *dynamic_viscosity,
            TransportModel::Sutherland { dynamic_viscosity } => {
                dynamic_viscosity * Self::sutherland_ratio(temperature)
            }
        }
    }
}

/// The combined physical model.
#[derive(Debug, Clone, Copy)]
pub struct PhysicalModel {
    pub equation: EquationModel,
    pub thermodynamic: ThermodynamicModel,
    pub equation_of_state: EquationOfState,
    pub transport: TransportModel,
    /// Reference thermal conductivity k = c_p μ / Pr.
    thermal_conductivity: f64,
}

impl PhysicalModel {
    pub fn new(
        equation: EquationModel,
        thermodynamic: ThermodynamicModel,
        equation_of_state: EquationOfState,
        transport: TransportModel,
    ) -> Self {
        let reference_viscosity = match transport {
            TransportModel::Inviscid => 0.0,
            TransportModel::Constant { dynamic_viscosity }
            | TransportModel::Sutherland { dynamic_viscosity } => dynamic_viscosity,
        };
        Self {
            equation,
            thermodynamic,
            equation_of_state,
            transport,
            thermal_conductivity: thermodynamic.specific_heat_pressure * reference_viscosity
                / PRANDTL_NUMBER,
        }
    }

    /// Compressible Euler with specific heat at constant volume `c_v`.
    pub fn compressible_euler(specific_heat_volume: f64) -> Self {
        Self::new(
            EquationModel::CompressibleEuler,
            ThermodynamicModel {
                specific_heat_volume,
                specific_heat_pressure: SPECIFIC_HEAT_RATIO * specific_heat_volume,
            },
            EquationOfState::IdealGas,
            TransportModel::Inviscid,
        )
    }

    pub fn compressible_ns(specific_heat_volume: f64, transport: TransportModel) -> Self {
        Self::new(
            EquationModel::CompressibleNs,
            ThermodynamicModel {
                specific_heat_volume,
                specific_heat_pressure: SPECIFIC_HEAT_RATIO * specific_heat_volume,
            },
            EquationOfState::IdealGas,
            transport,
        )
    }

    pub fn weakly_compressible_euler(
        reference_sound_speed: f64,
        reference_density: f64,
        specific_heat_volume: f64,
    ) -> Self {
        Self::new(
            EquationModel::WeaklyCompressibleEuler,
            ThermodynamicModel {
                specific_heat_volume,
                specific_heat_pressure: SPECIFIC_HEAT_RATIO * specific_heat_volume,
            },
            EquationOfState::weakly_compressible(reference_sound_speed, reference_density),
            TransportModel::Inviscid,
        )
    }

    pub fn weakly_compressible_ns(
        reference_sound_speed: f64,
        reference_density: f64,
        specific_heat_volume: f64,
        transport: TransportModel,
    ) -> Self {
        Self::new(
            EquationModel::WeaklyCompressibleNs,
            ThermodynamicModel {
                specific_heat_volume,
                specific_heat_pressure: SPECIFIC_HEAT_RATIO * specific_heat_volume,
            },
            EquationOfState::weakly_compressible(reference_sound_speed, reference_density),
            transport,
        )
    }

    pub fn internal_energy_from_temperature(&self, temperature: f64) -> f64 {
        self.thermodynamic.internal_energy_from_temperature(temperature)
    }

    pub fn temperature_from_internal_energy(&self, internal_energy: f64) -> f64 {
        self.thermodynamic.temperature_from_internal_energy(internal_energy)
    }

    pub fn pressure_from_density_internal_energy(&self, density: f64, internal_energy: f64) -> f64 {
        self.equation_of_state.pressure(density, internal_energy)
    }

    pub fn sound_speed_from_density_pressure(&self, density: f64, pressure: f64) -> f64 {
        self.equation_of_state.sound_speed(density, pressure)
    }

    /// Entropy measure p / ρ^γ (ideal gas).
    pub fn entropy_from_density_pressure(&self, density: f64, pressure: f64) -> f64 {
        pressure / density.powf(SPECIFIC_HEAT_RATIO)
    }

    pub fn dynamic_viscosity(&self, temperature: f64) -> f64 {
        self.transport.dynamic_viscosity(temperature)
    }

    pub fn thermal_conductivity(&self, temperature: f64) -> f64 {
        match self.transport {
            TransportModel::Inviscid => 0.0,
            TransportModel::Constant { .. } => self.thermal_conductivity,
            TransportModel::Sutherland { .. } => {
                // Same Sutherland temperature scaling as the viscosity.
                let t = temperature;
                self.thermal_conductivity * (t * t * t).sqrt() * (1.0 + SUTHERLAND_TEMPERATURE)
                    / (t + SUTHERLAND_TEMPERATURE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ideal_gas_pressure_and_sound_speed() {
        let model = PhysicalModel::compressible_euler(2.5);
        let p = model.pressure_from_density_internal_energy(1.0, 2.5);
        assert!((p - 1.0).abs() < 1e-14);
        let c = model.sound_speed_from_density_pressure(1.0, 1.0);
        assert!((c - SPECIFIC_HEAT_RATIO.sqrt()).abs() < 1e-14);
    }

    #[test]
    fn weakly_compressible_pressure_shift() {
        let model = PhysicalModel::weakly_compressible_euler(10.0, 1.0, 2.5);
        // p₀ = 0.01 ρ₀ c₀² = 1.0
        let p0 = model.pressure_from_density_internal_energy(1.0, 0.0);
        assert!((p0 - 1.0).abs() < 1e-14);
        assert!((model.sound_speed_from_density_pressure(5.0, 3.0) - 10.0).abs() < 1e-14);
    }

    #[test]
    fn temperature_energy_round_trip() {
        let model = PhysicalModel::compressible_euler(2.5);
        let e = model.internal_energy_from_temperature(1.4);
        assert!((model.temperature_from_internal_energy(e) - 1.4).abs() < 1e-14);
    }

    #[test]
    fn sutherland_viscosity_is_reference_at_unit_temperature() {
        let model = PhysicalModel::compressible_ns(
            2.5,
            TransportModel::Sutherland { dynamic_viscosity: 1e-3 },
        );
        assert!((model.dynamic_viscosity(1.0) - 1e-3).abs() < 1e-18);
        // Viscosity grows with temperature.
        assert!(model.dynamic_viscosity(2.0) > model.dynamic_viscosity(1.0));
    }

    #[test]
    fn conductivity_follows_the_prandtl_relation() {
        let model = PhysicalModel::compressible_ns(
            2.5,
            TransportModel::Constant { dynamic_viscosity: 2e-3 },
        );
        let expected = 3.5 * 2e-3 / PRANDTL_NUMBER;
        assert!((model.thermal_conductivity(1.0) - expected).abs() < 1e-15);
    }
}
