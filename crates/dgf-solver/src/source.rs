//! Source terms.

use nalgebra::DVector;

use dgf_model::{PhysicalModel, VariableBatch};

/// Optional source term added to the conservation law.
#[derive(Debug, Clone, Copy, Default)]
pub enum SourceTerm {
    #[default]
    None,
    /// Boussinesq buoyancy on the last momentum row:
    /// ρ β (T − T_ref) g with unit gravity.
    Boussinesq {
        thermal_expansion: f64,
        reference_temperature: f64,
    },
}

pub const GRAVITY: f64 = 1.0;

impl SourceTerm {
    pub fn is_active(&self) -> bool {
        !matches!(self, SourceTerm::None)
    }

    /// Evaluate the source vector (length N_c) at one quadrature point.
    pub fn evaluate(
        &self,
        model: &PhysicalModel,
        variable: &VariableBatch,
        column: usize,
    ) -> DVector<f64> {
        let d = variable.dimension;
        let mut source = DVector::zeros(d + 2);
        match self {
            SourceTerm::None => {}
            SourceTerm::Boussinesq { thermal_expansion, reference_temperature } => {
                let temperature =
                    model.temperature_from_internal_energy(variable.internal_energy(column));
                source[d] = variable.density(column)
                    * thermal_expansion
                    * (temperature - reference_temperature)
                    * GRAVITY;
            }
        }
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buoyancy_acts_on_the_last_momentum_row() {
        let model = PhysicalModel::weakly_compressible_euler(10.0, 1.0, 2.5);
        let mut batch = VariableBatch::zeros(2, 1);
        batch.set_primitive_column(&model, &DVector::from_row_slice(&[1.0, 0.0, 0.0, 0.7]), 0);
        let source = SourceTerm::Boussinesq {
            thermal_expansion: 2.0,
            reference_temperature: 0.5,
        };
        let s = source.evaluate(&model, &batch, 0);
        assert!(s[0].abs() < 1e-15);
        assert!(s[1].abs() < 1e-15);
        assert!((s[2] - 1.0 * 2.0 * 0.2).abs() < 1e-13);
        assert!(s[3].abs() < 1e-15);
    }

    #[test]
    fn inactive_source_is_zero() {
        let model = PhysicalModel::compressible_euler(2.5);
        let batch = VariableBatch::zeros(1, 1);
        assert!(!SourceTerm::None.is_active());
        assert!(SourceTerm::None.evaluate(&model, &batch, 0).norm() == 0.0);
    }
}
