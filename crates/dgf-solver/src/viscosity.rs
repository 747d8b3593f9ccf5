//! Shock-capturing artificial viscosity.
//!
//! Per element, the resolution indicator compares the energy carried by the
//! highest-order modal coefficients of the density against the full modal
//! energy, both weighted by |J|w. The resulting per-element viscosity is
//! stored per basic vertex, max-reduced per mesh node across all elements
//! sharing the node, and broadcast back.

use nalgebra::DVector;

use dgf_mesh::{BasisTable, ElementRecord};

/// User configuration of the shock-capturing term.
#[derive(Debug, Clone, Copy)]
pub struct ArtificialViscosityConfig {
    /// Scale factor α on the plateau value α · r_in / p.
    pub factor: f64,
    /// Empirical half-width ε₀ of the sinusoidal ramp.
    pub empirical_tolerance: f64,
}

impl Default for ArtificialViscosityConfig {
    fn default() -> Self {
        Self { factor: 1.0, empirical_tolerance: 1.0 }
    }
}

/// Resolution threshold s₀(p), following the 1/p⁴ spectral decay of a
/// resolved solution with a fixed offset.
pub fn order_tolerance(p: usize) -> f64 {
    -4.0 - 4.25 * (p as f64).log10()
}

/// The per-element viscosity value from the shock indicator.
///
/// `density_coefficient` is the density row of the modal tensor (length
/// N_b); `element` supplies |J|w and the inner radius.
pub fn element_viscosity(
    config: &ArtificialViscosityConfig,
    basis: &BasisTable,
    element: &ElementRecord,
    density_coefficient: &DVector<f64>,
) -> f64 {
    let p = basis.order;
    let n_q = basis.quadrature_count();
    let n_b = basis.basis_count();
    let low_count = basis.shape.basis_count(p - 1);

    let mut all_energy = 0.0;
    let mut high_energy = 0.0;
    for q in 0..n_q {
        let mut all = 0.0;
        let mut high = 0.0;
        for b in 0..n_b {
            let contribution = basis.modal_value[(q, b)] * density_coefficient[b];
            all += contribution;
            if p == 1 || b >= low_count {
                high += contribution;
            }
        }
        let jw = element.jacobian_determinant_weight[q];
        all_energy += all * all * jw;
        high_energy += high * high * jw;
    }
    let shock_scale = (high_energy / all_energy).log10();
    let tolerance = order_tolerance(p);
    let plateau = config.factor * element.inner_radius / p as f64;
    if shock_scale < tolerance - config.empirical_tolerance {
        0.0
    } else if shock_scale > tolerance + config.empirical_tolerance {
        plateau
    } else {
        plateau / 2.0
            * (1.0
                + (std::f64::consts::PI * (shock_scale - tolerance)
                    / (2.0 * config.empirical_tolerance))
                    .sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dgf_mesh::{GridTags, StructuredMesh, ingest};

    #[test]
    fn order_tolerance_decreases_with_order() {
        assert!(order_tolerance(2) < order_tolerance(1));
        assert!(order_tolerance(4) < order_tolerance(2));
    }

    #[test]
    fn smooth_density_gets_no_viscosity() {
        let source = StructuredMesh::line(0.0, 1.0, 3, 3, GridTags::default(), false);
        let mesh = ingest(&source, 3).unwrap();
        let group = &mesh.element_groups[0];
        let basis = &group.basis;
        let element = &group.elements[0];
        // A constant density field: only the leading mode is populated.
        let mut coefficient = DVector::zeros(basis.basis_count());
        coefficient[0] = 1.0;
        let config = ArtificialViscosityConfig { factor: 1.0, empirical_tolerance: 0.5 };
        let epsilon = element_viscosity(&config, basis, element, &coefficient);
        assert_eq!(epsilon, 0.0);
    }

    #[test]
    fn pure_high_mode_saturates_the_plateau() {
        let source = StructuredMesh::line(0.0, 1.0, 3, 3, GridTags::default(), false);
        let mesh = ingest(&source, 3).unwrap();
        let group = &mesh.element_groups[0];
        let basis = &group.basis;
        let element = &group.elements[0];
        let mut coefficient = DVector::zeros(basis.basis_count());
        coefficient[0] = 1.0;
        // All high-order content relative to the smooth decay threshold.
        coefficient[basis.basis_count() - 1] = 1.0;
        let config = ArtificialViscosityConfig { factor: 2.0, empirical_tolerance: 0.5 };
        let epsilon = element_viscosity(&config, basis, element, &coefficient);
        let plateau = 2.0 * element.inner_radius / 3.0;
        assert!((epsilon - plateau).abs() < 1e-12, "epsilon {epsilon} vs {plateau}");
    }
}
