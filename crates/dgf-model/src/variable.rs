//! Per-quadrature-point variable batches and conversions.
//!
//! A batch holds the conserved, computational and primitive views of N
//! states side by side:
//!
//! - conserved `(d+2) × N`: ρ, momentum, ρE (compressible) or ρe (weakly
//!   compressible)
//! - computational `(d+3) × N`: ρ, velocity, internal energy, pressure
//! - primitive `(d+2) × N`: ρ, velocity, temperature
//!
//! Gradient batches carry the conserved and primitive gradients with rows
//! blocked by variable then dimension.

use nalgebra::{DMatrix, DVector};

use crate::physics::PhysicalModel;

/// Semantic row keys of the conserved view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConservedVariable {
    Density,
    Momentum,
    /// ρE for compressible models, ρe for weakly compressible ones.
    DensityEnergy,
}

/// Semantic row keys of the computational view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationalVariable {
    Density,
    Velocity,
    InternalEnergy,
    Pressure,
}

/// Semantic row keys of the primitive view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveVariable {
    Density,
    Velocity,
    Temperature,
}

pub fn conserved_count(dimension: usize) -> usize {
    dimension + 2
}

pub fn computational_count(dimension: usize) -> usize {
    dimension + 3
}

pub fn primitive_count(dimension: usize) -> usize {
    dimension + 2
}

impl ConservedVariable {
    pub fn index(&self, dimension: usize) -> usize {
        match self {
            ConservedVariable::Density => 0,
            ConservedVariable::Momentum => 1,
            ConservedVariable::DensityEnergy => dimension + 1,
        }
    }
}

impl ComputationalVariable {
    pub fn index(&self, dimension: usize) -> usize {
        match self {
            ComputationalVariable::Density => 0,
            ComputationalVariable::Velocity => 1,
            ComputationalVariable::InternalEnergy => dimension + 1,
            ComputationalVariable::Pressure => dimension + 2,
        }
    }
}

impl PrimitiveVariable {
    pub fn index(&self, dimension: usize) -> usize {
        match self {
            PrimitiveVariable::Density => 0,
            PrimitiveVariable::Velocity => 1,
            PrimitiveVariable::Temperature => dimension + 1,
        }
    }
}

/// A batch of N states.
#[derive(Debug, Clone)]
pub struct VariableBatch {
    pub dimension: usize,
    pub conserved: DMatrix<f64>,
    pub computational: DMatrix<f64>,
    pub primitive: DMatrix<f64>,
}

impl VariableBatch {
    pub fn zeros(dimension: usize, n: usize) -> Self {
        Self {
            dimension,
            conserved: DMatrix::zeros(conserved_count(dimension), n),
            computational: DMatrix::zeros(computational_count(dimension), n),
            primitive: DMatrix::zeros(primitive_count(dimension), n),
        }
    }

    pub fn len(&self) -> usize {
        self.conserved.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn density(&self, column: usize) -> f64 {
        self.computational[(0, column)]
    }

    pub fn velocity(&self, column: usize) -> DVector<f64> {
        DVector::from_fn(self.dimension, |i, _| self.computational[(1 + i, column)])
    }

    pub fn velocity_squared_norm(&self, column: usize) -> f64 {
        (0..self.dimension)
            .map(|i| self.computational[(1 + i, column)].powi(2))
            .sum()
    }

    pub fn internal_energy(&self, column: usize) -> f64 {
        self.computational[(self.dimension + 1, column)]
    }

    pub fn pressure(&self, column: usize) -> f64 {
        self.computational[(self.dimension + 2, column)]
    }

    pub fn set_density(&mut self, value: f64, column: usize) {
        self.computational[(0, column)] = value;
    }

    pub fn set_velocity(&mut self, value: &DVector<f64>, column: usize) {
        for i in 0..self.dimension {
            self.computational[(1 + i, column)] = value[i];
        }
    }

    pub fn set_internal_energy(&mut self, value: f64, column: usize) {
        self.computational[(self.dimension + 1, column)] = value;
    }

    pub fn set_pressure(&mut self, value: f64, column: usize) {
        self.computational[(self.dimension + 2, column)] = value;
    }

    /// conserved → computational (total conversion).
    pub fn computational_from_conserved(&mut self, model: &PhysicalModel) {
        let d = self.dimension;
        for column in 0..self.len() {
            let density = self.conserved[(0, column)];
            self.computational[(0, column)] = density;
            for i in 0..d {
                self.computational[(1 + i, column)] = self.conserved[(1 + i, column)] / density;
            }
            let kinetic = if model.equation.is_compressible() {
                self.velocity_squared_norm(column) / 2.0
            } else {
                0.0
            };
            let internal_energy = self.conserved[(d + 1, column)] / density - kinetic;
            self.computational[(d + 1, column)] = internal_energy;
            self.computational[(d + 2, column)] =
                model.pressure_from_density_internal_energy(density, internal_energy);
        }
    }

    /// computational → conserved (inverse of the above).
    pub fn conserved_from_computational(&mut self, model: &PhysicalModel) {
        let d = self.dimension;
        for column in 0..self.len() {
            let density = self.computational[(0, column)];
            self.conserved[(0, column)] = density;
            for i in 0..d {
                self.conserved[(1 + i, column)] = density * self.computational[(1 + i, column)];
            }
            let energy = if model.equation.is_compressible() {
                self.computational[(d + 1, column)] + self.velocity_squared_norm(column) / 2.0
            } else {
                self.computational[(d + 1, column)]
            };
            self.conserved[(d + 1, column)] = density * energy;
        }
    }

    /// primitive → computational (and pressure from the EOS).
    pub fn computational_from_primitive(&mut self, model: &PhysicalModel) {
        let d = self.dimension;
        for column in 0..self.len() {
            let density = self.primitive[(0, column)];
            self.computational[(0, column)] = density;
            for i in 0..d {
                self.computational[(1 + i, column)] = self.primitive[(1 + i, column)];
            }
            let internal_energy =
                model.internal_energy_from_temperature(self.primitive[(d + 1, column)]);
            self.computational[(d + 1, column)] = internal_energy;
            self.computational[(d + 2, column)] =
                model.pressure_from_density_internal_energy(density, internal_energy);
        }
    }

    /// computational → primitive.
    pub fn primitive_from_computational(&mut self, model: &PhysicalModel) {
        let d = self.dimension;
        for column in 0..self.len() {
            self.primitive[(0, column)] = self.computational[(0, column)];
            for i in 0..d {
                self.primitive[(1 + i, column)] = self.computational[(1 + i, column)];
            }
            self.primitive[(d + 1, column)] =
                model.temperature_from_internal_energy(self.computational[(d + 1, column)]);
        }
    }

    /// Sample a user primitive vector into one column and derive the other
    /// views.
    pub fn set_primitive_column(
        &mut self,
        model: &PhysicalModel,
        values: &DVector<f64>,
        column: usize,
    ) {
        for i in 0..primitive_count(self.dimension) {
            self.primitive[(i, column)] = values[i];
        }
        let d = self.dimension;
        let density = values[0];
        self.computational[(0, column)] = density;
        for i in 0..d {
            self.computational[(1 + i, column)] = values[1 + i];
        }
        let internal_energy = model.internal_energy_from_temperature(values[d + 1]);
        self.computational[(d + 1, column)] = internal_energy;
        self.computational[(d + 2, column)] =
            model.pressure_from_density_internal_energy(density, internal_energy);
    }
}

/// Gradients of a batch of N states; rows blocked by variable then dimension.
#[derive(Debug, Clone)]
pub struct GradientBatch {
    pub dimension: usize,
    /// `(d+2)·d × N` conserved gradients.
    pub conserved: DMatrix<f64>,
    /// `(d+2)·d × N` primitive gradients (ρ, velocity, temperature).
    pub primitive: DMatrix<f64>,
}

impl GradientBatch {
    pub fn zeros(dimension: usize, n: usize) -> Self {
        Self {
            dimension,
            conserved: DMatrix::zeros(conserved_count(dimension) * dimension, n),
            primitive: DMatrix::zeros(primitive_count(dimension) * dimension, n),
        }
    }

    pub fn len(&self) -> usize {
        self.conserved.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Velocity gradient ∂v_i/∂x_j as a `d × d` matrix from the primitive
    /// rows.
    pub fn velocity_gradient(&self, column: usize) -> DMatrix<f64> {
        let d = self.dimension;
        DMatrix::from_fn(d, d, |i, j| self.primitive[((1 + i) * d + j, column)])
    }

    pub fn temperature_gradient(&self, column: usize) -> DVector<f64> {
        let d = self.dimension;
        DVector::from_fn(d, |j, _| self.primitive[((d + 1) * d + j, column)])
    }

    pub fn set_temperature_gradient(&mut self, value: &DVector<f64>, column: usize) {
        let d = self.dimension;
        for j in 0..d {
            self.primitive[((d + 1) * d + j, column)] = value[j];
        }
    }

    /// Chain rule: primitive gradients from conserved gradients, given the
    /// converted states of the batch.
    pub fn primitive_from_conserved(&mut self, model: &PhysicalModel, variable: &VariableBatch) {
        let d = self.dimension;
        let cv = model.thermodynamic.specific_heat_volume;
        for column in 0..self.len() {
            let density = variable.density(column);
            let velocity = variable.velocity(column);
            for j in 0..d {
                let density_gradient = self.conserved[(j, column)];
                self.primitive[(j, column)] = density_gradient;
                // ∇v_i = (∇(ρ v_i) − v_i ∇ρ) / ρ
                let mut kinetic_gradient = 0.0;
                for i in 0..d {
                    let velocity_gradient = (self.conserved[((1 + i) * d + j, column)]
                        - velocity[i] * density_gradient)
                        / density;
                    self.primitive[((1 + i) * d + j, column)] = velocity_gradient;
                    kinetic_gradient += velocity[i] * velocity_gradient;
                }
                // ∇e from the energy row, minus the kinetic part for the
                // compressible (total energy) form.
                let specific_energy = if model.equation.is_compressible() {
                    variable.internal_energy(column) + variable.velocity_squared_norm(column) / 2.0
                } else {
                    variable.internal_energy(column)
                };
                let mut energy_gradient = (self.conserved[((d + 1) * d + j, column)]
                    - specific_energy * density_gradient)
                    / density;
                if model.equation.is_compressible() {
                    energy_gradient -= kinetic_gradient;
                }
                self.primitive[((d + 1) * d + j, column)] = energy_gradient / cv;
            }
        }
    }
}
