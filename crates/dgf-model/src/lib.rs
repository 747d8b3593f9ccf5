//! Physical sub-models and variable containers for the DG flow solver.

pub mod physics;
pub mod variable;

pub use physics::{
    EquationModel, EquationOfState, PRANDTL_NUMBER, PhysicalModel, SPECIFIC_HEAT_RATIO,
    SUTHERLAND_TEMPERATURE, ThermodynamicModel, TransportModel,
};
pub use variable::{
    ComputationalVariable, ConservedVariable, GradientBatch, PrimitiveVariable, VariableBatch,
    computational_count, conserved_count, primitive_count,
};
