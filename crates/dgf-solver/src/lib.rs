//! DG spatial operator, boundary operator and explicit time integration.
//!
//! The solver advances modal coefficients of the compressible or weakly
//! compressible Euler / Navier–Stokes equations on an ingested mesh:
//! per stage it evaluates the volume and interface flux quadratures (with
//! the BR1/BR2 auxiliary gradient and optional shock-capturing artificial
//! viscosity), assembles residuals against the modal basis, inverts the
//! local mass matrices and combines the SSP-RK stages.

pub mod boundary;
pub mod error;
pub mod flux;
pub mod solver;
pub mod source;
pub mod spatial;
pub mod state;
pub mod time;
pub mod view;
pub mod viscosity;

pub use boundary::{BoundaryKind, BoundaryTime};
pub use error::{Result, SolverError};
pub use flux::{ConvectiveFluxScheme, ViscousFluxScheme};
pub use solver::{BoundaryConditionFn, DgSolver, InitialConditionFn, SolverConfig};
pub use source::SourceTerm;
pub use time::{OutputConfig, SolveReport, TimeConfig, TimeScheme};
pub use view::ViewVariable;
pub use viscosity::ArtificialViscosityConfig;
