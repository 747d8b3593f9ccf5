//! Explicit SSP Runge–Kutta time integration and the iteration loop.
//!
//! Stage coefficients (a, b, c) combine as `U := a·U_last + b·U + c·δt·R·M⁻¹`
//! with `a + b = 1`; every stage is a convex combination of forward-Euler
//! sub-steps. Checkpoint writes run on a detached writer thread which is
//! joined before the next write is queued.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use nalgebra::DVector;
use tracing::{info, warn};

use dgf_io::checkpoint::{CheckpointData, write_checkpoint};
use dgf_io::summary::RunSummary;
use dgf_mesh::Mesh;

use crate::boundary::BoundaryTime;
use crate::error::{Result, SolverError};
use crate::solver::DgSolver;

/// Explicit time scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeScheme {
    ForwardEuler,
    HeunRk2,
    #[default]
    SspRk3,
}

impl TimeScheme {
    /// Per-stage (a, b, c) coefficients.
    pub fn stages(&self) -> &'static [[f64; 3]] {
        match self {
            TimeScheme::ForwardEuler => &[[1.0, 0.0, 1.0]],
            TimeScheme::HeunRk2 => &[[1.0, 0.0, 1.0], [0.5, 0.5, 0.5]],
            TimeScheme::SspRk3 => &[
                [1.0, 0.0, 1.0],
                [3.0 / 4.0, 1.0 / 4.0, 1.0 / 4.0],
                [1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0],
            ],
        }
    }
}

/// Time-integration configuration.
#[derive(Debug, Clone)]
pub struct TimeConfig {
    pub scheme: TimeScheme,
    pub courant_friedrichs_lewy: f64,
    /// Overrides the CFL-based step when set.
    pub fixed_delta_time: Option<f64>,
    pub iteration_start: usize,
    pub iteration_end: usize,
    pub io_interval: usize,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            scheme: TimeScheme::SspRk3,
            courant_friedrichs_lewy: 0.1,
            fixed_delta_time: None,
            iteration_start: 0,
            iteration_end: 100,
            io_interval: 0,
        }
    }
}

/// Checkpoint / view output destination.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub prefix: String,
}

impl OutputConfig {
    pub fn checkpoint_path(&self, iteration: usize) -> PathBuf {
        self.directory
            .join("raw")
            .join(format!("{}_{iteration}.zst", self.prefix))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.directory
            .join("raw")
            .join(format!("{}_summary.json", self.prefix))
    }

    pub fn view_directory(&self) -> PathBuf {
        self.directory.join("vtu")
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub iterations: usize,
    pub delta_time: f64,
    pub relative_error: DVector<f64>,
}

impl DgSolver {
    /// Advance one full RK step with the given δt.
    pub fn step(&mut self, mesh: &Mesh, scheme: TimeScheme, delta_time: f64) {
        self.copy_coefficient();
        self.calculate_artificial_viscosity(mesh);
        for &stage in scheme.stages() {
            self.calculate_gradient_quadrature(mesh);
            self.calculate_adjacency_gradient_quadrature(mesh);
            self.calculate_gradient_residual(mesh);
            self.calculate_quadrature(mesh);
            self.calculate_adjacency_quadrature(mesh);
            self.calculate_residual(mesh);
            self.update_coefficient(stage, delta_time, mesh);
        }
        self.calculate_relative_error(mesh);
    }

    /// Run the iteration loop to `iteration_end` or the NaN trap.
    pub fn solve(
        &mut self,
        mesh: &Mesh,
        time: &TimeConfig,
        output: Option<&OutputConfig>,
    ) -> Result<SolveReport> {
        let delta_time = match time.fixed_delta_time {
            Some(dt) => dt,
            None => self.calculate_delta_time(mesh, time.courant_friedrichs_lewy),
        };
        info!(delta_time, scheme = ?time.scheme, "time integration configured");
        if let Some(output) = output {
            std::fs::create_dir_all(output.directory.join("raw")).map_err(dgf_io::IoError::from)?;
        }

        let mut writer: Option<JoinHandle<()>> = None;
        let mut physical_time = time.iteration_start as f64 * delta_time;
        let mut iterations = 0;
        for iteration in time.iteration_start + 1..=time.iteration_end {
            if self.config.boundary_time == BoundaryTime::TimeVarying {
                self.refresh_boundary_dummy(mesh, physical_time);
            }
            self.step(mesh, time.scheme, delta_time);
            physical_time += delta_time;
            iterations += 1;
            info!(
                iteration,
                relative_error = ?self.relative_error.as_slice(),
                "step complete"
            );

            if self.relative_error.iter().any(|e| e.is_nan()) {
                // The solver degraded: flush the current state and stop.
                join_writer(&mut writer);
                if let Some(output) = output {
                    flush_checkpoint(&output.checkpoint_path(iteration), self.checkpoint_data(mesh));
                }
                return Err(SolverError::DivergenceDetected { iteration });
            }

            if let Some(output) = output
                && time.io_interval > 0
                && iteration % time.io_interval == 0
            {
                join_writer(&mut writer);
                let data = self.checkpoint_data(mesh);
                let path = output.checkpoint_path(iteration);
                writer = Some(std::thread::spawn(move || {
                    if let Err(error) = write_checkpoint(&path, &data) {
                        warn!(%error, path = %path.display(), "checkpoint write failed");
                    }
                }));
            }
        }
        join_writer(&mut writer);
        if let Some(output) = output {
            let summary = RunSummary {
                iteration: time.iteration_end,
                delta_time,
                relative_error: self.relative_error.iter().copied().collect(),
            };
            summary.save(&output.summary_path())?;
        }
        Ok(SolveReport {
            iterations,
            delta_time,
            relative_error: self.relative_error.clone(),
        })
    }
}

fn join_writer(writer: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = writer.take()
        && handle.join().is_err()
    {
        warn!("checkpoint writer thread panicked");
    }
}

fn flush_checkpoint(path: &Path, data: CheckpointData) {
    if let Err(error) = write_checkpoint(path, &data) {
        warn!(%error, path = %path.display(), "final checkpoint flush failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_coefficients_are_convex_combinations() {
        for scheme in [TimeScheme::ForwardEuler, TimeScheme::HeunRk2, TimeScheme::SspRk3] {
            for stage in scheme.stages() {
                assert!((stage[0] + stage[1] - 1.0).abs() < 1e-15, "{scheme:?}");
                assert!(stage[2] > 0.0);
            }
        }
    }

    #[test]
    fn ssp_rk3_matches_the_shu_osher_tableau() {
        let stages = TimeScheme::SspRk3.stages();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0], [1.0, 0.0, 1.0]);
        assert_eq!(stages[1], [0.75, 0.25, 0.25]);
        assert!((stages[2][0] - 1.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn checkpoint_paths_follow_the_layout() {
        let output = OutputConfig {
            directory: PathBuf::from("/tmp/run"),
            prefix: "case".into(),
        };
        assert_eq!(
            output.checkpoint_path(40),
            PathBuf::from("/tmp/run/raw/case_40.zst")
        );
        assert_eq!(output.view_directory(), PathBuf::from("/tmp/run/vtu"));
    }
}
