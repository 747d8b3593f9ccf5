//! Run summary persisted alongside the checkpoints.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// State needed to resume a run from its last checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub iteration: usize,
    pub delta_time: f64,
    pub relative_error: Vec<f64>,
}

impl RunSummary {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_summary.json");
        let summary = RunSummary {
            iteration: 400,
            delta_time: 1e-4,
            relative_error: vec![1e-7, 2e-7, 3e-7],
        };
        summary.save(&path).unwrap();
        assert_eq!(RunSummary::load(&path).unwrap(), summary);
    }
}
