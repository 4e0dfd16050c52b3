//! `loadnode fit` / `loadnode two-point`: compute a conversion factor on the
//! host and print the command that installs it on the node.

use std::path::Path;

use loadnode_config::load_reference_csv;
use loadnode_core::two_point_factor;

/// Outcome of a host-side calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorReport {
    pub factor: f32,
    /// Rows used by the fit (2 for two-point).
    pub points: usize,
}

impl FactorReport {
    /// Line to send to the node: `s` followed by the factor, in the shortest
    /// form that parses back to the same `f32`.
    pub fn command(&self) -> String {
        format!("s{}", self.factor)
    }

    pub fn render(&self, json: bool) -> String {
        if json {
            serde_json::json!({
                "factor": self.factor,
                "points": self.points,
                "command": self.command(),
            })
            .to_string()
        } else {
            format!(
                "factor: {}\npoints: {}\nsend:   {}",
                self.factor,
                self.points,
                self.command()
            )
        }
    }
}

pub fn fit(csv: &Path, current_factor: f32, min_factor: f32) -> eyre::Result<FactorReport> {
    let fit = load_reference_csv(csv)?;
    let factor = fit.factor_for(current_factor, min_factor)?;
    tracing::info!(
        slope = fit.slope,
        intercept = fit.intercept,
        inliers = fit.inliers,
        factor,
        "reference fit"
    );
    Ok(FactorReport {
        factor,
        points: fit.inliers,
    })
}

pub fn two_point(
    zero: f32,
    loaded: f32,
    known: f32,
    current_factor: f32,
    min_factor: f32,
) -> eyre::Result<FactorReport> {
    let factor = two_point_factor(zero, loaded, known, current_factor, min_factor)?;
    Ok(FactorReport { factor, points: 2 })
}
