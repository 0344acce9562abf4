//! The curve calibration engine.

use crate::error::SolverError;
use crate::instrument::CalibrationInstrument;
use curvature_core::curves::CurveSet;
use curvature_core::math::linalg;
use curvature_core::types::AdOrder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Iteration scheme used by a [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Full Newton steps on a square system. Fast quadratic convergence,
    /// but requires exactly one instrument per free node and a
    /// non-singular Jacobian.
    Newton,
    /// Damped Gauss-Newton steps on the normal equations. Robust to
    /// ill-conditioning and accepts non-square systems.
    LevenbergMarquardt,
}

/// Configuration for a calibration run.
///
/// The damping knobs only apply to [`Algorithm::LevenbergMarquardt`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Convergence tolerance on the residual 2-norm.
    pub tolerance: f64,
    /// Maximum number of iterations before reporting non-convergence.
    pub max_iterations: usize,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Factor applied to lambda on a rejected step.
    pub lambda_up: f64,
    /// Factor applied to lambda on an accepted step.
    pub lambda_down: f64,
    /// Lower bound on the damping factor.
    pub min_lambda: f64,
    /// Upper bound on the damping factor.
    pub max_lambda: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 100,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-10,
            max_lambda: 1e10,
        }
    }
}

impl SolverConfig {
    /// Create a configuration with explicit tolerance and iteration cap.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Relaxed tolerance for speed over precision.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 50,
            ..Default::default()
        }
    }

    /// Tight tolerance with a generous iteration cap.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-14,
            max_iterations: 500,
            ..Default::default()
        }
    }
}

/// Why a calibration run ended in [`SolverStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The Newton Jacobian was not invertible.
    SingularSystem,
    /// The iteration cap was exhausted before the residual tolerance.
    NonConvergence {
        /// Residual 2-norm at the last iteration.
        residual_norm: f64,
        /// Iterations performed.
        iterations: usize,
    },
}

/// The solver state machine: `Initialized -> Iterating -> {Converged, Failed}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// Constructed but not yet run.
    Initialized,
    /// A calibration run is in progress.
    Iterating,
    /// The residual norm fell below tolerance.
    Converged,
    /// The run ended without convergence; diagnostics attached.
    Failed(FailureReason),
}

impl SolverStatus {
    /// Whether calibration completed successfully.
    pub fn is_converged(&self) -> bool {
        matches!(self, SolverStatus::Converged)
    }

    /// Whether calibration ended in failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, SolverStatus::Failed(_))
    }
}

/// The calibration Jacobian with its row and column labels.
///
/// `matrix[i][j]` is the derivative of instrument `i`'s rate with respect
/// to node variable `j`, read directly off the AD gradients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jacobian {
    /// Row-major derivative matrix.
    pub matrix: Vec<Vec<f64>>,
    /// Instrument label per row.
    pub instrument_labels: Vec<String>,
    /// Column labels: node variable names for a calibration Jacobian,
    /// market instrument labels for cross-solver Jacobians.
    pub variables: Vec<String>,
    /// AD order the curves were evaluated at when the matrix was built.
    pub ad_order: AdOrder,
}

/// Summary of a completed calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    /// Terminal status of the run.
    pub status: SolverStatus,
    /// Iterations performed.
    pub iterations: usize,
    /// Residual 2-norm at termination.
    pub residual_norm: f64,
}

/// Serializable snapshot of a solver's calibrated state.
///
/// Instruments are behind trait objects and are represented by their
/// labels only; curves, targets, status, and the final Jacobian replicate
/// in full fidelity, which is what cross-process risk aggregation needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSnapshot {
    /// Solver identifier.
    pub id: String,
    /// Calibrated curve set, node tags included.
    pub curves: CurveSet,
    /// Target market values, one per instrument.
    pub targets: Vec<f64>,
    /// Instrument labels in calibration order.
    pub instrument_labels: Vec<String>,
    /// Iteration scheme used.
    pub algorithm: Algorithm,
    /// Run configuration.
    pub config: SolverConfig,
    /// Terminal status.
    pub status: SolverStatus,
    /// Iterations performed by the last run.
    pub iterations: usize,
    /// Final calibration Jacobian, if a run evaluated one.
    pub jacobian: Option<Jacobian>,
}

/// Calibrates curve node values so quoted instruments reprice to their
/// targets.
///
/// The solver owns its curves exclusively for the duration of a run. Node
/// variables are tagged at first AD order, so each residual evaluation
/// yields the exact Jacobian as a byproduct; no finite differences are
/// involved anywhere.
///
/// Process failures (singular system, exhausted iterations) surface as a
/// [`SolverStatus::Failed`] on the outcome rather than an `Err`, keeping
/// partial diagnostic state available to the caller.
#[derive(Debug)]
pub struct Solver {
    id: String,
    curves: CurveSet,
    instruments: Vec<Box<dyn CalibrationInstrument>>,
    targets: Vec<f64>,
    algorithm: Algorithm,
    config: SolverConfig,
    status: SolverStatus,
    iterations: usize,
    jacobian: Option<Jacobian>,
}

impl Solver {
    /// Create a solver over `curves` calibrating `instruments` to
    /// `targets`.
    ///
    /// `targets` must hold exactly one value per instrument.
    pub fn new(
        id: impl Into<String>,
        curves: CurveSet,
        instruments: Vec<Box<dyn CalibrationInstrument>>,
        targets: Vec<f64>,
        algorithm: Algorithm,
        config: SolverConfig,
    ) -> Result<Self, SolverError> {
        if targets.len() != instruments.len() {
            return Err(SolverError::DimensionMismatch {
                expected: instruments.len(),
                got: targets.len(),
            });
        }
        Ok(Self {
            id: id.into(),
            curves,
            instruments,
            targets,
            algorithm,
            config,
            status: SolverStatus::Initialized,
            iterations: 0,
            jacobian: None,
        })
    }

    /// The solver identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The curve set in its current state.
    pub fn curves(&self) -> &CurveSet {
        &self.curves
    }

    /// The calibrating instruments.
    pub fn instruments(&self) -> &[Box<dyn CalibrationInstrument>] {
        &self.instruments
    }

    /// The target market values.
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// The current status.
    pub fn status(&self) -> &SolverStatus {
        &self.status
    }

    /// Iterations performed by the last run.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// The Jacobian from the most recent residual evaluation.
    pub fn jacobian(&self) -> Option<&Jacobian> {
        self.jacobian.as_ref()
    }

    /// Instrument labels in calibration order.
    pub fn instrument_labels(&self) -> Vec<String> {
        self.instruments
            .iter()
            .map(|i| i.label().to_string())
            .collect()
    }

    /// Node variable names across all curves, in curve-id then node order.
    pub fn node_variables(&self) -> Vec<String> {
        self.curves
            .iter()
            .flat_map(|c| c.node_variables())
            .collect()
    }

    /// Free node values across all curves, aligned with
    /// [`Solver::node_variables`].
    pub fn free_values(&self) -> Vec<f64> {
        self.curves.iter().flat_map(|c| c.free_values()).collect()
    }

    pub(crate) fn curves_mut(&mut self) -> &mut CurveSet {
        &mut self.curves
    }

    /// Distribute a concatenated node vector back onto the curves.
    fn apply_node_vector(&mut self, values: &[f64]) -> Result<(), SolverError> {
        let mut offset = 0;
        for curve in self.curves.iter_mut() {
            let take = curve.node_count() - 1;
            curve.set_node_vector(&values[offset..offset + take])?;
            offset += take;
        }
        Ok(())
    }

    /// Evaluate all residuals and the Jacobian at the current node values.
    fn residuals_and_jacobian(
        &self,
        vars: &[String],
    ) -> Result<(Vec<f64>, Vec<Vec<f64>>), SolverError> {
        let mut residuals = Vec::with_capacity(self.instruments.len());
        let mut jacobian = Vec::with_capacity(self.instruments.len());
        for (instrument, &target) in self.instruments.iter().zip(&self.targets) {
            let rate = instrument.rate(&self.curves)?;
            residuals.push(target - rate.real());
            jacobian.push(vars.iter().map(|v| rate.gradient(v)).collect());
        }
        Ok((residuals, jacobian))
    }

    fn residual_norm(&self) -> Result<f64, SolverError> {
        let mut sum = 0.0;
        for (instrument, &target) in self.instruments.iter().zip(&self.targets) {
            let r = target - instrument.rate(&self.curves)?.real();
            sum += r * r;
        }
        Ok(sum.sqrt())
    }

    fn outcome(&self, residual_norm: f64) -> SolverOutcome {
        SolverOutcome {
            status: self.status.clone(),
            iterations: self.iterations,
            residual_norm,
        }
    }

    /// Run the calibration to convergence or failure.
    ///
    /// Returns `Err` only for contract violations and pricing failures; a
    /// run that merely fails to converge returns `Ok` with a
    /// [`SolverStatus::Failed`] outcome.
    pub fn solve(&mut self) -> Result<SolverOutcome, SolverError> {
        let vars = self.node_variables();
        if self.algorithm == Algorithm::Newton && self.instruments.len() != vars.len() {
            return Err(SolverError::DimensionMismatch {
                expected: vars.len(),
                got: self.instruments.len(),
            });
        }

        for curve in self.curves.iter_mut() {
            curve.set_ad_order(AdOrder::One);
        }
        self.status = SolverStatus::Iterating;
        let mut lambda = self.config.initial_lambda;
        let mut last_norm = f64::INFINITY;

        for iteration in 0..self.config.max_iterations {
            let (residuals, jac) = self.residuals_and_jacobian(&vars)?;
            let norm = residuals.iter().map(|r| r * r).sum::<f64>().sqrt();
            last_norm = norm;
            debug!(
                solver = %self.id,
                iteration,
                residual_norm = norm,
                lambda,
                "calibration step"
            );
            self.jacobian = Some(Jacobian {
                matrix: jac.clone(),
                instrument_labels: self.instrument_labels(),
                variables: vars.clone(),
                ad_order: AdOrder::One,
            });

            if norm < self.config.tolerance {
                self.status = SolverStatus::Converged;
                self.iterations = iteration;
                info!(
                    solver = %self.id,
                    iterations = iteration,
                    residual_norm = norm,
                    "calibration converged"
                );
                return Ok(self.outcome(norm));
            }

            match self.algorithm {
                Algorithm::Newton => {
                    let step = match linalg::solve(&jac, &residuals) {
                        Some(step) => step,
                        None => {
                            self.status = SolverStatus::Failed(FailureReason::SingularSystem);
                            self.iterations = iteration;
                            warn!(solver = %self.id, iteration, "newton jacobian is singular");
                            return Ok(self.outcome(norm));
                        }
                    };
                    let trial: Vec<f64> = self
                        .free_values()
                        .iter()
                        .zip(&step)
                        .map(|(v, d)| v + d)
                        .collect();
                    self.apply_node_vector(&trial)?;
                }
                Algorithm::LevenbergMarquardt => {
                    let jt = linalg::transpose(&jac);
                    let mut jtj = linalg::matmul(&jt, &jac);
                    for (i, row) in jtj.iter_mut().enumerate() {
                        row[i] += lambda;
                    }
                    let jtr = linalg::matvec(&jt, &residuals);

                    match linalg::solve_cholesky(&jtj, &jtr) {
                        Some(step) => {
                            let current = self.free_values();
                            let trial: Vec<f64> =
                                current.iter().zip(&step).map(|(v, d)| v + d).collect();
                            self.apply_node_vector(&trial)?;
                            let trial_norm = self.residual_norm()?;
                            if trial_norm < norm {
                                lambda =
                                    (lambda * self.config.lambda_down).max(self.config.min_lambda);
                            } else {
                                // Reject: restore nodes, damp harder
                                self.apply_node_vector(&current)?;
                                lambda =
                                    (lambda * self.config.lambda_up).min(self.config.max_lambda);
                            }
                        }
                        None => {
                            lambda = (lambda * self.config.lambda_up).min(self.config.max_lambda);
                        }
                    }
                }
            }
        }

        self.status = SolverStatus::Failed(FailureReason::NonConvergence {
            residual_norm: last_norm,
            iterations: self.config.max_iterations,
        });
        self.iterations = self.config.max_iterations;
        warn!(
            solver = %self.id,
            residual_norm = last_norm,
            "calibration failed to converge"
        );
        Ok(self.outcome(last_norm))
    }

    /// Capture a serializable snapshot of the calibrated state.
    pub fn snapshot(&self) -> SolverSnapshot {
        SolverSnapshot {
            id: self.id.clone(),
            curves: self.curves.clone(),
            targets: self.targets.clone(),
            instrument_labels: self.instrument_labels(),
            algorithm: self.algorithm,
            config: self.config,
            status: self.status.clone(),
            iterations: self.iterations,
            jacobian: self.jacobian.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::DiscountFactorQuote;
    use approx::assert_relative_eq;
    use curvature_core::curves::{Curve, Interpolation};
    use curvature_core::types::Date;

    fn d(y: i32, m: u32) -> Date {
        Date::from_ymd_opt(y, m, 1).unwrap()
    }

    fn single_node_solver(algorithm: Algorithm) -> Solver {
        let curve = Curve::new(
            "usd",
            vec![(d(2026, 1), 1.0), (d(2027, 1), 0.99)],
            Interpolation::LogLinear,
        )
        .unwrap();
        let mut curves = CurveSet::new();
        curves.insert(curve);
        Solver::new(
            "test",
            curves,
            vec![Box::new(DiscountFactorQuote::new("df_1y", "usd", d(2027, 1)))],
            vec![0.97],
            algorithm,
            SolverConfig::default(),
        )
        .unwrap()
    }

    // ========================================
    // Configuration Tests
    // ========================================

    #[test]
    fn test_config_default() {
        let config = SolverConfig::default();
        assert!((config.tolerance - 1e-12).abs() < 1e-18);
        assert_eq!(config.max_iterations, 100);
        assert!(config.lambda_up > 1.0);
        assert!(config.lambda_down < 1.0);
    }

    #[test]
    fn test_config_presets() {
        assert!(SolverConfig::fast().tolerance > SolverConfig::default().tolerance);
        assert!(SolverConfig::high_precision().max_iterations > 100);
    }

    // ========================================
    // Construction Tests
    // ========================================

    #[test]
    fn test_target_count_checked() {
        let curves = CurveSet::new();
        let err = Solver::new(
            "bad",
            curves,
            vec![Box::new(DiscountFactorQuote::new("df", "usd", d(2027, 1)))],
            vec![],
            Algorithm::Newton,
            SolverConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, SolverError::DimensionMismatch { expected: 1, got: 0 });
    }

    #[test]
    fn test_newton_requires_square_system() {
        let curve = Curve::new(
            "usd",
            vec![(d(2026, 1), 1.0), (d(2027, 1), 0.99), (d(2028, 1), 0.97)],
            Interpolation::LogLinear,
        )
        .unwrap();
        let mut curves = CurveSet::new();
        curves.insert(curve);
        let mut solver = Solver::new(
            "underdetermined",
            curves,
            vec![Box::new(DiscountFactorQuote::new("df_1y", "usd", d(2027, 1)))],
            vec![0.97],
            Algorithm::Newton,
            SolverConfig::default(),
        )
        .unwrap();
        let err = solver.solve().unwrap_err();
        assert_eq!(err, SolverError::DimensionMismatch { expected: 2, got: 1 });
    }

    // ========================================
    // State Machine Tests
    // ========================================

    #[test]
    fn test_starts_initialized() {
        let solver = single_node_solver(Algorithm::Newton);
        assert_eq!(*solver.status(), SolverStatus::Initialized);
        assert!(solver.jacobian().is_none());
    }

    #[test]
    fn test_newton_converges_single_node() {
        let mut solver = single_node_solver(Algorithm::Newton);
        let outcome = solver.solve().unwrap();
        assert!(outcome.status.is_converged());
        assert_relative_eq!(solver.free_values()[0], 0.97, epsilon = 1e-10);
    }

    #[test]
    fn test_lm_converges_single_node() {
        let mut solver = single_node_solver(Algorithm::LevenbergMarquardt);
        let outcome = solver.solve().unwrap();
        assert!(outcome.status.is_converged());
        assert_relative_eq!(solver.free_values()[0], 0.97, epsilon = 1e-8);
    }

    #[test]
    fn test_jacobian_labels_align() {
        let mut solver = single_node_solver(Algorithm::Newton);
        solver.solve().unwrap();
        let jac = solver.jacobian().unwrap();
        assert_eq!(jac.instrument_labels, vec!["df_1y"]);
        assert_eq!(jac.variables, vec!["usd1"]);
        assert_eq!(jac.ad_order, AdOrder::One);
        // df quote on the node itself: derivative is exactly one
        assert_relative_eq!(jac.matrix[0][0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_snapshot_round_trips() {
        let mut solver = single_node_solver(Algorithm::Newton);
        solver.solve().unwrap();
        let snap = solver.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: SolverSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, SolverStatus::Converged);
        assert_eq!(back.instrument_labels, vec!["df_1y"]);
        assert_eq!(back.jacobian, snap.jacobian);
        assert_eq!(back.jacobian.unwrap().ad_order, AdOrder::One);
    }
}
