//! Risk queries on a converged solver.
//!
//! All sensitivities here are reported against the calibrating
//! instruments' *market rates*, not the curve nodes: the node-space
//! gradient from the AD machinery is chained through the inverse of the
//! calibration Jacobian. Nothing is bumped and nothing is re-solved.

use crate::error::SolverError;
use crate::instrument::CalibrationInstrument;
use crate::solver::{Jacobian, Solver};
use curvature_core::math::linalg;
use curvature_core::types::AdOrder;
use serde::{Deserialize, Serialize};

/// A symmetric second-order sensitivity matrix over market rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gamma {
    /// Instrument label per row and column.
    pub labels: Vec<String>,
    /// Row-major matrix of second derivatives.
    pub matrix: Vec<Vec<f64>>,
}

impl Gamma {
    /// Look up an entry by instrument labels.
    pub fn value(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        Some(self.matrix[i][j])
    }
}

impl Solver {
    fn require_converged(&self) -> Result<(), SolverError> {
        if self.status().is_converged() {
            Ok(())
        } else {
            Err(SolverError::NotConverged)
        }
    }

    /// The inverse calibration Jacobian: entry `[j][a]` is the movement of
    /// node `j` per unit move of calibrating instrument `a`'s market rate.
    fn node_to_market(&self) -> Result<Vec<Vec<f64>>, SolverError> {
        let jacobian = self.jacobian().ok_or(SolverError::NotConverged)?;
        linalg::invert(&jacobian.matrix).ok_or(SolverError::SingularSystem)
    }

    /// First-order sensitivity of `instrument` to each calibrating
    /// instrument's market rate.
    ///
    /// Computed as the AD node-space gradient chained through the inverse
    /// Jacobian. Returns `(label, sensitivity)` pairs in calibration
    /// order.
    pub fn delta(
        &self,
        instrument: &dyn CalibrationInstrument,
    ) -> Result<Vec<(String, f64)>, SolverError> {
        self.require_converged()?;
        let vars = self.node_variables();
        let inv = self.node_to_market()?;

        let rate = instrument.rate(self.curves())?;
        let grad: Vec<f64> = vars.iter().map(|v| rate.gradient(v)).collect();

        let labels = self.instrument_labels();
        let deltas = labels
            .into_iter()
            .enumerate()
            .map(|(a, label)| {
                let value = grad.iter().zip(&inv).map(|(g, row)| g * row[a]).sum();
                (label, value)
            })
            .collect();
        Ok(deltas)
    }

    /// Second-order sensitivity of `instrument` to the calibrating
    /// instruments' market rates.
    ///
    /// Re-evaluates the calibrating instruments and `instrument` at second
    /// AD order, combining the explicit pricing hessian with the implicit
    /// curvature of the calibrated nodes (from the second-order implicit
    /// function theorem on the residual equations). Curves are restored to
    /// first order before returning.
    pub fn gamma(
        &mut self,
        instrument: &dyn CalibrationInstrument,
    ) -> Result<Gamma, SolverError> {
        self.require_converged()?;
        let vars = self.node_variables();
        let n = vars.len();
        let m = self.instruments().len();

        for curve in self.curves_mut().iter_mut() {
            curve.set_ad_order(AdOrder::Two);
        }
        let result = self.gamma_inner(&vars, n, m, instrument);
        for curve in self.curves_mut().iter_mut() {
            curve.set_ad_order(AdOrder::One);
        }
        result
    }

    fn gamma_inner(
        &self,
        vars: &[String],
        n: usize,
        m: usize,
        instrument: &dyn CalibrationInstrument,
    ) -> Result<Gamma, SolverError> {
        // Calibrating instruments at second order: gradients rebuild the
        // Jacobian, hessians feed the implicit curvature.
        let mut jac = vec![vec![0.0; n]; m];
        let mut res_hessians = Vec::with_capacity(m);
        for (i, cal) in self.instruments().iter().enumerate() {
            let rate = cal.rate(self.curves())?;
            for (j, var) in vars.iter().enumerate() {
                jac[i][j] = rate.gradient(var);
            }
            let mut h = vec![vec![0.0; n]; n];
            for (j, u) in vars.iter().enumerate() {
                for (k, v) in vars.iter().enumerate() {
                    h[j][k] = rate.hessian(u, v);
                }
            }
            res_hessians.push(h);
        }
        let inv = linalg::invert(&jac).ok_or(SolverError::SingularSystem)?;

        let rate = instrument.rate(self.curves())?;
        let grad: Vec<f64> = vars.iter().map(|v| rate.gradient(v)).collect();
        let mut hess = vec![vec![0.0; n]; n];
        for (j, u) in vars.iter().enumerate() {
            for (k, v) in vars.iter().enumerate() {
                hess[j][k] = rate.hessian(u, v);
            }
        }

        // v_s^T H v_s for each calibrating instrument's pricing hessian
        let projected: Vec<Vec<Vec<f64>>> = res_hessians
            .iter()
            .map(|h| {
                let hv = linalg::matmul(h, &inv);
                linalg::matmul(&linalg::transpose(&inv), &hv)
            })
            .collect();

        // Implicit node curvature: v_ss[j] = -sum_i inv[j][i] * projected[i]
        // Portfolio gamma adds the explicit term v_s^T H_P v_s.
        let explicit = {
            let hv = linalg::matmul(&hess, &inv);
            linalg::matmul(&linalg::transpose(&inv), &hv)
        };

        let mut matrix = vec![vec![0.0; m]; m];
        for a in 0..m {
            for b in 0..m {
                let mut value = explicit[a][b];
                for j in 0..n {
                    let mut v_ss = 0.0;
                    for (i, p) in projected.iter().enumerate() {
                        v_ss -= inv[j][i] * p[a][b];
                    }
                    value += grad[j] * v_ss;
                }
                matrix[a][b] = value;
            }
        }

        Ok(Gamma {
            labels: self.instrument_labels(),
            matrix,
        })
    }

    /// The gradient of `instrument` restricted to exogenous variables.
    ///
    /// `exo_vars` names variables injected through
    /// [`Variable`](curvature_core::types::Variable) values; any name that
    /// shadows a curve node variable is rejected with
    /// [`SolverError::VariableCollision`], since such a gradient entry
    /// would conflate market risk with exogenous risk.
    pub fn exo_delta(
        &self,
        instrument: &dyn CalibrationInstrument,
        exo_vars: &[String],
    ) -> Result<Vec<(String, f64)>, SolverError> {
        self.require_converged()?;
        let node_vars = self.node_variables();
        if let Some(name) = exo_vars.iter().find(|v| node_vars.contains(v)) {
            return Err(SolverError::VariableCollision { name: name.clone() });
        }

        let rate = instrument.rate(self.curves())?;
        Ok(exo_vars
            .iter()
            .map(|v| (v.clone(), rate.gradient(v)))
            .collect())
    }

    /// The Jacobian of this solver's instrument rates with respect to
    /// `other`'s calibrating market rates.
    ///
    /// This solver's instruments are priced against `other`'s calibrated
    /// curves, and their node-space gradients are chained through
    /// `other`'s inverse Jacobian. Rows are this solver's instruments;
    /// columns are `other`'s.
    pub fn jacobian_to(&self, other: &Solver) -> Result<Jacobian, SolverError> {
        self.require_converged()?;
        let other_vars = other.node_variables();
        let inv = other.node_to_market()?;

        let mut matrix = Vec::with_capacity(self.instruments().len());
        for instrument in self.instruments() {
            let rate = instrument.rate(other.curves())?;
            let grad: Vec<f64> = other_vars.iter().map(|v| rate.gradient(v)).collect();
            let row = (0..other.instruments().len())
                .map(|b| grad.iter().zip(&inv).map(|(g, r)| g * r[b]).sum())
                .collect();
            matrix.push(row);
        }

        Ok(Jacobian {
            matrix,
            instrument_labels: self.instrument_labels(),
            variables: other.instrument_labels(),
            ad_order: AdOrder::One,
        })
    }

    /// Predicted movements of this solver's instrument rates when
    /// `other`'s calibrating markets shift by `shifts`.
    ///
    /// A first-order scenario build on [`Solver::jacobian_to`]; neither
    /// solver re-runs its iteration. `shifts` holds one entry per
    /// instrument of `other`, in calibration order.
    pub fn market_movements(
        &self,
        other: &Solver,
        shifts: &[f64],
    ) -> Result<Vec<(String, f64)>, SolverError> {
        if shifts.len() != other.instruments().len() {
            return Err(SolverError::DimensionMismatch {
                expected: other.instruments().len(),
                got: shifts.len(),
            });
        }
        let jacobian = self.jacobian_to(other)?;
        let moves = linalg::matvec(&jacobian.matrix, shifts);
        Ok(jacobian
            .instrument_labels
            .into_iter()
            .zip(moves)
            .collect())
    }
}
