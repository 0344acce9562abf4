//! Root-finder configuration.

/// Configuration for scalar root-finding.
///
/// # Example
///
/// ```
/// use curvature_core::math::solvers::RootConfig;
///
/// let config = RootConfig::default();
/// assert!(config.func_tol < 1e-10);
/// assert!(config.max_iterations >= 50);
///
/// let custom = RootConfig::new(1e-12, 1e-8, 100);
/// assert_eq!(custom.max_iterations, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootConfig {
    /// Convergence tolerance on the function value.
    ///
    /// Iteration stops when `|f(x)| < func_tol`.
    pub func_tol: f64,

    /// Convergence tolerance on the step size.
    ///
    /// Iteration stops when `|x_{n+1} - x_n| < conv_tol`.
    pub conv_tol: f64,

    /// Maximum number of iterations before reporting failure.
    pub max_iterations: usize,
}

impl Default for RootConfig {
    /// Default tolerances: `func_tol = 1e-14`, `conv_tol = 1e-9`,
    /// `max_iterations = 50`.
    fn default() -> Self {
        Self {
            func_tol: 1e-14,
            conv_tol: 1e-9,
            max_iterations: 50,
        }
    }
}

impl RootConfig {
    /// Create a configuration with explicit tolerances.
    ///
    /// # Panics
    ///
    /// Panics if either tolerance is non-positive or `max_iterations == 0`.
    pub fn new(func_tol: f64, conv_tol: f64, max_iterations: usize) -> Self {
        assert!(func_tol > 0.0, "func_tol must be positive");
        assert!(conv_tol > 0.0, "conv_tol must be positive");
        assert!(max_iterations > 0, "max_iterations must be > 0");
        Self {
            func_tol,
            conv_tol,
            max_iterations,
        }
    }

    /// Relaxed tolerances for speed over precision.
    pub fn fast() -> Self {
        Self {
            func_tol: 1e-8,
            conv_tol: 1e-6,
            max_iterations: 25,
        }
    }

    /// Tight tolerances with a generous iteration cap.
    pub fn high_precision() -> Self {
        Self {
            func_tol: 1e-15,
            conv_tol: 1e-12,
            max_iterations: 200,
        }
    }
}
