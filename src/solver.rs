//! Runge-Kutta-Fehlberg 4(5) Integrator
//!
//! A 6-stage embedded RK4(5) pair with adaptive step-size control. The
//! 5th-order solution is propagated (local extrapolation) and the
//! difference to the embedded 4th-order solution drives the controller.
//!
//! [`Rkf45`] performs single steps and whole integrations; [`Driver`]
//! wraps it with a step size that persists between consecutive calls, so
//! a caller can walk an output grid one target time at a time.
//!
//! Reference: NASA TR R-315, Erwin Fehlberg, 1969

use thiserror::Error;

use crate::coefficients::{A, B, B_ERR, C, STAGES};

/// System of ordinary differential equations: dy/dt = f(t, y)
pub trait OdeSystem<const N: usize> {
    /// Evaluate the right-hand side of the ODE system
    ///
    /// # Arguments
    /// * `t` - Current time
    /// * `y` - Current state vector
    /// * `dydt` - Output: derivative dy/dt
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]);
}

/// Closures with the right-hand-side signature are ODE systems.
///
/// This lets callers capture their parameters directly instead of
/// declaring a dedicated struct.
impl<F, const N: usize> OdeSystem<N> for F
where
    F: Fn(f64, &[f64; N], &mut [f64; N]),
{
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]) {
        self(t, y, dydt)
    }
}

/// Integration result from a single step
#[derive(Debug, Clone)]
pub struct StepResult<const N: usize> {
    /// New state after the step (5th order solution)
    pub y: [f64; N],
    /// New time value
    pub t: f64,
    /// Normalized error estimate (should be ≤ 1.0 for acceptance)
    pub error: f64,
    /// Suggested step size for next step
    pub h_next: f64,
    /// Whether the step was accepted
    pub accepted: bool,
}

/// Integration statistics for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Total number of function evaluations
    pub fn_evals: u64,
    /// Number of accepted steps
    pub accepted_steps: u64,
    /// Number of rejected steps
    pub rejected_steps: u64,
}

/// Step-size controller using an I-controller
///
/// h_new = safety * h * error^(-1/(p+1))
/// where p = 4 is the order of the embedded error estimate
#[derive(Debug, Clone)]
pub struct StepController {
    /// Safety factor (0.8-0.9 typical)
    pub safety: f64,
    /// Maximum growth factor per step
    pub max_factor: f64,
    /// Minimum reduction factor per step
    pub min_factor: f64,
    exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 1.0 / 5.0,
        }
    }
}

impl StepController {
    /// Compute the step size adjustment factor
    pub fn compute_factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }

        let factor = self.safety * error.powf(-self.exponent);
        factor.clamp(self.min_factor, self.max_factor)
    }
}

/// Tolerance specification for error control
///
/// Error is computed as: |y5 - y4| / (atol + rtol * |y5|)
#[derive(Debug, Clone)]
pub struct Tolerances<const N: usize> {
    /// Absolute tolerance per component
    pub atol: [f64; N],
    /// Relative tolerance per component
    pub rtol: [f64; N],
}

impl<const N: usize> Tolerances<N> {
    /// Create tolerances with uniform values
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self {
            atol: [atol; N],
            rtol: [rtol; N],
        }
    }
}

/// Runge-Kutta-Fehlberg 4(5) integrator
///
/// # Type Parameters
/// * `N` - Dimension of the state vector
///
/// # Example
/// ```
/// use orbitsolver::{Rkf45, Tolerances};
///
/// let decay = |_t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = -y[0];
/// let mut solver = Rkf45::new(Tolerances::new(1e-10, 1e-10));
///
/// let (tf, yf) = solver.integrate(&decay, 0.0, &[1.0], 1.0, 0.1).unwrap();
/// assert!((tf - 1.0).abs() < 1e-12);
/// assert!((yf[0] - (-1.0_f64).exp()).abs() < 1e-8);
/// ```
#[derive(Debug, Clone)]
pub struct Rkf45<const N: usize> {
    tol: Tolerances<N>,
    controller: StepController,
    /// Minimum step size
    pub h_min: f64,
    /// Maximum step size
    pub h_max: f64,
    /// Maximum number of integration steps per call before error
    pub max_steps: u64,
    /// Stage evaluations (pre-allocated workspace)
    k: [[f64; N]; STAGES],
    /// Integration statistics
    pub stats: Stats,
}

impl<const N: usize> Rkf45<N> {
    /// Create a new RKF45 solver with specified tolerances
    pub fn new(tol: Tolerances<N>) -> Self {
        Self {
            tol,
            controller: StepController::default(),
            h_min: 1e-14,
            h_max: f64::INFINITY,
            max_steps: 10_000_000,
            k: [[0.0; N]; STAGES],
            stats: Stats::default(),
        }
    }

    /// Set minimum and maximum step sizes
    pub fn set_step_limits(&mut self, h_min: f64, h_max: f64) {
        self.h_min = h_min;
        self.h_max = h_max;
    }

    /// Perform a single integration step
    ///
    /// This computes the 6 stages, forms the 5th and 4th order solutions,
    /// estimates the error, and determines if the step should be accepted.
    pub fn step<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t: f64,
        y: &[f64; N],
        h: f64,
    ) -> StepResult<N> {
        let h = h.signum() * h.abs().clamp(self.h_min, self.h_max);

        self.compute_stages(sys, t, y, h);
        let y5 = self.compute_solution(y, h);
        let error = self.compute_error(&y5, h);
        let accepted = error <= 1.0;

        // Always a positive magnitude
        let factor = self.controller.compute_factor(error);
        let h_next = (h.abs() * factor).clamp(self.h_min, self.h_max);

        self.stats.fn_evals += STAGES as u64;
        if accepted {
            self.stats.accepted_steps += 1;
        } else {
            self.stats.rejected_steps += 1;
        }

        StepResult {
            y: y5,
            t: t + h,
            error,
            h_next,
            accepted,
        }
    }

    /// Integrate from t0 to tf
    ///
    /// # Arguments
    /// * `sys` - The ODE system to integrate
    /// * `t0` - Initial time
    /// * `y0` - Initial state
    /// * `tf` - Final time
    /// * `h0` - Initial step size guess (sign must match `tf - t0`)
    ///
    /// # Returns
    /// * `Ok((t_final, y_final))` on success
    /// * `Err(IntegrationError)` on failure
    pub fn integrate<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
        h0: f64,
    ) -> Result<(f64, [f64; N]), IntegrationError> {
        self.integrate_adaptive(sys, t0, y0, tf, h0)
            .map(|(t, y, _)| (t, y))
    }

    /// Integrate from t0 to tf, also returning the step size the
    /// controller would propose next.
    ///
    /// Steps shortened only to land on `tf` do not shrink the proposal.
    pub(crate) fn integrate_adaptive<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
        h0: f64,
    ) -> Result<(f64, [f64; N], f64), IntegrationError> {
        if t0 == tf {
            return Ok((t0, *y0, h0));
        }
        self.validate_inputs(t0, y0, tf, h0)?;

        let mut t = t0;
        let mut y = *y0;
        let mut h = h0;

        let direction = (tf - t0).signum();
        let mut step_count = 0u64;

        while (tf - t) * direction > self.h_min {
            // Don't overshoot the endpoint
            let clipped = (t + h - tf) * direction > 0.0;
            let h_try = if clipped { tf - t } else { h };

            let result = self.step(sys, t, &y, h_try);

            if result.accepted {
                t = result.t;
                y = result.y;
                if !y.iter().all(|v| v.is_finite()) {
                    return Err(IntegrationError::NonFiniteState { t });
                }
            }

            h = if clipped && result.accepted {
                h.abs().max(result.h_next) * direction
            } else {
                result.h_next * direction
            };

            step_count += 1;
            if step_count > self.max_steps {
                return Err(IntegrationError::MaxStepsExceeded);
            }

            // A rejected step already at h_min cannot make progress
            if !result.accepted && result.h_next <= self.h_min && (tf - t) * direction > self.h_min
            {
                return Err(IntegrationError::StepSizeTooSmall {
                    t,
                    h: result.h_next,
                });
            }
        }

        Ok((t, y, h))
    }

    #[allow(clippy::needless_range_loop)]
    fn compute_stages<S: OdeSystem<N>>(&mut self, sys: &S, t: f64, y: &[f64; N], h: f64) {
        let mut y_temp = [0.0; N];

        sys.rhs(t, y, &mut self.k[0]);

        for i in 1..STAGES {
            // y_temp = y + h * sum_{j=0}^{i-1} a[i][j] * k[j]
            for n in 0..N {
                let mut sum = 0.0;
                for j in 0..i {
                    sum += A[i][j] * self.k[j][n];
                }
                y_temp[n] = y[n] + h * sum;
            }

            sys.rhs(t + C[i] * h, &y_temp, &mut self.k[i]);
        }
    }

    #[allow(clippy::needless_range_loop)]
    fn compute_solution(&self, y: &[f64; N], h: f64) -> [f64; N] {
        let mut y_new = [0.0; N];

        for n in 0..N {
            let mut sum = 0.0;
            for i in 0..STAGES {
                sum += B[i] * self.k[i][n];
            }
            y_new[n] = y[n] + h * sum;
        }

        y_new
    }

    /// Infinity norm of the scaled error:
    /// error = max_i( |h * sum_j (b[j] - b_hat[j]) * k[j][i]| / scale[i] )
    /// where scale[i] = atol[i] + rtol[i] * |y5[i]|
    #[allow(clippy::needless_range_loop)]
    fn compute_error(&self, y5: &[f64; N], h: f64) -> f64 {
        let mut max_err: f64 = 0.0;

        for n in 0..N {
            let mut err_n = 0.0;
            for i in 0..STAGES {
                err_n += B_ERR[i] * self.k[i][n];
            }
            err_n *= h;

            let scale = self.tol.atol[n] + self.tol.rtol[n] * y5[n].abs();
            max_err = max_err.max(err_n.abs() / scale);
        }

        max_err
    }

    fn validate_inputs(
        &self,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
        h0: f64,
    ) -> Result<(), IntegrationError> {
        if !t0.is_finite() || !tf.is_finite() || !h0.is_finite() {
            return Err(IntegrationError::InvalidInput {
                message: "t0, tf, and h0 must be finite".to_string(),
            });
        }
        if h0 == 0.0 {
            return Err(IntegrationError::InvalidInput {
                message: "h0 must be non-zero".to_string(),
            });
        }
        let direction = tf - t0;
        if direction != 0.0 && h0.signum() != direction.signum() {
            return Err(IntegrationError::InvalidInput {
                message: "h0 sign must match integration direction (tf - t0)".to_string(),
            });
        }
        for (i, &val) in y0.iter().enumerate() {
            if !val.is_finite() {
                return Err(IntegrationError::InvalidInput {
                    message: format!("y0[{}] is not finite", i),
                });
            }
        }
        for (i, (&a, &r)) in self.tol.atol.iter().zip(self.tol.rtol.iter()).enumerate() {
            if !a.is_finite() || a <= 0.0 {
                return Err(IntegrationError::InvalidInput {
                    message: format!("atol[{}] must be positive and finite", i),
                });
            }
            if !r.is_finite() || r < 0.0 {
                return Err(IntegrationError::InvalidInput {
                    message: format!("rtol[{}] must be non-negative and finite", i),
                });
            }
        }
        Ok(())
    }
}

/// Adaptive driver that carries the step size across calls
///
/// Each [`Driver::apply`] advances `(t, y)` to a new target time, starting
/// from the step size the controller proposed at the end of the previous
/// call. The first call starts from the step size given to [`Driver::new`].
#[derive(Debug, Clone)]
pub struct Driver<const N: usize> {
    stepper: Rkf45<N>,
    h: f64,
}

impl<const N: usize> Driver<N> {
    /// Create a driver with the given tolerances and initial step magnitude
    pub fn new(tol: Tolerances<N>, h0: f64) -> Self {
        Self {
            stepper: Rkf45::new(tol),
            h: h0.abs(),
        }
    }

    /// Step size magnitude that the next call will start from
    pub fn step_size(&self) -> f64 {
        self.h
    }

    /// Statistics accumulated over all calls
    pub fn stats(&self) -> &Stats {
        &self.stepper.stats
    }

    /// Mutable access to the underlying stepper (step limits, max steps)
    pub fn stepper_mut(&mut self) -> &mut Rkf45<N> {
        &mut self.stepper
    }

    /// Integrate from `*t` to `t1`, updating `t` and `y` in place.
    ///
    /// On error `t` and `y` are left at their values from before the call.
    pub fn apply<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t: &mut f64,
        t1: f64,
        y: &mut [f64; N],
    ) -> Result<(), IntegrationError> {
        let direction = if t1 >= *t { 1.0 } else { -1.0 };
        let (t_new, y_new, h_next) =
            self.stepper
                .integrate_adaptive(sys, *t, y, t1, self.h * direction)?;

        *t = t_new;
        *y = y_new;
        if h_next != 0.0 && h_next.is_finite() {
            self.h = h_next.abs();
        }
        Ok(())
    }
}

/// Errors that can occur during integration
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IntegrationError {
    /// Step size became too small
    #[error("Step size {h} too small at t = {t}")]
    StepSizeTooSmall {
        /// Time at which step size became too small
        t: f64,
        /// Step size that was too small
        h: f64,
    },
    /// Maximum number of steps exceeded
    #[error("Maximum number of integration steps exceeded")]
    MaxStepsExceeded,
    /// Invalid input parameters
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the invalid input
        message: String,
    },
    /// Non-finite state detected during integration
    #[error("Non-finite state detected at t = {t}")]
    NonFiniteState {
        /// Time at which non-finite state was detected
        t: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Harmonic oscillator: y'' + ω²y = 0
    struct HarmonicOscillator {
        omega: f64,
    }

    impl OdeSystem<2> for HarmonicOscillator {
        fn rhs(&self, _t: f64, y: &[f64; 2], dydt: &mut [f64; 2]) {
            dydt[0] = y[1];
            dydt[1] = -self.omega * self.omega * y[0];
        }
    }

    #[test]
    fn test_harmonic_oscillator() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let y0 = [1.0, 0.0];
        let tf = 2.0 * std::f64::consts::PI;

        let mut solver = Rkf45::new(Tolerances::new(1e-12, 1e-12));
        let (t_final, y_final) = solver.integrate(&sys, 0.0, &y0, tf, 0.1).unwrap();

        assert!((t_final - tf).abs() < 1e-10);
        assert!(
            (y_final[0] - 1.0).abs() < 1e-7,
            "y(2π) = {}, expected 1.0",
            y_final[0]
        );
        assert!(y_final[1].abs() < 1e-7, "y'(2π) = {}", y_final[1]);

        println!("Stats: {:?}", solver.stats);
    }

    #[test]
    fn test_exponential_decay() {
        let decay = |_t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = -y[0];
        let tf = 5.0;

        let mut solver = Rkf45::new(Tolerances::new(1e-12, 1e-10));
        let (_, y_final) = solver.integrate(&decay, 0.0, &[1.0], tf, 0.1).unwrap();
        let exact = (-tf).exp();

        let rel_error = (y_final[0] - exact).abs() / exact;
        assert!(rel_error < 1e-7, "Relative error {} too large", rel_error);
    }

    #[test]
    fn test_order_of_convergence() {
        // Single-step refinement on y' = y: local error is O(h^6) for a
        // 5th-order method, so err(h) / err(h/2) approaches 64.
        let growth = |_t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = y[0];

        let step_sizes = [0.8, 0.4, 0.2, 0.1];
        let mut errors = Vec::new();

        for &h in &step_sizes {
            let mut solver = Rkf45::new(Tolerances::new(1.0, 1.0));
            let result = solver.step(&growth, 0.0, &[1.0], h);
            assert!(result.accepted, "Step with h={} should be accepted", h);
            errors.push((result.y[0] - h.exp()).abs());
        }

        let mut checked = 0;
        for i in 0..errors.len() - 1 {
            if errors[i + 1] < 1e-15 {
                continue;
            }
            let ratio = errors[i] / errors[i + 1];
            println!(
                "err({:.3}) / err({:.3}) = {:.1}",
                step_sizes[i],
                step_sizes[i + 1],
                ratio
            );
            assert!(
                ratio > 30.0 && ratio < 100.0,
                "Error ratio {:.1} outside [30, 100]",
                ratio
            );
            checked += 1;
        }
        assert!(checked >= 2, "Need at least 2 valid error ratios");
    }

    #[test]
    fn test_rejected_step_shrinks_proposal() {
        let stiff = |_t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = -50.0 * y[0];
        let mut solver = Rkf45::new(Tolerances::new(1e-12, 1e-12));

        let result = solver.step(&stiff, 0.0, &[1.0], 1.0);
        assert!(!result.accepted);
        assert!(result.h_next < 1.0);
        assert_eq!(solver.stats.rejected_steps, 1);
        assert_eq!(solver.stats.fn_evals, STAGES as u64);
    }

    #[test]
    fn test_controller_factor_is_clamped() {
        let controller = StepController::default();
        assert_eq!(controller.compute_factor(0.0), controller.max_factor);
        assert_eq!(controller.compute_factor(1e-30), controller.max_factor);
        assert_eq!(controller.compute_factor(1e30), controller.min_factor);
        assert_relative_eq!(controller.compute_factor(1.0), controller.safety);
    }

    #[test]
    fn test_backward_integration() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let tf = 2.0 * std::f64::consts::PI;

        let mut solver = Rkf45::new(Tolerances::new(1e-12, 1e-12));
        let (t_final, y_final) = solver.integrate(&sys, tf, &[1.0, 0.0], 0.0, -0.1).unwrap();

        assert!(t_final.abs() < 1e-10, "t_final = {}", t_final);
        assert!((y_final[0] - 1.0).abs() < 1e-7, "y(0) = {}", y_final[0]);
        assert!(y_final[1].abs() < 1e-7, "y'(0) = {}", y_final[1]);
    }

    // ==================== Input Validation ====================

    fn zero_rhs(_t: f64, _y: &[f64; 1], dydt: &mut [f64; 1]) {
        dydt[0] = 0.0;
    }

    #[test]
    fn test_nan_tolerance_rejected() {
        let mut solver = Rkf45::new(Tolerances::new(f64::NAN, 1e-12));
        let result = solver.integrate(&zero_rhs, 0.0, &[1.0], 1.0, 0.1);
        assert!(matches!(result, Err(IntegrationError::InvalidInput { .. })));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let mut solver = Rkf45::new(Tolerances::new(-1e-12, 1e-12));
        let result = solver.integrate(&zero_rhs, 0.0, &[1.0], 1.0, 0.1);
        assert!(matches!(result, Err(IntegrationError::InvalidInput { .. })));
    }

    #[test]
    fn test_h0_wrong_sign_rejected() {
        let mut solver = Rkf45::new(Tolerances::new(1e-12, 1e-12));
        let result = solver.integrate(&zero_rhs, 0.0, &[1.0], 1.0, -0.1);
        assert!(matches!(result, Err(IntegrationError::InvalidInput { .. })));
    }

    #[test]
    fn test_nan_initial_state_rejected() {
        let mut solver = Rkf45::new(Tolerances::new(1e-12, 1e-12));
        let result = solver.integrate(&zero_rhs, 0.0, &[f64::NAN], 1.0, 0.1);
        assert!(matches!(result, Err(IntegrationError::InvalidInput { .. })));
    }

    #[test]
    fn test_zero_length_integration() {
        let mut solver = Rkf45::new(Tolerances::new(1e-12, 1e-12));
        let (t, y) = solver.integrate(&zero_rhs, 5.0, &[42.0], 5.0, 0.1).unwrap();
        assert_eq!(t, 5.0);
        assert_eq!(y[0], 42.0);
        assert_eq!(solver.stats, Stats::default());
    }

    #[test]
    fn test_max_steps_exceeded() {
        let linear = |_t: f64, _y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = 1.0;
        let mut solver = Rkf45::new(Tolerances::new(1e-12, 1e-12));
        solver.set_step_limits(1e-14, 1e-3);
        solver.max_steps = 10;

        let result = solver.integrate(&linear, 0.0, &[0.0], 1.0, 1e-3);
        assert_eq!(result, Err(IntegrationError::MaxStepsExceeded));
    }

    // ==================== Driver ====================

    #[test]
    fn test_driver_grid_matches_single_integration() {
        let decay = |_t: f64, y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = -y[0];
        let tol = Tolerances::new(1e-12, 1e-12);

        let mut driver = Driver::new(tol.clone(), 1e-3);
        let mut t = 0.0;
        let mut y = [1.0];
        for i in 1..=20 {
            driver.apply(&decay, &mut t, i as f64 * 0.25, &mut y).unwrap();
        }

        let mut solver = Rkf45::new(tol);
        let (_, y_once) = solver.integrate(&decay, 0.0, &[1.0], 5.0, 1e-3).unwrap();

        assert_relative_eq!(t, 5.0, epsilon = 1e-12);
        assert_relative_eq!(y[0], y_once[0], max_relative = 1e-8);
        assert_relative_eq!(y[0], (-5.0_f64).exp(), max_relative = 1e-8);
    }

    #[test]
    fn test_driver_carries_step_size() {
        let linear = |_t: f64, _y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = 1.0;
        let mut driver = Driver::new(Tolerances::new(1e-8, 1e-8), 1e-4);
        assert_eq!(driver.step_size(), 1e-4);

        let mut t = 0.0;
        let mut y = [0.0];
        driver.apply(&linear, &mut t, 1.0, &mut y).unwrap();

        assert!(driver.step_size() > 1e-4, "h = {}", driver.step_size());
        assert_relative_eq!(y[0], 1.0, epsilon = 1e-12);
        assert!(driver.stats().accepted_steps > 0);
    }

    #[test]
    fn test_driver_failure_leaves_state_untouched() {
        let linear = |_t: f64, _y: &[f64; 1], dydt: &mut [f64; 1]| dydt[0] = 1.0;
        let mut driver = Driver::new(Tolerances::new(1e-8, 1e-8), 1e-4);
        driver.stepper_mut().max_steps = 1;
        driver.stepper_mut().set_step_limits(1e-14, 1e-4);

        let mut t = 0.0;
        let mut y = [0.0];
        let result = driver.apply(&linear, &mut t, 1.0, &mut y);

        assert_eq!(result, Err(IntegrationError::MaxStepsExceeded));
        assert_eq!(t, 0.0);
        assert_eq!(y[0], 0.0);
    }
}
