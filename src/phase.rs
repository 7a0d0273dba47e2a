//! Effective one-body phase law
//!
//! In dimensionless time the orbital phase obeys
//!
//! ```text
//! dφ/dτ = (1 + e·cos(φ − ω))²
//! ```
//!
//! which is strictly positive and bounded for `0 ≤ e < 1`. This module
//! holds the law itself, the orbital shape it is evaluated with, and the
//! starting-step estimate the adaptive integrator is seeded with.

/// Absolute error tolerance used for the phase integration
pub const PHASE_EPSABS: f64 = 1e-8;

/// Relative error tolerance used for the phase integration
pub const PHASE_EPSREL: f64 = 1e-8;

/// Orbital shape and starting phase bound to an integrator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitParameters {
    /// Eccentricity, `0 ≤ e < 1`
    pub eccentricity: f64,
    /// Longitude of pericenter ω (radians)
    pub pericenter_longitude: f64,
    /// Phase at the reference time φ0 (radians)
    pub initial_phase: f64,
}

impl OrbitParameters {
    /// Bundle the orbital shape with the starting phase
    pub fn new(eccentricity: f64, pericenter_longitude: f64, initial_phase: f64) -> Self {
        Self {
            eccentricity,
            pericenter_longitude,
            initial_phase,
        }
    }

    /// Phase derivative for this orbit at phase `phi`
    #[inline]
    pub fn phase_rate(&self, phi: f64) -> f64 {
        phase_derivative(phi, self.eccentricity, self.pericenter_longitude)
    }
}

/// Instantaneous rate of change of the phase: `(1 + e·cos(φ − ω))²`
#[inline]
pub fn phase_derivative(phi: f64, eccentricity: f64, pericenter_longitude: f64) -> f64 {
    let out = 1.0 + eccentricity * (phi - pericenter_longitude).cos();
    out * out
}

/// Starting step size for an explicit Runge-Kutta method
///
/// Follows "Starting Step Size" of Hairer, Nørsett & Wanner, *Solving
/// Ordinary Differential Equations I*, Sec. II.4, for a scalar state:
/// a first guess from the size of `y0` relative to its derivative, refined
/// by one explicit Euler step that probes how fast the derivative changes.
///
/// The exponent `1/5` assumes a 4th-order local error estimate.
///
/// # Arguments
/// * `y0` - Initial value
/// * `epsabs` - Absolute error tolerance
/// * `epsrel` - Relative error tolerance
/// * `derivative` - Right-hand side `dy/dt = f(y)`
pub fn initial_step<F>(y0: f64, epsabs: f64, epsrel: f64, derivative: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let scale = epsabs + y0.abs() * epsrel;
    let dy0 = derivative(y0);

    let d0 = (y0 / scale).abs();
    let d1 = (dy0 / scale).abs();

    let mut h0 = 1e-6;
    if !(d0 < 1e-5 || d1 < 1e-5) {
        h0 = 0.01 * (d0 / d1);
    }

    // Explicit Euler probe
    let y1 = y0 + h0 * dy0;
    let dy1 = derivative(y1);
    let d2 = (dy1 - dy0).abs() / scale / h0;
    let maxd = d1.max(d2);

    let h1 = if maxd <= 1e-15 {
        1e-6_f64.max(h0 * 1e-3)
    } else {
        (0.01 / maxd).powf(0.2)
    };

    h0 *= 100.0;
    h0.min(h1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::PI;

    #[test]
    fn test_derivative_at_pericenter() {
        for &e in &[0.0, 0.0167, 0.3, 0.9, 0.999] {
            for &omega in &[0.0, 1.0, -2.5, PI] {
                assert_relative_eq!(
                    phase_derivative(omega, e, omega),
                    (1.0 + e) * (1.0 + e),
                    max_relative = 1e-15
                );
            }
        }
    }

    #[test]
    fn test_derivative_at_apocenter() {
        let e = 0.5;
        assert_relative_eq!(phase_derivative(PI, e, 0.0), 0.25, max_relative = 1e-12);
    }

    #[test]
    fn test_circular_orbit_has_unit_rate() {
        for i in 0..64 {
            let phi = -10.0 + i as f64 * 0.37;
            assert_eq!(phase_derivative(phi, 0.0, 0.7), 1.0);
        }
    }

    #[test]
    fn test_phase_rate_uses_bound_parameters() {
        let params = OrbitParameters::new(0.2, 0.4, 0.0);
        assert_eq!(params.phase_rate(1.3), phase_derivative(1.3, 0.2, 0.4));
    }

    #[test]
    fn test_initial_step_from_zero_phase() {
        // d0 = 0 forces h0 = 1e-6; d1 = 1e8 dominates, h1 = 1e-2
        let h = initial_step(0.0, 1e-8, 1e-8, |_| 1.0);
        assert_relative_eq!(h, 1e-4, max_relative = 1e-12);
    }

    #[test]
    fn test_initial_step_from_unit_phase() {
        // scale = 2e-8, d0 = d1 = 5e7, h0 = 0.01 → 1.0, h1 = (2e-10)^(1/5)
        let h = initial_step(1.0, 1e-8, 1e-8, |_| 1.0);
        assert_relative_eq!(h, 2e-10_f64.powf(0.2), max_relative = 1e-12);
        assert_abs_diff_eq!(h, 0.011487, epsilon = 1e-6);
    }

    #[test]
    fn test_initial_step_for_vanishing_derivative() {
        // maxd = 0 → h1 = max(1e-6, 1e-9), h0 = 1e-4
        let h = initial_step(0.0, 1e-8, 1e-8, |_| 0.0);
        assert_relative_eq!(h, 1e-6, max_relative = 1e-12);
    }

    #[test]
    fn test_initial_step_loose_tolerance() {
        // scale = 1, d0 = 2, d1 = 1 → h0 = 0.02; d2 = 0 → h1 = 0.01^(1/5)
        let h = initial_step(2.0, 0.5, 0.25, |_| 1.0);
        assert_relative_eq!(h, 0.01_f64.powf(0.2), max_relative = 1e-12);
    }

    #[test]
    fn test_initial_step_is_deterministic() {
        let params = OrbitParameters::new(0.0167, 0.0, 0.3);
        let a = initial_step(0.3, PHASE_EPSABS, PHASE_EPSREL, |phi| params.phase_rate(phi));
        let b = initial_step(0.3, PHASE_EPSABS, PHASE_EPSREL, |phi| params.phase_rate(phi));
        assert_eq!(a.to_bits(), b.to_bits());
        assert!(a > 0.0 && a.is_finite());
    }
}
