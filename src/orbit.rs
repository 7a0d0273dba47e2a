//! Orbit evolution in physical units
//!
//! [`evolve`] takes physical times (seconds) and a two-body system in SI
//! units, rescales time by the characteristic timescale
//! `t* = sqrt(p³ / (G·M))`, integrates the phase law in dimensionless time
//! and appends the resulting phases to the caller's sequence.

use log::info;
use thiserror::Error;

use crate::integrator::{Integrator, PartialIntegration, SolverKind};
use crate::phase::OrbitParameters;

/// Gravitational constant [m³ kg⁻¹ s⁻²]
pub const G_SI: f64 = 6.67408e-11;

/// Seconds in a day
pub const SECONDS_IN_DAY: f64 = 86_400.0;

/// Seconds in a (365-day) year
pub const SECONDS_IN_YEAR: f64 = 31_536_000.0;

/// Mass and geometry of a two-body system in SI units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalSystem {
    /// Total mass [kg]
    pub mass: f64,
    /// Semi-major axis [m]
    pub semi_major_axis: f64,
    /// Eccentricity, `0 ≤ e < 1`
    pub eccentricity: f64,
}

impl PhysicalSystem {
    /// Create a system description
    pub fn new(mass: f64, semi_major_axis: f64, eccentricity: f64) -> Self {
        Self {
            mass,
            semi_major_axis,
            eccentricity,
        }
    }

    /// Sun-Earth system
    pub fn sun_earth() -> Self {
        Self::new(1.9884e30, 1.49598e11, 0.0167)
    }

    /// Semi-latus rectum `p = a / (1 − e²)` [m]
    pub fn semi_latus_rectum(&self) -> f64 {
        let e = self.eccentricity;
        self.semi_major_axis / (1.0 - e * e)
    }

    /// Characteristic timescale `t* = sqrt(p³ / (G·M))` [s]
    pub fn time_scale(&self) -> f64 {
        let p = self.semi_latus_rectum();
        (p * p * p / (G_SI * self.mass)).sqrt()
    }

    /// Physical times divided by `t_star`
    pub fn rescale(times: &[f64], t_star: f64) -> Vec<f64> {
        times.iter().map(|t| t / t_star).collect()
    }

    fn validate(&self) -> Result<(), OrbitError> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(OrbitError::InvalidInput {
                message: format!("mass must be positive and finite, got {}", self.mass),
            });
        }
        if !(self.semi_major_axis.is_finite() && self.semi_major_axis > 0.0) {
            return Err(OrbitError::InvalidInput {
                message: format!(
                    "semi-major axis must be positive and finite, got {}",
                    self.semi_major_axis
                ),
            });
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(OrbitError::InvalidInput {
                message: format!("eccentricity must lie in [0, 1), got {}", self.eccentricity),
            });
        }
        Ok(())
    }
}

/// Times `[0, 1, …, days]` days, in seconds
pub fn daily_grid(days: usize) -> Vec<f64> {
    (0..=days).map(|i| i as f64 * SECONDS_IN_DAY).collect()
}

/// Errors returned by [`evolve`]
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrbitError {
    /// Requested solver variant does not exist
    #[error("The input solver is not supported: {0}")]
    UnsupportedSolver(String),
    /// Physical parameters or time grid are unusable
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the invalid input
        message: String,
    },
    /// Integration stopped early; the phases before the failure were kept
    #[error(transparent)]
    Integration(#[from] PartialIntegration),
}

impl OrbitError {
    /// Whether some output was produced before the failure
    pub fn is_partial(&self) -> bool {
        matches!(self, OrbitError::Integration(_))
    }
}

fn validate_times(times: &[f64]) -> Result<(), OrbitError> {
    if times.is_empty() {
        return Err(OrbitError::InvalidInput {
            message: "time grid is empty".to_string(),
        });
    }
    if let Some(i) = times.iter().position(|t| !t.is_finite()) {
        return Err(OrbitError::InvalidInput {
            message: format!("times[{}] is not finite", i),
        });
    }
    if let Some(i) = times.windows(2).position(|w| w[1] <= w[0]) {
        return Err(OrbitError::InvalidInput {
            message: format!("times must be strictly ascending (times[{}] >= times[{}])", i, i + 1),
        });
    }
    Ok(())
}

/// Evolve the orbital phase over `times`.
///
/// # Arguments
/// * `phi` - [in/out] Phase sequence. When empty, the initial phase is 0
///   and is pushed as the first entry; otherwise its first entry is used as
///   the initial phase. New phases are appended in time order.
/// * `times` - Physical times [s], strictly ascending; `times[0]` is the
///   reference time of the initial phase
/// * `mass` - Total mass of the system [kg]
/// * `a` - Semi-major axis [m]
/// * `e` - Eccentricity
/// * `omega` - Longitude of pericenter [rad]
/// * `solver` - Integration strategy
///
/// # Returns
/// * `Ok(())` when every time point was reached
/// * `Err(OrbitError::Integration(_))` when integration stopped early; the
///   phases computed before the failure have already been appended
/// * `Err(OrbitError::InvalidInput { .. })` before touching `phi`
#[allow(clippy::too_many_arguments)]
pub fn evolve(
    phi: &mut Vec<f64>,
    times: &[f64],
    mass: f64,
    a: f64,
    e: f64,
    omega: f64,
    solver: SolverKind,
) -> Result<(), OrbitError> {
    evolve_with(phi, times, PhysicalSystem::new(mass, a, e), omega, |params, scaled| {
        Integrator::new(solver, params).advance(scaled)
    })
}

/// Validate, rescale and resolve φ0, then hand the dimensionless grid to
/// `advance` and append what it returns to `phi`.
pub(crate) fn evolve_with<F>(
    phi: &mut Vec<f64>,
    times: &[f64],
    system: PhysicalSystem,
    omega: f64,
    advance: F,
) -> Result<(), OrbitError>
where
    F: FnOnce(OrbitParameters, &[f64]) -> Result<Vec<f64>, PartialIntegration>,
{
    system.validate()?;
    if !omega.is_finite() {
        return Err(OrbitError::InvalidInput {
            message: format!("longitude of pericenter must be finite, got {}", omega),
        });
    }
    if let Some(&phi0) = phi.first().filter(|p| !p.is_finite()) {
        return Err(OrbitError::InvalidInput {
            message: format!("initial phase must be finite, got {}", phi0),
        });
    }
    validate_times(times)?;

    let p = system.semi_latus_rectum();
    info!("p = {} m", p);
    let t_star = system.time_scale();
    info!("t* = {} s", t_star);

    let scaled_times = PhysicalSystem::rescale(times, t_star);

    let phi0 = match phi.first() {
        Some(&phi0) => phi0,
        None => {
            phi.push(0.0);
            0.0
        }
    };

    let params = OrbitParameters::new(system.eccentricity, omega, phi0);
    match advance(params, &scaled_times) {
        Ok(phases) => {
            phi.extend(phases);
            info!("Integration successful!");
            Ok(())
        }
        Err(partial) => {
            phi.extend_from_slice(&partial.phases);
            Err(partial.into())
        }
    }
}
