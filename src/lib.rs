//! # OrbitSolver: Effective One-Body Phase Evolution
//!
//! Evolves the orbital phase of a two-body system under the simplified
//! effective one-body phase law
//!
//! ```text
//! dφ/dτ = (1 + e·cos(φ − ω))²,    τ = t / t*,    t* = sqrt(p³ / (G·M))
//! ```
//!
//! with `p = a / (1 − e²)`, sampled at caller-supplied physical times.
//!
//! ## Features
//!
//! - Embedded Runge-Kutta-Fehlberg 4(5) pair with adaptive step control
//! - Starting step from the Hairer-Nørsett-Wanner heuristic
//! - Fail-fast grid integration with explicit partial results
//! - Two-column text output and TOML run configuration
//!
//! ## Basic Usage
//!
//! ```rust
//! use orbitsolver::{daily_grid, evolve, SolverKind};
//!
//! // Sun-Earth system, one sample per day for a year
//! let times = daily_grid(365);
//! let mut phi = Vec::new();
//! evolve(&mut phi, &times, 1.9884e30, 1.49598e11, 0.0167, 0.0, SolverKind::Rkf45).unwrap();
//!
//! assert_eq!(phi.len(), times.len());
//! assert!((phi[365] - 2.0 * std::f64::consts::PI).abs() < 0.1);
//! ```
//!
//! ## Partial Results
//!
//! When the integrator cannot reach a target time, [`evolve`] keeps every
//! phase computed before it and returns [`OrbitError::Integration`]
//! carrying the failing time and cause:
//!
//! ```rust,ignore
//! match evolve(&mut phi, &times, mass, a, e, omega, SolverKind::Rkf45) {
//!     Ok(()) => {}
//!     Err(OrbitError::Integration(partial)) => {
//!         eprintln!("stopped at t = {} after {} points", partial.t, partial.phases.len());
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```
//!
//! ## References
//!
//! 1. Fehlberg, E. (1969). "Low-Order Classical Runge-Kutta Formulas with
//!    Stepsize Control and their Application to some Heat Transfer
//!    Problems". NASA TR R-315.
//!
//! 2. Hairer, E., Nørsett, S.P., & Wanner, G. (1993). "Solving
//!    Ordinary Differential Equations I: Nonstiff Problems".
//!    Springer.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod coefficients;
pub mod config;
pub mod integrator;
pub mod io;
pub mod orbit;
pub mod phase;
pub mod solver;

pub use config::{ConfigError, GridConfig, RunConfig, SystemConfig};
pub use integrator::{Integrator, PartialIntegration, PhaseIntegrator, SolverKind, StepPrimitive};
pub use io::{savetxt, write_table, OutputError};
pub use orbit::{
    daily_grid, evolve, OrbitError, PhysicalSystem, G_SI, SECONDS_IN_DAY, SECONDS_IN_YEAR,
};
pub use phase::{initial_step, phase_derivative, OrbitParameters};
pub use solver::{
    Driver, IntegrationError, OdeSystem, Rkf45, Stats, StepController, StepResult, Tolerances,
};
