//! Phase integrators
//!
//! A [`PhaseIntegrator`] binds an orbit's [`OrbitParameters`] to an owned
//! step primitive and walks a dimensionless time grid, producing one phase
//! per grid entry after the reference time. Integration is fail-fast: the
//! first target time the primitive cannot reach ends the walk, and the
//! phases computed so far are handed back inside [`PartialIntegration`].
//!
//! [`Integrator`] is the closed set of solver variants selectable through
//! [`SolverKind`].

use std::fmt;
use std::str::FromStr;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orbit::OrbitError;
use crate::phase::{initial_step, OrbitParameters, PHASE_EPSABS, PHASE_EPSREL};
use crate::solver::{Driver, IntegrationError, OdeSystem, Stats, Tolerances};

/// Advances a state from one time to another with adaptive stepping
///
/// Implementations keep whatever stepping state they need (step size,
/// workspace, statistics) between calls.
pub trait StepPrimitive<const N: usize> {
    /// Integrate from `*t` to `t1`, updating `t` and `y` in place on success.
    fn apply<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t: &mut f64,
        t1: f64,
        y: &mut [f64; N],
    ) -> Result<(), IntegrationError>;
}

impl<const N: usize> StepPrimitive<N> for Driver<N> {
    fn apply<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t: &mut f64,
        t1: f64,
        y: &mut [f64; N],
    ) -> Result<(), IntegrationError> {
        Driver::apply(self, sys, t, t1, y)
    }
}

/// Integration strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Embedded Runge-Kutta-Fehlberg 4(5) with adaptive steps
    #[default]
    Rkf45,
}

impl SolverKind {
    /// Every supported variant
    pub const ALL: [SolverKind; 1] = [SolverKind::Rkf45];

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::Rkf45 => "rkf45",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = OrbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rkf45" | "rk45" | "rk54" | "gsl_rk54" => Ok(SolverKind::Rkf45),
            _ => Err(OrbitError::UnsupportedSolver(s.to_string())),
        }
    }
}

/// Integration stopped before the end of the time grid
#[derive(Debug, Clone, Error, PartialEq)]
#[error("integration failed at t = {t} (grid index {index}): {source}")]
pub struct PartialIntegration {
    /// Phases computed before the failure, in time order
    pub phases: Vec<f64>,
    /// Target time that could not be reached
    pub t: f64,
    /// Index of that target time in the grid
    pub index: usize,
    /// Failure reported by the step primitive
    #[source]
    pub source: IntegrationError,
}

/// Integrates the phase law for one orbit over a time grid
#[derive(Debug, Clone)]
pub struct PhaseIntegrator<P = Driver<1>> {
    params: OrbitParameters,
    initial_step: f64,
    primitive: P,
}

impl PhaseIntegrator<Driver<1>> {
    /// Create an RKF45-backed integrator for `params`.
    ///
    /// The initial step is estimated from the starting phase with
    /// `epsabs = epsrel = 1e-8`.
    pub fn new(params: OrbitParameters) -> Self {
        let h = initial_step(params.initial_phase, PHASE_EPSABS, PHASE_EPSREL, |phi| {
            params.phase_rate(phi)
        });
        info!("Initial step-size: {}", h);

        let tol = Tolerances::new(PHASE_EPSABS, PHASE_EPSREL);
        Self {
            params,
            initial_step: h,
            primitive: Driver::new(tol, h),
        }
    }

    /// Step statistics accumulated so far
    pub fn stats(&self) -> &Stats {
        self.primitive.stats()
    }
}

impl<P: StepPrimitive<1>> PhaseIntegrator<P> {
    /// Create an integrator around a caller-supplied step primitive.
    ///
    /// The initial step is still estimated so it can be reported, but how
    /// the primitive is seeded is up to the caller.
    pub fn with_primitive(params: OrbitParameters, primitive: P) -> Self {
        let h = initial_step(params.initial_phase, PHASE_EPSABS, PHASE_EPSREL, |phi| {
            params.phase_rate(phi)
        });
        Self {
            params,
            initial_step: h,
            primitive,
        }
    }

    /// Parameters this integrator is bound to
    pub fn params(&self) -> &OrbitParameters {
        &self.params
    }

    /// Starting step size estimated at construction
    pub fn initial_step(&self) -> f64 {
        self.initial_step
    }

    /// Integrate the phase across `times`.
    ///
    /// `times[0]` is the reference time at which the phase equals the bound
    /// initial phase. Returns one phase per later entry of `times`. Grids
    /// with fewer than two entries need no integration and yield an empty
    /// sequence.
    pub fn advance(&mut self, times: &[f64]) -> Result<Vec<f64>, PartialIntegration> {
        let Some((&t0, targets)) = times.split_first() else {
            return Ok(Vec::new());
        };

        let params = self.params;
        let rhs = move |_t: f64, y: &[f64; 1], ydot: &mut [f64; 1]| {
            ydot[0] = params.phase_rate(y[0]);
        };

        let mut phases = Vec::with_capacity(targets.len());
        let mut last_t = t0;
        let mut y = [params.initial_phase];

        for (offset, &t) in targets.iter().enumerate() {
            if let Err(source) = self.primitive.apply(&rhs, &mut last_t, t, &mut y) {
                error!("integration failed at t={}: {}", t, source);
                return Err(PartialIntegration {
                    phases,
                    t,
                    index: offset + 1,
                    source,
                });
            }
            phases.push(y[0]);
        }

        debug!("integrated {} grid points", phases.len());
        Ok(phases)
    }
}

/// Solver variant chosen from a [`SolverKind`]
#[derive(Debug, Clone)]
pub enum Integrator {
    /// Adaptive RKF45
    Rkf45(PhaseIntegrator<Driver<1>>),
}

impl Integrator {
    /// Construct the variant selected by `kind`
    pub fn new(kind: SolverKind, params: OrbitParameters) -> Self {
        match kind {
            SolverKind::Rkf45 => Integrator::Rkf45(PhaseIntegrator::new(params)),
        }
    }

    /// Which variant this is
    pub fn kind(&self) -> SolverKind {
        match self {
            Integrator::Rkf45(_) => SolverKind::Rkf45,
        }
    }

    /// See [`PhaseIntegrator::advance`]
    pub fn advance(&mut self, times: &[f64]) -> Result<Vec<f64>, PartialIntegration> {
        match self {
            Integrator::Rkf45(inner) => {
                let result = inner.advance(times);
                debug!("step statistics: {:?}", inner.stats());
                result
            }
        }
    }

    /// Starting step size estimated at construction
    pub fn initial_step(&self) -> f64 {
        match self {
            Integrator::Rkf45(inner) => inner.initial_step(),
        }
    }
}
