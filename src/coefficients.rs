//! Runge-Kutta-Fehlberg 4(5) Coefficients
//!
//! Coefficients for the 6-stage embedded RK4(5) pair from:
//! Fehlberg, E. (1969). "Low-Order Classical Runge-Kutta Formulas with
//! Stepsize Control and their Application to some Heat Transfer Problems"
//! NASA TR R-315, Table III.
//!
//! The 5th-order solution advances the state; the embedded 4th-order
//! solution is only used to form the local error estimate.

/// Number of stages in the RKF45 method
pub const STAGES: usize = 6;

/// Order of the higher-order method (used for advancing the solution)
pub const ORDER: u8 = 5;

/// Order of the embedded method (used for error estimation)
pub const EMBEDDED_ORDER: u8 = 4;

/// Node coefficients (c_i) - the points at which f(t,y) is evaluated
/// c[i] represents t_n + c[i]*h
pub const C: [f64; STAGES] = [
    0.0,          // c[0]
    1.0 / 4.0,    // c[1]
    3.0 / 8.0,    // c[2]
    12.0 / 13.0,  // c[3]
    1.0,          // c[4]
    1.0 / 2.0,    // c[5]
];

/// Runge-Kutta matrix (a_ij) coefficients
///
/// k_i = f(t_n + c_i*h, y_n + h * sum_{j=0}^{i-1} a_{i,j} * k_j)
///
/// Stored as A[i][j] for row i, column j (j < i)
pub const A: [[f64; 5]; STAGES] = [
    [0.0; 5],
    [1.0 / 4.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 32.0, 9.0 / 32.0, 0.0, 0.0, 0.0],
    [1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0, 0.0, 0.0],
    [439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0, 0.0],
    [-8.0 / 27.0, 2.0, -3544.0 / 2565.0, 1859.0 / 4104.0, -11.0 / 40.0],
];

/// Weights for the 5th-order solution (b_i)
///
/// y_{n+1} = y_n + h * sum_{i=0}^{5} b[i] * k_i
pub const B: [f64; STAGES] = [
    16.0 / 135.0,
    0.0,
    6656.0 / 12825.0,
    28561.0 / 56430.0,
    -9.0 / 50.0,
    2.0 / 55.0,
];

/// Weights for the embedded 4th-order solution (b_hat_i)
///
/// Stage 5 does not contribute to the 4th-order solution.
pub const B_HAT: [f64; STAGES] = [
    25.0 / 216.0,
    0.0,
    1408.0 / 2565.0,
    2197.0 / 4104.0,
    -1.0 / 5.0,
    0.0,
];

/// Error weights: B[i] - B_HAT[i]
///
/// err ≈ h * sum_{i=0}^{5} (b[i] - b_hat[i]) * k_i
pub const B_ERR: [f64; STAGES] = [
    1.0 / 360.0,
    0.0,
    -128.0 / 4275.0,
    -2197.0 / 75240.0,
    1.0 / 50.0,
    2.0 / 55.0,
];
