use thiserror::Error;

/// Custom error type for the crate.
#[derive(Error, Debug)]
pub enum AttractorError {
    #[error("ODE solver error: {0}")]
    OdeSolverError(#[from] OdeSolverError),
    #[error("Computation was cancelled before it completed")]
    Cancelled,
    #[error("Error: {0}")]
    Other(String),
}

/// Errors raised while setting up or driving an integration.
#[derive(Debug, Error)]
pub enum OdeSolverError {
    #[error("Trajectory duration must be positive, but got duration = {duration}")]
    InvalidDuration { duration: f64 },
    #[error(
        "Sampling step must be positive and no greater than the duration, but got step = {step} and duration = {duration}"
    )]
    InvalidStep { step: f64, duration: f64 },
    #[error("Solver failed to converge: error tolerances could not be met within the step attempt budget at time = {time}")]
    NonConvergence { time: f64 },
    #[error("Stop time = {stop_time} is less than current state time = {state_time}")]
    StopTimeBeforeCurrentTime { stop_time: f64, state_time: f64 },
    #[error("Stop time is at the current state time")]
    StopTimeAtCurrentTime,
    #[error("Interpolation time is not within the current step")]
    InterpolationTimeOutsideCurrentStep,
    #[error("Invalid Tableau: {0}")]
    InvalidTableau(String),
    #[error("Error: {0}")]
    Other(String),
}

#[macro_export]
macro_rules! ode_solver_error {
    ($variant:ident) => {
        $crate::error::AttractorError::from($crate::error::OdeSolverError::$variant)
    };
    ($variant:ident, $($arg:tt)*) => {
        $crate::error::AttractorError::from($crate::error::OdeSolverError::$variant(
            $($arg)*.to_string(),
        ))
    };
}

#[macro_export]
macro_rules! other_error {
    ($($arg:tt)*) => {
        $crate::error::AttractorError::Other($($arg)*.to_string())
    };
}
