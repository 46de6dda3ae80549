//! # Attractor
//!
//! Attractor computes trajectories of the Lorenz system for phase-space visualisation. It integrates the
//! equations with an adaptive explicit Runge-Kutta solver and resamples the solution onto a fixed time grid,
//! so that a plotting layer can animate one or many trajectories in lockstep without knowing anything about
//! step size control.
//!
//! ## Sampling a trajectory
//!
//! The entry point is the [OdeProblem] struct, which pairs a vector field with the solver settings (relative
//! tolerance [OdeProblem::rtol], absolute tolerance [OdeProblem::atol], initial time [OdeProblem::t0] and
//! initial step size [OdeProblem::h0]). The built-in field is [Lorenz], with its parameters held in
//! [LorenzParams] (defaulting to the classical sigma = 10, rho = 28, beta = 8/3).
//!
//! Call [OdeProblem::sample] with an initial state, a duration and a sampling step to obtain a [Trajectory].
//! The sample times are `0, step, 2 * step, ...` up to but excluding the duration, and the first sample is
//! always the initial state itself. A [Trajectory] can afterwards be queried at arbitrary times with
//! [Trajectory::position_at_time], which interpolates linearly between neighbouring samples and clamps to the
//! endpoints outside the sampled range.
//!
//! ## Ensembles
//!
//! To animate a bundle of trajectories, generate a set of initial states with [InitialConditions]. States are
//! either clustered along the z axis around a base state ([InitialConditions::clustered]) or drawn uniformly
//! from a box enclosing the attractor ([InitialConditions::randomized]); in both cases the caller provides
//! the random number generator, so a seeded generator gives a reproducible ensemble. Pass the states to
//! [OdeProblem::solve_ensemble] to integrate every member in parallel using
//! [rayon](https://github.com/rayon-rs/rayon). The resulting [Ensemble] keeps its members in the same order
//! as the input states, and any member failing validation or integration fails the whole ensemble.
//!
//! Long computations can be aborted from another thread: create a [CancelToken], hand it to
//! [OdeProblem::sample_with_cancel] or [OdeProblem::solve_ensemble_with_cancel], and call
//! [CancelToken::cancel]. In-flight integrations stop at the next solver step and return an error.
//!
//! ## The solver
//!
//! The integrator behind the samplers is [ExplicitRk], an explicit Runge-Kutta solver with an embedded error
//! estimate, adaptive step size control and dense output. You can use your own Butcher tableau via [Tableau]
//! or use the provided Tsitouras 4(5) pair ([Tableau::tsit45]). The easiest way to create a solver is
//! [OdeProblem::tsit45], which evaluates the initial gradient and chooses a starting step size; use
//! [OdeProblem::tsit45_solver] to resume from a saved state instead. Possible workflows are:
//! - Use the [ExplicitRk::step] method to advance the solution in time with an internal step size chosen by
//!   the solver to meet the error tolerances.
//! - Use the [ExplicitRk::interpolate] method to evaluate the solution between the last two time steps.
//! - Use the [ExplicitRk::set_stop_time] method to make the solver stop exactly at a specified time
//!   (overriding the internal step size for the final step).
//!
//! The solver state (state vector, gradient, time and step size) is held in [RkState]. To view the state
//! within a solver, use the [ExplicitRk::state] or [ExplicitRk::state_mut] methods; [ExplicitRk::checkpoint]
//! clones it out so the integration can be restarted later. Step size bounds and the error test failure
//! budget live in [ExplicitRkConfig], and [ExplicitRk::statistics] reports step and evaluation counts.
//!
//! ## Vector fields
//!
//! Any three-dimensional system can be integrated in place of the Lorenz equations by implementing the
//! [VectorField] trait, or by wrapping a closure in [ClosureField].
//!
//! ## Errors and divergence
//!
//! Fallible operations return [AttractorError]. Invalid sampling grids are rejected up front
//! ([OdeSolverError::InvalidDuration], [OdeSolverError::InvalidStep]), and a solver that cannot meet its
//! tolerances within the attempt budget reports [OdeSolverError::NonConvergence] rather than silently
//! returning a partial solution. A trajectory that escapes to infinity is not an error: non-finite samples
//! are kept in the [Trajectory] for the caller to inspect.

pub mod ensemble;
pub mod field;
pub mod lorenz;
pub mod ode_solver;
pub mod scalar;
pub mod trajectory;

pub use ensemble::{CancelToken, Ensemble, EnsembleMember, InitialConditions};
pub use error::{AttractorError, OdeSolverError};
pub use field::{ClosureField, State, VectorField};
pub use lorenz::{Lorenz, LorenzParams};
pub use ode_solver::{
    config::ExplicitRkConfig,
    explicit_rk::{ExplicitRk, OdeSolverStopReason, RkStatistics},
    problem::OdeProblem,
    state::RkState,
    tableau::Tableau,
};
pub use scalar::Scalar;
pub use trajectory::Trajectory;

pub mod error;
