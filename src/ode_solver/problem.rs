use nalgebra::ComplexField;
use num_traits::{FromPrimitive, One, ToPrimitive, Zero};

use crate::ensemble::CancelToken;
use crate::scalar::Scalar;
use crate::error::{AttractorError, OdeSolverError};
use crate::field::{State, VectorField};
use crate::ode_solver::explicit_rk::{ExplicitRk, OdeSolverStopReason};
use crate::ode_solver::state::RkState;
use crate::ode_solver::tableau::Tableau;
use crate::other_error;
use crate::trajectory::Trajectory;

/// An initial value problem `dy/dt = f(t, y)` together with the tolerances
/// and time origin shared by every solver created from it.
#[derive(Clone, Debug)]
pub struct OdeProblem<Eqn: VectorField> {
    pub eqn: Eqn,
    /// Relative tolerance on the local error of a step.
    pub rtol: Eqn::T,
    /// Absolute tolerance on the local error of a step.
    pub atol: Eqn::T,
    /// Time of the initial state.
    pub t0: Eqn::T,
    /// Suggested first step size. Only its sign is kept when a state is
    /// created, selecting the direction of integration.
    pub h0: Eqn::T,
}

impl<Eqn: VectorField> OdeProblem<Eqn> {
    /// A problem with default tolerances `rtol = atol = 1e-6`, starting at
    /// `t0 = 0` and integrating forward.
    pub fn new(eqn: Eqn) -> Self {
        Self {
            eqn,
            rtol: Eqn::T::from_f64(1e-6).unwrap(),
            atol: Eqn::T::from_f64(1e-6).unwrap(),
            t0: Eqn::T::zero(),
            h0: Eqn::T::one(),
        }
    }

    pub fn rtol(mut self, rtol: Eqn::T) -> Self {
        self.rtol = rtol;
        self
    }

    pub fn atol(mut self, atol: Eqn::T) -> Self {
        self.atol = atol;
        self
    }

    pub fn t0(mut self, t0: Eqn::T) -> Self {
        self.t0 = t0;
        self
    }

    pub fn h0(mut self, h0: Eqn::T) -> Self {
        self.h0 = h0;
        self
    }

    /// Initial solver state at `(t0, y0)`, with a starting step size chosen
    /// for methods of the given tableau's order.
    pub fn rk_state(&self, y0: State<Eqn::T>, tableau: &Tableau<Eqn::T>) -> RkState<Eqn::T> {
        RkState::new(self, y0, tableau.order())
    }

    /// An [ExplicitRk] solver using the tsit45 tableau, starting at `y0`.
    pub fn tsit45(&self, y0: State<Eqn::T>) -> Result<ExplicitRk<'_, Eqn>, AttractorError> {
        let tableau = Tableau::tsit45();
        let state = self.rk_state(y0, &tableau);
        ExplicitRk::new(self, state, tableau)
    }

    /// An [ExplicitRk] solver using the tsit45 tableau, resuming from an
    /// existing state.
    pub fn tsit45_solver(
        &self,
        state: RkState<Eqn::T>,
    ) -> Result<ExplicitRk<'_, Eqn>, AttractorError> {
        ExplicitRk::new(self, state, Tableau::tsit45())
    }

    /// Sample the solution through `y0` on the fixed grid
    /// `t0, t0 + step, t0 + 2 step, ...`, stopping before `t0 + duration`.
    ///
    /// The grid has `ceil(duration / step)` points, evaluated in the working
    /// precision, so the first sample is always the initial state and a
    /// duration that is an exact multiple of the step excludes its endpoint.
    /// The solver steps at its own adaptive resolution and the samples are
    /// interpolated from its continuous output.
    pub fn sample(
        &self,
        y0: State<Eqn::T>,
        duration: Eqn::T,
        step: Eqn::T,
    ) -> Result<Trajectory<Eqn::T>, AttractorError> {
        self.sample_inner(y0, duration, step, None)
    }

    /// Same as [OdeProblem::sample], aborting with
    /// [AttractorError::Cancelled] as soon as `cancel` trips. Cancellation is
    /// checked between solver steps.
    pub fn sample_with_cancel(
        &self,
        y0: State<Eqn::T>,
        duration: Eqn::T,
        step: Eqn::T,
        cancel: &CancelToken,
    ) -> Result<Trajectory<Eqn::T>, AttractorError> {
        self.sample_inner(y0, duration, step, Some(cancel))
    }

    pub(crate) fn sample_inner(
        &self,
        y0: State<Eqn::T>,
        duration: Eqn::T,
        step: Eqn::T,
        cancel: Option<&CancelToken>,
    ) -> Result<Trajectory<Eqn::T>, AttractorError> {
        if duration.is_nan() || duration <= Eqn::T::zero() {
            return Err(AttractorError::from(OdeSolverError::InvalidDuration {
                duration: duration.to_f64().unwrap(),
            }));
        }
        if step.is_nan() || step <= Eqn::T::zero() || step > duration {
            return Err(AttractorError::from(OdeSolverError::InvalidStep {
                step: step.to_f64().unwrap(),
                duration: duration.to_f64().unwrap(),
            }));
        }

        let npoints = (duration / step).ceil();
        let n = npoints
            .to_usize()
            .ok_or_else(|| other_error!(format!("Sampling grid of {npoints} points is too large")))?;

        let tableau = Tableau::tsit45();
        let state = self.rk_state(y0, &tableau);
        let mut solver = ExplicitRk::new(self, state, tableau)?;

        let mut states = Vec::with_capacity(n);
        states.push(y0);

        if n > 1 {
            let t_final = self.t0 + Eqn::T::from_usize(n - 1).unwrap() * step;
            solver.set_stop_time(t_final)?;
            for i in 1..n {
                let t = self.t0 + Eqn::T::from_usize(i).unwrap() * step;
                while solver.state().t < t {
                    if let Some(cancel) = cancel {
                        if cancel.is_cancelled() {
                            return Err(AttractorError::Cancelled);
                        }
                    }
                    if let OdeSolverStopReason::TstopReached = solver.step()? {
                        break;
                    }
                }
                // the solver can land within roundoff short of the last grid
                // time, in which case its state is the sample
                if t < solver.state().t {
                    states.push(solver.interpolate(t)?);
                } else {
                    states.push(solver.state().y);
                }
            }
        }

        Ok(Trajectory::new(states, step))
    }
}
