use nalgebra::{DMatrix, DVector, Matrix3xX};
use num_traits::{abs, FromPrimitive, One, Pow, ToPrimitive, Zero};
use serde::Serialize;

use crate::error::{AttractorError, OdeSolverError};
use crate::field::{State, VectorField};
use crate::ode_solver::config::ExplicitRkConfig;
use crate::ode_solver::problem::OdeProblem;
use crate::ode_solver::state::{squared_norm, RkState};
use crate::ode_solver::tableau::Tableau;
use crate::ode_solver_error;
use crate::scalar::Scalar;

/// Reason a successful [ExplicitRk::step] stopped.
#[derive(Debug, PartialEq)]
pub enum OdeSolverStopReason {
    /// The solver took an ordinary internal step.
    InternalTimestep,
    /// The solver landed on the time passed to [ExplicitRk::set_stop_time].
    TstopReached,
}

/// Counters accumulated over the lifetime of a solver.
#[derive(Clone, Debug, Serialize, Default)]
pub struct RkStatistics {
    pub number_of_steps: usize,
    pub number_of_error_test_failures: usize,
    pub number_of_rhs_evaluations: usize,
}

/// An explicit Runge-Kutta method with adaptive step-size control.
///
/// The particular method is defined by the [Tableau] used to create the
/// solver. If the `beta` matrix of the [Tableau] is present this is used for
/// interpolation, otherwise hermite interpolation is used.
///
/// Restrictions:
/// - The upper triangular and diagonal parts of the `a` matrix must be zero
///   (i.e. explicit).
/// - The last row of the `a` matrix must be the same as the `b` vector, and
///   the last element of the `c` vector must be 1 (i.e. a stiffly accurate
///   method). The first stage of a step is then the last stage of the
///   previous one, so each step costs `s - 1` evaluations of the field.
pub struct ExplicitRk<'a, Eqn: VectorField> {
    problem: &'a OdeProblem<Eqn>,
    tableau: Tableau<Eqn::T>,
    state: RkState<Eqn::T>,
    old_state: RkState<Eqn::T>,
    a_rows: Vec<DVector<Eqn::T>>,
    diff: Matrix3xX<Eqn::T>,
    statistics: RkStatistics,
    config: ExplicitRkConfig<Eqn::T>,
    tstop: Option<Eqn::T>,
    is_state_mutated: bool,
}

impl<'a, Eqn: VectorField> ExplicitRk<'a, Eqn> {
    /// Create a solver from a state previously produced by
    /// [OdeProblem::rk_state] or [ExplicitRk::checkpoint]. The state's `dy`
    /// must hold the field evaluated at `(t, y)`.
    pub fn new(
        problem: &'a OdeProblem<Eqn>,
        state: RkState<Eqn::T>,
        tableau: Tableau<Eqn::T>,
    ) -> Result<Self, AttractorError> {
        Self::check_explicit(&tableau)?;

        let s = tableau.s();
        let mut a_rows = Vec::with_capacity(s);
        for i in 0..s {
            let mut row = Vec::with_capacity(i);
            for j in 0..i {
                row.push(tableau.a()[(i, j)]);
            }
            a_rows.push(DVector::from_vec(row));
        }

        let old_state = state.clone();
        Ok(Self {
            problem,
            diff: Matrix3xX::zeros(s),
            tableau,
            state,
            old_state,
            a_rows,
            statistics: RkStatistics::default(),
            config: ExplicitRkConfig::default(),
            tstop: None,
            is_state_mutated: false,
        })
    }

    fn check_explicit(tableau: &Tableau<Eqn::T>) -> Result<(), AttractorError> {
        let s = tableau.s();
        for i in 0..s {
            for j in i..s {
                if tableau.a()[(i, j)] != Eqn::T::zero() {
                    return Err(ode_solver_error!(
                        InvalidTableau,
                        format!(
                            "Invalid tableau, expected a(i, j) = 0 for j >= i, but found a({}, {}) = {}",
                            i,
                            j,
                            tableau.a()[(i, j)]
                        )
                    ));
                }
            }
        }
        for i in 0..s {
            if tableau.a()[(s - 1, i)] != tableau.b()[i] {
                return Err(ode_solver_error!(
                    InvalidTableau,
                    "Invalid tableau, expected a(s-1, i) = b(i)"
                ));
            }
        }
        if tableau.c()[s - 1] != Eqn::T::one() {
            return Err(ode_solver_error!(
                InvalidTableau,
                "Invalid tableau, expected c(s-1) = 1"
            ));
        }
        if tableau.c()[0] != Eqn::T::zero() {
            return Err(ode_solver_error!(
                InvalidTableau,
                "Invalid tableau, expected c(0) = 0"
            ));
        }
        Ok(())
    }

    pub fn order(&self) -> usize {
        self.tableau.order()
    }

    pub fn tableau(&self) -> &Tableau<Eqn::T> {
        &self.tableau
    }

    pub fn statistics(&self) -> &RkStatistics {
        &self.statistics
    }

    pub fn config(&self) -> &ExplicitRkConfig<Eqn::T> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ExplicitRkConfig<Eqn::T> {
        &mut self.config
    }

    pub fn state(&self) -> &RkState<Eqn::T> {
        &self.state
    }

    /// Mutable access to the state.
    ///
    /// Taking this reference invalidates the interpolant over the last step:
    /// until the next call to [ExplicitRk::step], interpolation is only
    /// possible at the state time itself. The derivative `dy` is not
    /// re-evaluated, so a caller changing `y` or `t` should update `dy` to
    /// match.
    pub fn state_mut(&mut self) -> &mut RkState<Eqn::T> {
        self.is_state_mutated = true;
        &mut self.state
    }

    pub fn into_state(self) -> RkState<Eqn::T> {
        self.state
    }

    pub fn checkpoint(&self) -> RkState<Eqn::T> {
        self.state.clone()
    }

    /// Set a time for the solver to stop at.
    ///
    /// [ExplicitRk::step] shortens any step that would overshoot `tstop` and
    /// returns [OdeSolverStopReason::TstopReached] once the state lands
    /// there.
    pub fn set_stop_time(&mut self, tstop: Eqn::T) -> Result<(), AttractorError> {
        self.tstop = Some(tstop);
        if let Some(OdeSolverStopReason::TstopReached) = self.handle_tstop(tstop)? {
            let error = OdeSolverError::StopTimeAtCurrentTime;
            self.tstop = None;
            return Err(AttractorError::from(error));
        }
        Ok(())
    }

    /// Advance the solution by one internal step, shrinking the step size
    /// until the error estimate passes the problem tolerances and growing it
    /// for the next step when it passes easily.
    pub fn step(&mut self) -> Result<OdeSolverStopReason, AttractorError> {
        let mut h = self.start_step()?;

        // loop until step is accepted
        let mut nattempts = 0;
        let factor = loop {
            // start a step attempt
            self.start_step_attempt(h);
            for i in 1..self.tableau.s() {
                self.do_stage(i, h);
            }
            let error_norm = self.error_norm();
            let factor = self.step_factor(error_norm);
            if error_norm < Eqn::T::one() {
                break factor;
            }
            h *= factor;
            nattempts += 1;
            self.error_test_fail(h, nattempts)?;
        };
        self.step_accepted(h, h * factor)
    }

    fn start_step(&mut self) -> Result<Eqn::T, AttractorError> {
        if self.is_state_mutated {
            // reinitialise tstop if needed
            if let Some(tstop) = self.tstop {
                self.set_stop_time(tstop)?;
            }
            self.is_state_mutated = false;
        }
        Ok(self.state.h)
    }

    fn start_step_attempt(&mut self, h: Eqn::T) {
        // the first stage is the last stage of the previous step
        self.diff
            .column_mut(0)
            .axpy(h, &self.state.dy, Eqn::T::zero());
    }

    fn do_stage(&mut self, i: usize, h: Eqn::T) {
        let t = self.state.t + self.tableau.c()[i] * h;

        self.old_state.y.copy_from(&self.state.y);
        self.old_state.y.gemv(
            Eqn::T::one(),
            &self.diff.columns(0, i),
            &self.a_rows[i],
            Eqn::T::one(),
        );

        self.problem
            .eqn
            .rhs(t, &self.old_state.y, &mut self.old_state.dy);
        self.statistics.number_of_rhs_evaluations += 1;

        self.diff
            .column_mut(i)
            .axpy(h, &self.old_state.dy, Eqn::T::zero());
    }

    fn error_norm(&self) -> Eqn::T {
        let mut error: State<Eqn::T> = State::zeros();
        error.gemv(Eqn::T::one(), &self.diff, self.tableau.d(), Eqn::T::zero());
        squared_norm(&error, &self.state.y, self.problem.atol, self.problem.rtol)
    }

    fn step_factor(&self, error_norm: Eqn::T) -> Eqn::T {
        let safety = Eqn::T::from_f64(0.9).unwrap();
        let order = self.tableau.order() as f64;
        let mut factor =
            safety * error_norm.pow(Eqn::T::from_f64(-0.5 / (order + 1.0)).unwrap());
        if factor < self.config.minimum_timestep_shrink {
            factor = self.config.minimum_timestep_shrink;
        }
        if factor > self.config.maximum_timestep_growth {
            factor = self.config.maximum_timestep_growth;
        }
        factor
    }

    fn error_test_fail(&mut self, h: Eqn::T, nattempts: usize) -> Result<(), AttractorError> {
        self.statistics.number_of_error_test_failures += 1;
        // if too many error test failures, then fail
        if nattempts >= self.config.maximum_error_test_failures {
            return Err(AttractorError::from(OdeSolverError::NonConvergence {
                time: self.state.t.to_f64().unwrap(),
            }));
        }
        // if step size too small, then fail
        if abs(h) < self.config.minimum_timestep {
            return Err(AttractorError::from(OdeSolverError::NonConvergence {
                time: self.state.t.to_f64().unwrap(),
            }));
        }
        Ok(())
    }

    fn step_accepted(
        &mut self,
        h: Eqn::T,
        new_h: Eqn::T,
    ) -> Result<OdeSolverStopReason, AttractorError> {
        // the last stage already evaluated the step result into old_state,
        // so taking the step is a swap
        self.old_state.t = self.state.t + h;
        self.old_state.h = new_h;
        std::mem::swap(&mut self.old_state, &mut self.state);

        self.statistics.number_of_steps += 1;

        // check if we are at tstop
        if let Some(tstop) = self.tstop {
            if let Some(OdeSolverStopReason::TstopReached) = self.handle_tstop(tstop)? {
                self.tstop = None;
                return Ok(OdeSolverStopReason::TstopReached);
            }
        }

        Ok(OdeSolverStopReason::InternalTimestep)
    }

    fn handle_tstop(
        &mut self,
        tstop: Eqn::T,
    ) -> Result<Option<OdeSolverStopReason>, AttractorError> {
        let state = &mut self.state;
        // check if we are within roundoff of tstop
        let troundoff =
            Eqn::T::from_f64(100.0).unwrap() * Eqn::T::EPSILON * (abs(state.t) + abs(state.h));
        if abs(state.t - tstop) <= troundoff {
            return Ok(Some(OdeSolverStopReason::TstopReached));
        } else if (state.h > Eqn::T::zero() && tstop < state.t - troundoff)
            || (state.h < Eqn::T::zero() && tstop > state.t + troundoff)
        {
            return Err(AttractorError::from(
                OdeSolverError::StopTimeBeforeCurrentTime {
                    stop_time: tstop.to_f64().unwrap(),
                    state_time: state.t.to_f64().unwrap(),
                },
            ));
        }

        // check if the next step will be beyond tstop, if so adjust the step size
        if (state.h > Eqn::T::zero() && state.t + state.h > tstop + troundoff)
            || (state.h < Eqn::T::zero() && state.t + state.h < tstop - troundoff)
        {
            let factor = (tstop - state.t) / state.h;
            state.h *= factor;
        }
        Ok(None)
    }

    /// Interpolate the solution at `t`, which must lie within the last
    /// completed step.
    pub fn interpolate(&self, t: Eqn::T) -> Result<State<Eqn::T>, AttractorError> {
        if self.is_state_mutated {
            if t == self.state.t {
                return Ok(self.state.y);
            } else {
                return Err(ode_solver_error!(InterpolationTimeOutsideCurrentStep));
            }
        }

        // check that t is within the current step depending on the direction
        let is_forward = self.state.h > Eqn::T::zero();
        if (is_forward && (t > self.state.t || t < self.old_state.t))
            || (!is_forward && (t < self.state.t || t > self.old_state.t))
        {
            return Err(ode_solver_error!(InterpolationTimeOutsideCurrentStep));
        }

        let dt = self.state.t - self.old_state.t;
        let theta = if dt == Eqn::T::zero() {
            Eqn::T::one()
        } else {
            (t - self.old_state.t) / dt
        };

        if let Some(beta) = self.tableau.beta() {
            let beta_f = Self::interpolate_beta_function(theta, beta);
            let mut ret = self.old_state.y;
            ret.gemv(Eqn::T::one(), &self.diff, &beta_f, Eqn::T::one());
            Ok(ret)
        } else {
            Ok(Self::interpolate_hermite(
                theta,
                &self.old_state.y,
                &self.state.y,
                &self.diff,
            ))
        }
    }

    fn interpolate_beta_function(theta: Eqn::T, beta: &DMatrix<Eqn::T>) -> DVector<Eqn::T> {
        let poly_order = beta.ncols();
        let s_star = beta.nrows();
        let mut thetav = Vec::with_capacity(poly_order);
        thetav.push(theta);
        for i in 1..poly_order {
            thetav.push(theta * thetav[i - 1]);
        }
        // beta_poly = beta * thetav
        let thetav = DVector::from_vec(thetav);
        let mut beta_f = DVector::zeros(s_star);
        beta_f.gemv(Eqn::T::one(), beta, &thetav, Eqn::T::zero());
        beta_f
    }

    /// Cubic hermite interpolation over the step, using the derivatives held
    /// in the first and last columns of `diff` (already scaled by `h`).
    fn interpolate_hermite(
        theta: Eqn::T,
        u0: &State<Eqn::T>,
        u1: &State<Eqn::T>,
        diff: &Matrix3xX<Eqn::T>,
    ) -> State<Eqn::T> {
        let f0 = diff.column(0);
        let f1 = diff.column(diff.ncols() - 1);
        let one = Eqn::T::one();
        let two = Eqn::T::from_f64(2.0).unwrap();

        let du = u1 - u0;
        let mut ret = du * (one - two * theta);
        ret.axpy(theta - one, &f0, one);
        ret.axpy(theta, &f1, one);
        ret *= theta * (theta - one);
        ret += u0 + du * theta;
        ret
    }
}
