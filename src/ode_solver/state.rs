use num_traits::abs;

use crate::field::{State, VectorField};
use crate::ode_solver::problem::OdeProblem;
use crate::scalar::Scalar;

/// Mean squared error of `v` against the tolerance scale `|y| * rtol + atol`.
pub(crate) fn squared_norm<T: Scalar>(v: &State<T>, y: &State<T>, atol: T, rtol: T) -> T {
    let mut acc = T::zero();
    for i in 0..3 {
        let xi = v[i] / (abs(y[i]) * rtol + atol);
        acc += xi * xi;
    }
    acc / T::from_f64(3.0).unwrap()
}

/// State of a Runge-Kutta integration between steps.
#[derive(Clone, Debug)]
pub struct RkState<T: Scalar> {
    /// Solution at time `t`.
    pub y: State<T>,
    /// Derivative of the solution at time `t`.
    pub dy: State<T>,
    pub t: T,
    /// Step size to attempt next.
    pub h: T,
}

impl<T: Scalar> RkState<T> {
    /// State at the problem's `t0` with `dy` evaluated from the field and a
    /// step size chosen by the starting-step algorithm of Hairer, Norsett &
    /// Wanner (Solving Ordinary Differential Equations I, section II.4.2).
    ///
    /// Only the sign of the problem's `h0` is kept: it sets the direction of
    /// integration.
    pub fn new<Eqn>(problem: &OdeProblem<Eqn>, y: State<T>, solver_order: usize) -> Self
    where
        Eqn: VectorField<T = T>,
    {
        let t = problem.t0;
        let mut dy = State::zeros();
        problem.eqn.rhs(t, &y, &mut dy);
        let mut state = RkState {
            y,
            dy,
            t,
            h: problem.h0,
        };
        state.set_step_size(problem, solver_order);
        state
    }

    fn set_step_size<Eqn>(&mut self, problem: &OdeProblem<Eqn>, solver_order: usize)
    where
        Eqn: VectorField<T = T>,
    {
        let is_neg_h = self.h < T::zero();
        let rtol = problem.rtol;
        let atol = problem.atol;

        let d0 = squared_norm(&self.y, &self.y, atol, rtol).sqrt();
        let d1 = squared_norm(&self.dy, &self.y, atol, rtol).sqrt();

        let tol = T::from_f64(1e-5).unwrap();
        let small = T::from_f64(1e-6).unwrap();
        let h0 = if d0 < tol || d1 < tol {
            small
        } else {
            T::from_f64(0.01).unwrap() * (d0 / d1)
        };

        // take an Euler step along the tangent and evaluate again,
        // preserving the sign of h
        let (y1, t1) = if is_neg_h {
            (&self.y - &self.dy * h0, self.t - h0)
        } else {
            (&self.y + &self.dy * h0, self.t + h0)
        };
        let mut f1 = State::zeros();
        problem.eqn.rhs(t1, &y1, &mut f1);

        let df = f1 - &self.dy;
        let d2 = squared_norm(&df, &self.y, atol, rtol).sqrt() / h0;

        let mut max_d = d2;
        if max_d < d1 {
            max_d = d1;
        }
        let h1 = if max_d < T::from_f64(1e-15).unwrap() {
            let h_min = h0 * T::from_f64(1e-3).unwrap();
            if h_min < small {
                small
            } else {
                h_min
            }
        } else {
            let order = T::from_usize(solver_order).unwrap();
            (T::from_f64(0.01).unwrap() / max_d).pow(T::one() / (T::one() + order))
        };

        self.h = T::from_f64(100.0).unwrap() * h0;
        if self.h > h1 {
            self.h = h1;
        }
        if is_neg_h {
            self.h = -self.h;
        }
    }
}

#[cfg(test)]
mod test {
    use nalgebra::Vector3;

    use crate::{Lorenz, OdeProblem, Tableau};

    #[test]
    fn initial_state_holds_the_field_derivative() {
        let problem = OdeProblem::new(Lorenz::<f64>::default());
        let tableau = Tableau::tsit45();
        let state = problem.rk_state(Vector3::new(10.0, 10.0, 10.0), &tableau);
        assert_eq!(state.t, 0.0);
        assert_eq!(state.y, Vector3::new(10.0, 10.0, 10.0));
        let expected = Vector3::new(
            0.0,
            10.0 * (28.0 - 10.0) - 10.0,
            10.0 * 10.0 - 8.0 / 3.0 * 10.0,
        );
        assert_eq!(state.dy, expected);
    }

    #[test]
    fn initial_step_is_positive_and_modest() {
        let problem = OdeProblem::new(Lorenz::<f64>::default());
        let tableau = Tableau::tsit45();
        let state = problem.rk_state(Vector3::new(10.0, 10.0, 10.0), &tableau);
        assert!(state.h > 1e-5);
        assert!(state.h < 0.1);
    }

    #[test]
    fn negative_h0_selects_backward_integration() {
        let problem = OdeProblem::new(Lorenz::<f64>::default()).h0(-1.0);
        let tableau = Tableau::tsit45();
        let state = problem.rk_state(Vector3::new(1.0, 1.0, 1.0), &tableau);
        assert!(state.h < 0.0);
    }
}
