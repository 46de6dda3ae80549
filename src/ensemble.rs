use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rayon::prelude::*;

use crate::error::AttractorError;
use crate::field::{State, VectorField};
use crate::ode_solver::problem::OdeProblem;
use crate::scalar::Scalar;
use crate::trajectory::Trajectory;

/// Recipe for the initial states of an ensemble.
#[derive(Clone, Debug, PartialEq)]
pub enum InitialConditions<T: Scalar> {
    /// `count` states stacked above `base`: member `n` starts at
    /// `(x, y, z + n * epsilon)`.
    Clustered {
        base: State<T>,
        count: usize,
        epsilon: T,
    },
    /// `count` states drawn uniformly from the box
    /// `[-30, 30) x [-30, 30) x [10, 40)`.
    Randomized { count: usize },
}

impl<T: Scalar> InitialConditions<T> {
    /// Clustered conditions with the default `count = 6` members spaced
    /// `epsilon = 1e-3` apart.
    pub fn clustered(base: State<T>) -> Self {
        Self::Clustered {
            base,
            count: 6,
            epsilon: T::from_f64(1e-3).unwrap(),
        }
    }

    pub fn randomized(count: usize) -> Self {
        Self::Randomized { count }
    }

    pub fn count(&self) -> usize {
        match self {
            Self::Clustered { count, .. } => *count,
            Self::Randomized { count } => *count,
        }
    }

    /// Materialise the initial states. Randomized conditions draw from `rng`,
    /// so the caller owns reproducibility: seeding the generator fixes the
    /// ensemble.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<State<T>>
    where
        T: SampleUniform,
    {
        match self {
            Self::Clustered {
                base,
                count,
                epsilon,
            } => (0..*count)
                .map(|n| {
                    State::new(
                        base[0],
                        base[1],
                        base[2] + T::from_usize(n).unwrap() * *epsilon,
                    )
                })
                .collect(),
            Self::Randomized { count } => {
                let xy = Uniform::new(T::from_f64(-30.0).unwrap(), T::from_f64(30.0).unwrap());
                let z = Uniform::new(T::from_f64(10.0).unwrap(), T::from_f64(40.0).unwrap());
                (0..*count)
                    .map(|_| State::new(xy.sample(rng), xy.sample(rng), z.sample(rng)))
                    .collect()
            }
        }
    }
}

/// Shared flag for aborting in-flight integrations.
///
/// Clones share the flag. Cancellation is cooperative: solvers check the
/// token between steps, so a cancelled computation stops within one step.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// One trajectory of an ensemble, paired with the state it started from.
#[derive(Clone, Debug, PartialEq)]
pub struct EnsembleMember<T: Scalar> {
    pub initial_state: State<T>,
    pub trajectory: Trajectory<T>,
}

/// Trajectories integrated from a family of initial states, in the order the
/// states were given.
#[derive(Clone, Debug, PartialEq)]
pub struct Ensemble<T: Scalar> {
    members: Vec<EnsembleMember<T>>,
}

impl<T: Scalar> Ensemble<T> {
    pub fn members(&self) -> &[EnsembleMember<T>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnsembleMember<T>> {
        self.members.iter()
    }
}

impl<'a, T: Scalar> IntoIterator for &'a Ensemble<T> {
    type Item = &'a EnsembleMember<T>;
    type IntoIter = std::slice::Iter<'a, EnsembleMember<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

impl<T: Scalar> IntoIterator for Ensemble<T> {
    type Item = EnsembleMember<T>;
    type IntoIter = std::vec::IntoIter<EnsembleMember<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl<Eqn> OdeProblem<Eqn>
where
    Eqn: VectorField + Sync,
{
    /// Sample one trajectory per initial state, in parallel, preserving the
    /// order of `initial_states`.
    ///
    /// Each member uses the grid semantics of [OdeProblem::sample]. A single
    /// failing member fails the whole ensemble.
    pub fn solve_ensemble(
        &self,
        initial_states: &[State<Eqn::T>],
        duration: Eqn::T,
        step: Eqn::T,
    ) -> Result<Ensemble<Eqn::T>, AttractorError> {
        self.solve_ensemble_inner(initial_states, duration, step, None)
    }

    /// Same as [OdeProblem::solve_ensemble], aborting every member with
    /// [AttractorError::Cancelled] as soon as `cancel` trips.
    pub fn solve_ensemble_with_cancel(
        &self,
        initial_states: &[State<Eqn::T>],
        duration: Eqn::T,
        step: Eqn::T,
        cancel: &CancelToken,
    ) -> Result<Ensemble<Eqn::T>, AttractorError> {
        self.solve_ensemble_inner(initial_states, duration, step, Some(cancel))
    }

    fn solve_ensemble_inner(
        &self,
        initial_states: &[State<Eqn::T>],
        duration: Eqn::T,
        step: Eqn::T,
        cancel: Option<&CancelToken>,
    ) -> Result<Ensemble<Eqn::T>, AttractorError> {
        let members = initial_states
            .par_iter()
            .map(|&initial_state| {
                let trajectory = self.sample_inner(initial_state, duration, step, cancel)?;
                Ok(EnsembleMember {
                    initial_state,
                    trajectory,
                })
            })
            .collect::<Result<Vec<_>, AttractorError>>()?;
        Ok(Ensemble { members })
    }
}

#[cfg(test)]
mod test {
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::{
        AttractorError, CancelToken, InitialConditions, Lorenz, OdeProblem, OdeSolverError,
    };

    #[test]
    fn clustered_states_stack_along_z() {
        let conditions = InitialConditions::clustered(Vector3::new(0.1, 0.0, 18.0));
        let mut rng = StdRng::seed_from_u64(0);
        let states = conditions.generate(&mut rng);
        assert_eq!(states.len(), 6);
        for (n, state) in states.iter().enumerate() {
            assert_eq!(state[0], 0.1);
            assert_eq!(state[1], 0.0);
            assert_eq!(state[2], 18.0 + n as f64 * 1e-3);
        }
    }

    #[test]
    fn randomized_states_respect_bounds_and_seed() {
        let conditions = InitialConditions::<f64>::randomized(32);
        let mut rng = StdRng::seed_from_u64(42);
        let states = conditions.generate(&mut rng);
        assert_eq!(states.len(), 32);
        for state in &states {
            assert!(state[0] >= -30.0 && state[0] < 30.0);
            assert!(state[1] >= -30.0 && state[1] < 30.0);
            assert!(state[2] >= 10.0 && state[2] < 40.0);
        }

        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(conditions.generate(&mut rng), states);
        let mut rng = StdRng::seed_from_u64(43);
        assert_ne!(conditions.generate(&mut rng), states);
    }

    #[test]
    fn ensemble_preserves_member_order_and_matches_serial() {
        let problem = OdeProblem::new(Lorenz::<f64>::default());
        let mut rng = StdRng::seed_from_u64(7);
        let states = InitialConditions::randomized(8).generate(&mut rng);
        let ensemble = problem.solve_ensemble(&states, 2.0, 0.01).unwrap();
        assert_eq!(ensemble.len(), 8);
        for (member, state) in ensemble.iter().zip(&states) {
            assert_eq!(member.initial_state, *state);
            let serial = problem.sample(*state, 2.0, 0.01).unwrap();
            assert_eq!(member.trajectory, serial);
        }
        let mut count = 0;
        for member in ensemble {
            assert_eq!(member.trajectory.len(), 200);
            count += 1;
        }
        assert_eq!(count, 8);
    }

    #[test]
    fn empty_input_gives_an_empty_ensemble() {
        let problem = OdeProblem::new(Lorenz::<f64>::default());
        let ensemble = problem.solve_ensemble(&[], 1.0, 0.1).unwrap();
        assert!(ensemble.is_empty());
    }

    #[test]
    fn invalid_grid_fails_the_whole_ensemble() {
        let problem = OdeProblem::new(Lorenz::<f64>::default());
        let states = [Vector3::new(1.0, 1.0, 1.0), Vector3::new(2.0, 2.0, 2.0)];
        let result = problem.solve_ensemble(&states, 1.0, 2.0);
        assert!(matches!(
            result,
            Err(AttractorError::OdeSolverError(
                OdeSolverError::InvalidStep { .. }
            ))
        ));
    }

    #[test]
    fn cancelled_token_aborts_the_ensemble() {
        let problem = OdeProblem::new(Lorenz::<f64>::default());
        let states = [Vector3::new(1.0, 1.0, 1.0); 4];
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = problem.solve_ensemble_with_cancel(&states, 1.0, 0.1, &cancel);
        assert!(matches!(result, Err(AttractorError::Cancelled)));
    }

    #[test]
    fn cancelling_mid_flight_stops_workers() {
        let problem = OdeProblem::new(Lorenz::<f64>::default());
        let cancel = CancelToken::new();
        let worker = {
            let problem = problem.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                let states = [Vector3::new(1.0, 1.0, 1.0); 4];
                problem.solve_ensemble_with_cancel(&states, 10_000.0, 1.0, &cancel)
            })
        };
        cancel.cancel();
        let result = worker.join().unwrap();
        assert!(matches!(result, Err(AttractorError::Cancelled)));
    }
}
