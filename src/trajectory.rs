use crate::field::State;
use crate::scalar::Scalar;

/// A solution sampled on a fixed time grid `0, step, 2 step, ...` relative
/// to the start of the integration.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory<T: Scalar> {
    states: Vec<State<T>>,
    step: T,
}

impl<T: Scalar> Trajectory<T> {
    pub(crate) fn new(states: Vec<State<T>>, step: T) -> Self {
        debug_assert!(!states.is_empty());
        Self { states, step }
    }

    pub fn states(&self) -> &[State<T>] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Spacing of the sample grid.
    pub fn step(&self) -> T {
        self.step
    }

    /// Time of the `i`-th sample.
    pub fn time(&self, i: usize) -> T {
        T::from_usize(i).unwrap() * self.step
    }

    pub fn times(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len()).map(|i| self.time(i))
    }

    pub fn first(&self) -> &State<T> {
        &self.states[0]
    }

    pub fn last(&self) -> &State<T> {
        &self.states[self.states.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, State<T>> {
        self.states.iter()
    }

    /// Position at an arbitrary time, linearly interpolated between the two
    /// neighbouring samples.
    ///
    /// Times outside the sampled range clamp to the first or last sample, so
    /// a caller animating along the trajectory can run its clock freely. A
    /// non-finite `t` yields a non-finite position rather than a panic.
    pub fn position_at_time(&self, t: T) -> State<T> {
        let n = self.states.len();
        if n == 1 || t <= T::zero() {
            return self.states[0];
        }
        if t >= self.time(n - 1) {
            return self.states[n - 1];
        }
        let q = t / self.step;
        let i = q.floor().to_usize().unwrap_or(0).min(n - 2);
        let theta = q - T::from_usize(i).unwrap();
        let a = &self.states[i];
        let b = &self.states[i + 1];
        a + (b - a) * theta
    }
}

impl<'a, T: Scalar> IntoIterator for &'a Trajectory<T> {
    type Item = &'a State<T>;
    type IntoIter = std::slice::Iter<'a, State<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}

#[cfg(test)]
mod test {
    use nalgebra::Vector3;

    use super::*;

    fn ramp() -> Trajectory<f64> {
        let states = (0..5)
            .map(|i| {
                let v = i as f64;
                Vector3::new(v, 2.0 * v, -v)
            })
            .collect();
        Trajectory::new(states, 0.5)
    }

    #[test]
    fn times_match_the_grid() {
        let trajectory = ramp();
        assert_eq!(trajectory.len(), 5);
        assert_eq!(trajectory.step(), 0.5);
        let times: Vec<f64> = trajectory.times().collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn position_at_grid_times_returns_the_samples() {
        let trajectory = ramp();
        for (i, state) in trajectory.iter().enumerate() {
            assert_eq!(trajectory.position_at_time(trajectory.time(i)), *state);
        }
    }

    #[test]
    fn position_midway_is_the_average_of_neighbours() {
        let trajectory = ramp();
        assert_eq!(
            trajectory.position_at_time(0.75),
            Vector3::new(1.5, 3.0, -1.5)
        );
    }

    #[test]
    fn positions_clamp_outside_the_sampled_range() {
        let trajectory = ramp();
        assert_eq!(trajectory.position_at_time(-1.0), *trajectory.first());
        assert_eq!(trajectory.position_at_time(10.0), *trajectory.last());
        assert_eq!(
            trajectory.position_at_time(f64::INFINITY),
            *trajectory.last()
        );

        let single = Trajectory::new(vec![Vector3::new(3.0, 1.0, 4.0)], 0.1);
        assert_eq!(single.position_at_time(7.0), Vector3::new(3.0, 1.0, 4.0));
    }

    #[test]
    fn non_finite_query_times_yield_non_finite_positions() {
        let trajectory = ramp();
        let p = trajectory.position_at_time(f64::NAN);
        assert!(p.iter().all(|v| v.is_nan()));
    }
}
