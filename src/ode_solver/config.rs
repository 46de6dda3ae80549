use crate::scalar::Scalar;

/// Step-control limits for the explicit Runge-Kutta solver.
#[derive(Debug, Clone)]
pub struct ExplicitRkConfig<T> {
    pub minimum_timestep: T,
    pub maximum_error_test_failures: usize,
    pub maximum_timestep_growth: T,
    pub minimum_timestep_shrink: T,
}

impl<T: Scalar> Default for ExplicitRkConfig<T> {
    fn default() -> Self {
        Self {
            minimum_timestep: T::from_f64(1e-13).unwrap(),
            maximum_error_test_failures: 40,
            maximum_timestep_growth: T::from_f64(10.0).unwrap(),
            minimum_timestep_shrink: T::from_f64(0.2).unwrap(),
        }
    }
}
