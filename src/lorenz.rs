use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::field::{State, VectorField};
use crate::scalar::Scalar;

/// Parameters of the Lorenz system.
///
/// [Default] is the classical chaotic set `(sigma, rho, beta) = (10, 28, 8/3)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LorenzParams<T: Scalar> {
    pub sigma: T,
    pub rho: T,
    pub beta: T,
}

impl<T: Scalar> Default for LorenzParams<T> {
    fn default() -> Self {
        Self {
            sigma: T::from_f64(10.0).unwrap(),
            rho: T::from_f64(28.0).unwrap(),
            beta: T::from_f64(8.0 / 3.0).unwrap(),
        }
    }
}

impl<T: Scalar> LorenzParams<T> {
    pub fn new(sigma: T, rho: T, beta: T) -> Self {
        Self { sigma, rho, beta }
    }

    /// Fixed points of the flow: the origin, plus the symmetric pair
    /// `(±sqrt(beta (rho - 1)), ±sqrt(beta (rho - 1)), rho - 1)` once
    /// `rho > 1`.
    pub fn equilibria(&self) -> Vec<State<T>> {
        let mut points = vec![State::zeros()];
        if self.rho > T::one() {
            let z = self.rho - T::one();
            let r = (self.beta * z).sqrt();
            points.push(Vector3::new(r, r, z));
            points.push(Vector3::new(-r, -r, z));
        }
        points
    }

    /// Divergence of the field, constant over phase space. Negative for the
    /// classical parameters: the flow contracts volumes onto the attractor.
    pub fn divergence(&self) -> T {
        -(self.sigma + T::one() + self.beta)
    }
}

/// The Lorenz vector field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Lorenz<T: Scalar> {
    pub params: LorenzParams<T>,
}

impl<T: Scalar> Lorenz<T> {
    pub fn new(params: LorenzParams<T>) -> Self {
        Self { params }
    }
}

impl<T: Scalar> VectorField for Lorenz<T> {
    type T = T;

    fn rhs(&self, _t: T, y: &State<T>, dydt: &mut State<T>) {
        let LorenzParams { sigma, rho, beta } = self.params;
        dydt[0] = sigma * (y[1] - y[0]);
        dydt[1] = y[0] * (rho - y[2]) - y[1];
        dydt[2] = y[0] * y[1] - beta * y[2];
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use super::*;

    #[test]
    fn classical_parameters() {
        insta::assert_yaml_snapshot!(LorenzParams::<f64>::default(), @r###"
        sigma: 10.0
        rho: 28.0
        beta: 2.6666666666666665
        "###);
    }

    #[test]
    fn equilibria_are_stationary() {
        let params = LorenzParams::<f64>::default();
        let field = Lorenz::new(params);
        let points = params.equilibria();
        assert_eq!(points.len(), 3);
        for point in points {
            let mut dydt = Vector3::zeros();
            field.rhs(0.0, &point, &mut dydt);
            assert!(
                dydt.norm() < 1e-12,
                "non-zero derivative {} at {}",
                dydt.norm(),
                point
            );
        }
    }

    #[test]
    fn equilibria_collapse_to_the_origin_below_rho_one() {
        let params = LorenzParams::new(10.0, 0.5, 8.0 / 3.0);
        assert_eq!(params.equilibria(), vec![Vector3::zeros()]);
    }

    #[test]
    fn symmetric_equilibria_sit_at_known_coordinates() {
        let params = LorenzParams::<f64>::default();
        let points = params.equilibria();
        let r = (params.beta * 27.0).sqrt();
        assert_relative_eq!(points[1], Vector3::new(r, r, 27.0), epsilon = 1e-12);
        assert_relative_eq!(points[2], Vector3::new(-r, -r, 27.0), epsilon = 1e-12);
    }

    #[test]
    fn flow_contracts_volumes() {
        let params = LorenzParams::<f64>::default();
        assert_relative_eq!(params.divergence(), -41.0 / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn field_is_time_invariant() {
        let field = Lorenz::<f64>::default();
        let y = Vector3::new(1.5, -2.0, 11.0);
        let mut d0 = Vector3::zeros();
        let mut d1 = Vector3::zeros();
        field.rhs(0.0, &y, &mut d0);
        field.rhs(17.3, &y, &mut d1);
        assert_eq!(d0, d1);
    }

    #[test]
    fn non_finite_inputs_flow_through() {
        let field = Lorenz::<f64>::default();
        let mut dydt = Vector3::zeros();
        field.rhs(0.0, &Vector3::new(f64::NAN, 1.0, 1.0), &mut dydt);
        assert!(dydt[0].is_nan());
        field.rhs(0.0, &Vector3::new(f64::INFINITY, 1.0, 1.0), &mut dydt);
        assert!(dydt[1].is_infinite());
    }
}
