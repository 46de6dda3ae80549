use std::marker::PhantomData;

use nalgebra::Vector3;

use crate::scalar::Scalar;

/// A point in phase space: `(x, y, z)`.
pub type State<T> = Vector3<T>;

/// Right-hand side of a first-order ODE in three dimensions,
/// `dy/dt = f(t, y)`.
///
/// Implementations must be pure and total: the same `(t, y)` always produces
/// the same derivative, and non-finite inputs flow through IEEE float
/// arithmetic rather than being rejected.
pub trait VectorField {
    type T: Scalar;

    /// Evaluate the derivative at time `t` and position `y`, writing it into
    /// `dydt`.
    fn rhs(&self, t: Self::T, y: &State<Self::T>, dydt: &mut State<Self::T>);
}

/// Adapter implementing [VectorField] for a plain closure.
pub struct ClosureField<T, F>
where
    T: Scalar,
    F: Fn(T, &State<T>, &mut State<T>),
{
    func: F,
    _phantom: PhantomData<T>,
}

impl<T, F> ClosureField<T, F>
where
    T: Scalar,
    F: Fn(T, &State<T>, &mut State<T>),
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> VectorField for ClosureField<T, F>
where
    T: Scalar,
    F: Fn(T, &State<T>, &mut State<T>),
{
    type T = T;

    fn rhs(&self, t: T, y: &State<T>, dydt: &mut State<T>) {
        (self.func)(t, y, dydt)
    }
}
