use std::fmt::Display;

use nalgebra::RealField;
use num_traits::{FromPrimitive, Pow, Signed, ToPrimitive};

/// Floating point scalar used throughout the crate.
///
/// Implemented for `f32` and `f64`. The `Send + Sync` bounds let ensembles
/// integrate in parallel without extra bounds at every call site.
pub trait Scalar:
    RealField
    + Signed
    + Pow<Self, Output = Self>
    + FromPrimitive
    + ToPrimitive
    + Display
    + Copy
    + PartialOrd
    + Send
    + Sync
{
    const EPSILON: Self;

    fn is_nan(self) -> bool;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;

    fn is_nan(self) -> bool {
        self.is_nan()
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;

    fn is_nan(self) -> bool {
        self.is_nan()
    }
}
