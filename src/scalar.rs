use rand::distributions::uniform::SampleUniform;
use num_traits::{NumAssignOps, Num, NumCast};

use crate::tensor::Gemm;


/// All types that may be stored in a [Tensor](crate::Tensor).
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Inner: PartialEq + Clone + Copy + Send + Sync + std::fmt::Debug {}
impl<T: PartialEq + Clone + Copy + Send + Sync + std::fmt::Debug> Inner for T {}


/// All numeric types.
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Numeric: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum {}
impl<T: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum> Numeric for T {}


/// All signed numeric types.

pub trait Signed: Numeric + num_traits::Signed {}
impl<T: Numeric + num_traits::Signed> Signed for T {}


/// All continuous numeric types a graph can be built over.
///
/// Besides the usual floating point operations, these need a
/// matrix multiply kernel, which is provided for `f32` and `f64`.

pub trait Real: Signed + num_traits::real::Real + SampleUniform + Gemm {}
impl<T: Signed + num_traits::real::Real + SampleUniform + Gemm> Real for T {}
