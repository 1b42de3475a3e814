mod max;
mod min;
mod prod;
mod sum;

pub use max::*;
pub use min::*;
pub use prod::*;
pub use sum::*;

/// An associative combination with a neutral element, usable by
/// [reduce_with](crate::reduce_with) and [transform_reduce_with](crate::transform_reduce_with).
pub trait ReduceInstruction<T>: Send + Sync {
    /// Neutral element of [combine](ReduceInstruction::combine).
    fn null_value() -> T;

    /// Combines two values.
    fn combine(lhs: T, rhs: T) -> T;
}
