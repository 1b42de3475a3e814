use super::ReduceInstruction;
use num_traits::One;

/// Product of the elements, one for an empty sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prod;

impl<T: One> ReduceInstruction<T> for Prod {
    fn null_value() -> T {
        T::one()
    }

    fn combine(lhs: T, rhs: T) -> T {
        lhs * rhs
    }
}
