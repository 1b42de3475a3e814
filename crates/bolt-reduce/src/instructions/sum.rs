use super::ReduceInstruction;
use num_traits::Zero;

/// Sum of the elements, zero for an empty sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl<T: Zero> ReduceInstruction<T> for Sum {
    fn null_value() -> T {
        T::zero()
    }

    fn combine(lhs: T, rhs: T) -> T {
        lhs + rhs
    }
}
