use super::ReduceInstruction;
use num_traits::Bounded;

/// Smallest element. An empty sequence yields the largest value of the type.
#[derive(Debug, Clone, Copy, Default)]
pub struct Min;

impl<T: Bounded + PartialOrd> ReduceInstruction<T> for Min {
    fn null_value() -> T {
        T::max_value()
    }

    fn combine(lhs: T, rhs: T) -> T {
        if rhs < lhs {
            rhs
        } else {
            lhs
        }
    }
}
