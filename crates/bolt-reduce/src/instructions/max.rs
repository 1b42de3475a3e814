use super::ReduceInstruction;
use num_traits::Bounded;

/// Largest element. An empty sequence yields the smallest value of the type.
#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl<T: Bounded + PartialOrd> ReduceInstruction<T> for Max {
    fn null_value() -> T {
        T::min_value()
    }

    fn combine(lhs: T, rhs: T) -> T {
        if rhs > lhs {
            rhs
        } else {
            lhs
        }
    }
}
