use bolt_runtime::Control;
use rayon::prelude::*;

/// Folds `data` on the calling thread.
pub(crate) fn serial<T, O, F, R>(data: &[T], transform: &F, init: O, reduce: &R) -> O
where
    T: Copy,
    F: Fn(T) -> O,
    R: Fn(O, O) -> O,
{
    data.iter().fold(init, |acc, value| reduce(acc, transform(*value)))
}

/// Folds one contiguous partition of `data` per thread of the control's pool, then combines
/// the partial results in partition order.
pub(crate) fn multicore<T, O, F, R>(
    ctl: &Control,
    data: &[T],
    transform: &F,
    init: O,
    reduce: &R,
) -> O
where
    T: Copy + Sync,
    O: Copy + Send + Sync,
    F: Fn(T) -> O + Sync,
    R: Fn(O, O) -> O + Sync,
{
    let chunk_size = data.len().div_ceil(ctl.num_threads().max(1)).max(1);

    let partials = ctl.install(|| {
        data.par_chunks(chunk_size)
            .map(|chunk| serial(chunk, transform, init, reduce))
            .collect::<Vec<O>>()
    });

    log::trace!("Combining {} partitions of {chunk_size} elements", partials.len());

    partials.into_iter().reduce(reduce).unwrap_or(init)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_folds_from_init() {
        let data = [1u32, 2, 3, 4];

        assert_eq!(serial(&data, &|x| x * 2, 100, &|a, b| a + b), 120);
        assert_eq!(serial(&[] as &[u32], &|x| x, 7, &|a, b| a + b), 7);
    }

    #[test]
    fn multicore_keeps_partition_order() {
        let ctl = Control::new().with_threads(3).unwrap();
        let data = (0..10u32).collect::<Vec<_>>();

        // Concatenating decimal digits is associative but not commutative.
        let digits = multicore(&ctl, &data, &|x| x as u64, 0, &|a, b| {
            let shift = if b == 0 { 10 } else { 10u64.pow(b.ilog10() + 1) };
            a * shift + b
        });

        assert_eq!(digits, 123456789);
    }

    #[test]
    fn multicore_matches_serial() {
        let ctl = Control::new().with_threads(4).unwrap();
        let data = (0..10_000u64).collect::<Vec<_>>();

        assert_eq!(
            multicore(&ctl, &data, &|x| x * 3, 0, &|a, b| a + b),
            serial(&data, &|x| x * 3, 0, &|a, b| a + b),
        );
    }
}
