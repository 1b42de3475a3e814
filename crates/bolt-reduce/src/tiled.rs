use bolt_runtime::{
    id::KernelId,
    kernel::{TileKernel, TileScope},
    server::LaunchError,
};
use bytemuck::Pod;
use core::marker::PhantomData;

/// Tiled transform-reduce over one input of `len` elements of `T`.
///
/// Lane `i` of tile `t` folds the elements at `t * tile_dim + i`, then every
/// `tile_dim * tile_count` elements after it, starting from `init`. The lanes of a tile are
/// then combined in shared memory by halving the number of active lanes after each barrier,
/// and lane 0 writes the partial result of the tile to its output window.
#[derive(new)]
pub struct TransformReduceKernel<'a, T, O, F, R> {
    len: usize,
    tile_dim: u32,
    init: O,
    transform: &'a F,
    reduce: &'a R,
    #[new(default)]
    _elem: PhantomData<fn(T)>,
}

impl<T, O, F, R> TileKernel for TransformReduceKernel<'_, T, O, F, R>
where
    T: Pod,
    O: Pod + Send + Sync,
    F: Fn(T) -> O + Sync,
    R: Fn(O, O) -> O + Sync,
{
    fn id(&self) -> KernelId {
        KernelId::new::<Self>().info(format_args!("w={}", self.tile_dim))
    }

    fn tile_dim(&self) -> u32 {
        self.tile_dim
    }

    fn execute(&self, scope: &mut TileScope<'_>) -> Result<(), LaunchError> {
        let elem_size = core::mem::size_of::<T>();
        let input = scope.input(0)?;

        if input.len() < self.len * elem_size {
            return Err(LaunchError::InvalidBindings {
                reason: format!(
                    "input holds {} bytes, {} elements need {}",
                    input.len(),
                    self.len,
                    self.len * elem_size
                ),
            });
        }

        let stride = self.tile_dim as usize * scope.tile_count() as usize;
        let mut shared = scope.shared_memory::<O>(self.tile_dim as usize)?;

        for lane in scope.lanes() {
            let mut acc = self.init;
            let mut pos = scope.absolute_pos(lane);

            while pos < self.len {
                let start = pos * elem_size;
                let value: T = bytemuck::pod_read_unaligned(&input[start..start + elem_size]);
                acc = (self.reduce)(acc, (self.transform)(value));
                pos += stride;
            }

            shared[lane as usize] = acc;
        }
        scope.sync_units();

        let mut step = self.tile_dim as usize / 2;
        while step > 0 {
            for lane in 0..step {
                shared[lane] = (self.reduce)(shared[lane], shared[lane + step]);
            }
            scope.sync_units();
            step /= 2;
        }

        let partial = bytemuck::bytes_of(&shared[0]);
        let output = scope.output();

        if output.len() != partial.len() {
            return Err(LaunchError::InvalidBindings {
                reason: format!(
                    "output window of {} bytes can't hold a partial result of {} bytes",
                    output.len(),
                    partial.len()
                ),
            });
        }

        output.copy_from_slice(partial);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_tiles<K: TileKernel>(
        kernel: &K,
        tile_count: u32,
        input: &[u8],
        window: usize,
    ) -> Vec<u8> {
        let inputs = [input];
        let mut output = vec![0u8; window * tile_count as usize];

        for (pos, chunk) in output.chunks_mut(window).enumerate() {
            let mut scope =
                TileScope::new(pos as u32, kernel.tile_dim(), tile_count, &inputs, chunk, 1024);
            kernel.execute(&mut scope).unwrap();
            assert_eq!(scope.phase(), kernel.tile_dim().ilog2() + 1);
        }

        output
    }

    #[test]
    fn partials_cover_every_element_once() {
        let data = (0..100u32).collect::<Vec<_>>();
        let transform = |x: u32| x as u64;
        let reduce = |a: u64, b: u64| a + b;
        let kernel =
            TransformReduceKernel::<u32, _, _, _>::new(data.len(), 8, 0u64, &transform, &reduce);

        let output = run_tiles(&kernel, 3, bytemuck::cast_slice(&data), 8);
        let partials: Vec<u64> = bytemuck::pod_collect_to_vec(&output[..]);

        assert_eq!(partials.len(), 3);
        assert_eq!(partials.iter().sum::<u64>(), 4950);
    }

    #[test]
    fn lanes_without_elements_keep_init() {
        let data = [3i32, -1, 7];
        let transform = |x: i32| x;
        let reduce = |a: i32, b: i32| a.max(b);
        let kernel = TransformReduceKernel::<i32, _, _, _>::new(
            data.len(),
            16,
            i32::MIN,
            &transform,
            &reduce,
        );

        let output = run_tiles(&kernel, 1, bytemuck::cast_slice(&data), 4);

        assert_eq!(bytemuck::pod_read_unaligned::<i32>(&output), 7);
    }

    #[test]
    fn short_input_is_rejected() {
        let transform = |x: u32| x;
        let reduce = |a: u32, b: u32| a + b;
        let kernel = TransformReduceKernel::<u32, _, _, _>::new(8, 4, 0u32, &transform, &reduce);
        let input = [0u8; 16];
        let inputs = [&input[..]];
        let mut output = [0u8; 4];
        let mut scope = TileScope::new(0, 4, 1, &inputs, &mut output, 1024);

        assert!(matches!(
            kernel.execute(&mut scope),
            Err(LaunchError::InvalidBindings { .. })
        ));
    }

    #[test]
    fn id_carries_the_tile_width() {
        let transform = |x: u32| x;
        let reduce = |a: u32, b: u32| a + b;
        let kernel = TransformReduceKernel::<u32, _, _, _>::new(8, 32, 0u32, &transform, &reduce);

        assert_eq!(kernel.id().to_string(), "TransformReduceKernel(w=32)");
    }
}
