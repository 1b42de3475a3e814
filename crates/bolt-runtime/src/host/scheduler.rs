use crate::{
    config::WaitMode,
    kernel::{TileKernel, TileScope},
    server::LaunchError,
};
use std::sync::mpsc::{self, TryRecvError};

/// Distributes the tiles of a launch over host worker threads.
#[derive(Debug)]
pub struct Scheduler {
    workers: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|parallelism| parallelism.get())
            .unwrap_or(1);

        Self::new(workers)
    }
}

struct TileBatch<'a> {
    first_tile: u32,
    tile_count: u32,
    window: usize,
    inputs: &'a [&'a [u8]],
    output: &'a mut [u8],
    max_shared_memory_size: usize,
}

impl Scheduler {
    /// Scheduler using `workers` threads, at least one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `tile_count` tiles of the kernel. Tile `t` owns the `t`-th window of `output`,
    /// whose length must be a non zero multiple of `tile_count`.
    ///
    /// Contiguous groups of tiles are handed to each worker. The calling thread then counts the
    /// completion messages, waiting the way `wait` asks, and returns the first error reported.
    pub fn dispatch_execute(
        &self,
        kernel: &dyn TileKernel,
        tile_count: u32,
        inputs: &[&[u8]],
        output: &mut [u8],
        max_shared_memory_size: usize,
        wait: WaitMode,
    ) -> Result<(), LaunchError> {
        if tile_count == 0 {
            return Ok(());
        }

        let window = output.len() / tile_count as usize;
        if window == 0 || window * tile_count as usize != output.len() {
            return Err(LaunchError::InvalidBindings {
                reason: format!(
                    "an output of {} bytes can't be split over {tile_count} tiles",
                    output.len()
                ),
            });
        }

        let tiles_per_worker = (tile_count as usize).div_ceil(self.workers);

        std::thread::scope(|scope| {
            let (send, receive) = mpsc::channel();
            let mut msg_count = 0;

            for (index, chunk) in output.chunks_mut(window * tiles_per_worker).enumerate() {
                let batch = TileBatch {
                    first_tile: (index * tiles_per_worker) as u32,
                    tile_count,
                    window,
                    inputs,
                    output: chunk,
                    max_shared_memory_size,
                };
                let send = send.clone();

                msg_count += 1;
                scope.spawn(move || {
                    // The receiver stays alive until every message is counted.
                    let _ = send.send(batch.run(kernel));
                });
            }
            drop(send);

            wait_completion(&receive, msg_count, wait)
        })
    }
}

impl TileBatch<'_> {
    fn run(self, kernel: &dyn TileKernel) -> Result<(), LaunchError> {
        let tile_dim = kernel.tile_dim();

        for (index, window) in self.output.chunks_mut(self.window).enumerate() {
            let mut scope = TileScope::new(
                self.first_tile + index as u32,
                tile_dim,
                self.tile_count,
                self.inputs,
                window,
                self.max_shared_memory_size,
            );
            kernel.execute(&mut scope)?;
        }

        Ok(())
    }
}

fn wait_completion(
    receive: &mpsc::Receiver<Result<(), LaunchError>>,
    mut msg_count: usize,
    wait: WaitMode,
) -> Result<(), LaunchError> {
    let mut result = Ok(());

    while msg_count > 0 {
        let msg = match wait {
            WaitMode::Block => receive.recv().ok(),
            WaitMode::Spin | WaitMode::Yield => loop {
                match receive.try_recv() {
                    Ok(msg) => break Some(msg),
                    Err(TryRecvError::Disconnected) => break None,
                    Err(TryRecvError::Empty) if wait == WaitMode::Yield => {
                        std::thread::yield_now()
                    }
                    Err(TryRecvError::Empty) => core::hint::spin_loop(),
                }
            },
        };

        // A worker panicked, the scope propagates it when joining.
        let Some(msg) = msg else {
            break;
        };

        msg_count -= 1;
        if result.is_ok() {
            result = msg;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::KernelId;

    /// Writes its tile position in every byte of its window.
    struct StampTile;

    impl TileKernel for StampTile {
        fn id(&self) -> KernelId {
            KernelId::new::<Self>()
        }

        fn tile_dim(&self) -> u32 {
            4
        }

        fn execute(&self, scope: &mut TileScope<'_>) -> Result<(), LaunchError> {
            let pos = scope.tile_pos() as u8;
            scope.output().fill(pos);
            Ok(())
        }
    }

    struct FailingTile;

    impl TileKernel for FailingTile {
        fn id(&self) -> KernelId {
            KernelId::new::<Self>()
        }

        fn tile_dim(&self) -> u32 {
            4
        }

        fn execute(&self, scope: &mut TileScope<'_>) -> Result<(), LaunchError> {
            if scope.tile_pos() == 5 {
                return Err(LaunchError::Kernel {
                    kernel: self.id().to_string(),
                    reason: "tile 5".into(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn every_tile_writes_its_window() {
        for wait in [WaitMode::Block, WaitMode::Spin, WaitMode::Yield] {
            let scheduler = Scheduler::new(3);
            let mut output = vec![0u8; 14];

            scheduler
                .dispatch_execute(&StampTile, 7, &[], &mut output, 0, wait)
                .unwrap();

            assert_eq!(output, [0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6]);
        }
    }

    #[test]
    fn kernel_failure_is_reported() {
        let scheduler = Scheduler::new(4);
        let mut output = vec![0u8; 8];

        let result = scheduler.dispatch_execute(&FailingTile, 8, &[], &mut output, 0, WaitMode::Block);

        assert!(matches!(result, Err(LaunchError::Kernel { .. })));
    }

    #[test]
    fn output_must_split_evenly() {
        let scheduler = Scheduler::new(2);
        let mut output = vec![0u8; 10];

        let result = scheduler.dispatch_execute(&StampTile, 4, &[], &mut output, 0, WaitMode::Block);

        assert!(matches!(result, Err(LaunchError::InvalidBindings { .. })));
    }
}
