use crate::{
    client::ComputeClient,
    config::{
        logger::Logger, AcceleratorFallback, AcceleratorKind, DispatchLogLevel, GlobalConfig,
        LaunchConfig, RunMode, WaitMode,
    },
    BoltError,
};
use core::fmt::Display;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc, OnceLock};

static DEFAULT_CONTROL: OnceLock<Control> = OnceLock::new();

/// Strategy executing one algorithm call, resolved once per call by [Control::resolve].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionStrategy {
    /// Tiled kernels on the accelerator.
    Accelerator,
    /// One partition per thread of the host pool.
    MultiCore,
    /// A single fold on the calling thread.
    Serial,
}

impl Display for ExecutionStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ExecutionStrategy::Accelerator => f.write_str("accelerator"),
            ExecutionStrategy::MultiCore => f.write_str("multicore"),
            ExecutionStrategy::Serial => f.write_str("serial"),
        }
    }
}

/// Execution context of Bolt algorithms.
///
/// A control holds the accelerator client, the host thread pool and the policy deciding which
/// of them runs a call. The process wide default is created on first use from the
/// [global configuration](GlobalConfig) and never changes. Other controls start as a copy of
/// the default and are tuned through their setters:
///
/// ```
/// use bolt_runtime::{Control, RunMode};
///
/// let mut ctl = Control::new();
/// ctl.set_force_run_mode(RunMode::Serial);
///
/// assert_eq!(ctl.run_mode(), RunMode::Serial);
/// ```
#[derive(Clone)]
pub struct Control {
    client: Option<ComputeClient>,
    pool: Option<Arc<ThreadPool>>,
    run_mode: RunMode,
    wait_mode: WaitMode,
    multicore_threshold: usize,
    accelerator_threshold: usize,
    accelerator_fallback: AcceleratorFallback,
    launch: LaunchConfig,
    logger: Arc<spin::Mutex<Logger>>,
}

impl core::fmt::Debug for Control {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Control")
            .field("client", &self.client)
            .field("num_threads", &self.num_threads())
            .field("run_mode", &self.run_mode)
            .field("wait_mode", &self.wait_mode)
            .field("multicore_threshold", &self.multicore_threshold)
            .field("accelerator_threshold", &self.accelerator_threshold)
            .field("accelerator_fallback", &self.accelerator_fallback)
            .field("launch", &self.launch)
            .finish()
    }
}

impl Default for Control {
    fn default() -> Self {
        Self::new()
    }
}

impl Control {
    /// The process wide default context, created on first use.
    ///
    /// An invalid global configuration is reported and replaced by the defaults.
    pub fn get_default() -> &'static Control {
        DEFAULT_CONTROL.get_or_init(|| {
            let config = GlobalConfig::get();

            Self::from_config(&config).unwrap_or_else(|err| {
                log::error!("Invalid Bolt configuration, falling back to defaults: {err}");
                Self::build(&GlobalConfig::default(), None)
            })
        })
    }

    /// An owned copy of the default context.
    pub fn new() -> Self {
        Self::get_default().clone()
    }

    /// Creates a context from an explicit configuration.
    pub fn from_config(config: &GlobalConfig) -> Result<Self, BoltError> {
        config.launch.validate()?;

        let pool = match config.multicore.num_threads {
            Some(threads) => Some(build_pool(threads)?),
            None => None,
        };

        Ok(Self::build(config, pool))
    }

    fn build(config: &GlobalConfig, pool: Option<Arc<ThreadPool>>) -> Self {
        let client = match config.dispatch.accelerator {
            AcceleratorKind::Host => host_client(),
            AcceleratorKind::None => None,
        };

        Self {
            client,
            pool,
            run_mode: config.dispatch.run_mode,
            wait_mode: config.dispatch.wait_mode,
            multicore_threshold: config.dispatch.multicore_threshold,
            accelerator_threshold: config.dispatch.accelerator_threshold,
            accelerator_fallback: config.dispatch.accelerator_fallback,
            launch: config.launch.clone(),
            logger: Arc::new(spin::Mutex::new(Logger::from_config(
                &config.dispatch.logger,
            ))),
        }
    }

    /// Replaces the accelerator with the given client.
    pub fn with_client(mut self, client: ComputeClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Removes the accelerator from this context.
    pub fn without_accelerator(mut self) -> Self {
        self.client = None;
        self
    }

    /// Uses a dedicated pool of `threads` host threads.
    pub fn with_threads(mut self, threads: usize) -> Result<Self, BoltError> {
        self.pool = Some(build_pool(threads)?);
        Ok(self)
    }

    /// Replaces the dispatch logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Arc::new(spin::Mutex::new(logger));
        self
    }

    /// Forces every call made with this context to use the given run mode.
    pub fn set_force_run_mode(&mut self, run_mode: RunMode) {
        self.run_mode = run_mode;
    }

    /// Current run mode.
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// Sets how launches are waited for.
    pub fn set_wait_mode(&mut self, wait_mode: WaitMode) {
        self.wait_mode = wait_mode;
    }

    /// How launches are waited for.
    pub fn wait_mode(&self) -> WaitMode {
        self.wait_mode
    }

    /// Sets the length from which automatic dispatch leaves the calling thread.
    pub fn set_multicore_threshold(&mut self, threshold: usize) {
        self.multicore_threshold = threshold;
    }

    /// Length from which automatic dispatch leaves the calling thread.
    pub fn multicore_threshold(&self) -> usize {
        self.multicore_threshold
    }

    /// Sets the length from which automatic dispatch uses the accelerator.
    pub fn set_accelerator_threshold(&mut self, threshold: usize) {
        self.accelerator_threshold = threshold;
    }

    /// Length from which automatic dispatch uses the accelerator.
    pub fn accelerator_threshold(&self) -> usize {
        self.accelerator_threshold
    }

    /// Sets the policy used when automatic dispatch picks a missing accelerator.
    pub fn set_accelerator_fallback(&mut self, fallback: AcceleratorFallback) {
        self.accelerator_fallback = fallback;
    }

    /// Policy used when automatic dispatch picks a missing accelerator.
    pub fn accelerator_fallback(&self) -> AcceleratorFallback {
        self.accelerator_fallback
    }

    /// Overrides the number of compute units used to size launches.
    pub fn set_compute_units(&mut self, compute_units: u32) -> Result<(), BoltError> {
        self.update_launch(|launch| launch.compute_units = Some(compute_units))
    }

    /// Sets the number of tiles launched per compute unit.
    pub fn set_tiles_per_compute_unit(&mut self, tiles: u32) -> Result<(), BoltError> {
        self.update_launch(|launch| launch.tiles_per_compute_unit = tiles)
    }

    /// Overrides the number of lanes per tile. Must be a power of two.
    pub fn set_tile_dim(&mut self, tile_dim: u32) -> Result<(), BoltError> {
        self.update_launch(|launch| launch.tile_dim = Some(tile_dim))
    }

    /// Launch settings of this context.
    pub fn launch_config(&self) -> &LaunchConfig {
        &self.launch
    }

    /// Whether an accelerator is available.
    pub fn has_accelerator(&self) -> bool {
        self.client.is_some()
    }

    /// The accelerator client.
    pub fn client(&self) -> Result<&ComputeClient, BoltError> {
        self.client
            .as_ref()
            .ok_or_else(|| BoltError::configuration("no accelerator is available in this context"))
    }

    /// The dedicated host pool, `None` when calls run on the global rayon pool.
    pub fn pool(&self) -> Option<&ThreadPool> {
        self.pool.as_deref()
    }

    /// Number of threads of the host pool.
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Runs `op` inside the host pool of this context.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Picks the strategy executing a call over `len` elements.
    pub fn resolve(&self, len: usize) -> Result<ExecutionStrategy, BoltError> {
        let strategy = match self.run_mode {
            RunMode::Serial => ExecutionStrategy::Serial,
            RunMode::MultiCore => ExecutionStrategy::MultiCore,
            RunMode::Accelerator => {
                if self.client.is_none() {
                    return Err(BoltError::configuration(
                        "the accelerator run mode is forced but no accelerator is available",
                    ));
                }
                ExecutionStrategy::Accelerator
            }
            RunMode::Automatic => {
                if len < self.multicore_threshold {
                    ExecutionStrategy::Serial
                } else if len < self.accelerator_threshold {
                    ExecutionStrategy::MultiCore
                } else if self.client.is_some() {
                    ExecutionStrategy::Accelerator
                } else {
                    match self.accelerator_fallback {
                        AcceleratorFallback::MultiCore => ExecutionStrategy::MultiCore,
                        AcceleratorFallback::Serial => ExecutionStrategy::Serial,
                        AcceleratorFallback::Error => {
                            return Err(BoltError::configuration(format!(
                                "{len} elements select the accelerator but none is available"
                            )))
                        }
                    }
                }
            }
        };

        log::debug!("Dispatching {len} elements with the {strategy} strategy");
        self.log(DispatchLogLevel::Basic, || {
            format!("[{:?}] len={len} strategy={strategy}", self.run_mode)
        });

        Ok(strategy)
    }

    /// Sends a message to the dispatch logger when it listens at `level`.
    ///
    /// The message is only formatted when it is logged.
    pub fn log<S: Display, F: FnOnce() -> S>(&self, level: DispatchLogLevel, msg: F) {
        let mut logger = self.logger.lock();

        if logger.enabled(level) {
            logger.log_dispatch(level, &msg());
        }
    }

    fn update_launch<F: FnOnce(&mut LaunchConfig)>(&mut self, update: F) -> Result<(), BoltError> {
        let mut launch = self.launch.clone();
        update(&mut launch);
        launch.validate()?;
        self.launch = launch;
        Ok(())
    }
}

fn build_pool(threads: usize) -> Result<Arc<ThreadPool>, BoltError> {
    if threads == 0 {
        return Err(BoltError::configuration("a thread pool needs at least one thread"));
    }

    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("bolt-worker-{index}"))
        .build()
        .map(Arc::new)
        .map_err(|err| BoltError::configuration(err.to_string()))
}

cfg_if::cfg_if! {
    if #[cfg(feature = "host")] {
        fn host_client() -> Option<ComputeClient> {
            Some(crate::host::HostRuntime::client(&Default::default()))
        }
    } else {
        fn host_client() -> Option<ComputeClient> {
            log::warn!("The host accelerator isn't compiled in, running without accelerator");
            None
        }
    }
}
