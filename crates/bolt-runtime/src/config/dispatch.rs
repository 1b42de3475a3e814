use super::logger::{LogLevel, LoggerConfig};
use crate::BoltError;
use core::str::FromStr;

/// Configuration of how algorithms pick an execution strategy.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DispatchConfig {
    /// Run mode of the default execution context.
    #[serde(default)]
    pub run_mode: RunMode,

    /// Ranges shorter than this run serially under [RunMode::Automatic].
    #[serde(default = "default_multicore_threshold")]
    pub multicore_threshold: usize,

    /// Ranges at least this long run on the accelerator under [RunMode::Automatic].
    #[serde(default = "default_accelerator_threshold")]
    pub accelerator_threshold: usize,

    /// What to do when the accelerator is picked automatically but none is available.
    #[serde(default)]
    pub accelerator_fallback: AcceleratorFallback,

    /// How the calling thread waits for accelerator launches.
    #[serde(default)]
    pub wait_mode: WaitMode,

    /// Which accelerator the default execution context acquires.
    #[serde(default)]
    pub accelerator: AcceleratorKind,

    /// Logger for dispatch decisions.
    #[serde(default)]
    pub logger: LoggerConfig<DispatchLogLevel>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            multicore_threshold: default_multicore_threshold(),
            accelerator_threshold: default_accelerator_threshold(),
            accelerator_fallback: AcceleratorFallback::default(),
            wait_mode: WaitMode::default(),
            accelerator: AcceleratorKind::default(),
            logger: LoggerConfig::default(),
        }
    }
}

fn default_multicore_threshold() -> usize {
    4096
}

fn default_accelerator_threshold() -> usize {
    65536
}

/// Run mode of an execution context.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum RunMode {
    /// Pick the strategy from the number of elements.
    #[default]
    #[serde(rename = "auto")]
    Automatic,
    /// Always launch on the accelerator.
    #[serde(rename = "accelerator")]
    Accelerator,
    /// Always fan out over the host thread pool.
    #[serde(rename = "multicore")]
    MultiCore,
    /// Always run on the calling thread.
    #[serde(rename = "serial")]
    Serial,
}

impl FromStr for RunMode {
    type Err = BoltError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "auto" | "automatic" => Ok(Self::Automatic),
            "accelerator" | "opencl" | "gpu" => Ok(Self::Accelerator),
            "multicore" | "multicore_cpu" => Ok(Self::MultiCore),
            "serial" | "serial_cpu" => Ok(Self::Serial),
            other => Err(BoltError::configuration(format!(
                "unknown run mode `{other}`, expected one of auto, accelerator, multicore, serial"
            ))),
        }
    }
}

/// Policy applied when [RunMode::Automatic] selects the accelerator but the context has none.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum AcceleratorFallback {
    /// Run on the host thread pool.
    #[default]
    #[serde(rename = "multicore")]
    MultiCore,
    /// Run on the calling thread.
    #[serde(rename = "serial")]
    Serial,
    /// Fail with a configuration error.
    #[serde(rename = "error")]
    Error,
}

/// How the calling thread waits for an accelerator launch to complete.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum WaitMode {
    /// Block until the workers signal completion.
    #[default]
    #[serde(rename = "block")]
    Block,
    /// Busy-poll for completion.
    #[serde(rename = "spin")]
    Spin,
    /// Poll for completion, yielding the thread between polls.
    #[serde(rename = "yield")]
    Yield,
}

/// Accelerator acquired by the default execution context.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum AcceleratorKind {
    /// The host device, emulating tiles on worker threads.
    #[default]
    #[serde(rename = "host")]
    Host,
    /// No accelerator.
    #[serde(rename = "none")]
    None,
}

/// Verbosity of the dispatch logger.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum DispatchLogLevel {
    /// Nothing is logged.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,
    /// The strategy chosen for every call.
    #[serde(rename = "basic")]
    Basic,
    /// Strategies, launch shapes and transfers.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for DispatchLogLevel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_from_str() {
        assert_eq!("serial".parse::<RunMode>(), Ok(RunMode::Serial));
        assert_eq!("MultiCore".parse::<RunMode>(), Ok(RunMode::MultiCore));
        assert_eq!("auto".parse::<RunMode>(), Ok(RunMode::Automatic));
        assert!(matches!(
            "fpga".parse::<RunMode>(),
            Err(BoltError::Configuration { .. })
        ));
    }

    #[test]
    fn dispatch_section_uses_defaults_for_missing_fields() {
        let config: DispatchConfig = toml::from_str(
            r#"
            run_mode = "serial"
            accelerator_fallback = "error"
            "#,
        )
        .unwrap();

        assert_eq!(config.run_mode, RunMode::Serial);
        assert_eq!(config.accelerator_fallback, AcceleratorFallback::Error);
        assert_eq!(config.multicore_threshold, 4096);
        assert_eq!(config.accelerator_threshold, 65536);
        assert_eq!(config.wait_mode, WaitMode::Block);
    }
}
