use super::{DispatchConfig, DispatchLogLevel, LaunchConfig, MultiCoreConfig, RunMode};
use std::sync::Arc;

/// Static mutex holding the global configuration, initialized as `None`.
static BOLT_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Represents the global configuration for Bolt, combining dispatch, launch and thread pool
/// settings.
///
/// The default execution context is built from it.
#[derive(Default, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration for strategy selection.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Configuration for accelerator launches.
    #[serde(default)]
    pub launch: LaunchConfig,

    /// Configuration for the host thread pool.
    #[serde(default)]
    pub multicore: MultiCoreConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `bolt.toml` or `Bolt.toml` in the
    /// current directory or its parents, then applies the environment overrides. If no file is
    /// found, a default configuration is used.
    pub fn get() -> Arc<Self> {
        let mut state = BOLT_GLOBAL_CONFIG.lock();

        if let Some(config) = state.as_ref() {
            return config.clone();
        }

        cfg_if::cfg_if! {
            if #[cfg(feature = "std")] {
                let config = Self::from_current_dir().override_from_env();
            } else {
                let config = Self::default().override_from_env();
            }
        }

        let config = Arc::new(config);
        *state = Some(config.clone());
        config
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`. Attempting
    /// to set the configuration after it has been initialized will cause a panic.
    pub fn set(config: Self) {
        let mut state = BOLT_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    #[cfg(feature = "std")]
    /// Save the current configuration to the provided file path.
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        std::fs::write(path, content)
    }

    /// Overrides configuration fields based on environment variables.
    ///
    /// - `BOLT_RUN_MODE`: `auto`, `accelerator`, `multicore` or `serial`.
    /// - `BOLT_NUM_THREADS`: size of a dedicated host thread pool.
    /// - `BOLT_DEBUG_LOG`: `stdout`, `stderr`, `1` for `/tmp/bolt.log`, `0` to disable, or a
    ///   file path.
    pub fn override_from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("BOLT_RUN_MODE") {
            match val.parse::<RunMode>() {
                Ok(mode) => self.dispatch.run_mode = mode,
                Err(err) => log::warn!("Ignoring BOLT_RUN_MODE: {err}"),
            }
        }

        if let Ok(val) = std::env::var("BOLT_NUM_THREADS") {
            match val.parse::<usize>() {
                Ok(0) | Err(_) => log::warn!("Ignoring BOLT_NUM_THREADS={val}"),
                Ok(threads) => self.multicore.num_threads = Some(threads),
            }
        }

        if let Ok(val) = std::env::var("BOLT_DEBUG_LOG") {
            let logger = &mut self.dispatch.logger;
            logger.level = DispatchLogLevel::Full;

            match val.as_str() {
                "stdout" => logger.stdout = true,
                "stderr" => logger.stderr = true,
                "1" | "true" => logger.file = Some("/tmp/bolt.log".into()),
                "0" | "false" => logger.level = DispatchLogLevel::Disabled,
                file_path => logger.file = Some(file_path.into()),
            }
        }

        self
    }

    // Loads configuration from `bolt.toml` or `Bolt.toml` in the current directory or its parents.
    //
    // Traverses up the directory tree until a configuration file is found or the root is reached.
    // A file that fails to parse is reported and skipped.
    #[cfg(feature = "std")]
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            for name in ["bolt.toml", "Bolt.toml"] {
                let path = dir.join(name);
                if !path.is_file() {
                    continue;
                }

                match Self::from_file_path(&path) {
                    Ok(config) => return config,
                    Err(err) => log::error!("Invalid configuration in {}: {err}", path.display()),
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    /// Loads configuration from a specified file path.
    #[cfg(feature = "std")]
    pub fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, crate::BoltError> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| crate::BoltError::configuration(err.to_string()))?;

        toml::from_str(&content).map_err(|err| crate::BoltError::configuration(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcceleratorKind;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    #[test]
    fn parse_full_file() {
        let path = std::env::temp_dir().join(format!("bolt-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
            [dispatch]
            run_mode = "multicore"
            multicore_threshold = 10
            accelerator = "none"

            [dispatch.logger]
            stderr = true
            level = "basic"

            [launch]
            tiles_per_compute_unit = 4
            tile_dim = 32
            "#,
        )
        .unwrap();

        let config = GlobalConfig::from_file_path(&path);
        std::fs::remove_file(&path).ok();
        let config = config.unwrap();

        assert_eq!(config.dispatch.run_mode, RunMode::MultiCore);
        assert_eq!(config.dispatch.multicore_threshold, 10);
        assert_eq!(config.dispatch.accelerator_threshold, 65536);
        assert_eq!(config.dispatch.accelerator, AcceleratorKind::None);
        assert!(config.dispatch.logger.stderr);
        assert_eq!(config.dispatch.logger.level, DispatchLogLevel::Basic);
        assert_eq!(config.launch.tiles_per_compute_unit, 4);
        assert_eq!(config.launch.tile_dim, Some(32));
        assert_eq!(config.multicore, MultiCoreConfig::default());
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let path = std::env::temp_dir().join(format!("bolt-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[dispatch]\nrun_mode = 3\n").unwrap();

        let config = GlobalConfig::from_file_path(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            config,
            Err(crate::BoltError::Configuration { .. })
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir().join(format!("bolt-saved-{}.toml", std::process::id()));
        let mut config = GlobalConfig::default();
        config.dispatch.run_mode = RunMode::Serial;
        config.launch.compute_units = Some(3);

        config.save(&path).unwrap();
        let loaded = GlobalConfig::from_file_path(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.unwrap(), config);
    }

    #[test]
    #[serial]
    fn env_overrides_run_mode_and_logger() {
        std::env::set_var("BOLT_RUN_MODE", "serial");
        std::env::set_var("BOLT_DEBUG_LOG", "stderr");
        std::env::set_var("BOLT_NUM_THREADS", "3");

        let config = GlobalConfig::default().override_from_env();

        std::env::remove_var("BOLT_RUN_MODE");
        std::env::remove_var("BOLT_DEBUG_LOG");
        std::env::remove_var("BOLT_NUM_THREADS");

        assert_eq!(config.dispatch.run_mode, RunMode::Serial);
        assert!(config.dispatch.logger.stderr);
        assert_eq!(config.dispatch.logger.level, DispatchLogLevel::Full);
        assert_eq!(config.multicore.num_threads, Some(3));
    }

    #[test]
    #[serial]
    fn invalid_env_values_are_ignored() {
        std::env::set_var("BOLT_RUN_MODE", "quantum");
        std::env::set_var("BOLT_NUM_THREADS", "0");

        let config = GlobalConfig::default().override_from_env();

        std::env::remove_var("BOLT_RUN_MODE");
        std::env::remove_var("BOLT_NUM_THREADS");

        assert_eq!(config.dispatch.run_mode, RunMode::Automatic);
        assert_eq!(config.multicore.num_threads, None);
    }
}
