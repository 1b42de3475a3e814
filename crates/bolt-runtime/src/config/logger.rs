use super::{DispatchLogLevel, GlobalConfig};
use core::fmt::Display;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Configuration for logging in Bolt, parameterized by a log level type.
///
/// Note that you can use multiple outputs at the same time.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional crate-level logging configuration (e.g., info, debug, trace).
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level for this logger, determining verbosity.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

/// Trait for types that can be used as log levels in `LoggerConfig`.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// Dispatch logger, forwarding messages to every configured output.
#[derive(Debug)]
pub struct Logger {
    outputs: Vec<LoggerKind>,
    level: DispatchLogLevel,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates a logger from the global configuration.
    pub fn new() -> Self {
        let config = GlobalConfig::get();
        Self::from_config(&config.dispatch.logger)
    }

    /// Creates a logger from an explicit configuration.
    ///
    /// Outputs that can't be opened are skipped with a warning.
    pub fn from_config(config: &LoggerConfig<DispatchLogLevel>) -> Self {
        let mut outputs = Vec::new();

        if config.level != DispatchLogLevel::Disabled {
            if let Some(path) = &config.file {
                match FileLogger::new(path, config.append) {
                    Ok(logger) => outputs.push(LoggerKind::File(logger)),
                    Err(err) => log::warn!("Can't open log file {}: {err}", path.display()),
                }
            }
            if config.stdout {
                outputs.push(LoggerKind::Stdout);
            }
            if config.stderr {
                outputs.push(LoggerKind::Stderr);
            }
            if let Some(level) = config.log {
                outputs.push(LoggerKind::Log(level));
            }
        }

        Self {
            outputs,
            level: config.level,
        }
    }

    /// Logs a dispatch message when the logger is at least at `level`.
    pub fn log_dispatch<S: Display>(&mut self, level: DispatchLogLevel, msg: &S) {
        if level > self.level || level == DispatchLogLevel::Disabled {
            return;
        }

        if self.outputs.len() > 1 {
            let msg = msg.to_string();
            for output in self.outputs.iter_mut() {
                output.log(&msg);
            }
        } else if let Some(output) = self.outputs.first_mut() {
            output.log(msg);
        }
    }

    /// Current dispatch log level.
    pub fn log_level_dispatch(&self) -> DispatchLogLevel {
        self.level
    }

    /// Whether a message at `level` would reach an output.
    pub fn enabled(&self, level: DispatchLogLevel) -> bool {
        level != DispatchLogLevel::Disabled && level <= self.level && !self.outputs.is_empty()
    }
}

/// Represents different types of loggers.
#[derive(Debug)]
enum LoggerKind {
    /// Logs to a file.
    File(FileLogger),

    /// Logs to standard output.
    Stdout,

    /// Logs to standard error.
    Stderr,

    /// Logs using the `log` crate with a specified level.
    Log(LogCrateLevel),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            LoggerKind::File(file_logger) => file_logger.log(msg),
            LoggerKind::Stdout => println!("{msg}"),
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
        }
    }
}

/// Logger that writes messages to a file.
#[derive(Debug)]
struct FileLogger {
    writer: BufWriter<File>,
}

impl FileLogger {
    fn new(path: &Path, append: bool) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    // Write failures are reported through `log` and otherwise ignored.
    fn log<S: Display>(&mut self, msg: &S) {
        let result = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush());

        if let Err(err) = result {
            log::warn!("Can't write dispatch log: {err}");
        }
    }
}
