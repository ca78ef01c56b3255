//! Palisade Logging
//!
//! Lightweight structured logging used by the Palisade crates. Output is
//! controlled entirely through environment variables so that a policy engine
//! embedded in a larger server does not need to be wired into its logger.
//!
//! # Usage
//!
//! ```rust
//! use palisade_log::{debug, warn};
//!
//! debug!("Serializing policy");
//! warn!(target: "palisade::csp", "Discarded {} sources", 3);
//! ```
//!
//! # Environment Variables
//!
//! - `PALISADE_DEBUG=1` - Enable debug logging
//! - `PALISADE_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `PALISADE_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `PALISADE_LOG_COLOR=1|0` - Enable/disable colors
//! - `PALISADE_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `PALISADE_LOG_MODULE=1|0` - Include the emitting module path
//!
//! # Capturing
//!
//! [`capture`] collects every record emitted on the current thread instead of
//! writing it to stderr, which lets tests assert on warnings.

use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::env;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Levels and formats
// ============================================================================

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Disables all output
    Off = 5,
}

impl Level {
    /// Upper-case level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }

    #[cfg(feature = "color")]
    fn colored(&self) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Level::Trace => "TRACE".magenta(),
            Level::Debug => "DEBUG".blue(),
            Level::Info => "INFO".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERROR".red().bold(),
            Level::Off => "OFF".white(),
        }
    }
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human readable, one record per line with optional colors
    Pretty,
    /// Short single-line format
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for Format {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Global configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub color: bool,
    pub timestamps: bool,
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
            module_path: true,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Read the `PALISADE_*` variables and publish level/debug to the globals.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let debug = env_flag("PALISADE_DEBUG").unwrap_or(false);

        let level = env::var("PALISADE_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { defaults.level });

        let format = env::var("PALISADE_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.format);

        // NO_COLOR wins over a terminal being present
        let color = env_flag("PALISADE_LOG_COLOR")
            .unwrap_or_else(|| env::var("NO_COLOR").is_err() && env::var("TERM").is_ok());

        DEBUG_ENABLED.store(debug, Ordering::SeqCst);
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);

        Self {
            debug,
            level,
            format,
            color,
            timestamps: env_flag("PALISADE_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps),
            module_path: env_flag("PALISADE_LOG_MODULE").unwrap_or(defaults.module_path),
        }
    }
}

/// Force configuration to be read from the environment now rather than on
/// the first emitted record.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// The resolved global configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Whether a record at `level` would be kept, either by the global filter or
/// by an active [`capture`] on this thread.
#[doc(hidden)]
#[inline]
pub fn enabled(level: Level) -> bool {
    init();
    is_level_enabled(level)
        || (level == Level::Debug && is_debug_enabled())
        || CAPTURE.with(|c| c.borrow().is_some())
}

pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_level(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode; enabling it lowers the level to at least `Debug`.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

// ============================================================================
// Capture
// ============================================================================

/// A record collected by [`capture`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub target: String,
    pub message: String,
}

thread_local! {
    static CAPTURE: RefCell<Option<Vec<Record>>> = const { RefCell::new(None) };
}

/// Run `f` and return every record it emitted on this thread, regardless of
/// the configured level. Nothing captured is written to stderr.
pub fn capture<F: FnOnce()>(f: F) -> Vec<Record> {
    let previous = CAPTURE.with(|c| c.borrow_mut().replace(Vec::new()));
    f();
    CAPTURE.with(|c| {
        let mut slot = c.borrow_mut();
        let records = slot.take().unwrap_or_default();
        *slot = previous;
        records
    })
}

// ============================================================================
// Output
// ============================================================================

#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    let captured = CAPTURE.with(|c| match c.borrow_mut().as_mut() {
        Some(records) => {
            records.push(Record {
                level,
                target: target.to_string(),
                message: message.to_string(),
            });
            true
        }
        None => false,
    });
    if captured || !is_level_enabled(level) && !(level == Level::Debug && is_debug_enabled()) {
        return;
    }

    let config = config();
    match config.format {
        Format::Pretty => log_pretty(level, target, message, config),
        Format::Compact => log_compact(level, target, message, config),
        Format::Json => log_json(level, target, message),
    }
}

fn log_pretty(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(stderr, "{} ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
    }

    #[cfg(feature = "color")]
    if config.color {
        let _ = write!(stderr, "{:5} ", level.colored());
    } else {
        let _ = write!(stderr, "{:5} ", level.as_str());
    }

    #[cfg(not(feature = "color"))]
    let _ = write!(stderr, "{:5} ", level.as_str());

    if config.module_path && !target.is_empty() {
        let _ = write!(stderr, "[{}] ", target);
    }

    let _ = writeln!(stderr, "{}", message);
}

fn log_compact(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();

    if config.timestamps {
        let _ = write!(stderr, "{} ", chrono::Local::now().format("%H:%M:%S"));
    }

    let _ = write!(stderr, "{} ", &level.as_str()[..1]);

    if config.module_path && !target.is_empty() {
        let _ = write!(stderr, "{}: ", target);
    }

    let _ = writeln!(stderr, "{}", message);
}

#[cfg(feature = "json")]
fn log_json(level: Level, target: &str, message: &str) {
    #[derive(serde::Serialize)]
    struct Entry<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let entry = Entry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
    };

    if let Ok(json) = serde_json::to_string(&entry) {
        eprintln!("{}", json);
    }
}

#[cfg(not(feature = "json"))]
fn log_json(level: Level, target: &str, message: &str) {
    eprintln!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}"}}"#,
        chrono::Utc::now().to_rfc3339(),
        level.as_str(),
        escape_json(target),
        escape_json(message)
    );
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

// ============================================================================
// Macros
// ============================================================================

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($level) {
            $crate::log($level, $target, &format!($($arg)+));
        }
    };
    ($level:expr, $($arg:tt)+) => {
        $crate::__log!($level, target: module_path!(), $($arg)+)
    };
}

/// Log a trace message.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Trace, $($arg)+) };
}

/// Log a debug message.
///
/// Emitted when `PALISADE_DEBUG=1` or `PALISADE_LOG_LEVEL` is `debug` or lower.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Debug, $($arg)+) };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Info, $($arg)+) };
}

/// Log a warning message.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Warn, $($arg)+) };
}

/// Log an error message.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Error, $($arg)+) };
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! A `tracing` subscriber honouring the `PALISADE_*` configuration, for
    //! hosts that already route everything through `tracing`.

    use super::*;

    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let config = config();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(config.color))
    }
}
