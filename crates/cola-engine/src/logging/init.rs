use std::io::Write;
use std::sync::Once;

/// Line layout used by the logger.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum LogFormat {
    /// `env_logger`'s default layout (timestamp, level, target).
    #[default]
    Full,
    /// `[LEVEL] message`, suited to console-facing tools.
    Compact,
}

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "cola_engine=debug,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            format: LogFormat::Full,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored. Call early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);
        builder.target(log_target(config.format));

        if config.format == LogFormat::Compact {
            builder.format(|buf, record| writeln!(buf, "{}", compact_line(record.level(), record.args())));
        }

        // `try_init` so a logger installed by a test harness does not abort us.
        if builder.try_init().is_err() {
            return;
        }

        log::debug!("logging initialized");
    });
}

/// Compact output is console output and goes to stdout with the rest of it.
fn log_target(format: LogFormat) -> env_logger::Target {
    match format {
        LogFormat::Full => env_logger::Target::Stderr,
        LogFormat::Compact => env_logger::Target::Stdout,
    }
}

fn compact_line(level: log::Level, args: &std::fmt::Arguments<'_>) -> String {
    format!("[{level}] {args}")
}
