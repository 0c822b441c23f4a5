use cola_engine::device::GpuInit;
use cola_engine::logging::{init_logging, LogFormat, LoggingConfig};
use cola_engine::window::{LogicalSize, Runtime, RuntimeConfig};

mod shaders;
mod triangle;

use triangle::TriangleSession;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig {
        format: LogFormat::Compact,
        ..LoggingConfig::default()
    });

    let config = RuntimeConfig {
        title: "Cola - Sandbox".to_string(),
        initial_size: LogicalSize::new(800.0, 600.0),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), TriangleSession::new())
}
