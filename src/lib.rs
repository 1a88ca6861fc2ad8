pub mod config;
pub mod models;
pub mod pipeline; // Text acquisition + parameter extraction

use tracing_subscriber::EnvFilter;

pub use config::PipelineSettings;
pub use models::{HealthParameter, ParameterCategory, ParameterStatus, ParameterValue};
pub use pipeline::extraction::{DocumentExtractor, ExtractionError, RawDocument};
pub use pipeline::parameters::{ExtractionTables, ParameterExtractor};
pub use pipeline::processor::{
    build_processor, ProcessOptions, ProcessedReport, ProcessingError, ReportProcessor,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the built-in filter. Safe to call more than once;
/// later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} pipeline v{}", config::APP_NAME, config::APP_VERSION);
}
