use tracing_subscriber::EnvFilter;

use crate::domain::model::LogFormat;

/// Filter directive for a base level: our crate at `level`, sqlx held at warn
/// so per-statement logs stay out of probe output.
pub fn filter_directive(level: &str) -> String {
    format!("{level},db_bootstrap={level},sqlx=warn")
}

pub fn init_logging(level: &str, format: LogFormat) {
    // Base level from config, still overridable via RUST_LOG.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }
}
