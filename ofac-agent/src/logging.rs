use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::errors::{AgentError, AgentResult};

/// Install the global subscriber: console plus `log_dir/file_name`.
/// Keep the returned guard alive until exit or buffered file lines are lost.
pub fn init(config: &LoggingConfig) -> AgentResult<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| AgentError::Logging(format!("invalid filter '{}': {}", config.filter, e)))?;

    std::fs::create_dir_all(&config.log_dir)?;
    let appender = tracing_appender::rolling::never(&config.log_dir, &config.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let (console_text, console_json) = if config.json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_text)
        .with(console_json)
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(|e| AgentError::Logging(e.to_string()))?;

    Ok(guard)
}
