use bookmatch_core::config::{AppConfig, LogFormat};
use tracing::Level;

/// Installs the global subscriber on stderr so stdout only carries the command
/// result. A second call is a no-op.
pub fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber installed by an earlier command in this process stays in place.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use bookmatch_core::config::{AppConfig, LogFormat};

    use super::init_logging;

    #[test]
    fn repeated_initialization_keeps_the_first_subscriber() {
        let mut config = AppConfig::default();
        init_logging(&config);

        config.logging.format = LogFormat::Json;
        config.logging.level = "debug".to_string();
        init_logging(&config);

        tracing::info!(event_name = "logging.test", "still logging after second init");
    }
}
