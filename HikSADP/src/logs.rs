// logs.rs
use hikconfig::get_config;
use tracing::Level;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installe le subscriber global : filtre de niveau puis sortie console sur stderr.
///
/// `--debug` (ou `debug: true` dans la configuration) force le niveau DEBUG.
/// Sans console activée, les événements sont simplement ignorés.
pub fn init_logging(debug: bool) -> LevelFilter {
    let config = get_config();

    let level = if debug || config.debug() {
        LevelFilter::DEBUG
    } else {
        string_to_level(&config.log_min_level())
            .map(LevelFilter::from_level)
            .unwrap_or(LevelFilter::INFO)
    };

    let subscriber = Registry::default().with(level);

    let result = if config.log_enable_console() {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        subscriber.try_init()
    };

    if let Err(e) = result {
        eprintln!("❌ Failed to install log subscriber: {}", e);
    }

    level
}

pub fn string_to_level(s: &str) -> Option<Level> {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" | "WARNING" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}
