use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "log filter '{}' could not be parsed", value)
            }
            TelemetryError::Subscriber(err) => write!(f, "subscriber already installed: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// HTTP stack under the prediction client; every model call logs here at debug level.
const TRANSPORT_TARGETS: [&str; 4] = [
    "hyper=warn",
    "hyper_util=warn",
    "reqwest=warn",
    "rustls=warn",
];

/// Install the global fmt subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => configured_filter(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// The configured level with the transport crates held at `warn`.
fn configured_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    let mut filter = EnvFilter::try_new(log_level).map_err(|source| TelemetryError::EnvFilter {
        value: log_level.to_string(),
        source,
    })?;
    for target in TRANSPORT_TARGETS {
        let directive: Directive = target.parse().map_err(|source| TelemetryError::EnvFilter {
            value: target.to_string(),
            source,
        })?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_keeps_transport_crates_quiet() {
        let filter = configured_filter("asd_screening=debug,info").expect("valid level");
        let rendered = filter.to_string();
        assert!(rendered.contains("asd_screening=debug"), "{rendered}");
        assert!(rendered.contains("reqwest=warn"), "{rendered}");
        assert!(rendered.contains("hyper=warn"), "{rendered}");
    }

    #[test]
    fn unparseable_level_is_reported() {
        match configured_filter("info,asd_screening=loud") {
            Err(TelemetryError::EnvFilter { value, .. }) => {
                assert_eq!(value, "info,asd_screening=loud")
            }
            other => panic!("expected filter error, got {other:?}"),
        }
    }
}
