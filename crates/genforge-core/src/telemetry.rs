//! Tracing setup for the `genforge` binary.
//!
//! `genforge generate --json` prints the `PipelineResult` on stdout, so every
//! log line goes to stderr, in text or (`--json-logs`) JSON form. Without
//! `RUST_LOG`, genforge's own crates log at the requested level and
//! dependencies (reqwest, hyper) only at `warn`. Call [`init_tracing`] once at
//! startup; later calls are ignored.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const GENFORGE_TARGETS: &[&str] = &["genforge", "genforge_core", "genforge_state"];

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(GENFORGE_TARGETS.iter().map(|t| format!("{t}={level}")));
    directives.join(",")
}

/// Initialise the global tracing subscriber.
///
/// * `json` emits newline-delimited JSON log lines.
/// * `level` applies to genforge crates when `RUST_LOG` is not set.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_stay_at_warn() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,genforge=debug,genforge_core=debug,genforge_state=debug"
        );
        assert!(default_directives(Level::INFO).parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn init_tracing_twice_does_not_panic() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
