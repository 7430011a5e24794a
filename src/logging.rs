// Logging for the sqll binary, powered by tracing-subscriber.
//
// The library logs through the `log` facade. `try_init` installs the
// `tracing_log` bridge, so those records reach the stderr layer below.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Third-party targets capped at a quieter level
const NOISY_TARGETS: &[(&str, &str)] = &[("sqlparser", "warn")];

/// Directive string for a base level plus the noisy-target caps
pub fn filter_directives(level: &str) -> String {
    let mut directives = vec![level.to_string()];
    for (target, lvl) in NOISY_TARGETS {
        directives.push(format!("{}={}", target, lvl));
    }
    directives.join(",")
}

/// Pick the effective filter: an explicit `--log-level` wins, then
/// `RUST_LOG`, then the level from the project config.
fn build_env_filter(cli_level: Option<&str>, config_level: &str) -> anyhow::Result<EnvFilter> {
    let filter_str = match cli_level {
        Some(level) => filter_directives(level),
        None => match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(env) if !env.trim().is_empty() => env,
            _ => filter_directives(config_level),
        },
    };

    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", filter_str, e))
}

/// Install the global subscriber writing to stderr
pub fn init_logging(cli_level: Option<&str>, config_level: &str) -> anyhow::Result<()> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(build_env_filter(cli_level, config_level)?);

    tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_quiet_sqlparser() {
        assert_eq!(filter_directives("debug"), "debug,sqlparser=warn");
    }

    #[test]
    fn test_explicit_level_builds_valid_filter() {
        assert!(build_env_filter(Some("trace"), "info").is_ok());
    }
}
