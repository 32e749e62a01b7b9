//! Tracing subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// Output goes to stderr so command output on stdout stays pipeable. JSON
/// lines when `LOG_FORMAT=json`, coloured text otherwise.
pub fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::from_default_env().add_directive(format!("reel={}", level).parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(false),
            )
            .with(env_filter)
            .try_init()?;
    }

    Ok(())
}
