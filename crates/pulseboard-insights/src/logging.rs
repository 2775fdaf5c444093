use anyhow::{anyhow, Result};

/// Installs the JSON log subscriber. `RUST_LOG` refines `default_directive`,
/// e.g. `pulseboard_insights=info`.
///
/// Fails if a global subscriber is already set; callers may ignore that.
pub fn init(default_directive: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse()?),
        )
        .json()
        .try_init()
        .map_err(|e| anyhow!("could not install tracing subscriber: {e}"))
}
