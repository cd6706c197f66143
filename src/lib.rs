pub mod config;
pub mod errors;
pub mod llm;
pub mod perception;

/// Install the stderr subscriber. `RUST_LOG` overrides the default `info`
/// level; stdout stays reserved for the JSON result.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
