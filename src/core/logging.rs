use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,launcher_core=debug";

/// Install a `tracing` fmt subscriber honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
    {
        tracing::debug!("launcher-core logging initialised");
    }
}
