//! Tracing setup and the macro prelude used throughout the crate.

/// Initialize the global tracing subscriber for the daemon binary.
///
/// Respects `RUST_LOG`; defaults to `info` for this crate when unset.
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pulsed=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub mod prelude {
    // Leading `::` keeps the extern crate unambiguous from inside a module
    // that shares its name.
    pub use ::tracing::{debug, error, info, trace, warn};
}
