//! Tracing subscriber setup for the binary.

use std::io;

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a `fmt` subscriber writing to stderr, filtered by `RUST_LOG`
/// (defaults to `info`). Calling it twice is harmless.
pub fn init() {
    // RUST_LOG=info,wsprobe=debug,...
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        tracing::info!("logging initialised twice without panicking");
    }
}
