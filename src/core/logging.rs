//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// rockforge::core::logging::init();
/// log::info!("Generator started");
/// ```
pub fn init() {
    // try_init so tests and binaries can both call this without panicking
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).try_init();
}
