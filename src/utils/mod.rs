/// Tracing subscriber setup.
pub mod logging;
/// TOML-based configuration (toolscout.toml).
pub mod toml_config;
