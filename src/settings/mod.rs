//! Layered configuration: a TOML file chosen by `--settings`, then `APP__` environment overrides.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
