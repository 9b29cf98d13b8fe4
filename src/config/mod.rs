//! Command line options and the runtime settings derived from them

pub mod cli;
pub mod settings;

pub use cli::{CliArgs, DEFAULT_DEVICE_NAME};
pub use settings::Settings;
