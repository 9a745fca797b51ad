//! Command line parsing and the runtime settings derived from it

pub mod cli;
pub mod settings;

pub use cli::Cli;
pub use settings::Settings;
