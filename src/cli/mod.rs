//! Command-line interface for radar_love

mod args;
mod commands;
mod run;

pub use args::{Cli, Commands, ExpectArg, PatternKindArg};
pub use run::run;
