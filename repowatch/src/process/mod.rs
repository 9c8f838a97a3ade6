//! External process invocation

pub mod command;
pub mod runner;

pub use command::CommandSpec;
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
