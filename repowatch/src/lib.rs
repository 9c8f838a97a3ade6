//! repowatch library
//!
//! Watches git working trees for upstream changes, pulls them, runs build
//! steps and reports the outcome to a chat webhook.

pub mod app;
pub mod config;
pub mod detect;
pub mod errors;
pub mod git;
pub mod logs;
pub mod notify;
pub mod process;
pub mod update;
pub mod utils;
pub mod workers;
