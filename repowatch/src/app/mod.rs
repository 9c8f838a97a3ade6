//! Application wiring

pub mod check;
pub mod options;
pub mod run;
