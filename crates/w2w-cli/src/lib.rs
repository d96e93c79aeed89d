//! Command-line front end for wall-to-wall project tooling.

pub mod cli;
pub mod commands;
pub mod logging;
