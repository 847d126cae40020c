#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod app;
pub mod cli;
pub mod command;
pub mod config;
pub mod cron;
pub mod error;
pub mod policy;

pub use cli::{Cli, Commands};
pub use config::{PolicyFile, Settings};
pub use error::{ConfigError, CuratorError, CuratorResult, JobError};
