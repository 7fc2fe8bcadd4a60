//! Workforce temporal engine CLI library.
//!
//! This crate provides the `wf` command-line interface over `wf-db`.

mod cli;
pub mod commands;
mod config;

pub use cli::{
    ClockAction, Cli, Commands, EmploymentAction, EntityAction, EventAction, HoursAction,
    PayrollAction, PunchArgs, ShiftAction, SpanArgs,
};
pub use config::Config;
