//! CLI subcommand implementations.
//!
//! Each command writes to the given writer so output can be captured in tests.

pub mod clock;
pub mod employment;
pub mod entity;
pub mod event;
pub mod hours;
pub mod init;
pub mod payroll;
pub mod shift;
pub mod status;
pub mod util;

#[cfg(test)]
mod testing;
