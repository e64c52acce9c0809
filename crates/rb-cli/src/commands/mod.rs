//! CLI subcommand implementations.

pub mod booking;
pub mod issue;
pub mod log;
pub mod schedule;
pub mod timeline;
pub mod util;
