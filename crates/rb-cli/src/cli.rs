//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::booking::{BookArgs, DeleteArgs, ShiftArgs, SplitArgs};
use crate::commands::issue::{IssueArgs, MilestoneArgs};
use crate::commands::log::LogArgs;
use crate::commands::schedule::ScheduleArgs;
use crate::commands::timeline::TimelineArgs;

/// Resource booking planner.
///
/// Books people onto projects and issues, checks the bookings against
/// estimates and due dates, and lays them out as a workload timeline.
#[derive(Debug, Parser)]
#[command(name = "rb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a booking, or overwrite one with --id.
    Book(BookArgs),

    /// Move a booking, or resize it with --end-days.
    Shift(ShiftArgs),

    /// Split a booking in two.
    Split(SplitArgs),

    /// Delete a booking.
    Delete(DeleteArgs),

    /// Log spent time.
    Log(LogArgs),

    /// Record an issue's due date and estimate.
    Issue(IssueArgs),

    /// Add a project milestone.
    Milestone(MilestoneArgs),

    /// Show capacity, allocated and spent hours per day.
    Schedule(ScheduleArgs),

    /// Show the booking chart.
    Timeline(TimelineArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn shift_accepts_negative_offsets() {
        let cli = Cli::try_parse_from(["rb", "shift", "4", "--days", "-2", "--end-days", "-1"]).unwrap();
        let Some(Commands::Shift(args)) = cli.command else {
            panic!("expected shift");
        };
        assert_eq!(args.id.get(), 4);
        assert_eq!(args.days, -2);
        assert_eq!(args.end_days, Some(-1));
    }

    #[test]
    fn book_parses_dates_and_ids() {
        let cli = Cli::try_parse_from([
            "rb", "book", "--project", "1", "--user", "2", "--start", "2019-01-07", "--hours", "6",
        ])
        .unwrap();
        let Some(Commands::Book(args)) = cli.command else {
            panic!("expected book");
        };
        assert_eq!(args.project.map(|id| id.get()), Some(1));
        assert_eq!(args.start.map(|d| d.to_string()), Some("2019-01-07".to_string()));
        assert_eq!(args.end, None);
    }

    #[test]
    fn zero_id_is_rejected() {
        assert!(Cli::try_parse_from(["rb", "delete", "0"]).is_err());
    }

    #[test]
    fn previous_conflicts_with_next() {
        assert!(Cli::try_parse_from(["rb", "timeline", "--previous", "--next"]).is_err());
    }
}
