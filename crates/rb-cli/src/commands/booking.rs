//! Booking write commands: `rb book`, `rb shift`, `rb split`, `rb delete`.
//!
//! Blocking validation errors abort with the field-level messages; warnings
//! are printed after the write succeeds.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use rb_core::{BookingDraft, BookingId, IssueId, ProjectId, UserId};

use crate::Config;
use crate::commands::util::{describe_booking, open_database, write_warnings};

#[derive(Debug, Args)]
pub struct BookArgs {
    /// Existing booking to overwrite instead of creating a new one.
    #[arg(long)]
    pub id: Option<BookingId>,
    /// Project the hours are booked on.
    #[arg(long)]
    pub project: Option<ProjectId>,
    /// User the booking is assigned to.
    #[arg(long)]
    pub user: Option<UserId>,
    /// Issue the booking is for.
    #[arg(long)]
    pub issue: Option<IssueId>,
    /// First day (YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Last day (YYYY-MM-DD); defaults to the start date.
    #[arg(long)]
    pub end: Option<NaiveDate>,
    /// Hours per day.
    #[arg(long)]
    pub hours: Option<f64>,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Debug, Args)]
pub struct ShiftArgs {
    pub id: BookingId,
    /// Days to move the start date by.
    #[arg(long, allow_negative_numbers = true)]
    pub days: i64,
    /// Days to move the end date by; the end stays put when omitted.
    #[arg(long, allow_negative_numbers = true)]
    pub end_days: Option<i64>,
}

#[derive(Debug, Args)]
pub struct SplitArgs {
    pub id: BookingId,
    /// Days after the start date where the second half begins.
    #[arg(long, allow_negative_numbers = true)]
    pub at: i64,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub id: BookingId,
}

pub fn book<W: Write>(
    writer: &mut W,
    args: &BookArgs,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let calendar = config.calendar()?;
    let mut db = open_database(config)?;
    let draft = BookingDraft {
        id: args.id,
        project_id: args.project,
        assigned_to_id: args.user,
        issue_id: args.issue,
        start_date: args.start,
        end_date: args.end,
        hours_per_day: args.hours,
        notes: args.notes.clone(),
        author_id: config.user()?,
        created_at: None,
    };

    let (verb, saved) = match args.id {
        Some(id) => ("Updated", db.update_booking(id, draft, &calendar, today)?),
        None => ("Created", db.create_booking(draft, &calendar, today)?),
    };
    writeln!(writer, "{verb} booking {}", describe_booking(&saved.booking))?;
    write_warnings(writer, &saved.warnings)?;
    Ok(())
}

pub fn shift<W: Write>(
    writer: &mut W,
    args: &ShiftArgs,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let calendar = config.calendar()?;
    let mut db = open_database(config)?;
    let saved = db.shift_booking(args.id, args.days, args.end_days, &calendar, today)?;
    writeln!(writer, "Moved booking {}", describe_booking(&saved.booking))?;
    write_warnings(writer, &saved.warnings)?;
    Ok(())
}

pub fn split<W: Write>(
    writer: &mut W,
    args: &SplitArgs,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let calendar = config.calendar()?;
    let mut db = open_database(config)?;
    let outcome = db
        .split_booking(args.id, args.at, &calendar, today)
        .with_context(|| format!("failed to split booking {}", args.id))?;

    writeln!(writer, "Split booking {}", args.id)?;
    for half in [&outcome.original, &outcome.new] {
        writeln!(writer, "- {}", describe_booking(&half.booking))?;
        write_warnings(writer, &half.warnings)?;
    }
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, args: &DeleteArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    db.delete_booking(args.id)?;
    writeln!(writer, "Deleted booking #{}", args.id)?;
    Ok(())
}
