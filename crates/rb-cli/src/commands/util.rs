//! Shared utilities for CLI commands.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rb_core::{Booking, BookingWarning};
use rb_db::Database;

use crate::Config;

/// Opens the configured database, creating its directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// `start..end` with the effective end date.
pub fn format_span(booking: &Booking) -> String {
    format!("{}..{}", booking.start_date(), booking.effective_end_date())
}

/// One-line summary of a stored booking.
pub fn describe_booking(booking: &Booking) -> String {
    let id = booking
        .id()
        .map_or_else(|| "new".to_string(), |id| format!("#{id}"));
    let issue = booking
        .issue_id()
        .map(|issue| format!(", issue #{issue}"))
        .unwrap_or_default();
    format!(
        "{id} project {}{issue}, user {}, {}, {}h/day",
        booking.project_id(),
        booking.assigned_to_id(),
        format_span(booking),
        format_hours(booking.hours_per_day()),
    )
}

/// Prints non-blocking warnings and mirrors them to the log.
pub fn write_warnings<W: Write>(writer: &mut W, warnings: &[BookingWarning]) -> Result<()> {
    for warning in warnings {
        tracing::warn!(%warning, "booking saved with warning");
        writeln!(writer, "  warning: {warning}")?;
    }
    Ok(())
}

/// Hours with at most two decimals and no trailing zeros.
pub fn format_hours(hours: f64) -> String {
    let text = format!("{hours:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// First and last day of the week containing `today`, respecting the configured first weekday.
pub fn current_week(config: &Config, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let start = config.calendar()?.beginning_of_week(today);
    let end = start
        .checked_add_days(chrono::Days::new(6))
        .context("date out of range")?;
    Ok((start, end))
}
