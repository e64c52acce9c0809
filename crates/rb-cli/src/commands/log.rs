//! Log command for recording spent time.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use rb_core::{IssueId, ProjectId, TimeEntry, UserId};

use crate::Config;
use crate::commands::util::{format_hours, open_database};

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Hours spent.
    pub hours: f64,
    #[arg(long)]
    pub project: ProjectId,
    #[arg(long)]
    pub issue: Option<IssueId>,
    /// Who spent the time; defaults to the configured user.
    #[arg(long)]
    pub user: Option<UserId>,
    /// Day the time was spent on; defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long, default_value = "")]
    pub activity: String,
}

pub fn run<W: Write>(writer: &mut W, args: &LogArgs, config: &Config, today: NaiveDate) -> Result<()> {
    if !args.hours.is_finite() || args.hours <= 0.0 {
        bail!("hours must be positive, got {}", args.hours);
    }
    let Some(user_id) = args.user.or(config.user()?) else {
        bail!("no user given; pass --user or set user_id in the config");
    };

    let mut db = open_database(config)?;
    let entry = db.log_time(&TimeEntry {
        id: None,
        user_id,
        project_id: args.project,
        issue_id: args.issue,
        spent_on: args.date.unwrap_or(today),
        hours: args.hours,
        activity: args.activity.clone(),
    })?;

    let subject = entry
        .issue_id
        .map_or_else(|| format!("project {}", entry.project_id), |issue| format!("issue #{issue}"));
    writeln!(
        writer,
        "Logged {}h on {subject} for user {} on {}",
        format_hours(entry.hours),
        entry.user_id,
        entry.spent_on
    )?;
    Ok(())
}
