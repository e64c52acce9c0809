//! Commands that record the issue and milestone data bookings are checked against.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use rb_core::{Issue, IssueId, ProjectId};

use crate::Config;
use crate::commands::util::{format_hours, open_database};

#[derive(Debug, Args)]
pub struct IssueArgs {
    pub id: IssueId,
    #[arg(long)]
    pub project: ProjectId,
    #[arg(long, default_value = "")]
    pub subject: String,
    /// Due date (YYYY-MM-DD).
    #[arg(long)]
    pub due: Option<NaiveDate>,
    /// Estimated hours.
    #[arg(long)]
    pub estimate: Option<f64>,
}

#[derive(Debug, Args)]
pub struct MilestoneArgs {
    pub name: String,
    #[arg(long)]
    pub project: ProjectId,
    /// Due date (YYYY-MM-DD).
    #[arg(long)]
    pub due: NaiveDate,
}

pub fn issue<W: Write>(writer: &mut W, args: &IssueArgs, config: &Config) -> Result<()> {
    if args.estimate.is_some_and(|hours| !hours.is_finite() || hours < 0.0) {
        bail!("estimate must be a non-negative number of hours");
    }
    let mut db = open_database(config)?;
    db.upsert_issue(&Issue {
        id: args.id,
        project_id: args.project,
        subject: args.subject.clone(),
        due_date: args.due,
        estimated_hours: args.estimate,
    })?;

    write!(writer, "Saved issue #{} on project {}", args.id, args.project)?;
    if let Some(due) = args.due {
        write!(writer, ", due {due}")?;
    }
    if let Some(estimate) = args.estimate {
        write!(writer, ", estimated {}h", format_hours(estimate))?;
    }
    writeln!(writer)?;
    Ok(())
}

pub fn milestone<W: Write>(writer: &mut W, args: &MilestoneArgs, config: &Config) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        bail!("milestone name cannot be empty");
    }
    let mut db = open_database(config)?;
    let milestone = db.add_milestone(args.project, name, args.due)?;
    writeln!(
        writer,
        "Added milestone {} ({}) on project {}, due {}",
        milestone.name, milestone.id, milestone.project_id, milestone.due_date
    )?;
    Ok(())
}
