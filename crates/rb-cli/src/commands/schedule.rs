//! Schedule command: project and per-user workload over a date range.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use rb_core::{
    BookedCard, Interval, ProjectId, ProjectSchedule, Progress, UnbookedCard, UserSchedule,
    WorkKey, WorkloadStatus,
};

use crate::Config;
use crate::commands::util::{current_week, format_hours, open_database};

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Restrict to one project.
    #[arg(long)]
    pub project: Option<ProjectId>,
    /// First day; defaults to the start of the current week.
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last day; defaults to the end of the current week.
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(
    writer: &mut W,
    args: &ScheduleArgs,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let calendar = config.calendar()?;
    let visibility = config.visibility()?;
    let (week_start, week_end) = current_week(config, today)?;
    let range = Interval::new(args.from.unwrap_or(week_start), args.to.unwrap_or(week_end))
        .context("invalid schedule range")?;

    let db = open_database(config)?;
    let bookings = db.list_bookings_between(range.start(), range.end(), &visibility)?;
    let time_entries = db.list_time_entries_between(range.start(), range.end(), &visibility)?;
    let milestones = db.list_milestones_between(range.start(), range.end(), &visibility)?;

    let schedule = ProjectSchedule::new(
        args.project,
        range,
        &bookings,
        &time_entries,
        &milestones,
        &calendar,
    );

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&schedule)?)?;
    } else {
        write_schedule(writer, &schedule)?;
    }
    Ok(())
}

fn write_schedule<W: Write>(writer: &mut W, schedule: &ProjectSchedule<'_>) -> Result<()> {
    let scope = schedule
        .project_id
        .map_or_else(|| "all projects".to_string(), |id| format!("project {id}"));
    writeln!(
        writer,
        "Schedule {}..{}, {scope}",
        schedule.range.start(),
        schedule.range.end()
    )?;
    writeln!(
        writer,
        "Capacity {}h, allocated {}h, spent {}h",
        format_hours(schedule.capacity_hours),
        format_hours(schedule.allocated_hours),
        format_hours(schedule.spent_hours)
    )?;

    for day in schedule.daily_workload() {
        let mut line = if day.is_workday || day.spent_hours > 0.0 {
            format!(
                "allocated {}h, spent {}h",
                format_hours(day.allocated_hours),
                format_hours(day.spent_hours)
            )
        } else {
            "off".to_string()
        };
        for milestone in schedule.milestones_on(day.date) {
            line.push_str(&format!(", milestone {}", milestone.name));
        }
        writeln!(writer, "  {} {}  {line}", day.date, day.date.format("%a"))?;
    }

    for user in &schedule.user_schedules {
        writeln!(writer)?;
        write_user(writer, user)?;
    }
    Ok(())
}

fn write_user<W: Write>(writer: &mut W, user: &UserSchedule<'_>) -> Result<()> {
    writeln!(
        writer,
        "User {}: capacity {}h, allocated {}h, spent {}h",
        user.user_id,
        format_hours(user.capacity_hours),
        format_hours(user.allocated_hours),
        format_hours(user.spent_hours)
    )?;

    for plan in user.plans.iter().filter(|plan| plan.workload_visible()) {
        writeln!(
            writer,
            "  {} {}  {}, booked {}h of {}h",
            plan.date,
            plan.date.format("%a"),
            workload_label(plan.workload),
            format_hours(plan.allocated_hours),
            format_hours(user.workday_length)
        )?;
        for card in &plan.booked_cards {
            write_booked_card(writer, card)?;
        }
        for card in &plan.unbooked_cards {
            write_unbooked_card(writer, card)?;
        }
    }
    Ok(())
}

fn write_booked_card<W: Write>(writer: &mut W, card: &BookedCard<'_>) -> Result<()> {
    let id = card
        .booking
        .id()
        .map(|id| format!("#{id} "))
        .unwrap_or_default();
    let subject = describe_work(WorkKey {
        project_id: card.booking.project_id(),
        issue_id: card.booking.issue_id(),
    });
    writeln!(
        writer,
        "    {id}{subject}: spent {}h of {}h, {}",
        format_hours(card.spent_hours),
        format_hours(card.planned_hours),
        progress_label(card.progress)
    )?;
    Ok(())
}

fn write_unbooked_card<W: Write>(writer: &mut W, card: &UnbookedCard<'_>) -> Result<()> {
    writeln!(
        writer,
        "    unbooked {}: {}h",
        describe_work(card.key),
        format_hours(card.spent_hours)
    )?;
    Ok(())
}

fn describe_work(key: WorkKey) -> String {
    match key.issue_id {
        Some(issue) => format!("project {} issue #{issue}", key.project_id),
        None => format!("project {}", key.project_id),
    }
}

const fn workload_label(status: WorkloadStatus) -> &'static str {
    match status {
        WorkloadStatus::Off => "off",
        WorkloadStatus::Full => "full",
        WorkloadStatus::Overload => "overload",
        WorkloadStatus::Underload => "underload",
    }
}

fn progress_label(progress: Progress) -> String {
    match progress {
        Progress::Todo => "todo".to_string(),
        Progress::Planned => "planned".to_string(),
        Progress::Underload { percent } => format!("underload {percent}%"),
        Progress::Overload { percent } => format!("overload {percent}%"),
    }
}
