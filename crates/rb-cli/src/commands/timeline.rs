//! Timeline command: the booking chart as lanes of pixel bars.
//!
//! Zoom and month span fall back to the acting user's stored preferences,
//! and whatever gets resolved is remembered for the next run.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use rb_core::layout::{PlacedBooking, ProjectTimeline, UserTimeline};
use rb_core::preferences::resolve;
use rb_core::{
    BarCoords, ChartPreferences, ChartRequest, LoadStatus, TimelineLayout, TimelineOptions,
    build_timeline,
};

use crate::Config;
use crate::commands::util::{format_hours, open_database};

#[derive(Debug, Args)]
pub struct TimelineArgs {
    /// First day; defaults to the start of the current week.
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Months shown (1-24).
    #[arg(long)]
    pub months: Option<u32>,
    /// Day column width: 1 = 30px, 2 = 60px, 3 = 100px.
    #[arg(long)]
    pub zoom: Option<u8>,
    /// Give each issue its own group of lanes.
    #[arg(long)]
    pub show_issues: bool,
    /// Show the window before the requested one.
    #[arg(long, conflicts_with = "next")]
    pub previous: bool,
    /// Show the window after the requested one.
    #[arg(long)]
    pub next: bool,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(
    writer: &mut W,
    args: &TimelineArgs,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let calendar = config.calendar()?;
    let visibility = config.visibility()?;
    let user = config.user()?;
    let mut db = open_database(config)?;

    let stored = match user {
        Some(user) => db.load_preferences(user)?,
        None => ChartPreferences::default(),
    };
    let request = ChartRequest {
        zoom: args.zoom,
        months: args.months,
        date_from: args.from,
    };
    let resolved = resolve(&request, &stored, user, &calendar, today)?;
    if let Some(delta) = &resolved.delta {
        db.save_preferences(delta)?;
    }

    let window = if args.previous {
        resolved.window.previous()
    } else if args.next {
        resolved.window.next()
    } else {
        Ok(resolved.window)
    }
    .context("cannot page the timeline any further")?;

    let bookings = db.list_bookings_between(window.date_from(), window.date_to(), &visibility)?;
    let milestones = db.list_milestones_between(window.date_from(), window.date_to(), &visibility)?;
    let options = TimelineOptions {
        show_issues: args.show_issues,
    };
    let layout = build_timeline(&bookings, &milestones, window, resolved.zoom, &calendar, options);

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&layout)?)?;
    } else {
        write_layout(writer, &layout, options)?;
    }
    Ok(())
}

fn write_layout<W: Write>(
    writer: &mut W,
    layout: &TimelineLayout<'_>,
    options: TimelineOptions,
) -> Result<()> {
    writeln!(
        writer,
        "Timeline {}..{}, zoom {} ({}px/day, {}px)",
        layout.window.date_from(),
        layout.window.date_to(),
        layout.zoom.get(),
        layout.column_width,
        layout.width
    )?;
    if layout.users.is_empty() {
        writeln!(writer, "No bookings.")?;
    }
    for user in &layout.users {
        write_user(writer, user, options)?;
    }
    Ok(())
}

fn write_user<W: Write>(
    writer: &mut W,
    user: &UserTimeline<'_>,
    options: TimelineOptions,
) -> Result<()> {
    writeln!(
        writer,
        "User {} ({}h/day)",
        user.user_id,
        format_hours(user.workday_length)
    )?;
    for segment in &user.load_line {
        writeln!(
            writer,
            "  load {}..{}: {}h {} {}",
            segment.from,
            segment.to,
            format_hours(segment.load_hours),
            load_label(segment.status),
            format_coords(segment.coords)
        )?;
    }
    for project in &user.projects {
        write_project(writer, project, options)?;
    }
    Ok(())
}

fn write_project<W: Write>(
    writer: &mut W,
    project: &ProjectTimeline<'_>,
    options: TimelineOptions,
) -> Result<()> {
    let lanes = project.lane_count();
    writeln!(
        writer,
        "  Project {} ({lanes} {})",
        project.project_id,
        if lanes == 1 { "lane" } else { "lanes" }
    )?;
    for marker in &project.milestones {
        write!(
            writer,
            "    milestone {} due {} {}",
            marker.milestone.name,
            marker.milestone.due_date,
            format_coords(marker.coords)
        )?;
        if let Some(max_width) = marker.max_width {
            write!(writer, ", up to {max_width}px")?;
        }
        writeln!(writer)?;
    }
    for group in &project.groups {
        let indent = if options.show_issues {
            match group.issue_id {
                Some(issue) => writeln!(writer, "    issue #{issue}")?,
                None => writeln!(writer, "    no issue")?,
            }
            "      "
        } else {
            "    "
        };
        for (index, lane) in group.lanes.iter().enumerate() {
            let bars: Vec<String> = lane.iter().map(format_bar).collect();
            writeln!(writer, "{indent}lane {}: {}", index + 1, bars.join(", "))?;
        }
    }
    Ok(())
}

fn format_bar(placed: &PlacedBooking<'_>) -> String {
    let booking = placed.booking;
    let id = booking
        .id()
        .map_or_else(|| "new".to_string(), |id| format!("#{id}"));
    let coords = placed
        .coords
        .map_or_else(|| "outside".to_string(), format_coords);
    format!(
        "{id} {}..{} {coords}",
        booking.start_date(),
        booking.effective_end_date()
    )
}

fn format_coords(coords: BarCoords) -> String {
    format!("[{}, {})", coords.bar_start, coords.bar_end)
}

const fn load_label(status: LoadStatus) -> &'static str {
    match status {
        LoadStatus::Full => "full",
        LoadStatus::Underload => "underload",
        LoadStatus::Overload => "overload",
    }
}
