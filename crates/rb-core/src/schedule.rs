//! Workload aggregation per user and per project.
//!
//! A [`UserSchedule`] walks every day of a range and builds one
//! [`DailyPlan`] per day. A [`ProjectSchedule`] builds one user schedule per
//! person with bookings or logged time on the project, in parallel, and
//! sums them.
//!
//! Two hour totals coexist and are deliberately different:
//! `allocated_hours` here sums each booking's `hours_per_day` once, while
//! [`Booking::total_hours`] weights the rate by working days.

use std::collections::HashMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::booking::Booking;
use crate::calendar::Calendar;
use crate::interval::Interval;
use crate::issue::Milestone;
use crate::plan::DailyPlan;
use crate::time_entry::TimeEntry;
use crate::types::{ProjectId, UserId};

/// One user over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSchedule<'a> {
    pub user_id: UserId,
    pub range: Interval,
    pub workday_length: f64,
    /// One plan per calendar day of `range`, in order.
    pub plans: Vec<DailyPlan<'a>>,
    /// Workday length × workdays in range; independent of bookings.
    pub capacity_hours: f64,
    /// Sum of `hours_per_day`, once per booking.
    pub allocated_hours: f64,
    pub spent_hours: f64,
}

impl<'a> UserSchedule<'a> {
    /// Builds the schedule from the user's bookings and time entries.
    ///
    /// The inputs are expected to belong to `user_id` already; the totals
    /// cover everything passed in, the daily plans only what falls in `range`.
    pub fn new(
        user_id: UserId,
        range: Interval,
        bookings: &[&'a Booking],
        time_entries: &[&'a TimeEntry],
        calendar: &Calendar,
    ) -> Self {
        let workday_length = calendar.workday_length_for(user_id);

        let plans = range
            .days()
            .map(|day| {
                let active = bookings
                    .iter()
                    .copied()
                    .filter(|booking| booking.interval().covers(day))
                    .collect();
                let logged = time_entries
                    .iter()
                    .copied()
                    .filter(|entry| entry.spent_on == day)
                    .collect();
                DailyPlan::new(day, calendar.is_workday(day), workday_length, active, logged)
            })
            .collect();

        let capacity_hours = workday_length * f64::from(calendar.working_days_in(&range));
        let allocated_hours: f64 = bookings.iter().map(|booking| booking.hours_per_day()).sum();
        let spent_hours: f64 = time_entries.iter().map(|entry| entry.hours).sum();

        Self {
            user_id,
            range,
            workday_length,
            plans,
            capacity_hours,
            allocated_hours,
            spent_hours,
        }
    }
}

/// Per-day totals across every user of a project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectDay {
    pub date: NaiveDate,
    pub is_workday: bool,
    pub allocated_hours: f64,
    pub spent_hours: f64,
}

/// A project (or every visible project) over a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSchedule<'a> {
    /// `None` aggregates across all projects passed in.
    pub project_id: Option<ProjectId>,
    pub range: Interval,
    /// Users with bookings first, then users with only logged time,
    /// each in first-appearance order.
    pub user_schedules: Vec<UserSchedule<'a>>,
    pub capacity_hours: f64,
    pub allocated_hours: f64,
    pub spent_hours: f64,
    /// Milestones due in `range`, by due date.
    pub milestones: Vec<&'a Milestone>,
    daily_workload: Vec<ProjectDay>,
}

impl<'a> ProjectSchedule<'a> {
    pub fn new(
        project_id: Option<ProjectId>,
        range: Interval,
        bookings: &'a [Booking],
        time_entries: &'a [TimeEntry],
        milestones: &'a [Milestone],
        calendar: &Calendar,
    ) -> Self {
        let in_project = |project: ProjectId| project_id.is_none_or(|id| id == project);

        let mut users: Vec<UserId> = Vec::new();
        let mut bookings_by_user: HashMap<UserId, Vec<&'a Booking>> = HashMap::new();
        let mut entries_by_user: HashMap<UserId, Vec<&'a TimeEntry>> = HashMap::new();

        for booking in bookings.iter().filter(|b| in_project(b.project_id())) {
            let user = booking.assigned_to_id();
            if !users.contains(&user) {
                users.push(user);
            }
            bookings_by_user.entry(user).or_default().push(booking);
        }
        for entry in time_entries.iter().filter(|e| in_project(e.project_id)) {
            if !users.contains(&entry.user_id) {
                users.push(entry.user_id);
            }
            entries_by_user.entry(entry.user_id).or_default().push(entry);
        }

        let user_schedules: Vec<UserSchedule<'a>> = users
            .par_iter()
            .map(|user| {
                UserSchedule::new(
                    *user,
                    range,
                    bookings_by_user.get(user).map(Vec::as_slice).unwrap_or_default(),
                    entries_by_user.get(user).map(Vec::as_slice).unwrap_or_default(),
                    calendar,
                )
            })
            .collect();

        let capacity_hours: f64 = user_schedules.iter().map(|s| s.capacity_hours).sum();
        let allocated_hours: f64 = user_schedules.iter().map(|s| s.allocated_hours).sum();
        let spent_hours: f64 = user_schedules.iter().map(|s| s.spent_hours).sum();

        let mut milestones: Vec<&'a Milestone> = milestones
            .iter()
            .filter(|m| in_project(m.project_id) && range.covers(m.due_date))
            .collect();
        milestones.sort_by_key(|m| m.due_date);

        let daily_workload = range
            .days()
            .enumerate()
            .map(|(index, date)| ProjectDay {
                date,
                is_workday: calendar.is_workday(date),
                allocated_hours: user_schedules
                    .iter()
                    .map(|s| s.plans[index].allocated_hours)
                    .sum(),
                spent_hours: user_schedules
                    .iter()
                    .map(|s| s.plans[index].spent_hours)
                    .sum(),
            })
            .collect();

        tracing::debug!(
            project = ?project_id,
            users = user_schedules.len(),
            milestones = milestones.len(),
            "built project schedule"
        );

        Self {
            project_id,
            range,
            user_schedules,
            capacity_hours,
            allocated_hours,
            spent_hours,
            milestones,
            daily_workload,
        }
    }

    /// Totals for every day of the range, across users.
    pub fn daily_workload(&self) -> &[ProjectDay] {
        &self.daily_workload
    }

    /// Milestones due on `date`.
    pub fn milestones_on(&self, date: NaiveDate) -> Vec<&'a Milestone> {
        self.milestones
            .iter()
            .copied()
            .filter(|m| m.due_date == date)
            .collect()
    }
}
