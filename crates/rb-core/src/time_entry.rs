//! Logged time, read-only input to workload aggregation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::types::{IssueId, ProjectId, TimeEntryId, UserId};

/// Hours a user logged on one day against a project or issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TimeEntryId>,
    pub user_id: UserId,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<IssueId>,
    pub spent_on: NaiveDate,
    pub hours: f64,
    #[serde(default)]
    pub activity: String,
}

/// Grouping key for logged time: a project, optionally narrowed to an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WorkKey {
    pub project_id: ProjectId,
    pub issue_id: Option<IssueId>,
}

impl TimeEntry {
    pub const fn key(&self) -> WorkKey {
        WorkKey {
            project_id: self.project_id,
            issue_id: self.issue_id,
        }
    }

    /// True iff the entry falls inside `[from, to]`.
    pub fn is_between(&self, from: NaiveDate, to: NaiveDate) -> bool {
        from <= self.spent_on && self.spent_on <= to
    }
}

/// Whether `entry` is time logged against the allocation `booking` plans.
///
/// Issue entries match bookings on the same issue. Entries without an issue
/// match project-level bookings (no issue) on the same project.
pub fn is_booked_by(entry: &TimeEntry, booking: &Booking) -> bool {
    match (entry.issue_id, booking.issue_id()) {
        (Some(entry_issue), Some(booking_issue)) => entry_issue == booking_issue,
        (None, None) => entry.project_id == booking.project_id(),
        _ => false,
    }
}
