//! Core domain logic for resource bookings.
//!
//! This crate contains the fundamental types and logic for:
//! - Bookings: validation, non-blocking warnings, shifting and splitting
//! - Calendar: workdays, week starts and month windows
//! - Aggregation: daily plans, user and project schedules
//! - Layout: lane packing, pixel coordinates and load lines for the chart
//!
//! Nothing here performs I/O. Callers pass in bookings and time entries
//! already restricted to a [`Visibility`] scope.

pub mod booking;
pub mod calendar;
pub mod interval;
pub mod issue;
pub mod layout;
pub mod plan;
pub mod preferences;
pub mod schedule;
pub mod time_entry;
pub mod types;
pub mod visibility;

pub use booking::{
    Booking, BookingDraft, BookingWarning, SplitError, SplitHalf, SplitOutcome, ValidatedBooking,
    ValidationError, ValidationErrors, WarningContext, validate,
};
pub use calendar::{Calendar, CalendarError, MonthWindow, SchedulingConfig};
pub use interval::{Interval, IntervalError};
pub use issue::{Issue, Milestone};
pub use layout::{
    BarCoords, LayoutError, LoadSegment, LoadStatus, PackMode, TimelineLayout, TimelineOptions,
    Zoom, build_timeline, coordinates, pack_lanes,
};
pub use plan::{BookedCard, DailyPlan, Progress, UnbookedCard, WorkloadStatus};
pub use preferences::{ChartPreferences, ChartRequest, PreferencesDelta, ResolvedChart};
pub use schedule::{ProjectDay, ProjectSchedule, UserSchedule};
pub use time_entry::{TimeEntry, WorkKey, is_booked_by};
pub use types::{BookingId, IdError, IssueId, MilestoneId, ProjectId, TimeEntryId, UserId};
pub use visibility::Visibility;
