//! Bookings: a user allocated to a project or issue for a date range.
//!
//! Input arrives as a [`BookingDraft`] whose fields may be missing or
//! inconsistent. [`BookingDraft::validate`] turns it into a [`Booking`],
//! which always has the required fields, `start <= end` and
//! `0 <= hours_per_day <= 24`. Warnings never block a write; they are
//! computed separately against the related issue and its other bookings.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::calendar::Calendar;
use crate::interval::Interval;
use crate::issue::Issue;
use crate::types::{BookingId, IssueId, ProjectId, UserId};

/// Upper bound for `hours_per_day`.
pub const MAX_HOURS_PER_DAY: f64 = 24.0;

/// Average month length in days, used to size the window a booking needs.
const DAYS_PER_MONTH: f64 = 30.436_875;

/// A single field-level rule violation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required attribute is absent.
    #[error("{field} cannot be blank")]
    Missing { field: &'static str },

    /// `end_date` precedes `start_date`.
    #[error("end date {end} must be greater than or equal to start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    /// `hours_per_day` outside `[0, 24]` (or not a number).
    #[error("hours per day must be between 0 and 24, got {value}")]
    HoursOutOfRange { value: f64 },

    /// Shifting a date left the representable range.
    #[error("{field} cannot be moved by {days} days from {date}")]
    DateOutOfRange {
        field: &'static str,
        date: NaiveDate,
        days: i64,
    },
}

impl ValidationError {
    /// The attribute the error is attached to.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Missing { field } | Self::DateOutOfRange { field, .. } => field,
            Self::EndBeforeStart { .. } => "end date",
            Self::HoursOutOfRange { .. } => "hours per day",
        }
    }
}

/// Every rule a draft violated. Never empty.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid booking: {}", join_errors(.0))]
pub struct ValidationErrors(Vec<ValidationError>);

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

/// Unvalidated booking attributes, as submitted by a user or loaded for editing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    /// Set when the draft edits a persisted booking.
    pub id: Option<BookingId>,
    pub project_id: Option<ProjectId>,
    pub assigned_to_id: Option<UserId>,
    pub issue_id: Option<IssueId>,
    pub start_date: Option<NaiveDate>,
    /// Defaults to `start_date` when absent.
    pub end_date: Option<NaiveDate>,
    pub hours_per_day: Option<f64>,
    pub notes: String,
    pub author_id: Option<UserId>,
    pub created_at: Option<DateTime<Utc>>,
}

impl BookingDraft {
    /// Checks every rule and returns the validated booking or all violations.
    pub fn validate(self) -> Result<Booking, ValidationErrors> {
        let mut errors = Vec::new();

        if self.project_id.is_none() {
            errors.push(ValidationError::Missing { field: "project" });
        }
        if self.assigned_to_id.is_none() {
            errors.push(ValidationError::Missing {
                field: "assigned to",
            });
        }
        if self.start_date.is_none() {
            errors.push(ValidationError::Missing {
                field: "start date",
            });
        }
        match self.hours_per_day {
            None => errors.push(ValidationError::Missing {
                field: "hours per day",
            }),
            Some(value) if value.is_nan() || !(0.0..=MAX_HOURS_PER_DAY).contains(&value) => {
                errors.push(ValidationError::HoursOutOfRange { value });
            }
            Some(_) => {}
        }

        let interval = self.start_date.and_then(|start| {
            let end = self.end_date.unwrap_or(start);
            Interval::new(start, end)
                .map_err(|_| errors.push(ValidationError::EndBeforeStart { start, end }))
                .ok()
        });

        match (
            self.project_id,
            self.assigned_to_id,
            self.hours_per_day,
            interval,
        ) {
            (Some(project_id), Some(assigned_to_id), Some(hours_per_day), Some(interval))
                if errors.is_empty() =>
            {
                Ok(Booking {
                    id: self.id,
                    project_id,
                    assigned_to_id,
                    issue_id: self.issue_id,
                    end_date: self.end_date,
                    hours_per_day,
                    notes: self.notes,
                    author_id: self.author_id,
                    created_at: self.created_at,
                    interval,
                })
            }
            _ => Err(ValidationErrors(errors)),
        }
    }
}

/// A validated allocation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<BookingId>,
    project_id: ProjectId,
    assigned_to_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue_id: Option<IssueId>,
    /// As entered; the effective end lives in `interval`.
    #[serde(skip)]
    end_date: Option<NaiveDate>,
    hours_per_day: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    interval: Interval,
}

impl Booking {
    pub const fn id(&self) -> Option<BookingId> {
        self.id
    }

    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub const fn assigned_to_id(&self) -> UserId {
        self.assigned_to_id
    }

    pub const fn issue_id(&self) -> Option<IssueId> {
        self.issue_id
    }

    pub const fn start_date(&self) -> NaiveDate {
        self.interval.start()
    }

    /// The end date as stored; `None` means a single-day booking.
    pub const fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// `end_date`, or `start_date` when no end was given.
    pub const fn effective_end_date(&self) -> NaiveDate {
        self.interval.end()
    }

    pub const fn hours_per_day(&self) -> f64 {
        self.hours_per_day
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub const fn author_id(&self) -> Option<UserId> {
        self.author_id
    }

    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub const fn interval(&self) -> Interval {
        self.interval
    }

    /// Returns a copy carrying the id assigned by storage.
    #[must_use]
    pub fn with_id(mut self, id: BookingId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns a copy stamped with the time storage created it.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Editable copy of the attributes.
    pub fn to_draft(&self) -> BookingDraft {
        BookingDraft {
            id: self.id,
            project_id: Some(self.project_id),
            assigned_to_id: Some(self.assigned_to_id),
            issue_id: self.issue_id,
            start_date: Some(self.start_date()),
            end_date: self.end_date,
            hours_per_day: Some(self.hours_per_day),
            notes: self.notes.clone(),
            author_id: self.author_id,
            created_at: self.created_at,
        }
    }

    /// Workdays covered by the booking.
    pub fn working_days(&self, calendar: &Calendar) -> u32 {
        calendar.working_days_in(&self.interval)
    }

    /// Calendar days covered, weekends included.
    pub fn total_days(&self) -> i64 {
        self.interval.len_days()
    }

    /// Day-weighted committed hours: workdays × hours per day.
    pub fn total_hours(&self, calendar: &Calendar) -> f64 {
        f64::from(self.working_days(calendar)) * self.hours_per_day
    }

    /// Month span needed to show the whole booking, at least 1.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn distance_in_months(&self) -> u32 {
        let days = (self.effective_end_date() - self.start_date()).num_days();
        if days > 0 {
            (days as f64 / DAYS_PER_MONTH).ceil() as u32
        } else {
            1
        }
    }

    /// True iff the booking touches `[from, to]`.
    pub fn is_between(&self, from: NaiveDate, to: NaiveDate) -> bool {
        Interval::new(from, to).is_ok_and(|range| self.interval.overlaps(&range))
    }

    /// True iff this booking overlaps none of the bookings already in `lane`.
    pub fn can_add_to(&self, lane: &[&Self]) -> bool {
        lane.iter()
            .all(|other| !self.interval.overlaps(&other.interval))
    }

    /// Draft moved by `start_offset` days, with the end moved by `end_offset`
    /// days when given (drag and resize on the chart).
    pub fn shifted(
        &self,
        start_offset: i64,
        end_offset: Option<i64>,
    ) -> Result<BookingDraft, ValidationError> {
        let mut draft = self.to_draft();
        draft.start_date = Some(offset_date("start date", self.start_date(), start_offset)?);
        if let Some(days) = end_offset {
            draft.end_date = Some(offset_date("end date", self.effective_end_date(), days)?);
        }
        Ok(draft)
    }

    /// Non-blocking warnings for this booking.
    pub fn warnings(&self, context: &WarningContext<'_>) -> Vec<BookingWarning> {
        let Some(issue) = context
            .issue
            .filter(|issue| Some(issue.id) == self.issue_id)
        else {
            return Vec::new();
        };

        let mut warnings = Vec::new();

        let end = self.effective_end_date();
        let expired = end < context.today;
        if let Some(due_date) = issue.due_date {
            if !expired && due_date < end {
                warnings.push(BookingWarning::EndDateAfterIssueDueDate { due_date });
            }
        }

        if let Some(estimated_hours) = issue.estimated_hours {
            let total_hours = self.issue_total_hours(issue.id, context);
            if estimated_hours < total_hours {
                warnings.push(BookingWarning::EstimatedHoursExceeded {
                    estimated_hours,
                    total_hours,
                });
            }
        }

        if !warnings.is_empty() {
            tracing::debug!(booking = ?self.id, count = warnings.len(), "booking has warnings");
        }
        warnings
    }

    /// Hours booked on `issue` across its bookings, replacing any stored
    /// version of this booking with this one.
    fn issue_total_hours(&self, issue: IssueId, context: &WarningContext<'_>) -> f64 {
        let others: f64 = context
            .issue_bookings
            .iter()
            .filter(|other| other.issue_id == Some(issue))
            .filter(|other| self.id.is_none() || other.id != self.id)
            .map(|other| other.total_hours(context.calendar))
            .sum();
        others + self.total_hours(context.calendar)
    }
}

fn offset_date(field: &'static str, date: NaiveDate, days: i64) -> Result<NaiveDate, ValidationError> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or(ValidationError::DateOutOfRange { field, date, days })
}

/// What warnings are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct WarningContext<'a> {
    /// The issue the booking is on, if any.
    pub issue: Option<&'a Issue>,
    /// Stored bookings on that issue. May include a prior version of the
    /// booking being checked; it is excluded by id.
    pub issue_bookings: &'a [Booking],
    pub calendar: &'a Calendar,
    pub today: NaiveDate,
}

/// A concern about a booking that does not block saving it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingWarning {
    /// The booking ends after the issue is due.
    EndDateAfterIssueDueDate { due_date: NaiveDate },
    /// All bookings on the issue add up to more than its estimate.
    EstimatedHoursExceeded {
        estimated_hours: f64,
        total_hours: f64,
    },
}

impl fmt::Display for BookingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndDateAfterIssueDueDate { due_date } => {
                write!(f, "end date must be less than or equal to issue due date ({due_date})")
            }
            Self::EstimatedHoursExceeded {
                estimated_hours,
                total_hours,
            } => write!(
                f,
                "total booked time ({total_hours} h) exceeds estimated time ({estimated_hours} h)"
            ),
        }
    }
}

/// A booking that passed validation, with its warnings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedBooking {
    pub booking: Booking,
    pub warnings: Vec<BookingWarning>,
}

/// Validates a draft and computes its warnings.
pub fn validate(
    draft: BookingDraft,
    context: &WarningContext<'_>,
) -> Result<ValidatedBooking, ValidationErrors> {
    let booking = draft.validate()?;
    let warnings = booking.warnings(context);
    Ok(ValidatedBooking { booking, warnings })
}

/// Which half of a split failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitHalf {
    /// The stored booking, truncated before the split date.
    Original,
    /// The new booking starting at the split date.
    New,
}

impl fmt::Display for SplitHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::New => write!(f, "new"),
        }
    }
}

/// A split that must not be committed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SplitError {
    /// One of the halves failed validation; nothing may be written.
    #[error("split failed, {half} booking is invalid: {source}")]
    Invalid {
        half: SplitHalf,
        #[source]
        source: ValidationErrors,
    },
}

/// Both halves of a successful split, ready to be written together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitOutcome {
    /// Keeps the stored id; ends the day before the split date.
    pub original: ValidatedBooking,
    /// Has no id yet; starts on the split date.
    pub new: ValidatedBooking,
}

impl Booking {
    /// Splits at `start_date + offset_days`.
    ///
    /// The original ends the day before the split date and a copy starts
    /// on it. Both halves are validated before anything is returned, so a
    /// caller that writes the outcome in one transaction is atomic.
    pub fn split(
        &self,
        offset_days: i64,
        context: &WarningContext<'_>,
    ) -> Result<SplitOutcome, SplitError> {
        let invalid =
            |half: SplitHalf, source: ValidationErrors| SplitError::Invalid { half, source };

        let split_date = offset_date("split date", self.start_date(), offset_days)
            .map_err(|err| invalid(SplitHalf::New, err.into()))?;
        let original_end = offset_date("end date", split_date, -1)
            .map_err(|err| invalid(SplitHalf::Original, err.into()))?;

        let mut original = self.to_draft();
        original.end_date = Some(original_end);
        // The new half never runs past the effective end, stored or not.
        let mut new = self.to_draft();
        new.id = None;
        new.created_at = None;
        new.start_date = Some(split_date);
        new.end_date = Some(self.effective_end_date());

        let original = original
            .validate()
            .map_err(|err| invalid(SplitHalf::Original, err))?;
        let new = new.validate().map_err(|err| invalid(SplitHalf::New, err))?;

        // Warnings see the pair in place of the unsplit booking.
        let mut siblings: Vec<Booking> = context
            .issue_bookings
            .iter()
            .filter(|other| self.id.is_none() || other.id != self.id)
            .cloned()
            .collect();
        siblings.push(new.clone());
        let original_warnings = original.warnings(&WarningContext {
            issue_bookings: &siblings,
            ..*context
        });
        siblings.pop();
        siblings.push(original.clone());
        let new_warnings = new.warnings(&WarningContext {
            issue_bookings: &siblings,
            ..*context
        });

        tracing::debug!(booking = ?self.id, %split_date, "split booking");
        Ok(SplitOutcome {
            original: ValidatedBooking {
                booking: original,
                warnings: original_warnings,
            },
            new: ValidatedBooking {
                booking: new,
                warnings: new_warnings,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, m, d).unwrap()
    }

    fn draft(start: NaiveDate, end: Option<NaiveDate>, hours: f64) -> BookingDraft {
        BookingDraft {
            project_id: Some(ProjectId::new(1).unwrap()),
            assigned_to_id: Some(UserId::new(2).unwrap()),
            issue_id: Some(IssueId::new(1).unwrap()),
            start_date: Some(start),
            end_date: end,
            hours_per_day: Some(hours),
            ..BookingDraft::default()
        }
    }

    fn issue(due: Option<NaiveDate>, estimate: Option<f64>) -> Issue {
        Issue {
            id: IssueId::new(1).unwrap(),
            project_id: ProjectId::new(1).unwrap(),
            subject: "Cannot print recipes".to_string(),
            due_date: due,
            estimated_hours: estimate,
        }
    }

    fn context<'a>(
        issue: Option<&'a Issue>,
        bookings: &'a [Booking],
        calendar: &'a Calendar,
        today: NaiveDate,
    ) -> WarningContext<'a> {
        WarningContext {
            issue,
            issue_bookings: bookings,
            calendar,
            today,
        }
    }

    #[test]
    fn validate_reports_every_missing_field() {
        let errors = BookingDraft::default().validate().unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(ValidationError::field).collect();
        assert_eq!(
            fields,
            vec!["project", "assigned to", "start date", "hours per day"]
        );
    }

    #[test]
    fn validate_rejects_end_before_start() {
        let errors = draft(date(1, 10), Some(date(1, 9)), 4.0)
            .validate()
            .unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::EndBeforeStart {
                start: date(1, 10),
                end: date(1, 9)
            }]
        );
        assert!(errors.to_string().contains("end date 2019-01-09"));
    }

    #[test]
    fn validate_hours_boundaries() {
        for hours in [0.0, 24.0, 7.5] {
            assert!(draft(date(1, 1), None, hours).validate().is_ok(), "{hours}");
        }
        for hours in [24.01, -0.01, f64::NAN] {
            let errors = draft(date(1, 1), None, hours).validate().unwrap_err();
            assert_eq!(errors.errors().len(), 1, "{hours}");
            assert_eq!(errors.errors()[0].field(), "hours per day");
        }
    }

    #[test]
    fn missing_end_defaults_to_start() {
        let booking = draft(date(1, 3), None, 4.0).validate().unwrap();
        assert_eq!(booking.end_date(), None);
        assert_eq!(booking.effective_end_date(), date(1, 3));
        assert_eq!(booking.total_days(), 1);
    }

    #[test]
    fn total_hours_counts_working_days_only() {
        let calendar = Calendar::default();
        // Tue 01-01 .. Mon 01-07: 5 workdays.
        let booking = draft(date(1, 1), Some(date(1, 7)), 6.0).validate().unwrap();
        assert_eq!(booking.working_days(&calendar), 5);
        assert!((booking.total_hours(&calendar) - 30.0).abs() < f64::EPSILON);
        assert_eq!(booking.total_days(), 7);
    }

    #[test]
    fn distance_in_months_is_at_least_one() {
        let single = draft(date(1, 1), None, 1.0).validate().unwrap();
        assert_eq!(single.distance_in_months(), 1);
        let month = draft(date(1, 1), Some(date(1, 31)), 1.0).validate().unwrap();
        assert_eq!(month.distance_in_months(), 1);
        let longer = draft(date(1, 1), Some(date(3, 15)), 1.0).validate().unwrap();
        assert_eq!(longer.distance_in_months(), 3);
    }

    #[test]
    fn can_add_to_checks_every_lane_member() {
        let a = draft(date(1, 1), Some(date(1, 5)), 1.0).validate().unwrap();
        let b = draft(date(1, 10), Some(date(1, 12)), 1.0).validate().unwrap();
        let c = draft(date(1, 5), Some(date(1, 9)), 1.0).validate().unwrap();
        let d = draft(date(1, 6), Some(date(1, 9)), 1.0).validate().unwrap();
        assert!(c.can_add_to(&[]));
        assert!(!c.can_add_to(&[&a, &b]));
        assert!(d.can_add_to(&[&a, &b]));
    }

    #[test]
    fn due_date_warning_when_end_after_due() {
        let calendar = Calendar::default();
        let issue = issue(Some(date(1, 20)), None);
        let result = validate(
            draft(date(1, 1), Some(date(1, 25)), 6.0),
            &context(Some(&issue), &[], &calendar, date(1, 2)),
        )
        .unwrap();
        assert_eq!(
            result.warnings,
            vec![BookingWarning::EndDateAfterIssueDueDate {
                due_date: date(1, 20)
            }]
        );
    }

    #[test]
    fn due_date_warning_skipped_for_expired_booking() {
        let calendar = Calendar::default();
        let issue = issue(Some(date(1, 20)), None);
        let result = validate(
            draft(date(1, 1), Some(date(1, 25)), 6.0),
            &context(Some(&issue), &[], &calendar, date(1, 26)),
        )
        .unwrap();
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn due_date_warning_needs_strictly_later_end() {
        let calendar = Calendar::default();
        let issue = issue(Some(date(1, 20)), None);
        let result = validate(
            draft(date(1, 1), Some(date(1, 20)), 6.0),
            &context(Some(&issue), &[], &calendar, date(1, 2)),
        )
        .unwrap();
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn warnings_ignore_unrelated_issue() {
        let calendar = Calendar::default();
        let mut other = issue(Some(date(1, 2)), Some(1.0));
        other.id = IssueId::new(9).unwrap();
        let result = validate(
            draft(date(1, 1), Some(date(1, 25)), 6.0),
            &context(Some(&other), &[], &calendar, date(1, 1)),
        )
        .unwrap();
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn estimated_hours_warning_sums_other_bookings() {
        let calendar = Calendar::default();
        let issue = issue(None, Some(40.0));
        // 5 workdays × 4h = 20h stored.
        let stored = draft(date(1, 1), Some(date(1, 7)), 4.0)
            .validate()
            .unwrap()
            .with_id(BookingId::new(1).unwrap());
        let stored = [stored];

        // New booking: 5 workdays × 4h = 20h, total 40h, not exceeded.
        let ok = validate(
            draft(date(1, 8), Some(date(1, 14)), 4.0),
            &context(Some(&issue), &stored, &calendar, date(1, 1)),
        )
        .unwrap();
        assert!(ok.warnings.is_empty());

        // 5 workdays × 5h = 25h, total 45h.
        let over = validate(
            draft(date(1, 8), Some(date(1, 14)), 5.0),
            &context(Some(&issue), &stored, &calendar, date(1, 1)),
        )
        .unwrap();
        assert_eq!(
            over.warnings,
            vec![BookingWarning::EstimatedHoursExceeded {
                estimated_hours: 40.0,
                total_hours: 45.0
            }]
        );
    }

    #[test]
    fn estimated_hours_excludes_prior_version_of_same_booking() {
        let calendar = Calendar::default();
        let issue = issue(None, Some(30.0));
        let id = BookingId::new(1).unwrap();
        let stored = [draft(date(1, 1), Some(date(1, 7)), 6.0)
            .validate()
            .unwrap()
            .with_id(id)];

        // Editing the stored booking down to 5h: 25h, the old 30h is not counted.
        let mut edit = stored[0].to_draft();
        edit.hours_per_day = Some(5.0);
        let result = validate(edit, &context(Some(&issue), &stored, &calendar, date(1, 1))).unwrap();
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn shifted_moves_start_and_optionally_end() {
        let booking = draft(date(1, 10), None, 4.0).validate().unwrap();
        let moved = booking.shifted(2, Some(4)).unwrap().validate().unwrap();
        assert_eq!(moved.start_date(), date(1, 12));
        assert_eq!(moved.effective_end_date(), date(1, 14));

        let start_only = booking.shifted(-3, None).unwrap();
        assert_eq!(start_only.start_date, Some(date(1, 7)));
        assert_eq!(start_only.end_date, None);

        // Moving the start past an explicit end is caught by validation.
        let ranged = draft(date(1, 10), Some(date(1, 12)), 4.0).validate().unwrap();
        assert!(ranged.shifted(5, None).unwrap().validate().is_err());
    }

    #[test]
    fn split_produces_two_adjacent_bookings() {
        let calendar = Calendar::default();
        let booking = draft(date(1, 1), Some(date(1, 31)), 6.0)
            .validate()
            .unwrap()
            .with_id(BookingId::new(7).unwrap());

        let outcome = booking
            .split(10, &context(None, &[], &calendar, date(1, 1)))
            .unwrap();

        let original = &outcome.original.booking;
        let new = &outcome.new.booking;
        assert_eq!(original.id(), booking.id());
        assert_eq!(original.start_date(), date(1, 1));
        assert_eq!(original.effective_end_date(), date(1, 10));
        assert_eq!(new.id(), None);
        assert_eq!(new.start_date(), date(1, 11));
        assert_eq!(new.effective_end_date(), date(1, 31));
        assert!((original.hours_per_day() - 6.0).abs() < f64::EPSILON);
        assert!((new.hours_per_day() - 6.0).abs() < f64::EPSILON);
        assert_eq!(new.project_id(), booking.project_id());
        assert_eq!(new.issue_id(), booking.issue_id());
    }

    #[test]
    fn split_at_offset_zero_fails_on_original_half() {
        let calendar = Calendar::default();
        let booking = draft(date(1, 1), Some(date(1, 31)), 6.0).validate().unwrap();
        let err = booking
            .split(0, &context(None, &[], &calendar, date(1, 1)))
            .unwrap_err();
        let SplitError::Invalid { half, source } = err;
        assert_eq!(half, SplitHalf::Original);
        assert_eq!(source.errors()[0].field(), "end date");
    }

    #[test]
    fn split_past_end_fails_on_new_half() {
        let calendar = Calendar::default();
        let booking = draft(date(1, 1), Some(date(1, 31)), 6.0).validate().unwrap();
        let err = booking
            .split(31, &context(None, &[], &calendar, date(1, 1)))
            .unwrap_err();
        assert!(matches!(
            err,
            SplitError::Invalid {
                half: SplitHalf::New,
                ..
            }
        ));
        assert!(err.to_string().starts_with("split failed, new booking is invalid"));
    }

    #[test]
    fn split_past_end_of_single_day_booking_fails_on_new_half() {
        let calendar = Calendar::default();
        let booking = draft(date(1, 7), None, 8.0).validate().unwrap();
        let err = booking
            .split(5, &context(None, &[], &calendar, date(1, 1)))
            .unwrap_err();
        let SplitError::Invalid { half, source } = err;
        assert_eq!(half, SplitHalf::New);
        assert_eq!(
            source.errors(),
            &[ValidationError::EndBeforeStart {
                start: date(1, 12),
                end: date(1, 7)
            }]
        );
    }

    #[test]
    fn split_new_half_has_no_creation_time() {
        let calendar = Calendar::default();
        let mut stored = draft(date(1, 1), Some(date(1, 31)), 6.0);
        stored.created_at = Some(DateTime::<Utc>::UNIX_EPOCH);
        let booking = stored.validate().unwrap();

        let outcome = booking
            .split(10, &context(None, &[], &calendar, date(1, 1)))
            .unwrap();
        assert_eq!(outcome.original.booking.created_at(), booking.created_at());
        assert_eq!(outcome.new.booking.created_at(), None);
    }

    #[test]
    fn split_does_not_double_count_estimate() {
        let calendar = Calendar::default();
        // 23 workdays in January 2019 × 1h = 23h.
        let issue = issue(None, Some(23.0));
        let booking = draft(date(1, 1), Some(date(1, 31)), 1.0)
            .validate()
            .unwrap()
            .with_id(BookingId::new(3).unwrap());
        let stored = [booking.clone()];

        let outcome = booking
            .split(10, &context(Some(&issue), &stored, &calendar, date(1, 1)))
            .unwrap();
        assert!(outcome.original.warnings.is_empty());
        assert!(outcome.new.warnings.is_empty());
    }

    #[test]
    fn booking_serializes_effective_interval() {
        let booking = draft(date(1, 3), None, 4.0).validate().unwrap();
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["start"], "2019-01-03");
        assert_eq!(json["end"], "2019-01-03");
        assert_eq!(json["hours_per_day"], 4.0);
        assert!(json.get("id").is_none());
    }
}
