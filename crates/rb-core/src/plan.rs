//! One user's day: active bookings against logged time.

use chrono::NaiveDate;
use serde::Serialize;

use crate::booking::Booking;
use crate::time_entry::{TimeEntry, WorkKey, is_booked_by};

/// How much of a booking's planned hours were logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Progress {
    /// Nothing logged yet.
    Todo,
    /// Logged exactly the planned hours.
    Planned,
    /// Logged less; `percent` of the plan is done.
    Underload { percent: u32 },
    /// Logged more; the plan is `percent` of what was spent.
    Overload { percent: u32 },
}

impl Progress {
    #[allow(
        clippy::float_cmp,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn classify(spent: f64, planned: f64) -> Self {
        if spent == 0.0 {
            Self::Todo
        } else if spent == planned {
            Self::Planned
        } else if spent < planned {
            Self::Underload {
                percent: (spent * 100.0 / planned).floor() as u32,
            }
        } else {
            Self::Overload {
                percent: (planned * 100.0 / spent).floor() as u32,
            }
        }
    }
}

/// An active booking on the day with the time logged against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookedCard<'a> {
    pub booking: &'a Booking,
    pub planned_hours: f64,
    pub spent_hours: f64,
    pub progress: Progress,
}

/// Logged time with no matching booking, grouped by project and issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnbookedCard<'a> {
    pub key: WorkKey,
    pub entries: Vec<&'a TimeEntry>,
    pub spent_hours: f64,
}

/// Allocation of the day against the user's workday length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    /// Not a workday.
    Off,
    Full,
    Overload,
    Underload,
}

impl WorkloadStatus {
    #[allow(clippy::float_cmp)]
    pub fn classify(is_workday: bool, allocated: f64, workday_length: f64) -> Self {
        if !is_workday {
            Self::Off
        } else if allocated == workday_length {
            Self::Full
        } else if allocated > workday_length {
            Self::Overload
        } else {
            Self::Underload
        }
    }
}

/// One (user, date) cell of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPlan<'a> {
    pub date: NaiveDate,
    pub is_workday: bool,
    /// Bookings covering the date.
    pub bookings: Vec<&'a Booking>,
    /// Time logged on the date.
    pub time_entries: Vec<&'a TimeEntry>,
    /// Entries matching one of `bookings`.
    pub booked_entries: Vec<&'a TimeEntry>,
    pub unbooked_entries: Vec<&'a TimeEntry>,
    /// Sum of `hours_per_day` over `bookings`.
    pub allocated_hours: f64,
    pub spent_hours: f64,
    pub workload: WorkloadStatus,
    pub booked_cards: Vec<BookedCard<'a>>,
    pub unbooked_cards: Vec<UnbookedCard<'a>>,
}

impl<'a> DailyPlan<'a> {
    /// Builds the plan from bookings and entries already filtered to the
    /// user and the date.
    pub fn new(
        date: NaiveDate,
        is_workday: bool,
        workday_length: f64,
        bookings: Vec<&'a Booking>,
        time_entries: Vec<&'a TimeEntry>,
    ) -> Self {
        let (booked_entries, unbooked_entries): (Vec<_>, Vec<_>) = time_entries
            .iter()
            .copied()
            .partition(|entry| bookings.iter().any(|booking| is_booked_by(entry, booking)));

        let allocated_hours: f64 = bookings.iter().map(|booking| booking.hours_per_day()).sum();
        let spent_hours: f64 = time_entries.iter().map(|entry| entry.hours).sum();
        let workload = WorkloadStatus::classify(is_workday, allocated_hours, workday_length);

        let booked_cards = bookings
            .iter()
            .filter_map(|&booking| {
                let key = WorkKey {
                    project_id: booking.project_id(),
                    issue_id: booking.issue_id(),
                };
                let matching: Vec<_> = booked_entries
                    .iter()
                    .filter(|entry| entry.key() == key)
                    .collect();
                if !is_workday && matching.is_empty() {
                    return None;
                }
                let spent_hours: f64 = matching.iter().map(|entry| entry.hours).sum();
                let planned_hours = booking.hours_per_day();
                Some(BookedCard {
                    booking,
                    planned_hours,
                    spent_hours,
                    progress: Progress::classify(spent_hours, planned_hours),
                })
            })
            .collect();

        let unbooked_cards = group_unbooked(&unbooked_entries);

        Self {
            date,
            is_workday,
            bookings,
            time_entries,
            booked_entries,
            unbooked_entries,
            allocated_hours,
            spent_hours,
            workload,
            booked_cards,
            unbooked_cards,
        }
    }

    /// Whether the workload summary is worth showing for the day.
    pub fn workload_visible(&self) -> bool {
        self.is_workday || self.spent_hours > 0.0
    }
}

fn group_unbooked<'a>(entries: &[&'a TimeEntry]) -> Vec<UnbookedCard<'a>> {
    let mut cards: Vec<UnbookedCard<'a>> = Vec::new();
    for &entry in entries {
        let key = entry.key();
        if let Some(card) = cards.iter_mut().find(|card| card.key == key) {
            card.entries.push(entry);
            card.spent_hours += entry.hours;
        } else {
            cards.push(UnbookedCard {
                key,
                entries: vec![entry],
                spent_hours: entry.hours,
            });
        }
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingDraft;
    use crate::types::{IssueId, ProjectId, UserId};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 1, d).unwrap()
    }

    fn booking(project: i64, issue: Option<i64>, hours: f64) -> Booking {
        BookingDraft {
            project_id: Some(ProjectId::new(project).unwrap()),
            assigned_to_id: Some(UserId::new(1).unwrap()),
            issue_id: issue.map(|id| IssueId::new(id).unwrap()),
            start_date: Some(date(1)),
            end_date: Some(date(31)),
            hours_per_day: Some(hours),
            ..BookingDraft::default()
        }
        .validate()
        .unwrap()
    }

    fn entry(project: i64, issue: Option<i64>, hours: f64) -> TimeEntry {
        TimeEntry {
            id: None,
            user_id: UserId::new(1).unwrap(),
            project_id: ProjectId::new(project).unwrap(),
            issue_id: issue.map(|id| IssueId::new(id).unwrap()),
            spent_on: date(3),
            hours,
            activity: String::new(),
        }
    }

    #[test]
    fn progress_classification() {
        assert_eq!(Progress::classify(0.0, 4.0), Progress::Todo);
        assert_eq!(Progress::classify(4.0, 4.0), Progress::Planned);
        assert_eq!(
            Progress::classify(1.0, 3.0),
            Progress::Underload { percent: 33 }
        );
        assert_eq!(
            Progress::classify(6.0, 4.0),
            Progress::Overload { percent: 66 }
        );
    }

    #[test]
    fn workload_status_classification() {
        assert_eq!(WorkloadStatus::classify(false, 8.0, 8.0), WorkloadStatus::Off);
        assert_eq!(WorkloadStatus::classify(true, 8.0, 8.0), WorkloadStatus::Full);
        assert_eq!(
            WorkloadStatus::classify(true, 9.0, 8.0),
            WorkloadStatus::Overload
        );
        assert_eq!(
            WorkloadStatus::classify(true, 0.0, 8.0),
            WorkloadStatus::Underload
        );
    }

    #[test]
    fn entries_split_into_booked_and_unbooked() {
        let on_issue = booking(1, Some(10), 4.0);
        let on_project = booking(2, None, 2.0);
        let entries = [
            entry(1, Some(10), 3.0),
            entry(2, None, 1.0),
            entry(1, None, 1.5),
            entry(3, Some(11), 2.0),
            entry(1, None, 0.5),
        ];

        let plan = DailyPlan::new(
            date(3),
            true,
            8.0,
            vec![&on_issue, &on_project],
            entries.iter().collect(),
        );

        assert_eq!(plan.booked_entries.len(), 2);
        assert_eq!(plan.unbooked_entries.len(), 3);
        assert!((plan.allocated_hours - 6.0).abs() < f64::EPSILON);
        assert!((plan.spent_hours - 8.0).abs() < f64::EPSILON);
        assert_eq!(plan.workload, WorkloadStatus::Underload);

        assert_eq!(plan.booked_cards.len(), 2);
        assert_eq!(
            plan.booked_cards[0].progress,
            Progress::Underload { percent: 75 }
        );
        assert_eq!(
            plan.booked_cards[1].progress,
            Progress::Underload { percent: 50 }
        );

        // Grouped by (project, issue) in first-appearance order.
        assert_eq!(plan.unbooked_cards.len(), 2);
        assert_eq!(plan.unbooked_cards[0].entries.len(), 2);
        assert!((plan.unbooked_cards[0].spent_hours - 2.0).abs() < f64::EPSILON);
        assert_eq!(
            plan.unbooked_cards[1].key.issue_id,
            Some(IssueId::new(11).unwrap())
        );
    }

    #[test]
    fn weekend_cards_need_logged_time() {
        let idle = booking(1, None, 4.0);
        let worked = booking(2, None, 4.0);
        let entries = [entry(2, None, 1.0)];

        let plan = DailyPlan::new(date(5), false, 8.0, vec![&idle, &worked], entries.iter().collect());

        assert_eq!(plan.workload, WorkloadStatus::Off);
        assert_eq!(plan.booked_cards.len(), 1);
        assert_eq!(plan.booked_cards[0].booking.project_id(), ProjectId::new(2).unwrap());
        assert!(plan.workload_visible());

        let empty = DailyPlan::new(date(5), false, 8.0, vec![&idle], Vec::new());
        assert!(empty.booked_cards.is_empty());
        assert!(!empty.workload_visible());
    }
}
