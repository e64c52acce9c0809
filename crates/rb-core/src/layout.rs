//! Timeline layout: lane packing and pixel geometry.
//!
//! # Algorithm Summary
//!
//! 1. Group bookings by user, then by project, then by subject (issue or
//!    project-level), keeping first-appearance order at every level.
//! 2. Pack each subject group into lanes with greedy first-fit: a booking
//!    goes into the first lane it does not overlap, or opens a new lane.
//! 3. Map every booking to `[bar_start, bar_end)` pixels at the zoom's
//!    column width, clipped to the visible window.
//! 4. Build a per-user load line (workday length minus scheduled hours per
//!    day) and merge equal neighbouring days into segments.
//!
//! Every step is a pure function of its inputs, so re-running it with the
//! same bookings in the same order reproduces the same lanes and pixels.

use std::collections::HashMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::booking::Booking;
use crate::calendar::{Calendar, CalendarError, MonthWindow};
use crate::interval::Interval;
use crate::issue::Milestone;
use crate::types::{IssueId, ProjectId, UserId};

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 3;

/// Errors raised while setting up a layout.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("zoom must be between {MIN_ZOOM} and {MAX_ZOOM}, got {value}")]
    ZoomOutOfRange { value: u8 },

    #[error(transparent)]
    Window(#[from] CalendarError),
}

/// Chart zoom level, 1 to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub struct Zoom(u8);

impl Zoom {
    pub const fn new(value: u8) -> Result<Self, LayoutError> {
        if value < MIN_ZOOM || value > MAX_ZOOM {
            return Err(LayoutError::ZoomOutOfRange { value });
        }
        Ok(Self(value))
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Pixel width of one day column.
    pub const fn column_width(self) -> i64 {
        match self.0 {
            1 => 30,
            2 => 60,
            _ => 100,
        }
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(MIN_ZOOM)
    }
}

impl From<Zoom> for u8 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}

/// Horizontal pixel extent of a bar, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BarCoords {
    pub bar_start: i64,
    pub bar_end: i64,
}

impl BarCoords {
    pub const fn width(self) -> i64 {
        self.bar_end - self.bar_start
    }
}

/// Maps an interval to pixels, clipped to the window.
///
/// Returns `None` when the interval lies entirely outside the window.
pub fn coordinates(interval: &Interval, window: &MonthWindow, zoom: Zoom) -> Option<BarCoords> {
    let visible = interval.intersection(&window.range())?;
    let width = zoom.column_width();
    let from = window.date_from();
    Some(BarCoords {
        bar_start: (visible.start() - from).num_days() * width,
        bar_end: ((visible.end() - from).num_days() + 1) * width,
    })
}

/// Order in which a group is packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackMode {
    /// As supplied.
    #[default]
    Retrieval,
    /// By start date; lanes and their contents are sorted by start date too.
    Sorted,
}

/// Packs bookings into lanes so that no two bookings in a lane overlap.
pub fn pack_lanes<'a>(bookings: &[&'a Booking], mode: PackMode) -> Vec<Vec<&'a Booking>> {
    let mut ordered = bookings.to_vec();
    if mode == PackMode::Sorted {
        ordered.sort_by_key(|booking| booking.start_date());
    }

    let mut lanes: Vec<Vec<&'a Booking>> = Vec::new();
    for booking in ordered {
        if let Some(index) = lanes.iter().position(|lane| booking.can_add_to(lane)) {
            lanes[index].push(booking);
        } else {
            lanes.push(vec![booking]);
        }
    }

    if mode == PackMode::Sorted {
        for lane in &mut lanes {
            lane.sort_by_key(|booking| booking.start_date());
        }
        lanes.sort_by_key(|lane| lane.first().map(|booking| booking.start_date()));
    }
    lanes
}

/// Colour class of a load segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Full,
    Underload,
    Overload,
}

impl LoadStatus {
    pub fn classify(load_hours: f64) -> Self {
        if load_hours > 0.0 {
            Self::Underload
        } else if load_hours < 0.0 {
            Self::Overload
        } else {
            Self::Full
        }
    }
}

/// Consecutive days sharing the same load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadSegment {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Workday length minus scheduled hours; negative when overbooked.
    pub load_hours: f64,
    pub status: LoadStatus,
    pub coords: BarCoords,
}

/// Load per day of the window; `None` on non-workdays and unbooked days.
pub fn daily_load(
    bookings: &[&Booking],
    workday_length: f64,
    window: &MonthWindow,
    calendar: &Calendar,
) -> Vec<Option<f64>> {
    window
        .range()
        .days()
        .map(|day| {
            if !calendar.is_workday(day) {
                return None;
            }
            let mut active = bookings
                .iter()
                .filter(|booking| booking.interval().covers(day))
                .peekable();
            active.peek()?;
            let scheduled: f64 = active.map(|booking| booking.hours_per_day()).sum();
            Some(workday_length - scheduled)
        })
        .collect()
}

/// Builds a user's load line, merging equal neighbouring days.
pub fn load_line(
    bookings: &[&Booking],
    workday_length: f64,
    window: &MonthWindow,
    zoom: Zoom,
    calendar: &Calendar,
) -> Vec<LoadSegment> {
    let loads = daily_load(bookings, workday_length, window, calendar);

    let mut runs: Vec<(NaiveDate, NaiveDate, f64)> = Vec::new();
    let mut previous: Option<f64> = None;
    for (day, load) in window.range().days().zip(loads) {
        let continues = load.is_some() && previous == load;
        previous = load;
        let Some(hours) = load else { continue };
        if continues {
            if let Some(run) = runs.last_mut() {
                run.1 = day;
                continue;
            }
        }
        runs.push((day, day, hours));
    }

    runs.into_iter()
        .filter_map(|(from, to, load_hours)| {
            let coords = coordinates(&Interval::new(from, to).ok()?, window, zoom)?;
            Some(LoadSegment {
                from,
                to,
                load_hours,
                status: LoadStatus::classify(load_hours),
                coords,
            })
        })
        .collect()
}

/// Layout switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimelineOptions {
    /// Give each issue its own group instead of packing a project together.
    pub show_issues: bool,
}

/// A booking with its position on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedBooking<'a> {
    pub booking: &'a Booking,
    /// `None` when the booking lies outside the window.
    pub coords: Option<BarCoords>,
}

/// Bookings on one subject, packed into lanes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectGroup<'a> {
    /// The issue, or `None` for project-level bookings (and for the single
    /// group of a project when issues are not shown).
    pub issue_id: Option<IssueId>,
    pub lanes: Vec<Vec<PlacedBooking<'a>>>,
}

/// A milestone drawn on a project row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MilestoneMarker<'a> {
    pub milestone: &'a Milestone,
    pub coords: BarCoords,
    /// Room before the next milestone, in pixels.
    pub max_width: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectTimeline<'a> {
    pub project_id: ProjectId,
    pub milestones: Vec<MilestoneMarker<'a>>,
    pub groups: Vec<SubjectGroup<'a>>,
}

impl ProjectTimeline<'_> {
    pub fn lane_count(&self) -> usize {
        self.groups.iter().map(|group| group.lanes.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTimeline<'a> {
    pub user_id: UserId,
    pub workday_length: f64,
    pub load_line: Vec<LoadSegment>,
    pub projects: Vec<ProjectTimeline<'a>>,
}

/// The whole chart for a window and zoom.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout<'a> {
    pub window: MonthWindow,
    pub zoom: Zoom,
    pub column_width: i64,
    /// Total chart width in pixels.
    pub width: i64,
    pub users: Vec<UserTimeline<'a>>,
}

/// Lays out every booking in the window.
pub fn build_timeline<'a>(
    bookings: &'a [Booking],
    milestones: &'a [Milestone],
    window: MonthWindow,
    zoom: Zoom,
    calendar: &Calendar,
    options: TimelineOptions,
) -> TimelineLayout<'a> {
    let by_user = group_by_first_appearance(bookings.iter(), Booking::assigned_to_id);

    let users: Vec<UserTimeline<'a>> = by_user
        .par_iter()
        .map(|(user_id, user_bookings)| {
            layout_user(*user_id, user_bookings, milestones, &window, zoom, calendar, options)
        })
        .collect();

    tracing::debug!(
        users = users.len(),
        zoom = zoom.get(),
        months = window.months(),
        "built timeline"
    );

    let column_width = zoom.column_width();
    TimelineLayout {
        window,
        zoom,
        column_width,
        width: window.len_days() * column_width,
        users,
    }
}

fn layout_user<'a>(
    user_id: UserId,
    bookings: &[&'a Booking],
    milestones: &'a [Milestone],
    window: &MonthWindow,
    zoom: Zoom,
    calendar: &Calendar,
    options: TimelineOptions,
) -> UserTimeline<'a> {
    let workday_length = calendar.workday_length_for(user_id);
    let load_line = load_line(bookings, workday_length, window, zoom, calendar);

    let projects = group_by_first_appearance(bookings.iter().copied(), Booking::project_id)
        .into_iter()
        .map(|(project_id, project_bookings)| ProjectTimeline {
            project_id,
            milestones: milestone_markers(project_id, &project_bookings, milestones, window, zoom),
            groups: subject_groups(&project_bookings, window, zoom, options),
        })
        .collect();

    UserTimeline {
        user_id,
        workday_length,
        load_line,
        projects,
    }
}

fn subject_groups<'a>(
    bookings: &[&'a Booking],
    window: &MonthWindow,
    zoom: Zoom,
    options: TimelineOptions,
) -> Vec<SubjectGroup<'a>> {
    let place = |lanes: Vec<Vec<&'a Booking>>| -> Vec<Vec<PlacedBooking<'a>>> {
        lanes
            .into_iter()
            .map(|lane| {
                lane.into_iter()
                    .map(|booking| PlacedBooking {
                        booking,
                        coords: coordinates(&booking.interval(), window, zoom),
                    })
                    .collect()
            })
            .collect()
    };

    if !options.show_issues {
        return vec![SubjectGroup {
            issue_id: None,
            lanes: place(pack_lanes(bookings, PackMode::Retrieval)),
        }];
    }

    let mut by_issue = group_by_first_appearance(bookings.iter().copied(), Booking::issue_id);
    // Project-level bookings lead.
    if let Some(index) = by_issue.iter().position(|(issue, _)| issue.is_none()) {
        let project_level = by_issue.remove(index);
        by_issue.insert(0, project_level);
    }

    by_issue
        .into_iter()
        .map(|(issue_id, issue_bookings)| SubjectGroup {
            issue_id,
            lanes: place(pack_lanes(&issue_bookings, PackMode::Sorted)),
        })
        .collect()
}

fn milestone_markers<'a>(
    project_id: ProjectId,
    bookings: &[&Booking],
    milestones: &'a [Milestone],
    window: &MonthWindow,
    zoom: Zoom,
) -> Vec<MilestoneMarker<'a>> {
    let Some(earliest) = bookings.iter().map(|booking| booking.start_date()).min() else {
        return Vec::new();
    };
    let Ok(range) = Interval::new(earliest.max(window.date_from()), window.date_to()) else {
        return Vec::new();
    };

    let mut due: Vec<&'a Milestone> = milestones
        .iter()
        .filter(|m| m.project_id == project_id && range.covers(m.due_date))
        .collect();
    due.sort_by_key(|m| m.due_date);

    let width = zoom.column_width();
    due.iter()
        .enumerate()
        .filter_map(|(index, &milestone)| {
            let coords = coordinates(&Interval::day(milestone.due_date), window, zoom)?;
            let max_width = due
                .get(index + 1)
                .map(|next| (next.due_date - milestone.due_date).num_days() * width);
            Some(MilestoneMarker {
                milestone,
                coords,
                max_width,
            })
        })
        .collect()
}

/// Groups items by key, keeping keys and items in first-appearance order.
fn group_by_first_appearance<'a, K, I>(
    items: I,
    key: impl Fn(&Booking) -> K,
) -> Vec<(K, Vec<&'a Booking>)>
where
    K: Copy + Eq + std::hash::Hash,
    I: Iterator<Item = &'a Booking>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a Booking>)> = Vec::new();
    for item in items {
        let k = key(item);
        let slot = *index.entry(k).or_insert_with(|| {
            groups.push((k, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(item);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingDraft;
    use crate::types::MilestoneId;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, m, d).unwrap()
    }

    fn window(from: NaiveDate, months: u32) -> MonthWindow {
        MonthWindow::new(from, months).unwrap()
    }

    fn booking(
        user: i64,
        project: i64,
        issue: Option<i64>,
        from: NaiveDate,
        to: NaiveDate,
        hours: f64,
    ) -> Booking {
        BookingDraft {
            project_id: Some(ProjectId::new(project).unwrap()),
            assigned_to_id: Some(UserId::new(user).unwrap()),
            issue_id: issue.map(|id| IssueId::new(id).unwrap()),
            start_date: Some(from),
            end_date: Some(to),
            hours_per_day: Some(hours),
            ..BookingDraft::default()
        }
        .validate()
        .unwrap()
    }

    fn span(from: NaiveDate, to: NaiveDate) -> Booking {
        booking(1, 1, None, from, to, 4.0)
    }

    fn starts(lanes: &[Vec<&Booking>]) -> Vec<Vec<u32>> {
        use chrono::Datelike;
        lanes
            .iter()
            .map(|lane| lane.iter().map(|b| b.start_date().day()).collect())
            .collect()
    }

    #[test]
    fn zoom_maps_to_column_width() {
        assert_eq!(Zoom::new(1).unwrap().column_width(), 30);
        assert_eq!(Zoom::new(2).unwrap().column_width(), 60);
        assert_eq!(Zoom::new(3).unwrap().column_width(), 100);
        assert_eq!(Zoom::new(0), Err(LayoutError::ZoomOutOfRange { value: 0 }));
        assert!(Zoom::new(4).is_err());
    }

    #[test]
    fn one_day_at_window_start_at_zoom_two() {
        let w = window(date(1, 1), 1);
        let b = span(date(1, 1), date(1, 1));
        let coords = coordinates(&b.interval(), &w, Zoom::new(2).unwrap()).unwrap();
        assert_eq!(
            coords,
            BarCoords {
                bar_start: 0,
                bar_end: 60
            }
        );
    }

    #[test]
    fn coordinates_clip_to_window() {
        let w = window(date(1, 10), 1);
        let zoom = Zoom::new(1).unwrap();

        let before = span(date(1, 1), date(1, 11));
        assert_eq!(
            coordinates(&before.interval(), &w, zoom),
            Some(BarCoords {
                bar_start: 0,
                bar_end: 60
            })
        );

        // Window ends 02-09.
        let after = span(date(2, 8), date(3, 1));
        assert_eq!(
            coordinates(&after.interval(), &w, zoom),
            Some(BarCoords {
                bar_start: 29 * 30,
                bar_end: 31 * 30
            })
        );

        let outside = span(date(2, 10), date(2, 12));
        assert_eq!(coordinates(&outside.interval(), &w, zoom), None);
    }

    #[test]
    fn lanes_never_hold_overlapping_bookings() {
        let bookings = [
            span(date(1, 1), date(1, 10)),
            span(date(1, 5), date(1, 6)),
            span(date(1, 11), date(1, 20)),
            span(date(1, 6), date(1, 12)),
            span(date(1, 1), date(1, 31)),
            span(date(1, 21), date(1, 21)),
        ];
        let refs: Vec<&Booking> = bookings.iter().collect();
        for mode in [PackMode::Retrieval, PackMode::Sorted] {
            let lanes = pack_lanes(&refs, mode);
            assert_eq!(lanes.iter().map(Vec::len).sum::<usize>(), bookings.len());
            for lane in &lanes {
                for (i, a) in lane.iter().enumerate() {
                    for b in &lane[i + 1..] {
                        assert!(!a.interval().overlaps(&b.interval()), "{mode:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn retrieval_mode_is_first_fit_in_input_order() {
        let c = span(date(1, 10), date(1, 12));
        let a = span(date(1, 1), date(1, 5));
        let b = span(date(1, 3), date(1, 4));
        let lanes = pack_lanes(&[&c, &a, &b], PackMode::Retrieval);
        assert_eq!(starts(&lanes), vec![vec![10, 1], vec![3]]);
    }

    #[test]
    fn sorted_mode_orders_lanes_and_members() {
        let c = span(date(1, 10), date(1, 12));
        let a = span(date(1, 1), date(1, 5));
        let b = span(date(1, 3), date(1, 4));
        let lanes = pack_lanes(&[&c, &a, &b], PackMode::Sorted);
        assert_eq!(starts(&lanes), vec![vec![1, 10], vec![3]]);
    }

    #[test]
    fn packing_is_idempotent() {
        let bookings = [
            span(date(1, 3), date(1, 9)),
            span(date(1, 1), date(1, 4)),
            span(date(1, 8), date(1, 8)),
        ];
        let refs: Vec<&Booking> = bookings.iter().collect();
        let w = window(date(1, 1), 1);
        let zoom = Zoom::new(3).unwrap();

        let first = pack_lanes(&refs, PackMode::Retrieval);
        let second = pack_lanes(&refs, PackMode::Retrieval);
        assert_eq!(first, second);

        let pixels = |lanes: &[Vec<&Booking>]| -> Vec<Option<BarCoords>> {
            lanes
                .iter()
                .flatten()
                .map(|b| coordinates(&b.interval(), &w, zoom))
                .collect()
        };
        assert_eq!(pixels(&first), pixels(&second));
    }

    #[test]
    fn load_line_merges_equal_days_and_skips_gaps() {
        let calendar = Calendar::default();
        let w = window(date(1, 1), 1);
        let a = span(date(1, 1), date(1, 4));
        let b = span(date(1, 3), date(1, 7));
        let c = booking(1, 1, None, date(1, 8), date(1, 8), 10.0);

        let segments = load_line(&[&a, &b, &c], 8.0, &w, Zoom::new(1).unwrap(), &calendar);

        let summary: Vec<_> = segments
            .iter()
            .map(|s| (s.from, s.to, s.load_hours, s.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                (date(1, 1), date(1, 2), 4.0, LoadStatus::Underload),
                (date(1, 3), date(1, 4), 0.0, LoadStatus::Full),
                // 01-05 and 01-06 are a weekend.
                (date(1, 7), date(1, 7), 4.0, LoadStatus::Underload),
                (date(1, 8), date(1, 8), -2.0, LoadStatus::Overload),
            ]
        );
        assert_eq!(
            segments[1].coords,
            BarCoords {
                bar_start: 60,
                bar_end: 120
            }
        );
    }

    #[test]
    fn daily_load_is_none_without_bookings() {
        let calendar = Calendar::default();
        let w = window(date(1, 1), 1);
        let loads = daily_load(&[], 8.0, &w, &calendar);
        assert_eq!(loads.len(), 31);
        assert!(loads.iter().all(Option::is_none));
    }

    #[test]
    fn timeline_groups_users_projects_and_issues() {
        let calendar = Calendar::default();
        let bookings = vec![
            booking(2, 1, Some(7), date(1, 2), date(1, 3), 4.0),
            booking(1, 1, None, date(1, 2), date(1, 2), 8.0),
            booking(2, 1, None, date(1, 1), date(1, 4), 2.0),
            booking(2, 5, None, date(1, 1), date(1, 1), 2.0),
            booking(2, 1, Some(7), date(1, 3), date(1, 8), 4.0),
        ];
        let milestone = Milestone {
            id: MilestoneId::new(1).unwrap(),
            project_id: ProjectId::new(1).unwrap(),
            name: "1.0".to_string(),
            due_date: date(1, 15),
        };
        let milestones = [milestone];

        let layout = build_timeline(
            &bookings,
            &milestones,
            window(date(1, 1), 1),
            Zoom::new(1).unwrap(),
            &calendar,
            TimelineOptions { show_issues: true },
        );

        assert_eq!(layout.width, 31 * 30);
        let users: Vec<i64> = layout.users.iter().map(|u| u.user_id.get()).collect();
        assert_eq!(users, vec![2, 1]);

        let user = &layout.users[0];
        let projects: Vec<i64> = user.projects.iter().map(|p| p.project_id.get()).collect();
        assert_eq!(projects, vec![1, 5]);

        let project = &user.projects[0];
        assert_eq!(project.groups[0].issue_id, None);
        assert_eq!(project.groups[1].issue_id, Some(IssueId::new(7).unwrap()));
        assert_eq!(project.groups[1].lanes.len(), 2);
        assert_eq!(project.lane_count(), 3);

        assert_eq!(project.milestones.len(), 1);
        assert_eq!(project.milestones[0].coords.bar_start, 14 * 30);
        assert!(user.projects[1].milestones.is_empty());
    }

    #[test]
    fn timeline_without_issues_packs_project_together() {
        let calendar = Calendar::default();
        let bookings = vec![
            booking(1, 1, Some(7), date(1, 2), date(1, 3), 4.0),
            booking(1, 1, None, date(1, 4), date(1, 5), 2.0),
            booking(1, 1, Some(8), date(1, 3), date(1, 3), 2.0),
        ];
        let layout = build_timeline(
            &bookings,
            &[],
            window(date(1, 1), 1),
            Zoom::new(2).unwrap(),
            &calendar,
            TimelineOptions::default(),
        );

        let project = &layout.users[0].projects[0];
        assert_eq!(project.groups.len(), 1);
        assert_eq!(project.groups[0].lanes.len(), 2);
        assert_eq!(project.groups[0].lanes[0].len(), 2);
    }

    #[test]
    fn milestones_before_first_booking_are_hidden() {
        let bookings = [span(date(1, 10), date(1, 12))];
        let refs: Vec<&Booking> = bookings.iter().collect();
        let milestone = |id: i64, due: NaiveDate| Milestone {
            id: MilestoneId::new(id).unwrap(),
            project_id: ProjectId::new(1).unwrap(),
            name: format!("v{id}"),
            due_date: due,
        };
        let milestones = [
            milestone(1, date(1, 5)),
            milestone(2, date(1, 20)),
            milestone(3, date(1, 25)),
        ];

        let markers = milestone_markers(
            ProjectId::new(1).unwrap(),
            &refs,
            &milestones,
            &window(date(1, 1), 1),
            Zoom::new(1).unwrap(),
        );
        let ids: Vec<i64> = markers.iter().map(|m| m.milestone.id.get()).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(markers[0].max_width, Some(5 * 30));
        assert_eq!(markers[1].max_width, None);
    }
}
