//! Remembered chart zoom and month span.
//!
//! The stored pair is passed in explicitly and any change comes back as a
//! [`PreferencesDelta`] for the caller to persist, or to ignore.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{Calendar, MAX_WINDOW_MONTHS, MonthWindow};
use crate::layout::{LayoutError, Zoom};
use crate::types::UserId;

/// Month span used when neither the request nor the profile has a valid one.
pub const DEFAULT_MONTHS: u32 = 2;

/// What a user's profile remembers about the chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPreferences {
    pub zoom: Option<u8>,
    pub months: Option<u32>,
}

/// Chart parameters supplied with a request; each falls back to the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartRequest {
    pub zoom: Option<u8>,
    pub months: Option<u32>,
    pub date_from: Option<NaiveDate>,
}

/// New preference values to store for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreferencesDelta {
    pub user_id: UserId,
    pub zoom: u8,
    pub months: u32,
}

/// Validated chart parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedChart {
    pub zoom: Zoom,
    pub window: MonthWindow,
    /// Set when a known user's stored preferences should change.
    pub delta: Option<PreferencesDelta>,
}

/// Resolves request parameters against stored preferences.
///
/// Zoom outside 1..=3 falls back to 1 and months outside 1..=24 to 2;
/// `date_from` defaults to the start of the current week.
pub fn resolve(
    request: &ChartRequest,
    stored: &ChartPreferences,
    user: Option<UserId>,
    calendar: &Calendar,
    today: NaiveDate,
) -> Result<ResolvedChart, LayoutError> {
    let zoom = request
        .zoom
        .or(stored.zoom)
        .and_then(|value| Zoom::new(value).ok())
        .unwrap_or_default();
    let months = request
        .months
        .or(stored.months)
        .filter(|months| (1..=MAX_WINDOW_MONTHS).contains(months))
        .unwrap_or(DEFAULT_MONTHS);
    let date_from = request
        .date_from
        .unwrap_or_else(|| calendar.beginning_of_week(today));
    let window = MonthWindow::new(date_from, months)?;

    let changed = stored.zoom != Some(zoom.get()) || stored.months != Some(months);
    let delta = user.filter(|_| changed).map(|user_id| PreferencesDelta {
        user_id,
        zoom: zoom.get(),
        months,
    });

    Ok(ResolvedChart {
        zoom,
        window,
        delta,
    })
}
