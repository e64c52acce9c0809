//! Storage layer for resource bookings.
//!
//! Provides persistence for bookings, issues, milestones, time entries and
//! chart preferences using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! ## Date Format
//!
//! Dates are stored as TEXT in `YYYY-MM-DD` form. Lexicographic ordering
//! matches chronological ordering, so range filters compare strings.
//!
//! ## Bookings
//!
//! `end_date` is nullable; a NULL end means a single-day booking, and range
//! queries use `COALESCE(end_date, start_date)` as the effective end.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rb_core::{
    Booking, BookingDraft, BookingId, Calendar, ChartPreferences, IdError, Issue, IssueId,
    Milestone, MilestoneId, PreferencesDelta, ProjectId, SplitError, SplitOutcome, TimeEntry,
    TimeEntryId, UserId, ValidatedBooking, ValidationErrors, Visibility, WarningContext,
};
use rusqlite::{Connection, OptionalExtension, ToSql, params, params_from_iter};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// No row with the given id.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    /// A stored date could not be parsed.
    #[error("invalid date in {column}: {value}")]
    InvalidDate {
        column: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored id is not a valid identifier.
    #[error("invalid id in {column}")]
    InvalidId {
        column: &'static str,
        #[source]
        source: IdError,
    },
    /// The booking failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// A split was rejected; nothing was written.
    #[error(transparent)]
    Split(#[from] SplitError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A booking row before domain validation.
#[derive(Debug)]
struct BookingRow {
    id: i64,
    project_id: i64,
    assigned_to_id: i64,
    issue_id: Option<i64>,
    start_date: String,
    end_date: Option<String>,
    hours_per_day: f64,
    notes: String,
    author_id: Option<i64>,
    created_at: Option<String>,
}

const BOOKING_COLUMNS: &str = "id, project_id, assigned_to_id, issue_id, start_date, end_date, \
     hours_per_day, notes, author_id, created_at";

impl BookingRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            assigned_to_id: row.get(2)?,
            issue_id: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            hours_per_day: row.get(6)?,
            notes: row.get(7)?,
            author_id: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_booking(self) -> Result<Booking, DbError> {
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc));
        let draft = BookingDraft {
            id: Some(parse_id("bookings.id", self.id)?),
            project_id: Some(parse_id("bookings.project_id", self.project_id)?),
            assigned_to_id: Some(parse_id("bookings.assigned_to_id", self.assigned_to_id)?),
            issue_id: self
                .issue_id
                .map(|id| parse_id("bookings.issue_id", id))
                .transpose()?,
            start_date: Some(parse_date("bookings.start_date", &self.start_date)?),
            end_date: self
                .end_date
                .as_deref()
                .map(|value| parse_date("bookings.end_date", value))
                .transpose()?,
            hours_per_day: Some(self.hours_per_day),
            notes: self.notes,
            author_id: self
                .author_id
                .map(|id| parse_id("bookings.author_id", id))
                .transpose()?,
            created_at,
        };
        Ok(draft.validate()?)
    }
}

/// A time entry row before domain validation.
#[derive(Debug)]
struct TimeEntryRow {
    id: i64,
    user_id: i64,
    project_id: i64,
    issue_id: Option<i64>,
    spent_on: String,
    hours: f64,
    activity: String,
}

impl TimeEntryRow {
    fn into_entry(self) -> Result<TimeEntry, DbError> {
        Ok(TimeEntry {
            id: Some(parse_id::<TimeEntryId>("time_entries.id", self.id)?),
            user_id: parse_id("time_entries.user_id", self.user_id)?,
            project_id: parse_id("time_entries.project_id", self.project_id)?,
            issue_id: self
                .issue_id
                .map(|id| parse_id("time_entries.issue_id", id))
                .transpose()?,
            spent_on: parse_date("time_entries.spent_on", &self.spent_on)?,
            hours: self.hours,
            activity: self.activity,
        })
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS bookings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL,
                assigned_to_id INTEGER NOT NULL,
                issue_id INTEGER,
                start_date TEXT NOT NULL,
                end_date TEXT,
                hours_per_day REAL NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                author_id INTEGER,
                created_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_bookings_start ON bookings(start_date);
            CREATE INDEX IF NOT EXISTS idx_bookings_assigned ON bookings(assigned_to_id);
            CREATE INDEX IF NOT EXISTS idx_bookings_issue ON bookings(issue_id);

            CREATE TABLE IF NOT EXISTS issues (
                id INTEGER PRIMARY KEY,
                project_id INTEGER NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                due_date TEXT,
                estimated_hours REAL
            );

            CREATE TABLE IF NOT EXISTS milestones (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                due_date TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_milestones_due ON milestones(due_date);

            -- spent_on: YYYY-MM-DD
            CREATE TABLE IF NOT EXISTS time_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                project_id INTEGER NOT NULL,
                issue_id INTEGER,
                spent_on TEXT NOT NULL,
                hours REAL NOT NULL,
                activity TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_time_entries_spent_on ON time_entries(spent_on);

            CREATE TABLE IF NOT EXISTS preferences (
                user_id INTEGER PRIMARY KEY,
                zoom INTEGER,
                months INTEGER
            );
            ",
        )?;
        Ok(())
    }

    /// Validates and inserts a new booking.
    ///
    /// Warnings are returned alongside the stored booking and never block the insert.
    pub fn create_booking(
        &mut self,
        mut draft: BookingDraft,
        calendar: &Calendar,
        today: NaiveDate,
    ) -> Result<ValidatedBooking, DbError> {
        draft.id = None;
        if draft.created_at.is_none() {
            draft.created_at = Some(Utc::now());
        }
        let validated = self.validate_draft(draft, calendar, today)?;
        let id = insert_booking(&self.conn, &validated.booking)?;
        tracing::info!(booking = id.get(), "created booking");
        Ok(ValidatedBooking {
            booking: validated.booking.with_id(id),
            warnings: validated.warnings,
        })
    }

    /// Validates and overwrites an existing booking.
    pub fn update_booking(
        &mut self,
        id: BookingId,
        mut draft: BookingDraft,
        calendar: &Calendar,
        today: NaiveDate,
    ) -> Result<ValidatedBooking, DbError> {
        let stored = self.get_booking(id)?;
        draft.id = Some(id);
        draft.author_id = stored.author_id();
        draft.created_at = stored.created_at();
        let validated = self.validate_draft(draft, calendar, today)?;
        update_booking_row(&self.conn, id, &validated.booking)?;
        tracing::info!(booking = id.get(), "updated booking");
        Ok(validated)
    }

    /// Moves a booking by `start_offset` days and, when given, its end by `end_offset`.
    pub fn shift_booking(
        &mut self,
        id: BookingId,
        start_offset: i64,
        end_offset: Option<i64>,
        calendar: &Calendar,
        today: NaiveDate,
    ) -> Result<ValidatedBooking, DbError> {
        let booking = self.get_booking(id)?;
        let draft = booking
            .shifted(start_offset, end_offset)
            .map_err(ValidationErrors::from)?;
        self.update_booking(id, draft, calendar, today)
    }

    pub fn delete_booking(&mut self, id: BookingId) -> Result<(), DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM bookings WHERE id = ?", [id.get()])?;
        if deleted == 0 {
            return Err(DbError::NotFound {
                entity: "booking",
                id: id.get(),
            });
        }
        tracing::info!(booking = id.get(), "deleted booking");
        Ok(())
    }

    pub fn get_booking(&self, id: BookingId) -> Result<Booking, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"),
                [id.get()],
                BookingRow::from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound {
                entity: "booking",
                id: id.get(),
            })?;
        row.into_booking()
    }

    /// Splits a booking at `start_date + offset_days` in one transaction.
    ///
    /// Both halves are validated first; on any failure nothing is written.
    pub fn split_booking(
        &mut self,
        id: BookingId,
        offset_days: i64,
        calendar: &Calendar,
        today: NaiveDate,
    ) -> Result<SplitOutcome, DbError> {
        let booking = self.get_booking(id)?;
        let (issue, issue_bookings) = self.warning_inputs(booking.issue_id())?;
        let SplitOutcome { original, new } = booking.split(
            offset_days,
            &WarningContext {
                issue: issue.as_ref(),
                issue_bookings: &issue_bookings,
                calendar,
                today,
            },
        )?;
        let new_booking = new.booking.with_created_at(Utc::now());

        let tx = self.conn.transaction()?;
        update_booking_row(&tx, id, &original.booking)?;
        let new_id = insert_booking(&tx, &new_booking)?;
        tx.commit()?;

        tracing::info!(booking = id.get(), new_booking = new_id.get(), "split booking");
        Ok(SplitOutcome {
            original,
            new: ValidatedBooking {
                booking: new_booking.with_id(new_id),
                warnings: new.warnings,
            },
        })
    }

    /// Lists bookings whose effective interval touches `[from, to]`, in id order.
    pub fn list_bookings_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        visibility: &Visibility,
    ) -> Result<Vec<Booking>, DbError> {
        if to < from || visibility.is_empty() {
            return Ok(Vec::new());
        }
        let mut sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE start_date <= ? AND COALESCE(end_date, start_date) >= ?"
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(format_date(to)), Box::new(format_date(from))];
        push_project_filter(&mut sql, &mut values, visibility);
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), BookingRow::from_row)?;
        let mut bookings = Vec::new();
        for row in rows {
            bookings.push(row?.into_booking()?);
        }
        tracing::debug!(count = bookings.len(), %from, %to, "loaded bookings");
        Ok(bookings)
    }

    /// Lists every booking on an issue, in id order.
    pub fn bookings_for_issue(&self, issue: IssueId) -> Result<Vec<Booking>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE issue_id = ? ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([issue.get()], BookingRow::from_row)?;
        let mut bookings = Vec::new();
        for row in rows {
            bookings.push(row?.into_booking()?);
        }
        Ok(bookings)
    }

    pub fn count_bookings(&self) -> Result<i64, DbError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM bookings", [], |row| row.get(0))?)
    }

    /// Inserts or replaces an issue.
    pub fn upsert_issue(&mut self, issue: &Issue) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO issues (id, project_id, subject, due_date, estimated_hours)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                project_id = excluded.project_id,
                subject = excluded.subject,
                due_date = excluded.due_date,
                estimated_hours = excluded.estimated_hours
            ",
            params![
                issue.id.get(),
                issue.project_id.get(),
                issue.subject,
                issue.due_date.map(format_date),
                issue.estimated_hours,
            ],
        )?;
        tracing::info!(issue = issue.id.get(), "saved issue");
        Ok(())
    }

    pub fn get_issue(&self, id: IssueId) -> Result<Option<Issue>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, project_id, subject, due_date, estimated_hours FROM issues WHERE id = ?",
                [id.get()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, project_id, subject, due_date, estimated_hours)) = row else {
            return Ok(None);
        };
        Ok(Some(Issue {
            id: parse_id("issues.id", id)?,
            project_id: parse_id("issues.project_id", project_id)?,
            subject,
            due_date: due_date
                .as_deref()
                .map(|value| parse_date("issues.due_date", value))
                .transpose()?,
            estimated_hours,
        }))
    }

    pub fn add_milestone(
        &mut self,
        project_id: ProjectId,
        name: &str,
        due_date: NaiveDate,
    ) -> Result<Milestone, DbError> {
        self.conn.execute(
            "INSERT INTO milestones (project_id, name, due_date) VALUES (?, ?, ?)",
            params![project_id.get(), name, format_date(due_date)],
        )?;
        let id: MilestoneId = parse_id("milestones.id", self.conn.last_insert_rowid())?;
        tracing::info!(milestone = id.get(), "added milestone");
        Ok(Milestone {
            id,
            project_id,
            name: name.to_string(),
            due_date,
        })
    }

    /// Lists milestones due in `[from, to]`, ordered by due date.
    pub fn list_milestones_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        visibility: &Visibility,
    ) -> Result<Vec<Milestone>, DbError> {
        if to < from || visibility.is_empty() {
            return Ok(Vec::new());
        }
        let mut sql = String::from(
            "SELECT id, project_id, name, due_date FROM milestones WHERE due_date >= ? AND due_date <= ?",
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(format_date(from)), Box::new(format_date(to))];
        push_project_filter(&mut sql, &mut values, visibility);
        sql.push_str(" ORDER BY due_date ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut milestones = Vec::new();
        for row in rows {
            let (id, project_id, name, due_date) = row?;
            milestones.push(Milestone {
                id: parse_id::<MilestoneId>("milestones.id", id)?,
                project_id: parse_id("milestones.project_id", project_id)?,
                name,
                due_date: parse_date("milestones.due_date", &due_date)?,
            });
        }
        Ok(milestones)
    }

    /// Stores logged time and returns it with its new id.
    pub fn log_time(&mut self, entry: &TimeEntry) -> Result<TimeEntry, DbError> {
        self.conn.execute(
            "
            INSERT INTO time_entries (user_id, project_id, issue_id, spent_on, hours, activity)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                entry.user_id.get(),
                entry.project_id.get(),
                entry.issue_id.map(IssueId::get),
                format_date(entry.spent_on),
                entry.hours,
                entry.activity,
            ],
        )?;
        let id: TimeEntryId = parse_id("time_entries.id", self.conn.last_insert_rowid())?;
        tracing::info!(time_entry = id.get(), hours = entry.hours, "logged time");
        Ok(TimeEntry {
            id: Some(id),
            ..entry.clone()
        })
    }

    /// Lists time entries spent in `[from, to]`, in id order.
    pub fn list_time_entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        visibility: &Visibility,
    ) -> Result<Vec<TimeEntry>, DbError> {
        if to < from || visibility.is_empty() {
            return Ok(Vec::new());
        }
        let mut sql = String::from(
            "SELECT id, user_id, project_id, issue_id, spent_on, hours, activity \
             FROM time_entries WHERE spent_on >= ? AND spent_on <= ?",
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(format_date(from)), Box::new(format_date(to))];
        push_project_filter(&mut sql, &mut values, visibility);
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(TimeEntryRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                project_id: row.get(2)?,
                issue_id: row.get(3)?,
                spent_on: row.get(4)?,
                hours: row.get(5)?,
                activity: row.get(6)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        tracing::debug!(count = entries.len(), %from, %to, "loaded time entries");
        Ok(entries)
    }

    /// Stored chart preferences; empty when the user has none.
    pub fn load_preferences(&self, user: UserId) -> Result<ChartPreferences, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT zoom, months FROM preferences WHERE user_id = ?",
                [user.get()],
                |row| Ok((row.get::<_, Option<u8>>(0)?, row.get::<_, Option<u32>>(1)?)),
            )
            .optional()?;
        Ok(row.map_or_else(ChartPreferences::default, |(zoom, months)| {
            ChartPreferences { zoom, months }
        }))
    }

    pub fn save_preferences(&mut self, delta: &PreferencesDelta) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO preferences (user_id, zoom, months) VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET zoom = excluded.zoom, months = excluded.months
            ",
            params![delta.user_id.get(), delta.zoom, delta.months],
        )?;
        tracing::debug!(user = delta.user_id.get(), zoom = delta.zoom, months = delta.months, "saved preferences");
        Ok(())
    }

    fn validate_draft(
        &self,
        draft: BookingDraft,
        calendar: &Calendar,
        today: NaiveDate,
    ) -> Result<ValidatedBooking, DbError> {
        let (issue, issue_bookings) = self.warning_inputs(draft.issue_id)?;
        let validated = rb_core::validate(
            draft,
            &WarningContext {
                issue: issue.as_ref(),
                issue_bookings: &issue_bookings,
                calendar,
                today,
            },
        )?;
        Ok(validated)
    }

    /// The issue and its stored bookings, as booking warnings need them.
    fn warning_inputs(&self, issue: Option<IssueId>) -> Result<(Option<Issue>, Vec<Booking>), DbError> {
        let Some(issue_id) = issue else {
            return Ok((None, Vec::new()));
        };
        Ok((self.get_issue(issue_id)?, self.bookings_for_issue(issue_id)?))
    }
}

fn insert_booking(conn: &Connection, booking: &Booking) -> Result<BookingId, DbError> {
    conn.execute(
        "
        INSERT INTO bookings (project_id, assigned_to_id, issue_id, start_date, end_date,
                              hours_per_day, notes, author_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            booking.project_id().get(),
            booking.assigned_to_id().get(),
            booking.issue_id().map(IssueId::get),
            format_date(booking.start_date()),
            booking.end_date().map(format_date),
            booking.hours_per_day(),
            booking.notes(),
            booking.author_id().map(UserId::get),
            booking.created_at().map(format_timestamp),
        ],
    )?;
    parse_id("bookings.id", conn.last_insert_rowid())
}

fn update_booking_row(conn: &Connection, id: BookingId, booking: &Booking) -> Result<usize, DbError> {
    Ok(conn.execute(
        "
        UPDATE bookings SET project_id = ?, assigned_to_id = ?, issue_id = ?, start_date = ?,
                            end_date = ?, hours_per_day = ?, notes = ?
        WHERE id = ?
        ",
        params![
            booking.project_id().get(),
            booking.assigned_to_id().get(),
            booking.issue_id().map(IssueId::get),
            format_date(booking.start_date()),
            booking.end_date().map(format_date),
            booking.hours_per_day(),
            booking.notes(),
            id.get(),
        ],
    )?)
}

/// Appends `AND project_id IN (...)` for a restricted scope.
fn push_project_filter(sql: &mut String, values: &mut Vec<Box<dyn ToSql>>, visibility: &Visibility) {
    let Visibility::Projects(ids) = visibility else {
        return;
    };
    let mut ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
    ids.sort_unstable();
    let placeholders = vec!["?"; ids.len()].join(", ");
    sql.push_str(&format!(" AND project_id IN ({placeholders})"));
    values.extend(ids.into_iter().map(|id| Box::new(id) as Box<dyn ToSql>));
}

fn parse_id<T>(column: &'static str, value: i64) -> Result<T, DbError>
where
    T: TryFrom<i64, Error = IdError>,
{
    T::try_from(value).map_err(|source| DbError::InvalidId { column, source })
}

fn parse_date(column: &'static str, value: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| DbError::InvalidDate {
        column,
        value: value.to_string(),
        source,
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
