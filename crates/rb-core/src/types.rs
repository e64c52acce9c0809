//! Identifier newtypes shared by every entity the engine touches.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Identifiers are database row ids and must be positive.
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    /// The textual form could not be parsed as an integer.
    #[error("invalid {field}: {source}")]
    Parse {
        field: &'static str,
        #[source]
        source: ParseIntError,
    },
}

/// Generates a validated numeric ID newtype with common trait implementations.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Creates a new ID after validation.
            pub const fn new(id: i64) -> Result<Self, IdError> {
                if id <= 0 {
                    return Err(IdError::NotPositive {
                        field: $field_name,
                        value: id,
                    });
                }
                Ok(Self(id))
            }

            /// Returns the raw row id.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = IdError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s.trim().parse::<i64>().map_err(|source| IdError::Parse {
                    field: $field_name,
                    source,
                })?;
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// A persisted booking.
    BookingId, "booking ID"
);

define_id!(
    /// A project that bookings and time entries belong to.
    ProjectId, "project ID"
);

define_id!(
    /// A user (principal) that can be booked or log time.
    UserId, "user ID"
);

define_id!(
    /// An issue inside a project.
    IssueId, "issue ID"
);

define_id!(
    /// A project milestone (version with a due date).
    MilestoneId, "milestone ID"
);

define_id!(
    /// A logged time entry.
    TimeEntryId, "time entry ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_rejects_zero_and_negative() {
        assert_eq!(
            ProjectId::new(0),
            Err(IdError::NotPositive {
                field: "project ID",
                value: 0
            })
        );
        assert!(UserId::new(-3).is_err());
        assert_eq!(IssueId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn id_parses_from_str() {
        assert_eq!("42".parse::<UserId>().unwrap().get(), 42);
        assert_eq!(" 5 ".parse::<BookingId>().unwrap().get(), 5);
        let err = "abc".parse::<UserId>().unwrap_err();
        assert!(err.to_string().starts_with("invalid user ID"));
    }

    #[test]
    fn id_serde_roundtrip_validates() {
        let id: ProjectId = serde_json::from_str("3").unwrap();
        assert_eq!(id.get(), 3);
        assert_eq!(serde_json::to_string(&id).unwrap(), "3");
        assert!(serde_json::from_str::<ProjectId>("0").is_err());
    }
}
