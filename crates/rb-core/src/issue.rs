//! Project sub-entities the engine reads but never mutates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{IssueId, MilestoneId, ProjectId};

/// The parts of an issue that booking warnings depend on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub id: IssueId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub subject: String,
    /// Date by which the issue should be done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Estimated effort in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
}

/// A dated marker on a project (a version with an effective date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Milestone {
    pub id: MilestoneId,
    pub project_id: ProjectId,
    pub name: String,
    pub due_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_optional_fields_default() {
        let json = r#"{"id": 4, "project_id": 1}"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.id, IssueId::new(4).unwrap());
        assert!(issue.subject.is_empty());
        assert_eq!(issue.due_date, None);
        assert_eq!(issue.estimated_hours, None);
    }

    #[test]
    fn milestone_rejects_invalid_project() {
        let json = r#"{"id": 1, "project_id": 0, "name": "v1", "due_date": "2019-01-31"}"#;
        assert!(serde_json::from_str::<Milestone>(json).is_err());
    }
}
