//! Project visibility scope applied before data reaches the engine.

use std::collections::HashSet;

use serde::Serialize;

use crate::types::ProjectId;

/// Which projects the acting user may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Every project.
    All,
    /// Only these projects. An empty set admits nothing.
    Projects(HashSet<ProjectId>),
}

impl Visibility {
    pub fn allows(&self, project: ProjectId) -> bool {
        match self {
            Self::All => true,
            Self::Projects(ids) => ids.contains(&project),
        }
    }

    /// True iff no project can pass the scope.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Projects(ids) if ids.is_empty())
    }
}

impl FromIterator<ProjectId> for Visibility {
    fn from_iter<I: IntoIterator<Item = ProjectId>>(iter: I) -> Self {
        Self::Projects(iter.into_iter().collect())
    }
}
