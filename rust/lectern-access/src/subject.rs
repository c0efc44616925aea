//! Acting principals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an acting principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform role of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// Platform owner.
    Owner,
    /// Publishes purchasable content.
    Creator,
    /// Everyone else.
    #[default]
    Regular,
}

/// The acting principal.
///
/// Subjects are registered outside of this crate and never modified by it.
/// Only the [`SubjectId`] takes part in resolution; `kind` and
/// `linked_teacher` travel along for audit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Stable identifier.
    pub id: SubjectId,
    /// Platform role.
    #[serde(default)]
    pub kind: SubjectKind,
    /// The teacher a student account is linked to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_teacher: Option<SubjectId>,
}

impl Subject {
    /// Create a regular subject with no teacher link.
    pub fn new(id: impl Into<SubjectId>) -> Self {
        Self {
            id: id.into(),
            kind: SubjectKind::Regular,
            linked_teacher: None,
        }
    }

    /// Set the platform role.
    pub fn with_kind(mut self, kind: SubjectKind) -> Self {
        self.kind = kind;
        self
    }

    /// Link this subject to a teacher.
    pub fn with_teacher(mut self, teacher: impl Into<SubjectId>) -> Self {
        self.linked_teacher = Some(teacher.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_a_linked_student() {
        let student = Subject::new("s1").with_teacher("t1");

        assert_eq!(student.id.as_str(), "s1");
        assert_eq!(student.kind, SubjectKind::Regular);
        assert_eq!(student.linked_teacher, Some(SubjectId::from("t1")));
    }
}
