//! Purchasable content.
//!
//! A [`ContentRef`] is what callers hold: a type tag and an identifier taken
//! from a URL or a listing. A [`Purchasable`] is the canonical record that
//! reference resolves to, and the thing purchases and subscriptions are
//! checked against.

use crate::SubjectId;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Kinds of content that can be bought, subscribed to, or created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// A downloadable file (PDF, SVG and similar).
    File,
    /// A recorded or live workshop.
    Workshop,
    /// A multi-lesson course.
    Course,
    /// An interactive tool.
    Tool,
    /// A lesson plan.
    LessonPlan,
}

impl ContentType {
    /// Every content type, in declaration order.
    pub const ALL: [ContentType; 5] = [
        ContentType::File,
        ContentType::Workshop,
        ContentType::Course,
        ContentType::Tool,
        ContentType::LessonPlan,
    ];

    /// Wire name of this type, e.g. `lesson_plan`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::File => "file",
            ContentType::Workshop => "workshop",
            ContentType::Course => "course",
            ContentType::Tool => "tool",
            ContentType::LessonPlan => "lesson_plan",
        }
    }

    /// Subscription benefit key granting this type, e.g. `workshop_access`.
    pub fn access_key(&self) -> String {
        format!("{}_access", self.as_str())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string did not name a known [`ContentType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown content type: {0}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|content_type| content_type.as_str() == value)
            .ok_or_else(|| UnknownContentType(value.to_string()))
    }
}

/// Identifier of a canonical purchasable record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchasableId(pub String);

impl PurchasableId {
    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PurchasableId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PurchasableId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PurchasableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-side reference to a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    /// What kind of content is referenced.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Identifier within that kind.
    pub id: String,
}

impl ContentRef {
    /// Create a reference.
    pub fn new(content_type: ContentType, id: impl Into<String>) -> Self {
        Self {
            content_type,
            id: id.into(),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.id)
    }
}

/// Canonical record for content that can be access-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchasable {
    /// Canonical identifier.
    pub id: PurchasableId,
    /// The subject who published this content.
    pub creator_id: SubjectId,
    /// What kind of content this is.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Whether the content is listed publicly.
    pub published: bool,
}

impl Purchasable {
    /// Create a published record.
    pub fn new(
        id: impl Into<PurchasableId>,
        creator_id: impl Into<SubjectId>,
        content_type: ContentType,
    ) -> Self {
        Self {
            id: id.into(),
            creator_id: creator_id.into(),
            content_type,
            published: true,
        }
    }

    /// Mark the record as unpublished.
    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_wire_names() {
        for content_type in ContentType::ALL {
            assert_eq!(content_type.as_str().parse(), Ok(content_type));
        }
        assert_eq!(
            "video".parse::<ContentType>(),
            Err(UnknownContentType("video".into()))
        );
    }

    #[test]
    fn it_derives_benefit_keys() {
        assert_eq!(ContentType::LessonPlan.access_key(), "lesson_plan_access");
        assert_eq!(ContentType::Workshop.access_key(), "workshop_access");
    }

    #[test]
    fn it_displays_references() {
        let content = ContentRef::new(ContentType::Course, "c-42");
        assert_eq!(content.to_string(), "course:c-42");
    }
}
