//! Tag model and its request bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Patch;
use crate::errors::AppError;

/// Color given to tags created without one.
pub const DEFAULT_TAG_COLOR: &str = "#007bff";

/// A reusable label for categorizing grants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The slice of a tag embedded in each grant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagSummary {
    pub id: i64,
    pub name: String,
    pub color: String,
}

/// Validated field set for inserting a tag.
#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

/// Validated partial update of a tag.
#[derive(Debug, Clone, Default)]
pub struct TagChanges {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Patch<String>,
}

/// Request body for creating a new tag.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TryFrom<CreateTagRequest> for NewTag {
    type Error = AppError;

    fn try_from(request: CreateTagRequest) -> Result<Self, Self::Error> {
        let name = match request.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(AppError::Validation("Name is required".to_string())),
        };

        Ok(NewTag {
            name,
            color: request
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
            description: request.description,
        })
    }
}

/// Request body for updating an existing tag. Only present keys are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub name: Patch<String>,
    /// `null` or a blank value resets to the default color
    #[serde(default)]
    pub color: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
}

impl TryFrom<UpdateTagRequest> for TagChanges {
    type Error = AppError;

    fn try_from(request: UpdateTagRequest) -> Result<Self, Self::Error> {
        let name = match request.name {
            Patch::Absent => None,
            Patch::Value(name) if !name.trim().is_empty() => Some(name),
            _ => return Err(AppError::Validation("Name cannot be empty".to_string())),
        };

        let color = match request.color {
            Patch::Absent => None,
            Patch::Value(color) if !color.trim().is_empty() => Some(color),
            _ => Some(DEFAULT_TAG_COLOR.to_string()),
        };

        Ok(TagChanges {
            name,
            color,
            description: request.description,
        })
    }
}
