//! Grant model and its request bodies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Patch, TagSummary};
use crate::errors::AppError;

/// Status given to grants created without one.
pub const DEFAULT_STATUS: &str = "active";

/// A fundable opportunity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Grant {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub deadline: Option<NaiveDate>,
    pub status: String,
    pub organization: Option<String>,
    pub contact_email: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<TagSummary>,
}

/// Validated field set for inserting a grant.
#[derive(Debug, Clone, Default)]
pub struct NewGrant {
    pub title: String,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<String>,
    pub organization: Option<String>,
    pub contact_email: Option<String>,
    pub website: Option<String>,
    pub tag_ids: Vec<i64>,
}

/// Validated partial update of a grant.
///
/// `tag_ids: Some(..)` replaces the whole tag set.
#[derive(Debug, Clone, Default)]
pub struct GrantChanges {
    pub title: Option<String>,
    pub description: Patch<String>,
    pub amount: Patch<f64>,
    pub deadline: Patch<NaiveDate>,
    pub status: Patch<String>,
    pub organization: Patch<String>,
    pub contact_email: Patch<String>,
    pub website: Patch<String>,
    pub tag_ids: Option<Vec<i64>>,
}

/// Amount as submitted by clients: either a JSON number or a form string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    /// An empty string means "no amount". NaN and infinities are rejected
    /// since neither SQLite nor JSON can carry them.
    pub fn parse(self) -> Result<Option<f64>, AppError> {
        let amount = match self {
            AmountInput::Number(n) => n,
            AmountInput::Text(s) if s.trim().is_empty() => return Ok(None),
            AmountInput::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::Validation(format!("Invalid amount: {}", s)))?,
        };

        if !amount.is_finite() {
            return Err(AppError::Validation(format!("Invalid amount: {}", amount)));
        }
        Ok(Some(amount))
    }
}

/// Parse a `YYYY-MM-DD` deadline; an empty string means "no deadline".
pub fn parse_deadline(raw: &str) -> Result<Option<NaiveDate>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::Validation(format!("Invalid deadline (expected YYYY-MM-DD): {}", raw)))
}

fn is_blank(s: &Option<String>) -> bool {
    s.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Request body for creating a new grant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateGrantRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Tag ids to attach; ids that do not exist are skipped
    #[serde(default)]
    pub tags: Option<Vec<i64>>,
}

impl TryFrom<CreateGrantRequest> for NewGrant {
    type Error = AppError;

    fn try_from(request: CreateGrantRequest) -> Result<Self, Self::Error> {
        if is_blank(&request.title) {
            return Err(AppError::Validation("Title is required".to_string()));
        }

        let amount = match request.amount {
            Some(input) => input.parse()?,
            None => None,
        };
        let deadline = match request.deadline.as_deref() {
            Some(raw) => parse_deadline(raw)?,
            None => None,
        };

        Ok(NewGrant {
            title: request.title.unwrap_or_default(),
            description: request.description,
            amount,
            deadline,
            status: request.status,
            organization: request.organization,
            contact_email: request.contact_email,
            website: request.website,
            tag_ids: request.tags.unwrap_or_default(),
        })
    }
}

/// Request body for updating an existing grant. Only present keys are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGrantRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub amount: Patch<AmountInput>,
    #[serde(default)]
    pub deadline: Patch<String>,
    #[serde(default)]
    pub status: Patch<String>,
    #[serde(default)]
    pub organization: Patch<String>,
    #[serde(default)]
    pub contact_email: Patch<String>,
    #[serde(default)]
    pub website: Patch<String>,
    /// Replaces the tag set when present; `null` clears it
    #[serde(default)]
    pub tags: Patch<Vec<i64>>,
}

impl TryFrom<UpdateGrantRequest> for GrantChanges {
    type Error = AppError;

    fn try_from(request: UpdateGrantRequest) -> Result<Self, Self::Error> {
        let title = match request.title {
            Patch::Absent => None,
            Patch::Value(t) if !t.trim().is_empty() => Some(t),
            _ => return Err(AppError::Validation("Title cannot be empty".to_string())),
        };

        let amount = request.amount.try_map(AmountInput::parse)?.flatten();
        let deadline = request
            .deadline
            .try_map(|raw| parse_deadline(&raw))?
            .flatten();

        let tag_ids = match request.tags {
            Patch::Absent => None,
            Patch::Null => Some(Vec::new()),
            Patch::Value(ids) => Some(ids),
        };

        Ok(GrantChanges {
            title,
            description: request.description,
            amount,
            deadline,
            status: request.status,
            organization: request.organization,
            contact_email: request.contact_email,
            website: request.website,
            tag_ids,
        })
    }
}
