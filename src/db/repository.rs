//! Database repository for CRUD operations.
//!
//! Every public operation runs inside a single transaction. Writes are issued
//! before reads so SQLite takes the write lock up front.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Grant, GrantChanges, NewGrant, NewTag, Patch, Tag, TagChanges, TagSummary, DEFAULT_STATUS,
};

/// Page size used when the caller does not give one.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Ids per `IN (...)` list when loading tags for a page of grants.
const TAG_LOOKUP_CHUNK: usize = 500;

const GRANT_COLUMNS: &str = "id, title, description, amount, deadline, status, organization, \
     contact_email, website, created_at, updated_at";

const TAG_COLUMNS: &str = "id, name, color, description, created_at";

/// Filters for listing grants. All filters combine with AND.
#[derive(Debug, Clone)]
pub struct GrantFilter {
    /// Substring of title, description or organization
    pub search: Option<String>,
    pub tag_id: Option<i64>,
    /// Exact status match
    pub status: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for GrantFilter {
    fn default() -> Self {
        Self {
            search: None,
            tag_id: None,
            status: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check that the database answers.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ==================== GRANT OPERATIONS ====================

    /// List grants matching the filter, ordered by id.
    pub async fn list_grants(&self, filter: &GrantFilter) -> Result<Vec<Grant>, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM grants WHERE 1 = 1",
            GRANT_COLUMNS
        ));

        // Plain LIKE containment; wildcards in the term are passed through.
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            query
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR description LIKE ")
                .push_bind(pattern.clone())
                .push(" OR organization LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(tag_id) = filter.tag_id {
            query
                .push(
                    " AND EXISTS (SELECT 1 FROM grant_tags \
                     WHERE grant_tags.grant_id = grants.id AND grant_tags.tag_id = ",
                )
                .push_bind(tag_id)
                .push(")");
        }

        if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
            query.push(" AND status = ").push_bind(status.to_string());
        }

        query
            .push(" ORDER BY id LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset.max(0));

        let rows = query.build().fetch_all(&mut *tx).await?;
        let grants = with_tags(&mut tx, &rows).await?;

        tx.commit().await?;
        Ok(grants)
    }

    /// List grants attached to a tag. An unknown tag yields an empty list.
    pub async fn list_grants_by_tag(
        &self,
        tag_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Grant>, AppError> {
        self.list_grants(&GrantFilter {
            tag_id: Some(tag_id),
            limit,
            offset,
            ..GrantFilter::default()
        })
        .await
    }

    /// Get a grant by ID.
    pub async fn get_grant(&self, id: i64) -> Result<Grant, AppError> {
        let mut tx = self.pool.begin().await?;
        let grant = fetch_grant(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::grant_not_found(id))?;
        tx.commit().await?;
        Ok(grant)
    }

    /// Create a new grant and attach every tag id that resolves.
    pub async fn create_grant(&self, grant: &NewGrant) -> Result<Grant, AppError> {
        let now = timestamp(Utc::now());
        let status = grant
            .status
            .clone()
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO grants (title, description, amount, deadline, status, organization, contact_email, website, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&grant.title)
        .bind(&grant.description)
        .bind(grant.amount)
        .bind(grant.deadline)
        .bind(&status)
        .bind(&grant.organization)
        .bind(&grant.contact_email)
        .bind(&grant.website)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        link_tags(&mut tx, id, &grant.tag_ids).await?;

        let created = fetch_grant(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Grant {} vanished after insert", id)))?;

        tx.commit().await?;
        tracing::debug!(grant_id = id, tags = created.tags.len(), "Created grant");
        Ok(created)
    }

    /// Apply a partial update. `updated_at` is always refreshed; a present
    /// `tag_ids` replaces the tag set inside the same transaction.
    pub async fn update_grant(&self, id: i64, changes: &GrantChanges) -> Result<Grant, AppError> {
        let now = timestamp(Utc::now());
        let mut tx = self.pool.begin().await?;

        // MAX keeps updated_at monotonic even if the wall clock steps back.
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE grants SET updated_at = MAX(");
        query.push_bind(now).push(", updated_at)");

        if let Some(title) = &changes.title {
            query.push(", title = ").push_bind(title.clone());
        }
        push_patch(&mut query, "description", changes.description.clone());
        push_patch(&mut query, "amount", changes.amount.clone());
        push_patch(&mut query, "deadline", changes.deadline.clone());
        let status = match &changes.status {
            Patch::Null => Patch::Value(DEFAULT_STATUS.to_string()),
            other => other.clone(),
        };
        push_patch(&mut query, "status", status);
        push_patch(&mut query, "organization", changes.organization.clone());
        push_patch(&mut query, "contact_email", changes.contact_email.clone());
        push_patch(&mut query, "website", changes.website.clone());

        query.push(" WHERE id = ").push_bind(id);

        let result = query.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::grant_not_found(id));
        }

        if let Some(tag_ids) = &changes.tag_ids {
            sqlx::query("DELETE FROM grant_tags WHERE grant_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_tags(&mut tx, id, tag_ids).await?;
        }

        let updated = fetch_grant(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::grant_not_found(id))?;

        tx.commit().await?;
        tracing::debug!(grant_id = id, "Updated grant");
        Ok(updated)
    }

    /// Delete a grant together with its association rows.
    pub async fn delete_grant(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM grant_tags WHERE grant_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM grants WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::grant_not_found(id));
        }

        tx.commit().await?;
        tracing::debug!(grant_id = id, "Deleted grant");
        Ok(())
    }

    // ==================== TAG OPERATIONS ====================

    /// List all tags.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(&format!("SELECT {} FROM tags ORDER BY id", TAG_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(tag_from_row).collect()
    }

    /// Get a tag by ID.
    pub async fn get_tag(&self, id: i64) -> Result<Tag, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => tag_from_row(&row),
            None => Err(AppError::tag_not_found(id)),
        }
    }

    pub async fn count_tags(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Create a new tag. The UNIQUE constraint on `name` makes the
    /// duplicate check and the insert one atomic step.
    pub async fn create_tag(&self, tag: &NewTag) -> Result<Tag, AppError> {
        let now = timestamp(Utc::now());
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO tags (name, color, description, created_at) VALUES (?, ?, ?, ?)")
            .bind(&tag.name)
            .bind(&tag.color)
            .bind(&tag.description)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(duplicate_tag_name)?
            .last_insert_rowid();

        let row = sqlx::query(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let created = tag_from_row(&row)?;

        tx.commit().await?;
        tracing::debug!(tag_id = id, name = %created.name, "Created tag");
        Ok(created)
    }

    /// Apply a partial update to a tag. A rename onto another tag's name
    /// fails with a conflict and leaves the row untouched.
    pub async fn update_tag(&self, id: i64, changes: &TagChanges) -> Result<Tag, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE tags SET id = id");
        if let Some(name) = &changes.name {
            query.push(", name = ").push_bind(name.clone());
        }
        if let Some(color) = &changes.color {
            query.push(", color = ").push_bind(color.clone());
        }
        push_patch(&mut query, "description", changes.description.clone());
        query.push(" WHERE id = ").push_bind(id);

        let result = query
            .build()
            .execute(&mut *tx)
            .await
            .map_err(duplicate_tag_name)?;
        if result.rows_affected() == 0 {
            return Err(AppError::tag_not_found(id));
        }

        let row = sqlx::query(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let updated = tag_from_row(&row)?;

        tx.commit().await?;
        tracing::debug!(tag_id = id, "Updated tag");
        Ok(updated)
    }

    /// Delete a tag and detach it from every grant. The grants remain.
    pub async fn delete_tag(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM grant_tags WHERE tag_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::tag_not_found(id));
        }

        tx.commit().await?;
        tracing::debug!(tag_id = id, "Deleted tag");
        Ok(())
    }
}

// Helper functions shared by the operations above

/// Fixed-width RFC 3339 so stored timestamps also compare correctly as text.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn duplicate_tag_name(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict("Tag with this name already exists".to_string());
        }
    }
    AppError::from(err)
}

/// Append `, column = ?` for a present field, or `, column = NULL` for an explicit null.
fn push_patch<'a, T>(query: &mut QueryBuilder<'a, Sqlite>, column: &str, patch: Patch<T>)
where
    T: 'a + sqlx::Encode<'a, Sqlite> + sqlx::Type<Sqlite>,
{
    match patch {
        Patch::Absent => {}
        Patch::Null => {
            query.push(", ").push(column).push(" = NULL");
        }
        Patch::Value(value) => {
            query.push(", ").push(column).push(" = ").push_bind(value);
        }
    }
}

/// Attach tags to a grant, skipping ids with no tag row and pairs that already exist.
async fn link_tags(
    conn: &mut SqliteConnection,
    grant_id: i64,
    tag_ids: &[i64],
) -> Result<(), AppError> {
    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO grant_tags (grant_id, tag_id) SELECT ?, id FROM tags WHERE id = ?")
            .bind(grant_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn fetch_grant(conn: &mut SqliteConnection, id: i64) -> Result<Option<Grant>, AppError> {
    let row = sqlx::query(&format!("SELECT {} FROM grants WHERE id = ?", GRANT_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(with_tags(conn, std::slice::from_ref(&row)).await?.pop()),
        None => Ok(None),
    }
}

/// Convert grant rows and load their tags with one query per chunk of ids.
async fn with_tags(conn: &mut SqliteConnection, rows: &[SqliteRow]) -> Result<Vec<Grant>, AppError> {
    let mut grants = rows
        .iter()
        .map(grant_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let ids: Vec<i64> = grants.iter().map(|g| g.id).collect();
    let mut tags_by_grant: HashMap<i64, Vec<TagSummary>> = HashMap::new();

    for chunk in ids.chunks(TAG_LOOKUP_CHUNK) {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT grant_tags.grant_id AS grant_id, tags.id AS tag_id, tags.name AS tag_name, tags.color AS tag_color \
             FROM grant_tags JOIN tags ON tags.id = grant_tags.tag_id \
             WHERE grant_tags.grant_id IN (",
        );
        let mut separated = query.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY grant_tags.grant_id, tags.id");

        for row in query.build().fetch_all(&mut *conn).await? {
            tags_by_grant
                .entry(row.try_get("grant_id")?)
                .or_default()
                .push(TagSummary {
                    id: row.try_get("tag_id")?,
                    name: row.try_get("tag_name")?,
                    color: row.try_get("tag_color")?,
                });
        }
    }

    for grant in &mut grants {
        grant.tags = tags_by_grant.remove(&grant.id).unwrap_or_default();
    }

    Ok(grants)
}

fn grant_from_row(row: &SqliteRow) -> Result<Grant, AppError> {
    Ok(Grant {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        amount: row.try_get("amount")?,
        deadline: row.try_get("deadline")?,
        status: row.try_get("status")?,
        organization: row.try_get("organization")?,
        contact_email: row.try_get("contact_email")?,
        website: row.try_get("website")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        tags: Vec::new(),
    })
}

fn tag_from_row(row: &SqliteRow) -> Result<Tag, AppError> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}
