// Typed row snapshots for the captions / images / profiles collections.
//
// Source schemas drift across deployments, so every legacy alias is carried
// as an optional member and resolved through an explicit accessor cascade
// instead of reflecting over whatever columns a row happens to have.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::normalization::image_url;

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Read a column as text regardless of how the deployment typed it.
/// Absent columns and type mismatches both resolve to None.
pub(crate) fn text_col(row: &PgRow, name: &str) -> Option<String> {
    if let Ok(v) = row.try_get::<Option<String>, _>(name) {
        return v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    }
    if let Ok(v) = row.try_get::<Option<Uuid>, _>(name) {
        return v.map(|u| u.to_string());
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
        return v.map(|n| n.to_string());
    }
    None
}

// Schema generations disagree on whether legacy timestamp columns are
// TIMESTAMPTZ or naive TIMESTAMP; prefer tz-aware and treat naive as UTC.
fn timestamp_col(row: &PgRow, name: &str) -> Option<DateTime<Utc>> {
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(name) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return v.map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    None
}

/// One caption row, read-only for the duration of a request.
#[derive(Debug, Clone, Default)]
pub struct ContentRecord {
    pub id: Option<String>,
    pub image_id: Option<String>,
    pub created_datetime_utc: Option<DateTime<Utc>>,

    // caption text aliases, in resolution priority order
    pub content: Option<String>,
    pub caption_text: Option<String>,
    pub caption: Option<String>,
    pub text: Option<String>,
    pub generated_caption: Option<String>,
    pub meme_text: Option<String>,
    pub output: Option<String>,

    // embedded asset URL aliases
    pub cdn_url: Option<String>,
    pub public_url: Option<String>,
    pub image_url: Option<String>,
    pub url: Option<String>,

    // uploader identity across the three legacy column conventions
    pub uploader_user_id: Option<String>,
    pub uploader_email: Option<String>,
    pub uploader_name: Option<String>,
    pub uploaded_by_user_id: Option<String>,
    pub uploaded_by_email: Option<String>,
    pub uploaded_by_name: Option<String>,
    pub created_by_user_id: Option<String>,
    pub created_by_email: Option<String>,
    pub created_by_name: Option<String>,
}

impl ContentRecord {
    pub fn from_row(row: &PgRow) -> Self {
        Self {
            id: text_col(row, "id"),
            image_id: text_col(row, "image_id"),
            created_datetime_utc: timestamp_col(row, "created_datetime_utc"),
            content: text_col(row, "content"),
            caption_text: text_col(row, "caption_text"),
            caption: text_col(row, "caption"),
            text: text_col(row, "text"),
            generated_caption: text_col(row, "generated_caption"),
            meme_text: text_col(row, "meme_text"),
            output: text_col(row, "output"),
            cdn_url: text_col(row, "cdn_url"),
            public_url: text_col(row, "public_url"),
            image_url: text_col(row, "image_url"),
            url: text_col(row, "url"),
            uploader_user_id: text_col(row, "uploader_user_id"),
            uploader_email: text_col(row, "uploader_email"),
            uploader_name: text_col(row, "uploader_name"),
            uploaded_by_user_id: text_col(row, "uploaded_by_user_id"),
            uploaded_by_email: text_col(row, "uploaded_by_email"),
            uploaded_by_name: text_col(row, "uploaded_by_name"),
            created_by_user_id: text_col(row, "created_by_user_id"),
            created_by_email: text_col(row, "created_by_email"),
            created_by_name: text_col(row, "created_by_name"),
        }
    }

    /// First non-empty caption text across the legacy aliases.
    pub fn caption_text(&self) -> Option<&str> {
        [
            &self.content,
            &self.caption_text,
            &self.caption,
            &self.text,
            &self.generated_caption,
            &self.meme_text,
            &self.output,
        ]
        .into_iter()
        .find_map(non_empty)
    }

    /// Explicit uploader id, newest naming convention first.
    pub fn uploader_id_field(&self) -> Option<&str> {
        [
            &self.uploader_user_id,
            &self.uploaded_by_user_id,
            &self.created_by_user_id,
        ]
        .into_iter()
        .find_map(non_empty)
    }

    pub fn uploader_email_field(&self) -> Option<&str> {
        [
            &self.uploader_email,
            &self.uploaded_by_email,
            &self.created_by_email,
        ]
        .into_iter()
        .find_map(non_empty)
    }

    pub fn uploader_name_field(&self) -> Option<&str> {
        [
            &self.uploader_name,
            &self.uploaded_by_name,
            &self.created_by_name,
        ]
        .into_iter()
        .find_map(non_empty)
    }

    /// Displayable URL carried on the row itself, if any.
    pub fn embedded_url(&self) -> Option<String> {
        image_url::pick_url([
            self.cdn_url.as_deref(),
            self.public_url.as_deref(),
            self.image_url.as_deref(),
            self.url.as_deref(),
        ])
    }
}

/// One image asset row.
#[derive(Debug, Clone, Default)]
pub struct ImageRecord {
    pub id: Option<String>,
    pub cdn_url: Option<String>,
    pub public_url: Option<String>,
    pub image_url: Option<String>,
    pub url: Option<String>,
}

impl ImageRecord {
    pub fn from_row(row: &PgRow) -> Self {
        Self {
            id: text_col(row, "id"),
            cdn_url: text_col(row, "cdn_url"),
            public_url: text_col(row, "public_url"),
            image_url: text_col(row, "image_url"),
            url: text_col(row, "url"),
        }
    }

    pub fn display_url(&self) -> Option<String> {
        image_url::pick_url([
            self.cdn_url.as_deref(),
            self.public_url.as_deref(),
            self.image_url.as_deref(),
            self.url.as_deref(),
        ])
    }
}

/// One uploader profile row (identity tier 1).
#[derive(Debug, Clone, Default)]
pub struct ProfileRecord {
    pub id: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl ProfileRecord {
    /// From the narrow column list (`id, email, display_name`).
    pub fn from_narrow_row(row: &PgRow) -> Self {
        Self {
            id: text_col(row, "id"),
            email: text_col(row, "email"),
            display_name: text_col(row, "display_name"),
        }
    }

    /// From a `select *` row on deployments where the narrow columns drifted.
    pub fn from_wide_row(row: &PgRow) -> Self {
        let email = text_col(row, "email").or_else(|| text_col(row, "contact_email"));
        let display_name = text_col(row, "display_name")
            .or_else(|| text_col(row, "full_name"))
            .or_else(|| text_col(row, "name"))
            .or_else(|| text_col(row, "username"));
        Self {
            id: text_col(row, "id"),
            email,
            display_name,
        }
    }
}

/// A caption joined with its resolved image URL and uploader identity.
///
/// Fields that could not be resolved stay null; partial identity is a valid
/// terminal state for a record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_datetime_utc: Option<DateTime<Utc>>,
    pub content: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub uploader_user_id: Option<String>,
    pub uploader_email: Option<String>,
    pub uploader_name: Option<String>,
}
