// Storage access for the caption feed: connection bootstrap, typed error
// classification, and the queries behind the read and write endpoints.
//
// This service must run against legacy/partial schemas, so row decoding is
// alias-tolerant (see feed::records) and column mismatches are reported as a
// distinct error kind instead of being string-matched out of error prose.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::feed::records::{ContentRecord, ImageRecord, ProfileRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The query referenced a column this deployment's schema doesn't have.
    /// Recoverable: callers fall back to the next query/column convention.
    #[error("schema mismatch querying {table}: {source}")]
    SchemaMismatch {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("query against {table} failed: {source}")]
    Query {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, StoreError::SchemaMismatch { .. })
    }

    fn classify(table: &'static str, source: sqlx::Error) -> Self {
        if is_undefined_column_error(&source) {
            StoreError::SchemaMismatch { table, source }
        } else {
            StoreError::Query { table, source }
        }
    }
}

fn is_undefined_column_error(err: &sqlx::Error) -> bool {
    match err {
        // undefined_column
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("42703"),
        _ => false,
    }
}

/// Read-side collection access, one request at a time. Mocked in tests so
/// the pipeline and resolver can be exercised without a database.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// One page of captions, newest first.
    async fn caption_page(
        &self,
        offset: i64,
        page_size: i64,
    ) -> Result<Vec<ContentRecord>, StoreError>;

    async fn images_by_ids(&self, ids: &[String]) -> Result<Vec<ImageRecord>, StoreError>;

    /// Profile rows via the narrow column list.
    async fn profiles_narrow(&self, ids: &[String]) -> Result<Vec<ProfileRecord>, StoreError>;

    /// Profile rows via `select *`, for schemas where the narrow columns drifted.
    async fn profiles_wide(&self, ids: &[String]) -> Result<Vec<ProfileRecord>, StoreError>;
}

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let use_prepared = std::env::var("USE_PREPARED")
            .map(|v| (v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("on")))
            .unwrap_or(false);
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        // Ensure TLS is enabled when DSN contains sslmode=require
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        if !use_prepared {
            // PgBouncer txn mode safe
            connect_options = connect_options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }
}

#[async_trait]
impl ContentStore for Db {
    async fn caption_page(
        &self,
        offset: i64,
        page_size: i64,
    ) -> Result<Vec<ContentRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM captions ORDER BY created_datetime_utc DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(page_size)
        .persistent(false)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::classify("captions", e))?;

        Ok(rows.iter().map(ContentRecord::from_row).collect())
    }

    async fn images_by_ids(&self, ids: &[String]) -> Result<Vec<ImageRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT * FROM images WHERE id::text = ANY($1)")
            .bind(ids.to_vec())
            .persistent(false)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::classify("images", e))?;

        Ok(rows.iter().map(ImageRecord::from_row).collect())
    }

    async fn profiles_narrow(&self, ids: &[String]) -> Result<Vec<ProfileRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows =
            sqlx::query("SELECT id, email, display_name FROM profiles WHERE id::text = ANY($1)")
                .bind(ids.to_vec())
                .persistent(false)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::classify("profiles", e))?;

        Ok(rows.iter().map(ProfileRecord::from_narrow_row).collect())
    }

    async fn profiles_wide(&self, ids: &[String]) -> Result<Vec<ProfileRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT * FROM profiles WHERE id::text = ANY($1)")
            .bind(ids.to_vec())
            .persistent(false)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::classify("profiles", e))?;

        Ok(rows.iter().map(ProfileRecord::from_wide_row).collect())
    }
}

/// The three legacy uploader column conventions, newest first. The stamp
/// write tries each until one matches the live schema.
const UPLOADER_COLUMN_SETS: [[&str; 3]; 3] = [
    ["uploader_email", "uploader_name", "uploader_user_id"],
    ["uploaded_by_email", "uploaded_by_name", "uploaded_by_user_id"],
    ["created_by_email", "created_by_name", "created_by_user_id"],
];

impl Db {
    /// Persist uploader identity on every caption row for an image.
    ///
    /// Returns Ok(false) when none of the column conventions exist on the
    /// live schema; a non-schema error is fatal and propagated.
    #[instrument(skip(self, email, name, user_id))]
    pub async fn stamp_uploader(
        &self,
        image_id: &str,
        email: &str,
        name: &str,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        for cols in UPLOADER_COLUMN_SETS {
            let sql = format!(
                "UPDATE captions SET {} = $1, {} = $2, {} = $3 WHERE image_id::text = $4",
                cols[0], cols[1], cols[2]
            );
            match sqlx::query(&sql)
                .bind(email)
                .bind(name)
                .bind(user_id)
                .bind(image_id)
                .persistent(false)
                .execute(&self.pool)
                .await
            {
                Ok(done) => {
                    info!(
                        rows = done.rows_affected(),
                        convention = cols[0],
                        "stamped uploader columns"
                    );
                    return Ok(true);
                }
                Err(e) if is_undefined_column_error(&e) => {
                    debug!(convention = cols[0], "uploader columns absent, trying next");
                    continue;
                }
                Err(e) => {
                    return Err(StoreError::Query {
                        table: "captions",
                        source: e,
                    })
                }
            }
        }
        Ok(false)
    }
}
