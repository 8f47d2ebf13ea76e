// In-memory store double shared by the pipeline and resolver tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::database_ops::db::{ContentStore, StoreError};
use crate::feed::records::{ContentRecord, ImageRecord, ProfileRecord};

#[derive(Default)]
pub struct MockStore {
    pub rows: Vec<ContentRecord>,
    pub images: Vec<ImageRecord>,
    pub profiles: Vec<ProfileRecord>,
    /// Narrow profile queries report a schema mismatch (the wide query works).
    pub narrow_schema_mismatch: bool,
    /// Narrow profile calls (by zero-based call index) that fail with a
    /// non-schema error.
    pub fail_narrow_calls: Vec<usize>,
    pub caption_call_count: AtomicUsize,
    pub image_call_count: AtomicUsize,
    pub narrow_call_count: AtomicUsize,
    pub wide_call_count: AtomicUsize,
}

impl MockStore {
    pub fn caption_calls(&self) -> usize {
        self.caption_call_count.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_call_count.load(Ordering::SeqCst)
    }

    pub fn narrow_calls(&self) -> usize {
        self.narrow_call_count.load(Ordering::SeqCst)
    }

    pub fn wide_calls(&self) -> usize {
        self.wide_call_count.load(Ordering::SeqCst)
    }

    fn profiles_matching(&self, ids: &[String]) -> Vec<ProfileRecord> {
        self.profiles
            .iter()
            .filter(|p| {
                p.id.as_deref()
                    .map(|id| ids.iter().any(|x| x == id))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContentStore for MockStore {
    async fn caption_page(
        &self,
        offset: i64,
        page_size: i64,
    ) -> Result<Vec<ContentRecord>, StoreError> {
        self.caption_call_count.fetch_add(1, Ordering::SeqCst);
        let start = (offset.max(0) as usize).min(self.rows.len());
        let end = (start + page_size.max(0) as usize).min(self.rows.len());
        Ok(self.rows[start..end].to_vec())
    }

    async fn images_by_ids(&self, ids: &[String]) -> Result<Vec<ImageRecord>, StoreError> {
        self.image_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .images
            .iter()
            .filter(|img| {
                img.id
                    .as_deref()
                    .map(|id| ids.iter().any(|x| x == id))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn profiles_narrow(&self, ids: &[String]) -> Result<Vec<ProfileRecord>, StoreError> {
        let call = self.narrow_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_narrow_calls.contains(&call) {
            return Err(StoreError::Query {
                table: "profiles",
                source: sqlx::Error::PoolTimedOut,
            });
        }
        if self.narrow_schema_mismatch {
            return Err(StoreError::SchemaMismatch {
                table: "profiles",
                source: sqlx::Error::ColumnNotFound("email".into()),
            });
        }
        Ok(self.profiles_matching(ids))
    }

    async fn profiles_wide(&self, ids: &[String]) -> Result<Vec<ProfileRecord>, StoreError> {
        self.wide_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles_matching(ids))
    }
}
