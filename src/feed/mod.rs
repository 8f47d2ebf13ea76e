// Read-path assembly for the caption feed: paged retrieval, batched image
// join, identity resolution, merge.

pub mod merge;
pub mod records;
pub mod search;
#[cfg(test)]
pub mod testing;

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::debug;

use crate::config::FeedConfig;
use crate::database_ops::db::ContentStore;
use crate::error::FeedError;
use crate::identity::{self, directory::IdentityLookup, ResolvedIdentities};
use crate::util::batch;
use records::{ContentRecord, ResolvedRecord};

pub struct FeedPage {
    pub captions: Vec<ResolvedRecord>,
    pub images: IndexMap<String, String>,
}

/// Build the feed payload: newest captions up to the clamped limit, joined
/// with image URLs and best-effort uploader identity.
pub async fn build_feed<S>(
    store: &S,
    directory: Option<&dyn IdentityLookup>,
    fallback: Option<&dyn IdentityLookup>,
    cfg: &FeedConfig,
    requested_limit: Option<i64>,
) -> Result<FeedPage, FeedError>
where
    S: ContentStore + ?Sized,
{
    let limit = cfg.clamp_feed_limit(requested_limit);
    let rows = fetch_pages(store, cfg.feed_page_size, limit).await?;
    debug!(rows = rows.len(), limit, "fetched caption pages");

    let (captions, images) = enrich(store, directory, fallback, cfg, rows).await?;
    Ok(FeedPage { captions, images })
}

/// Sequential fixed-size page fetches, newest first, until the limit is hit
/// or a short page signals end of data. Any page failure is fatal.
async fn fetch_pages<S>(
    store: &S,
    page_size: i64,
    limit: i64,
) -> Result<Vec<ContentRecord>, FeedError>
where
    S: ContentStore + ?Sized,
{
    let mut rows: Vec<ContentRecord> = Vec::new();
    let mut offset = 0i64;
    while (rows.len() as i64) < limit {
        let want = page_size.min(limit - rows.len() as i64);
        let page = store
            .caption_page(offset, want)
            .await
            .map_err(FeedError::PageFetch)?;
        let got = page.len() as i64;
        rows.extend(page);
        if got < want {
            break;
        }
        offset += got;
    }
    Ok(rows)
}

/// Join image URLs and resolve uploader identity for a set of caption rows.
/// Shared by the feed and search paths.
pub(crate) async fn enrich<S>(
    store: &S,
    directory: Option<&dyn IdentityLookup>,
    fallback: Option<&dyn IdentityLookup>,
    cfg: &FeedConfig,
    rows: Vec<ContentRecord>,
) -> Result<(Vec<ResolvedRecord>, IndexMap<String, String>), FeedError>
where
    S: ContentStore + ?Sized,
{
    // deduplicate before batching; chunks stay within the lookup cap
    let image_ids: Vec<String> = rows
        .iter()
        .filter_map(|r| records::non_empty(&r.image_id))
        .map(str::to_string)
        .unique()
        .collect();

    let mut images: IndexMap<String, String> = IndexMap::new();
    for chunk in batch::chunk(&image_ids, cfg.image_chunk_size) {
        let found = store
            .images_by_ids(&chunk)
            .await
            .map_err(FeedError::ImageFetch)?;
        for img in found {
            if let (Some(id), Some(url)) = (img.id.clone(), img.display_url()) {
                images.insert(id, url);
            }
        }
    }

    let candidates: Vec<String> = rows
        .iter()
        .filter_map(|r| merge::candidate_uploader_id(r, joined_url(&images, r)))
        .collect();

    let identities: ResolvedIdentities =
        identity::resolve_identities(store, directory, fallback, &cfg.limits, &candidates).await;

    let captions = rows
        .iter()
        .map(|r| merge::merge_record(r, joined_url(&images, r), &identities))
        .collect();

    Ok((captions, images))
}

/// The image-map URL joined to a record, if its image id resolved.
fn joined_url<'a>(images: &'a IndexMap<String, String>, record: &ContentRecord) -> Option<&'a str> {
    record
        .image_id
        .as_deref()
        .and_then(|id| images.get(id))
        .map(String::as_str)
}
