// Substring search over the caption scan, bounded by an absolute row
// ceiling. Matched rows go through the same join/resolve pipeline as the
// feed; anything that ends up without text or an image is dropped.

use tracing::debug;

use crate::config::FeedConfig;
use crate::database_ops::db::ContentStore;
use crate::error::FeedError;
use crate::feed::records::{ContentRecord, ResolvedRecord};
use crate::identity::directory::IdentityLookup;

/// Case-insensitive substring search against the caption-text cascade.
/// An empty term short-circuits to an empty result with zero store calls.
pub async fn search_feed<S>(
    store: &S,
    directory: Option<&dyn IdentityLookup>,
    fallback: Option<&dyn IdentityLookup>,
    cfg: &FeedConfig,
    term: &str,
    requested_limit: Option<i64>,
) -> Result<Vec<ResolvedRecord>, FeedError>
where
    S: ContentStore + ?Sized,
{
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Ok(Vec::new());
    }
    let limit = cfg.clamp_search_limit(requested_limit);

    let matched = scan_for_matches(store, cfg, &term, limit).await?;
    debug!(matched = matched.len(), %term, "search scan finished");

    let (resolved, _images) = super::enrich(store, directory, fallback, cfg, matched).await?;
    Ok(resolved
        .into_iter()
        .filter(|r| {
            r.content.as_deref().is_some_and(|c| !c.is_empty()) && r.image_url.is_some()
        })
        .collect())
}

/// Paged scan, newest first, stopping at `limit` matches or the absolute
/// scan ceiling — whichever comes first.
async fn scan_for_matches<S>(
    store: &S,
    cfg: &FeedConfig,
    term: &str,
    limit: i64,
) -> Result<Vec<ContentRecord>, FeedError>
where
    S: ContentStore + ?Sized,
{
    let mut matched: Vec<ContentRecord> = Vec::new();
    let mut offset = 0i64;
    let mut scanned = 0i64;

    'scan: while scanned < cfg.search_scan_ceiling {
        let want = cfg.search_page_size.min(cfg.search_scan_ceiling - scanned);
        let page = store
            .caption_page(offset, want)
            .await
            .map_err(FeedError::PageFetch)?;
        let got = page.len() as i64;
        scanned += got;

        for row in page {
            let matches = row
                .caption_text()
                .is_some_and(|text| text.to_lowercase().contains(term));
            if !matches {
                continue;
            }
            matched.push(row);
            if matched.len() as i64 >= limit {
                break 'scan;
            }
        }

        if got < want {
            break;
        }
        offset += got;
    }

    Ok(matched)
}
