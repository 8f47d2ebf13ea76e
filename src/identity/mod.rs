// Cascading uploader-identity resolution.
//
// Four ordered tiers, each bounded, each acting only on ids every earlier
// tier left unresolved: profile batch lookup, directory-by-id, the alternate
// identity endpoint, and finally "stays unknown" — which is a valid terminal
// state, not an error.

pub mod directory;

use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::database_ops::db::ContentStore;
use crate::util::batch;
use directory::{IdentityLookup, IdentityRecord};

/// Per-tier cost bounds. The caps are deliberate product limits: ids beyond
/// a tier's cap stay unresolved for the request.
#[derive(Debug, Clone)]
pub struct ResolverLimits {
    /// Cardinality cap on the deduplicated candidate id set.
    pub candidate_id_cap: usize,
    pub profile_lookup_cap: usize,
    pub directory_lookup_cap: usize,
    pub fallback_lookup_cap: usize,
    pub profile_chunk_size: usize,
    /// Worker-pool width for the per-id tiers.
    pub lookup_concurrency: usize,
}

impl Default for ResolverLimits {
    fn default() -> Self {
        Self {
            candidate_id_cap: 400,
            profile_lookup_cap: 400,
            directory_lookup_cap: 200,
            fallback_lookup_cap: 180,
            profile_chunk_size: 150,
            lookup_concurrency: 8,
        }
    }
}

/// Request-scoped output maps, partial by design.
#[derive(Debug, Clone, Default)]
pub struct ResolvedIdentities {
    pub emails: HashMap<String, String>,
    pub names: HashMap<String, String>,
}

impl ResolvedIdentities {
    pub fn is_resolved(&self, id: &str) -> bool {
        self.emails.contains_key(id) || self.names.contains_key(id)
    }

    fn absorb(&mut self, id: &str, email: Option<String>, name: Option<String>) {
        if let Some(email) = email.filter(|v| !v.trim().is_empty()) {
            self.emails.entry(id.to_string()).or_insert(email);
        }
        if let Some(name) = name.filter(|v| !v.trim().is_empty()) {
            self.names.entry(id.to_string()).or_insert(name);
        }
    }
}

/// Resolve candidate uploader ids to email/name mappings.
///
/// Candidates are deduplicated (first occurrence wins) and cardinality-capped
/// before any external call. Tier failures degrade: a bad profile batch is
/// skipped, a failed per-id lookup yields "still unresolved". Nothing here
/// aborts the surrounding request.
pub async fn resolve_identities<S>(
    store: &S,
    directory: Option<&dyn IdentityLookup>,
    fallback: Option<&dyn IdentityLookup>,
    limits: &ResolverLimits,
    candidate_ids: &[String],
) -> ResolvedIdentities
where
    S: ContentStore + ?Sized,
{
    let mut out = ResolvedIdentities::default();

    let ids: Vec<String> = candidate_ids
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unique()
        .take(limits.candidate_id_cap)
        .collect();
    if ids.is_empty() {
        return out;
    }
    debug!(candidates = ids.len(), "resolving uploader identities");

    // Tier 1: profile batch lookup, narrow column list first, one wide retry
    // per chunk on schema mismatch. Any other failure skips that chunk only.
    let tier1: Vec<String> = ids.iter().take(limits.profile_lookup_cap).cloned().collect();
    for chunk in batch::chunk(&tier1, limits.profile_chunk_size) {
        let profiles = match store.profiles_narrow(&chunk).await {
            Ok(rows) => rows,
            Err(err) if err.is_schema_mismatch() => match store.profiles_wide(&chunk).await {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(error = %err, "wide profile lookup failed; skipping batch");
                    continue;
                }
            },
            Err(err) => {
                warn!(error = %err, "profile lookup failed; skipping batch");
                continue;
            }
        };
        for profile in profiles {
            if let Some(id) = profile.id {
                out.absorb(&id, profile.email, profile.display_name);
            }
        }
    }

    // Tier 2: directory-by-id on whatever tier 1 left unresolved.
    if let Some(directory) = directory {
        let pending = unresolved(&ids, &out, limits.directory_lookup_cap);
        run_lookup_tier(directory, pending, limits.lookup_concurrency, &mut out, "directory")
            .await;
    }

    // Tier 3: alternate identity endpoint, independently capped.
    if let Some(fallback) = fallback {
        let pending = unresolved(&ids, &out, limits.fallback_lookup_cap);
        run_lookup_tier(fallback, pending, limits.lookup_concurrency, &mut out, "fallback").await;
    }

    debug!(
        emails = out.emails.len(),
        names = out.names.len(),
        "identity resolution finished"
    );
    out
}

/// First-N still-unresolved ids in stable input order.
fn unresolved(ids: &[String], out: &ResolvedIdentities, cap: usize) -> Vec<String> {
    ids.iter()
        .filter(|id| !out.is_resolved(id))
        .take(cap)
        .cloned()
        .collect()
}

/// Fan a per-id tier over a bounded worker pool. Ids are independent, so
/// completion order doesn't matter; failures count as unresolved.
async fn run_lookup_tier(
    lookup: &dyn IdentityLookup,
    ids: Vec<String>,
    concurrency: usize,
    out: &mut ResolvedIdentities,
    tier: &'static str,
) {
    if ids.is_empty() {
        return;
    }
    let results: Vec<(String, Option<IdentityRecord>)> = stream::iter(ids)
        .map(|id| async move {
            match lookup.lookup(&id).await {
                Ok(found) => (id, found),
                Err(err) => {
                    debug!(tier, uploader_id = %id, error = %err, "lookup failed; leaving unresolved");
                    (id, None)
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (id, found) in results {
        if let Some(rec) = found {
            out.absorb(&id, rec.email, rec.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::directory::{IdentityLookup, IdentityRecord, LookupError};
    use super::*;
    use crate::feed::records::ProfileRecord;
    use crate::feed::testing::MockStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingLookup {
        known: HashMap<String, IdentityRecord>,
        fail_ids: Vec<String>,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl CountingLookup {
        fn knowing(entries: &[(&str, &str)]) -> Self {
            let known = entries
                .iter()
                .map(|(id, email)| {
                    (
                        id.to_string(),
                        IdentityRecord {
                            email: Some(email.to_string()),
                            name: None,
                        },
                    )
                })
                .collect();
            Self {
                known,
                ..Default::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityLookup for CountingLookup {
        async fn lookup(&self, uploader_id: &str) -> Result<Option<IdentityRecord>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(uploader_id.to_string());
            if self.fail_ids.iter().any(|id| id == uploader_id) {
                return Err(LookupError::Status(reqwest::StatusCode::BAD_GATEWAY));
            }
            Ok(self.known.get(uploader_id).cloned())
        }
    }

    fn profile(id: &str, email: &str, name: Option<&str>) -> ProfileRecord {
        ProfileRecord {
            id: Some(id.to_string()),
            email: Some(email.to_string()),
            display_name: name.map(str::to_string),
        }
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn ids_resolved_at_tier_one_never_reach_later_tiers() {
        let store = MockStore {
            profiles: vec![profile("a", "a@example.com", None)],
            ..Default::default()
        };
        let directory = CountingLookup::knowing(&[("b", "b@example.com")]);
        let fallback = CountingLookup::default();

        let resolved = resolve_identities(
            &store,
            Some(&directory),
            Some(&fallback),
            &ResolverLimits::default(),
            &ids(&["a", "b"]),
        )
        .await;

        assert_eq!(resolved.emails["a"], "a@example.com");
        assert_eq!(resolved.emails["b"], "b@example.com");
        assert_eq!(directory.call_count(), 1);
        assert_eq!(*directory.seen.lock().unwrap(), ["b"]);
        // b resolved at tier 2, so the fallback tier had nothing to do
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn schema_mismatch_retries_the_chunk_wide_once() {
        let store = MockStore {
            profiles: vec![profile("a", "a@example.com", Some("Alice"))],
            narrow_schema_mismatch: true,
            ..Default::default()
        };

        let resolved = resolve_identities(
            &store,
            None,
            None,
            &ResolverLimits::default(),
            &ids(&["a"]),
        )
        .await;

        assert_eq!(store.narrow_calls(), 1);
        assert_eq!(store.wide_calls(), 1);
        assert_eq!(resolved.emails["a"], "a@example.com");
        assert_eq!(resolved.names["a"], "Alice");
    }

    #[tokio::test]
    async fn non_schema_error_skips_that_batch_only() {
        let store = MockStore {
            profiles: vec![
                profile("a", "a@example.com", None),
                profile("b", "b@example.com", None),
            ],
            fail_narrow_calls: vec![0],
            ..Default::default()
        };
        let limits = ResolverLimits {
            profile_chunk_size: 1,
            ..Default::default()
        };

        let resolved = resolve_identities(&store, None, None, &limits, &ids(&["a", "b"])).await;

        // first chunk (a) failed and was skipped; second chunk (b) resolved
        assert!(!resolved.is_resolved("a"));
        assert_eq!(resolved.emails["b"], "b@example.com");
        assert_eq!(store.wide_calls(), 0);
    }

    #[tokio::test]
    async fn per_id_lookup_failures_are_swallowed() {
        let store = MockStore::default();
        let directory = CountingLookup {
            known: HashMap::from([(
                "ok".to_string(),
                IdentityRecord {
                    email: Some("ok@example.com".to_string()),
                    name: None,
                },
            )]),
            fail_ids: vec!["boom".to_string()],
            ..Default::default()
        };

        let resolved = resolve_identities(
            &store,
            Some(&directory),
            None,
            &ResolverLimits::default(),
            &ids(&["boom", "ok"]),
        )
        .await;

        assert_eq!(directory.call_count(), 2);
        assert!(!resolved.is_resolved("boom"));
        assert_eq!(resolved.emails["ok"], "ok@example.com");
    }

    #[tokio::test]
    async fn tier_caps_take_first_n_in_input_order() {
        let store = MockStore::default();
        let directory = CountingLookup::default();
        let limits = ResolverLimits {
            directory_lookup_cap: 2,
            lookup_concurrency: 1,
            ..Default::default()
        };

        resolve_identities(
            &store,
            Some(&directory),
            None,
            &limits,
            &ids(&["one", "two", "three", "four"]),
        )
        .await;

        assert_eq!(directory.call_count(), 2);
        assert_eq!(*directory.seen.lock().unwrap(), ["one", "two"]);
    }

    #[tokio::test]
    async fn candidates_are_deduplicated_and_capped_before_lookups() {
        let store = MockStore::default();
        let directory = CountingLookup::default();
        let limits = ResolverLimits {
            candidate_id_cap: 2,
            lookup_concurrency: 1,
            ..Default::default()
        };

        resolve_identities(
            &store,
            Some(&directory),
            None,
            &limits,
            &ids(&["a", " a ", "b", "c", ""]),
        )
        .await;

        // "a" deduplicated, cardinality capped at 2, empty dropped
        assert_eq!(directory.call_count(), 2);
        assert_eq!(*directory.seen.lock().unwrap(), ["a", "b"]);
    }

    #[tokio::test]
    async fn empty_candidates_touch_nothing() {
        let store = MockStore::default();
        let resolved =
            resolve_identities(&store, None, None, &ResolverLimits::default(), &[]).await;
        assert!(resolved.emails.is_empty());
        assert_eq!(store.narrow_calls(), 0);
    }
}
