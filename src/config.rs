// Runtime configuration for the feed service.
//
// Everything that was a hardcoded literal upstream — endpoints, clamp
// ranges, page sizes, per-tier caps, cache lifetimes — is an env-overridable
// field here. Credentials have no baked-in fallback values.

use crate::identity::ResolverLimits;
use crate::util::env as env_util;

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Identity provider base URL (auth directory + token validation).
    pub supabase_url: Option<String>,
    pub service_role_key: Option<String>,
    pub anon_key: Option<String>,
    /// Alternate identity endpoint for resolution tier 3; tier is skipped
    /// when unset.
    pub fallback_identity_url: Option<String>,
    pub identity_timeout_secs: u64,

    pub feed_limit_min: i64,
    pub feed_limit_max: i64,
    pub feed_limit_default: i64,
    pub feed_page_size: i64,

    pub search_limit_min: i64,
    pub search_limit_max: i64,
    pub search_limit_default: i64,
    pub search_page_size: i64,
    /// Absolute row ceiling for the non-indexed search scan.
    pub search_scan_ceiling: i64,

    pub image_chunk_size: usize,
    pub limits: ResolverLimits,

    pub feed_cache_control: String,
    pub search_cache_control: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            service_role_key: None,
            anon_key: None,
            fallback_identity_url: None,
            identity_timeout_secs: 15,
            feed_limit_min: 200,
            feed_limit_max: 10_000,
            feed_limit_default: 3_000,
            feed_page_size: 500,
            search_limit_min: 20,
            search_limit_max: 1_000,
            search_limit_default: 400,
            search_page_size: 1_000,
            search_scan_ceiling: 50_000,
            image_chunk_size: 150,
            limits: ResolverLimits::default(),
            feed_cache_control: "s-maxage=45, stale-while-revalidate=120".to_string(),
            search_cache_control: "s-maxage=20, stale-while-revalidate=60".to_string(),
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            supabase_url: env_util::env_opt("SUPABASE_URL"),
            service_role_key: env_util::env_opt("SUPABASE_SERVICE_ROLE_KEY"),
            anon_key: env_util::env_opt("SUPABASE_ANON_KEY"),
            fallback_identity_url: env_util::env_opt("IDENTITY_FALLBACK_URL"),
            identity_timeout_secs: env_util::env_parse(
                "IDENTITY_TIMEOUT_SECS",
                defaults.identity_timeout_secs,
            ),
            feed_limit_min: env_util::env_parse("FEED_LIMIT_MIN", defaults.feed_limit_min),
            feed_limit_max: env_util::env_parse("FEED_LIMIT_MAX", defaults.feed_limit_max),
            feed_limit_default: env_util::env_parse(
                "FEED_LIMIT_DEFAULT",
                defaults.feed_limit_default,
            ),
            feed_page_size: env_util::env_parse("FEED_PAGE_SIZE", defaults.feed_page_size),
            search_limit_min: env_util::env_parse("SEARCH_LIMIT_MIN", defaults.search_limit_min),
            search_limit_max: env_util::env_parse("SEARCH_LIMIT_MAX", defaults.search_limit_max),
            search_limit_default: env_util::env_parse(
                "SEARCH_LIMIT_DEFAULT",
                defaults.search_limit_default,
            ),
            search_page_size: env_util::env_parse("SEARCH_PAGE_SIZE", defaults.search_page_size),
            search_scan_ceiling: env_util::env_parse(
                "SEARCH_SCAN_CEILING",
                defaults.search_scan_ceiling,
            ),
            image_chunk_size: env_util::env_parse("IMAGE_CHUNK_SIZE", defaults.image_chunk_size),
            limits: ResolverLimits {
                candidate_id_cap: env_util::env_parse(
                    "CANDIDATE_ID_CAP",
                    defaults.limits.candidate_id_cap,
                ),
                profile_lookup_cap: env_util::env_parse(
                    "PROFILE_LOOKUP_CAP",
                    defaults.limits.profile_lookup_cap,
                ),
                directory_lookup_cap: env_util::env_parse(
                    "DIRECTORY_LOOKUP_CAP",
                    defaults.limits.directory_lookup_cap,
                ),
                fallback_lookup_cap: env_util::env_parse(
                    "FALLBACK_LOOKUP_CAP",
                    defaults.limits.fallback_lookup_cap,
                ),
                profile_chunk_size: env_util::env_parse(
                    "PROFILE_CHUNK_SIZE",
                    defaults.limits.profile_chunk_size,
                ),
                lookup_concurrency: env_util::env_parse(
                    "LOOKUP_CONCURRENCY",
                    defaults.limits.lookup_concurrency,
                ),
            },
            feed_cache_control: env_util::env_opt("FEED_CACHE_CONTROL")
                .unwrap_or(defaults.feed_cache_control),
            search_cache_control: env_util::env_opt("SEARCH_CACHE_CONTROL")
                .unwrap_or(defaults.search_cache_control),
        }
    }

    /// Clamp a requested feed size into the endpoint range; absent means the
    /// configured default.
    pub fn clamp_feed_limit(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(n) => n.clamp(self.feed_limit_min, self.feed_limit_max),
            None => self.feed_limit_default,
        }
    }

    pub fn clamp_search_limit(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(n) => n.clamp(self.search_limit_min, self.search_limit_max),
            None => self.search_limit_default,
        }
    }
}
