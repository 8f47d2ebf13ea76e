use regex::Regex;
use std::sync::OnceLock;
use url::Url;

static URL_PATTERN: OnceLock<Regex> = OnceLock::new();
static UUID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn url_pattern() -> &'static Regex {
    // Absolute or protocol-relative http(s) only; anything else is not displayable.
    URL_PATTERN.get_or_init(|| Regex::new(r"(?i)^(https?:)?//").expect("valid url pattern"))
}

fn uuid_pattern() -> &'static Regex {
    UUID_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .expect("valid uuid pattern")
    })
}

/// Pick the first candidate that looks like a servable http(s) URL.
///
/// Candidates arrive in field-priority order; whitespace-only values are
/// skipped the same as absent ones.
pub fn pick_url<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    for candidate in candidates {
        let clean = candidate.unwrap_or("").trim();
        if !clean.is_empty() && url_pattern().is_match(clean) {
            return Some(clean.to_string());
        }
    }
    None
}

/// Best-effort guess at an uploader id embedded in an asset URL.
///
/// Storage paths commonly carry the owning user's UUID as a path segment, so
/// a UUID-shaped token anywhere in the string wins; otherwise the first path
/// segment after the host is used. Returns an empty string when neither
/// matches. The result is a resolution hint, never authoritative identity.
pub fn derive_uploader_id(raw_url: &str) -> String {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(m) = uuid_pattern().find(trimmed) {
        return m.as_str().to_ascii_lowercase();
    }

    // Protocol-relative URLs don't parse on their own; borrow a scheme.
    let absolute = if trimmed.starts_with("//") {
        format!("https:{trimmed}")
    } else {
        trimmed.to_string()
    };

    match Url::parse(&absolute) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .map(|s| s.to_string())
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_matching_candidate() {
        let picked = pick_url([
            Some(""),
            Some("not-a-url"),
            Some("  https://cdn.example.com/a.png  "),
            Some("https://other.example.com/b.png"),
        ]);
        assert_eq!(picked.as_deref(), Some("https://cdn.example.com/a.png"));
    }

    #[test]
    fn accepts_protocol_relative_urls() {
        let picked = pick_url([Some("//cdn.example.com/x.gif")]);
        assert_eq!(picked.as_deref(), Some("//cdn.example.com/x.gif"));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert_eq!(pick_url([Some("ftp://example.com/a"), None]), None);
        assert_eq!(pick_url([Some("data:image/png;base64,xyz")]), None);
    }

    #[test]
    fn derives_uuid_token_from_anywhere_in_url() {
        let id = derive_uploader_id(
            "https://cdn.example.com/storage/v1/object/public/uploads/6F9619FF-8B86-D011-B42D-00C04FC964FF/meme.png",
        );
        assert_eq!(id, "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    }

    #[test]
    fn falls_back_to_first_path_segment() {
        let id = derive_uploader_id("https://cdn.example.com/user-42/images/meme.png");
        assert_eq!(id, "user-42");
    }

    #[test]
    fn handles_protocol_relative_paths() {
        let id = derive_uploader_id("//cdn.example.com/alice/pic.jpg");
        assert_eq!(id, "alice");
    }

    #[test]
    fn unusable_input_yields_empty_string() {
        assert_eq!(derive_uploader_id(""), "");
        assert_eq!(derive_uploader_id("not a url at all"), "");
        assert_eq!(derive_uploader_id("https://host.example.com"), "");
    }
}
