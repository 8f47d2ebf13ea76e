// Combining one caption row with its joined image URL and the request's
// resolved identity maps.

use crate::feed::records::{ContentRecord, ResolvedRecord};
use crate::identity::ResolvedIdentities;
use crate::normalization::{image_url, name};

/// The uploader id a record contributes to identity resolution: an explicit
/// field when one exists, otherwise a heuristic derivation from the joined
/// (or embedded) image URL.
pub fn candidate_uploader_id(record: &ContentRecord, joined_url: Option<&str>) -> Option<String> {
    if let Some(id) = record.uploader_id_field() {
        return Some(id.to_string());
    }
    let url = joined_url
        .map(str::to_string)
        .or_else(|| record.embedded_url())?;
    let derived = image_url::derive_uploader_id(&url);
    if derived.is_empty() {
        None
    } else {
        Some(derived)
    }
}

/// Assemble the final record. A non-empty field on the source row always
/// wins; synthesized values only fill genuinely empty slots, and identity
/// that stayed unknown stays null.
pub fn merge_record(
    record: &ContentRecord,
    joined_url: Option<&str>,
    identities: &ResolvedIdentities,
) -> ResolvedRecord {
    let uploader_id = candidate_uploader_id(record, joined_url);

    let email = record
        .uploader_email_field()
        .map(str::to_string)
        .or_else(|| {
            uploader_id
                .as_deref()
                .and_then(|id| identities.emails.get(id).cloned())
        });

    let uploader_name = record
        .uploader_name_field()
        .map(str::to_string)
        .or_else(|| {
            uploader_id
                .as_deref()
                .and_then(|id| identities.names.get(id).cloned())
        })
        .or_else(|| email.as_deref().map(name::derive_name));

    let image_url = joined_url
        .map(str::to_string)
        .or_else(|| record.embedded_url());

    ResolvedRecord {
        id: record.id.clone(),
        image_id: record.image_id.clone(),
        created_datetime_utc: record.created_datetime_utc,
        content: record.caption_text().map(str::to_string),
        image_url,
        uploader_user_id: uploader_id,
        uploader_email: email,
        uploader_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identities(entries: &[(&str, &str, &str)]) -> ResolvedIdentities {
        let mut out = ResolvedIdentities::default();
        for (id, email, name) in entries {
            out.emails.insert(id.to_string(), email.to_string());
            if !name.is_empty() {
                out.names.insert(id.to_string(), name.to_string());
            }
        }
        out
    }

    #[test]
    fn existing_fields_are_never_overwritten() {
        let record = ContentRecord {
            uploader_user_id: Some("u-1".into()),
            uploader_name: Some("Alice".into()),
            ..Default::default()
        };
        let maps = identities(&[("u-1", "bob@example.com", "Bob")]);

        let merged = merge_record(&record, None, &maps);
        assert_eq!(merged.uploader_name.as_deref(), Some("Alice"));
        // the empty email slot still gets filled from the map
        assert_eq!(merged.uploader_email.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn name_is_derived_from_resolved_email_when_absent() {
        let record = ContentRecord {
            uploaded_by_user_id: Some("u-2".into()),
            ..Default::default()
        };
        let maps = identities(&[("u-2", "jane.doe@x.com", "")]);

        let merged = merge_record(&record, None, &maps);
        assert_eq!(merged.uploader_email.as_deref(), Some("jane.doe@x.com"));
        assert_eq!(merged.uploader_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn unknown_identity_stays_null() {
        let record = ContentRecord {
            content: Some("orphan".into()),
            ..Default::default()
        };
        let merged = merge_record(&record, None, &ResolvedIdentities::default());
        assert_eq!(merged.uploader_user_id, None);
        assert_eq!(merged.uploader_email, None);
        assert_eq!(merged.uploader_name, None);
    }

    #[test]
    fn joined_url_beats_embedded_aliases() {
        let record = ContentRecord {
            image_id: Some("img-1".into()),
            url: Some("https://stale.example.com/old.png".into()),
            ..Default::default()
        };
        let merged = merge_record(
            &record,
            Some("https://cdn.example.com/new.png"),
            &ResolvedIdentities::default(),
        );
        assert_eq!(
            merged.image_url.as_deref(),
            Some("https://cdn.example.com/new.png")
        );
    }

    #[test]
    fn non_http_embedded_urls_resolve_to_null() {
        let record = ContentRecord {
            url: Some("file:///tmp/meme.png".into()),
            ..Default::default()
        };
        let merged = merge_record(&record, None, &ResolvedIdentities::default());
        assert_eq!(merged.image_url, None);
    }

    #[test]
    fn candidate_id_falls_back_to_url_derivation() {
        let record = ContentRecord::default();
        let id = candidate_uploader_id(
            &record,
            Some("https://cdn.example.com/6f9619ff-8b86-d011-b42d-00c04fc964ff/a.png"),
        );
        assert_eq!(id.as_deref(), Some("6f9619ff-8b86-d011-b42d-00c04fc964ff"));
    }
}
