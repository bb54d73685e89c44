//! Derived keys for entities that arrive without a durable external id.

/// Derive a team id from its logo URL.
///
/// Teams are only identifiable by their logo, so the id is the lowercase
/// hex MD5 digest of the trimmed URL. Returns `None` for an empty URL,
/// which cannot identify anything.
pub fn team_id_from_logo(logo_url: &str) -> Option<String> {
    let url = logo_url.trim();
    if url.is_empty() {
        return None;
    }
    Some(format!("{:x}", md5::compute(url.as_bytes())))
}
