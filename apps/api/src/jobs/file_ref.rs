//! File references handed out by the upload endpoint.
//!
//! Shape: `<base>/o/<percent-encoded object key>?<query>`.

/// Builds the reference for an object key.
pub fn build_file_reference(base_url: &str, key: &str) -> String {
    format!(
        "{}/o/{}?alt=media",
        base_url.trim_end_matches('/'),
        urlencoding::encode(key)
    )
}

/// Resolves a file reference back to its object key.
/// Returns `None` when the reference does not have the expected shape.
pub fn parse_file_reference(file_url: &str) -> Option<String> {
    let start = file_url.find("/o/")? + "/o/".len();
    let rest = &file_url[start..];
    let end = rest.rfind('?')?;
    let encoded = &rest[..end];
    if encoded.is_empty() {
        return None;
    }
    let key = urlencoding::decode(encoded).ok()?;
    if key.trim().is_empty() {
        return None;
    }
    Some(key.into_owned())
}
