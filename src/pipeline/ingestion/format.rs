use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 8;

/// Lowercase the type and drop any `; parameter` suffix.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `image/jpg` is a common non-standard alias of `image/jpeg`.
fn canonical_type(content_type: &str) -> &str {
    match content_type {
        "image/jpg" | "image/pjpeg" => "image/jpeg",
        other => other,
    }
}

pub fn is_allowed_type(allowed: &[String], content_type: &str) -> bool {
    let wanted = canonical_type(content_type);
    allowed
        .iter()
        .any(|a| canonical_type(&normalize_content_type(a)) == wanted)
}

/// Identify JPEG, PNG and GIF from their magic bytes.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    // JPEG: FF D8 FF
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    None
}

/// Extension of the client filename, reduced to lowercase ASCII alphanumerics.
///
/// Directory components are ignored; `None` when nothing usable remains.
pub fn sanitize_extension(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (_, ext) = base.rsplit_once('.')?;
    let cleaned: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_EXTENSION_LEN)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Default extension for an image content type.
pub fn extension_for_type(content_type: &str) -> Option<&'static str> {
    match canonical_type(content_type) {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        other => mime_guess::get_mime_extensions_str(other).and_then(|exts| exts.first().copied()),
    }
}

/// `<uuid v4>.<ext>`; the client filename never contributes more than its extension.
pub fn generate_stored_name(filename: Option<&str>, content_type: &str) -> String {
    let ext = filename
        .and_then(sanitize_extension)
        .or_else(|| extension_for_type(content_type).map(str::to_string));
    match ext {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    }
}
