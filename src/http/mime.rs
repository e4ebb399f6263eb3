//! Content-Type lookup by file extension

/// Sent when no entry matches
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content-Type of the textual bodies sent with error statuses
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Known extensions; text types carry an explicit charset
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("html", "text/html; charset=utf-8"),
    ("htm", "text/html; charset=utf-8"),
    ("css", "text/css; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("mjs", "text/javascript; charset=utf-8"),
    ("txt", TEXT_PLAIN),
    ("md", "text/markdown; charset=utf-8"),
    ("csv", "text/csv; charset=utf-8"),
    ("xml", "application/xml"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("webmanifest", "application/manifest+json"),
    ("wasm", "application/wasm"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
];

/// Content-Type for a file extension, matched case-insensitively
///
/// ```
/// use asset_server::http::mime::content_type_for;
/// assert_eq!(content_type_for(Some("HTML")), "text/html; charset=utf-8");
/// assert_eq!(content_type_for(Some("png")), "image/png");
/// assert_eq!(content_type_for(None), "application/octet-stream");
/// ```
pub fn content_type_for(extension: Option<&str>) -> &'static str {
    let Some(extension) = extension else {
        return OCTET_STREAM;
    };
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(extension))
        .map_or(OCTET_STREAM, |&(_, content_type)| content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_types() {
        assert_eq!(content_type_for(Some("css")), "text/css; charset=utf-8");
        assert_eq!(content_type_for(Some("js")), "text/javascript; charset=utf-8");
        assert_eq!(content_type_for(Some("jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Some("JPG")), "image/jpeg");
        assert_eq!(content_type_for(Some("woff2")), "font/woff2");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(content_type_for(Some("xyz")), OCTET_STREAM);
        assert_eq!(content_type_for(Some("")), OCTET_STREAM);
        assert_eq!(content_type_for(None), OCTET_STREAM);
    }
}
