//! File-name derivation for requests built from a bare URL.

mod path;
mod sanitize;

pub use path::last_path_segment;
pub use sanitize::sanitize_file_name;

/// Name used when the URL path yields nothing usable.
const FALLBACK_NAME: &str = "download.bin";

/// Derives the queue key / on-disk name for a URL: the last path segment,
/// sanitized, or `download.bin`.
pub fn derive_filename(url: &str) -> String {
    let Some(raw) = last_path_segment(url) else {
        return FALLBACK_NAME.to_string();
    };
    let name = sanitize_file_name(&raw);
    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_from_path() {
        assert_eq!(derive_filename("https://example.com/archive.zip"), "archive.zip");
        assert_eq!(
            derive_filename("https://cdn.example.com/path/to/debian-12.iso"),
            "debian-12.iso"
        );
    }

    #[test]
    fn fallback_for_root_and_garbage() {
        assert_eq!(derive_filename("https://example.com/"), FALLBACK_NAME);
        assert_eq!(derive_filename("https://example.com"), FALLBACK_NAME);
        assert_eq!(derive_filename("not a url"), FALLBACK_NAME);
        assert_eq!(derive_filename("https://example.com/..."), FALLBACK_NAME);
    }
}
