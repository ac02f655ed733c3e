//! Last URL path segment as a file-name hint.

/// Last non-empty path segment of `url`, as it appears in the URL.
///
/// `None` when the URL does not parse or its path is root.
pub fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_path() {
        assert_eq!(
            last_path_segment("https://example.com/a/b/file.deb").as_deref(),
            Some("file.deb")
        );
    }

    #[test]
    fn trailing_slash_uses_previous_segment() {
        assert_eq!(
            last_path_segment("https://example.com/pkg/").as_deref(),
            Some("pkg")
        );
    }

    #[test]
    fn query_is_ignored() {
        assert_eq!(
            last_path_segment("https://example.com/file.zip?token=abc").as_deref(),
            Some("file.zip")
        );
    }

    #[test]
    fn root_has_no_segment() {
        assert_eq!(last_path_segment("https://example.com/"), None);
        assert_eq!(last_path_segment("mailto:someone@example.com"), None);
    }
}
