//! Download lists: one `URL [NAME]` per line, `#` starts a comment.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::model::DownloadRequest;
use crate::url_model::sanitize_file_name;

const SCHEMES: [&str; 4] = ["http", "https", "ftp", "file"];

/// Build a request for `url` saved under `dir`. The name comes from `name`
/// when given (sanitized), otherwise from the URL path.
pub fn request_for(url: &str, name: Option<&str>, dir: &Path) -> Result<DownloadRequest> {
    let parsed = url::Url::parse(url).with_context(|| format!("invalid URL: {url}"))?;
    if !SCHEMES.contains(&parsed.scheme()) {
        bail!("unsupported scheme {:?} in {}", parsed.scheme(), url);
    }
    match name {
        Some(name) => {
            let file_name = sanitize_file_name(name);
            if file_name.is_empty() {
                bail!("file name {:?} is empty after sanitizing", name);
            }
            let destination = dir.join(&file_name);
            Ok(DownloadRequest::new(url, file_name, destination))
        }
        None => Ok(DownloadRequest::from_url(url, dir)),
    }
}

/// Parse a download list. Blank lines and `#` comments are skipped; any other
/// malformed line fails the whole list.
pub fn parse_list(text: &str, dir: &Path) -> Result<Vec<DownloadRequest>> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(url), name) = (fields.next(), fields.next()) else {
            continue;
        };
        if fields.next().is_some() {
            bail!("line {}: expected `URL [NAME]`", idx + 1);
        }
        out.push(request_for(url, name, dir).with_context(|| format!("line {}", idx + 1))?);
    }
    Ok(out)
}

/// Cut a `#` comment that starts the line or follows whitespace. A `#` inside
/// a field (a URL fragment) is kept.
fn strip_comment(line: &str) -> &str {
    let mut prev_blank = true;
    for (i, c) in line.char_indices() {
        if c == '#' && prev_blank {
            return &line[..i];
        }
        prev_blank = c.is_whitespace();
    }
    line
}

/// Read and parse a download list file.
pub fn read_list(path: &Path, dir: &Path) -> Result<Vec<DownloadRequest>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read download list: {}", path.display()))?;
    parse_list(&text, dir).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_urls_names_and_comments() {
        let text = "\
# nightly images
https://example.com/a/debian.iso
https://example.com/latest  latest.tar.gz   # renamed

ftp://mirror.example.org/pub/readme.txt
";
        let dir = Path::new("/downloads");
        let reqs = parse_list(text, dir).unwrap();
        let names: Vec<&str> = reqs.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["debian.iso", "latest.tar.gz", "readme.txt"]);
        assert_eq!(reqs[1].url, "https://example.com/latest");
        assert_eq!(reqs[1].destination_path, dir.join("latest.tar.gz"));
    }

    #[test]
    fn fragment_in_url_is_not_a_comment() {
        let text = "https://e.com/a#x name.bin\nhttps://e.com/b#frag #note\n";
        let reqs = parse_list(text, Path::new("/d")).unwrap();
        assert_eq!(reqs[0].url, "https://e.com/a#x");
        assert_eq!(reqs[0].file_name, "name.bin");
        assert_eq!(reqs[1].url, "https://e.com/b#frag");
        assert_eq!(strip_comment("  # only a comment").trim(), "");
    }

    #[test]
    fn extra_fields_are_rejected_with_line_number() {
        let err = parse_list("https://e.com/a a b\n", Path::new("/d")).unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }

    #[test]
    fn bad_url_or_scheme_is_rejected() {
        assert!(request_for("not a url", None, Path::new("/d")).is_err());
        assert!(request_for("mailto:x@example.com", None, Path::new("/d")).is_err());
        let text = "\n\nhttps://ok.example/x\ngopher://old/y\n";
        let err = parse_list(text, Path::new("/d")).unwrap_err();
        assert!(format!("{err:#}").contains("line 4"));
    }

    #[test]
    fn explicit_name_is_sanitized() {
        let req = request_for("https://e.com/x", Some("../etc/passwd"), Path::new("/d")).unwrap();
        assert!(!req.file_name.contains('/'));
        assert!(req.destination_path.starts_with("/d"));
    }

    #[test]
    fn read_list_from_file() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "https://example.com/one.bin").unwrap();
        writeln!(f, "https://example.com/two two.bin").unwrap();
        f.flush().unwrap();
        let reqs = read_list(f.path(), Path::new("/d")).unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1].file_name, "two.bin");
    }
}
