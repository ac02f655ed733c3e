//! File-name sanitization for queue keys and destination names.

/// Longest name most Linux filesystems accept (NAME_MAX).
const NAME_MAX: usize = 255;

/// Makes `name` safe to use as a single path component.
///
/// Separators, NUL, control characters and whitespace become `_` (runs
/// collapse to one); leading/trailing dots and underscores are trimmed; the
/// result is cut to `NAME_MAX` bytes on a char boundary.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let unsafe_char = c == '/' || c == '\\' || c.is_control() || c.is_whitespace();
        let c = if unsafe_char { '_' } else { c };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
