//! Boundary scanner: find the end of the first complete top-level object.
//!
//! Pure single-pass scan. Braces inside quoted strings are ignored and
//! escape sequences are honored, so a `}` inside `"b{c}"` or after `\"`
//! never terminates a record.

/// Return the byte index of the `}` that closes the first complete top-level
/// `{...}` object in `text`, or `None` if no object is complete yet.
///
/// Assumes the stream is a concatenation of whitespace-separated top-level
/// objects (not one enclosing array): callers feed per-record object text.
/// Structural characters are ASCII, so scanning bytes is safe in the presence
/// of multi-byte UTF-8 content inside strings.
pub fn find_record_boundary(text: &str) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, b) in text.bytes().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match b {
            b'\\' => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
