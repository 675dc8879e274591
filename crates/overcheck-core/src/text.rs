//! Text position utilities and identifier checks.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count bytes, not characters

/// Convert a byte offset to a 1-indexed `(line, col)` pair.
///
/// Offsets past the end clamp to the end of `content`.
pub fn byte_offset_to_position(content: &[u8], offset: usize) -> (u32, u32) {
    let prefix = &content[..offset.min(content.len())];
    let line = prefix.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
    let line_start = prefix
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    (line, (prefix.len() - line_start) as u32 + 1)
}

/// [`byte_offset_to_position`] over a `&str`.
pub fn byte_offset_to_position_str(content: &str, offset: usize) -> (u32, u32) {
    byte_offset_to_position(content.as_bytes(), offset)
}

/// Check whether `name` is lexically a plain identifier.
///
/// This is a language-neutral check (letters, digits, underscore, no leading
/// digit). Keywords are the provider's concern and surface at re-parse time.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Explain why `name` is not an identifier, or `None` if it is one.
pub fn identifier_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("name cannot be empty");
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Some("name cannot start with a digit");
    }
    if !is_identifier(name) {
        return Some("name may only contain letters, digits, and underscores");
    }
    None
}
