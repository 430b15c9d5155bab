//! Character-offset helpers.
//!
//! The engine addresses normalized text by Unicode scalar values rather than
//! bytes, so that anchor offsets stay meaningful for non-ASCII documents.
//! These helpers translate between char offsets and the byte offsets the
//! standard library slices by.

/// Length of `s` in chars.
pub fn len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the char at `char_idx`, clamped to the end of the string.
pub fn byte_at(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Char offset of the char starting at byte offset `byte_idx`.
///
/// `byte_idx` must lie on a char boundary; offsets produced by `byte_at` or
/// by `str::find` on the same string always do.
pub fn from_byte(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx.min(s.len())].chars().count()
}

/// Slice `s` by char offsets `[start, end)`, clamped to the string bounds.
pub fn slice(s: &str, start: usize, end: usize) -> &str {
    let b = byte_at(s, start);
    let e = byte_at(s, end).max(b);
    &s[b..e]
}
