//! UTF-8 safe truncation helpers.
//!
//! Channel payloads have per-platform length caps (Discord 2000, WhatsApp
//! 4096). Slicing by byte index panics on multibyte characters, so limits
//! are applied to Unicode scalar values instead.

/// Return the first `n` characters of `s` (no ellipsis).
pub fn prefix_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Return `s` cut to `n` characters, with a trailing `...` when anything
/// was dropped. The result is at most `n + 3` characters.
pub fn preview(s: &str, n: usize) -> String {
    let mut prefix = prefix_chars(s, n);
    if s.chars().nth(n).is_some() {
        prefix.push_str("...");
    }
    prefix
}

/// Fit `s` into `limit` characters, ellipsis included.
pub fn fit_to_limit(s: &str, limit: usize) -> String {
    if s.chars().nth(limit).is_none() {
        return s.to_string();
    }
    preview(s, limit.saturating_sub(3))
}
