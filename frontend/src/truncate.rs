/// Shorten `s` for display.
///
/// Strings of at most `max_length` characters come back unchanged. Longer ones
/// are cut to exactly `max_length` characters, lose one trailing comma if the
/// cut left one, and get `"..."` appended. The ellipsis is not counted against
/// `max_length`, so the result is `max_length + 3` (or `+ 2`) characters long.
///
/// Lengths are in `char`s, so a multi-byte character is never split.
pub fn limit_size(s: &str, max_length: usize) -> String {
    let end = match s.char_indices().nth(max_length) {
        // no character at index max_length means it already fits
        None => return s.to_string(),
        Some((index, _)) => index,
    };
    let prefix = &s[..end];
    let prefix = prefix.strip_suffix(',').unwrap_or(prefix);
    format!("{}...", prefix)
}
