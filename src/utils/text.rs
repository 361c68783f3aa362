//! Text helpers.

/// Drop every non-ASCII character.
///
/// Used on cache key material so keys do not depend on how a client encoded
/// accented input.
pub fn remove_non_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}
