use crate::MessageMetadata;

/// Derives the metadata attached to a payload.
///
/// Must be re-run whenever a payload is written; metadata is never carried
/// over from a previous version of a message.
pub fn derive(payload: &str) -> MessageMetadata {
    MessageMetadata {
        palindrome: is_palindrome(payload),
    }
}

/// Tests whether `text` reads the same in both directions, ignoring case and
/// every character that is neither a letter nor a digit.
///
/// Text with nothing left after normalization is a palindrome.
///
/// ```
/// use missive::is_palindrome;
///
/// assert!(is_palindrome("A man, a plan, a canal: Panama"));
/// assert!(!is_palindrome("racecard"));
/// ```
pub fn is_palindrome(text: &str) -> bool {
    let normalized: Vec<char> = text
        .chars()
        .filter(|c| c.is_alphanumeric())
        .map(fold_case)
        .collect();

    normalized.iter().eq(normalized.iter().rev())
}

// One character in, one character out. A full lowercase mapping can expand
// (`'İ'` is `"i\u{307}"`), and reversing an expansion moves the combining
// mark to the wrong side.
fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}
