//! Label wrapping for wheel segments.
//!
//! Long titles are broken at natural word boundaries so a segment label never
//! runs much past `break_at` characters per line. Words are never split: when
//! there is no boundary within reach the text is left as is.

/// Wrap `text` by inserting `\n` at word boundaries.
///
/// Lengths and indices count `char`s, not bytes. Whitespace trimmed off the end
/// of a line is carried over to the start of the next one, so removing every
/// inserted `\n` always gives back the original text.
pub fn wrap(text: &str, break_at: usize) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / break_at.max(1));
    let mut rest = text;

    loop {
        match split_point(rest, break_at) {
            Some(at) => {
                out.push_str(&rest[..at]);
                out.push('\n');
                rest = &rest[at..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Byte offset where `text` should be broken, or `None` to leave it whole.
fn split_point(text: &str, break_at: usize) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    if chars.len() <= break_at {
        return None;
    }

    for i in (1..=break_at).rev() {
        let (offset, c) = chars[i];
        if c.is_alphanumeric() {
            continue;
        }
        let head = text[..offset].trim_end();
        // A boundary preceded only by whitespace would make no progress.
        if !head.is_empty() {
            return Some(head.len());
        }
    }

    None
}
