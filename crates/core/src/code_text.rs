//! Helpers for code text: strings over {'0', '1', line break}.
//!
//! Line breaks are formatting only (fixed-width wrapping) and never carry
//! data. Both `\n` and `\r` count as line breaks so CRLF files pass.

/// Default column width for compact formatting.
pub const DEFAULT_WRAP_WIDTH: usize = 50;

pub fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// True if `text` contains only '0', '1' and line breaks.
///
/// Callers use this to pre-check ciphertext before decoding or sending it.
/// The empty string passes.
pub fn is_code_text(text: &str) -> bool {
    text.chars().all(|c| c == '0' || c == '1' || is_line_break(c))
}

/// Position and character of the first byte outside the code alphabet.
pub fn first_invalid(text: &str) -> Option<(usize, char)> {
    text.chars()
        .enumerate()
        .find(|&(_, c)| !(c == '0' || c == '1' || is_line_break(c)))
}

pub fn strip_line_breaks(text: &str) -> String {
    text.chars().filter(|&c| !is_line_break(c)).collect()
}

/// Re-wrap code text at `width` columns.
///
/// Existing line breaks are removed first; a newline follows every full line.
/// A width of 0 only strips.
pub fn wrap_code(text: &str, width: usize) -> String {
    let bits = strip_line_breaks(text);
    if width == 0 {
        return bits;
    }

    let mut out = String::with_capacity(bits.len() + bits.len() / width);
    for (i, c) in bits.chars().enumerate() {
        out.push(c);
        if (i + 1) % width == 0 {
            out.push('\n');
        }
    }
    out
}
