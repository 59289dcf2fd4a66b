//! Frequency table text format.
//!
//! # Format
//!
//! ```text
//! <symbol> TAB <weight> [TAB <code>] LF
//! ```
//!
//! - `symbol` is exactly one character, and may itself be a space, tab or
//!   newline. Entries are therefore read with a cursor rather than split on
//!   line breaks.
//! - `weight` is a finite, non-negative decimal literal (`3`, `0.25`, `1e3`).
//! - `code` (export form only) is the entry's bit string; it may be empty for
//!   a single-symbol tree.
//! - The final LF is optional.
//!
//! Any malformed entry rejects the whole table. Repeated symbols follow
//! mapping semantics: the last weight wins, the first position is kept.

use crate::alphabet::WeightedAlphabet;
use crate::error::{Result, TableError};
use crate::tree::CodeTree;
use std::iter::Peekable;
use std::str::Chars;

/// Parse the two-column form.
pub fn parse(text: &str) -> Result<WeightedAlphabet> {
    parse_entries(text, false)
}

/// Parse the three-column export form.
///
/// The code column is checked for shape only and then discarded; the tree is
/// always rebuilt from the weights.
pub fn parse_with_codes(text: &str) -> Result<WeightedAlphabet> {
    parse_entries(text, true)
}

/// Serialize in the two-column form, one entry per line in alphabet order.
pub fn serialize(alphabet: &WeightedAlphabet) -> String {
    let mut out = String::new();
    for (symbol, weight) in alphabet.iter() {
        out.push(symbol);
        out.push('\t');
        out.push_str(&weight.to_string());
        out.push('\n');
    }
    out
}

/// Serialize in the three-column export form, with each symbol's code.
pub fn serialize_with_codes(tree: &CodeTree) -> String {
    let mut out = String::new();
    for ((symbol, weight), (_, code)) in tree.alphabet().iter().zip(tree.codes()) {
        out.push(symbol);
        out.push('\t');
        out.push_str(&weight.to_string());
        out.push('\t');
        out.push_str(code);
        out.push('\n');
    }
    out
}

fn parse_entries(text: &str, with_codes: bool) -> Result<WeightedAlphabet> {
    let mut alphabet = WeightedAlphabet::new();
    let mut chars = text.chars().peekable();
    let mut line = 0;

    while let Some(symbol) = chars.next() {
        line += 1;

        if chars.next() != Some('\t') {
            return Err(TableError::MissingTab { line }.into());
        }

        let weight_text = take_field(&mut chars);
        if weight_text.is_empty() {
            return Err(TableError::MissingWeight { line }.into());
        }
        let weight = parse_weight(&weight_text).ok_or_else(|| TableError::InvalidWeight {
            line,
            text: weight_text.clone(),
        })?;

        let mut terminator = chars.next();
        if with_codes {
            if terminator != Some('\t') {
                return Err(TableError::InvalidCode {
                    line,
                    text: String::new(),
                }
                .into());
            }
            let code = take_field(&mut chars);
            if !code.chars().all(|c| c == '0' || c == '1') {
                return Err(TableError::InvalidCode { line, text: code }.into());
            }
            terminator = chars.next();
        }

        match terminator {
            None | Some('\n') => {}
            Some(_) => return Err(TableError::TrailingColumn { line }.into()),
        }

        alphabet.insert(symbol, weight)?;
    }

    Ok(alphabet)
}

/// Consume characters up to (not including) the next tab or newline.
fn take_field(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut field = String::new();
    while let Some(&c) = chars.peek() {
        if c == '\t' || c == '\n' {
            break;
        }
        field.push(c);
        chars.next();
    }
    field
}

/// Accept plain decimal literals only: no sign, no `inf`/`nan`.
fn parse_weight(text: &str) -> Option<f64> {
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || first == '.') {
        return None;
    }
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }

    let weight: f64 = text.parse().ok()?;
    (weight.is_finite() && weight >= 0.0).then_some(weight)
}
