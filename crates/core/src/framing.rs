//! Tagged transport messages.
//!
//! Each message is written to the byte stream in a single write:
//!
//! ```text
//! +-----------+---------------------------------------------+
//! | tag (1)   | payload (rest of the write)                 |
//! +-----------+---------------------------------------------+
//!   't'         frequency table text (two-column form)
//!   'c'         code text over {'0', '1', line break}
//! ```
//!
//! There is no length prefix. The receiver treats one read as one message;
//! the framer relies on the channel for that and does not enforce it.
//!
//! Decoding validates the payload fully: a `'t'` payload must parse as a
//! table and a `'c'` payload must pass the code alphabet check. Unknown tags
//! and empty payloads are "unrecognized message" errors.

use crate::alphabet::WeightedAlphabet;
use crate::code_text::first_invalid;
use crate::error::{CodecError, FramingError, Result};
use crate::table;
use crate::tree::CodeTree;

/// Tag for a tree update carrying a frequency table
pub const TAG_TREE: u8 = b't';

/// Tag for a ciphertext carrying code text
pub const TAG_CIPHERTEXT: u8 = b'c';

/// A decoded transport message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Replace the receiver's tree with one built from this alphabet
    TreeUpdate(WeightedAlphabet),

    /// Code text for the consumer to display or store (not decoded here)
    Ciphertext(String),
}

impl Message {
    /// Tree update carrying the alphabet a tree was built from.
    pub fn tree_update(tree: &CodeTree) -> Self {
        Message::TreeUpdate(tree.alphabet().clone())
    }

    /// Ciphertext message, checked against the code alphabet.
    ///
    /// # Errors
    /// - `FramingError::EmptyPayload` for an empty code, whose frame would be
    ///   rejected on receipt
    /// - `CodecError::InvalidCodeSymbol` for the first character outside
    ///   {'0', '1', line break}
    pub fn ciphertext(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(FramingError::EmptyPayload { tag: char::from(TAG_CIPHERTEXT) }.into());
        }
        if let Some((position, symbol)) = first_invalid(&code) {
            return Err(CodecError::InvalidCodeSymbol { symbol, position }.into());
        }
        Ok(Message::Ciphertext(code))
    }

    pub fn tag(&self) -> u8 {
        match self {
            Message::TreeUpdate(_) => TAG_TREE,
            Message::Ciphertext(_) => TAG_CIPHERTEXT,
        }
    }
}

/// Serialize a message into one frame: tag byte then payload.
pub fn encode_message(message: &Message) -> Vec<u8> {
    let payload = match message {
        Message::TreeUpdate(alphabet) => table::serialize(alphabet),
        Message::Ciphertext(code) => code.clone(),
    };

    let mut frame = Vec::with_capacity(1 + payload.len());
    frame.push(message.tag());
    frame.extend_from_slice(payload.as_bytes());
    frame
}

/// Parse one frame.
///
/// # Errors
/// - `FramingError::EmptyFrame` / `UnknownTag` / `EmptyPayload` / `NotText`
///   for unrecognized messages
/// - `TableError::*` if a `'t'` payload is not a valid table
/// - `CodecError::InvalidCodeSymbol` if a `'c'` payload has bad characters
pub fn decode_message(frame: &[u8]) -> Result<Message> {
    let (&tag, payload) = frame.split_first().ok_or(FramingError::EmptyFrame)?;

    if tag != TAG_TREE && tag != TAG_CIPHERTEXT {
        return Err(FramingError::UnknownTag { tag }.into());
    }
    let tag_char = char::from(tag);
    if payload.is_empty() {
        return Err(FramingError::EmptyPayload { tag: tag_char }.into());
    }
    let text = std::str::from_utf8(payload).map_err(|_| FramingError::NotText { tag: tag_char })?;

    match tag {
        TAG_TREE => Ok(Message::TreeUpdate(table::parse(text)?)),
        _ => Message::ciphertext(text),
    }
}
