//! huffcoder-core: prefix-code trees over weighted alphabets
//!
//! This library provides the core of a Huffman-style coding engine:
//! - Builds a binary prefix-code tree from a weighted alphabet using a fixed,
//!   order-sensitive merge rule
//! - Encodes text to '0'/'1' strings and decodes them back
//! - Reads and writes frequency tables as tab-separated text
//! - Frames tree updates and ciphertexts for a TCP peer link
//!
//! # Architecture
//!
//! - `alphabet`: Ordered symbol -> weight mapping
//! - `tree`: Arena tree, merge rule, encode/decode
//! - `code_text`: Code alphabet validator and line wrapping
//! - `table`: Frequency table text format
//! - `render`: Node/edge export and DOT text
//! - `framing`: One-byte tagged messages
//! - `state`: Current-tree slot and the session that owns it
//! - `network`: Tokio TCP listener/dialer
//! - `metrics`: Session counters and coding statistics
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Immutable trees**: A rebuild swaps a whole new tree in; nothing is patched
//! - **Single owner**: Network tasks send events; one session applies them
//! - **Deterministic**: Same alphabet, same order, same codes

pub mod alphabet;
pub mod code_text;
pub mod error;
pub mod framing;
pub mod metrics;
pub mod network;
pub mod render;
pub mod state;
pub mod table;
pub mod tree;

// Re-export commonly used types
pub use alphabet::WeightedAlphabet;
pub use error::{Error, Result};
pub use framing::Message;
pub use state::{Session, TreeHandle};
pub use tree::CodeTree;
