//! Counters for a receiving session and for coding runs.
//!
//! - [`Metrics`]: what a peer session saw (messages, tree swaps, rejects,
//!   connections)
//! - [`CodingStats`]: how large a code came out relative to its plaintext
//!
//! # Thread Safety
//!
//! `Metrics` is plain data updated by the single task that owns the session.
//! Other tasks read a copy through the session's snapshot.

use crate::tree::CodeTree;
use std::time::{Duration, Instant};

/// Session counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// When the session started
    pub start_time: Instant,

    // === Connections ===
    /// Connections accepted by a listener
    pub connections_opened: u64,

    /// Connections closed or reset by the peer
    pub connections_closed: u64,

    // === Messages ===
    /// Frames received from any peer
    pub messages_received: u64,

    /// Tree updates that replaced the current tree
    pub trees_applied: u64,

    /// Tree updates rejected (malformed table), current tree kept
    pub trees_rejected: u64,

    /// Ciphertexts delivered to the consumer
    pub ciphertexts_received: u64,

    /// Ciphertexts rejected (characters outside the code alphabet)
    pub ciphertexts_rejected: u64,

    /// Unknown tags and empty payloads
    pub messages_unrecognized: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            connections_opened: 0,
            connections_closed: 0,
            messages_received: 0,
            trees_applied: 0,
            trees_rejected: 0,
            ciphertexts_received: 0,
            ciphertexts_rejected: 0,
            messages_unrecognized: 0,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fraction of received frames that were rejected for any reason.
    pub fn reject_rate(&self) -> f64 {
        if self.messages_received == 0 {
            0.0
        } else {
            let rejected = self.trees_rejected + self.ciphertexts_rejected + self.messages_unrecognized;
            rejected as f64 / self.messages_received as f64
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Session Summary ===");
        println!("Uptime: {} ms", self.uptime().as_millis());
        println!();
        println!("=== Connections ===");
        println!("Opened: {}", self.connections_opened);
        println!("Closed: {}", self.connections_closed);
        println!();
        println!("=== Messages ===");
        println!("Received: {}", self.messages_received);
        println!("Trees applied: {}", self.trees_applied);
        println!("Trees rejected: {}", self.trees_rejected);
        println!("Ciphertexts received: {}", self.ciphertexts_received);
        println!("Ciphertexts rejected: {}", self.ciphertexts_rejected);
        println!("Unrecognized: {}", self.messages_unrecognized);
        println!("Reject rate: {:.2}%", self.reject_rate() * 100.0);
        println!();
    }

    /// Export metrics as `key=value` lines (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "uptime_ms={}\n\
             connections_opened={}\n\
             connections_closed={}\n\
             messages_received={}\n\
             trees_applied={}\n\
             trees_rejected={}\n\
             ciphertexts_received={}\n\
             ciphertexts_rejected={}\n\
             messages_unrecognized={}\n\
             reject_rate={:.4}\n",
            self.uptime().as_millis(),
            self.connections_opened,
            self.connections_closed,
            self.messages_received,
            self.trees_applied,
            self.trees_rejected,
            self.ciphertexts_received,
            self.ciphertexts_rejected,
            self.messages_unrecognized,
            self.reject_rate(),
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Size statistics for one encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodingStats {
    /// Plaintext symbols encoded
    pub symbols: u64,

    /// Bits in the resulting code (line breaks excluded)
    pub bits: u64,

    /// Weighted mean code length of the tree used
    pub average_code_length: f64,
}

impl CodingStats {
    /// Stats for `text` encoded as `code` with `tree`.
    pub fn measure(tree: &CodeTree, text: &str, code: &str) -> Self {
        Self {
            symbols: text.chars().count() as u64,
            bits: code.chars().filter(|&c| c == '0' || c == '1').count() as u64,
            average_code_length: tree.average_code_length(),
        }
    }

    /// Bits per plaintext symbol actually emitted.
    pub fn bits_per_symbol(&self) -> f64 {
        if self.symbols == 0 {
            0.0
        } else {
            self.bits as f64 / self.symbols as f64
        }
    }

    /// Code size relative to 8 bits per symbol.
    pub fn compression_ratio(&self) -> f64 {
        if self.symbols == 0 {
            0.0
        } else {
            self.bits as f64 / (self.symbols as f64 * 8.0)
        }
    }

    pub fn print_summary(&self) {
        println!("=== Coding ===");
        println!("Symbols: {}", self.symbols);
        println!("Bits: {}", self.bits);
        println!("Bits/symbol: {:.3}", self.bits_per_symbol());
        println!("Avg code length (weighted): {:.3}", self.average_code_length);
        println!("Ratio vs 8-bit: {:.1}%", self.compression_ratio() * 100.0);
    }
}
