//! The current tree and the session that owns it.
//!
//! # Current Tree
//!
//! [`TreeHandle`] is a shared slot holding `Option<Arc<CodeTree>>`. Readers
//! clone the `Arc` and work on that snapshot, so a replacement never exposes
//! a half-built tree: a reader sees either the old tree or the new one.
//! Trees themselves are immutable; replacing means building a fresh tree and
//! swapping the pointer.
//!
//! # Session
//!
//! Network tasks never touch the slot. They push [`NetEvent`]s into a
//! channel, and the [`Session`] (the single owner) applies them one at a
//! time:
//!
//! ```text
//! accept task ──┐
//! recv task  ───┼──> mpsc<NetEvent> ──> Session ──> mpsc<Delivery> ──> consumer
//! recv task  ───┘                          │
//!                                          └──> TreeHandle (swap on 't')
//! ```

use crate::error::{Error, Result};
use crate::framing::{decode_message, Message};
use crate::metrics::Metrics;
use crate::network::{Link, NetEvent};
use crate::tree::CodeTree;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Shared slot for the current tree.
#[derive(Debug, Clone, Default)]
pub struct TreeHandle {
    inner: Arc<RwLock<Option<Arc<CodeTree>>>>,
}

impl TreeHandle {
    /// Empty slot (no tree).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(tree: CodeTree) -> Self {
        let handle = Self::new();
        handle.replace(tree);
        handle
    }

    /// Snapshot of the current tree.
    pub fn current(&self) -> Option<Arc<CodeTree>> {
        // The slot only ever holds a complete Arc, so a poisoned lock is still consistent
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Swap in a new tree, returning the previous one.
    pub fn replace(&self, tree: CodeTree) -> Option<Arc<CodeTree>> {
        let tree = Arc::new(tree);
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        slot.replace(tree)
    }

    /// Drop the current tree.
    pub fn clear(&self) -> Option<Arc<CodeTree>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_none()
    }
}

/// What a session produced from one event.
#[derive(Debug)]
pub enum Delivery {
    /// A peer connected; the link can be used to send to it
    Peer(Link),

    /// A peer disconnected or reset the connection
    Closed { peer: SocketAddr },

    /// A tree update was applied
    TreeReplaced {
        peer: SocketAddr,
        symbols: usize,
        fingerprint: u32,
    },

    /// Ciphertext for display or storage (not decoded)
    Ciphertext { peer: SocketAddr, code: String },

    /// A frame was rejected; the current tree is unchanged
    Rejected { peer: SocketAddr, reason: String },
}

/// Result of applying one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    TreeReplaced { symbols: usize, fingerprint: u32 },
    Ciphertext(String),
}

/// Single owner of the current tree for a peer endpoint.
#[derive(Debug)]
pub struct Session {
    tree: TreeHandle,
    metrics: Metrics,
}

impl Session {
    pub fn new(tree: TreeHandle) -> Self {
        Self {
            tree,
            metrics: Metrics::new(),
        }
    }

    /// Handle for readers of the current tree.
    pub fn tree(&self) -> TreeHandle {
        self.tree.clone()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Apply one received frame.
    ///
    /// A valid `'t'` frame builds a new tree and swaps it in. Any failure
    /// leaves the current tree as it was.
    pub fn apply_frame(&mut self, frame: &[u8]) -> Result<Applied> {
        self.metrics.messages_received += 1;

        let result = decode_message(frame).and_then(|message| match message {
            Message::TreeUpdate(alphabet) => {
                let tree = CodeTree::try_build(&alphabet)?;
                let applied = Applied::TreeReplaced {
                    symbols: tree.leaf_count(),
                    fingerprint: tree.fingerprint(),
                };
                self.tree.replace(tree);
                Ok(applied)
            }
            Message::Ciphertext(code) => Ok(Applied::Ciphertext(code)),
        });

        match &result {
            Ok(Applied::TreeReplaced { symbols, fingerprint }) => {
                self.metrics.trees_applied += 1;
                info!(symbols, fingerprint = %format!("{fingerprint:08x}"), "tree replaced");
            }
            Ok(Applied::Ciphertext(code)) => {
                self.metrics.ciphertexts_received += 1;
                info!(len = code.len(), "ciphertext received");
            }
            Err(e) => {
                match e {
                    Error::Table(_) | Error::Alphabet(_) => self.metrics.trees_rejected += 1,
                    Error::Codec(_) => self.metrics.ciphertexts_rejected += 1,
                    _ => self.metrics.messages_unrecognized += 1,
                }
                warn!(error = %e, "frame rejected");
            }
        }

        result
    }

    /// Apply one network event.
    pub fn on_event(&mut self, event: NetEvent) -> Delivery {
        match event {
            NetEvent::Accepted(link) => {
                self.metrics.connections_opened += 1;
                Delivery::Peer(link)
            }
            NetEvent::Disconnected { peer } => {
                self.metrics.connections_closed += 1;
                Delivery::Closed { peer }
            }
            NetEvent::Frame { peer, bytes } => match self.apply_frame(&bytes) {
                Ok(Applied::TreeReplaced { symbols, fingerprint }) => Delivery::TreeReplaced {
                    peer,
                    symbols,
                    fingerprint,
                },
                Ok(Applied::Ciphertext(code)) => Delivery::Ciphertext { peer, code },
                Err(e) => Delivery::Rejected {
                    peer,
                    reason: e.to_string(),
                },
            },
        }
    }

    /// Drain `events` serially until every sender is gone (or the consumer
    /// hangs up), then return the final counters.
    pub async fn run(mut self, mut events: mpsc::Receiver<NetEvent>, deliveries: mpsc::Sender<Delivery>) -> Metrics {
        while let Some(event) = events.recv().await {
            let delivery = self.on_event(event);
            if deliveries.send(delivery).await.is_err() {
                break;
            }
        }
        self.metrics
    }
}
