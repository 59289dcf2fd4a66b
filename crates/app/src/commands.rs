//! File-level commands.
//!
//! Each function reads its inputs from disk, runs one core operation and
//! returns the text the command prints. `main` decides where that text goes.
//! The two network commands (`serve`, `send`) run until their peer work is
//! done and return counters instead.

use crate::config::{SendArgs, ServeArgs};
use crate::input_gen::generate_sample_text;
use huffcoder_core::code_text::{first_invalid, wrap_code};
use huffcoder_core::error::{CodecError, Error, TableError};
use huffcoder_core::metrics::{CodingStats, Metrics};
use huffcoder_core::network::{connect, listen, Link, NetEvent};
use huffcoder_core::render::to_dot;
use huffcoder_core::state::{Delivery, Session, TreeHandle};
use huffcoder_core::{table, CodeTree, Message, Result, WeightedAlphabet};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write as _};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Read a whole file as text.
pub fn read_text(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Write command output to `out`, or stdout when `None`.
pub fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Load a frequency table in either the two-column or the export form.
pub fn load_alphabet(path: &Path) -> Result<WeightedAlphabet> {
    let text = read_text(path)?;
    match table::parse(&text) {
        Err(Error::Table(TableError::TrailingColumn { .. })) => table::parse_with_codes(&text),
        other => other,
    }
}

/// Load a table and build its tree.
///
/// # Errors
/// `TableError::Empty` when the table has no entries.
pub fn load_tree(path: &Path) -> Result<CodeTree> {
    CodeTree::try_build(&load_alphabet(path)?)
}

/// `table`: count the symbols of a text into a two-column table.
pub fn count_table(input: &Path) -> Result<String> {
    let text = read_text(input)?;
    Ok(table::serialize(&WeightedAlphabet::from_text(&text)))
}

/// `encode`: code for a plaintext file, optionally wrapped.
pub fn encode_file(table: &Path, input: &Path, wrap: usize) -> Result<(String, CodingStats)> {
    let tree = load_tree(table)?;
    let text = read_text(input)?;

    let code = tree.encode(&text)?;
    let stats = CodingStats::measure(&tree, &text, &code);
    let code = if wrap == 0 { code } else { wrap_code(&code, wrap) };
    Ok((code, stats))
}

/// `decode`: plaintext for a code file.
pub fn decode_file(table: &Path, input: &Path) -> Result<String> {
    let tree = load_tree(table)?;
    tree.decode(&read_text(input)?)
}

/// `wrap`: reformat a code file into lines of `width` characters.
pub fn wrap_file(input: &Path, width: usize) -> Result<String> {
    let code = read_text(input)?;
    check_code(&code)?;
    Ok(wrap_code(&code, width))
}

/// `check`: number of bits in a valid code file.
pub fn check_file(input: &Path) -> Result<usize> {
    let code = read_text(input)?;
    check_code(&code)?;
    Ok(code.chars().filter(|&c| c == '0' || c == '1').count())
}

fn check_code(code: &str) -> Result<()> {
    match first_invalid(code) {
        Some((position, symbol)) => Err(CodecError::InvalidCodeSymbol { symbol, position }.into()),
        None => Ok(()),
    }
}

/// `inspect`: tree statistics and the code table.
pub fn inspect(table: &Path) -> Result<String> {
    let tree = load_tree(table)?;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "Symbols: {}", tree.leaf_count());
    let _ = writeln!(out, "Nodes: {}", tree.node_count());
    let _ = writeln!(out, "Height: {}", tree.height());
    let _ = writeln!(out, "Total weight: {}", tree.alphabet().total_weight());
    let _ = writeln!(out, "Avg code length: {:.3}", tree.average_code_length());
    let _ = writeln!(out, "Fingerprint: {:08x}", tree.fingerprint());
    if tree.is_degenerate() {
        let _ = writeln!(out, "Single symbol: encodes to empty codes, cannot decode bits");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Codes ===");
    for ((symbol, weight), (_, code)) in tree.alphabet().iter().zip(tree.codes()) {
        let _ = writeln!(out, "{symbol:?}\t{weight}\t{code}");
    }
    Ok(out)
}

/// `export`: three-column table with codes.
pub fn export(table: &Path) -> Result<String> {
    Ok(table::serialize_with_codes(&load_tree(table)?))
}

/// `dot`: Graphviz text for the tree.
pub fn dot(table: &Path) -> Result<String> {
    Ok(to_dot(&load_tree(table)?))
}

/// `sample`: seeded text following the table's weights.
pub fn sample(table: &Path, seed: u64, length: usize) -> Result<String> {
    Ok(generate_sample_text(&load_alphabet(table)?, seed, length))
}

/// Append one ciphertext to `path`, one message per line.
fn append_ciphertext(path: &Path, code: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(code.as_bytes())?;
    if !code.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// `serve`: accept peers, apply tree updates, print ciphertext.
///
/// Runs until interrupted, or until `max_peers` peers have disconnected.
pub async fn serve(args: &ServeArgs) -> Result<Metrics> {
    let transport = args.transport.to_config();
    let handle = match &args.table {
        Some(path) => TreeHandle::with_tree(load_tree(path)?),
        None => TreeHandle::new(),
    };
    let tree = handle.clone();
    let mut session = Session::new(handle);

    let (events_tx, mut events) = transport.event_channel();
    let listener = listen((args.host.as_str(), args.port), transport, events_tx).await?;
    eprintln!("Listening on {}", listener.local_addr());

    let mut links: HashMap<SocketAddr, Link> = HashMap::new();
    let mut finished_peers = 0u64;

    loop {
        let event: NetEvent = tokio::select! {
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        };

        match session.on_event(event) {
            Delivery::Peer(link) => {
                links.insert(link.peer(), link);
            }
            Delivery::Closed { peer } => {
                links.remove(&peer);
                finished_peers += 1;
                if args.max_peers.is_some_and(|max| finished_peers >= max) {
                    info!(peers = finished_peers, "peer limit reached");
                    break;
                }
            }
            Delivery::TreeReplaced {
                peer,
                symbols,
                fingerprint,
            } => {
                println!("[{peer}] new tree: {symbols} symbols, fingerprint {fingerprint:08x}");
            }
            Delivery::Ciphertext { peer, code } => {
                println!("[{peer}] ciphertext:");
                println!("{code}");
                if let Some(path) = &args.save {
                    append_ciphertext(path, &code)?;
                }
                if args.decode {
                    match tree.current().map(|current| current.decode(&code)) {
                        Some(Ok(text)) => println!("[{peer}] decoded:\n{text}"),
                        Some(Err(e)) => warn!(%peer, error = %e, "cannot decode ciphertext"),
                        None => warn!(%peer, "no tree yet, cannot decode ciphertext"),
                    }
                }
            }
            Delivery::Rejected { peer, reason } => {
                eprintln!("[{peer}] rejected: {reason}");
            }
        }
    }

    for (_, mut link) in links.drain() {
        link.close().await;
    }
    listener.shutdown();
    Ok(session.metrics().clone())
}

/// `send`: dial a peer and send a tree update and/or a ciphertext.
///
/// Everything is validated before the connection is opened. Returns the
/// number of frames written.
pub async fn send(args: &SendArgs) -> Result<u64> {
    let transport = args.transport.to_config();
    let tree = args.table.as_deref().map(load_tree).transpose()?;

    let code = match (&args.code, &args.text) {
        (Some(path), _) => Some(read_text(path)?),
        (None, Some(path)) => {
            let tree = tree.as_ref().ok_or(TableError::Empty)?;
            Some(tree.encode(&read_text(path)?)?)
        }
        (None, None) => None,
    };

    let mut messages = Vec::new();
    if let Some(tree) = &tree {
        messages.push(Message::tree_update(tree));
    }
    if let Some(code) = code {
        messages.push(Message::ciphertext(code)?);
    }

    // Inbound frames are not expected; the receiver only keeps the link alive
    let (events_tx, _events) = transport.event_channel();
    let mut link = connect(args.connect.as_str(), transport, events_tx).await?;

    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(args.gap_ms)).await;
        }
        if !link.send(message).await {
            return Err(link_closed(link.peer(), link.frames_sent()));
        }
        info!(peer = %link.peer(), tag = %char::from(message.tag()), "frame sent");
    }

    // Let the last frame reach the peer as its own read before end-of-stream
    tokio::time::sleep(Duration::from_millis(args.gap_ms)).await;
    link.close().await;
    Ok(link.frames_sent())
}

/// A link that stopped accepting writes: the peer reset or went away.
fn link_closed(peer: SocketAddr, sent: u64) -> Error {
    std::io::Error::new(
        ErrorKind::BrokenPipe,
        format!("link to {peer} closed after {sent} frames"),
    )
    .into()
}
