//! Command-line configuration for the huffcoder tool.
//!
//! Every subcommand maps to one operation in [`crate::commands`]. Defaults
//! are chosen so that the common cases need only file paths, and the resolved
//! values can be echoed with `--print-config` so runs are reproducible.

use clap::{ArgGroup, Parser, Subcommand};
use huffcoder_core::code_text::DEFAULT_WRAP_WIDTH;
use huffcoder_core::network::TransportConfig;
use std::path::{Path, PathBuf};

/// Huffman-style prefix coder with a TCP peer mode
#[derive(Parser, Debug)]
#[command(name = "huffcoder", author, version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Print the resolved configuration before running
    #[arg(long, global = true)]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Count the symbols of a text file into a frequency table
    Table {
        /// Plaintext to count
        input: PathBuf,

        /// Where to write the table (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Encode a text file with the tree built from a table
    Encode {
        /// Frequency table (two- or three-column)
        #[arg(short, long)]
        table: PathBuf,

        /// Plaintext to encode
        input: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Wrap the code at this many columns (0 = one line)
        #[arg(short, long, default_value_t = 0)]
        wrap: usize,

        /// Print size statistics after the code
        #[arg(long)]
        stats: bool,
    },

    /// Decode a code file with the tree built from a table
    Decode {
        #[arg(short, long)]
        table: PathBuf,

        /// Code text ('0', '1', line breaks)
        input: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Re-wrap a code file into fixed-width lines
    Wrap {
        input: PathBuf,

        #[arg(short, long, default_value_t = DEFAULT_WRAP_WIDTH)]
        width: usize,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check that a file contains only code characters
    Check { input: PathBuf },

    /// Print tree statistics and the code of every symbol
    Inspect {
        #[arg(short, long)]
        table: PathBuf,
    },

    /// Write the three-column table (symbol, weight, code)
    Export {
        #[arg(short, long)]
        table: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render the tree as Graphviz DOT text
    Dot {
        #[arg(short, long)]
        table: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Generate sample text whose symbol mix follows the table weights
    Sample {
        #[arg(short, long)]
        table: PathBuf,

        /// Random seed (same seed, same text)
        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        /// Number of symbols to generate
        #[arg(short, long, default_value_t = 1000)]
        length: usize,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Listen for a peer; apply tree updates and print received ciphertext
    Serve(ServeArgs),

    /// Connect to a peer and send a tree and/or a ciphertext
    Send(SendArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 9000)]
    pub port: u16,

    /// Initial tree (default: none until a peer sends one)
    #[arg(short, long)]
    pub table: Option<PathBuf>,

    /// Append each received ciphertext to this file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Also print the decoded text of each ciphertext
    #[arg(long)]
    pub decode: bool,

    /// Stop after this many peers have disconnected (default: run forever)
    #[arg(long)]
    pub max_peers: Option<u64>,

    #[command(flatten)]
    pub transport: TransportArgs,
}

#[derive(clap::Args, Debug, Clone)]
#[command(group(ArgGroup::new("payload").required(true).multiple(true).args(["table", "code", "text"])))]
pub struct SendArgs {
    /// Peer address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    pub connect: String,

    /// Send this table as a tree update
    #[arg(short, long)]
    pub table: Option<PathBuf>,

    /// Send the contents of this code file as ciphertext
    #[arg(long)]
    pub code: Option<PathBuf>,

    /// Encode this plaintext with the table and send the result
    #[arg(long, requires = "table", conflicts_with = "code")]
    pub text: Option<PathBuf>,

    /// Pause between frames; frames carry no length, so back-to-back writes
    /// could reach the peer as a single read
    #[arg(long, default_value_t = 100)]
    pub gap_ms: u64,

    #[command(flatten)]
    pub transport: TransportArgs,
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct TransportArgs {
    /// Largest frame read in one go
    #[arg(long, default_value_t = TransportConfig::default().max_message_bytes)]
    pub max_message_bytes: usize,

    /// Capacity of the event channel between network tasks and the session
    #[arg(long, default_value_t = TransportConfig::default().event_capacity)]
    pub event_capacity: usize,
}

impl TransportArgs {
    pub fn to_config(self) -> TransportConfig {
        TransportConfig {
            max_message_bytes: self.max_message_bytes,
            event_capacity: self.event_capacity,
        }
    }
}

fn show(path: &Option<PathBuf>, none: &str) -> String {
    path.as_deref().map_or_else(|| none.to_string(), |p: &Path| p.display().to_string())
}

impl Cli {
    /// Print the configuration in human-readable form (to stderr, so stdout
    /// stays clean for command output).
    pub fn print(&self) {
        eprintln!("=== Configuration ===");
        eprintln!("Log level: {}", self.log_level);
        match &self.command {
            Command::Table { input, out } => {
                eprintln!("Command: table");
                eprintln!("Input: {}", input.display());
                eprintln!("Output: {}", show(out, "(stdout)"));
            }
            Command::Encode {
                table,
                input,
                out,
                wrap,
                stats,
            } => {
                eprintln!("Command: encode");
                eprintln!("Table: {}", table.display());
                eprintln!("Input: {}", input.display());
                eprintln!("Output: {}", show(out, "(stdout)"));
                eprintln!("Wrap: {}", if *wrap == 0 { "off".to_string() } else { wrap.to_string() });
                eprintln!("Stats: {stats}");
            }
            Command::Decode { table, input, out } => {
                eprintln!("Command: decode");
                eprintln!("Table: {}", table.display());
                eprintln!("Input: {}", input.display());
                eprintln!("Output: {}", show(out, "(stdout)"));
            }
            Command::Wrap { input, width, out } => {
                eprintln!("Command: wrap");
                eprintln!("Input: {}", input.display());
                eprintln!("Width: {width}");
                eprintln!("Output: {}", show(out, "(stdout)"));
            }
            Command::Check { input } => {
                eprintln!("Command: check");
                eprintln!("Input: {}", input.display());
            }
            Command::Inspect { table } => {
                eprintln!("Command: inspect");
                eprintln!("Table: {}", table.display());
            }
            Command::Export { table, out } | Command::Dot { table, out } => {
                eprintln!("Command: {}", if matches!(self.command, Command::Dot { .. }) { "dot" } else { "export" });
                eprintln!("Table: {}", table.display());
                eprintln!("Output: {}", show(out, "(stdout)"));
            }
            Command::Sample {
                table,
                seed,
                length,
                out,
            } => {
                eprintln!("Command: sample");
                eprintln!("Table: {}", table.display());
                eprintln!("Seed: {seed}");
                eprintln!("Length: {length} symbols");
                eprintln!("Output: {}", show(out, "(stdout)"));
            }
            Command::Serve(args) => {
                eprintln!("Command: serve");
                eprintln!("Bind: {}:{}", args.host, args.port);
                eprintln!("Initial table: {}", show(&args.table, "(none)"));
                eprintln!("Save ciphertext to: {}", show(&args.save, "(not saved)"));
                eprintln!("Decode on receipt: {}", args.decode);
                eprintln!(
                    "Max peers: {}",
                    args.max_peers.map_or_else(|| "unlimited".to_string(), |n| n.to_string())
                );
                print_transport(&args.transport);
            }
            Command::Send(args) => {
                eprintln!("Command: send");
                eprintln!("Peer: {}", args.connect);
                eprintln!("Table: {}", show(&args.table, "(none)"));
                eprintln!("Code file: {}", show(&args.code, "(none)"));
                eprintln!("Text file: {}", show(&args.text, "(none)"));
                eprintln!("Gap between frames: {} ms", args.gap_ms);
                print_transport(&args.transport);
            }
        }
        eprintln!();
    }
}

fn print_transport(transport: &TransportArgs) {
    eprintln!();
    eprintln!("=== Transport ===");
    eprintln!(
        "Max message: {} bytes ({} KiB)",
        transport.max_message_bytes,
        transport.max_message_bytes / 1024
    );
    eprintln!("Event capacity: {}", transport.event_capacity);
}
