//! # huffcoder
//!
//! Command-line front end for the huffcoder prefix-code engine.
//!
//! ## Usage
//!
//! ```bash
//! # Build a table from a text and encode it
//! huffcoder table book.txt -o freq.txt
//! huffcoder encode -t freq.txt book.txt --wrap 50 -o book.code
//! huffcoder decode -t freq.txt book.code
//!
//! # Peer mode: one side listens, the other sends a tree then a ciphertext
//! huffcoder serve --port 9000 --decode
//! huffcoder send --connect 127.0.0.1:9000 -t freq.txt --text note.txt
//! ```

mod commands;
mod config;
mod input_gen;

use clap::Parser;
use config::{Cli, Command};
use std::process::ExitCode;
use tracing::{debug, error, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --log-level. Logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match cli.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::default().add_directive(level.into())
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!("huffcoder v{}", env!("CARGO_PKG_VERSION"));

    if cli.print_config {
        cli.print();
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> huffcoder_core::Result<()> {
    match command {
        Command::Table { input, out } => {
            commands::write_output(out.as_deref(), &commands::count_table(&input)?)?;
        }
        Command::Encode {
            table,
            input,
            out,
            wrap,
            stats,
        } => {
            let (code, coding) = commands::encode_file(&table, &input, wrap)?;
            commands::write_output(out.as_deref(), &code)?;
            if stats {
                if out.is_none() && !code.ends_with('\n') {
                    println!();
                }
                coding.print_summary();
            }
        }
        Command::Decode { table, input, out } => {
            commands::write_output(out.as_deref(), &commands::decode_file(&table, &input)?)?;
        }
        Command::Wrap { input, width, out } => {
            commands::write_output(out.as_deref(), &commands::wrap_file(&input, width)?)?;
        }
        Command::Check { input } => {
            let bits = commands::check_file(&input)?;
            println!("ok: {bits} bits");
        }
        Command::Inspect { table } => {
            commands::write_output(None, &commands::inspect(&table)?)?;
        }
        Command::Export { table, out } => {
            commands::write_output(out.as_deref(), &commands::export(&table)?)?;
        }
        Command::Dot { table, out } => {
            commands::write_output(out.as_deref(), &commands::dot(&table)?)?;
        }
        Command::Sample {
            table,
            seed,
            length,
            out,
        } => {
            commands::write_output(out.as_deref(), &commands::sample(&table, seed, length)?)?;
        }
        Command::Serve(args) => {
            let metrics = commands::serve(&args).await?;
            metrics.print_summary();
        }
        Command::Send(args) => {
            let sent = commands::send(&args).await?;
            eprintln!("Sent {sent} frame(s) to {}", args.connect);
        }
    }
    Ok(())
}
