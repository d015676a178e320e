//! errbit-ctl: deliver an already-serialized notice from the command line.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use errbit_core::wire::connection_scheme;
use errbit_core::WriterConfig;
use errbit_writer::{Delivery, SocketWriter, Writer};

// ── Subcommand handlers ───────────────────────────────────────────────────────

fn cmd_send(config: &WriterConfig, file: Option<&str>) -> Result<()> {
    config.validate().context("refusing to send with invalid config")?;
    let payload = read_payload(file)?;

    tracing::info!(
        collector = %connection_scheme(config),
        port = config.port,
        payload_len = payload.len(),
        "sending notice"
    );

    match SocketWriter::new().write(&payload, config) {
        Delivery::Sent(sent) => {
            println!(
                "Sent {} bytes in {} packet(s) to {}:{}",
                sent.bytes,
                sent.packets,
                connection_scheme(config),
                config.port
            );
            Ok(())
        }
        Delivery::Abandoned => bail!(
            "delivery to {} abandoned (set RUST_LOG=warn for the cause)",
            config.target()
        ),
    }
}

fn cmd_config(config: &WriterConfig) -> Result<()> {
    println!("# {}", WriterConfig::file_path().display());
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_init() -> Result<()> {
    let path = WriterConfig::write_default_if_missing().context("failed to write default config")?;
    println!("Config at {}", path.display());
    Ok(())
}

fn read_payload(file: Option<&str>) -> Result<Vec<u8>> {
    match file {
        None | Some("-") => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read notice from stdin")?;
            Ok(buf)
        }
        Some(path) => std::fs::read(path).with_context(|| format!("failed to read notice: {path}")),
    }
}

fn print_usage() {
    println!("Usage: errbit-ctl [--config <path>] <command>");
    println!();
    println!("Commands:");
    println!("  send [FILE]   Deliver a serialized notice (FILE or stdin)");
    println!("  config        Print the effective config as TOML");
    println!("  init          Write a default config file if none exists");
    println!();
    println!("Options:");
    println!("  --config <path>   Config file (default: {})", WriterConfig::file_path().display());
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--config" {
            i += 1;
            config_path = Some(args.get(i).context("--config requires a value")?.into());
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    let load = || match &config_path {
        Some(path) => WriterConfig::load_at(path),
        None => WriterConfig::load(),
    };

    match remaining.as_slice() {
        ["send"]                       => cmd_send(&load()?, None),
        ["send", file]                 => cmd_send(&load()?, Some(*file)),
        ["config"]                     => cmd_config(&load()?),
        ["init"]                       => cmd_init(),
        ["help"] | ["--help"] | ["-h"] | [] => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
