//! mmpkv CLI Client
//!
//! Command-line interface for sending commands to an mmpkv node.

use clap::{Parser, Subcommand};
use mmpkv::network::Client;
use mmpkv::ProtocolObject;

/// mmpkv CLI
#[derive(Parser, Debug)]
#[command(name = "mmpkv-cli")]
#[command(about = "CLI for the mmpkv key-value node")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping {
        /// Optional message echoed back instead of PONG
        message: Option<String>,
    },

    /// Echo a message
    Echo {
        /// The message to echo
        message: String,
    },

    /// Ask the server for its clock
    Time,

    /// Send an arbitrary command with string arguments
    Raw {
        /// Command keyword
        keyword: String,

        /// String parameters
        args: Vec<String>,
    },
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let (keyword, params): (String, Vec<ProtocolObject>) = match args.command {
        Commands::Ping { message } => ("PING".into(), message.into_iter().map(Into::into).collect()),
        Commands::Echo { message } => ("ECHO".into(), vec![message.into()]),
        Commands::Time => ("TIME".into(), Vec::new()),
        Commands::Raw { keyword, args } => (keyword, args.into_iter().map(Into::into).collect()),
    };

    match client.request(&keyword, &params) {
        Ok(response) => {
            println!("{}", response);
            if response.is_error() {
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}
