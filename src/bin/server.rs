//! mmpkv Server Binary
//!
//! Starts the TCP server with the built-in server commands registered.

use clap::Parser;
use mmpkv::dispatch::{register_invoker, registered_invokers, ServerInvoker};
use mmpkv::network::Server;
use mmpkv::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// mmpkv Server
#[derive(Parser, Debug)]
#[command(name = "mmpkv-server")]
#[command(about = "MMP protocol node of a distributed key-value store")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Socket read timeout in milliseconds (0 disables)
    #[arg(long, default_value = "1000")]
    read_timeout_ms: u64,

    /// Read buffer size in bytes
    #[arg(long, default_value = "8192")]
    read_buffer: usize,

    /// Diagnostic code reported in internal errors
    #[arg(long, default_value = "NCD0001")]
    error_code: String,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mmpkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("mmpkv Server v{}", mmpkv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .read_timeout_ms(args.read_timeout_ms)
        .read_buffer_size(args.read_buffer)
        .internal_error_code(&args.error_code)
        .build();

    register_invoker(ServerInvoker);
    let invokers = registered_invokers();
    tracing::info!("Registered invokers: {:?}", invokers);

    let server = Server::new(config, invokers);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
