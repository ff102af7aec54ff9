//! mgraph Server - Unix socket server for GraphEngine
//!
//! Provides a MessagePack-based protocol for graph operations.
//! Multiple clients can connect and share the same graph.
//!
//! Usage:
//!   mgraph-server [--socket /tmp/mgraph.sock] [--type mixed|directed|undirected]
//!                 [--multi] [--no-self-loops]
//!
//! Logging is controlled by `MGRAPH_LOG` (default: info).

use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::{Arc, RwLock};
use std::thread;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use mgraph::protocol::{self, Request, Response};
use mgraph::{GraphEngine, GraphOptions, GraphStore, GraphType};

const DEFAULT_SOCKET: &str = "/tmp/mgraph.sock";

struct Config {
    socket_path: String,
    options: GraphOptions,
}

fn print_usage() {
    eprintln!("Usage: mgraph-server [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --socket <path>   Unix socket path (default: {})", DEFAULT_SOCKET);
    eprintln!("  --type <type>     mixed, directed or undirected (default: mixed)");
    eprintln!("  --multi           Allow parallel edges");
    eprintln!("  --no-self-loops   Reject self-loops");
}

fn parse_args(args: &[String]) -> anyhow::Result<Config> {
    let mut config = Config {
        socket_path: DEFAULT_SOCKET.to_string(),
        options: GraphOptions::default(),
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--socket" => {
                config.socket_path = iter.next().context("--socket expects a path")?.clone();
            }
            "--type" => {
                let value = iter.next().context("--type expects a value")?;
                config.options.graph_type = value.parse::<GraphType>()?;
            }
            "--multi" => config.options.multi = true,
            "--no-self-loops" => config.options.allow_self_loops = false,
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => bail!("unknown argument: {}", other),
        }
    }

    Ok(config)
}

fn handle_client(mut stream: UnixStream, engine: Arc<RwLock<GraphEngine>>, client_id: usize) {
    tracing::info!("Client {} connected", client_id);

    loop {
        // Read request
        let msg = match protocol::read_message(&mut stream) {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                tracing::info!("Client {} disconnected", client_id);
                break;
            }
            Err(e) => {
                tracing::warn!("Client {} read error: {}", client_id, e);
                break;
            }
        };

        let response = match protocol::decode_request(&msg) {
            Ok(request) => {
                let is_shutdown = matches!(request, Request::Shutdown);

                let response = match engine.write() {
                    Ok(mut guard) => protocol::handle_request(&mut guard, request),
                    Err(_) => Response::Error { error: "graph lock poisoned".to_string() },
                };

                if is_shutdown {
                    respond(&mut stream, client_id, &response);
                    tracing::info!("Shutdown requested by client {}", client_id);
                    std::process::exit(0);
                }
                response
            }
            Err(e) => Response::Error { error: format!("Invalid request: {}", e) },
        };

        if !respond(&mut stream, client_id, &response) {
            break;
        }
    }
}

/// Returns false once the client can no longer be written to
fn respond(stream: &mut UnixStream, client_id: usize, response: &Response) -> bool {
    let bytes = match protocol::encode_response(response) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Serialize error: {}", e);
            return true;
        }
    };

    if let Err(e) = protocol::write_message(stream, &bytes) {
        tracing::warn!("Client {} write error: {}", client_id, e);
        return false;
    }
    true
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MGRAPH_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    // Remove stale socket file
    let _ = std::fs::remove_file(&config.socket_path);

    let engine = Arc::new(RwLock::new(GraphEngine::with_options(config.options.clone())));

    let listener = UnixListener::bind(&config.socket_path)
        .with_context(|| format!("Failed to bind socket {}", config.socket_path))?;
    tracing::info!(
        "Listening on {} ({} graph, multi={}, self_loops={})",
        config.socket_path,
        config.options.graph_type,
        config.options.multi,
        config.options.allow_self_loops
    );

    // Set up signal handler for graceful shutdown
    let engine_for_signal = Arc::clone(&engine);
    let socket_path_for_signal = config.socket_path.clone();
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ])
    .context("Failed to register signal handlers")?;

    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            if let Ok(guard) = engine_for_signal.read() {
                tracing::info!(
                    "Received signal {}, dropping graph with {} nodes and {} edges",
                    sig,
                    guard.node_count(),
                    guard.edge_count()
                );
            }

            let _ = std::fs::remove_file(&socket_path_for_signal);
            tracing::info!("Exiting");
            std::process::exit(0);
        }
    });

    // Accept connections
    let mut client_id = 0;
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                client_id += 1;
                let engine_clone = Arc::clone(&engine);
                thread::spawn(move || {
                    handle_client(stream, engine_clone, client_id);
                });
            }
            Err(e) => {
                tracing::warn!("Accept error: {}", e);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("mgraph-server")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = parse_args(&args(&[])).unwrap();
        assert_eq!(config.socket_path, DEFAULT_SOCKET);
        assert_eq!(config.options, GraphOptions::default());
    }

    #[test]
    fn test_flags() {
        let config = parse_args(&args(&["--socket", "/tmp/x.sock", "--type", "directed", "--multi", "--no-self-loops"])).unwrap();
        assert_eq!(config.socket_path, "/tmp/x.sock");
        assert_eq!(config.options.graph_type, GraphType::Directed);
        assert!(config.options.multi);
        assert!(!config.options.allow_self_loops);
    }

    #[test]
    fn test_bad_flags() {
        assert!(parse_args(&args(&["--type", "weird"])).is_err());
        assert!(parse_args(&args(&["--socket"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}
