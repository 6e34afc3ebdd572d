//! echopool - A Bounded Worker-Pool TCP Echo Server
//!
//! This is the main entry point for the echopool server. It parses the
//! command line, starts the server, and wires termination signals to the
//! server's stop surface with an escalation policy: the first three
//! requests stop the listener politely, a fourth forces an immediate
//! stop.

use echopool::{Server, ServerConfig};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::thread;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Polite stop attempts before a termination signal escalates to an
/// immediate stop.
const POLITE_STOPS_BEFORE_FORCE: u32 = 3;

/// Parse configuration from command-line arguments
fn config_from_args() -> ServerConfig {
    let mut config = ServerConfig::default();
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-h" => {
                if i + 1 < args.len() {
                    config.host = args[i + 1].clone();
                    i += 2;
                } else {
                    eprintln!("Error: --host requires a value");
                    std::process::exit(1);
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    config.port = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --port requires a value");
                    std::process::exit(1);
                }
            }
            "--backlog" | "-b" => {
                if i + 1 < args.len() {
                    config.backlog = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid backlog");
                        std::process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --backlog requires a value");
                    std::process::exit(1);
                }
            }
            "--workers" | "-w" => {
                if i + 1 < args.len() {
                    config.workers = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid worker count");
                        std::process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --workers requires a value");
                    std::process::exit(1);
                }
            }
            "--buffer-size" => {
                if i + 1 < args.len() {
                    config.buffer_size = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid buffer size");
                        std::process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --buffer-size requires a value");
                    std::process::exit(1);
                }
            }
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("echopool version {}", echopool::VERSION);
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    config
}

fn print_help() {
    println!(
        r#"
echopool - A Bounded Worker-Pool TCP Echo Server

USAGE:
    echopool [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>          Port to listen on (default: 7777)
    -b, --backlog <N>          Listen backlog (default: 1000)
    -w, --workers <N>          Worker threads (default: 4)
        --buffer-size <BYTES>  Per-connection buffer size (default: 1024)
    -v, --version              Print version information
        --help                 Print this help message

EXAMPLES:
    echopool                          # Start on 127.0.0.1:7777
    echopool --port 9000              # Start on port 9000
    echopool --workers 8              # Serve 8 connections concurrently

STOPPING:
    Send SIGINT or SIGTERM to close the listener and let connections
    finish. A fourth signal forces an immediate stop.
"#
    );
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
echopool v{} - Bounded Worker-Pool TCP Echo Server
──────────────────────────────────────────────────
Listening on {} with {} workers (backlog {})
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        echopool::VERSION,
        config.bind_address(),
        config.workers,
        config.backlog,
    );
}

fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = config_from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // The server is owned here; the signal thread only gets a handle.
    // The banner only prints once the socket is actually listening.
    let server = Server::new(config.clone())?;
    print_banner(&config);

    let handle = server.handle();

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        let mut polite_asks = 0;
        for signal in signals.forever() {
            if polite_asks < POLITE_STOPS_BEFORE_FORCE {
                polite_asks += 1;
                info!(signal, attempt = polite_asks, "termination requested, closing the listener");
                handle.stop_politely();
            } else {
                warn!(signal, "termination requested again, stopping immediately");
                handle.stop_immediately();
                std::process::exit(0);
            }
        }
    });

    // Main accept loop
    server.start();

    info!("accept loop ended, draining remaining connections");
    drop(server);
    info!("server shutdown complete");
    Ok(())
}
