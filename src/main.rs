//! LineKV - A Miniature In-Memory Key-Value Database
//!
//! This is the main entry point for the LineKV server.
//! It sets up the TCP listener and the shared databases, and spawns a task
//! for every incoming connection.

use anyhow::{bail, Context};
use linekv::commands::CommandHandler;
use linekv::connection::{handle_connection, ConnectionStats};
use linekv::storage::DatabaseRegistry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the default host
const HOST_ENV: &str = "LINEKV_HOST";

/// Environment variable overriding the default port
const PORT_ENV: &str = "LINEKV_PORT";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: linekv::DEFAULT_HOST.to_string(),
            port: linekv::DEFAULT_PORT,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Serve(Config),
    Help,
    Version,
}

impl Config {
    /// Builds the configuration from the process environment and arguments.
    fn from_env_and_args() -> anyhow::Result<Invocation> {
        Self::parse(
            std::env::var(HOST_ENV).ok(),
            std::env::var(PORT_ENV).ok(),
            std::env::args().skip(1),
        )
    }

    /// Applies environment values, then command-line flags on top.
    fn parse(
        env_host: Option<String>,
        env_port: Option<String>,
        args: impl IntoIterator<Item = String>,
    ) -> anyhow::Result<Invocation> {
        let mut config = Config::default();

        if let Some(host) = env_host {
            config.host = host;
        }
        if let Some(port) = env_port {
            config.port = parse_port(&port).with_context(|| format!("invalid {}", PORT_ENV))?;
        }

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => match args.next() {
                    Some(host) => config.host = host,
                    None => bail!("--host requires a value"),
                },
                "--port" | "-p" => match args.next() {
                    Some(port) => config.port = parse_port(&port)?,
                    None => bail!("--port requires a value"),
                },
                "--help" => return Ok(Invocation::Help),
                "--version" | "-v" => return Ok(Invocation::Version),
                other => bail!("unknown argument: {}", other),
            }
        }

        Ok(Invocation::Serve(config))
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(value: &str) -> anyhow::Result<u16> {
    value
        .parse()
        .with_context(|| format!("invalid port number: {}", value))
}

fn print_help() {
    println!(
        r#"
LineKV - A Miniature In-Memory Key-Value Database

USAGE:
    linekv [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: 127.0.0.1, env: LINEKV_HOST)
    -p, --port <PORT>    Port to listen on (default: 8080, env: LINEKV_PORT)
    -v, --version        Print version information
        --help           Print this help message

EXAMPLES:
    linekv                        # Start on 127.0.0.1:8080
    linekv --port 6380            # Start on port 6380
    LINEKV_HOST=0.0.0.0 linekv    # Listen on all interfaces

CONNECTING:
    Any line-oriented client works:
    $ nc 127.0.0.1 8080
    SET name "Ada Lovelace"
    OK
    GET name
    "Ada Lovelace"
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
LineKV v{} - Miniature In-Memory Key-Value Database
──────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        linekv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = match Config::from_env_and_args()? {
        Invocation::Serve(config) => config,
        Invocation::Help => {
            print_help();
            return Ok(());
        }
        Invocation::Version => {
            println!("LineKV version {}", linekv::VERSION);
            return Ok(());
        }
    };

    // Set up logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Print the banner
    print_banner(&config);

    // Create the databases (shared across all connections)
    let registry = Arc::new(DatabaseRegistry::new());
    info!("Database registry initialized");

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&registry), Arc::clone(&stats)) => {}
        _ = shutdown => {}
    }

    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        databases = registry.indexes().len(),
        "Server shutdown complete"
    );
    for (index, db) in registry.stats() {
        info!(
            db = index,
            keys = db.keys,
            reads = db.reads,
            writes = db.writes,
            "Database statistics"
        );
    }
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<DatabaseRegistry>,
    stats: Arc<ConnectionStats>,
) {
    let handler = CommandHandler::new(registry);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = handler.clone();
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let invocation = Config::parse(None, None, args(&[])).unwrap();
        assert_eq!(invocation, Invocation::Serve(Config::default()));
        assert_eq!(Config::default().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_flags() {
        let invocation = Config::parse(None, None, args(&["--host", "0.0.0.0", "-p", "6380"])).unwrap();
        assert_eq!(
            invocation,
            Invocation::Serve(Config {
                host: "0.0.0.0".into(),
                port: 6380,
            })
        );
    }

    #[test]
    fn test_env_then_flags() {
        let invocation = Config::parse(
            Some("10.0.0.1".into()),
            Some("9000".into()),
            args(&["--port", "9001"]),
        )
        .unwrap();
        assert_eq!(
            invocation,
            Invocation::Serve(Config {
                host: "10.0.0.1".into(),
                port: 9001,
            })
        );
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(Config::parse(None, None, args(&["--help"])).unwrap(), Invocation::Help);
        assert_eq!(Config::parse(None, None, args(&["-v"])).unwrap(), Invocation::Version);
    }

    #[test]
    fn test_invalid_input() {
        assert!(Config::parse(None, None, args(&["--port", "http"])).is_err());
        assert!(Config::parse(None, None, args(&["--port"])).is_err());
        assert!(Config::parse(None, None, args(&["--verbose"])).is_err());
        assert!(Config::parse(None, Some("99999".into()), args(&[])).is_err());
    }
}
