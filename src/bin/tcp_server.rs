// tcp-server - TCP echo server binary
use clap::Parser;
use netecho::cli::{ConsoleReporter, OutputFormat};
use netecho::domain::endpoint::parse_port;
use netecho::infrastructure::config::ConfigManager;
use netecho::infrastructure::logging::init_logging;
use netecho::{EchoError, EchoResult, TcpEchoServer};
use std::path::PathBuf;
use std::sync::Arc;

/// TCP echo server: accepts connections and echoes every byte back
#[derive(Parser, Debug)]
#[command(name = "tcp-server", version, about = "TCP echo server")]
struct Args {
    /// Port to listen on (1-65535)
    port: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress logging
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> EchoResult<()> {
    // Usage errors must exit before any socket is touched.
    let port = parse_port(&args.port)?;

    if !args.quiet {
        let _ = init_logging(args.verbose);
    }

    let manager = ConfigManager::new();
    let config = match &args.config {
        Some(path) => manager.load_from_path(path)?,
        None => manager.load()?,
    };

    let sink = Arc::new(ConsoleReporter::new(args.output));
    let mut server = TcpEchoServer::new(port, config.tcp, sink).await?;
    server.start().await?;

    tokio::signal::ctrl_c().await.map_err(EchoError::Network)?;
    server.stop().await?;
    Ok(())
}
