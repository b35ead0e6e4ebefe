// udp-client - Scripted UDP echo client binary
use clap::Parser;
use netecho::cli::{ConsoleReporter, OutputFormat};
use netecho::core::udp::client::DEFAULT_SCRIPT;
use netecho::infrastructure::config::ConfigManager;
use netecho::infrastructure::logging::init_logging;
use netecho::{EchoResult, Endpoint, UdpEchoClient};
use std::path::PathBuf;
use std::sync::Arc;

/// UDP echo client: sends a fixed datagram script and prints each
/// echoed reply
#[derive(Parser, Debug)]
#[command(name = "udp-client", version, about = "UDP echo client")]
struct Args {
    /// Server IPv4 address (dotted quad)
    host: String,

    /// Server port (1-65535)
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
    let endpoint = Endpoint::parse(&args.host, &args.port)?;

    if !args.quiet {
        let _ = init_logging(args.verbose);
    }

    let manager = ConfigManager::new();
    let config = match &args.config {
        Some(path) => manager.load_from_path(path)?,
        None => manager.load()?,
    };

    let sink = Arc::new(ConsoleReporter::new(args.output));
    let client = UdpEchoClient::new(endpoint, config.udp, sink).await?;
    client.run_script(DEFAULT_SCRIPT).await?;
    Ok(())
}
