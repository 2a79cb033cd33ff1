use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use conduit::{
    config::RuntimeConfig,
    connector::{jms, loopback::LoopbackTransport},
    system::System,
    Error,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered natives and declared connectors
    List,
    /// Evaluate a single expression
    Eval {
        expression: String,
    },
}

async fn run(cli: &Cli) -> Result<(), Error> {
    let config = if cli.config.exists() {
        RuntimeConfig::from_file(&cli.config)?
    } else {
        RuntimeConfig::default()
    };
    info!("config loaded.");
    debug!("config: {:?}", config);

    // 外部ブローカー無しで動かすためのループバック
    let system = System::builder(config)
        .transport(Arc::new(LoopbackTransport::new(jms::FAMILY)))
        .build()?;

    match &cli.command {
        Command::List => {
            for descriptor in system.registry().descriptors() {
                println!("{}", descriptor.signature());
            }
            for connector in system.connectors().connectors() {
                println!("connector {} ({})", connector.name(), connector.family());
            }
        }
        Command::Eval { expression } => {
            let mut context = system.new_context();
            let value = system
                .evaluate_str(expression, "<cli>", &mut context)
                .await?;
            println!("{}", value);
        }
    }

    system.shutdown().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
