use anyhow::Context;
use clap::{Parser, Subcommand};
use terraform_provider_consulclient::{serve, Provider};
use tokio::io::{stdin, stdout, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "terraform-provider-consulclient",
    about = "Terraform provider for Consul catalog, KV, ACL, agent services and prepared queries",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        help = "Log level when RUST_LOG is unset (trace, debug, info, warn, error)"
    )]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Serve newline-delimited JSON requests on stdin/stdout (default)")]
    Serve,

    #[command(about = "Print the provider schema as JSON")]
    Schema,
}

fn default_directives(level: &str) -> String {
    let level = match level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };
    format!(
        "terraform_provider_consulclient={level},consulclient_core={level},consulclient_api={level},reqwest=warn"
    )
}

fn init_logging(level: &str) {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directives(level))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let provider = Provider::new();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "Serving provider on stdio");
            serve(provider, BufReader::new(stdin()), stdout())
                .await
                .context("Provider serving loop failed")?;
        }
        Commands::Schema => {
            let schema = serde_json::to_string_pretty(&provider.schema())
                .context("Failed to encode provider schema")?;
            println!("{schema}");
        }
    }
    Ok(())
}
