//! mailbridge - backend proxy for a webmail client.
//!
//! A stateless proxy that forwards browser requests to Microsoft Graph, a
//! generative-text service, and a CRM, streaming incremental generation
//! output back to the client as it arrives.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailbridge::Config;

#[derive(Parser)]
#[command(name = "mailbridge")]
#[command(about = "Backend proxy bridging a webmail client to Graph, a text-generation service, and a CRM")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailbridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            tracing::info!(config = %config, "Loading configuration");
            let (mut config, key_sources) = Config::from_file_with_env(&config)?;

            for (slot, source) in &key_sources {
                tracing::info!(slot = %slot, source = %source, "Resolved credential");
            }

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            mailbridge::proxy::run_server(config).await
        }

        Commands::Check { config } => {
            tracing::info!(config = %config, "Checking configuration");
            let (config, _) = Config::from_file_with_env(&config)?;
            tracing::info!(
                listen = %config.server.listen,
                graph = %config.graph.base_url,
                genai_model = %config.genai.model,
                crm = config.crm.is_some(),
                webhooks = config.webhooks.is_some(),
                "Configuration is valid"
            );
            Ok(())
        }
    }
}
