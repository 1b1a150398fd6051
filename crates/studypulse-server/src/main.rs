//! studypulse CLI: runs the API server and its admin tasks.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "studypulse", version, about = "PDF-to-quiz study service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate questions from a PDF without going through the API
    Ingest {
        /// PDF file to ingest
        #[arg(long)]
        file: PathBuf,

        /// Email of the admin recorded as the uploader
        #[arg(long)]
        admin_email: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create an account directly in the database
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        password: String,

        /// Give the account the admin role
        #[arg(long)]
        admin: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter studypulse.toml
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("studypulse=info,actix_web=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { host, port, config } => {
            commands::serve::execute(host, port, config).await
        }
        Commands::Ingest {
            file,
            admin_email,
            config,
        } => commands::ingest::execute(file, admin_email, config).await,
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config).await
        }
        Commands::CreateUser {
            email,
            name,
            password,
            admin,
            config,
        } => commands::create_user::execute(email, name, password, admin, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
