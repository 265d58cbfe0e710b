//! CLI entry point for postpress

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "postpress")]
#[command(version)]
#[command(about = "A small static site generator for Markdown blogs", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new post
    New {
        /// Title of the new post
        title: String,

        /// File name for the post (defaults to the slugified title)
        #[arg(short, long)]
        slug: Option<String>,
    },

    /// Generate static files
    #[command(alias = "b")]
    Build,

    /// Start a local server that renders pages on request
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (defaults to server.port in site.yml)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to server.ip in site.yml)
        #[arg(short, long)]
        ip: Option<String>,

        /// Disable file watching and live reload
        #[arg(long)]
        r#static: bool,
    },

    /// Remove the output directory
    Clean,

    /// List site information
    List {
        /// Type of content to list (post, page, route)
        #[arg(default_value = "post")]
        r#type: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "postpress=debug,info"
    } else {
        "postpress=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::New { title, slug } => {
            let site = postpress::Site::new(&base_dir)?;
            tracing::info!("Creating new post with title: {}", title);
            site.new_post(&title, slug.as_deref())?;
        }

        Commands::Build => {
            let site = postpress::Site::new(&base_dir)?;
            tracing::info!("Generating static files...");
            site.build()?;
            println!("Generated successfully!");
        }

        Commands::Serve { port, ip, r#static } => {
            let site = postpress::Site::new(&base_dir)?;
            let ip = ip.unwrap_or_else(|| site.config.server.ip.clone());
            let port = port.unwrap_or(site.config.server.port);

            tracing::info!("Starting server at http://{}:{}", ip, port);
            postpress::server::start(&site, &ip, port, !r#static).await?;
        }

        Commands::Clean => {
            let site = postpress::Site::new(&base_dir)?;
            tracing::info!("Cleaning output folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type, json } => {
            let site = postpress::Site::new(&base_dir)?;
            postpress::commands::list::run(&site, &r#type, json)?;
        }

        Commands::Version => {
            println!("postpress version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
