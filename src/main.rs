//! CLI entry point for yourblog

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yourblog::commands::list::ListKind;
use yourblog::Blog;

#[derive(Parser)]
#[command(name = "yourblog")]
#[command(version)]
#[command(about = "A static blog generator for Markdown and MDX posts", long_about = None)]
struct Cli {
    /// Set the site root (defaults to current directory)
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
    /// Generate the static site
    #[command(alias = "g")]
    Build {
        /// Include drafts regardless of mode
        #[arg(long)]
        drafts: bool,

        /// Watch for file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Start a local server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Enable static mode (no file watching)
        #[arg(long)]
        r#static: bool,
    },

    /// List posts, tags, categories or slugs
    List {
        #[arg(value_enum, default_value = "post")]
        kind: ListKind,

        /// Include drafts regardless of mode
        #[arg(long)]
        drafts: bool,
    },

    /// Show a single post's metadata and body
    Show {
        /// Post slug, optionally percent-encoded
        slug: String,
    },

    /// Print content directory diagnostics
    Diag,

    /// Create a new post
    New {
        /// Title of the new post
        title: String,

        /// Category key
        #[arg(short = 'C', long)]
        category: Option<String>,

        /// Mark the post as a draft
        #[arg(long)]
        draft: bool,
    },

    /// Clean the output folder and cache
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "yourblog=debug,info"
    } else {
        "yourblog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Build { drafts, watch } => {
            let blog = Blog::new(&base_dir)?;
            let include_drafts = drafts.then_some(true);
            tracing::info!("Generating static files...");

            yourblog::commands::build::run(&blog, include_drafts)?;
            println!("Generated successfully!");

            if watch {
                tracing::info!("Watching for file changes...");
                yourblog::commands::build::watch(&blog, include_drafts).await?;
            }
        }

        Commands::Serve {
            port,
            ip,
            open,
            r#static,
        } => {
            let blog = Blog::new(&base_dir)?;

            tracing::info!("Generating static files...");
            blog.generate()?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            yourblog::server::start(&blog, &ip, port, !r#static, open).await?;
        }

        Commands::List { kind, drafts } => {
            let blog = Blog::new(&base_dir)?;
            yourblog::commands::list::run(&blog, kind, drafts.then_some(true))?;
        }

        Commands::Show { slug } => {
            let blog = Blog::new(&base_dir)?;
            yourblog::commands::show::run(&blog, &slug)?;
        }

        Commands::Diag => {
            let blog = Blog::new(&base_dir)?;
            yourblog::commands::diag::run(&blog)?;
        }

        Commands::New {
            title,
            category,
            draft,
        } => {
            let blog = Blog::new(&base_dir)?;
            tracing::info!("Creating new post with title: {}", title);
            let path = yourblog::commands::new::create_post(&blog, &title, category.as_deref(), draft)?;
            println!("Created: {:?}", path);
        }

        Commands::Clean => {
            let blog = Blog::new(&base_dir)?;
            tracing::info!("Cleaning output folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("yourblog version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
