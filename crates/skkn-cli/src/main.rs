use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "skkn")]
#[command(about = "SKKN - step-by-step writing of sáng kiến kinh nghiệm reports", long_about = None)]
struct Cli {
    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a report from a user info file, resuming a saved session if asked
    Run(commands::run::RunArgs),
    /// Inspect or delete the saved session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Print the page allocation for a page limit
    Allocate {
        #[arg(long)]
        pages: u32,
        #[arg(long, default_value_t = 3)]
        solutions: u8,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show the saved step, save time and document length
    Status,
    /// Delete the saved session and its reference documents
    Clear,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await?,
        Commands::Session { action } => match action {
            SessionAction::Status => commands::session::status().await?,
            SessionAction::Clear => commands::session::clear().await?,
        },
        Commands::Allocate { pages, solutions } => commands::allocate::print(pages, solutions),
    }

    Ok(())
}
