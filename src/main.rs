//! hsm - Home Server Manager

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use home_server_manager::config::Config;
use home_server_manager::logging;

#[derive(Parser)]
#[command(name = "hsm")]
#[command(author, version, about = "Dashboard for a home server's Docker Compose services", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the config file
    #[arg(long, global = true, env = "HSM_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive dashboard (the default)
    Dashboard,

    #[command(flatten)]
    Oneshot(OneshotCommand),
}

/// Commands that run once and print to stdout.
#[derive(Subcommand)]
enum OneshotCommand {
    /// List the services defined in the compose file
    Services,

    /// Show container status
    Status {
        /// Service name (all services if not specified)
        service: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a lifecycle action and wait until it takes effect
    Action {
        /// up, down, start, stop, restart, pull, restart-all or down-all
        verb: String,
        /// Target service (omit for restart-all and down-all)
        service: Option<String>,
        /// Compose project key, overriding the config file
        #[arg(long)]
        compose_key: Option<String>,
        /// Return after the request without polling status
        #[arg(long)]
        no_wait: bool,
    },

    /// Write service-worker.js for the web dashboard
    ServiceWorker {
        /// Output directory
        #[arg(long, default_value = "public")]
        out: PathBuf,
    },

    /// Manage the offline asset cache
    Cache {
        /// Origin serving the web dashboard (defaults to the API URL)
        #[arg(long)]
        origin: Option<String>,
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Pre-populate the current cache version
    Install,
    /// Delete every other cache version
    Activate,
    /// Fetch a path through the cache, writing the body to stdout
    Fetch {
        path: String,
    },
    /// Show cache versions and their entries
    List,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let oneshot = match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => None,
        Commands::Oneshot(command) => Some(command),
    };
    // the dashboard logs to a file once the config names its directory
    if oneshot.is_some() {
        logging::init_stderr(cli.verbose);
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    let Some(command) = oneshot else {
        return commands::dashboard(&config, cli.verbose);
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    rt.block_on(async {
        match command {
            OneshotCommand::Services => commands::services(&config).await,
            OneshotCommand::Status { service, json } => commands::status(&config, service.as_deref(), json).await,
            OneshotCommand::Action {
                verb,
                service,
                compose_key,
                no_wait,
            } => commands::action(&config, &verb, service, compose_key, no_wait).await,
            OneshotCommand::ServiceWorker { out } => commands::service_worker(&config, &out),
            OneshotCommand::Cache { origin, command } => {
                let origin = origin.unwrap_or_else(|| config.api.base_url.clone());
                let cache = commands::offline_cache(&config, &origin)?;
                match command {
                    CacheCommand::Install => commands::cache_install(&cache).await,
                    CacheCommand::Activate => commands::cache_activate(&cache),
                    CacheCommand::Fetch { path } => commands::cache_fetch(&cache, &path).await,
                    CacheCommand::List => commands::cache_list(&cache),
                }
            }
        }
    })
}
