use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use php_devserver::address::{DEFAULT_HOST, DEFAULT_PORT};
use php_devserver::config::{Config, validate_config};
use php_devserver::server::daemon_capability;
use php_devserver::{Address, DevServer, Verbosity};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "php-devserver")]
#[command(about = "Runs PHP's built-in web server for local development", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory to serve (overrides documentRoot)
    #[arg(long, global = true)]
    document_root: Option<PathBuf>,

    /// Path to the PHP binary (overrides binary)
    #[arg(long, global = true)]
    binary: Option<PathBuf>,

    /// Warn that this is a production environment
    #[arg(long, global = true)]
    production: bool,

    /// Show the server's output and debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Discard the server's output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct AddressArgs {
    /// Address:port
    #[arg(default_value = DEFAULT_HOST)]
    address: String,

    /// Address port number
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,
}

impl AddressArgs {
    fn resolve(&self) -> Address {
        Address::resolve(&self.address, &self.port)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Runs PHP built-in web server
    #[command(name = "server:run")]
    Run(AddressArgs),

    /// Starts PHP built-in web server in the background
    #[command(name = "server:start")]
    Start {
        #[command(flatten)]
        address: AddressArgs,

        /// Force web server startup
        #[arg(short, long)]
        force: bool,
    },

    /// Stops PHP's built-in web server that was started with the server:start command
    #[command(name = "server:stop")]
    Stop(AddressArgs),

    /// Supervises a background server (used by server:start)
    #[command(name = "server:supervise", hide = true)]
    Supervise {
        address: String,

        #[arg(long)]
        config_json: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };

    let code = match &cli.command {
        Commands::Run(args) => {
            let server = DevServer::new(load_config(&cli)?).with_verbosity(verbosity);
            server.run(&args.resolve()).await
        }
        Commands::Start { address, force } => {
            let server = DevServer::new(load_config(&cli)?).with_verbosity(verbosity);
            let address = address.resolve();
            let code = server.start(&address, *force).await;

            if code != 0 && !daemon_capability().is_available() && confirm_run().await? {
                server.run(&address).await
            } else {
                code
            }
        }
        Commands::Stop(args) => {
            let server = DevServer::new(load_config(&cli)?);
            server.stop(&args.resolve())
        }
        Commands::Supervise {
            address,
            config_json,
        } => {
            let config = Config::parse_from_str(config_json)
                .context("Invalid configuration handed to the supervisor")?;
            let server = DevServer::new(config);
            server.supervise(&Address::resolve(address, DEFAULT_PORT)).await
        }
    };

    std::process::exit(code);
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(document_root) = &cli.document_root {
        config.document_root = document_root.clone();
    }
    if let Some(binary) = &cli.binary {
        config.binary = Some(binary.clone());
    }
    config.production_mode |= cli.production;

    validate_config(&config)?;
    Ok(config)
}

/// Asks whether to fall back to a foreground run. An empty answer means yes.
async fn confirm_run() -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b" Do you want to execute server:run immediately? [y]: ")
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    let read = BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    if read == 0 {
        // No terminal to answer from.
        return Ok(false);
    }

    let answer = answer.trim();
    Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y"))
}
