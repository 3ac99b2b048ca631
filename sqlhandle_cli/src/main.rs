#![forbid(unsafe_code)]

mod runner;

use anyhow::Result;
use clap::Parser;
use sqlhandle::settings::Settings;
use sqlhandle::{ConnectionConfig, ConnectionHandle};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Parser)]
#[command(
    name = "sqlhandle",
    version,
    about = "Connect to a database, run SQL statements and disconnect"
)]
pub(crate) struct Args {
    /// Configuration file with connection settings
    #[arg(long, env = "SQLHANDLE_CONFIG")]
    config: Option<PathBuf>,

    /// Database server host
    #[arg(long)]
    host: Option<String>,

    /// Database server port
    #[arg(long)]
    port: Option<u16>,

    /// User to authenticate as
    #[arg(short, long)]
    username: Option<String>,

    /// Password to authenticate with
    #[arg(long, env = "SQLHANDLE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Database to use
    #[arg(short, long)]
    database: Option<String>,

    /// Do not re-open a lost connection before the next statement
    #[arg(long)]
    no_auto_reconnect: bool,

    /// Reconnect once before running the statements
    #[arg(long)]
    reconnect: bool,

    /// SQL statements to run in order; rows of queries are printed
    #[arg(required = true)]
    statements: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    execute(None, &mut io::stdout()).await
}

pub(crate) async fn execute(args: Option<Args>, output: &mut dyn io::Write) -> Result<()> {
    let args = match args {
        Some(args) => args,
        None => {
            let _ = dotenvy::dotenv();
            Args::parse()
        }
    };

    let mut loader = Settings::loader();
    if let Some(config_file) = &args.config {
        loader = loader.with_config_file(config_file);
    }
    let settings = loader.load()?;
    init_logging(&settings.log.level);

    let program_name = "sqlhandle";
    let version = env!("CARGO_PKG_VERSION");
    info!("{program_name}/{version} initialized");

    let config = connection_config(&settings, &args);
    let mut handle = ConnectionHandle::new(config)?;
    let result = runner::run(&mut handle, &args.statements, args.reconnect, output).await;

    info!("{program_name}/{version} completed");
    result
}

/// Install the log subscriber; `RUST_LOG` takes precedence over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Connection settings with the command line arguments applied on top.
fn connection_config(settings: &Settings, args: &Args) -> ConnectionConfig {
    let mut connection = settings.connection.clone();
    if let Some(host) = &args.host {
        connection.host.clone_from(host);
    }
    if let Some(port) = args.port {
        connection.port = port;
    }
    if let Some(username) = &args.username {
        connection.username.clone_from(username);
    }
    if let Some(password) = &args.password {
        connection.password.clone_from(password);
    }
    if let Some(database) = &args.database {
        connection.database.clone_from(database);
    }
    if args.no_auto_reconnect {
        connection.auto_reconnect = false;
    }
    ConnectionConfig::from(&connection)
}
