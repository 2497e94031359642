//! dbprobe - run one statement against a remote query engine and print the rows.

use std::sync::Arc;

use db_probe::cli::Cli;
use db_probe::config::{Config, ConnectionConfig, ConnectionProfile};
use db_probe::connection::ResourceGuard;
use db_probe::db::{DriverRegistry, MockCatalog, MockDriver};
use db_probe::error::{ProbeError, Result};
use db_probe::logging;
use db_probe::output::RowWriter;
use db_probe::query::DEFAULT_FETCH_SIZE;
use tracing::{error, info};

/// Everything resolved before logging starts.
struct Invocation {
    connection: ConnectionConfig,
    sql: String,
    fetch_size: usize,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();

    let invocation = match resolve_invocation(&cli) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    };

    match invocation.connection.log_path() {
        Some(path) => logging::init_file_logging(path),
        None => logging::init_stderr_logging(),
    }

    let logs_to_file = invocation.connection.log_path().is_some();
    if let Err(e) = run(&cli, invocation) {
        error!("{}: {}", e.category(), e);
        if logs_to_file {
            eprintln!("{}: {}", e.category(), e);
        }
        std::process::exit(1);
    }
}

fn resolve_invocation(cli: &Cli) -> Result<Invocation> {
    let config = Config::load_from_file(&cli.config_path())?;
    let connection = resolve_connection(cli, &config)?.build()?;

    let sql = cli
        .sql
        .clone()
        .or_else(|| config.query.sql.clone())
        .filter(|sql| !sql.trim().is_empty())
        .ok_or_else(|| ProbeError::config("No statement given and no query.sql in config"))?;

    let fetch_size = cli
        .fetch_size
        .or(config.query.fetch_size)
        .unwrap_or(DEFAULT_FETCH_SIZE);

    Ok(Invocation {
        connection,
        sql,
        fetch_size,
    })
}

/// Resolves the connection profile with precedence:
/// 1. CLI arguments (highest)
/// 2. Named connection from config
/// 3. Default connection from config
/// 4. Environment variables
fn resolve_connection(cli: &Cli, config: &Config) -> Result<ConnectionProfile> {
    let mut profile = match cli.connection_name() {
        Some(name) => config.get_connection(Some(name)).cloned().ok_or_else(|| {
            ProbeError::config(format!("Connection '{}' not found in config file", name))
        })?,
        None => config.get_connection(None).cloned().unwrap_or_default(),
    };

    profile.merge(&cli.to_profile());
    profile.apply_env_defaults();
    Ok(profile)
}

fn run(cli: &Cli, invocation: Invocation) -> Result<()> {
    let catalog = match &cli.seed {
        Some(path) => {
            info!("Loading mock catalog from: {}", path.display());
            MockCatalog::load(path)?
        }
        None => MockCatalog::new(),
    };
    let registry = DriverRegistry::new().with_driver(Arc::new(MockDriver::new(catalog)));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let stdout = std::io::stdout();
    let mut writer =
        RowWriter::new(stdout.lock(), cli.output_format()?).with_columns(cli.column_list());
    let mut guard = ResourceGuard::new(&registry).with_fetch_size(invocation.fetch_size);

    let rows = runtime.block_on(guard.run(invocation.connection, &invocation.sql, |row| {
        writer.write_row(row)
    }))?;

    writer.finish()?;
    info!("{} rows", rows);
    Ok(())
}
