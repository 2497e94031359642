//! Command-line argument parsing for db-probe.

use crate::config::ConnectionProfile;
use crate::error::{ProbeError, Result};
use crate::output::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Runs one SQL statement against a remote query engine and prints the rows.
#[derive(Parser, Debug)]
#[command(name = "dbprobe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Statement to execute (defaults to `query.sql` from the config file)
    #[arg(value_name = "SQL")]
    pub sql: Option<String>,

    /// Engine endpoint URL (e.g., mock://engine)
    #[arg(short = 'e', long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Staging location for query results
    #[arg(short = 's', long = "staging", value_name = "LOCATION")]
    pub staging_location: Option<String>,

    /// Credential provider: env, properties-file, or static
    #[arg(long, value_name = "PROVIDER")]
    pub credential_provider: Option<String>,

    /// Arguments for the credential provider
    #[arg(long, value_name = "ARGS")]
    pub credential_args: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Use named connection from config
    #[arg(short = 'c', long, value_name = "NAME")]
    pub connection: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// JSON catalog for the mock engine
    #[arg(long, value_name = "PATH")]
    pub seed: Option<PathBuf>,

    /// Comma-separated columns to print, in order (default: all)
    #[arg(long, value_name = "COLUMNS")]
    pub columns: Option<String>,

    /// Output format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub format: String,

    /// Rows requested per fetch
    #[arg(long, value_name = "N")]
    pub fetch_size: Option<usize>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Connection settings given on the command line. Unset fields are left
    /// for the config file and environment to fill.
    pub fn to_profile(&self) -> ConnectionProfile {
        ConnectionProfile {
            endpoint: self.endpoint.clone(),
            staging_location: self.staging_location.clone(),
            credential_provider: self.credential_provider.clone(),
            credential_args: self.credential_args.clone(),
            log_path: self.log_path.clone(),
        }
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// Returns the named connection to use, if specified.
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Splits `--columns` into names; empty entries are skipped.
    pub fn column_list(&self) -> Vec<String> {
        self.columns
            .as_deref()
            .map(|cols| {
                cols.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parses the output format from the --format argument.
    pub fn output_format(&self) -> Result<OutputFormat> {
        self.format.parse().map_err(ProbeError::config)
    }
}
