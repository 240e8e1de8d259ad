//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tabula_core::ConnectionConfig;
use tabula_interchange::CsvOptions;

#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(about = "Infer SQL schemas from CSV files and manage the tables they load into")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to <config dir>/tabula/config.toml)
    #[arg(long, global = true, env = "TABULA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Return database failures as errors instead of logging them
    #[arg(long, global = true)]
    pub strict: bool,

    /// Debug logging from the tabula crates
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection overrides, applied on top of the settings file
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Database driver (postgres, sqlite)
    #[arg(long, global = true, env = "TABULA_DB_DRIVER")]
    pub driver: Option<String>,

    #[arg(long, global = true, env = "TABULA_DB_HOST")]
    pub host: Option<String>,

    #[arg(long, global = true, env = "TABULA_DB_PORT")]
    pub port: Option<u16>,

    #[arg(long, global = true, env = "TABULA_DB_NAME")]
    pub database: Option<String>,

    #[arg(long, global = true, env = "TABULA_DB_USER")]
    pub user: Option<String>,

    #[arg(long, global = true, env = "TABULA_DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// SQLite database file; selects the sqlite driver unless --driver is given
    #[arg(long, global = true, env = "TABULA_SQLITE_PATH")]
    pub sqlite_path: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn apply(&self, config: &mut ConnectionConfig) {
        if let Some(path) = &self.sqlite_path {
            config.driver = "sqlite".to_string();
            config.path = Some(path.clone());
        }
        if let Some(driver) = &self.driver {
            config.driver = driver.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(user) = &self.user {
            config.username = Some(user.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
    }
}

/// A delimited data file
#[derive(Args, Debug, Clone)]
pub struct CsvFileArgs {
    /// Path to the CSV file
    pub file: PathBuf,

    /// Field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
}

impl CsvFileArgs {
    pub fn options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.delimiter,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the column definitions inferred from a CSV file
    Schema {
        #[command(flatten)]
        csv: CsvFileArgs,

        /// Print the full CREATE TABLE statement instead
        #[arg(long)]
        sql: bool,
    },

    /// Create the table for a CSV file and insert its rows
    Load {
        #[command(flatten)]
        csv: CsvFileArgs,

        /// Table name (defaults to the lowercased file name)
        #[arg(long)]
        table: Option<String>,

        /// Create the table without inserting rows
        #[arg(long)]
        create_only: bool,
    },

    /// Report whether a table exists
    Exists { table: String },

    /// Print the first row whose id matches
    Fetch { table: String, id: i64 },

    /// Print the first row whose column equals a value
    Lookup {
        /// Table name, or a CSV file whose name selects the table
        target: String,

        #[arg(long)]
        column: String,

        #[arg(long)]
        value: String,
    },

    /// Drop a table if it exists
    Drop { table: String },

    /// List the distinct values of one column of a CSV file
    Values {
        #[command(flatten)]
        csv: CsvFileArgs,

        #[arg(long)]
        column: String,
    },
}
