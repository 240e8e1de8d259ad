//! Subcommand implementations

use anyhow::{Context, Result, bail};
use std::path::Path;
use tabula_core::{ConnectionConfig, Row, Value};
use tabula_drivers::DriverRegistry;
use tabula_interchange::{
    Dataset, build_definitions, distinct_values, infer_schema, read_dataset_with,
    table_name_from_path,
};
use tabula_services::{ErrorPolicy, TableManager, TableManagerConfig};

use crate::cli::{Cli, Command, ConnectionArgs, CsvFileArgs};
use crate::output;
use crate::settings::Settings;

/// Everything a database command needs besides its own arguments
struct Database {
    connection: ConnectionConfig,
    manager: TableManagerConfig,
}

impl Database {
    fn new(settings: Settings, args: &ConnectionArgs, strict: bool) -> Self {
        Self {
            connection: connection_config(settings.connection, args),
            manager: manager_config(settings.table_manager, strict),
        }
    }

    fn table_manager(&self) -> Result<TableManager> {
        let driver = DriverRegistry::with_defaults()
            .resolve(&self.connection.driver)
            .context("Cannot open the database")?;
        Ok(TableManager::with_config(
            driver,
            self.connection.clone(),
            self.manager.clone(),
        ))
    }
}

fn connection_config(mut config: ConnectionConfig, args: &ConnectionArgs) -> ConnectionConfig {
    args.apply(&mut config);
    config
}

fn manager_config(mut config: TableManagerConfig, strict: bool) -> TableManagerConfig {
    if strict {
        config.error_policy = ErrorPolicy::Propagate;
    }
    config
}

pub fn run(cli: Cli, settings: Settings) -> Result<()> {
    let database = Database::new(settings, &cli.connection, cli.strict);

    match cli.command {
        Command::Schema { csv, sql } => schema(&csv, sql),
        Command::Values { csv, column } => values(&csv, &column),
        Command::Load {
            csv,
            table,
            create_only,
        } => load(&database, &csv, table, create_only),
        Command::Exists { table } => {
            let exists = database.table_manager()?.exists(&table)?;
            println!("{}", exists);
            Ok(())
        }
        Command::Fetch { table, id } => {
            let row = database.table_manager()?.fetch_by_id(&table, id)?;
            print_row(row, || format!("No row with id {} in {}", id, table));
            Ok(())
        }
        Command::Lookup {
            target,
            column,
            value,
        } => {
            let table = lookup_table(&target)?;
            let row = lookup(&database, &table, &column, &value)?;
            print_row(row, || format!("No row in {} where {} = {}", table, column, value));
            Ok(())
        }
        Command::Drop { table } => {
            database.table_manager()?.drop(&table)?;
            println!("Dropped {}", table);
            Ok(())
        }
    }
}

fn read_csv(csv: &CsvFileArgs) -> Result<Dataset> {
    read_dataset_with(&csv.file, &csv.options())
        .with_context(|| format!("Failed to read {:?}", csv.file))
}

fn schema(csv: &CsvFileArgs, sql: bool) -> Result<()> {
    let dataset = read_csv(csv)?;
    if sql {
        let table = table_name_from_path(&csv.file)?;
        println!("{};", infer_schema(&dataset).create_table_sql(&table));
    } else {
        for definition in build_definitions(&dataset) {
            println!("{}", definition);
        }
    }
    Ok(())
}

fn values(csv: &CsvFileArgs, column: &str) -> Result<()> {
    let dataset = read_csv(csv)?;
    let values = distinct_values(&dataset, column)?;
    println!("{}", output::values_table(column, &values));
    Ok(())
}

fn load(
    database: &Database,
    csv: &CsvFileArgs,
    table: Option<String>,
    create_only: bool,
) -> Result<()> {
    let dataset = read_csv(csv)?;
    let table = match table {
        Some(table) => table,
        None => table_name_from_path(&csv.file)?,
    };
    let mut manager = database.table_manager()?;

    if create_only {
        manager.create(&table, &infer_schema(&dataset))?;
        if !manager.exists(&table)? {
            bail!("Table {} was not created", table);
        }
        println!("Created {}", table);
        return Ok(());
    }

    let report = manager.bulk_insert_report(&table, &dataset)?;
    if report.rows_inserted == 0 && !dataset.is_empty() {
        bail!("No rows were inserted into {}", table);
    }
    println!(
        "Inserted {} rows into {}{}",
        report.rows_inserted,
        table,
        if report.created_table {
            " (created table)"
        } else {
            ""
        }
    );
    Ok(())
}

/// Bind the value as typed; the driver converts it for numeric columns
fn lookup(database: &Database, table: &str, column: &str, value: &str) -> Result<Option<Row>> {
    Ok(database
        .table_manager()?
        .lookup(table, column, Value::String(value.to_string()))?)
}

/// Table named by a lookup target: a CSV file selects its own table
fn lookup_table(target: &str) -> Result<String> {
    let path = Path::new(target);
    if path.is_file() {
        Ok(table_name_from_path(path)?)
    } else {
        Ok(target.to_string())
    }
}

fn print_row(row: Option<Row>, not_found: impl FnOnce() -> String) {
    match row {
        Some(row) => println!("{}", output::row_table(&row)),
        None => println!("{}", not_found()),
    }
}
