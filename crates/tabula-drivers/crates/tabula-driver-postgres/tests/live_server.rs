//! Tests against a running PostgreSQL server.
//!
//! Run with `TABULA_TEST_PG_HOST` (and optionally `_PORT`, `_DB`, `_USER`,
//! `_PASSWORD`) set, then pass `--ignored`.

use pretty_assertions::assert_eq;
use tabula_core::{ConnectionConfig, DatabaseDriver, Transaction, Value};
use tabula_driver_postgres::PostgresDriver;

fn live_config() -> Option<ConnectionConfig> {
    let host = std::env::var("TABULA_TEST_PG_HOST").ok()?;
    let mut config = ConnectionConfig {
        host,
        ..Default::default()
    };
    if let Some(port) = std::env::var("TABULA_TEST_PG_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
    {
        config.port = port;
    }
    if let Ok(db) = std::env::var("TABULA_TEST_PG_DB") {
        config.database = db;
    }
    if let Ok(user) = std::env::var("TABULA_TEST_PG_USER") {
        config.username = Some(user);
    }
    config.password = std::env::var("TABULA_TEST_PG_PASSWORD").ok();
    Some(config)
}

#[test]
#[ignore = "requires a PostgreSQL server"]
fn insert_and_read_back_typed_values() {
    let Some(config) = live_config() else {
        return;
    };
    let driver = PostgresDriver::new();
    let mut conn = driver.connect(&config).unwrap();

    conn.execute("DROP TABLE IF EXISTS \"tabula_live_cars\"", &[])
        .unwrap();
    conn.execute(
        "CREATE TABLE \"tabula_live_cars\" (\"id\" INT, \"Make\" VARCHAR(255), \"Price\" FLOAT)",
        &[],
    )
    .unwrap();
    assert!(conn.table_exists("tabula_live_cars").unwrap());

    {
        let mut tx = Transaction::begin(conn.as_mut()).unwrap();
        tx.execute(
            "INSERT INTO \"tabula_live_cars\" (\"id\", \"Make\", \"Price\") VALUES ($1, $2, $3)",
            &[Value::Int64(1), Value::String("Audi".into()), Value::Int64(20000)],
        )
        .unwrap();
        tx.commit().unwrap();
    }

    let row = conn
        .query(
            "SELECT * FROM \"tabula_live_cars\" WHERE \"id\" = $1",
            &[Value::Int64(1)],
        )
        .unwrap()
        .into_first_row()
        .unwrap();
    assert_eq!(
        row.values,
        vec![
            Value::Int32(1),
            Value::String("Audi".into()),
            Value::Float64(20000.0)
        ]
    );

    conn.execute("DROP TABLE \"tabula_live_cars\"", &[]).unwrap();
    conn.close().unwrap();
}
