//! Connections opened one after another against the same database file

use pretty_assertions::assert_eq;
use tabula_core::{ConnectionConfig, DatabaseDriver, Transaction, Value};
use tabula_driver_sqlite::SqliteDriver;

fn file_config(dir: &tempfile::TempDir) -> ConnectionConfig {
    ConnectionConfig::sqlite(dir.path().join("tabula.db"))
}

#[test]
fn committed_rows_survive_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);
    let driver = SqliteDriver::new();

    let mut conn = driver.connect(&config).unwrap();
    conn.execute("CREATE TABLE \"cars\" (\"id\" INT, \"Make\" VARCHAR(255))", &[])
        .unwrap();
    {
        let mut tx = Transaction::begin(conn.as_mut()).unwrap();
        tx.execute(
            "INSERT INTO \"cars\" (\"id\", \"Make\") VALUES (?1, ?2)",
            &[Value::Int32(1), Value::String("Audi".into())],
        )
        .unwrap();
        tx.commit().unwrap();
    }
    conn.close().unwrap();

    let mut conn = driver.connect(&config).unwrap();
    assert!(conn.table_exists("cars").unwrap());
    let result = conn
        .query("SELECT \"Make\" FROM \"cars\" WHERE \"id\" = ?1", &[Value::Int64(1)])
        .unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows[0].values, vec![Value::String("Audi".into())]);
}

#[test]
fn rolled_back_rows_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);
    let driver = SqliteDriver::new();

    let mut conn = driver.connect(&config).unwrap();
    conn.execute("CREATE TABLE t (id INT NOT NULL)", &[]).unwrap();
    {
        let mut tx = Transaction::begin(conn.as_mut()).unwrap();
        tx.execute("INSERT INTO t (id) VALUES (?1)", &[Value::Int32(1)])
            .unwrap();
        assert!(
            tx.execute("INSERT INTO t (id) VALUES (?1)", &[Value::Null])
                .is_err()
        );
        tx.rollback().unwrap();
    }

    let count = conn
        .query("SELECT COUNT(*) FROM t", &[])
        .unwrap()
        .into_first_row()
        .and_then(|row| row.get(0).and_then(Value::as_i64));
    assert_eq!(count, Some(0));
}
