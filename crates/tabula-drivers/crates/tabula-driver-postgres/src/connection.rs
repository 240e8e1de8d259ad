//! PostgreSQL connection implementation

use bytes::BytesMut;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tabula_core::{Connection, QueryResult, Result, Row, StatementResult, TabulaError, Value};
use tokio::runtime::Runtime;
use tokio_postgres::{
    Client, NoTls, Row as PgRow, Statement,
    types::{FromSql, ToSql, Type},
};

/// Runtime that drives every PostgreSQL socket.
///
/// Callers are blocking, so each operation is handed to this runtime with
/// `block_on` while the connection task keeps running on its workers.
fn postgres_runtime() -> Result<&'static Runtime> {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("tabula-postgres-runtime")
        .build()
        .map_err(|e| {
            TabulaError::Connection(format!("Failed to start PostgreSQL runtime: {}", e))
        })?;
    Ok(RUNTIME.get_or_init(|| runtime))
}

fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let code = db_error.code();
    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail()
        && !detail.trim().is_empty()
    {
        message.push_str(&format!(" (detail: {})", detail));
    }
    if let Some(hint) = db_error.hint()
        && !hint.trim().is_empty()
    {
        message.push_str(&format!(" (hint: {})", hint));
    }
    if let Some(column) = db_error.column()
        && !column.trim().is_empty()
    {
        message.push_str(&format!(" (column: {})", column));
    }

    match code.code() {
        "23505" => format!("duplicate value violates unique constraint: {}", message),
        "23502" => format!("null value violates not-null constraint: {}", message),
        "22P02" => format!("invalid input syntax: {}", message),
        "42P07" => format!("table already exists: {}", message),
        "42P01" => format!("table does not exist: {}", message),
        "57014" => format!("statement timed out: {}", message),
        _ => format!("{} (code: {})", message, code.code()),
    }
}

/// Settings used to open a [`PostgresConnection`]
#[derive(Debug, Clone)]
pub struct PostgresConnectOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Duration,
    pub statement_timeout: Option<Duration>,
    pub application_name: String,
}

/// PostgreSQL connection wrapper
pub struct PostgresConnection {
    client: Option<Client>,
    runtime: &'static Runtime,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database
    pub fn connect(options: &PostgresConnectOptions) -> Result<Self> {
        tracing::info!(
            host = %options.host,
            port = %options.port,
            database = %options.database,
            "connecting to PostgreSQL database"
        );

        let mut config = tokio_postgres::Config::new();
        config
            .host(&options.host)
            .port(options.port)
            .dbname(&options.database)
            .connect_timeout(options.connect_timeout)
            .application_name(&options.application_name);
        if let Some(user) = &options.user {
            config.user(user);
        }
        if let Some(password) = &options.password {
            config.password(password);
        }

        let runtime = postgres_runtime()?;
        let (client, connection) = runtime
            .block_on(config.connect(NoTls))
            .map_err(|e| {
                TabulaError::Connection(format!(
                    "Failed to connect to PostgreSQL: {}",
                    format_postgres_error(&e)
                ))
            })?;

        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        if let Some(timeout) = options.statement_timeout {
            let sql = format!("SET statement_timeout = {}", timeout.as_millis());
            runtime.block_on(client.batch_execute(&sql)).map_err(|e| {
                TabulaError::Connection(format!(
                    "Failed to set statement timeout: {}",
                    format_postgres_error(&e)
                ))
            })?;
        }

        tracing::debug!(
            host = %options.host,
            database = %options.database,
            "PostgreSQL connection established"
        );
        Ok(Self {
            client: Some(client),
            runtime,
        })
    }

    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .filter(|client| !client.is_closed())
            .ok_or_else(|| TabulaError::Connection("PostgreSQL connection is closed".into()))
    }

    /// Prepare `sql` so each parameter can be encoded for its target type
    fn prepare(&self, sql: &str, params: &[Value]) -> Result<(Statement, Vec<PgValue>)> {
        let client = self.client()?;
        let statement = self
            .runtime
            .block_on(client.prepare(sql))
            .map_err(|e| {
                TabulaError::Statement(format!(
                    "Failed to prepare statement: {}",
                    format_postgres_error(&e)
                ))
            })?;

        let param_types = statement.params();
        let pg_params = params
            .iter()
            .enumerate()
            .map(|(i, value)| match param_types.get(i) {
                Some(target_type) => PgValue::from_value_for_type(value, target_type),
                None => Ok(PgValue::from_value(value)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((statement, pg_params))
    }

    fn run_batch(&self, sql: &str) -> Result<()> {
        let client = self.client()?;
        self.runtime.block_on(client.batch_execute(sql)).map_err(|e| {
            TabulaError::Statement(format!("{} failed: {}", sql, format_postgres_error(&e)))
        })
    }
}

impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let (statement, pg_params) = self.prepare(sql, params)?;
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let client = self.client()?;
        let rows_affected = self
            .runtime
            .block_on(client.execute(&statement, &param_refs))
            .map_err(|e| {
                TabulaError::Statement(format!(
                    "Failed to execute statement: {}",
                    format_postgres_error(&e)
                ))
            })?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(StatementResult {
            affected_rows: rows_affected,
        })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = Instant::now();
        let (statement, pg_params) = self.prepare(sql, params)?;
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let client = self.client()?;
        let pg_rows = self
            .runtime
            .block_on(client.query(&statement, &param_refs))
            .map_err(|e| {
                TabulaError::Statement(format!(
                    "Failed to execute query: {}",
                    format_postgres_error(&e)
                ))
            })?;

        // Taken from the statement so empty results still carry columns
        let column_names: Vec<String> = statement
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect();

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in &pg_rows {
            let mut values = Vec::with_capacity(column_names.len());
            for idx in 0..column_names.len() {
                values.push(postgres_to_value(pg_row, idx));
            }
            rows.push(Row::new(column_names.clone(), values));
        }

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );

        Ok(QueryResult {
            columns: column_names,
            rows,
            execution_time_ms,
        })
    }

    fn table_exists(&mut self, table_name: &str) -> Result<bool> {
        let result = self.query(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1::text)",
            &[Value::String(table_name.to_string())],
        )?;
        Ok(result
            .into_first_row()
            .and_then(|row| row.get(0).and_then(Value::as_bool))
            .unwrap_or(false))
    }

    fn begin(&mut self) -> Result<()> {
        tracing::debug!("beginning PostgreSQL transaction");
        self.run_batch("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.run_batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.run_batch("ROLLBACK")
    }

    fn close(&mut self) -> Result<()> {
        if self.client.take().is_some() {
            tracing::debug!("closing PostgreSQL connection");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.client.as_ref().is_none_or(Client::is_closed)
    }
}

/// Owned parameter that tokio-postgres can encode
#[derive(Debug)]
enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

#[derive(Debug)]
struct PgFallbackString(String);

impl<'a> FromSql<'a> for PgFallbackString {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(String::from_utf8(raw.to_vec())?))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

impl PgValue {
    /// Encode `value` with the width and kind the prepared statement expects,
    /// so an `i64` cell bound to an INT4 column is written as 4 bytes.
    ///
    /// An integer that does not fit the target width is a `Statement` error.
    fn from_value_for_type(value: &Value, target_type: &Type) -> Result<Self> {
        Ok(match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int32(v) => Self::coerce_int(i64::from(*v), target_type)?,
            Value::Int64(v) => Self::coerce_int(*v, target_type)?,
            Value::Float64(v) => match *target_type {
                Type::FLOAT4 => PgValue::Float32(*v as f32),
                Type::TEXT | Type::VARCHAR => PgValue::String(v.to_string()),
                _ => PgValue::Float64(*v),
            },
            Value::String(v) => Self::coerce_string(v, target_type),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
        })
    }

    fn coerce_int(value: i64, target_type: &Type) -> Result<Self> {
        let out_of_range = || {
            TabulaError::Statement(format!(
                "integer {} out of range for {}",
                value,
                target_type.name()
            ))
        };
        Ok(match *target_type {
            Type::INT2 => PgValue::Int16(i16::try_from(value).map_err(|_| out_of_range())?),
            Type::INT4 => PgValue::Int32(i32::try_from(value).map_err(|_| out_of_range())?),
            Type::FLOAT4 => PgValue::Float32(value as f32),
            Type::FLOAT8 => PgValue::Float64(value as f64),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => PgValue::String(value.to_string()),
            _ => PgValue::Int64(value),
        })
    }

    /// Parse numeric text when the target column is numeric; anything that
    /// does not parse is sent as text and left for the server to reject.
    fn coerce_string(value: &str, target_type: &Type) -> Self {
        let parsed = match *target_type {
            Type::INT2 => value.trim().parse().ok().map(PgValue::Int16),
            Type::INT4 => value.trim().parse().ok().map(PgValue::Int32),
            Type::INT8 => value.trim().parse().ok().map(PgValue::Int64),
            Type::FLOAT4 => value.trim().parse().ok().map(PgValue::Float32),
            Type::FLOAT8 => value.trim().parse().ok().map(PgValue::Float64),
            Type::BOOL => value.trim().parse().ok().map(PgValue::Bool),
            _ => None,
        };
        parsed.unwrap_or_else(|| PgValue::String(value.to_string()))
    }

    /// Used when the statement does not report a type for the parameter
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int32(v) => PgValue::Int32(*v),
            Value::Int64(v) => PgValue::Int64(*v),
            Value::Float64(v) => PgValue::Float64(*v),
            Value::String(v) => PgValue::String(v.clone()),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
        }
    }
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres_types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgValue::Null => Ok(postgres_types::IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Bytes(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

fn postgres_to_value(row: &PgRow, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_().name();

    match type_name {
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Int32(i32::from(v)))
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(Value::Int32)
            .unwrap_or(Value::Null),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Float64(f64::from(v)))
            .unwrap_or(Value::Null),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        "text" | "varchar" | "char" | "bpchar" | "name" => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        // Enums and other text-encoded custom types
        _ => row
            .try_get::<_, Option<PgFallbackString>>(idx)
            .ok()
            .flatten()
            .map(|value| Value::String(value.0))
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: Value, target_type: &Type) -> PgValue {
        PgValue::from_value_for_type(&value, target_type).unwrap()
    }

    #[test]
    fn integers_take_the_target_width() {
        assert!(matches!(encode(Value::Int64(7), &Type::INT4), PgValue::Int32(7)));
        assert!(matches!(encode(Value::Int32(7), &Type::INT8), PgValue::Int64(7)));
        assert!(matches!(
            encode(Value::Int64(7), &Type::FLOAT8),
            PgValue::Float64(v) if v == 7.0
        ));
        assert!(matches!(
            encode(Value::Int64(i64::from(i32::MIN)), &Type::INT4),
            PgValue::Int32(i32::MIN)
        ));
    }

    #[test]
    fn integers_too_wide_for_the_target_are_rejected() {
        let err = PgValue::from_value_for_type(&Value::Int64(4_294_967_297), &Type::INT4)
            .unwrap_err();
        assert_eq!(err.kind(), tabula_core::ErrorKind::Statement);
        assert!(err.to_string().contains("4294967297"));

        assert!(PgValue::from_value_for_type(&Value::Int32(70_000), &Type::INT2).is_err());
        assert!(matches!(
            encode(Value::Int64(4_294_967_297), &Type::INT8),
            PgValue::Int64(4_294_967_297)
        ));
    }

    #[test]
    fn numeric_text_is_parsed_for_numeric_targets() {
        assert!(matches!(encode(Value::String(" 42 ".into()), &Type::INT4), PgValue::Int32(42)));
        assert!(matches!(
            encode(Value::String("abc".into()), &Type::INT4),
            PgValue::String(ref s) if s == "abc"
        ));
    }

    #[test]
    fn numbers_bound_to_text_columns_are_rendered() {
        assert!(matches!(
            encode(Value::Int64(12), &Type::VARCHAR),
            PgValue::String(ref s) if s == "12"
        ));
        assert!(matches!(encode(Value::Null, &Type::VARCHAR), PgValue::Null));
    }
}
