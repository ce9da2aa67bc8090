use dbscout_core::{
    CONNECT_TIMEOUT, ColumnMeta, Connection, ConnectionString, DbDriver, DbError, DbKind,
    QueryRequest, QueryResult, Row, Value,
};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tiberius::{Client, ColumnData, Config};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Login timeout when the connection string does not set `Connect Timeout`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

type MssqlClient = Client<Compat<TcpStream>>;

/// SQL Server driver backed by tiberius.
///
/// Each connection owns a single-threaded tokio runtime so the blocking
/// `Connection` API can drive the async client.
#[derive(Debug, Default)]
pub struct MssqlDriver;

impl MssqlDriver {
    pub fn new() -> Self {
        Self
    }
}

impl DbDriver for MssqlDriver {
    fn kind(&self) -> DbKind {
        DbKind::SqlServer
    }

    fn connect(
        &self,
        connection_string: &ConnectionString,
    ) -> Result<Box<dyn Connection>, DbError> {
        let server = connection_string.redacted();
        let config = Config::from_ado_string(&connection_string.to_string())
            .map_err(|e| DbError::InvalidConnectionString(format!("{}: {}", server, e)))?;
        let connect_timeout = connect_timeout(connection_string)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let start = Instant::now();
        log::info!("[CONNECT] Connecting to {}", config.get_addr());

        let client = runtime.block_on(async {
            match connect_timeout {
                Some(limit) => match tokio::time::timeout(limit, open_client(config)).await {
                    Ok(result) => result,
                    Err(_) => Err(DbError::connection_failed(format!(
                        "Timed out after {}s connecting to {}",
                        limit.as_secs(),
                        server
                    ))),
                },
                None => open_client(config).await,
            }
        })?;

        log::info!(
            "[CONNECT] Connected in {:.2}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Box::new(MssqlConnection {
            runtime,
            client: Mutex::new(Some(client)),
        }))
    }
}

async fn open_client(config: Config) -> Result<MssqlClient, DbError> {
    let tcp = TcpStream::connect(config.get_addr())
        .await
        .map_err(|e| DbError::connection_failed(format!("Connecting to SQL Server: {}", e)))?;

    tcp.set_nodelay(true)
        .map_err(|e| DbError::connection_failed(format!("Setting TCP_NODELAY: {}", e)))?;

    Client::connect(config, tcp.compat_write())
        .await
        .map_err(|e| format_mssql_error(&e))
}

/// `Connect Timeout=0` waits without limit.
fn connect_timeout(connection_string: &ConnectionString) -> Result<Option<Duration>, DbError> {
    match connection_string.get(CONNECT_TIMEOUT) {
        None | Some("") => Ok(Some(DEFAULT_CONNECT_TIMEOUT)),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(0) => Ok(None),
            Ok(secs) => Ok(Some(Duration::from_secs(secs))),
            Err(_) => Err(DbError::InvalidConnectionString(format!(
                "Invalid {}: {}",
                CONNECT_TIMEOUT, raw
            ))),
        },
    }
}

fn format_mssql_error(e: &tiberius::error::Error) -> DbError {
    match e {
        tiberius::error::Error::Server(token) => DbError::connection_failed(format!(
            "{} (Code: {}, State: {})",
            token.message(),
            token.code(),
            token.state()
        )),
        tiberius::error::Error::Io { message, .. } => DbError::connection_failed(message.clone()),
        other => DbError::connection_failed(other.to_string()),
    }
}

fn format_mssql_query_error(e: &tiberius::error::Error) -> DbError {
    let message = match e {
        tiberius::error::Error::Server(token) => format!(
            "{}. Code: {}. State: {}",
            token.message(),
            token.code(),
            token.state()
        ),
        other => other.to_string(),
    };

    log::error!("SQL Server query failed: {}", message);
    DbError::QueryFailed(message)
}

pub struct MssqlConnection {
    runtime: Runtime,
    client: Mutex<Option<MssqlClient>>,
}

impl MssqlConnection {
    fn block_on_with_timeout<T>(
        &self,
        timeout: Option<Duration>,
        future: impl Future<Output = Result<T, DbError>>,
    ) -> Result<T, DbError> {
        match timeout {
            Some(limit) => self.runtime.block_on(async {
                match tokio::time::timeout(limit, future).await {
                    Ok(result) => result,
                    Err(_) => Err(DbError::Timeout),
                }
            }),
            None => self.runtime.block_on(future),
        }
    }

    fn client(&self) -> MutexGuard<'_, Option<MssqlClient>> {
        match self.client.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                log::warn!("[CLEANUP] Recovering from poisoned mutex");
                poison_err.into_inner()
            }
        }
    }
}

impl Connection for MssqlConnection {
    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError> {
        let start = Instant::now();

        let sql_preview = if req.sql.len() > 80 {
            format!("{}...", req.sql.chars().take(80).collect::<String>())
        } else {
            req.sql.clone()
        };
        log::debug!("[QUERY] Executing: {}", sql_preview.replace('\n', " "));

        let mut guard = self.client();
        let client = guard
            .as_mut()
            .ok_or_else(|| DbError::query_failed("Connection is closed"))?;

        let (columns, rows) = self.block_on_with_timeout(req.statement_timeout, async {
            let mut stream = client
                .simple_query(req.sql.as_str())
                .await
                .map_err(|e| format_mssql_query_error(&e))?;

            let columns: Vec<ColumnMeta> = stream
                .columns()
                .await
                .map_err(|e| format_mssql_query_error(&e))?
                .map(|columns| {
                    columns
                        .iter()
                        .map(|column| ColumnMeta {
                            name: column.name().to_string(),
                            type_name: format!("{:?}", column.column_type()),
                            nullable: true,
                        })
                        .collect()
                })
                .unwrap_or_default();

            let rows = stream
                .into_first_result()
                .await
                .map_err(|e| format_mssql_query_error(&e))?;

            Ok::<_, DbError>((columns, rows))
        })?;

        let rows: Vec<Row> = rows
            .into_iter()
            .map(|row| row.into_iter().map(column_data_to_value).collect())
            .collect();

        let execution_time = start.elapsed();
        log::debug!(
            "[QUERY] Completed in {:.2}ms, {} rows",
            execution_time.as_secs_f64() * 1000.0,
            rows.len()
        );

        Ok(QueryResult::new(columns, rows, execution_time))
    }

    fn close(&mut self) -> Result<(), DbError> {
        let client = match self.client.get_mut() {
            Ok(client) => client.take(),
            Err(poison_err) => poison_err.into_inner().take(),
        };

        match client {
            Some(client) => self
                .runtime
                .block_on(client.close())
                .map_err(|e| DbError::connection_failed(e.to_string())),
            None => Ok(()),
        }
    }

    fn kind(&self) -> DbKind {
        DbKind::SqlServer
    }
}

fn column_data_to_value(data: ColumnData<'static>) -> Value {
    match data {
        ColumnData::U8(v) => v.map_or(Value::Null, |v| Value::Int(i64::from(v))),
        ColumnData::I16(v) => v.map_or(Value::Null, |v| Value::Int(i64::from(v))),
        ColumnData::I32(v) => v.map_or(Value::Null, |v| Value::Int(i64::from(v))),
        ColumnData::I64(v) => v.map_or(Value::Null, Value::Int),
        ColumnData::F32(v) => v.map_or(Value::Null, |v| Value::Float(f64::from(v))),
        ColumnData::F64(v) => v.map_or(Value::Null, Value::Float),
        ColumnData::Bit(v) => v.map_or(Value::Null, Value::Bool),
        ColumnData::String(v) => v.map_or(Value::Null, |s| Value::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map_or(Value::Null, |g| Value::Text(g.to_string())),
        ColumnData::Binary(v) => v.map_or(Value::Null, |b| Value::Bytes(b.into_owned())),
        ColumnData::Numeric(v) => v.map_or(Value::Null, |n| Value::Text(n.to_string())),
        other => Value::Text(format!("{:?}", other)),
    }
}
