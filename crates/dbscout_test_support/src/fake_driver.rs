use crate::fixtures::database_names_result;
use dbscout_core::{
    Connection, ConnectionString, DbDriver, DbError, DbKind, QueryRequest, QueryResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub enum FakeQueryOutcome {
    Success(QueryResult),
    Error(String),
    Timeout,
}

impl FakeQueryOutcome {
    fn to_result(&self) -> Result<QueryResult, DbError> {
        match self {
            Self::Success(result) => Ok(result.clone()),
            Self::Error(message) => Err(DbError::query_failed(message.clone())),
            Self::Timeout => Err(DbError::Timeout),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeDriverStats {
    /// Connection strings passed to `connect`, in call order.
    pub connect_calls: Vec<String>,
    pub executed_requests: Vec<QueryRequest>,
    pub close_calls: usize,
}

#[derive(Default)]
struct FakeDriverState {
    outcomes: RwLock<HashMap<String, FakeQueryOutcome>>,
    default_outcome: RwLock<Option<FakeQueryOutcome>>,
    connect_errors: RwLock<HashMap<String, String>>,
    connect_calls: Mutex<Vec<String>>,
    executed_requests: Mutex<Vec<QueryRequest>>,
    close_calls: AtomicUsize,
}

/// In-memory `DbDriver` whose answers are scripted per server.
///
/// Servers are matched on the connection string's `Data Source`,
/// case-insensitively.
#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<FakeDriverState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `sys.databases` on `server` returns `names`, in that order.
    pub fn with_databases(self, server: &str, names: &[&str]) -> Self {
        self.set_outcome(server, FakeQueryOutcome::Success(database_names_result(names)));
        self
    }

    pub fn with_query_error(self, server: &str, message: impl Into<String>) -> Self {
        self.set_outcome(server, FakeQueryOutcome::Error(message.into()));
        self
    }

    pub fn with_timeout(self, server: &str) -> Self {
        self.set_outcome(server, FakeQueryOutcome::Timeout);
        self
    }

    pub fn with_connect_error(self, server: &str, message: impl Into<String>) -> Self {
        rwlock_write(&self.state.connect_errors).insert(server_key(server), message.into());
        self
    }

    /// Answer for servers without a scripted outcome.
    pub fn with_default_databases(self, names: &[&str]) -> Self {
        *rwlock_write(&self.state.default_outcome) =
            Some(FakeQueryOutcome::Success(database_names_result(names)));
        self
    }

    pub fn set_outcome(&self, server: &str, outcome: FakeQueryOutcome) {
        rwlock_write(&self.state.outcomes).insert(server_key(server), outcome);
    }

    pub fn stats(&self) -> FakeDriverStats {
        FakeDriverStats {
            connect_calls: mutex_lock(&self.state.connect_calls).clone(),
            executed_requests: mutex_lock(&self.state.executed_requests).clone(),
            close_calls: self.state.close_calls.load(Ordering::Relaxed),
        }
    }

    pub fn as_driver_arc(self) -> Arc<dyn DbDriver> {
        Arc::new(self)
    }
}

impl DbDriver for FakeDriver {
    fn kind(&self) -> DbKind {
        DbKind::SqlServer
    }

    fn connect(
        &self,
        connection_string: &ConnectionString,
    ) -> Result<Box<dyn Connection>, DbError> {
        mutex_lock(&self.state.connect_calls).push(connection_string.to_string());

        let server = server_key(connection_string.data_source().unwrap_or_default());

        if let Some(message) = rwlock_read(&self.state.connect_errors).get(&server) {
            return Err(DbError::connection_failed(message.clone()));
        }

        Ok(Box::new(FakeConnection {
            server,
            state: self.state.clone(),
        }))
    }
}

struct FakeConnection {
    server: String,
    state: Arc<FakeDriverState>,
}

impl Connection for FakeConnection {
    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError> {
        mutex_lock(&self.state.executed_requests).push(req.clone());

        if let Some(outcome) = rwlock_read(&self.state.outcomes).get(&self.server) {
            return outcome.to_result();
        }

        if let Some(outcome) = rwlock_read(&self.state.default_outcome).as_ref() {
            return outcome.to_result();
        }

        Ok(QueryResult::empty())
    }

    fn close(&mut self) -> Result<(), DbError> {
        self.state.close_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn kind(&self) -> DbKind {
        DbKind::SqlServer
    }
}

fn server_key(server: &str) -> String {
    server.trim().to_ascii_lowercase()
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}
