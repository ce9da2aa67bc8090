use crate::{ConnectionString, DbError, QueryRequest, QueryResult};

/// Supported server engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbKind {
    SqlServer,
}

impl DbKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            DbKind::SqlServer => "SQL Server",
        }
    }
}

/// Factory for short-lived server connections.
///
/// The core never talks to a transport directly; the SQL Server driver
/// crate and the test fakes provide implementations.
pub trait DbDriver: Send + Sync {
    fn kind(&self) -> DbKind;

    /// Human-readable name for log output.
    fn display_name(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Open a connection described by `connection_string`.
    fn connect(&self, connection_string: &ConnectionString)
    -> Result<Box<dyn Connection>, DbError>;
}

/// Open server connection.
pub trait Connection: Send + Sync {
    /// Execute a SQL statement synchronously, honoring
    /// `QueryRequest::statement_timeout` when set.
    fn execute(&self, req: &QueryRequest) -> Result<QueryResult, DbError>;

    /// Close the connection and release resources.
    fn close(&mut self) -> Result<(), DbError>;

    fn kind(&self) -> DbKind;
}
