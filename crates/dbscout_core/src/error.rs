use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Query timed out")]
    Timeout,

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DbError {
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }
}

/// The host's internal object graph did not have the shape we navigate by
/// convention. Signals host incompatibility rather than a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("Host service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Lookup not found: {owner}.{member}")]
    MemberNotFound { owner: String, member: String },

    #[error("Unexpected shape for {owner}.{member}: expected {expected}")]
    UnexpectedShape {
        owner: String,
        member: String,
        expected: &'static str,
    },
}

impl HostError {
    pub fn member_not_found(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self::MemberNotFound {
            owner: owner.into(),
            member: member.into(),
        }
    }

    pub fn unexpected_shape(
        owner: impl Into<String>,
        member: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::UnexpectedShape {
            owner: owner.into(),
            member: member.into(),
            expected,
        }
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Host tree traversal failed: {0}")]
    Host(#[from] HostError),

    /// `server` is the redacted connection string of the failing server.
    #[error("Enumerating databases on {server} failed: {source}")]
    Server {
        server: String,
        #[source]
        source: DbError,
    },

    #[error("Duplicate catalog key: {0}")]
    DuplicateKey(String),
}
