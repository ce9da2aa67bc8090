mod aggregator;
mod builder;
mod config;
mod connection_string;
mod descriptor;
mod diagnostics;
mod driver;
mod enumerator;
mod error;
mod host;
mod query;
mod reflective;
mod selection;
mod value;
mod walker;

pub use aggregator::{CatalogAggregator, Discovery};
pub use builder::DescriptorBuilder;
pub use config::{
    DEFAULT_ADMIN_DATABASE, DEFAULT_MENU_ITEM_LABEL, DEFAULT_MENU_TARGET_PATH,
    DEFAULT_QUERY_TIMEOUT_MS, DiscoveryConfig, DiscoveryConfigStore, DuplicatePolicy,
    FailurePolicy, SYSTEM_DATABASES,
};
pub use connection_string::{
    CONNECT_TIMEOUT, ConnectionString, DATA_SOURCE, INITIAL_CATALOG, INTEGRATED_SECURITY,
    PASSWORD, USER_ID,
};
pub use descriptor::{Catalog, ConnectionDescriptor, DatabaseType, InsertOutcome, SourceKind};
pub use diagnostics::{DiagnosticsSink, LogDiagnostics, NoopDiagnostics};
pub use driver::{Connection, DbDriver, DbKind};
pub use enumerator::{DatabaseEnumerator, ELIGIBLE_DATABASES_SQL, SqlDatabaseEnumerator};
pub use error::{DbError, DiscoveryError, HostError};
pub use host::{
    Capability, EventSource, ExplorerNode, HierarchyRoot, HostAdapter, HostConnection,
    HostObject, HostValue, MenuHandler, MenuItem, NodeInformation, NodesChangedEvent,
    NodesChangedHandler, Service, SqlConnectionInfo, Visibility,
};
pub use query::{ColumnMeta, QueryRequest, QueryResult, Row};
pub use reflective::{ReflectiveHostAdapter, ServiceLocator};
pub use selection::{BridgeState, SelectionBridge, SharedSubscriptionState, SubscriptionState};
pub use value::Value;
pub use walker::{HierarchyWalker, RawServerConnection};
