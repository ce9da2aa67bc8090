//! A host tree read from a JSON file, for running discovery outside the IDE.
//!
//! ```json
//! {
//!   "hierarchies": [
//!     { "name": "prod", "connection": { "kind": "sql_server", "connection_string": "Data Source=prod;Integrated Security=true" } },
//!     { "name": "files", "connection": { "kind": "azure_storage" } },
//!     { "name": "empty" }
//!   ]
//! }
//! ```

use dbscout_core::{
    Capability, EventSource, HierarchyRoot, HostAdapter, HostConnection, HostError, HostObject,
    NodeInformation, Service, SqlConnectionInfo,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const SQL_SERVER_KIND: &str = "sql_server";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostSnapshot {
    #[serde(default)]
    pub hierarchies: Vec<HierarchySnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HierarchySnapshot {
    pub name: String,

    #[serde(default)]
    pub connection: Option<ConnectionSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSnapshot {
    pub kind: String,

    #[serde(default)]
    pub connection_string: String,
}

impl HostSnapshot {
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(content)?)
    }
}

impl ConnectionSnapshot {
    fn to_host_connection(&self) -> HostConnection {
        if self.kind.eq_ignore_ascii_case(SQL_SERVER_KIND) {
            HostConnection::SqlServer(SqlConnectionInfo::new(self.connection_string.clone()))
        } else {
            HostConnection::Other(self.kind.clone())
        }
    }
}

struct SnapshotNode {
    info: Arc<SnapshotNodeInfo>,
}

struct SnapshotNodeInfo {
    connection: Option<HostConnection>,
}

impl NodeInformation for SnapshotNodeInfo {
    fn connection(&self) -> Option<HostConnection> {
        self.connection.clone()
    }
}

impl HostObject for SnapshotNode {
    fn type_name(&self) -> &str {
        "dbscout::SnapshotNode"
    }

    fn get_service(&self, capability: Capability) -> Option<Service> {
        match capability {
            Capability::NodeInformation => Some(Service::NodeInformation(self.info.clone())),
            Capability::MenuHandler => None,
        }
    }
}

/// Static `HostAdapter` over a [`HostSnapshot`].
///
/// There is no live explorer behind it, so it publishes no service and the
/// selection bridge never wires against it.
pub struct SnapshotHost {
    roots: Vec<HierarchyRoot>,
}

impl SnapshotHost {
    pub fn new(snapshot: &HostSnapshot) -> Self {
        let roots = snapshot
            .hierarchies
            .iter()
            .map(|hierarchy| {
                let node = SnapshotNode {
                    info: Arc::new(SnapshotNodeInfo {
                        connection: hierarchy
                            .connection
                            .as_ref()
                            .map(ConnectionSnapshot::to_host_connection),
                    }),
                };
                HierarchyRoot::new(hierarchy.name.clone(), Arc::new(node))
            })
            .collect();

        Self { roots }
    }
}

impl HostAdapter for SnapshotHost {
    fn tree_roots(&self) -> Result<Vec<HierarchyRoot>, HostError> {
        Ok(self.roots.clone())
    }

    fn object_explorer_service(&self) -> Option<Arc<dyn HostObject>> {
        None
    }

    fn find_context_change_source(
        &self,
        _service: &Arc<dyn HostObject>,
    ) -> Result<Option<Arc<dyn EventSource>>, HostError> {
        Ok(None)
    }
}
