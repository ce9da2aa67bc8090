use crate::{Capability, HierarchyRoot, HostAdapter, HostConnection, HostError, Service};
use log::debug;

/// A server connection lifted out of the host tree, before any querying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawServerConnection {
    /// Name of the hierarchy the connection was found under.
    pub hierarchy: String,
    pub connection_string: String,
}

/// Walks the host's tree roots looking for SQL Server connections.
pub struct HierarchyWalker<'a> {
    host: &'a dyn HostAdapter,
}

impl<'a> HierarchyWalker<'a> {
    pub fn new(host: &'a dyn HostAdapter) -> Self {
        Self { host }
    }

    /// Lazily yields one entry per root that carries a SQL Server connection.
    ///
    /// Roots without node information and roots attached to other connection
    /// types are skipped. Failing to read the tree itself is returned as-is.
    pub fn raw_connections(
        &self,
    ) -> Result<impl Iterator<Item = RawServerConnection> + use<>, HostError> {
        let roots = self.host.tree_roots()?;
        debug!("Walking {} explorer hierarchies", roots.len());

        Ok(roots.into_iter().filter_map(extract_connection))
    }
}

fn extract_connection(hierarchy: HierarchyRoot) -> Option<RawServerConnection> {
    let Some(Service::NodeInformation(info)) =
        hierarchy.root.get_service(Capability::NodeInformation)
    else {
        debug!("Hierarchy '{}' exposes no node information", hierarchy.name);
        return None;
    };

    match info.connection() {
        Some(HostConnection::SqlServer(sql)) => Some(RawServerConnection {
            hierarchy: hierarchy.name,
            connection_string: sql.connection_string,
        }),
        Some(HostConnection::Other(kind)) => {
            debug!(
                "Hierarchy '{}' holds a {} connection, skipping",
                hierarchy.name, kind
            );
            None
        }
        None => {
            debug!("Hierarchy '{}' has no connection attached", hierarchy.name);
            None
        }
    }
}
