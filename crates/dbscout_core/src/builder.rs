use crate::{ConnectionDescriptor, ConnectionString, DatabaseEnumerator, DbError, DiscoveryError};

/// Server label for connection strings that fail to parse; the raw text may
/// carry a password.
const UNPARSABLE_SERVER: &str = "<unparsable connection string>";

/// Expands a server connection string into one descriptor per eligible database.
pub struct DescriptorBuilder<'a> {
    enumerator: &'a dyn DatabaseEnumerator,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(enumerator: &'a dyn DatabaseEnumerator) -> Self {
        Self { enumerator }
    }

    /// Each descriptor's connection string differs from `connection_string`
    /// only in its `Initial Catalog`; its caption is `<server>.<database>`.
    pub fn expand(
        &self,
        connection_string: &str,
    ) -> Result<Vec<ConnectionDescriptor>, DiscoveryError> {
        let server: ConnectionString =
            connection_string
                .parse()
                .map_err(|source| DiscoveryError::Server {
                    server: UNPARSABLE_SERVER.to_string(),
                    source,
                })?;

        let data_source = server
            .data_source()
            .ok_or_else(|| DiscoveryError::Server {
                server: server.redacted(),
                source: DbError::InvalidConnectionString("missing Data Source".to_string()),
            })?
            .to_string();

        let databases = self
            .enumerator
            .list_eligible_databases(&server)
            .map_err(|source| DiscoveryError::Server {
                server: server.redacted(),
                source,
            })?;

        Ok(databases
            .iter()
            .map(|database| {
                ConnectionDescriptor::from_host_tree(
                    format!("{}.{}", data_source, database),
                    server.with_initial_catalog(database).to_string(),
                )
            })
            .collect())
    }
}
