use crate::{DiscoveryError, DuplicatePolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Where a descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Discovered by walking the host's explorer tree.
    HostTree,

    /// Any other source, such as the plugin's own connection store.
    Other,
}

/// Database engine a descriptor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseType {
    SqlServer,
}

/// One database reachable through one connection string.
///
/// Immutable once built; the connection string is the catalog key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    caption: String,
    connection_string: String,
    database_type: DatabaseType,
    source_kind: SourceKind,
    from_host_tree: bool,
}

impl ConnectionDescriptor {
    /// Descriptor for a database found through the host tree.
    pub fn from_host_tree(
        caption: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            caption: caption.into(),
            connection_string: connection_string.into(),
            database_type: DatabaseType::SqlServer,
            source_kind: SourceKind::HostTree,
            from_host_tree: true,
        }
    }

    /// Display label, `<server>.<database>`.
    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn is_from_host_tree(&self) -> bool {
        self.from_host_tree
    }
}

/// What happened to a descriptor offered to [`Catalog::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Replaced,
    Skipped,
}

/// Connection string → descriptor, rebuilt from scratch on every discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: HashMap<String, ConnectionDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `descriptor` under its connection string.
    ///
    /// A key collision is resolved by `policy`; under
    /// [`DuplicatePolicy::Fail`] the catalog is left unchanged and the
    /// collision is returned as an error.
    pub fn insert(
        &mut self,
        descriptor: ConnectionDescriptor,
        policy: DuplicatePolicy,
    ) -> Result<InsertOutcome, DiscoveryError> {
        match self.entries.entry(descriptor.connection_string.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(descriptor);
                Ok(InsertOutcome::Inserted)
            }
            Entry::Occupied(mut slot) => match policy {
                DuplicatePolicy::KeepFirst => Ok(InsertOutcome::Skipped),
                DuplicatePolicy::Overwrite => {
                    slot.insert(descriptor);
                    Ok(InsertOutcome::Replaced)
                }
                DuplicatePolicy::Fail => {
                    Err(DiscoveryError::DuplicateKey(slot.get().caption.clone()))
                }
            },
        }
    }

    pub fn get(&self, connection_string: &str) -> Option<&ConnectionDescriptor> {
        self.entries.get(connection_string)
    }

    pub fn contains_key(&self, connection_string: &str) -> bool {
        self.entries.contains_key(connection_string)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ConnectionDescriptor> {
        self.entries.values()
    }

    /// Captions sorted alphabetically, handy for stable output.
    pub fn sorted_captions(&self) -> Vec<&str> {
        let mut captions: Vec<_> = self.descriptors().map(|d| d.caption()).collect();
        captions.sort_unstable();
        captions
    }

    pub fn into_map(self) -> HashMap<String, ConnectionDescriptor> {
        self.entries
    }
}
