//! The boundary between dbscout and the hosting IDE.
//!
//! The host's object graph is only known by convention, so it is modelled
//! dynamically: objects expose named properties and fields whose values are
//! [`HostValue`]s, answer capability lookups, and may publish events. All of
//! the fragile member-name knowledge lives in [`crate::ReflectiveHostAdapter`];
//! everything else is written against [`HostAdapter`].

use crate::HostError;
use std::fmt;
use std::sync::Arc;

/// Member visibility as the host's runtime reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    NonPublic,
}

/// Services an opaque host object may be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Node metadata, including the attached connection.
    NodeInformation,

    /// The node's context-menu container.
    MenuHandler,
}

/// Result of a successful capability lookup.
#[derive(Clone)]
pub enum Service {
    NodeInformation(Arc<dyn NodeInformation>),
    MenuHandler(Arc<dyn MenuHandler>),
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::NodeInformation(_) => f.write_str("Service::NodeInformation"),
            Service::MenuHandler(_) => f.write_str("Service::MenuHandler"),
        }
    }
}

/// A value read from a host member.
#[derive(Clone)]
pub enum HostValue {
    Null,
    Text(String),
    Object(Arc<dyn HostObject>),
    List(Vec<HostValue>),
    /// Keyed collection; key order is whatever the host enumerates.
    Map(Vec<(String, HostValue)>),
}

impl HostValue {
    pub fn as_object(&self) -> Option<&Arc<dyn HostObject>> {
        match self {
            HostValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Text(_) => "text",
            HostValue::Object(_) => "object",
            HostValue::List(_) => "list",
            HostValue::Map(_) => "map",
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => f.write_str("Null"),
            HostValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            HostValue::Object(object) => {
                f.debug_tuple("Object").field(&object.type_name()).finish()
            }
            HostValue::List(items) => f.debug_tuple("List").field(items).finish(),
            HostValue::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
        }
    }
}

/// An object owned by the host whose static type is unknown to us.
///
/// Every lookup returns `None` when the member does not exist; callers
/// decide whether absence is benign.
pub trait HostObject: Send + Sync {
    /// Fully qualified runtime type name.
    fn type_name(&self) -> &str;

    fn property(&self, _name: &str, _visibility: Visibility) -> Option<HostValue> {
        None
    }

    fn field(&self, _name: &str, _visibility: Visibility) -> Option<HostValue> {
        None
    }

    fn event(&self, _name: &str) -> Option<Arc<dyn EventSource>> {
        None
    }

    /// Capability lookup; `None` when the object does not support it.
    fn get_service(&self, _capability: Capability) -> Option<Service> {
        None
    }
}

/// Connection object attached to a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostConnection {
    SqlServer(SqlConnectionInfo),

    /// Any other connection type the host knows about, by type name.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlConnectionInfo {
    pub connection_string: String,
}

impl SqlConnectionInfo {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }
}

pub trait NodeInformation: Send + Sync {
    fn connection(&self) -> Option<HostConnection>;
}

/// A custom entry injected into a node's context menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

pub trait MenuHandler: Send + Sync {
    fn add_child(&self, key: &str, item: MenuItem);
}

/// A node carried by a selection notification.
pub trait ExplorerNode: Send + Sync {
    /// Type path of the node, e.g. `Server/Database`.
    fn urn_path(&self) -> &str;

    fn name(&self) -> &str;

    fn context(&self) -> &str;

    fn get_service(&self, capability: Capability) -> Option<Service>;
}

/// Payload of the host's "current context changed" notification.
#[derive(Clone, Default)]
pub struct NodesChangedEvent {
    pub changed_nodes: Vec<Arc<dyn ExplorerNode>>,
}

impl NodesChangedEvent {
    pub fn new(changed_nodes: Vec<Arc<dyn ExplorerNode>>) -> Self {
        Self { changed_nodes }
    }
}

pub type NodesChangedHandler = Arc<dyn Fn(&NodesChangedEvent) + Send + Sync>;

/// A host event that accepts handlers.
pub trait EventSource: Send + Sync {
    fn add_handler(&self, handler: NodesChangedHandler);
}

/// A named top-level node of the explorer tree.
#[derive(Clone)]
pub struct HierarchyRoot {
    pub name: String,
    pub root: Arc<dyn HostObject>,
}

impl HierarchyRoot {
    pub fn new(name: impl Into<String>, root: Arc<dyn HostObject>) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }
}

impl fmt::Debug for HierarchyRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchyRoot")
            .field("name", &self.name)
            .field("root", &self.root.type_name())
            .finish()
    }
}

/// Everything dbscout needs from the host.
pub trait HostAdapter {
    /// The explorer's registered tree roots.
    fn tree_roots(&self) -> Result<Vec<HierarchyRoot>, HostError>;

    /// The host's object-explorer service, or `None` when the host is not
    /// ready yet.
    fn object_explorer_service(&self) -> Option<Arc<dyn HostObject>>;

    /// Finds the selection-changed event on `service`.
    ///
    /// `Ok(None)` means the host simply does not publish it; an error means
    /// the graph leading to it did not have the expected shape.
    fn find_context_change_source(
        &self,
        service: &Arc<dyn HostObject>,
    ) -> Result<Option<Arc<dyn EventSource>>, HostError>;
}
