use dbscout_core::{
    Capability, DiagnosticsSink, EventSource, ExplorerNode, HierarchyRoot, HostAdapter,
    HostConnection, HostError, HostObject, HostValue, MenuHandler, MenuItem, NodeInformation,
    NodesChangedEvent, NodesChangedHandler, Service, SqlConnectionInfo, Visibility,
};
use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A host object assembled member by member.
#[derive(Clone, Default)]
pub struct FakeObject {
    type_name: String,
    properties: HashMap<(String, Visibility), HostValue>,
    fields: HashMap<(String, Visibility), HostValue>,
    events: HashMap<String, Arc<dyn EventSource>>,
    services: HashMap<Capability, Service>,
}

impl FakeObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, name: &str, visibility: Visibility, value: HostValue) -> Self {
        self.properties.insert((name.to_string(), visibility), value);
        self
    }

    pub fn with_field(mut self, name: &str, visibility: Visibility, value: HostValue) -> Self {
        self.fields.insert((name.to_string(), visibility), value);
        self
    }

    pub fn with_event(mut self, name: &str, source: Arc<dyn EventSource>) -> Self {
        self.events.insert(name.to_string(), source);
        self
    }

    pub fn with_service(mut self, capability: Capability, service: Service) -> Self {
        self.services.insert(capability, service);
        self
    }

    pub fn into_object(self) -> Arc<dyn HostObject> {
        Arc::new(self)
    }

    pub fn into_value(self) -> HostValue {
        HostValue::Object(self.into_object())
    }
}

impl HostObject for FakeObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn property(&self, name: &str, visibility: Visibility) -> Option<HostValue> {
        self.properties
            .get(&(name.to_string(), visibility))
            .cloned()
    }

    fn field(&self, name: &str, visibility: Visibility) -> Option<HostValue> {
        self.fields.get(&(name.to_string(), visibility)).cloned()
    }

    fn event(&self, name: &str) -> Option<Arc<dyn EventSource>> {
        self.events.get(name).cloned()
    }

    fn get_service(&self, capability: Capability) -> Option<Service> {
        self.services.get(&capability).cloned()
    }
}

pub struct FakeNodeInformation {
    connection: Option<HostConnection>,
}

impl FakeNodeInformation {
    pub fn new(connection: Option<HostConnection>) -> Self {
        Self { connection }
    }
}

impl NodeInformation for FakeNodeInformation {
    fn connection(&self) -> Option<HostConnection> {
        self.connection.clone()
    }
}

/// A tree root carrying a SQL Server connection.
pub fn sql_server_root(connection_string: &str) -> Arc<dyn HostObject> {
    root_with_connection(Some(HostConnection::SqlServer(SqlConnectionInfo::new(
        connection_string,
    ))))
}

/// A tree root whose node information holds `connection`.
pub fn root_with_connection(connection: Option<HostConnection>) -> Arc<dyn HostObject> {
    FakeObject::new("Microsoft.SqlServer.Management.UI.VSIntegration.ObjectExplorer.NavigableItem")
        .with_service(
            Capability::NodeInformation,
            Service::NodeInformation(Arc::new(FakeNodeInformation::new(connection))),
        )
        .into_object()
}

/// A tree root that answers no capability lookups.
pub fn plain_root(type_name: &str) -> Arc<dyn HostObject> {
    FakeObject::new(type_name).into_object()
}

/// Event source that records handlers and replays events to them.
#[derive(Default)]
pub struct FakeEventSource {
    handlers: Mutex<Vec<NodesChangedHandler>>,
}

impl FakeEventSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn handler_count(&self) -> usize {
        mutex_lock(&self.handlers).len()
    }

    pub fn emit(&self, event: &NodesChangedEvent) {
        let handlers = mutex_lock(&self.handlers).clone();
        for handler in handlers {
            handler(event);
        }
    }
}

impl EventSource for FakeEventSource {
    fn add_handler(&self, handler: NodesChangedHandler) {
        mutex_lock(&self.handlers).push(handler);
    }
}

#[derive(Default)]
pub struct RecordingMenuHandler {
    items: Mutex<Vec<(String, MenuItem)>>,
}

impl RecordingMenuHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn items(&self) -> Vec<(String, MenuItem)> {
        mutex_lock(&self.items).clone()
    }
}

impl MenuHandler for RecordingMenuHandler {
    fn add_child(&self, key: &str, item: MenuItem) {
        mutex_lock(&self.items).push((key.to_string(), item));
    }
}

pub struct FakeExplorerNode {
    urn_path: String,
    name: String,
    context: String,
    menu: Option<Arc<dyn MenuHandler>>,
}

impl FakeExplorerNode {
    pub fn new(urn_path: impl Into<String>, name: impl Into<String>) -> Self {
        let urn_path = urn_path.into();
        let name = name.into();
        Self {
            context: format!("{}[@Name='{}']", urn_path, name),
            urn_path,
            name,
            menu: None,
        }
    }

    pub fn with_menu(mut self, menu: Arc<dyn MenuHandler>) -> Self {
        self.menu = Some(menu);
        self
    }

    pub fn into_event(self) -> NodesChangedEvent {
        let node: Arc<dyn ExplorerNode> = Arc::new(self);
        NodesChangedEvent::new(vec![node])
    }
}

impl ExplorerNode for FakeExplorerNode {
    fn urn_path(&self) -> &str {
        &self.urn_path
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn context(&self) -> &str {
        &self.context
    }

    fn get_service(&self, capability: Capability) -> Option<Service> {
        match capability {
            Capability::MenuHandler => self.menu.clone().map(Service::MenuHandler),
            Capability::NodeInformation => None,
        }
    }
}

/// `HostAdapter` with scripted answers, for code that sits above the adapter.
pub struct FakeHost {
    roots: Vec<HierarchyRoot>,
    tree_error: Option<HostError>,
    service: Option<Arc<dyn HostObject>>,
    context_source: Result<Option<Arc<dyn EventSource>>, HostError>,
    tree_root_calls: AtomicUsize,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            tree_error: None,
            service: None,
            context_source: Ok(None),
            tree_root_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, name: &str, root: Arc<dyn HostObject>) -> Self {
        self.roots.push(HierarchyRoot::new(name, root));
        self
    }

    pub fn with_sql_server(self, name: &str, connection_string: &str) -> Self {
        self.with_root(name, sql_server_root(connection_string))
    }

    pub fn with_tree_error(mut self, error: HostError) -> Self {
        self.tree_error = Some(error);
        self
    }

    /// Publishes an explorer service whose selection event is `source`.
    pub fn with_event_source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.service = Some(FakeObject::new("FakeObjectExplorerService").into_object());
        self.context_source = Ok(Some(source));
        self
    }

    /// Publishes an explorer service without a selection event.
    pub fn with_service_only(mut self) -> Self {
        self.service = Some(FakeObject::new("FakeObjectExplorerService").into_object());
        self.context_source = Ok(None);
        self
    }

    pub fn with_context_error(mut self, error: HostError) -> Self {
        self.service = Some(FakeObject::new("FakeObjectExplorerService").into_object());
        self.context_source = Err(error);
        self
    }

    pub fn tree_root_calls(&self) -> usize {
        self.tree_root_calls.load(Ordering::Relaxed)
    }
}

impl HostAdapter for FakeHost {
    fn tree_roots(&self) -> Result<Vec<HierarchyRoot>, HostError> {
        self.tree_root_calls.fetch_add(1, Ordering::Relaxed);

        match &self.tree_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.roots.clone()),
        }
    }

    fn object_explorer_service(&self) -> Option<Arc<dyn HostObject>> {
        self.service.clone()
    }

    fn find_context_change_source(
        &self,
        _service: &Arc<dyn HostObject>,
    ) -> Result<Option<Arc<dyn EventSource>>, HostError> {
        self.context_source.clone()
    }
}

/// Diagnostics sink that keeps every tracked message.
#[derive(Default)]
pub struct RecordingDiagnostics {
    messages: Mutex<Vec<String>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        mutex_lock(&self.messages).clone()
    }
}

impl DiagnosticsSink for RecordingDiagnostics {
    fn track_exception(&self, error: &dyn Error) {
        mutex_lock(&self.messages).push(error.to_string());
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}
