use crate::fake_host::FakeObject;
use dbscout_core::{
    ColumnMeta, EventSource, HostObject, HostValue, QueryResult, Row, Value, Visibility,
};
use std::sync::Arc;
use std::time::Duration;

pub const EXPLORER_SERVICE_TYPE: &str =
    "Microsoft.SqlServer.Management.UI.VSIntegration.ObjectExplorer.ObjectExplorerService";
pub const TREE_CONTROL_TYPE: &str =
    "Microsoft.SqlServer.Management.UI.VSIntegration.ObjectExplorer.ObjectExplorerTreeControl";
pub const CONTAINER_TYPE: &str = "System.ComponentModel.Container";
pub const CONTEXT_SERVICE_TYPE: &str =
    "Microsoft.SqlServer.Management.UI.VSIntegration.ObjectExplorer.ContextService";
const CONTEXT_TYPE: &str =
    "Microsoft.SqlServer.Management.UI.VSIntegration.ObjectExplorer.ObjectExplorerContext";
const NODE_FILTER_SERVICE_TYPE: &str =
    "Microsoft.SqlServer.Management.UI.VSIntegration.ObjectExplorer.NodeFilterService";

pub fn table_result(columns: Vec<ColumnMeta>, rows: Vec<Row>) -> QueryResult {
    QueryResult::new(columns, rows, Duration::ZERO)
}

pub fn column(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> ColumnMeta {
    ColumnMeta {
        name: name.into(),
        type_name: type_name.into(),
        nullable,
    }
}

pub fn text_cell(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

/// Result shaped like the `sys.databases` query: one `DatabaseName` column.
pub fn database_names_result(names: &[&str]) -> QueryResult {
    table_result(
        vec![column("DatabaseName", "nvarchar", false)],
        names.iter().map(|name| vec![text_cell(*name)]).collect(),
    )
}

/// How the `hierarchies` field of the tree control should look.
#[derive(Clone)]
enum Hierarchies {
    Entries(Vec<(String, HostValue)>),
    Missing,
    Raw(HostValue),
}

/// How the `Components` property of the service container should look.
#[derive(Clone)]
enum Components {
    Standard,
    Missing,
    Raw(HostValue),
}

/// Builds an object-explorer service graph with the member layout the
/// reflective adapter navigates.
#[derive(Clone)]
pub struct ExplorerGraph {
    hierarchies: Hierarchies,
    with_tree: bool,
    with_context_service: bool,
    with_context_property: bool,
    components: Components,
    context_event: Option<Arc<dyn EventSource>>,
}

impl Default for ExplorerGraph {
    fn default() -> Self {
        Self {
            hierarchies: Hierarchies::Entries(Vec::new()),
            with_tree: true,
            with_context_service: true,
            with_context_property: true,
            components: Components::Standard,
            context_event: None,
        }
    }
}

impl ExplorerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(self, name: &str, root: Arc<dyn HostObject>) -> Self {
        self.with_entry(name, HostValue::Object(root))
    }

    /// Adds a raw `hierarchies` entry, e.g. a non-object value.
    pub fn with_entry(mut self, name: &str, value: HostValue) -> Self {
        match &mut self.hierarchies {
            Hierarchies::Entries(entries) => entries.push((name.to_string(), value)),
            other => *other = Hierarchies::Entries(vec![(name.to_string(), value)]),
        }
        self
    }

    pub fn without_hierarchies(mut self) -> Self {
        self.hierarchies = Hierarchies::Missing;
        self
    }

    pub fn with_hierarchies_value(mut self, value: HostValue) -> Self {
        self.hierarchies = Hierarchies::Raw(value);
        self
    }

    pub fn without_tree(mut self) -> Self {
        self.with_tree = false;
        self
    }

    pub fn without_context_service(mut self) -> Self {
        self.with_context_service = false;
        self
    }

    /// Keeps the context service but drops its `ObjectExplorerContext`.
    pub fn without_context_property(mut self) -> Self {
        self.with_context_property = false;
        self
    }

    pub fn without_components(mut self) -> Self {
        self.components = Components::Missing;
        self
    }

    pub fn with_components_value(mut self, value: HostValue) -> Self {
        self.components = Components::Raw(value);
        self
    }

    pub fn with_context_event(mut self, source: Arc<dyn EventSource>) -> Self {
        self.context_event = Some(source);
        self
    }

    pub fn build(self) -> Arc<dyn HostObject> {
        let mut service = FakeObject::new(EXPLORER_SERVICE_TYPE)
            .with_property("Container", Visibility::Public, self.container());

        if self.with_tree {
            service = service.with_property("Tree", Visibility::NonPublic, self.tree());
        }

        service.into_object()
    }

    fn tree(&self) -> HostValue {
        let tree = FakeObject::new(TREE_CONTROL_TYPE);

        let tree = match &self.hierarchies {
            Hierarchies::Entries(entries) => tree.with_field(
                "hierarchies",
                Visibility::NonPublic,
                HostValue::Map(entries.clone()),
            ),
            Hierarchies::Missing => tree,
            Hierarchies::Raw(value) => {
                tree.with_field("hierarchies", Visibility::NonPublic, value.clone())
            }
        };

        tree.into_value()
    }

    fn container(&self) -> HostValue {
        let container = FakeObject::new(CONTAINER_TYPE);

        match &self.components {
            Components::Standard => container
                .with_property("Components", Visibility::Public, self.components())
                .into_value(),
            Components::Missing => container.into_value(),
            Components::Raw(value) => container
                .with_property("Components", Visibility::Public, value.clone())
                .into_value(),
        }
    }

    fn components(&self) -> HostValue {
        let mut components = vec![FakeObject::new(NODE_FILTER_SERVICE_TYPE).into_value()];

        if self.with_context_service {
            let mut context = FakeObject::new(CONTEXT_TYPE);
            if let Some(source) = &self.context_event {
                context = context.with_event("CurrentContextChanged", source.clone());
            }

            let mut context_service = FakeObject::new(CONTEXT_SERVICE_TYPE);
            if self.with_context_property {
                context_service = context_service.with_property(
                    "ObjectExplorerContext",
                    Visibility::Public,
                    context.into_value(),
                );
            }

            components.push(context_service.into_value());
        }

        HostValue::List(components)
    }
}
