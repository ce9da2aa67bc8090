use crate::{
    EventSource, HierarchyRoot, HostAdapter, HostError, HostObject, HostValue, Visibility,
};
use log::debug;
use std::sync::Arc;

const TREE_PROPERTY: &str = "Tree";
const HIERARCHIES_FIELD: &str = "hierarchies";
const CONTAINER_PROPERTY: &str = "Container";
const COMPONENTS_PROPERTY: &str = "Components";
const CONTEXT_SERVICE_MARKER: &str = "ContextService";
const CONTEXT_PROPERTY: &str = "ObjectExplorerContext";
const CONTEXT_CHANGED_EVENT: &str = "CurrentContextChanged";

/// Resolves host services by type, the way the hosting package does.
pub trait ServiceLocator {
    fn object_explorer_service(&self) -> Option<Arc<dyn HostObject>>;
}

impl<F> ServiceLocator for F
where
    F: Fn() -> Option<Arc<dyn HostObject>>,
{
    fn object_explorer_service(&self) -> Option<Arc<dyn HostObject>> {
        self()
    }
}

/// [`HostAdapter`] that navigates the host's internal members by name.
///
/// Member names follow the explorer's conventions:
///
/// - tree roots: service → `Tree` (non-public property) → `hierarchies`
///   (non-public field, a name → root map)
/// - selection event: service → `Container` → `Components` → the component
///   whose type name contains `ContextService` → `ObjectExplorerContext` →
///   `CurrentContextChanged`
pub struct ReflectiveHostAdapter<L> {
    locator: L,
}

impl<L: ServiceLocator> ReflectiveHostAdapter<L> {
    pub fn new(locator: L) -> Self {
        Self { locator }
    }

    fn tree_control(&self) -> Result<Arc<dyn HostObject>, HostError> {
        let service = self.locator.object_explorer_service().ok_or_else(|| {
            HostError::ServiceUnavailable("object explorer service".to_string())
        })?;

        require_object(&service, TREE_PROPERTY, Visibility::NonPublic)
    }
}

impl<L: ServiceLocator> HostAdapter for ReflectiveHostAdapter<L> {
    fn tree_roots(&self) -> Result<Vec<HierarchyRoot>, HostError> {
        let tree = self.tree_control()?;

        let Some(hierarchies) = tree.field(HIERARCHIES_FIELD, Visibility::NonPublic) else {
            debug!(
                "{} has no {} field, no roots to walk",
                tree.type_name(),
                HIERARCHIES_FIELD
            );
            return Ok(Vec::new());
        };

        let HostValue::Map(entries) = hierarchies else {
            return Err(HostError::unexpected_shape(
                tree.type_name(),
                HIERARCHIES_FIELD,
                "map of hierarchy roots",
            ));
        };

        Ok(entries
            .into_iter()
            .filter_map(|(name, value)| match value {
                HostValue::Object(root) => Some(HierarchyRoot::new(name, root)),
                other => {
                    debug!("Hierarchy '{}' is a {}, skipping", name, other.kind_name());
                    None
                }
            })
            .collect())
    }

    fn object_explorer_service(&self) -> Option<Arc<dyn HostObject>> {
        self.locator.object_explorer_service()
    }

    fn find_context_change_source(
        &self,
        service: &Arc<dyn HostObject>,
    ) -> Result<Option<Arc<dyn EventSource>>, HostError> {
        let container = require_object(service, CONTAINER_PROPERTY, Visibility::Public)?;

        let context_service = match container.property(COMPONENTS_PROPERTY, Visibility::Public) {
            Some(HostValue::List(components)) => components
                .into_iter()
                .filter_map(|component| component.as_object().cloned())
                .find(|component| component.type_name().contains(CONTEXT_SERVICE_MARKER)),
            None | Some(HostValue::Null) => {
                return Err(HostError::member_not_found(
                    container.type_name(),
                    COMPONENTS_PROPERTY,
                ));
            }
            Some(_) => {
                return Err(HostError::unexpected_shape(
                    container.type_name(),
                    COMPONENTS_PROPERTY,
                    "list of components",
                ));
            }
        };

        let context_service = context_service.ok_or_else(|| {
            HostError::member_not_found(container.type_name(), CONTEXT_SERVICE_MARKER)
        })?;

        let context = require_object(&context_service, CONTEXT_PROPERTY, Visibility::Public)?;

        Ok(context.event(CONTEXT_CHANGED_EVENT))
    }
}

fn require_object(
    owner: &Arc<dyn HostObject>,
    member: &str,
    visibility: Visibility,
) -> Result<Arc<dyn HostObject>, HostError> {
    match owner.property(member, visibility) {
        Some(HostValue::Object(object)) => Ok(object),
        None | Some(HostValue::Null) => {
            Err(HostError::member_not_found(owner.type_name(), member))
        }
        Some(_) => Err(HostError::unexpected_shape(
            owner.type_name(),
            member,
            "object",
        )),
    }
}
