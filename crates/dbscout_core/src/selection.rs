use crate::{
    Capability, DiscoveryConfig, HostAdapter, HostError, MenuHandler, MenuItem, NodesChangedEvent,
    NodesChangedHandler, Service,
};
use log::{debug, info, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Menu injection bookkeeping, shared between the bridge and its handler.
///
/// Lives as long as the plugin instance. The anchor is set at most once.
#[derive(Default)]
pub struct SubscriptionState {
    menu_anchor: Option<Arc<dyn MenuHandler>>,
    has_subscribed: bool,
}

pub type SharedSubscriptionState = Arc<Mutex<SubscriptionState>>;

impl SubscriptionState {
    pub fn shared() -> SharedSubscriptionState {
        Arc::new(Mutex::new(Self::default()))
    }

    pub fn has_subscribed(&self) -> bool {
        self.has_subscribed
    }

    pub fn has_menu_anchor(&self) -> bool {
        self.menu_anchor.is_some()
    }
}

impl fmt::Debug for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionState")
            .field("menu_anchor", &self.menu_anchor.is_some())
            .field("has_subscribed", &self.has_subscribed)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Unwired,
    Wired,
}

/// Hooks the explorer's selection-changed event and injects a menu item
/// into the first node matching `target_path`.
pub struct SelectionBridge {
    host: Arc<dyn HostAdapter>,
    subscription: SharedSubscriptionState,
    target_path: String,
    menu_item: MenuItem,
    state: BridgeState,
}

impl SelectionBridge {
    pub fn new(
        host: Arc<dyn HostAdapter>,
        subscription: SharedSubscriptionState,
        target_path: impl Into<String>,
        menu_item: MenuItem,
    ) -> Self {
        Self {
            host,
            subscription,
            target_path: target_path.into(),
            menu_item,
            state: BridgeState::Unwired,
        }
    }

    pub fn from_config(
        host: Arc<dyn HostAdapter>,
        subscription: SharedSubscriptionState,
        config: &DiscoveryConfig,
    ) -> Self {
        Self::new(
            host,
            subscription,
            config.menu_target_path.clone(),
            MenuItem::new(config.menu_item_label.clone()),
        )
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Subscribes to the host's selection-changed event.
    ///
    /// Stays `Unwired` when the explorer service or the event is not
    /// available yet, so the caller can retry later. A broken member chain
    /// on the way to the event is returned as an error. Once `Wired`,
    /// further calls do nothing.
    pub fn wire(&mut self) -> Result<BridgeState, HostError> {
        if self.state == BridgeState::Wired {
            return Ok(self.state);
        }

        let Some(service) = self.host.object_explorer_service() else {
            debug!("Object explorer service not available yet");
            return Ok(self.state);
        };

        let Some(source) = self.host.find_context_change_source(&service)? else {
            debug!("Explorer context exposes no selection-changed event");
            return Ok(self.state);
        };

        let subscription = self.subscription.clone();
        let target_path = self.target_path.clone();
        let menu_item = self.menu_item.clone();
        let handler: NodesChangedHandler = Arc::new(move |event: &NodesChangedEvent| {
            on_nodes_changed(&subscription, &target_path, &menu_item, event);
        });

        source.add_handler(handler);
        self.state = BridgeState::Wired;
        info!("Subscribed to object explorer selection changes");

        Ok(self.state)
    }
}

fn on_nodes_changed(
    subscription: &Mutex<SubscriptionState>,
    target_path: &str,
    menu_item: &MenuItem,
    event: &NodesChangedEvent,
) {
    let Some(node) = event.changed_nodes.first() else {
        return;
    };

    debug!(
        "Selection changed: path={} name={} context={}",
        node.urn_path(),
        node.name(),
        node.context()
    );

    if node.urn_path() != target_path || mutex_lock(subscription).menu_anchor.is_some() {
        return;
    }

    // Host calls may re-enter this handler; never hold the lock across them.
    let Some(Service::MenuHandler(menu)) = node.get_service(Capability::MenuHandler) else {
        warn!("Node {} has no menu handler", node.urn_path());
        return;
    };

    {
        let mut state = mutex_lock(subscription);
        if state.menu_anchor.is_some() {
            return;
        }
        state.menu_anchor = Some(menu.clone());
        state.has_subscribed = true;
    }

    menu.add_child("", menu_item.clone());
    info!("Added '{}' to the {} menu", menu_item.label, target_path);
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}
