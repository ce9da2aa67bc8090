use dbscout_core::{
    BridgeState, DEFAULT_MENU_ITEM_LABEL, DiscoveryConfig, ExplorerNode, HostAdapter, HostError,
    HostObject, MenuHandler, MenuItem, NodesChangedEvent, ReflectiveHostAdapter, SelectionBridge,
    SharedSubscriptionState, SubscriptionState,
};
use dbscout_test_support::{
    ExplorerGraph, FakeEventSource, FakeExplorerNode, FakeHost, RecordingMenuHandler,
};
use std::sync::{Arc, Mutex};

const DATABASE_PATH: &str = "Server/Database";

fn bridge_for(host: FakeHost) -> (SelectionBridge, SharedSubscriptionState) {
    let subscription = SubscriptionState::shared();
    let bridge = SelectionBridge::from_config(
        Arc::new(host),
        subscription.clone(),
        &DiscoveryConfig::default(),
    );
    (bridge, subscription)
}

fn wired(source: &Arc<FakeEventSource>) -> (SelectionBridge, SharedSubscriptionState) {
    let (mut bridge, subscription) =
        bridge_for(FakeHost::new().with_event_source(source.clone()));
    assert_eq!(bridge.wire(), Ok(BridgeState::Wired));
    (bridge, subscription)
}

fn has_subscribed(subscription: &SharedSubscriptionState) -> bool {
    subscription.lock().unwrap().has_subscribed()
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

#[test]
fn wire_without_service_stays_unwired() {
    let (mut bridge, _) = bridge_for(FakeHost::new());

    assert_eq!(bridge.wire(), Ok(BridgeState::Unwired));
    assert_eq!(bridge.state(), BridgeState::Unwired);
}

#[test]
fn wire_without_event_stays_unwired() {
    let (mut bridge, _) = bridge_for(FakeHost::new().with_service_only());

    assert_eq!(bridge.wire(), Ok(BridgeState::Unwired));
}

#[test]
fn wire_reports_shape_mismatch() {
    let error = HostError::member_not_found("System.ComponentModel.Container", "ContextService");
    let (mut bridge, _) = bridge_for(FakeHost::new().with_context_error(error.clone()));

    assert_eq!(bridge.wire(), Err(error));
    assert_eq!(bridge.state(), BridgeState::Unwired);
}

#[test]
fn wire_twice_subscribes_once() {
    let source = FakeEventSource::new();
    let (mut bridge, _) = wired(&source);

    assert_eq!(bridge.wire(), Ok(BridgeState::Wired));
    assert_eq!(source.handler_count(), 1);
}

// ---------------------------------------------------------------------------
// Menu injection
// ---------------------------------------------------------------------------

#[test]
fn database_selection_injects_menu_once() {
    let source = FakeEventSource::new();
    let (_bridge, subscription) = wired(&source);
    let menu = RecordingMenuHandler::new();

    source.emit(
        &FakeExplorerNode::new(DATABASE_PATH, "sales")
            .with_menu(menu.clone())
            .into_event(),
    );
    source.emit(
        &FakeExplorerNode::new(DATABASE_PATH, "hr")
            .with_menu(menu.clone())
            .into_event(),
    );

    assert_eq!(
        menu.items(),
        vec![(String::new(), MenuItem::new(DEFAULT_MENU_ITEM_LABEL))]
    );
    assert!(has_subscribed(&subscription));
    assert!(subscription.lock().unwrap().has_menu_anchor());
}

#[test]
fn other_paths_never_inject() {
    let source = FakeEventSource::new();
    let (_bridge, subscription) = wired(&source);
    let menu = RecordingMenuHandler::new();

    for path in ["Server", "Server/Database/Table", "server/database"] {
        source.emit(
            &FakeExplorerNode::new(path, "node")
                .with_menu(menu.clone())
                .into_event(),
        );
    }

    assert!(menu.items().is_empty());
    assert!(!has_subscribed(&subscription));
    assert!(!subscription.lock().unwrap().has_menu_anchor());
}

#[test]
fn node_without_menu_handler_leaves_anchor_unset() {
    let source = FakeEventSource::new();
    let (_bridge, subscription) = wired(&source);

    source.emit(&FakeExplorerNode::new(DATABASE_PATH, "sales").into_event());
    assert!(!has_subscribed(&subscription));

    let menu = RecordingMenuHandler::new();
    source.emit(
        &FakeExplorerNode::new(DATABASE_PATH, "sales")
            .with_menu(menu.clone())
            .into_event(),
    );

    assert_eq!(menu.items().len(), 1);
    assert!(has_subscribed(&subscription));
}

#[test]
fn empty_notification_is_ignored() {
    let source = FakeEventSource::new();
    let (_bridge, subscription) = wired(&source);

    source.emit(&NodesChangedEvent::default());

    assert!(!has_subscribed(&subscription));
}

#[test]
fn only_the_first_changed_node_is_inspected() {
    let source = FakeEventSource::new();
    let (_bridge, _) = wired(&source);
    let menu = RecordingMenuHandler::new();

    let first = FakeExplorerNode::new("Server", "srv");
    let second = FakeExplorerNode::new(DATABASE_PATH, "sales").with_menu(menu.clone());
    let nodes: Vec<Arc<dyn ExplorerNode>> = vec![Arc::new(first), Arc::new(second)];
    source.emit(&NodesChangedEvent::new(nodes));

    assert!(menu.items().is_empty());
}

/// Menu handler that raises further selection changes while it is being
/// populated, the way a host refreshing its tree would.
struct ReentrantMenuHandler {
    source: Arc<FakeEventSource>,
    items: Mutex<Vec<MenuItem>>,
}

impl MenuHandler for ReentrantMenuHandler {
    fn add_child(&self, _key: &str, item: MenuItem) {
        self.items.lock().unwrap().push(item);
        self.source
            .emit(&FakeExplorerNode::new("Server", "srv").into_event());
        self.source
            .emit(&FakeExplorerNode::new(DATABASE_PATH, "hr").into_event());
    }
}

#[test]
fn notification_raised_while_adding_menu_item_is_ignored() {
    let source = FakeEventSource::new();
    let (_bridge, subscription) = wired(&source);
    let menu = Arc::new(ReentrantMenuHandler {
        source: source.clone(),
        items: Mutex::new(Vec::new()),
    });

    source.emit(
        &FakeExplorerNode::new(DATABASE_PATH, "sales")
            .with_menu(menu.clone())
            .into_event(),
    );

    assert_eq!(menu.items.lock().unwrap().len(), 1);
    assert!(has_subscribed(&subscription));
}

#[test]
fn subscription_state_is_shared_across_bridges() {
    let source = FakeEventSource::new();
    let subscription = SubscriptionState::shared();
    let menu_item = MenuItem::new("Browse");

    for _ in 0..2 {
        let mut bridge = SelectionBridge::new(
            Arc::new(FakeHost::new().with_event_source(source.clone())),
            subscription.clone(),
            "Server/Database",
            menu_item.clone(),
        );
        assert_eq!(bridge.wire(), Ok(BridgeState::Wired));
    }

    let menu = RecordingMenuHandler::new();
    source.emit(
        &FakeExplorerNode::new(DATABASE_PATH, "sales")
            .with_menu(menu.clone())
            .into_event(),
    );

    assert_eq!(source.handler_count(), 2);
    assert_eq!(menu.items(), vec![(String::new(), menu_item)]);
}

#[test]
fn configured_target_path_and_label_are_honored() {
    let source = FakeEventSource::new();
    let config = DiscoveryConfig {
        menu_target_path: "Server/Database/Table".to_string(),
        menu_item_label: "Scout table".to_string(),
        ..DiscoveryConfig::default()
    };
    let mut bridge = SelectionBridge::from_config(
        Arc::new(FakeHost::new().with_event_source(source.clone())),
        SubscriptionState::shared(),
        &config,
    );
    assert_eq!(bridge.wire(), Ok(BridgeState::Wired));

    let menu = RecordingMenuHandler::new();
    source.emit(
        &FakeExplorerNode::new(DATABASE_PATH, "sales")
            .with_menu(menu.clone())
            .into_event(),
    );
    source.emit(
        &FakeExplorerNode::new("Server/Database/Table", "orders")
            .with_menu(menu.clone())
            .into_event(),
    );

    assert_eq!(
        menu.items(),
        vec![(String::new(), MenuItem::new("Scout table"))]
    );
}

// ---------------------------------------------------------------------------
// Through the reflective adapter
// ---------------------------------------------------------------------------

fn reflective_host(service: Arc<dyn HostObject>) -> Arc<dyn HostAdapter> {
    Arc::new(ReflectiveHostAdapter::new(move || Some(service.clone())))
}

#[test]
fn reflective_host_wires_and_injects() {
    let source = FakeEventSource::new();
    let service = ExplorerGraph::new()
        .with_context_event(source.clone())
        .build();
    let subscription = SubscriptionState::shared();
    let mut bridge = SelectionBridge::from_config(
        reflective_host(service),
        subscription.clone(),
        &DiscoveryConfig::default(),
    );

    assert_eq!(bridge.wire(), Ok(BridgeState::Wired));

    let menu = RecordingMenuHandler::new();
    source.emit(
        &FakeExplorerNode::new(DATABASE_PATH, "sales")
            .with_menu(menu.clone())
            .into_event(),
    );

    assert_eq!(menu.items().len(), 1);
    assert!(has_subscribed(&subscription));
}

#[test]
fn reflective_host_without_context_service_is_a_shape_mismatch() {
    let service = ExplorerGraph::new().without_context_service().build();
    let mut bridge = SelectionBridge::from_config(
        reflective_host(service),
        SubscriptionState::shared(),
        &DiscoveryConfig::default(),
    );

    assert!(matches!(
        bridge.wire(),
        Err(HostError::MemberNotFound { member, .. }) if member == "ContextService"
    ));
}

#[test]
fn reflective_host_without_event_stays_unwired() {
    let service = ExplorerGraph::new().build();
    let mut bridge = SelectionBridge::from_config(
        reflective_host(service),
        SubscriptionState::shared(),
        &DiscoveryConfig::default(),
    );

    assert_eq!(bridge.wire(), Ok(BridgeState::Unwired));
}
