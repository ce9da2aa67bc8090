use dbscout_core::{
    CatalogAggregator, ConnectionString, DatabaseEnumerator, DbError, DescriptorBuilder, Discovery,
    DiscoveryConfig, DiscoveryError, DuplicatePolicy, ELIGIBLE_DATABASES_SQL, FailurePolicy,
    HierarchyWalker, HostConnection, HostError, NoopDiagnostics, SqlDatabaseEnumerator, Value,
};
use dbscout_test_support::fixtures::{column, table_result, text_cell};
use dbscout_test_support::{
    FakeDriver, FakeHost, FakeQueryOutcome, RecordingDiagnostics, plain_root,
    root_with_connection,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

fn enumerator(driver: &FakeDriver) -> SqlDatabaseEnumerator {
    SqlDatabaseEnumerator::new(driver.clone().as_driver_arc())
}

// ---------------------------------------------------------------------------
// Hierarchy walking
// ---------------------------------------------------------------------------

#[test]
fn walker_yields_only_sql_server_roots() {
    let host = FakeHost::new()
        .with_sql_server("prod", "Data Source=prod")
        .with_root(
            "blob",
            root_with_connection(Some(HostConnection::Other("AzureStorage".to_string()))),
        )
        .with_root("detached", root_with_connection(None))
        .with_root("opaque", plain_root("SomeOtherNode"))
        .with_sql_server("dev", "Data Source=dev");

    let raw: Vec<_> = HierarchyWalker::new(&host)
        .raw_connections()
        .expect("tree should be readable")
        .collect();

    let hierarchies: Vec<&str> = raw.iter().map(|r| r.hierarchy.as_str()).collect();
    assert_eq!(hierarchies, vec!["prod", "dev"]);
    assert_eq!(raw[1].connection_string, "Data Source=dev");
}

#[test]
fn walker_propagates_tree_errors() {
    let host = FakeHost::new().with_tree_error(HostError::member_not_found("Service", "Tree"));

    let result = HierarchyWalker::new(&host).raw_connections();
    assert!(matches!(result, Err(HostError::MemberNotFound { .. })));
}

// ---------------------------------------------------------------------------
// Database enumeration
// ---------------------------------------------------------------------------

#[test]
fn enumerator_connects_to_admin_database_with_timeout() {
    let driver = FakeDriver::new().with_databases("srv", &["sales"]);
    let enumerator = enumerator(&driver);

    let server = "Server=srv;Database=sales;User ID=app".parse().unwrap();
    let databases = enumerator
        .list_eligible_databases(&server)
        .expect("enumeration should succeed");

    assert_eq!(databases, vec!["sales".to_string()]);

    let stats = driver.stats();
    assert_eq!(
        stats.connect_calls,
        vec!["Data Source=srv;Initial Catalog=master;User ID=app".to_string()]
    );
    assert_eq!(stats.executed_requests.len(), 1);
    assert_eq!(stats.executed_requests[0].sql, ELIGIBLE_DATABASES_SQL);
    assert_eq!(
        stats.executed_requests[0].statement_timeout,
        Some(Duration::from_secs(5))
    );
    assert_eq!(stats.close_calls, 1);
}

#[test]
fn enumerator_filters_system_databases_whatever_the_query_returns() {
    let driver = FakeDriver::new().with_databases(
        "srv",
        &["master", "sales", "TempDB", "model", "msdb", "Resource", "hr"],
    );
    let enumerator = enumerator(&driver);

    let server = "Data Source=srv".parse().unwrap();
    let databases = enumerator.list_eligible_databases(&server).unwrap();

    assert_eq!(databases, vec!["sales".to_string(), "hr".to_string()]);
}

#[test]
fn enumerator_applies_configured_exclusions_and_timeout() {
    let driver = FakeDriver::new().with_databases("srv", &["sales", "scratch"]);
    let config = DiscoveryConfig {
        query_timeout_ms: 1500,
        admin_database: "admin".to_string(),
        excluded_databases: vec!["Scratch".to_string()],
        ..DiscoveryConfig::default()
    };
    let enumerator = SqlDatabaseEnumerator::from_config(driver.clone().as_driver_arc(), &config);

    let server = "Data Source=srv".parse().unwrap();
    let databases = enumerator.list_eligible_databases(&server).unwrap();

    assert_eq!(databases, vec!["sales".to_string()]);
    let stats = driver.stats();
    assert_eq!(
        stats.connect_calls,
        vec!["Data Source=srv;Initial Catalog=admin".to_string()]
    );
    assert_eq!(
        stats.executed_requests[0].statement_timeout,
        Some(Duration::from_millis(1500))
    );
}

#[test]
fn enumerator_skips_null_names() {
    let driver = FakeDriver::new();
    driver.set_outcome(
        "srv",
        FakeQueryOutcome::Success(table_result(
            vec![column("DatabaseName", "nvarchar", true)],
            vec![vec![Value::Null], vec![text_cell("sales")]],
        )),
    );
    let enumerator = enumerator(&driver);

    let server = "Data Source=srv".parse().unwrap();
    let databases = enumerator.list_eligible_databases(&server).unwrap();

    assert_eq!(databases, vec!["sales".to_string()]);
}

#[test]
fn enumerator_closes_connection_when_query_fails() {
    let driver = FakeDriver::new().with_query_error("srv", "permission denied");
    let enumerator = enumerator(&driver);

    let server = "Data Source=srv".parse().unwrap();
    let result = enumerator.list_eligible_databases(&server);

    assert!(matches!(result, Err(DbError::QueryFailed(_))));
    assert_eq!(driver.stats().close_calls, 1);
}

// ---------------------------------------------------------------------------
// Descriptor building
// ---------------------------------------------------------------------------

#[test]
fn builder_varies_only_the_catalog() {
    let driver = FakeDriver::new().with_databases("A", &["X", "Y"]);
    let enumerator = enumerator(&driver);

    let descriptors = DescriptorBuilder::new(&enumerator)
        .expand("Server=A;Database=master;User ID=u;Password=p")
        .expect("expansion should succeed");

    let captions: Vec<&str> = descriptors.iter().map(|d| d.caption()).collect();
    assert_eq!(captions, vec!["A.X", "A.Y"]);

    let keys: Vec<&str> = descriptors.iter().map(|d| d.connection_string()).collect();
    assert_eq!(
        keys,
        vec![
            "Data Source=A;Initial Catalog=X;User ID=u;Password=p",
            "Data Source=A;Initial Catalog=Y;User ID=u;Password=p",
        ]
    );

    assert!(descriptors.iter().all(|d| d.is_from_host_tree()));
}

#[test]
fn builder_rejects_unparsable_strings_without_echoing_them() {
    let driver = FakeDriver::new();
    let enumerator = enumerator(&driver);

    let error = DescriptorBuilder::new(&enumerator)
        .expand("Data Source=srv;Password='hunter2")
        .unwrap_err();

    assert!(matches!(
        error,
        DiscoveryError::Server {
            source: DbError::InvalidConnectionString(_),
            ..
        }
    ));
    assert!(!error.to_string().contains("hunter2"));
    assert!(driver.stats().connect_calls.is_empty());
}

#[test]
fn builder_requires_a_data_source() {
    let driver = FakeDriver::new();
    let enumerator = enumerator(&driver);

    let error = DescriptorBuilder::new(&enumerator)
        .expand("Initial Catalog=sales;Password=hunter2")
        .unwrap_err();

    match error {
        DiscoveryError::Server { server, source } => {
            assert_eq!(server, "Initial Catalog=sales;Password=***");
            assert!(matches!(source, DbError::InvalidConnectionString(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[test]
fn catalog_size_is_sum_of_eligible_databases() {
    let host = FakeHost::new()
        .with_sql_server("one", "Data Source=one")
        .with_root("opaque", plain_root("Folder"))
        .with_sql_server("two", "Data Source=two")
        .with_root("detached", root_with_connection(None));
    let driver = FakeDriver::new()
        .with_databases("one", &["a", "b", "master"])
        .with_databases("two", &["c"]);
    let enumerator = enumerator(&driver);
    let diagnostics = RecordingDiagnostics::new();

    let discovery = CatalogAggregator::new(&host, &enumerator, &diagnostics).discover();

    assert!(discovery.is_complete());
    let catalog = discovery.into_catalog();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.sorted_captions(), vec!["one.a", "one.b", "two.c"]);
    assert!(catalog.contains_key("Data Source=two;Initial Catalog=c"));
    assert_eq!(host.tree_root_calls(), 1);
}

#[test]
fn failing_server_is_isolated_and_reported() {
    let host = FakeHost::new()
        .with_sql_server("down", "Data Source=down;Password=hunter2")
        .with_sql_server("up", "Data Source=up");
    let driver = FakeDriver::new()
        .with_connect_error("down", "connection refused")
        .with_databases("up", &["app"]);
    let enumerator = enumerator(&driver);
    let diagnostics = RecordingDiagnostics::new();
    let aggregator = CatalogAggregator::new(&host, &enumerator, &diagnostics);

    match aggregator.discover() {
        Discovery::Partial { catalog, failures } => {
            assert_eq!(catalog.sorted_captions(), vec!["up.app"]);
            assert_eq!(failures.len(), 1);
        }
        other => panic!("expected partial discovery, got {other:?}"),
    }
    assert!(diagnostics.messages().is_empty());

    let catalog = aggregator.discover_all();
    assert_eq!(catalog.len(), 1);

    let messages = diagnostics.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("connection refused"));
    assert!(messages[0].contains("Password=***"));
    assert!(!messages[0].contains("hunter2"));
}

#[test]
fn timeout_is_a_server_failure() {
    let host = FakeHost::new().with_sql_server("slow", "Data Source=slow");
    let driver = FakeDriver::new().with_timeout("slow");
    let enumerator = enumerator(&driver);

    let discovery = CatalogAggregator::new(&host, &enumerator, &NoopDiagnostics).discover();

    let failures = discovery.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        DiscoveryError::Server {
            source: DbError::Timeout,
            ..
        }
    ));
    assert_eq!(discovery.catalog().map(|c| c.len()), Some(0));
}

#[test]
fn abort_pass_stops_at_first_failure() {
    let host = FakeHost::new()
        .with_sql_server("first", "Data Source=first")
        .with_sql_server("down", "Data Source=down")
        .with_sql_server("last", "Data Source=last");
    let driver = FakeDriver::new()
        .with_databases("first", &["a"])
        .with_query_error("down", "boom")
        .with_databases("last", &["z"]);
    let enumerator = enumerator(&driver);

    let discovery = CatalogAggregator::new(&host, &enumerator, &NoopDiagnostics)
        .with_failure_policy(FailurePolicy::AbortPass)
        .discover();

    assert_eq!(discovery.failures().len(), 1);
    assert_eq!(
        discovery.catalog().map(|c| c.sorted_captions()),
        Some(vec!["first.a"])
    );
    assert_eq!(driver.stats().connect_calls.len(), 2);
}

#[test]
fn unreadable_tree_fails_the_pass() {
    let host = FakeHost::new().with_tree_error(HostError::ServiceUnavailable(
        "object explorer service".to_string(),
    ));
    let driver = FakeDriver::new();
    let enumerator = enumerator(&driver);
    let diagnostics = RecordingDiagnostics::new();
    let aggregator = CatalogAggregator::new(&host, &enumerator, &diagnostics);

    assert!(matches!(
        aggregator.discover(),
        Discovery::Failed(DiscoveryError::Host(HostError::ServiceUnavailable(_)))
    ));

    assert!(aggregator.discover_all().is_empty());
    assert_eq!(diagnostics.messages().len(), 1);
    assert!(driver.stats().connect_calls.is_empty());
}

#[test]
fn repeated_passes_produce_equal_catalogs() {
    let host = FakeHost::new()
        .with_sql_server("one", "Data Source=one")
        .with_sql_server("two", "Data Source=two");
    let driver = FakeDriver::new().with_default_databases(&["a", "b"]);
    let enumerator = enumerator(&driver);
    let aggregator = CatalogAggregator::new(&host, &enumerator, &NoopDiagnostics);

    let first = aggregator.discover_all();
    let second = aggregator.discover_all();

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
}

#[test]
fn duplicate_keys_follow_policy() {
    let host = FakeHost::new()
        .with_sql_server("alias-1", "Server=srv")
        .with_sql_server("alias-2", "Data Source=srv");
    let driver = FakeDriver::new().with_databases("srv", &["a"]);
    let enumerator = enumerator(&driver);

    let keep_first = CatalogAggregator::new(&host, &enumerator, &NoopDiagnostics).discover();
    assert!(keep_first.is_complete());
    assert_eq!(keep_first.catalog().map(|c| c.len()), Some(1));

    let overwrite = CatalogAggregator::new(&host, &enumerator, &NoopDiagnostics)
        .with_duplicate_policy(DuplicatePolicy::Overwrite)
        .discover();
    assert!(overwrite.is_complete());

    let fail = CatalogAggregator::new(&host, &enumerator, &NoopDiagnostics)
        .with_config(&DiscoveryConfig::default().with_duplicate_policy(DuplicatePolicy::Fail))
        .discover();
    let failures = fail.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], DiscoveryError::DuplicateKey(caption) if caption == "srv.a"));
    assert_eq!(fail.catalog().map(|c| c.len()), Some(1));
}

#[test]
fn keyword_casing_does_not_split_catalog_entries() {
    let host = FakeHost::new()
        .with_sql_server("upper", "Server=srv;TrustServerCertificate=True")
        .with_sql_server("lower", "Server=srv;trustservercertificate=True");
    let driver = FakeDriver::new().with_databases("srv", &["x"]);
    let enumerator = enumerator(&driver);

    let catalog = CatalogAggregator::new(&host, &enumerator, &NoopDiagnostics).discover_all();

    assert_eq!(catalog.len(), 1);
    assert!(catalog.contains_key("Data Source=srv;TrustServerCertificate=True;Initial Catalog=x"));
}

/// Hands out one scripted database list per call.
struct ScriptedEnumerator {
    lists: Mutex<VecDeque<Vec<String>>>,
}

impl ScriptedEnumerator {
    fn new(lists: &[&[&str]]) -> Self {
        let lists = lists
            .iter()
            .map(|names| names.iter().map(|n| n.to_string()).collect())
            .collect();
        Self {
            lists: Mutex::new(lists),
        }
    }
}

impl DatabaseEnumerator for ScriptedEnumerator {
    fn list_eligible_databases(&self, _: &ConnectionString) -> Result<Vec<String>, DbError> {
        Ok(self.lists.lock().unwrap().pop_front().unwrap_or_default())
    }
}

#[test]
fn fail_policy_still_adds_the_servers_other_databases() {
    let host = FakeHost::new()
        .with_sql_server("first", "Data Source=srv")
        .with_sql_server("second", "Server=srv");
    let enumerator = ScriptedEnumerator::new(&[&["a"], &["a", "b"]]);

    let discovery = CatalogAggregator::new(&host, &enumerator, &NoopDiagnostics)
        .with_duplicate_policy(DuplicatePolicy::Fail)
        .discover();

    let failures = discovery.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], DiscoveryError::DuplicateKey(caption) if caption == "srv.a"));
    assert_eq!(
        discovery.catalog().map(|c| c.sorted_captions()),
        Some(vec!["srv.a", "srv.b"])
    );
}
