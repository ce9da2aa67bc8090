pub mod containers;
pub mod fake_driver;
pub mod fake_host;
pub mod fixtures;

pub use fake_driver::{FakeDriver, FakeDriverStats, FakeQueryOutcome};
pub use fake_host::{
    FakeEventSource, FakeExplorerNode, FakeHost, FakeNodeInformation, FakeObject,
    RecordingDiagnostics, RecordingMenuHandler, plain_root, root_with_connection,
    sql_server_root,
};
pub use fixtures::ExplorerGraph;
