use crate::snapshot::{HostSnapshot, SnapshotHost};
use dbscout_core::{
    CatalogAggregator, ConnectionDescriptor, DbDriver, Discovery, DiscoveryConfig,
    DiscoveryConfigStore, FailurePolicy, LogDiagnostics, SqlDatabaseEnumerator,
};
use dbscout_driver_mssql::MssqlDriver;
use log::info;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

const EXIT_OK: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_PARTIAL: i32 = 2;

const USAGE: &str = "\
Usage:
  dbscout discover <snapshot.json> [--abort-on-error] [--config <config.json>]
  dbscout help

Prints the discovered database catalog as JSON on stdout.
Exit status: 0 all servers enumerated, 2 some servers failed, 1 discovery failed.";

#[derive(Debug, Clone, PartialEq, Eq)]
struct DiscoverOptions {
    snapshot: PathBuf,
    config: Option<PathBuf>,
    abort_on_error: bool,
}

pub fn run(args: &[String]) -> i32 {
    match args.get(1).map(|s| s.as_str()) {
        Some("discover") => match parse_discover_args(&args[2..]) {
            Ok(options) => {
                let driver: Arc<dyn DbDriver> = Arc::new(MssqlDriver::new());
                discover(&options, driver, &mut io::stdout(), &mut io::stderr())
            }
            Err(message) => {
                eprintln!("{}\n\n{}", message, USAGE);
                EXIT_FAILED
            }
        },
        Some("help") | Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            EXIT_OK
        }
        Some(other) => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            EXIT_FAILED
        }
        None => {
            eprintln!("{}", USAGE);
            EXIT_FAILED
        }
    }
}

fn parse_discover_args(args: &[String]) -> Result<DiscoverOptions, String> {
    let mut snapshot = None;
    let mut config = None;
    let mut abort_on_error = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--abort-on-error" => abort_on_error = true,
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| "--config needs a path".to_string())?;
                config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown option: {}", flag)),
            path if snapshot.is_none() => snapshot = Some(PathBuf::from(path)),
            extra => return Err(format!("Unexpected argument: {}", extra)),
        }
    }

    let snapshot = snapshot.ok_or_else(|| "Missing snapshot path".to_string())?;

    Ok(DiscoverOptions {
        snapshot,
        config,
        abort_on_error,
    })
}

fn load_config(options: &DiscoverOptions) -> Result<DiscoveryConfig, String> {
    let store = match &options.config {
        Some(path) => DiscoveryConfigStore::at(path),
        None => DiscoveryConfigStore::new().map_err(|e| e.to_string())?,
    };

    info!("Loading config from {}", store.path().display());
    let config = store.load().map_err(|e| e.to_string())?;

    Ok(if options.abort_on_error {
        config.with_failure_policy(FailurePolicy::AbortPass)
    } else {
        config
    })
}

fn discover(
    options: &DiscoverOptions,
    driver: Arc<dyn DbDriver>,
    out: &mut impl Write,
    err: &mut impl Write,
) -> i32 {
    let config = match load_config(options) {
        Ok(config) => config,
        Err(e) => {
            let _ = writeln!(err, "Failed to load config: {}", e);
            return EXIT_FAILED;
        }
    };

    let snapshot = match HostSnapshot::load(&options.snapshot) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let _ = writeln!(err, "{}: {}", options.snapshot.display(), e);
            return EXIT_FAILED;
        }
    };

    let host = SnapshotHost::new(&snapshot);
    let enumerator = SqlDatabaseEnumerator::from_config(driver, &config);
    let diagnostics = LogDiagnostics;

    let discovery = CatalogAggregator::new(&host, &enumerator, &diagnostics)
        .with_config(&config)
        .discover();

    for failure in discovery.failures() {
        let _ = writeln!(err, "error: {}", failure);
    }

    let exit_code = match &discovery {
        Discovery::Complete(_) => EXIT_OK,
        Discovery::Partial { .. } => EXIT_PARTIAL,
        Discovery::Failed(_) => return EXIT_FAILED,
    };

    let catalog: BTreeMap<String, ConnectionDescriptor> =
        discovery.into_catalog().into_map().into_iter().collect();

    match serde_json::to_string_pretty(&catalog) {
        Ok(json) => {
            let _ = writeln!(out, "{}", json);
            exit_code
        }
        Err(e) => {
            let _ = writeln!(err, "Failed to render catalog: {}", e);
            EXIT_FAILED
        }
    }
}
