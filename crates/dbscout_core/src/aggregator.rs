use crate::{
    Catalog, DatabaseEnumerator, DescriptorBuilder, DiagnosticsSink, DiscoveryConfig,
    DiscoveryError, DuplicatePolicy, FailurePolicy, HierarchyWalker, HostAdapter, InsertOutcome,
    RawServerConnection,
};
use log::{info, warn};

/// Outcome of one discovery pass.
#[derive(Debug)]
pub enum Discovery {
    /// Every server was enumerated.
    Complete(Catalog),

    /// Some servers failed; `catalog` holds what the others produced.
    Partial {
        catalog: Catalog,
        failures: Vec<DiscoveryError>,
    },

    /// The host tree could not be read, nothing was enumerated.
    Failed(DiscoveryError),
}

impl Discovery {
    pub fn is_complete(&self) -> bool {
        matches!(self, Discovery::Complete(_))
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        match self {
            Discovery::Complete(catalog) | Discovery::Partial { catalog, .. } => Some(catalog),
            Discovery::Failed(_) => None,
        }
    }

    pub fn failures(&self) -> Vec<&DiscoveryError> {
        match self {
            Discovery::Complete(_) => Vec::new(),
            Discovery::Partial { failures, .. } => failures.iter().collect(),
            Discovery::Failed(error) => vec![error],
        }
    }

    /// The accumulated catalog; empty when the pass failed outright.
    pub fn into_catalog(self) -> Catalog {
        match self {
            Discovery::Complete(catalog) | Discovery::Partial { catalog, .. } => catalog,
            Discovery::Failed(_) => Catalog::new(),
        }
    }
}

/// Builds the full catalog: walk the host tree, then expand every server.
pub struct CatalogAggregator<'a> {
    host: &'a dyn HostAdapter,
    enumerator: &'a dyn DatabaseEnumerator,
    diagnostics: &'a dyn DiagnosticsSink,
    failure_policy: FailurePolicy,
    duplicate_policy: DuplicatePolicy,
}

impl<'a> CatalogAggregator<'a> {
    pub fn new(
        host: &'a dyn HostAdapter,
        enumerator: &'a dyn DatabaseEnumerator,
        diagnostics: &'a dyn DiagnosticsSink,
    ) -> Self {
        Self {
            host,
            enumerator,
            diagnostics,
            failure_policy: FailurePolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_config(mut self, config: &DiscoveryConfig) -> Self {
        self.failure_policy = config.failure_policy;
        self.duplicate_policy = config.duplicate_policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Runs one discovery pass and reports exactly what happened.
    ///
    /// All raw connections are read from the host before the first query
    /// runs. Nothing is sent to the diagnostics sink; see [`Self::discover_all`].
    pub fn discover(&self) -> Discovery {
        let servers: Vec<RawServerConnection> =
            match HierarchyWalker::new(self.host).raw_connections() {
                Ok(connections) => connections.collect(),
                Err(e) => return Discovery::Failed(e.into()),
            };

        info!("Found {} SQL Server connections in the explorer", servers.len());

        let builder = DescriptorBuilder::new(self.enumerator);
        let mut catalog = Catalog::new();
        let mut failures = Vec::new();

        for server in &servers {
            match self.expand_into(&builder, server, &mut catalog) {
                Ok(()) => {}
                Err(e) => {
                    warn!("Hierarchy '{}': {}", server.hierarchy, e);
                    failures.push(e);

                    if self.failure_policy == FailurePolicy::AbortPass {
                        warn!("Aborting discovery pass after first failure");
                        break;
                    }
                }
            }
        }

        info!(
            "Discovery finished with {} databases and {} failures",
            catalog.len(),
            failures.len()
        );

        if failures.is_empty() {
            Discovery::Complete(catalog)
        } else {
            Discovery::Partial { catalog, failures }
        }
    }

    /// Never-failing variant of [`Self::discover`].
    ///
    /// Every failure is forwarded to the diagnostics sink and whatever was
    /// accumulated (possibly nothing) is returned.
    pub fn discover_all(&self) -> Catalog {
        let discovery = self.discover();

        for failure in discovery.failures() {
            self.diagnostics.track_exception(failure);
        }

        discovery.into_catalog()
    }

    fn expand_into(
        &self,
        builder: &DescriptorBuilder<'_>,
        server: &RawServerConnection,
        catalog: &mut Catalog,
    ) -> Result<(), DiscoveryError> {
        let mut collision = None;

        for descriptor in builder.expand(&server.connection_string)? {
            let caption = descriptor.caption().to_string();

            match catalog.insert(descriptor, self.duplicate_policy) {
                Ok(InsertOutcome::Skipped) => {
                    warn!("Skipping duplicate catalog entry {}", caption);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Duplicate catalog entry {}", caption);
                    collision.get_or_insert(e);
                }
            }
        }

        match collision {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
