use crate::{
    ConnectionString, DbDriver, DbError, DiscoveryConfig, QueryRequest, SYSTEM_DATABASES,
};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Online user databases on a SQL Server instance.
pub const ELIGIBLE_DATABASES_SQL: &str = "SELECT name AS DatabaseName FROM sys.databases \
    WHERE state = 0 AND name NOT IN ('master', 'model', 'tempdb', 'msdb', 'Resource');";

/// Lists the databases on a server that are worth offering to the user.
pub trait DatabaseEnumerator {
    fn list_eligible_databases(&self, server: &ConnectionString)
    -> Result<Vec<String>, DbError>;
}

/// [`DatabaseEnumerator`] that runs the `sys.databases` query through a driver.
pub struct SqlDatabaseEnumerator {
    driver: Arc<dyn DbDriver>,
    admin_database: String,
    excluded: Vec<String>,
    timeout: Duration,
}

impl SqlDatabaseEnumerator {
    pub fn new(driver: Arc<dyn DbDriver>) -> Self {
        Self::from_config(driver, &DiscoveryConfig::default())
    }

    pub fn from_config(driver: Arc<dyn DbDriver>, config: &DiscoveryConfig) -> Self {
        Self {
            driver,
            admin_database: config.admin_database.clone(),
            excluded: config.excluded_databases.clone(),
            timeout: config.query_timeout(),
        }
    }

    fn is_excluded(&self, name: &str) -> bool {
        SYSTEM_DATABASES
            .iter()
            .any(|system| system.eq_ignore_ascii_case(name))
            || self
                .excluded
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(name))
    }
}

impl DatabaseEnumerator for SqlDatabaseEnumerator {
    fn list_eligible_databases(
        &self,
        server: &ConnectionString,
    ) -> Result<Vec<String>, DbError> {
        let admin = server.with_initial_catalog(&self.admin_database);
        debug!(
            "Listing databases on {} via {}",
            admin.redacted(),
            self.driver.display_name()
        );

        let mut connection = self.driver.connect(&admin)?;
        let request = QueryRequest::new(ELIGIBLE_DATABASES_SQL).with_timeout(self.timeout);
        let result = connection.execute(&request);

        if let Err(e) = connection.close() {
            warn!("Failed to close connection to {}: {}", admin.redacted(), e);
        }

        let result = result?;

        Ok(result
            .first_column()
            .filter_map(|value| value.as_text())
            .filter(|name| !self.is_excluded(name))
            .collect())
    }
}
