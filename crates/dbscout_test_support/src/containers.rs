use dbscout_core::DbError;
use std::time::{Duration, Instant};
use testcontainers::GenericImage;
use testcontainers::clients::Cli;
use testcontainers::core::WaitFor;

pub const MSSQL_SA_PASSWORD: &str = "Dbscout!Passw0rd";

/// Starts a throwaway SQL Server and hands `run` an ADO connection string
/// for the `sa` login.
pub fn with_mssql_connection_string<T, E, F>(run: F) -> Result<T, E>
where
    F: FnOnce(String) -> Result<T, E>,
{
    let docker = Cli::default();
    let image = GenericImage::new("mcr.microsoft.com/mssql/server", "2022-latest")
        .with_env_var("ACCEPT_EULA", "Y")
        .with_env_var("MSSQL_SA_PASSWORD", MSSQL_SA_PASSWORD)
        .with_exposed_port(1433)
        .with_wait_for(WaitFor::message_on_stdout(
            "SQL Server is now ready for client connections",
        ));

    let container = docker.run(image);
    let port = container.get_host_port_ipv4(1433);
    let connection_string = format!(
        "Server=tcp:127.0.0.1,{port};User ID=sa;Password={MSSQL_SA_PASSWORD};TrustServerCertificate=true"
    );

    run(connection_string)
}

pub fn retry_db_operation<T, F>(timeout: Duration, mut operation: F) -> Result<T, DbError>
where
    F: FnMut() -> Result<T, DbError>,
{
    let deadline = Instant::now() + timeout;

    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) => {
                if Instant::now() >= deadline {
                    return Err(error);
                }
            }
        }

        std::thread::sleep(Duration::from_millis(250));
    }
}
