mod driver;

pub use driver::{DEFAULT_CONNECT_TIMEOUT, MssqlConnection, MssqlDriver};
