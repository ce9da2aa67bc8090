use crate::DbError;
use std::fmt;
use std::str::FromStr;

pub const DATA_SOURCE: &str = "Data Source";
pub const INITIAL_CATALOG: &str = "Initial Catalog";
pub const USER_ID: &str = "User ID";
pub const PASSWORD: &str = "Password";
pub const INTEGRATED_SECURITY: &str = "Integrated Security";
pub const CONNECT_TIMEOUT: &str = "Connect Timeout";

/// Synonyms accepted by SQL Server clients, mapped to the canonical key.
const KEY_ALIASES: &[(&str, &str)] = &[
    ("data source", DATA_SOURCE),
    ("server", DATA_SOURCE),
    ("address", DATA_SOURCE),
    ("addr", DATA_SOURCE),
    ("network address", DATA_SOURCE),
    ("initial catalog", INITIAL_CATALOG),
    ("database", INITIAL_CATALOG),
    ("user id", USER_ID),
    ("uid", USER_ID),
    ("user", USER_ID),
    ("password", PASSWORD),
    ("pwd", PASSWORD),
    ("integrated security", INTEGRATED_SECURITY),
    ("trusted_connection", INTEGRATED_SECURITY),
    ("connect timeout", CONNECT_TIMEOUT),
    ("connection timeout", CONNECT_TIMEOUT),
    ("timeout", CONNECT_TIMEOUT),
    ("application name", "Application Name"),
    ("app", "Application Name"),
    ("applicationintent", "Application Intent"),
    ("application intent", "Application Intent"),
    ("attachdbfilename", "AttachDbFilename"),
    ("extended properties", "AttachDbFilename"),
    ("initial file name", "AttachDbFilename"),
    ("column encryption setting", "Column Encryption Setting"),
    ("command timeout", "Command Timeout"),
    ("connect retry count", "Connect Retry Count"),
    ("connectretrycount", "Connect Retry Count"),
    ("connect retry interval", "Connect Retry Interval"),
    ("connectretryinterval", "Connect Retry Interval"),
    ("current language", "Current Language"),
    ("language", "Current Language"),
    ("encrypt", "Encrypt"),
    ("enlist", "Enlist"),
    ("failover partner", "Failover Partner"),
    ("hostnameincertificate", "HostNameInCertificate"),
    ("host name in certificate", "HostNameInCertificate"),
    ("load balance timeout", "Load Balance Timeout"),
    ("connection lifetime", "Load Balance Timeout"),
    ("max pool size", "Max Pool Size"),
    ("min pool size", "Min Pool Size"),
    ("multipleactiveresultsets", "MultipleActiveResultSets"),
    ("multiple active result sets", "MultipleActiveResultSets"),
    ("multisubnetfailover", "MultiSubnetFailover"),
    ("multi subnet failover", "MultiSubnetFailover"),
    ("packet size", "Packet Size"),
    ("persist security info", "Persist Security Info"),
    ("persistsecurityinfo", "Persist Security Info"),
    ("pooling", "Pooling"),
    ("replication", "Replication"),
    ("transaction binding", "Transaction Binding"),
    ("trustservercertificate", "TrustServerCertificate"),
    ("trust server certificate", "TrustServerCertificate"),
    ("type system version", "Type System Version"),
    ("user instance", "User Instance"),
    ("workstation id", "Workstation ID"),
    ("wsid", "Workstation ID"),
];

const REDACTED: &str = "***";

/// A SQL Server (ADO.NET style) connection string in normalized form.
///
/// Keys are stored under their canonical names, so `Server=A;Database=b`
/// and `Data Source=A;Initial Catalog=b` render identically. Keywords the
/// SQL Server client does not know are lowercased. Pair order is
/// preserved; a repeated key keeps its first position and takes the last
/// value, the way SQL Server clients resolve duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionString {
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = canonical_key(key);
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = canonical_key(key);
        let value = value.into();

        match self
            .pairs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn data_source(&self) -> Option<&str> {
        self.get(DATA_SOURCE).filter(|value| !value.is_empty())
    }

    pub fn initial_catalog(&self) -> Option<&str> {
        self.get(INITIAL_CATALOG).filter(|value| !value.is_empty())
    }

    /// Returns a copy pointing at `database`, every other parameter untouched.
    pub fn with_initial_catalog(&self, database: &str) -> Self {
        let mut copy = self.clone();
        copy.set(INITIAL_CATALOG, database);
        copy
    }

    /// Renders the string with the password masked. Use for logs and errors.
    pub fn redacted(&self) -> String {
        render(self.pairs.iter().map(|(k, v)| {
            if k == PASSWORD {
                (k.as_str(), REDACTED)
            } else {
                (k.as_str(), v.as_str())
            }
        }))
    }
}

impl FromStr for ConnectionString {
    type Err = DbError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parsed = ConnectionString::new();

        for (key, value) in parse_pairs(input)? {
            parsed.set(&key, value);
        }

        Ok(parsed)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(
            self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        ))
    }
}

fn canonical_key(key: &str) -> String {
    let lowered = key.trim().to_ascii_lowercase();

    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(lowered)
}

fn render<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .map(|(key, value)| format!("{}={}", key, quote_value(value)))
        .collect::<Vec<_>>()
        .join(";")
}

fn quote_value(value: &str) -> String {
    let needs_quotes = value.contains(';')
        || value.starts_with(['"', '\''])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);

    if !needs_quotes {
        return value.to_string();
    }

    if value.contains('"') && !value.contains('\'') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value.replace('"', "\"\""))
    }
}

fn parse_pairs(input: &str) -> Result<Vec<(String, String)>, DbError> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ';') {
            chars.next();
        }

        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        loop {
            match chars.next() {
                Some('=') => break,
                Some(';') | None => {
                    return Err(DbError::InvalidConnectionString(format!(
                        "missing '=' after '{}'",
                        key.trim()
                    )));
                }
                Some(c) => key.push(c),
            }
        }

        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(DbError::InvalidConnectionString(
                "empty key before '='".to_string(),
            ));
        }

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let value = match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                let mut value = String::new();

                loop {
                    match chars.next() {
                        Some(c) if c == quote => {
                            if chars.peek() == Some(&quote) {
                                chars.next();
                                value.push(quote);
                            } else {
                                break;
                            }
                        }
                        Some(c) => value.push(c),
                        None => {
                            return Err(DbError::InvalidConnectionString(format!(
                                "unterminated quote in value of '{}'",
                                key
                            )));
                        }
                    }
                }

                loop {
                    match chars.peek().copied() {
                        Some(';') | None => break,
                        Some(c) if c.is_whitespace() => {
                            chars.next();
                        }
                        Some(_) => {
                            return Err(DbError::InvalidConnectionString(format!(
                                "unexpected text after quoted value of '{}'",
                                key
                            )));
                        }
                    }
                }

                value
            }
            _ => {
                let mut value = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ';' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                value.trim_end().to_string()
            }
        };

        pairs.push((key, value));
    }

    Ok(pairs)
}
