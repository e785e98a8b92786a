//! Connection URI parsing and rendering
//!
//! Rendered forms:
//!
//! - `sqlite::memory:`
//! - `sqlite:<path>?mode=rwc`
//! - `postgres://<user>:<password>@<host>:<port>/<database>`
//! - `mysql://<user>:<password>@<host>:<port>/<database>`
//!
//! The legacy `sqlite://:memory:` and `sqlite://<path>` spellings are
//! accepted when parsing. User, password and database of server URIs are
//! percent-decoded when parsed and percent-encoded when rendered.

use crate::error::{SqlError, SqlResult};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::fmt;
use std::str::FromStr;

const MEMORY_MARKER: &str = ":memory:";

/// Everything but RFC 3986 unreserved characters is escaped in userinfo and path
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Database backend selected by a URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Sqlite,
    Postgres,
    MySql,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
            Backend::MySql => "mysql",
        }
    }

    /// Port used when a server URI leaves it out
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Backend::Sqlite => None,
            Backend::Postgres => Some(5432),
            Backend::MySql => Some(3306),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a SQLite database file is opened (`mode=` query parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
    #[default]
    ReadWriteCreate,
}

impl OpenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::ReadOnly => "ro",
            OpenMode::ReadWrite => "rw",
            OpenMode::ReadWriteCreate => "rwc",
        }
    }
}

/// Where a SQLite database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File { path: String, mode: OpenMode },
}

/// Fully resolved address of a networked database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

/// Options for building a server URI; `host` and `port` fall back to
/// `localhost` and the backend's default port.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    pub user: String,
    pub password: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: String,
}

impl ServerOptions {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: None,
            port: None,
            database: database.into(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    fn resolve(self, default_port: u16) -> ServerAddress {
        ServerAddress {
            user: self.user,
            password: self.password,
            host: self.host.unwrap_or_else(|| "localhost".to_string()),
            port: self.port.unwrap_or(default_port),
            database: self.database,
        }
    }
}

/// A parsed connection URI identifying backend, location and credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUri {
    Sqlite(SqliteTarget),
    Postgres(ServerAddress),
    MySql(ServerAddress),
}

impl ConnectionUri {
    /// In-memory SQLite database
    pub fn sqlite_memory() -> Self {
        ConnectionUri::Sqlite(SqliteTarget::Memory)
    }

    /// SQLite database stored on disk, created when missing
    pub fn sqlite_file(path: impl Into<String>) -> Self {
        ConnectionUri::Sqlite(SqliteTarget::File {
            path: path.into(),
            mode: OpenMode::ReadWriteCreate,
        })
    }

    pub fn postgres(options: ServerOptions) -> Self {
        ConnectionUri::Postgres(options.resolve(5432))
    }

    pub fn mysql(options: ServerOptions) -> Self {
        ConnectionUri::MySql(options.resolve(3306))
    }

    pub fn backend(&self) -> Backend {
        match self {
            ConnectionUri::Sqlite(_) => Backend::Sqlite,
            ConnectionUri::Postgres(_) => Backend::Postgres,
            ConnectionUri::MySql(_) => Backend::MySql,
        }
    }

    /// Parse a connection URI
    pub fn parse(uri: &str) -> SqlResult<Self> {
        if let Some(rest) = uri.strip_prefix("sqlite:") {
            return parse_sqlite(rest).map(ConnectionUri::Sqlite);
        }

        let url = url::Url::parse(uri).map_err(|e| SqlError::InvalidUrl(e.to_string()))?;
        match url.scheme() {
            "postgres" | "postgresql" => {
                parse_server(&url, Backend::Postgres).map(ConnectionUri::Postgres)
            }
            "mysql" | "mariadb" => parse_server(&url, Backend::MySql).map(ConnectionUri::MySql),
            other => Err(SqlError::InvalidUrl(format!(
                "Unsupported scheme {}://, expected sqlite:, postgres:// or mysql://",
                other
            ))),
        }
    }
}

fn parse_sqlite(rest: &str) -> SqlResult<SqliteTarget> {
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let mut mode = OpenMode::default();
    let mut memory = path == MEMORY_MARKER;

    for pair in query.into_iter().flat_map(|q| q.split('&')) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key != "mode" {
            continue;
        }
        mode = match value {
            "ro" => OpenMode::ReadOnly,
            "rw" => OpenMode::ReadWrite,
            "rwc" => OpenMode::ReadWriteCreate,
            "memory" => {
                memory = true;
                OpenMode::ReadWriteCreate
            }
            other => {
                return Err(SqlError::InvalidUrl(format!(
                    "Unknown SQLite mode '{}', expected ro, rw, rwc or memory",
                    other
                )));
            }
        };
    }

    if memory {
        return Ok(SqliteTarget::Memory);
    }
    if path.is_empty() {
        return Err(SqlError::InvalidUrl("SQLite URI has no database path".into()));
    }

    Ok(SqliteTarget::File {
        path: path.to_string(),
        mode,
    })
}

fn parse_server(url: &url::Url, backend: Backend) -> SqlResult<ServerAddress> {
    let database = decode(url.path().trim_start_matches('/'), "database name")?;
    let database = match (database.is_empty(), backend) {
        (true, Backend::Postgres) => "postgres".to_string(),
        (true, _) => {
            return Err(SqlError::InvalidUrl(format!(
                "{} URI has no database name",
                backend
            )));
        }
        (false, _) => database,
    };

    // Host's Display keeps the brackets around IPv6 addresses
    let host = match url.host() {
        Some(url::Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => "localhost".to_string(),
    };

    Ok(ServerAddress {
        user: decode(url.username(), "user")?,
        password: decode(url.password().unwrap_or_default(), "password")?,
        host,
        port: url.port().or(backend.default_port()).unwrap_or_default(),
        database,
    })
}

fn decode(component: &str, what: &str) -> SqlResult<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| SqlError::InvalidUrl(format!("Invalid {} in URI: {}", what, e)))
}

impl FromStr for ConnectionUri {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionUri::parse(s)
    }
}

impl fmt::Display for ConnectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionUri::Sqlite(SqliteTarget::Memory) => write!(f, "sqlite:{}", MEMORY_MARKER),
            ConnectionUri::Sqlite(SqliteTarget::File { path, mode }) => {
                write!(f, "sqlite:{}?mode={}", path, mode.as_str())
            }
            ConnectionUri::Postgres(addr) => write_server(f, "postgres", addr),
            ConnectionUri::MySql(addr) => write_server(f, "mysql", addr),
        }
    }
}

fn write_server(f: &mut fmt::Formatter<'_>, scheme: &str, addr: &ServerAddress) -> fmt::Result {
    let host = if addr.host.contains(':') {
        format!("[{}]", addr.host)
    } else {
        addr.host.clone()
    };

    write!(
        f,
        "{}://{}:{}@{}:{}/{}",
        scheme,
        utf8_percent_encode(&addr.user, COMPONENT),
        utf8_percent_encode(&addr.password, COMPONENT),
        host,
        addr.port,
        utf8_percent_encode(&addr.database, COMPONENT)
    )
}
