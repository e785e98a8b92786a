//! Connection lifecycle management
//!
//! A [`ConnectionManager`] owns at most one live adapter (a single SQLite
//! connection or a PostgreSQL/MySQL pool) for one connection URI and moves
//! through `Uninitialized -> Connected -> Closed`. `Closed` is terminal.

use crate::dialect::Dialect;
use crate::error::{KvError, KvResult};
use brine_sql::{Backend, ConnectOptions, ConnectionUri, SharedAdapter};
use parking_lot::RwLock;
use tokio::sync::Mutex;

/// Externally visible lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Connected,
    Closed,
}

/// A borrowed handle to the live adapter plus the dialect it speaks
#[derive(Clone)]
pub struct Connection {
    adapter: SharedAdapter,
    dialect: Dialect,
}

impl Connection {
    fn new(adapter: SharedAdapter) -> Self {
        let dialect = Dialect::for_backend(adapter.backend());
        Self { adapter, dialect }
    }

    pub fn adapter(&self) -> &SharedAdapter {
        &self.adapter
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn backend(&self) -> Backend {
        self.adapter.backend()
    }
}

enum State {
    Uninitialized,
    Connected {
        connection: Connection,
        migrated: bool,
    },
    Closed,
}

pub struct ConnectionManager {
    uri: String,
    options: ConnectOptions,
    state: RwLock<State>,
    /// Serializes connect/close so two callers never race a transition
    transition: Mutex<()>,
}

impl ConnectionManager {
    pub fn new(uri: impl Into<String>, options: ConnectOptions) -> Self {
        Self {
            uri: uri.into(),
            options,
            state: RwLock::new(State::Uninitialized),
            transition: Mutex::new(()),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn state(&self) -> LifecycleState {
        match &*self.state.read() {
            State::Uninitialized => LifecycleState::Uninitialized,
            State::Connected { .. } => LifecycleState::Connected,
            State::Closed => LifecycleState::Closed,
        }
    }

    /// Establish the connection, or re-validate the existing one.
    pub async fn connect(&self) -> KvResult<Connection> {
        let _transition = self.transition.lock().await;

        let existing = match &*self.state.read() {
            State::Closed => return Err(KvError::NotInitialized),
            State::Connected { connection, .. } => Some(connection.clone()),
            State::Uninitialized => None,
        };

        if let Some(connection) = existing {
            connection
                .adapter()
                .ping()
                .await
                .map_err(KvError::Connection)?;
            return Ok(connection);
        }

        let uri = ConnectionUri::parse(&self.uri).map_err(KvError::Connection)?;
        let adapter = brine_sql::connect(&uri, &self.options)
            .await
            .map_err(KvError::Connection)?;
        let connection = Connection::new(adapter);

        tracing::info!(backend = %connection.backend(), "connected");

        *self.state.write() = State::Connected {
            connection: connection.clone(),
            migrated: false,
        };

        Ok(connection)
    }

    /// Record that the schema is in place; KV operations are allowed from now on
    pub(crate) fn mark_migrated(&self) {
        if let State::Connected { migrated, .. } = &mut *self.state.write() {
            *migrated = true;
        }
    }

    /// Hand out the connection for one KV operation
    pub fn acquire(&self) -> KvResult<Connection> {
        match &*self.state.read() {
            State::Connected {
                connection,
                migrated: true,
            } => Ok(connection.clone()),
            _ => Err(KvError::NotInitialized),
        }
    }

    /// Release the connection. Any later operation fails with `NotInitialized`.
    ///
    /// With `optimize` set the backend maintenance statement runs first; its
    /// failure is logged and does not keep the connection open.
    pub async fn close(&self, optimize: bool) -> KvResult<()> {
        let _transition = self.transition.lock().await;

        let previous = std::mem::replace(&mut *self.state.write(), State::Closed);
        let State::Connected { connection, .. } = previous else {
            return Ok(());
        };

        if optimize {
            let maintenance = connection.dialect().optimize();
            if let Err(e) = connection.adapter().batch_execute(&maintenance.sql).await {
                tracing::warn!(error = %e, sql = %maintenance.sql, "maintenance on close failed");
            }
        }

        connection
            .adapter()
            .close()
            .await
            .map_err(KvError::Connection)?;

        tracing::info!(backend = %connection.backend(), "closed");
        Ok(())
    }
}
