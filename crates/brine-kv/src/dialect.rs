//! SQL rendering for the key-value table
//!
//! Every method is a pure function from an abstract KV operation to a
//! [`Statement`] in the backend's syntax: placeholder style, identifier
//! quoting and upsert form differ per backend.

use brine_sql::{Backend, ParamStyle, QueryBuilder, Statement, query::quote_identifier};

/// Name of the single key-value table
pub const TABLE_NAME: &str = "brine";
pub const KEY_COLUMN: &str = "key";
pub const VALUE_COLUMN: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            Backend::Sqlite => Dialect::Sqlite,
            Backend::Postgres => Dialect::Postgres,
            Backend::MySql => Dialect::MySql,
        }
    }

    pub fn param_style(&self) -> ParamStyle {
        match self {
            Dialect::Postgres => ParamStyle::Dollar,
            Dialect::Sqlite | Dialect::MySql => ParamStyle::Positional,
        }
    }

    fn quote(&self, name: &str) -> String {
        match self {
            Dialect::MySql => quote_identifier(name, '`'),
            Dialect::Sqlite | Dialect::Postgres => quote_identifier(name, '"'),
        }
    }

    fn builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.param_style())
    }

    fn table(&self) -> String {
        self.quote(TABLE_NAME)
    }

    fn key(&self) -> String {
        self.quote(KEY_COLUMN)
    }

    fn value(&self) -> String {
        self.quote(VALUE_COLUMN)
    }

    /// DDL creating the table when it does not exist yet
    pub fn create_table(&self) -> Statement {
        // MySQL cannot index an unbounded TEXT primary key, and its default
        // collation would make "a" and "A" the same key
        let (key_type, value_type) = match self {
            Dialect::MySql => (
                "VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin",
                "LONGTEXT",
            ),
            Dialect::Sqlite | Dialect::Postgres => ("TEXT", "TEXT"),
        };

        Statement::raw(format!(
            "CREATE TABLE IF NOT EXISTS {} ({} {} NOT NULL PRIMARY KEY, {} {} NOT NULL)",
            self.table(),
            self.key(),
            key_type,
            self.value(),
            value_type
        ))
    }

    /// Insert the pair, overwriting the value when the key exists
    pub fn upsert(&self, key: &str, value: &str) -> Statement {
        let mut qb = self.builder();
        qb.push(&format!(
            "INSERT INTO {} ({}, {}) VALUES (",
            self.table(),
            self.key(),
            self.value()
        ))
        .push_param(key)
        .push(", ")
        .push_param(value)
        .push(")");

        match self {
            Dialect::Sqlite | Dialect::Postgres => qb.push(&format!(
                " ON CONFLICT ({}) DO UPDATE SET {} = excluded.{}",
                self.key(),
                self.value(),
                self.value()
            )),
            // VALUES() keeps MariaDB compatibility
            Dialect::MySql => qb.push(&format!(
                " ON DUPLICATE KEY UPDATE {} = VALUES({})",
                self.value(),
                self.value()
            )),
        };

        qb.build()
    }

    pub fn select_one(&self, key: &str) -> Statement {
        let mut qb = self.builder();
        qb.push(&format!(
            "SELECT {} FROM {} WHERE {} = ",
            self.value(),
            self.table(),
            self.key()
        ))
        .push_param(key);
        qb.build()
    }

    /// Select `(key, value)` rows for every present key in `keys`
    pub fn select_many(&self, keys: &[String]) -> Statement {
        let mut qb = self.builder();
        qb.push(&format!(
            "SELECT {}, {} FROM {} WHERE {} IN ",
            self.key(),
            self.value(),
            self.table(),
            self.key()
        ))
        .push_param_list(keys.iter().map(String::as_str));
        qb.build()
    }

    pub fn delete_one(&self, key: &str) -> Statement {
        let mut qb = self.builder();
        qb.push(&format!("DELETE FROM {} WHERE {} = ", self.table(), self.key()))
            .push_param(key);
        qb.build()
    }

    pub fn delete_many(&self, keys: &[String]) -> Statement {
        let mut qb = self.builder();
        qb.push(&format!("DELETE FROM {} WHERE {} IN ", self.table(), self.key()))
            .push_param_list(keys.iter().map(String::as_str));
        qb.build()
    }

    pub fn delete_all(&self) -> Statement {
        Statement::raw(format!("DELETE FROM {}", self.table()))
    }

    pub fn count(&self) -> Statement {
        Statement::raw(format!("SELECT COUNT(*) FROM {}", self.table()))
    }

    pub fn exists(&self, key: &str) -> Statement {
        let mut qb = self.builder();
        qb.push(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ",
            self.table(),
            self.key()
        ))
        .push_param(key)
        .push(")");
        qb.build()
    }

    pub fn list_keys(&self) -> Statement {
        Statement::raw(format!("SELECT {} FROM {}", self.key(), self.table()))
    }

    pub fn list_values(&self) -> Statement {
        Statement::raw(format!("SELECT {} FROM {}", self.value(), self.table()))
    }

    /// Maintenance statement run before the connection is released
    pub fn optimize(&self) -> Statement {
        match self {
            Dialect::Sqlite => Statement::raw("PRAGMA optimize"),
            Dialect::Postgres => Statement::raw(format!("VACUUM {}", self.table())),
            Dialect::MySql => Statement::raw(format!("OPTIMIZE TABLE {}", self.table())),
        }
    }
}
