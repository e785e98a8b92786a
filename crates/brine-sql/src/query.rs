//! Query builder for parameterized SQL statements
//!
//! Appends SQL fragments and bound values, rendering placeholders in the
//! style the target database expects.

use crate::adapter::Statement;
use crate::value::SqlValue;

/// Parameter style for different databases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// SQLite and MySQL style: ?, ?, ?
    Positional,
    /// PostgreSQL style: $1, $2, $3
    Dollar,
}

/// Query builder for constructing parameterized SQL queries
#[derive(Debug)]
pub struct QueryBuilder {
    sql: String,
    params: Vec<SqlValue>,
    param_style: ParamStyle,
}

impl QueryBuilder {
    pub fn new(param_style: ParamStyle) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            param_style,
        }
    }

    /// Append a literal SQL fragment
    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    /// Append a placeholder and bind `value` to it
    pub fn push_param(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.params.push(value.into());
        match self.param_style {
            ParamStyle::Positional => self.sql.push('?'),
            ParamStyle::Dollar => {
                self.sql.push('$');
                self.sql.push_str(&self.params.len().to_string());
            }
        }
        self
    }

    /// Expand values for an IN clause: ($1, $2, $3)
    pub fn push_param_list<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.sql.push('(');
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_param(value);
        }
        self.sql.push(')');
        self
    }

    pub fn build(self) -> Statement {
        Statement::new(self.sql, self.params)
    }
}

/// Quote a SQL identifier (table or column name) with the given quote character
pub fn quote_identifier(name: &str, quote: char) -> String {
    let escaped = |part: &str| {
        let doubled = format!("{quote}{quote}");
        format!("{quote}{}{quote}", part.replace(quote, &doubled))
    };

    // Handle schema.table format
    if name.contains('.') {
        name.split('.').map(escaped).collect::<Vec<_>>().join(".")
    } else {
        escaped(name)
    }
}
