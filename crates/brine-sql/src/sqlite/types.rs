//! SQLite type conversion utilities

use crate::value::SqlValue;
use rusqlite::Row;
use rusqlite::types::{Value as RusqliteValue, ValueRef};

/// Convert SqlValue to rusqlite Value
pub fn to_rusqlite_value(value: &SqlValue) -> RusqliteValue {
    match value {
        SqlValue::Null => RusqliteValue::Null,
        SqlValue::Bool(b) => RusqliteValue::Integer(if *b { 1 } else { 0 }),
        SqlValue::Int(i) => RusqliteValue::Integer(*i),
        SqlValue::Float(f) => RusqliteValue::Real(*f),
        SqlValue::Text(s) => RusqliteValue::Text(s.clone()),
        SqlValue::Blob(b) => RusqliteValue::Blob(b.clone()),
    }
}

/// Convert rusqlite row value to SqlValue
pub fn from_rusqlite_value(row: &Row, index: usize) -> SqlValue {
    match row.get_ref(index) {
        Ok(ValueRef::Null) => SqlValue::Null,
        Ok(ValueRef::Integer(i)) => SqlValue::Int(i),
        Ok(ValueRef::Real(f)) => SqlValue::Float(f),
        Ok(ValueRef::Text(s)) => SqlValue::Text(String::from_utf8_lossy(s).into_owned()),
        Ok(ValueRef::Blob(b)) => SqlValue::Blob(b.to_vec()),
        Err(_) => SqlValue::Null,
    }
}
