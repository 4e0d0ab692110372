//! SQL statements executed inside read-write transactions or as
//! partitioned DML

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A SQL statement with named parameters.
///
/// The client core does not parse SQL; statements are forwarded verbatim to
/// the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    sql: String,
    params: Vec<(String, Value)>,
}

impl Statement {
    /// A statement with no parameters.
    pub fn of(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), params: Vec::new() }
    }

    /// Bind a named parameter. Binding the same name twice keeps the last
    /// value.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.params.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.params.push((name, value));
        }
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }
}
