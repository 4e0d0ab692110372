//! Row-level write intents
//!
//! A [`Mutation`] describes a single insert, update, insert-or-update,
//! replace, or delete against one table. Mutations are immutable once built;
//! they take effect only when buffered into a transaction context and
//! committed. A [`MutationGroup`] bundles mutations that must apply
//! atomically together within a larger non-atomic batch write.

use crate::value::{Key, Value};
use serde::{Deserialize, Serialize};

/// A half-open range of primary keys, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRange {
    pub start: Key,
    pub end: Key,
}

/// The set of rows a delete targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeySet {
    /// Every row in the table.
    All,
    /// An explicit list of primary keys.
    Keys(Vec<Key>),
    /// A contiguous key range.
    Range(KeyRange),
}

impl KeySet {
    /// A key set containing a single primary key.
    pub fn single(key: Key) -> Self {
        KeySet::Keys(vec![key])
    }
}

/// A single buffered row-level write or delete intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Insert a new row; fails the transaction if the row exists.
    Insert { table: String, columns: Vec<(String, Value)> },
    /// Update an existing row; fails the transaction if the row is missing.
    Update { table: String, columns: Vec<(String, Value)> },
    /// Insert the row, or update it if it already exists. Safe to reapply,
    /// which makes it the natural payload for at-least-once paths.
    InsertOrUpdate { table: String, columns: Vec<(String, Value)> },
    /// Delete the row if present, then insert the given columns.
    Replace { table: String, columns: Vec<(String, Value)> },
    /// Delete every row matched by the key set.
    Delete { table: String, key_set: KeySet },
}

impl Mutation {
    /// Start building an insert mutation.
    pub fn insert(table: impl Into<String>) -> WriteBuilder {
        WriteBuilder::new(WriteKind::Insert, table.into())
    }

    /// Start building an update mutation.
    pub fn update(table: impl Into<String>) -> WriteBuilder {
        WriteBuilder::new(WriteKind::Update, table.into())
    }

    /// Start building an insert-or-update mutation.
    pub fn insert_or_update(table: impl Into<String>) -> WriteBuilder {
        WriteBuilder::new(WriteKind::InsertOrUpdate, table.into())
    }

    /// Start building a replace mutation.
    pub fn replace(table: impl Into<String>) -> WriteBuilder {
        WriteBuilder::new(WriteKind::Replace, table.into())
    }

    /// Build a delete mutation over the given key set.
    pub fn delete(table: impl Into<String>, key_set: KeySet) -> Mutation {
        Mutation::Delete { table: table.into(), key_set }
    }

    /// The table this mutation targets.
    pub fn table(&self) -> &str {
        match self {
            Mutation::Insert { table, .. }
            | Mutation::Update { table, .. }
            | Mutation::InsertOrUpdate { table, .. }
            | Mutation::Replace { table, .. }
            | Mutation::Delete { table, .. } => table,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteKind {
    Insert,
    Update,
    InsertOrUpdate,
    Replace,
}

/// Builder for the write variants of [`Mutation`].
///
/// Column order is preserved as set; setting a column twice keeps the last
/// value in the original position.
#[derive(Debug)]
pub struct WriteBuilder {
    kind: WriteKind,
    table: String,
    columns: Vec<(String, Value)>,
}

impl WriteBuilder {
    fn new(kind: WriteKind, table: String) -> Self {
        Self { kind, table, columns: Vec::new() }
    }

    /// Bind a column to a value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        if let Some(slot) = self.columns.iter_mut().find(|(c, _)| *c == column) {
            slot.1 = value;
        } else {
            self.columns.push((column, value));
        }
        self
    }

    /// Finish building the mutation.
    pub fn build(self) -> Mutation {
        let Self { kind, table, columns } = self;
        match kind {
            WriteKind::Insert => Mutation::Insert { table, columns },
            WriteKind::Update => Mutation::Update { table, columns },
            WriteKind::InsertOrUpdate => Mutation::InsertOrUpdate { table, columns },
            WriteKind::Replace => Mutation::Replace { table, columns },
        }
    }
}

/// An ordered batch of mutations applied atomically as one unit within a
/// batch write. Order is significant within the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationGroup {
    mutations: Vec<Mutation>,
}

impl MutationGroup {
    /// Create a group from an ordered list of mutations.
    pub fn new(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }

    /// The mutations in this group, in application order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl From<Vec<Mutation>> for MutationGroup {
    fn from(mutations: Vec<Mutation>) -> Self {
        Self::new(mutations)
    }
}
