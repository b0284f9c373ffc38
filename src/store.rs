//! Store Module
//!
//! The namespace-scoped API over the shared table.
//!
//! ## Responsibilities
//! - Validate the namespace argument of every call
//! - Make sure the shared table exists before touching it
//! - Map each operation onto one atomic table primitive
//! - Route snapshot operations through the snapshot codec

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::command::{Command, Reply};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::manager::TableManager;
use crate::namespace::{IntoNamespace, Namespace};
use crate::snapshot::{self, SnapshotScope};
use crate::table::{EntryKey, SharedTable};
use crate::value::Value;

/// Namespace-partitioned key-value store
///
/// Every public operation goes through `guard()`, which validates the
/// namespace and returns the shared table; nothing reaches the table with
/// an invalid namespace.
///
/// ## Concurrency Model
/// All methods take `&self`; share a store across threads with `Arc`.
/// Each operation is one atomic table primitive. No operation spans several
/// keys transactionally, and snapshots are best-effort copies (see
/// [`persist`](Self::persist)).
#[derive(Clone)]
pub struct CacheStore {
    manager: Arc<TableManager>,
}

impl CacheStore {
    /// Create a store over the table owned by `manager`
    pub fn new(manager: Arc<TableManager>) -> Self {
        Self { manager }
    }

    /// Create a store with its own manager built from `config`
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self::new(Arc::new(TableManager::new(config)?)))
    }

    /// Execute a command
    ///
    /// Routes commands to the matching operation
    pub fn execute(&self, command: Command) -> Result<Reply> {
        match command {
            Command::Get { namespace, key } => self.get(namespace, key).map(Reply::Value),
            Command::Set {
                namespace,
                key,
                value,
            } => {
                self.set(namespace, key, value)?;
                Ok(Reply::Ok)
            }
            Command::Delete { namespace, key } => {
                self.delete(namespace, key)?;
                Ok(Reply::Ok)
            }
            Command::Take { namespace, key } => self.remove(namespace, key).map(Reply::Value),
            Command::Exists { namespace, key } => self.exists(namespace, key).map(Reply::Bool),
            Command::Keys { namespace } => self.keys(namespace).map(Reply::Keys),
            Command::Size { namespace } => self.size(namespace).map(Reply::Count),
            Command::Clear { namespace } => self.clear(namespace).map(Reply::Count),
            Command::Increment {
                namespace,
                key,
                count,
                initial,
            } => self
                .increment_by(namespace, key, count, initial)
                .map(|v| Reply::Value(Some(v))),
        }
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Get the value stored under `key`, or `None` if absent
    pub fn get(&self, ns: impl IntoNamespace, key: impl Into<Value>) -> Result<Option<Value>> {
        let (ns, table) = self.guard(ns)?;
        Ok(table.get(&EntryKey::new(ns, key.into())))
    }

    /// Insert or replace the value under `key`
    pub fn set(
        &self,
        ns: impl IntoNamespace,
        key: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let (ns, table) = self.guard(ns)?;
        table.insert(EntryKey::new(ns, key.into()), value.into());
        Ok(())
    }

    /// Delete `key`; succeeds whether or not it was present
    pub fn delete(&self, ns: impl IntoNamespace, key: impl Into<Value>) -> Result<()> {
        let (ns, table) = self.guard(ns)?;
        table.remove(&EntryKey::new(ns, key.into()));
        Ok(())
    }

    /// Delete `key` and return the value it held, in one step
    pub fn remove(&self, ns: impl IntoNamespace, key: impl Into<Value>) -> Result<Option<Value>> {
        let (ns, table) = self.guard(ns)?;
        Ok(table.remove(&EntryKey::new(ns, key.into())))
    }

    /// Check whether `key` is present
    pub fn exists(&self, ns: impl IntoNamespace, key: impl Into<Value>) -> Result<bool> {
        let (ns, table) = self.guard(ns)?;
        Ok(table.contains(&EntryKey::new(ns, key.into())))
    }

    /// Add 1 to the counter at `key`, starting from 0 if absent
    pub fn increment(&self, ns: impl IntoNamespace, key: impl Into<Value>) -> Result<Value> {
        self.increment_by(ns, key, 1, 0)
    }

    /// Add `count` to the counter at `key`
    ///
    /// An absent counter is first set to `initial`, so the first call
    /// returns `initial + count`. Fails with a usage error if `count`,
    /// `initial` or the stored value is not numeric.
    pub fn increment_by(
        &self,
        ns: impl IntoNamespace,
        key: impl Into<Value>,
        count: impl Into<Value>,
        initial: impl Into<Value>,
    ) -> Result<Value> {
        let (ns, table) = self.guard(ns)?;
        let key = EntryKey::new(ns, key.into());
        let count = count.into();
        let initial = initial.into();

        for arg in [&count, &initial] {
            if !arg.is_numeric() {
                return Err(CacheError::NonNumeric {
                    key: key.to_string(),
                    value: arg.to_string(),
                });
            }
        }

        table.update_counter(key, &count, &initial)
    }

    // =========================================================================
    // Namespace Operations
    // =========================================================================

    /// All keys currently stored under `ns`, in no particular order
    pub fn keys(&self, ns: impl IntoNamespace) -> Result<Vec<Value>> {
        let (ns, table) = self.guard(ns)?;
        Ok(table.scan(|k, _| (k.namespace == ns).then(|| k.key.clone())))
    }

    /// Number of entries stored under `ns`
    pub fn size(&self, ns: impl IntoNamespace) -> Result<usize> {
        let (ns, table) = self.guard(ns)?;
        Ok(table.count_matching(|k| k.namespace == ns))
    }

    /// Whether `ns` holds no entries
    pub fn is_empty(&self, ns: impl IntoNamespace) -> Result<bool> {
        Ok(self.size(ns)? == 0)
    }

    /// Delete every entry under `ns` in one atomic step
    ///
    /// Returns the number of entries removed. Other namespaces are untouched.
    pub fn clear(&self, ns: impl IntoNamespace) -> Result<usize> {
        let (ns, table) = self.guard(ns)?;
        Ok(table.match_delete(|k| k.namespace == ns))
    }

    /// Delete every entry of every namespace
    pub fn clear_all(&self) -> usize {
        self.table().delete_all()
    }

    /// Namespaces that currently hold at least one entry, sorted
    pub fn namespaces(&self) -> Vec<Namespace> {
        let names: BTreeSet<Namespace> = self
            .table()
            .scan(|k, _| Some(k.namespace.clone()))
            .into_iter()
            .collect();
        names.into_iter().collect()
    }

    /// Number of entries across all namespaces
    pub fn total_size(&self) -> usize {
        self.table().len()
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Write every entry of `ns` to a snapshot file at `path`
    ///
    /// Returns the number of entries written. The snapshot is a best-effort
    /// copy: writes racing with `persist` may or may not be included, but
    /// the file on disk is always either the previous snapshot or a complete
    /// new one.
    pub fn persist(&self, ns: impl IntoNamespace, path: impl AsRef<Path>) -> Result<usize> {
        let (ns, table) = self.guard(ns)?;
        let path = path.as_ref();

        let records = table.scan(|k, v| (k.namespace == ns).then(|| (k.key.clone(), v.clone())));
        let snapshot = snapshot::write_snapshot(
            path,
            table.meta(),
            SnapshotScope::Namespace,
            self.manager.config().snapshot_sync,
            records,
        )?;

        info!(namespace = %ns, path = %path.display(), entries = snapshot.entry_count, "persisted namespace");
        Ok(snapshot.entry_count as usize)
    }

    /// Restore a namespace snapshot from `path` into `ns`
    ///
    /// Entries are added to whatever `ns` already holds; restored keys
    /// replace existing ones. The file is fully decoded before anything is
    /// inserted, so a bad file changes nothing.
    pub fn load(&self, ns: impl IntoNamespace, path: impl AsRef<Path>) -> Result<usize> {
        let (ns, table) = self.guard(ns)?;
        let path = path.as_ref();

        let records: Vec<(Value, Value)> =
            snapshot::read_snapshot(path, table.meta(), SnapshotScope::Namespace)?;
        let entries = records
            .into_iter()
            .map(|(key, value)| (EntryKey::new(ns.clone(), key), value))
            .collect();
        let restored = table.insert_many(entries);

        info!(namespace = %ns, path = %path.display(), entries = restored, "loaded namespace");
        Ok(restored)
    }

    /// Write the whole table, namespace tags included, to `path`
    pub fn persist_all(&self, path: impl AsRef<Path>) -> Result<usize> {
        let table = self.table();
        let path = path.as_ref();

        let records = table.scan(|k, v| Some((k.clone(), v.clone())));
        let snapshot = snapshot::write_snapshot(
            path,
            table.meta(),
            SnapshotScope::Raw,
            self.manager.config().snapshot_sync,
            records,
        )?;

        info!(path = %path.display(), entries = snapshot.entry_count, "persisted table");
        Ok(snapshot.entry_count as usize)
    }

    /// Restore a whole-table snapshot, each entry into its recorded namespace
    ///
    /// Recorded namespaces must fit this store's length limit; a file holding
    /// a longer one is rejected before anything is inserted.
    pub fn load_all(&self, path: impl AsRef<Path>) -> Result<usize> {
        let table = self.table();
        let path = path.as_ref();

        let entries: Vec<(EntryKey, Value)> =
            snapshot::read_snapshot(path, table.meta(), SnapshotScope::Raw)?;
        if let Some((key, _)) = entries
            .iter()
            .find(|(key, _)| self.check_namespace_len(&key.namespace).is_err())
        {
            return Err(CacheError::SnapshotMismatch(format!(
                "namespace {} exceeds the limit of {} bytes",
                key.namespace,
                self.manager.config().max_namespace_len
            )));
        }
        let restored = table.insert_many(entries);

        info!(path = %path.display(), entries = restored, "loaded table");
        Ok(restored)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The manager owning this store's table
    pub fn manager(&self) -> &Arc<TableManager> {
        &self.manager
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Validate the namespace argument, then hand out the (created) table
    fn guard(&self, ns: impl IntoNamespace) -> Result<(Namespace, &SharedTable)> {
        let ns = ns.into_namespace()?;
        self.check_namespace_len(&ns)?;
        Ok((ns, self.manager.table()))
    }

    fn check_namespace_len(&self, ns: &Namespace) -> Result<()> {
        let max_len = self.manager.config().max_namespace_len;
        if ns.len() > max_len {
            return Err(CacheError::InvalidNamespace(format!(
                "{} is {} bytes long, limit is {}",
                ns,
                ns.len(),
                max_len
            )));
        }
        Ok(())
    }

    fn table(&self) -> &SharedTable {
        self.manager.table()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Arc::new(TableManager::default()))
    }
}
