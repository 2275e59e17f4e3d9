use crate::database::Identifier;
use crate::database::Storage;
use crate::error::ResultMessage;
use crate::error::SheetLoaderError;
use crate::import::ImportError;
use std::collections::BTreeSet;
use std::collections::HashSet;
use std::sync::Condvar;
use std::sync::Mutex;

/// The table rows go to, resolved once per import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableTarget {
    pub name: Identifier,
    /// Columns of the table being appended to; `None` when it still has to be created
    pub existing_columns: Option<Vec<Identifier>>,
}

impl TableTarget {
    pub fn is_new(&self) -> bool {
        self.existing_columns.is_none()
    }
}

/// Picks the table for a header set.
///
/// A missing table is created under the proposed name. An existing table with the
/// same column set, in any order, is appended to. Otherwise the first free name
/// among `<name>_1`, `<name>_2`, ... is used for a new table.
pub fn resolve<S: Storage + ?Sized>(
    storage: &mut S,
    proposed: &Identifier,
    columns: &[Identifier],
) -> Result<TableTarget, SheetLoaderError> {
    if !storage.table_exists(proposed)? {
        return Ok(TableTarget {
            name: proposed.clone(),
            existing_columns: None,
        });
    }

    let existing = storage.list_columns(proposed).with_prefix(&format!("reconcile {}", proposed))?;
    let wanted: BTreeSet<&Identifier> = columns.iter().collect();
    let found: BTreeSet<&Identifier> = existing.iter().collect();
    if wanted == found {
        tracing::debug!(table = %proposed, "Existing table has the same columns, appending");
        return Ok(TableTarget {
            name: proposed.clone(),
            existing_columns: Some(existing),
        });
    }

    let mut suffix = 1;
    loop {
        let candidate = proposed.with_suffix(suffix);
        if !storage.table_exists(&candidate)? {
            tracing::info!(table = %proposed, fork = %candidate, "Existing table has other columns, forking");
            return Ok(TableTarget {
                name: candidate,
                existing_columns: None,
            });
        }
        suffix += 1;
    }
}

/// Serializes imports that target the same proposed table name within one process.
#[derive(Debug, Default)]
pub struct NameLocks {
    held: Mutex<HashSet<Identifier>>,
    released: Condvar,
}

/// Holds a table name until dropped.
#[derive(Debug)]
pub struct NameGuard<'a> {
    locks: &'a NameLocks,
    name: Identifier,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no other guard holds `name`.
    pub fn acquire(&self, name: &Identifier) -> Result<NameGuard<'_>, SheetLoaderError> {
        let mut held = self.held.lock().map_err(|_| ImportError::LockPoisoned)?;
        while held.contains(name) {
            held = self.released.wait(held).map_err(|_| ImportError::LockPoisoned)?;
        }
        held.insert(name.clone());
        Ok(NameGuard {
            locks: self,
            name: name.clone(),
        })
    }

    pub fn is_held(&self, name: &Identifier) -> bool {
        self.held.lock().map(|held| held.contains(name)).unwrap_or(false)
    }
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut held) = self.locks.held.lock() {
            held.remove(&self.name);
        }
        self.locks.released.notify_all();
    }
}
