//! Per-thread diagnostic context.
//!
//! Each thread owns a small ordered map of string tags (request ids, tenant
//! names and the like) used to correlate log lines. Worker threads do not
//! inherit it; instead the dispatching thread captures a
//! [`DiagnosticSnapshot`] once and every worker installs its own private copy
//! before running user code.

use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

thread_local! {
    static CONTEXT: RefCell<BTreeMap<String, String>> = RefCell::new(BTreeMap::new());
}

/// Sets a diagnostic tag on the current thread.
pub fn put(key: impl Into<String>, value: impl Into<String>) {
    CONTEXT.with(|ctx| {
        ctx.borrow_mut().insert(key.into(), value.into());
    });
}

/// Gets a diagnostic tag from the current thread.
#[must_use]
pub fn get(key: &str) -> Option<String> {
    CONTEXT.with(|ctx| ctx.borrow().get(key).cloned())
}

/// Removes a diagnostic tag from the current thread.
pub fn remove(key: &str) -> Option<String> {
    CONTEXT.with(|ctx| ctx.borrow_mut().remove(key))
}

/// Clears every diagnostic tag on the current thread.
pub fn clear() {
    CONTEXT.with(|ctx| ctx.borrow_mut().clear());
}

/// Returns a copy of the current thread's tags.
#[must_use]
pub fn current() -> BTreeMap<String, String> {
    CONTEXT.with(|ctx| ctx.borrow().clone())
}

fn replace(entries: BTreeMap<String, String>) -> BTreeMap<String, String> {
    CONTEXT.with(|ctx| std::mem::replace(&mut *ctx.borrow_mut(), entries))
}

/// An immutable copy of a thread's diagnostic tags.
///
/// Cloning is cheap; the tags themselves are only copied when installed on a
/// thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticSnapshot {
    entries: Arc<BTreeMap<String, String>>,
}

impl DiagnosticSnapshot {
    /// Captures the current thread's tags.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            entries: Arc::new(current()),
        }
    }

    /// Creates a snapshot from explicit tags.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Arc::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Returns a tag from the snapshot.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot holds no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the tags as a map.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Installs a private copy of the snapshot as the thread's whole context.
    ///
    /// The returned guard clears the thread's context when dropped. Use it
    /// for the lifetime of a worker thread.
    #[must_use = "the context is cleared as soon as the guard is dropped"]
    pub fn install(&self) -> DiagnosticGuard {
        replace((*self.entries).clone());
        DiagnosticGuard { _private: () }
    }

    /// Installs a private copy of the snapshot for the duration of one job.
    ///
    /// The returned scope restores whatever the thread held before when
    /// dropped. Use it on threads that outlive the job.
    #[must_use = "the previous context is restored as soon as the scope is dropped"]
    pub fn enter(&self) -> DiagnosticScope {
        let previous = replace((*self.entries).clone());
        DiagnosticScope {
            previous: Some(previous),
        }
    }
}

impl Serialize for DiagnosticSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.as_ref().serialize(serializer)
    }
}

impl fmt::Display for DiagnosticSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.entries.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Clears the thread's diagnostic context on drop.
#[derive(Debug)]
pub struct DiagnosticGuard {
    _private: (),
}

impl Drop for DiagnosticGuard {
    fn drop(&mut self) {
        clear();
    }
}

/// Restores the thread's previous diagnostic context on drop.
#[derive(Debug)]
pub struct DiagnosticScope {
    previous: Option<BTreeMap<String, String>>,
}

impl Drop for DiagnosticScope {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            replace(previous);
        }
    }
}
