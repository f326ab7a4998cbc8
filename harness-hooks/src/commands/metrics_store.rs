//! Persistence for the metric documents.
//!
//! The recorder only sees [`MetricsStore`]; the binary wires in [`FsStore`]
//! and tests use [`MemoryStore`].

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::atomic_io;
use super::errors::{HookError, Result};
use super::metrics_types::MetricsDoc;

/// Load/save of raw document text by key.
pub trait MetricsStore {
    /// `Ok(None)` when the document does not exist yet.
    fn load_raw(&self, doc: MetricsDoc) -> Result<Option<String>>;

    /// Replace the document with `content`.
    fn save_raw(&self, doc: MetricsDoc, content: &str) -> Result<()>;
}

/// Load a typed document.
///
/// Missing files, unparseable text and non-object roots yield the default
/// (empty) document. A well-formed object that does not fit the document
/// shape is an error, so the caller never overwrites it.
pub fn load_doc<T, S>(store: &S, doc: MetricsDoc) -> Result<T>
where
    T: DeserializeOwned + Default,
    S: MetricsStore + ?Sized,
{
    let Some(raw) = store.load_raw(doc)? else {
        tracing::debug!(%doc, "metrics document missing, starting empty");
        return Ok(T::default());
    };

    let tree: Value = match serde_json::from_str(&raw) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(%doc, error = %e, "metrics document unreadable, starting empty");
            return Ok(T::default());
        }
    };
    if !tree.is_object() {
        tracing::warn!(%doc, "metrics document is not a JSON object, starting empty");
        return Ok(T::default());
    }

    serde_json::from_value(tree).map_err(|e| HookError::ForeignDocument {
        doc: doc.to_string(),
        details: e.to_string(),
    })
}

/// Serialize with sorted keys and two-space indentation.
pub fn render_doc<T: Serialize>(value: &T) -> Result<String> {
    // serde_json::Map is ordered by key, so going through Value sorts every level
    let tree = serde_json::to_value(value).map_err(|e| HookError::Serialization {
        context: "metrics document",
        details: e.to_string(),
    })?;
    serde_json::to_string_pretty(&tree).map_err(|e| HookError::Serialization {
        context: "metrics document",
        details: e.to_string(),
    })
}

pub fn save_doc<T, S>(store: &S, doc: MetricsDoc, value: &T) -> Result<()>
where
    T: Serialize,
    S: MetricsStore + ?Sized,
{
    let content = render_doc(value)?;
    store.save_raw(doc, &content)
}

/// Documents stored as files under one directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, doc: MetricsDoc) -> PathBuf {
        self.dir.join(doc.file_name())
    }
}

impl MetricsStore for FsStore {
    fn load_raw(&self, doc: MetricsDoc) -> Result<Option<String>> {
        let path = self.path_of(doc);
        match fs::read(&path) {
            // Non-UTF-8 bytes are corruption, not an environment failure
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HookError::io(path, e)),
        }
    }

    fn save_raw(&self, doc: MetricsDoc, content: &str) -> Result<()> {
        let path = self.path_of(doc);
        atomic_io::atomic_write(&path, content.as_bytes()).map_err(|e| HookError::io(&path, e))
    }
}

/// In-process store.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RefCell<BTreeMap<MetricsDoc, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document with raw content.
    pub fn with(self, doc: MetricsDoc, content: impl Into<String>) -> Self {
        self.docs.borrow_mut().insert(doc, content.into());
        self
    }

    pub fn get(&self, doc: MetricsDoc) -> Option<String> {
        self.docs.borrow().get(&doc).cloned()
    }
}

#[cfg(test)]
impl MetricsStore for MemoryStore {
    fn load_raw(&self, doc: MetricsDoc) -> Result<Option<String>> {
        Ok(self.get(doc))
    }

    fn save_raw(&self, doc: MetricsDoc, content: &str) -> Result<()> {
        self.docs.borrow_mut().insert(doc, content.to_string());
        Ok(())
    }
}
