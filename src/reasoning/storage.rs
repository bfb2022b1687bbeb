//! Document storage for reasoning namespaces
//!
//! Each namespace owns a handful of small JSON documents. Stores only move raw
//! text; parsing (and corruption detection) belongs to the ticket store and
//! learning log so that a different backend can be swapped in without touching
//! lifecycle logic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{ReasoningError, ReasoningResult};
use super::keying::Namespace;

/// The documents kept per namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    /// Ticket ledger
    Tickets,
    /// Reflection log
    Reflections,
    /// Which workspace the namespace belongs to
    Info,
}

impl Document {
    pub fn file_name(&self) -> &'static str {
        match self {
            Document::Tickets => "tickets.json",
            Document::Reflections => "reflections.json",
            Document::Info => "namespace.json",
        }
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Document::Tickets => write!(f, "ticket ledger"),
            Document::Reflections => write!(f, "reflection log"),
            Document::Info => write!(f, "namespace info"),
        }
    }
}

/// Load/save interface over namespace documents
pub trait DocumentStore: Send + Sync {
    /// Read a document; `None` when it has never been written
    fn load(&self, namespace: &Namespace, document: Document) -> ReasoningResult<Option<String>>;

    /// Replace a document in full, creating the namespace if needed
    fn save(&self, namespace: &Namespace, document: Document, contents: &str) -> ReasoningResult<()>;

    /// All namespaces that currently hold any document
    fn namespaces(&self) -> ReasoningResult<Vec<Namespace>>;
}

/// Which workspace a namespace was derived from
///
/// Written once on first use. Purely informational: a missing or unreadable
/// record never fails an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub workspace_path: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl NamespaceInfo {
    /// Read the info record, if present and well-formed
    pub fn load(store: &dyn DocumentStore, namespace: &Namespace) -> Option<Self> {
        match store.load(namespace, Document::Info) {
            Ok(Some(content)) => serde_json::from_str(&content).ok(),
            Ok(None) => None,
            Err(e) => {
                debug!("Could not read namespace info for {}: {}", namespace, e);
                None
            }
        }
    }

    /// Record the workspace path for a namespace unless already recorded
    pub fn ensure(store: &dyn DocumentStore, namespace: &Namespace, workspace: &str) -> ReasoningResult<()> {
        if Self::load(store, namespace).is_some() {
            return Ok(());
        }
        let info = Self {
            workspace_path: workspace.to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&info).map_err(|source| ReasoningError::Encode {
            what: Document::Info.to_string(),
            source,
        })?;
        store.save(namespace, Document::Info, &json)
    }
}

/// Filesystem-backed store rooted at a central directory
///
/// Layout: `<root>/<namespace>/<document>.json`. Writes go to a temp file
/// that is renamed over the target, so readers never observe a torn document.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Create with a custom root directory
    pub fn with_dir(root: PathBuf) -> ReasoningResult<Self> {
        std::fs::create_dir_all(&root)
            .map_err(|e| ReasoningError::io(format!("Failed to create store root {}", root.display()), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &Namespace) -> PathBuf {
        self.root.join(namespace.as_str())
    }

    fn document_path(&self, namespace: &Namespace, document: Document) -> PathBuf {
        self.namespace_dir(namespace).join(document.file_name())
    }
}

impl DocumentStore for FsDocumentStore {
    fn load(&self, namespace: &Namespace, document: Document) -> ReasoningResult<Option<String>> {
        let path = self.document_path(namespace, document);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!("Loaded {} from {}", document, path.display());
                Ok(Some(content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ReasoningError::io(format!("Failed to read {}", path.display()), e)),
        }
    }

    fn save(&self, namespace: &Namespace, document: Document, contents: &str) -> ReasoningResult<()> {
        let dir = self.namespace_dir(namespace);
        std::fs::create_dir_all(&dir)
            .map_err(|e| ReasoningError::io(format!("Failed to create {}", dir.display()), e))?;

        let path = dir.join(document.file_name());
        atomic_write(&path, contents)?;
        debug!("Saved {} to {}", document, path.display());
        Ok(())
    }

    fn namespaces(&self) -> ReasoningResult<Vec<Namespace>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ReasoningError::io(
                    format!("Failed to list {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut namespaces = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(ns) = Namespace::from_key(&entry.file_name().to_string_lossy()) {
                namespaces.push(ns);
            }
        }
        namespaces.sort();
        Ok(namespaces)
    }
}

/// Write to a sibling temp file, then rename over the target
fn atomic_write(path: &Path, contents: &str) -> ReasoningResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    std::fs::write(&temp_path, contents)
        .map_err(|e| ReasoningError::io(format!("Failed to write {}", temp_path.display()), e))?;

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(ReasoningError::io(format!("Failed to replace {}", path.display()), e));
    }
    Ok(())
}

/// In-memory store, for tests and embedding
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<(Namespace, Document), String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load(&self, namespace: &Namespace, document: Document) -> ReasoningResult<Option<String>> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(documents.get(&(namespace.clone(), document)).cloned())
    }

    fn save(&self, namespace: &Namespace, document: Document, contents: &str) -> ReasoningResult<()> {
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        documents.insert((namespace.clone(), document), contents.to_string());
        Ok(())
    }

    fn namespaces(&self) -> ReasoningResult<Vec<Namespace>> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        let mut namespaces: Vec<Namespace> = documents.keys().map(|(ns, _)| ns.clone()).collect();
        namespaces.sort();
        namespaces.dedup();
        Ok(namespaces)
    }
}
