//! Learning log - bounded, newest-first log of reflections per namespace
//!
//! Stored as `{ "reflections": [...] }`. Appends prepend and truncate, so the
//! oldest entry is always the one evicted.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{ReasoningError, ReasoningResult};
use super::keying::Namespace;
use super::search::{or_query, FuzzySearchEngine, Searchable};
use super::storage::{Document, DocumentStore, NamespaceInfo};
use crate::types::{Outcome, Reflection, ScoredReflection};

/// Default number of reflections kept per namespace
pub const DEFAULT_MAX_REFLECTIONS: usize = 20;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReflectionLog {
    #[serde(default)]
    reflections: Vec<Reflection>,
}

pub struct LearningLog {
    store: Arc<dyn DocumentStore>,
    max_entries: usize,
    local_engine: FuzzySearchEngine,
    global_engine: FuzzySearchEngine,
}

impl LearningLog {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        max_entries: usize,
        local_engine: FuzzySearchEngine,
        global_engine: FuzzySearchEngine,
    ) -> Self {
        Self {
            store,
            max_entries: max_entries.max(1),
            local_engine,
            global_engine,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Reflections for a namespace, newest first
    pub fn list(&self, namespace: &Namespace) -> ReasoningResult<Vec<Reflection>> {
        Ok(self.load(namespace)?.reflections)
    }

    /// Record a reflection at the head of the log
    pub fn append(
        &self,
        namespace: &Namespace,
        ticket_id: &str,
        task: &str,
        outcome: Outcome,
        learning: &str,
    ) -> ReasoningResult<Reflection> {
        let mut log = self.load(namespace)?;

        let reflection = Reflection {
            ticket_id: ticket_id.to_string(),
            timestamp: Utc::now(),
            task: task.to_string(),
            outcome,
            learning: learning.to_string(),
        };
        log.reflections.insert(0, reflection.clone());
        log.reflections.truncate(self.max_entries);

        self.save(namespace, &log)?;
        info!("Logged {} reflection for ticket {} in {}", outcome, ticket_id, namespace);
        Ok(reflection)
    }

    /// Search one namespace; any whitespace-separated term may match
    pub fn search_local(
        &self,
        namespace: &Namespace,
        query: &str,
        limit: usize,
    ) -> ReasoningResult<Vec<ScoredReflection>> {
        let reflections = self.list(namespace)?;
        let hits = self.local_engine.search(reflections, &or_query(query), limit);

        Ok(hits
            .into_iter()
            .map(|(reflection, score)| ScoredReflection {
                reflection,
                score,
                namespace: None,
                workspace_path: None,
            })
            .collect())
    }

    /// Search every namespace, tagging each hit with where it came from
    ///
    /// A namespace whose log cannot be read is skipped with a warning.
    pub fn search_global(&self, query: &str, limit: usize) -> ReasoningResult<Vec<ScoredReflection>> {
        let mut tagged = Vec::new();

        for namespace in self.store.namespaces()? {
            let reflections = match self.list(&namespace) {
                Ok(reflections) => reflections,
                Err(e) => {
                    warn!("Skipping namespace {} in global search: {}", namespace, e);
                    continue;
                }
            };
            if reflections.is_empty() {
                continue;
            }

            let workspace_path = NamespaceInfo::load(self.store.as_ref(), &namespace).map(|i| i.workspace_path);
            tagged.extend(reflections.into_iter().map(|reflection| TaggedReflection {
                reflection,
                namespace: namespace.to_string(),
                workspace_path: workspace_path.clone(),
            }));
        }

        let hits = self.global_engine.search(tagged, query, limit);

        Ok(hits
            .into_iter()
            .map(|(tagged, score)| ScoredReflection {
                reflection: tagged.reflection,
                score,
                namespace: Some(tagged.namespace),
                workspace_path: tagged.workspace_path,
            })
            .collect())
    }

    /// Remove reflections for a ticket; `false` when the log did not change
    pub fn revert(&self, namespace: &Namespace, ticket_id: &str) -> ReasoningResult<bool> {
        if self.store.load(namespace, Document::Reflections)?.is_none() {
            return Ok(false);
        }

        let mut log = self.load(namespace)?;
        let before = log.reflections.len();
        log.reflections.retain(|r| r.ticket_id != ticket_id);

        if log.reflections.len() == before {
            return Ok(false);
        }

        self.save(namespace, &log)?;
        info!("Removed reflection for ticket {} in {}", ticket_id, namespace);
        Ok(true)
    }

    fn load(&self, namespace: &Namespace) -> ReasoningResult<ReflectionLog> {
        let Some(content) = self.store.load(namespace, Document::Reflections)? else {
            return Ok(ReflectionLog::default());
        };
        if content.trim().is_empty() {
            return Ok(ReflectionLog::default());
        }
        serde_json::from_str(&content).map_err(|source| ReasoningError::StorageCorrupt {
            document: Document::Reflections.to_string(),
            source,
        })
    }

    fn save(&self, namespace: &Namespace, log: &ReflectionLog) -> ReasoningResult<()> {
        let json = serde_json::to_string_pretty(log).map_err(|source| ReasoningError::Encode {
            what: Document::Reflections.to_string(),
            source,
        })?;
        self.store.save(namespace, Document::Reflections, &json)
    }
}

/// A reflection carried through global ranking with its origin
struct TaggedReflection {
    reflection: Reflection,
    namespace: String,
    workspace_path: Option<String>,
}

impl Searchable for TaggedReflection {
    fn search_fields(&self) -> Vec<&str> {
        self.reflection.search_fields()
    }
}
