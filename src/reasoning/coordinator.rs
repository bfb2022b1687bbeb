//! Ticket lifecycle coordinator
//!
//! The only entry point that pairs ticket transitions with log changes.
//! Per namespace the lifecycle is idle -> active -> idle (on completion or
//! revert). Each operation runs under a per-namespace lock so that two callers
//! in this process cannot both see "no active ticket" and both begin.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{error, warn};

use super::error::{ReasoningError, ReasoningResult};
use super::instructions::begin_instruction;
use super::keying::{namespace_of, Namespace};
use super::reflections::LearningLog;
use super::search::FuzzySearchEngine;
use super::storage::{DocumentStore, NamespaceInfo};
use super::tickets::TicketStore;
use crate::config::Config;
use crate::types::{Outcome, ReasoningTicket, Reflection, ScoredReflection};

/// Result of opening a reasoning cycle
#[derive(Debug, Clone, Serialize)]
pub struct BeginOutcome {
    pub ticket: ReasoningTicket,
    pub token_budget: u32,
    pub instruction: String,
}

/// What a revert actually removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevertOutcome {
    pub ticket_removed: bool,
    pub reflection_removed: bool,
}

impl RevertOutcome {
    pub fn removed_anything(&self) -> bool {
        self.ticket_removed || self.reflection_removed
    }
}

#[derive(Default)]
struct NamespaceLocks {
    locks: Mutex<HashMap<Namespace, Arc<Mutex<()>>>>,
}

impl NamespaceLocks {
    fn get(&self, namespace: &Namespace) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Entries only the map still references are idle
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(namespace.clone()).or_default().clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

pub struct TicketLifecycleCoordinator {
    store: Arc<dyn DocumentStore>,
    tickets: TicketStore,
    log: LearningLog,
    default_token_budget: u32,
    locks: NamespaceLocks,
}

impl TicketLifecycleCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self {
            tickets: TicketStore::new(store.clone()),
            log: LearningLog::new(
                store.clone(),
                config.store.max_reflections,
                FuzzySearchEngine::new(config.search.local_threshold),
                FuzzySearchEngine::new(config.search.global_threshold),
            ),
            store,
            default_token_budget: config.reasoning.default_token_budget,
            locks: NamespaceLocks::default(),
        }
    }

    /// Open a reasoning cycle for a workspace
    pub fn begin(
        &self,
        workspace: &str,
        task_description: &str,
        token_budget: Option<u32>,
    ) -> ReasoningResult<BeginOutcome> {
        let namespace = namespace_of(workspace);
        let lock = self.locks.get(&namespace);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let ticket = self.tickets.begin(&namespace, workspace, task_description)?;
        if let Err(e) = NamespaceInfo::ensure(self.store.as_ref(), &namespace, workspace) {
            warn!("Could not record workspace for namespace {}: {}", namespace, e);
        }

        let token_budget = token_budget.unwrap_or(self.default_token_budget);
        let instruction = begin_instruction(&ticket.id, token_budget);
        Ok(BeginOutcome {
            ticket,
            token_budget,
            instruction,
        })
    }

    /// Close the active cycle and record its reflection
    ///
    /// Both documents are read first, so a corrupt log leaves the ticket
    /// active. The ticket transition and the log append are separate writes.
    /// If the append still fails after one retry the ticket stays completed
    /// and the caller gets `PartialFailure`.
    pub fn complete(
        &self,
        workspace: &str,
        ticket_id: &str,
        task: &str,
        outcome: Outcome,
        learning: &str,
    ) -> ReasoningResult<Reflection> {
        let namespace = namespace_of(workspace);
        let lock = self.locks.get(&namespace);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // A log that cannot be parsed fails here, before the ticket changes
        self.log.list(&namespace)?;
        self.tickets.complete(&namespace, ticket_id)?;

        match self.log.append(&namespace, ticket_id, task, outcome, learning) {
            Ok(reflection) => Ok(reflection),
            Err(first) => {
                warn!("Reflection append for ticket {} failed, retrying: {}", ticket_id, first);
                self.log
                    .append(&namespace, ticket_id, task, outcome, learning)
                    .map_err(|e| {
                        error!("Ticket {} completed without a recorded reflection: {}", ticket_id, e);
                        ReasoningError::PartialFailure {
                            ticket_id: ticket_id.to_string(),
                            source: Box::new(e),
                        }
                    })
            }
        }
    }

    /// Fuzzy search within one workspace
    pub fn search_local(&self, workspace: &str, query: &str, limit: usize) -> ReasoningResult<Vec<ScoredReflection>> {
        self.log.search_local(&namespace_of(workspace), query, limit)
    }

    /// Fuzzy search across every workspace
    pub fn search_global(&self, query: &str, limit: usize) -> ReasoningResult<Vec<ScoredReflection>> {
        self.log.search_global(query, limit)
    }

    /// Undo a cycle: drop the ticket and its reflection, if present
    pub fn revert(&self, workspace: &str, ticket_id: &str) -> ReasoningResult<RevertOutcome> {
        let namespace = namespace_of(workspace);
        let lock = self.locks.get(&namespace);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Both documents must parse before either is rewritten
        self.tickets.list(&namespace)?;
        self.log.list(&namespace)?;

        let ticket_removed = self.tickets.revert(&namespace, ticket_id)?;
        let reflection_removed = self.log.revert(&namespace, ticket_id)?;
        Ok(RevertOutcome {
            ticket_removed,
            reflection_removed,
        })
    }

    /// Ticket ledger for a workspace, oldest first
    pub fn tickets(&self, workspace: &str) -> ReasoningResult<Vec<ReasoningTicket>> {
        self.tickets.list(&namespace_of(workspace))
    }

    /// Reflection log for a workspace, newest first
    pub fn reflections(&self, workspace: &str) -> ReasoningResult<Vec<Reflection>> {
        self.log.list(&namespace_of(workspace))
    }
}
