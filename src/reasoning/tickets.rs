//! Ticket store - the ledger of reasoning cycles for a namespace
//!
//! Every mutation reads the whole ledger, changes it in memory and writes it
//! back in full. Callers that need mutual exclusion across the read and the
//! write must hold the namespace lock (see the coordinator).

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::error::{ReasoningError, ReasoningResult};
use super::keying::Namespace;
use super::storage::{Document, DocumentStore};
use crate::types::{ReasoningTicket, TicketStatus};

pub struct TicketStore {
    store: Arc<dyn DocumentStore>,
}

impl TicketStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All tickets in insertion order
    ///
    /// A ledger that exists but does not parse is reported as corrupt rather
    /// than treated as empty, so history is never silently discarded.
    pub fn list(&self, namespace: &Namespace) -> ReasoningResult<Vec<ReasoningTicket>> {
        let Some(content) = self.store.load(namespace, Document::Tickets)? else {
            return Ok(Vec::new());
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| ReasoningError::StorageCorrupt {
            document: Document::Tickets.to_string(),
            source,
        })
    }

    /// The active ticket, if any
    pub fn active(&self, namespace: &Namespace) -> ReasoningResult<Option<ReasoningTicket>> {
        Ok(self.list(namespace)?.into_iter().find(|t| t.is_active()))
    }

    /// Open a new reasoning cycle
    pub fn begin(
        &self,
        namespace: &Namespace,
        workspace: &str,
        task_description: &str,
    ) -> ReasoningResult<ReasoningTicket> {
        let mut tickets = self.list(namespace)?;

        if let Some(active) = tickets.iter().find(|t| t.is_active()) {
            return Err(ReasoningError::Conflict {
                ticket_id: active.id.clone(),
                task_description: active.task_description.clone(),
            });
        }

        let ticket = ReasoningTicket {
            id: Uuid::new_v4().to_string(),
            workspace_path: workspace.to_string(),
            task_description: task_description.to_string(),
            status: TicketStatus::Active,
            created_at: Utc::now(),
        };
        tickets.push(ticket.clone());
        self.save(namespace, &tickets)?;

        info!("Opened reasoning ticket {} in {}", ticket.id, namespace);
        Ok(ticket)
    }

    /// Mark an active ticket completed
    pub fn complete(&self, namespace: &Namespace, ticket_id: &str) -> ReasoningResult<ReasoningTicket> {
        let mut tickets = self.list(namespace)?;

        let Some(ticket) = tickets
            .iter_mut()
            .find(|t| t.id == ticket_id && t.is_active())
        else {
            return Err(ReasoningError::NotFound {
                ticket_id: ticket_id.to_string(),
            });
        };
        ticket.status = TicketStatus::Completed;
        let completed = ticket.clone();

        self.save(namespace, &tickets)?;
        info!("Completed reasoning ticket {} in {}", ticket_id, namespace);
        Ok(completed)
    }

    /// Remove a ticket regardless of status; `false` when there was nothing to remove
    pub fn revert(&self, namespace: &Namespace, ticket_id: &str) -> ReasoningResult<bool> {
        let mut tickets = self.list(namespace)?;
        let before = tickets.len();
        tickets.retain(|t| t.id != ticket_id);

        if tickets.len() == before {
            return Ok(false);
        }

        self.save(namespace, &tickets)?;
        info!("Reverted reasoning ticket {} in {}", ticket_id, namespace);
        Ok(true)
    }

    fn save(&self, namespace: &Namespace, tickets: &[ReasoningTicket]) -> ReasoningResult<()> {
        let json = serde_json::to_string_pretty(tickets).map_err(|source| ReasoningError::Encode {
            what: Document::Tickets.to_string(),
            source,
        })?;
        self.store.save(namespace, Document::Tickets, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::keying::namespace_of;
    use crate::reasoning::storage::MemoryDocumentStore;

    fn store() -> (TicketStore, Arc<MemoryDocumentStore>) {
        let docs = Arc::new(MemoryDocumentStore::new());
        (TicketStore::new(docs.clone()), docs)
    }

    #[test]
    fn test_begin_creates_active_ticket() {
        let (tickets, _) = store();
        let ns = namespace_of("/proj");

        let ticket = tickets.begin(&ns, "/proj", "fix bug").unwrap();
        assert_eq!(ticket.status, TicketStatus::Active);
        assert_eq!(ticket.workspace_path, "/proj");
        assert!(Uuid::parse_str(&ticket.id).is_ok());

        let listed = tickets.list(&ns).unwrap();
        assert_eq!(listed, vec![ticket]);
    }

    #[test]
    fn test_second_begin_conflicts_with_first() {
        let (tickets, _) = store();
        let ns = namespace_of("/proj");

        let first = tickets.begin(&ns, "/proj", "t1").unwrap();
        match tickets.begin(&ns, "/proj", "t2") {
            Err(ReasoningError::Conflict { ticket_id, task_description }) => {
                assert_eq!(ticket_id, first.id);
                assert_eq!(task_description, "t1");
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(tickets.list(&ns).unwrap().len(), 1);
    }

    #[test]
    fn test_namespaces_are_independent() {
        let (tickets, _) = store();
        tickets.begin(&namespace_of("/a"), "/a", "t").unwrap();
        assert!(tickets.begin(&namespace_of("/b"), "/b", "t").is_ok());
    }

    #[test]
    fn test_complete_then_complete_again_is_not_found() {
        let (tickets, _) = store();
        let ns = namespace_of("/proj");
        let ticket = tickets.begin(&ns, "/proj", "t1").unwrap();

        let done = tickets.complete(&ns, &ticket.id).unwrap();
        assert_eq!(done.status, TicketStatus::Completed);
        assert!(tickets.active(&ns).unwrap().is_none());

        assert!(matches!(
            tickets.complete(&ns, &ticket.id),
            Err(ReasoningError::NotFound { .. })
        ));
        assert!(matches!(
            tickets.complete(&ns, "never-existed"),
            Err(ReasoningError::NotFound { .. })
        ));
    }

    #[test]
    fn test_begin_after_complete_succeeds_and_keeps_history() {
        let (tickets, _) = store();
        let ns = namespace_of("/proj");
        let first = tickets.begin(&ns, "/proj", "t1").unwrap();
        tickets.complete(&ns, &first.id).unwrap();

        let second = tickets.begin(&ns, "/proj", "t2").unwrap();
        let listed = tickets.list(&ns).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[test]
    fn test_revert_is_idempotent() {
        let (tickets, _) = store();
        let ns = namespace_of("/proj");
        let ticket = tickets.begin(&ns, "/proj", "t1").unwrap();

        assert!(tickets.revert(&ns, &ticket.id).unwrap());
        assert!(!tickets.revert(&ns, &ticket.id).unwrap());
        assert!(!tickets.revert(&ns, "missing").unwrap());
        assert!(tickets.list(&ns).unwrap().is_empty());
    }

    #[test]
    fn test_revert_removes_completed_ticket() {
        let (tickets, _) = store();
        let ns = namespace_of("/proj");
        let ticket = tickets.begin(&ns, "/proj", "t1").unwrap();
        tickets.complete(&ns, &ticket.id).unwrap();

        assert!(tickets.revert(&ns, &ticket.id).unwrap());
        assert!(tickets.list(&ns).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_ledger_is_reported_not_reset() {
        let (tickets, docs) = store();
        let ns = namespace_of("/proj");
        docs.save(&ns, Document::Tickets, "{ not json").unwrap();

        assert!(matches!(tickets.list(&ns), Err(ReasoningError::StorageCorrupt { .. })));
        assert!(matches!(
            tickets.begin(&ns, "/proj", "t"),
            Err(ReasoningError::StorageCorrupt { .. })
        ));
        // The corrupt document is left as it was
        assert_eq!(
            docs.load(&ns, Document::Tickets).unwrap().as_deref(),
            Some("{ not json")
        );
    }

    #[test]
    fn test_blank_ledger_is_empty() {
        let (tickets, docs) = store();
        let ns = namespace_of("/proj");
        docs.save(&ns, Document::Tickets, "  \n").unwrap();
        assert!(tickets.list(&ns).unwrap().is_empty());
    }
}
