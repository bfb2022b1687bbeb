//! Reasoning Ticket & Learning Store
//!
//! Tracks one in-flight reasoning cycle per workspace, keeps a bounded log of
//! the lessons learned when cycles finish, and ranks those lessons against
//! free-text queries. State lives in small JSON documents under a central
//! directory, one subdirectory per workspace namespace.

pub mod error;
pub mod keying;
pub mod storage;
pub mod tickets;
pub mod reflections;
pub mod search;
pub mod instructions;
pub mod coordinator;

pub use coordinator::{BeginOutcome, RevertOutcome, TicketLifecycleCoordinator};
pub use error::{ReasoningError, ReasoningResult};
pub use keying::{namespace_of, Namespace};
pub use reflections::{LearningLog, DEFAULT_MAX_REFLECTIONS};
pub use search::{FuzzySearchEngine, Searchable};
pub use storage::{Document, DocumentStore, FsDocumentStore, MemoryDocumentStore, NamespaceInfo};
pub use tickets::TicketStore;
