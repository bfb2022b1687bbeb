//! Systematic Reasoning - reasoning tickets and a learning log for AI agents
//!
//! Exposes a small set of MCP tools that:
//! - Open one reasoning cycle per workspace and hand back a <think> budget
//! - Record a short reflection when the cycle finishes
//! - Fuzzy-search past reflections in one workspace or all of them
//! - Revert a cycle together with its reflection
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use systematic_reasoning::config::Config;
//! use systematic_reasoning::reasoning::{FsDocumentStore, TicketLifecycleCoordinator};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store = FsDocumentStore::with_dir(config.store_root()?)?;
//!     let coordinator = TicketLifecycleCoordinator::new(Arc::new(store), &config);
//!     let begun = coordinator.begin("/home/me/project", "fix flaky test", Some(1000))?;
//!     println!("{}", begun.instruction);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod reasoning;
pub mod config;
pub mod mcp;
pub mod cli;

pub use config::Config;

pub use reasoning::{
    BeginOutcome,
    RevertOutcome,
    ReasoningError,
    TicketLifecycleCoordinator,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Reasoning ticket and learning store", NAME, VERSION)
}
