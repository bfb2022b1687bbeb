//! CLI interface for systematic-reasoning

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, Config, HOME_ENV};
use crate::mcp::{self, tools::ToolContext, McpServer};
use crate::reasoning::{FsDocumentStore, TicketLifecycleCoordinator};
use crate::types::Outcome;

#[derive(Parser)]
#[command(name = "systematic-reasoning")]
#[command(about = "Reasoning tickets and learning log for AI agents, served over MCP", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding all workspace namespaces
    #[arg(long, global = true, env = HOME_ENV)]
    store: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio (default when no command given)
    Serve,
    /// Start a reasoning cycle
    Begin {
        /// Workspace path
        workspace: String,
        /// What the cycle is about
        task: String,
        /// Token budget for the <think> block
        #[arg(short, long)]
        budget: Option<u32>,
    },
    /// Finish the active cycle and log a reflection
    Complete {
        /// Workspace path
        workspace: String,
        /// Ticket id returned by `begin`
        ticket_id: String,
        /// Lesson learned
        learning: String,
        /// Task text (defaults to the ticket's description)
        #[arg(short, long)]
        task: Option<String>,
        /// Mark the cycle as failed
        #[arg(long)]
        failure: bool,
    },
    /// Search past reflections
    Search {
        /// Search query
        query: String,
        /// Workspace to search (searches all workspaces when omitted)
        #[arg(short, long)]
        workspace: Option<String>,
        /// Maximum results to return
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Remove a ticket and its reflection
    Revert {
        /// Workspace path
        workspace: String,
        /// Ticket id
        ticket_id: String,
    },
    /// List tickets and reflections for a workspace
    Tickets {
        /// Workspace path
        workspace: String,
    },
    /// Show configuration
    Config {
        /// Print the default configuration as TOML
        #[arg(long)]
        defaults: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(store) = cli.store {
        config.store.root = Some(store);
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let coordinator = open_coordinator(&config)?;
            let server = McpServer::new(ToolContext::new(coordinator, config));
            mcp::serve_stdio(server).await
        }
        Commands::Begin { workspace, task, budget } => {
            if let Some(budget) = budget {
                if budget == 0 || budget > config.reasoning.max_token_budget {
                    anyhow::bail!("Budget must be between 1 and {}", config.reasoning.max_token_budget);
                }
            }
            let coordinator = open_coordinator(&config)?;
            let begun = coordinator.begin(&workspace, &task, budget)?;
            println!("{}", begun.instruction);
            Ok(())
        }
        Commands::Complete { workspace, ticket_id, learning, task, failure } => {
            let coordinator = open_coordinator(&config)?;
            let task = match task {
                Some(task) => task,
                None => coordinator
                    .tickets(&workspace)?
                    .into_iter()
                    .find(|t| t.id == ticket_id)
                    .map(|t| t.task_description)
                    .context("Unknown ticket; pass --task")?,
            };
            let outcome = if failure { Outcome::Failure } else { Outcome::Success };
            let reflection = coordinator.complete(&workspace, &ticket_id, &task, outcome, &learning)?;
            println!("Logged {} reflection for ticket {}", reflection.outcome, reflection.ticket_id);
            Ok(())
        }
        Commands::Search { query, workspace, limit } => {
            let coordinator = open_coordinator(&config)?;
            let limit = limit.unwrap_or(config.search.default_limit);
            let hits = match &workspace {
                Some(ws) => coordinator.search_local(ws, &query, limit)?,
                None => coordinator.search_global(&query, limit)?,
            };
            display_search_results(&hits);
            Ok(())
        }
        Commands::Revert { workspace, ticket_id } => {
            let coordinator = open_coordinator(&config)?;
            let reverted = coordinator.revert(&workspace, &ticket_id)?;
            if reverted.removed_anything() {
                println!(
                    "Reverted {} (ticket removed: {}, reflection removed: {})",
                    ticket_id, reverted.ticket_removed, reverted.reflection_removed
                );
            } else {
                println!("Nothing to revert for {}", ticket_id);
            }
            Ok(())
        }
        Commands::Tickets { workspace } => {
            let coordinator = open_coordinator(&config)?;
            show_workspace(&coordinator, &workspace)
        }
        Commands::Config { defaults } => {
            if defaults {
                print!("{}", config::default_config_toml());
                Ok(())
            } else {
                config::show_config(&config)
            }
        }
    }
}

fn open_coordinator(config: &Config) -> Result<Arc<TicketLifecycleCoordinator>> {
    let root = config.store_root()?;
    let store = FsDocumentStore::with_dir(root)?;
    Ok(Arc::new(TicketLifecycleCoordinator::new(Arc::new(store), config)))
}

fn show_workspace(coordinator: &TicketLifecycleCoordinator, workspace: &str) -> Result<()> {
    let tickets = coordinator.tickets(workspace)?;
    let reflections = coordinator.reflections(workspace)?;

    println!("Namespace: {}", crate::reasoning::namespace_of(workspace));
    println!("\nTickets ({}):", tickets.len());
    for ticket in &tickets {
        println!(
            "  {} [{}] {} - {}",
            ticket.id,
            ticket.status,
            ticket.created_at.format("%Y-%m-%d %H:%M UTC"),
            ticket.task_description
        );
    }

    println!("\nReflections ({}):", reflections.len());
    for reflection in &reflections {
        println!(
            "  {} [{}] {}: {}",
            reflection.timestamp.format("%Y-%m-%d %H:%M UTC"),
            reflection.outcome,
            reflection.task,
            reflection.learning
        );
    }
    Ok(())
}

fn display_search_results(results: &[crate::types::ScoredReflection]) {
    if results.is_empty() {
        println!("No matching reflections.");
        return;
    }

    for (i, hit) in results.iter().enumerate() {
        let origin = hit
            .workspace_path
            .as_deref()
            .or(hit.namespace.as_deref())
            .map(|o| format!(" ({})", o))
            .unwrap_or_default();
        println!(
            "{}. [{:.3}] [{}] {}{}",
            i + 1,
            hit.score,
            hit.reflection.outcome,
            hit.reflection.task,
            origin
        );
        println!("   {}", hit.reflection.learning);
    }
}
