//! taskhive CLI.
//!
//! Operator entry point for the runtime: inspect the policy-filtered tool
//! manifest, run one-shot sandboxed filesystem queries, and replay scripted
//! tool calls through the full registry (events, approvals, and all)
//! without a model in the loop.

mod replay;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use taskhive_core::config::RuntimeConfig;
use taskhive_core::{
    Orchestrator, RuntimeContext, ToolRegistry, Workspace, WorkspacePermissions,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskhive")]
#[command(about = "Execution runtime for agent-issued tasks")]
#[command(version)]
struct Cli {
    /// Path to the runtime config (TOML).
    #[arg(short, long, default_value = "taskhive.toml")]
    config: PathBuf,

    /// Use this directory as a read-only workspace instead of loading the
    /// config file.
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tool manifest for the workspace's current permissions.
    Manifest,
    /// Find files by glob pattern (bounded scan, newest first).
    Glob {
        pattern: String,
        /// Directory to scan, workspace-relative.
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Maximum number of results.
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Search file contents below a directory with a regex.
    Search {
        pattern: String,
        #[arg(short, long, default_value = ".")]
        path: String,
        #[arg(long)]
        case_sensitive: bool,
    },
    /// Read a file (size-capped).
    Read { path: String },
    /// Replay a JSON script of tool calls as a root task.
    Replay {
        /// Script file: a JSON array of {"tool": ..., "input": {...}}.
        script: PathBuf,
        /// Automatically approve every gated operation.
        #[arg(long, conflicts_with = "deny_all")]
        approve_all: bool,
        /// Automatically deny every gated operation.
        #[arg(long)]
        deny_all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = build_context(&cli)?;
    let orchestrator = Orchestrator::new(ctx);
    let registry = Arc::new(ToolRegistry::new(Arc::clone(&orchestrator)));

    match cli.command {
        Command::Manifest => {
            let manifest = registry.manifest();
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }
        Command::Glob {
            pattern,
            path,
            limit,
        } => {
            let input = json!({"tool": "glob_search", "input": {
                "pattern": pattern, "path": path, "max_results": limit,
            }});
            replay::run_single(&orchestrator, &registry, input).await?;
        }
        Command::Search {
            pattern,
            path,
            case_sensitive,
        } => {
            let input = json!({"tool": "grep_search", "input": {
                "pattern": pattern, "path": path, "case_sensitive": case_sensitive,
            }});
            replay::run_single(&orchestrator, &registry, input).await?;
        }
        Command::Read { path } => {
            let input = json!({"tool": "read_file", "input": {"path": path}});
            replay::run_single(&orchestrator, &registry, input).await?;
        }
        Command::Replay {
            script,
            approve_all,
            deny_all,
        } => {
            let raw = std::fs::read_to_string(&script)
                .with_context(|| format!("failed to read script {}", script.display()))?;
            let calls: Vec<replay::ScriptedCall> = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse script {}", script.display()))?;
            let policy = if deny_all {
                replay::AutoDecision::DenyAll
            } else if approve_all {
                replay::AutoDecision::ApproveAll
            } else {
                replay::AutoDecision::Interactive
            };
            replay::run_script(&orchestrator, &registry, calls, policy).await?;
        }
    }
    Ok(())
}

fn build_context(cli: &Cli) -> Result<RuntimeContext> {
    if let Some(root) = &cli.root {
        let root = root
            .canonicalize()
            .with_context(|| format!("workspace root {} not accessible", root.display()))?;
        let workspace =
            Workspace::new("cli", root).with_permissions(WorkspacePermissions::default());
        return Ok(RuntimeContext::new(workspace));
    }
    let config = RuntimeConfig::load(&cli.config)?;
    Ok(config.build_context())
}
