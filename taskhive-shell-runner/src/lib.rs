//! Guarded command runner for the taskhive runtime. The crate exposes a
//! trait-based executor so downstream applications can swap the underlying
//! process strategy (system process, or dry-run logging) while reusing the
//! invocation and output types that keep captured output bounded.
//!
//! Spawned processes never inherit the full ambient environment: the runner
//! builds a minimal environment from a short allow-list of variables plus
//! caller-supplied overrides, so a model-directed process cannot observe
//! unrelated secrets.

pub mod environment;
pub mod executor;
pub mod spec;

#[cfg(feature = "dry-run")]
pub use executor::DryRunCommandExecutor;
#[cfg(feature = "std-process")]
pub use executor::ProcessCommandExecutor;
pub use executor::{CommandExecutor, CommandOutput, CommandStatus};
pub use spec::{CommandSpec, DEFAULT_TIMEOUT, MAX_TIMEOUT};
