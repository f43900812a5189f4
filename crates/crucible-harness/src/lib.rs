//! Crucible Harness
//!
//! The stateful half of Crucible: workspace materialization, the build
//! invoker, the execution supervisor, and the retry orchestrator that
//! drives the regeneration loop on build failure.

pub mod builder;
pub mod config;
pub mod pipeline;
pub mod regen;
pub mod supervisor;
pub mod telemetry;
pub mod workspace;

// Re-export key types
pub use builder::BuildInvoker;
pub use config::{CrucibleConfig, ExecutionConfig, RetryConfig, ToolchainConfig};
pub use pipeline::Pipeline;
pub use regen::{CommandRegenerator, NullRegenerator, RegenerationRequest, Regenerator};
pub use supervisor::ExecutionSupervisor;
pub use telemetry::init_tracing;
pub use workspace::ProjectWorkspace;
