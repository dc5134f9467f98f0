//! Application layer for SKKN.
//!
//! Coordinates the domain crate's step machine and prompt builders with the
//! injected LLM client, key pool and storage ports.

pub mod retry_coordinator;
pub mod session_controller;
pub mod state;
pub mod workflow_engine;

#[cfg(test)]
mod testing;

pub use retry_coordinator::{RetryCoordinator, RetryDecision};
pub use session_controller::SessionController;
pub use state::{ChangeNotice, EngineState};
pub use workflow_engine::{EngineServices, WorkflowEngine};
