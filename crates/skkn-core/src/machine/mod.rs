//! The generation state machine: prompts and the transition table.

pub mod knowledge;
pub mod prompts;
mod transition;

pub use prompts::PromptContext;
pub use transition::{StepAction, StepMachine, Transition};
