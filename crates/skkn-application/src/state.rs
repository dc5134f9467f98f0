//! Observable workflow state.

use skkn_core::banner::ErrorBanner;
use skkn_core::document::Document;
use skkn_core::llm::ChatMessage;
use skkn_core::solutions::SolutionsState;
use skkn_core::step::{INPUT_STEP, StepIndex};
use skkn_core::user_info::UserInfo;

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub user_info: UserInfo,
    /// Last step whose work is complete.
    pub step: StepIndex,
    /// Step being generated while a stream is in flight.
    pub streaming_step: Option<StepIndex>,
    /// Status messages shown in the chat pane.
    pub messages: Vec<ChatMessage>,
    pub document: Document,
    pub is_streaming: bool,
    pub error: Option<ErrorBanner>,
    pub solutions: SolutionsState,
    pub appendix_document: String,
    pub outline_feedback: String,
    /// Solution held at its review step until approved.
    pub awaiting_approval: Option<u8>,
    /// Text streamed by a solution revision, before it replaces the content.
    pub revision_draft: String,
}

impl EngineState {
    pub fn has_started(&self) -> bool {
        self.step > INPUT_STEP
    }

    pub fn full_document(&self) -> String {
        self.document.render()
    }
}

/// Lightweight change signal published after every state mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeNotice {
    pub revision: u64,
    pub step: StepIndex,
    pub is_streaming: bool,
}

/// A generation operation that can be replayed by a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operation {
    StartOutline,
    RegenerateOutline,
    Advance,
    ReviseSolution {
        number: u8,
        feedback: String,
        reference: Option<String>,
    },
    Appendix,
}

impl Operation {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Operation::StartOutline => "start_generation",
            Operation::RegenerateOutline => "regenerate_outline",
            Operation::Advance => "advance",
            Operation::ReviseSolution { .. } => "revise_solution",
            Operation::Appendix => "generate_appendix",
        }
    }
}
