//! The step transition table.

use super::prompts::{self, PromptContext};
use crate::error::{Result, SkknError};
use crate::step::{Flow, GenerationStep, OUTLINE_STEP, StepIndex};

/// What happens when leaving a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Stream `prompt` and append the reply as the next step's block.
    Generate { prompt: String },
    /// Record `status` without writing to the document.
    Transient { status: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: StepIndex,
    pub next_step: StepIndex,
    pub action: StepAction,
}

impl Transition {
    pub fn appends_to_document(&self) -> bool {
        matches!(self.action, StepAction::Generate { .. })
    }

    pub fn text(&self) -> &str {
        match &self.action {
            StepAction::Generate { prompt } => prompt,
            StepAction::Transient { status } => status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    PartOneTwo,
    PartThree,
    Solution(u8),
    SolutionDone(u8),
    Conclusion,
    Section(usize),
    Completed,
}

#[derive(Debug, Clone, Copy)]
struct TransitionRule {
    from: StepIndex,
    next: StepIndex,
    kind: PromptKind,
}

/// Lookup table from the current step to the next one.
///
/// Built once per flow. `next` renders the prompt on demand so it always
/// quotes the current document.
#[derive(Debug, Clone)]
pub struct StepMachine {
    flow: Flow,
    rules: Vec<TransitionRule>,
}

impl StepMachine {
    pub fn new(flow: Flow) -> Self {
        let rules = match &flow {
            Flow::Standard { solutions } => standard_rules(*solutions),
            Flow::Custom { sections } => custom_rules(sections.len(), flow.completed_step()),
        };
        Self { flow, rules }
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    fn rule(&self, step: StepIndex) -> Option<&TransitionRule> {
        self.rules.iter().find(|rule| rule.from == step)
    }

    /// Step reached by leaving `step`, if any.
    pub fn next_step(&self, step: StepIndex) -> Option<StepIndex> {
        self.rule(step).map(|rule| rule.next)
    }

    /// Whether leaving `step` writes a new document block.
    pub fn appends_from(&self, step: StepIndex) -> bool {
        self.rule(step)
            .is_some_and(|rule| !matches!(rule.kind, PromptKind::SolutionDone(_) | PromptKind::Completed))
    }

    /// Every step visited from OUTLINE to completion, in order.
    pub fn path(&self) -> Vec<StepIndex> {
        let mut path = vec![OUTLINE_STEP];
        let mut current = OUTLINE_STEP;
        while let Some(next) = self.next_step(current) {
            path.push(next);
            current = next;
        }
        path
    }

    /// Builds the transition out of `step`.
    ///
    /// `Ok(None)` means there is nothing further to generate.
    pub fn next(&self, step: StepIndex, ctx: &PromptContext<'_>) -> Result<Option<Transition>> {
        let Some(rule) = self.rule(step).copied() else {
            return Ok(None);
        };
        let action = match rule.kind {
            PromptKind::PartOneTwo => StepAction::Generate {
                prompt: prompts::part_one_two_prompt(ctx)?,
            },
            PromptKind::PartThree => StepAction::Generate {
                prompt: prompts::part_three_prompt(ctx)?,
            },
            PromptKind::Solution(n) => StepAction::Generate {
                prompt: prompts::solution_prompt(ctx, n)?,
            },
            PromptKind::SolutionDone(n) => StepAction::Transient {
                status: prompts::solution_done_status(n),
            },
            PromptKind::Conclusion => StepAction::Generate {
                prompt: prompts::conclusion_prompt(ctx)?,
            },
            PromptKind::Section(k) => {
                let section = self.flow.sections().get(k).ok_or_else(|| {
                    SkknError::internal(format!("custom section {k} out of range"))
                })?;
                StepAction::Generate {
                    prompt: prompts::custom_section_prompt(ctx, section, k)?,
                }
            }
            PromptKind::Completed => StepAction::Transient {
                status: prompts::completion_status(),
            },
        };
        Ok(Some(Transition {
            from: rule.from,
            next_step: rule.next,
            action,
        }))
    }
}

fn standard_rules(solutions: u8) -> Vec<TransitionRule> {
    use GenerationStep as S;

    let mut rules = vec![
        rule(S::Outline, S::PartOneTwo, PromptKind::PartOneTwo),
        rule(S::PartOneTwo, S::PartThree, PromptKind::PartThree),
        rule(S::PartThree, S::Solution1, PromptKind::Solution(1)),
    ];
    for n in 1..=solutions {
        let (Some(solution), Some(review)) = (S::solution(n), S::review(n)) else {
            continue;
        };
        rules.push(rule(solution, review, PromptKind::SolutionDone(n)));
        match S::solution(n + 1).filter(|_| n < solutions) {
            Some(next) => rules.push(rule(review, next, PromptKind::Solution(n + 1))),
            None => rules.push(rule(review, S::PartFiveSix, PromptKind::Conclusion)),
        }
    }
    rules.push(rule(S::PartFiveSix, S::Completed, PromptKind::Completed));
    rules
}

fn custom_rules(sections: usize, completed: StepIndex) -> Vec<TransitionRule> {
    let mut rules = Vec::with_capacity(sections + 1);
    for k in 0..sections {
        let from = OUTLINE_STEP + k as StepIndex;
        rules.push(TransitionRule {
            from,
            next: from + 1,
            kind: PromptKind::Section(k),
        });
    }
    if sections > 0 {
        rules.push(TransitionRule {
            from: OUTLINE_STEP + sections as StepIndex,
            next: completed,
            kind: PromptKind::Completed,
        });
    }
    rules
}

fn rule(from: GenerationStep, next: GenerationStep, kind: PromptKind) -> TransitionRule {
    TransitionRule {
        from: from.index(),
        next: next.index(),
        kind,
    }
}
