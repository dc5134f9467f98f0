//! Per-solution review state.

use crate::budget::MAX_SOLUTIONS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionContent {
    pub content: String,
    pub is_approved: bool,
    #[serde(default)]
    pub revision_history: Vec<String>,
}

impl SolutionContent {
    pub fn located(content: impl Into<String>, is_approved: bool) -> Self {
        Self {
            content: content.into(),
            is_approved,
            revision_history: Vec::new(),
        }
    }

    /// Replaces the content, keeping the previous version in the history.
    /// Approval is left as it was.
    pub fn revise(&mut self, content: impl Into<String>) {
        let previous = std::mem::replace(&mut self.content, content.into());
        self.revision_history.push(previous);
    }
}

/// Slots `solution1..solution5`, each empty until its review step is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionsState {
    pub solution1: Option<SolutionContent>,
    pub solution2: Option<SolutionContent>,
    pub solution3: Option<SolutionContent>,
    pub solution4: Option<SolutionContent>,
    pub solution5: Option<SolutionContent>,
}

impl SolutionsState {
    pub fn get(&self, n: u8) -> Option<&SolutionContent> {
        match n {
            1 => self.solution1.as_ref(),
            2 => self.solution2.as_ref(),
            3 => self.solution3.as_ref(),
            4 => self.solution4.as_ref(),
            5 => self.solution5.as_ref(),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, n: u8) -> Option<&mut SolutionContent> {
        self.slot(n)?.as_mut()
    }

    pub fn set(&mut self, n: u8, content: SolutionContent) -> bool {
        match self.slot(n) {
            Some(slot) => {
                *slot = Some(content);
                true
            }
            None => false,
        }
    }

    /// Empties every slot numbered `from` or higher.
    pub fn clear_from(&mut self, from: u8) {
        for n in from.max(1)..=MAX_SOLUTIONS {
            if let Some(slot) = self.slot(n) {
                *slot = None;
            }
        }
    }

    pub fn approved_count(&self) -> usize {
        (1..=MAX_SOLUTIONS)
            .filter_map(|n| self.get(n))
            .filter(|solution| solution.is_approved)
            .count()
    }

    fn slot(&mut self, n: u8) -> Option<&mut Option<SolutionContent>> {
        match n {
            1 => Some(&mut self.solution1),
            2 => Some(&mut self.solution2),
            3 => Some(&mut self.solution3),
            4 => Some(&mut self.solution4),
            5 => Some(&mut self.solution5),
            _ => None,
        }
    }
}
