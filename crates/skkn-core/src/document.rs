//! The accumulated report, kept as one block per generating step.

use crate::step::{OUTLINE_STEP, StepIndex};
use serde::{Deserialize, Serialize};

/// Separator placed between blocks when the document is rendered.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBlock {
    pub step: StepIndex,
    pub content: String,
}

/// Ordered per-step content blocks.
///
/// Blocks stay sorted by step. Starting a block for step K drops every
/// block tagged K or later, so regenerating after a back-jump never leaves
/// stale sections behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    blocks: Vec<DocumentBlock>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from a flat text, as a single outline block.
    pub fn from_outline(text: impl Into<String>) -> Self {
        let mut document = Self::new();
        document.replace_with_outline(text);
        document
    }

    /// Rebuilds from persisted blocks, falling back to the flat text.
    pub fn restore(blocks: Vec<DocumentBlock>, full_text: &str) -> Self {
        if !blocks.is_empty() {
            let mut blocks = blocks;
            blocks.sort_by_key(|block| block.step);
            return Self { blocks };
        }
        if full_text.is_empty() {
            Self::new()
        } else {
            Self::from_outline(full_text)
        }
    }

    pub fn blocks(&self) -> &[DocumentBlock] {
        &self.blocks
    }

    pub fn block(&self, step: StepIndex) -> Option<&DocumentBlock> {
        self.blocks.iter().find(|block| block.step == step)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| block.content.is_empty())
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Replaces everything with a single outline block.
    pub fn replace_with_outline(&mut self, text: impl Into<String>) {
        self.blocks = vec![DocumentBlock {
            step: OUTLINE_STEP,
            content: text.into(),
        }];
    }

    /// Opens an empty block for `step`, dropping blocks at `step` or later.
    pub fn begin_block(&mut self, step: StepIndex) {
        self.truncate_from(step);
        self.blocks.push(DocumentBlock {
            step,
            content: String::new(),
        });
    }

    /// Appends a streamed chunk to the block for `step`, opening it if needed.
    pub fn append_chunk(&mut self, step: StepIndex, chunk: &str) {
        match self.blocks.last_mut() {
            Some(block) if block.step == step => block.content.push_str(chunk),
            _ => {
                self.begin_block(step);
                if let Some(block) = self.blocks.last_mut() {
                    block.content.push_str(chunk);
                }
            }
        }
    }

    /// Drops every block tagged with a step >= `step`.
    pub fn truncate_from(&mut self, step: StepIndex) {
        self.blocks.retain(|block| block.step < step);
    }

    pub fn outline(&self) -> &str {
        self.block(OUTLINE_STEP)
            .map(|block| block.content.as_str())
            .unwrap_or_default()
    }

    /// Renders all blocks joined by [`BLOCK_SEPARATOR`].
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .filter(|block| !block.content.is_empty())
            .map(|block| block.content.as_str())
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }

    pub fn char_count(&self) -> usize {
        self.render().chars().count()
    }
}

/// First `max_chars` characters of `text`.
pub fn head_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Last `max_chars` characters of `text`.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    match text.char_indices().nth(total - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_render_in_step_order() {
        let mut doc = Document::from_outline("Dàn ý");
        doc.append_chunk(2, "Phần I");
        doc.append_chunk(2, " & II");
        doc.append_chunk(3, "Phần III");
        assert_eq!(doc.render(), "Dàn ý\n\n---\n\nPhần I & II\n\n---\n\nPhần III");
        assert_eq!(doc.outline(), "Dàn ý");
    }

    #[test]
    fn test_begin_block_discards_later_steps() {
        let mut doc = Document::from_outline("Dàn ý");
        doc.append_chunk(2, "cũ 2");
        doc.append_chunk(3, "cũ 3");
        doc.begin_block(2);
        doc.append_chunk(2, "mới 2");
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(doc.render(), "Dàn ý\n\n---\n\nmới 2");
    }

    #[test]
    fn test_restore_without_blocks_uses_flat_text() {
        let doc = Document::restore(Vec::new(), "toàn văn");
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(doc.render(), "toàn văn");
        assert!(Document::restore(Vec::new(), "").is_empty());
    }

    #[test]
    fn test_char_helpers_respect_boundaries() {
        let text = "Giải pháp";
        assert_eq!(head_chars(text, 4), "Giải");
        assert_eq!(tail_chars(text, 4), "pháp");
        assert_eq!(head_chars(text, 100), text);
        assert_eq!(tail_chars(text, 100), text);
    }
}
