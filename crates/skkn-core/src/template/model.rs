use crate::error::{Result, SkknError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One heading of a hierarchical outline, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkknSection {
    pub id: String,
    /// Nesting depth, 1 for a top-level part.
    pub level: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_content: Option<String>,
}

impl SkknSection {
    pub fn new(id: impl Into<String>, level: u32, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level,
            title: title.into(),
            suggested_content: None,
        }
    }

    pub fn with_suggested_content(mut self, content: impl Into<String>) -> Self {
        self.suggested_content = Some(content.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkknTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sections: Vec<SkknSection>,
    #[serde(default)]
    pub raw_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_guidelines: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_limit_from_template: Option<u32>,
    /// Administrative header lines (author, unit, ...) for the exported file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_fields: Option<BTreeMap<String, String>>,
}

impl SkknTemplate {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| SkknError::template_parse(e.to_string()))
    }

    pub fn has_sections(&self) -> bool {
        !self.sections.is_empty()
    }
}

/// Renders the template outline as an indented list for prompts.
///
/// Level 1 headings get `📌`, level 2 `•`, deeper levels `○`.
pub fn render_structure(sections: &[SkknSection]) -> String {
    sections
        .iter()
        .map(|section| {
            let indent = "  ".repeat(section.level.saturating_sub(1) as usize);
            let marker = match section.level {
                0 | 1 => "📌",
                2 => "•",
                _ => "○",
            };
            format!("{indent}{marker} {}. {}", section.id, section.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_accepts_minimal_template() {
        let template = SkknTemplate::from_json(
            r#"{"name":"Mẫu","sections":[{"id":"1","level":1,"title":"Mở đầu"}],"rawContent":""}"#,
        )
        .unwrap();
        assert!(template.has_sections());
        assert_eq!(template.sections[0].title, "Mở đầu");
    }

    #[test]
    fn test_from_json_reports_parse_failure() {
        let err = SkknTemplate::from_json("[1,2").unwrap_err();
        assert!(matches!(err, SkknError::TemplateParse(_)));
    }

    #[test]
    fn test_render_structure_indents_by_level() {
        let sections = vec![
            SkknSection::new("I", 1, "Mở đầu"),
            SkknSection::new("1.1", 2, "Lý do chọn đề tài"),
            SkknSection::new("1.1.1", 3, "Bối cảnh"),
        ];
        let rendered = render_structure(&sections);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "📌 I. Mở đầu");
        assert_eq!(lines[1], "  • 1.1. Lý do chọn đề tài");
        assert_eq!(lines[2], "    ○ 1.1.1. Bối cảnh");
    }
}
