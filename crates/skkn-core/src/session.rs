//! Persisted session snapshot.
//!
//! The JSON layout is a versionless camelCase document:
//!
//! ```text
//! {
//!   "userInfo":        { ...UserInfo, "referenceDocuments": "", "hasReferenceDocuments": true },
//!   "state":           { "step": 5, "messages": [...], "fullDocument": "...", "documentBlocks": [...] },
//!   "solutionsState":  { "solution1": { "content", "isApproved", "revisionHistory" } | null, ... },
//!   "appendixDocument": "...",
//!   "outlineFeedback":  "...",
//!   "chatHistory":      [ { "role": "user" | "model", "text": "..." } ],
//!   "savedAt":          "2026-01-01T00:00:00.000Z"
//! }
//! ```

use crate::document::{Document, DocumentBlock};
use crate::llm::ChatMessage;
use crate::solutions::SolutionsState;
use crate::step::StepIndex;
use crate::user_info::UserInfo;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// User info as stored in a snapshot: reference documents are left out and
/// replaced by a presence flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotUserInfo {
    #[serde(flatten)]
    pub info: UserInfo,
    #[serde(default)]
    pub has_reference_documents: bool,
}

impl SnapshotUserInfo {
    pub fn from_user_info(info: &UserInfo) -> Self {
        let mut stripped = info.clone();
        let has_reference_documents = !stripped.reference_documents.is_empty();
        stripped.reference_documents.clear();
        Self {
            info: stripped,
            has_reference_documents,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotState {
    pub step: StepIndex,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub full_document: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_blocks: Vec<DocumentBlock>,
}

impl SnapshotState {
    pub fn document(&self) -> Document {
        Document::restore(self.document_blocks.clone(), &self.full_document)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user_info: SnapshotUserInfo,
    pub state: SnapshotState,
    #[serde(default)]
    pub solutions_state: SolutionsState,
    #[serde(default)]
    pub appendix_document: String,
    #[serde(default)]
    pub outline_feedback: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    pub saved_at: String,
}

impl SessionData {
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn step(&self) -> StepIndex {
        self.state.step
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.saved_at)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }
}

/// ISO 8601 timestamp with millisecond precision, as written to `savedAt`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solutions::SolutionContent;

    fn sample() -> SessionData {
        let info = UserInfo {
            topic: "Nâng cao kỹ năng đọc".to_string(),
            reference_documents: "tài liệu rất dài".to_string(),
            page_limit: Some(30),
            ..Default::default()
        };
        let mut solutions = SolutionsState::default();
        solutions.set(1, SolutionContent::located("GP1", true));
        SessionData {
            user_info: SnapshotUserInfo::from_user_info(&info),
            state: SnapshotState {
                step: 5,
                messages: vec![ChatMessage::model("✅ HOÀN THÀNH GIẢI PHÁP 1")],
                full_document: "Dàn ý".to_string(),
                document_blocks: Vec::new(),
            },
            solutions_state: solutions,
            appendix_document: String::new(),
            outline_feedback: "thêm ví dụ".to_string(),
            chat_history: vec![ChatMessage::user("xin chào"), ChatMessage::model("chào")],
            saved_at: timestamp_now(),
        }
    }

    #[test]
    fn test_reference_documents_are_stripped() {
        let data = sample();
        assert!(data.user_info.has_reference_documents);
        assert!(data.user_info.info.reference_documents.is_empty());
    }

    #[test]
    fn test_json_layout_uses_camel_case() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(value["userInfo"]["topic"], "Nâng cao kỹ năng đọc");
        assert_eq!(value["userInfo"]["referenceDocuments"], "");
        assert_eq!(value["userInfo"]["hasReferenceDocuments"], true);
        assert_eq!(value["state"]["fullDocument"], "Dàn ý");
        assert!(value["state"].get("documentBlocks").is_none());
        assert_eq!(value["solutionsState"]["solution1"]["isApproved"], true);
        assert_eq!(value["chatHistory"][0]["role"], "user");
    }

    #[test]
    fn test_round_trip() {
        let data = sample();
        let restored = SessionData::from_json(&data.to_json().unwrap()).unwrap();
        assert_eq!(restored, data);
        assert!(restored.saved_at().is_some());
    }

    #[test]
    fn test_snapshot_without_blocks_restores_single_block() {
        let data = sample();
        let document = data.state.document();
        assert_eq!(document.render(), "Dàn ý");
        assert_eq!(document.blocks().len(), 1);
    }
}
