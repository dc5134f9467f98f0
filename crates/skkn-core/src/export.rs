//! Document export port.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FILENAME_TOPIC_CHARS: usize = 30;

/// Report identity printed in the exported file's header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub topic: String,
    pub school: String,
    pub location: String,
    pub subject: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRequest {
    pub markdown: String,
    pub filename: String,
    pub header_fields: Option<BTreeMap<String, String>>,
    pub metadata: Option<ExportMetadata>,
}

/// Turns Markdown into a downloadable file.
#[async_trait]
pub trait DocumentExporter: Send + Sync {
    /// Writes the export and returns where it went.
    async fn export(&self, request: ExportRequest) -> Result<String>;
}

/// `SKKN_<topic>` with the topic cut to 30 characters and anything outside
/// ASCII alphanumerics and the Vietnamese letter range replaced by `_`.
pub fn export_basename(topic: &str) -> String {
    let sanitized: String = topic
        .chars()
        .take(FILENAME_TOPIC_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || ('À'..='ỹ').contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("SKKN_{sanitized}")
}

pub fn document_filename(topic: &str) -> String {
    format!("{}.docx", export_basename(topic))
}

pub fn solution_filename(topic: &str, number: u8) -> String {
    format!("{}_GiaiPhap{number}.docx", export_basename(topic))
}

pub fn appendix_filename(topic: &str) -> String {
    format!("{}_PhuLuc.docx", export_basename(topic))
}
