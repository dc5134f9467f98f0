//! Exports reports as Markdown files with the administrative header.

use async_trait::async_trait;
use skkn_core::error::Result;
use skkn_core::export::{DocumentExporter, ExportMetadata, ExportRequest};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const BLANK_VALUE: &str = "..........................................................";

/// Writes `<output_dir>/<filename>` with the extension swapped to `.md`.
pub struct MarkdownExporter {
    output_dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Value pre-filled for a known header field, if any.
fn field_value<'a>(key: &str, metadata: &'a ExportMetadata) -> Option<&'a str> {
    let value = match key {
        "tenSangKien" => metadata.topic.as_str(),
        "donViApDung" => metadata.school.as_str(),
        "diaDiem" => metadata.location.as_str(),
        "linhVuc" => metadata.subject.as_str(),
        _ => "",
    };
    Some(value).filter(|value| !value.is_empty())
}

/// Header block printed before the report body.
///
/// Only produced when the template declares header fields and report
/// metadata is available.
pub fn render_header(
    header_fields: Option<&BTreeMap<String, String>>,
    metadata: Option<&ExportMetadata>,
) -> String {
    let (Some(fields), Some(metadata)) = (header_fields, metadata) else {
        return String::new();
    };
    if fields.is_empty() {
        return String::new();
    }

    let mut out = String::from(
        "**CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM**\n\n**Độc lập - Tự do - Hạnh phúc**\n\n─────────────────────\n\n**ĐƠN ĐỀ NGHỊ XÉT, CÔNG NHẬN SÁNG KIẾN**\n\n",
    );
    for (key, label) in fields {
        let value = field_value(key, metadata).unwrap_or(BLANK_VALUE);
        out.push_str(&format!("**{label}:** {value}\n\n"));
    }
    out.push('\n');
    out
}

#[async_trait]
impl DocumentExporter for MarkdownExporter {
    async fn export(&self, request: ExportRequest) -> Result<String> {
        let mut path = self.output_dir.join(&request.filename);
        path.set_extension("md");

        let mut content = render_header(request.header_fields.as_ref(), request.metadata.as_ref());
        content.push_str(&request.markdown);
        if !content.ends_with('\n') {
            content.push('\n');
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(&path, content).await?;
        tracing::info!("[Export] Wrote {}", path.display());
        Ok(path.display().to_string())
    }
}
