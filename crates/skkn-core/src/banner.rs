//! User-facing description of a generation failure.

use crate::error::{ErrorClass, SkknError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerAction {
    ChangeKey,
    RetryWithRotation,
    Dismiss,
}

/// A dismissible error banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBanner {
    pub class: ErrorClass,
    pub title: String,
    pub message: String,
    pub suggestions: Vec<String>,
    pub actions: Vec<BannerAction>,
    /// Raw error text, for logs and bug reports.
    pub detail: String,
}

impl ErrorBanner {
    pub fn from_error(err: &SkknError) -> Self {
        let detail = err.to_string();
        let class = err.generation_class().unwrap_or(ErrorClass::Other);
        let lower = detail.to_lowercase();

        let (title, message, mut suggestions) = match class {
            ErrorClass::QuotaExceeded => (
                "Hết hạn mức API",
                "API key hiện tại đã dùng hết hạn mức và không còn key dự phòng khả dụng.",
                vec![
                    "Đổi sang API key khác trong phần cài đặt",
                    "Chờ hạn mức được làm mới (thường sau 24 giờ)",
                    "Bấm \"Thử lại\" để xoay vòng sang key kế tiếp",
                ],
            ),
            ErrorClass::RateLimit => (
                "Gửi yêu cầu quá nhanh",
                "Máy chủ AI đang giới hạn tốc độ cho API key này.",
                vec![
                    "Đợi khoảng 1 phút rồi bấm \"Thử lại\"",
                    "Thêm API key dự phòng để tự động xoay vòng",
                ],
            ),
            ErrorClass::Other if lower.contains("network") || lower.contains("request failed") => (
                "Lỗi kết nối mạng",
                "Không thể kết nối tới máy chủ AI.",
                vec!["Kiểm tra kết nối Internet", "Bấm \"Thử lại\" sau ít phút"],
            ),
            ErrorClass::Other => (
                "Có lỗi xảy ra khi tạo nội dung",
                "Yêu cầu tạo nội dung không thành công. Nội dung đã viết vẫn được giữ nguyên.",
                vec!["Bấm \"Thử lại\" để tiếp tục từ bước hiện tại"],
            ),
        };

        if looks_like_invalid_key(&lower) {
            suggestions.insert(0, "Kiểm tra lại API key: key có thể sai hoặc đã bị thu hồi");
        }

        Self {
            class,
            title: title.to_string(),
            message: message.to_string(),
            suggestions: suggestions.into_iter().map(str::to_string).collect(),
            actions: vec![
                BannerAction::ChangeKey,
                BannerAction::RetryWithRotation,
                BannerAction::Dismiss,
            ],
            detail,
        }
    }
}

fn looks_like_invalid_key(lower: &str) -> bool {
    lower.contains("api key not valid")
        || lower.contains("api_key_invalid")
        || lower.contains("permission_denied")
        || lower.contains("unauthenticated")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    #[test]
    fn test_quota_banner() {
        let err: SkknError = LlmError::http(429, "RESOURCE_EXHAUSTED: quota").into();
        let banner = ErrorBanner::from_error(&err);
        assert_eq!(banner.class, ErrorClass::QuotaExceeded);
        assert_eq!(banner.title, "Hết hạn mức API");
        assert_eq!(banner.actions.len(), 3);
    }

    #[test]
    fn test_invalid_key_hint_comes_first() {
        let err: SkknError = LlmError::http(400, "INVALID_ARGUMENT: API key not valid").into();
        let banner = ErrorBanner::from_error(&err);
        assert_eq!(banner.class, ErrorClass::Other);
        assert!(banner.suggestions[0].contains("API key"));
    }
}
