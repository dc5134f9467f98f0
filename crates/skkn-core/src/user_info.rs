//! Report configuration entered by the user before generation starts.

use crate::budget::{self, PageAllocation};
use crate::template::SkknTemplate;
use serde::{Deserialize, Serialize};

/// Education levels that switch prompts to university vocabulary.
pub const HIGHER_ED_LEVELS: &[&str] = &["Đại học", "Cao đẳng", "Trung cấp", "Sau đại học"];

pub const DEFAULT_NUM_SOLUTIONS: u8 = 3;

fn default_num_solutions() -> u8 {
    DEFAULT_NUM_SOLUTIONS
}

/// Everything the user supplies about the report.
///
/// Serialized field names follow the snapshot format (camelCase). The
/// `pageLimit` field accepts either a number or an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    pub topic: String,
    pub subject: String,
    pub level: String,
    pub grade: String,
    pub school: String,
    pub location: String,
    pub facilities: String,
    pub textbook: String,
    pub research_subjects: String,
    pub timeframe: String,
    #[serde(rename = "applyAI")]
    pub apply_ai: String,
    pub focus: String,
    pub reference_documents: String,
    pub skkn_template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_template: Option<String>,
    pub special_requirements: String,
    #[serde(with = "page_limit")]
    pub page_limit: Option<u32>,
    pub include_practical_examples: bool,
    pub include_statistics: bool,
    pub requirements_confirmed: bool,
    #[serde(default = "default_num_solutions")]
    pub num_solutions: u8,
}

impl Default for UserInfo {
    fn default() -> Self {
        Self {
            topic: String::new(),
            subject: String::new(),
            level: String::new(),
            grade: String::new(),
            school: String::new(),
            location: String::new(),
            facilities: String::new(),
            textbook: String::new(),
            research_subjects: String::new(),
            timeframe: String::new(),
            apply_ai: String::new(),
            focus: String::new(),
            reference_documents: String::new(),
            skkn_template: String::new(),
            custom_template: None,
            special_requirements: String::new(),
            page_limit: None,
            include_practical_examples: false,
            include_statistics: false,
            requirements_confirmed: false,
            num_solutions: DEFAULT_NUM_SOLUTIONS,
        }
    }
}

impl UserInfo {
    /// Configured solution count, clamped to 1..=5.
    pub fn solutions(&self) -> u8 {
        budget::clamp_solutions(self.num_solutions)
    }

    pub fn page_allocation(&self) -> Option<PageAllocation> {
        budget::allocate(self.page_limit, self.solutions())
    }

    pub fn is_higher_education(&self) -> bool {
        HIGHER_ED_LEVELS.contains(&self.level.as_str())
    }

    /// Changes the education level, clearing `grade` when crossing between
    /// school and higher-education levels.
    pub fn set_level(&mut self, level: impl Into<String>) {
        let level = level.into();
        let was_higher = self.is_higher_education();
        let is_higher = HIGHER_ED_LEVELS.contains(&level.as_str());
        if was_higher != is_higher {
            self.grade.clear();
        }
        self.level = level;
    }

    /// Stores an extracted template and adopts its page limit when it has one.
    pub fn apply_template(&mut self, template: &SkknTemplate) -> crate::error::Result<()> {
        self.custom_template = Some(serde_json::to_string(template)?);
        if let Some(pages) = template.page_limit_from_template.filter(|pages| *pages > 0) {
            self.page_limit = Some(pages);
        }
        Ok(())
    }

    pub fn clear_template(&mut self) {
        self.custom_template = None;
    }

    /// Parses the stored template, if any.
    ///
    /// Malformed JSON yields `None` here; the caller falls back to the
    /// standard flow.
    pub fn template(&self) -> Option<SkknTemplate> {
        let raw = self.custom_template.as_deref()?;
        match SkknTemplate::from_json(raw) {
            Ok(template) => Some(template),
            Err(err) => {
                tracing::warn!("[UserInfo] Ignoring malformed custom template: {}", err);
                None
            }
        }
    }

    /// Vocabulary used in prompts for learners, teachers and course material.
    pub fn terms(&self) -> Terms {
        if self.is_higher_education() {
            Terms {
                learner: "sinh viên",
                teacher: "giảng viên",
                material: "giáo trình",
            }
        } else {
            Terms {
                learner: "học sinh",
                teacher: "giáo viên",
                material: "SGK",
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Terms {
    pub learner: &'static str,
    pub teacher: &'static str,
    pub material: &'static str,
}

mod page_limit {
    use serde::de::{self, Deserializer, Visitor};
    use serde::ser::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(pages) => serializer.serialize_u32(*pages),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        struct PageLimitVisitor;

        impl<'de> Visitor<'de> for PageLimitVisitor {
            type Value = Option<u32>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a page count or an empty string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(u32::try_from(v).ok().filter(|pages| *pages > 0))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(u32::try_from(v).ok().filter(|pages| *pages > 0))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                if v >= 1.0 && v <= f64::from(u32::MAX) {
                    Ok(Some(v as u32))
                } else {
                    Ok(None)
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<u32>()
                    .map(|pages| Some(pages).filter(|pages| *pages > 0))
                    .map_err(|_| E::custom(format!("invalid page limit '{v}'")))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }
        }

        deserializer.deserialize_any(PageLimitVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::SkknSection;

    #[test]
    fn test_page_limit_accepts_number_and_empty_string() {
        let info: UserInfo = serde_json::from_str(r#"{"topic":"A","pageLimit":30}"#).unwrap();
        assert_eq!(info.page_limit, Some(30));

        let info: UserInfo = serde_json::from_str(r#"{"topic":"A","pageLimit":""}"#).unwrap();
        assert_eq!(info.page_limit, None);
        assert_eq!(info.num_solutions, DEFAULT_NUM_SOLUTIONS);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["pageLimit"], "");
    }

    #[test]
    fn test_set_level_resets_grade_across_groups() {
        let mut info = UserInfo {
            level: "THCS".to_string(),
            grade: "Lớp 8".to_string(),
            ..Default::default()
        };
        info.set_level("THPT");
        assert_eq!(info.grade, "Lớp 8");

        info.set_level("Đại học");
        assert!(info.grade.is_empty());
        assert_eq!(info.terms().learner, "sinh viên");
    }

    #[test]
    fn test_apply_template_adopts_page_limit() {
        let template = SkknTemplate {
            name: "Mẫu Sở GD".to_string(),
            sections: vec![SkknSection::new("1", 1, "Mở đầu")],
            page_limit_from_template: Some(25),
            ..Default::default()
        };
        let mut info = UserInfo::default();
        info.apply_template(&template).unwrap();
        assert_eq!(info.page_limit, Some(25));
        assert_eq!(info.template().unwrap().name, "Mẫu Sở GD");
    }

    #[test]
    fn test_malformed_template_is_ignored() {
        let info = UserInfo {
            custom_template: Some("{not json".to_string()),
            ..Default::default()
        };
        assert!(info.template().is_none());
    }
}
