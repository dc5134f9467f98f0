//! Generation steps and the flow (standard or custom template) that
//! gives them meaning.

use crate::budget;
use crate::template::{SkknSection, reduce_sections};
use crate::user_info::UserInfo;
use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator};

/// Raw step index as stored in snapshots.
///
/// In the standard flow it is a [`GenerationStep`] discriminant. In the
/// custom flow `2 + k` addresses the k-th reduced template section.
pub type StepIndex = u32;

pub const INPUT_STEP: StepIndex = GenerationStep::InputForm as StepIndex;
pub const OUTLINE_STEP: StepIndex = GenerationStep::Outline as StepIndex;

/// Position in the standard report pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, strum::AsRefStr)]
#[repr(u32)]
pub enum GenerationStep {
    #[strum(serialize = "INPUT_FORM")]
    InputForm = 0,
    #[strum(serialize = "OUTLINE")]
    Outline = 1,
    #[strum(serialize = "PART_I_II")]
    PartOneTwo = 2,
    #[strum(serialize = "PART_III")]
    PartThree = 3,
    #[strum(serialize = "PART_IV_SOL1")]
    Solution1 = 4,
    #[strum(serialize = "PART_IV_SOL1_REVIEW")]
    Solution1Review = 5,
    #[strum(serialize = "PART_IV_SOL2")]
    Solution2 = 6,
    #[strum(serialize = "PART_IV_SOL2_REVIEW")]
    Solution2Review = 7,
    #[strum(serialize = "PART_IV_SOL3")]
    Solution3 = 8,
    #[strum(serialize = "PART_IV_SOL3_REVIEW")]
    Solution3Review = 9,
    #[strum(serialize = "PART_IV_SOL4")]
    Solution4 = 10,
    #[strum(serialize = "PART_IV_SOL4_REVIEW")]
    Solution4Review = 11,
    #[strum(serialize = "PART_IV_SOL5")]
    Solution5 = 12,
    #[strum(serialize = "PART_IV_SOL5_REVIEW")]
    Solution5Review = 13,
    #[strum(serialize = "PART_V_VI")]
    PartFiveSix = 14,
    #[strum(serialize = "APPENDIX")]
    Appendix = 15,
    #[strum(serialize = "COMPLETED")]
    Completed = 16,
}

impl GenerationStep {
    pub fn index(self) -> StepIndex {
        self as StepIndex
    }

    pub fn from_index(index: StepIndex) -> Option<Self> {
        Self::iter().find(|step| step.index() == index)
    }

    /// Step that writes solution `n` (1..=5).
    pub fn solution(n: u8) -> Option<Self> {
        if !(1..=budget::MAX_SOLUTIONS).contains(&n) {
            return None;
        }
        Self::from_index(Self::Solution1.index() + 2 * StepIndex::from(n - 1))
    }

    /// Review step that follows solution `n` (1..=5).
    pub fn review(n: u8) -> Option<Self> {
        Self::solution(n).and_then(|step| Self::from_index(step.index() + 1))
    }

    /// Solution number when this is a solution-writing step.
    pub fn solution_number(self) -> Option<u8> {
        let index = self.index();
        let first = Self::Solution1.index();
        let last = Self::Solution5.index();
        if (first..=last).contains(&index) && (index - first) % 2 == 0 {
            Some(((index - first) / 2 + 1) as u8)
        } else {
            None
        }
    }

    /// Solution number when this is a review step.
    pub fn review_number(self) -> Option<u8> {
        let index = self.index();
        let first = Self::Solution1Review.index();
        let last = Self::Solution5Review.index();
        if (first..=last).contains(&index) && (index - first) % 2 == 0 {
            Some(((index - first) / 2 + 1) as u8)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::InputForm => "Thông tin",
            Self::Outline => "Lập Dàn Ý",
            Self::PartOneTwo => "Phần I & II",
            Self::PartThree => "Phần III",
            Self::Solution1 => "Giải pháp 1",
            Self::Solution1Review => "Duyệt GP 1",
            Self::Solution2 => "Giải pháp 2",
            Self::Solution2Review => "Duyệt GP 2",
            Self::Solution3 => "Giải pháp 3",
            Self::Solution3Review => "Duyệt GP 3",
            Self::Solution4 => "Giải pháp 4",
            Self::Solution4Review => "Duyệt GP 4",
            Self::Solution5 => "Giải pháp 5",
            Self::Solution5Review => "Duyệt GP 5",
            Self::PartFiveSix => "Phần V & VI",
            Self::Appendix => "Tạo Phụ lục",
            Self::Completed => "Hoàn tất",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::InputForm => "Thiết lập thông tin cơ bản",
            Self::Outline => "Xây dựng khung sườn cho SKKN",
            Self::PartOneTwo => "Đặt vấn đề & Cơ sở lý luận",
            Self::PartThree => "Thực trạng vấn đề",
            Self::Solution1
            | Self::Solution2
            | Self::Solution3
            | Self::Solution4
            | Self::Solution5 => "Viết chi tiết giải pháp",
            Self::Solution1Review
            | Self::Solution2Review
            | Self::Solution3Review
            | Self::Solution4Review
            | Self::Solution5Review => "Xem lại và duyệt giải pháp",
            Self::PartFiveSix => "Hiệu quả, Kết luận & Kiến nghị",
            Self::Appendix => "Tài liệu phụ lục",
            Self::Completed => "Đã xong",
        }
    }
}

/// Label and description shown for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepInfo {
    pub step: StepIndex,
    pub label: String,
    pub description: String,
}

/// Which numbering scheme a session uses.
///
/// Decided once from the user's template: a template whose reduced outline
/// is non-empty drives the custom flow, anything else the standard one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Standard { solutions: u8 },
    Custom { sections: Vec<SkknSection> },
}

impl Flow {
    pub fn resolve(user_info: &UserInfo) -> Self {
        let sections = user_info
            .template()
            .map(|template| reduce_sections(&template.sections))
            .unwrap_or_default();
        if sections.is_empty() {
            Self::Standard {
                solutions: user_info.solutions(),
            }
        } else {
            Self::Custom { sections }
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }

    pub fn sections(&self) -> &[SkknSection] {
        match self {
            Self::Standard { .. } => &[],
            Self::Custom { sections } => sections,
        }
    }

    pub fn appendix_step(&self) -> StepIndex {
        match self {
            Self::Standard { .. } => GenerationStep::Appendix.index(),
            Self::Custom { sections } => 2 + sections.len() as StepIndex,
        }
    }

    pub fn completed_step(&self) -> StepIndex {
        match self {
            Self::Standard { .. } => GenerationStep::Completed.index(),
            Self::Custom { .. } => self.appendix_step() + 1,
        }
    }

    pub fn is_completed(&self, step: StepIndex) -> bool {
        step >= self.completed_step()
    }

    /// Solution number under review at `step`, standard flow only.
    pub fn review_number(&self, step: StepIndex) -> Option<u8> {
        match self {
            Self::Standard { .. } => GenerationStep::from_index(step)?.review_number(),
            Self::Custom { .. } => None,
        }
    }

    /// Section addressed by `step` in the custom flow.
    pub fn section_at(&self, step: StepIndex) -> Option<&SkknSection> {
        let offset = step.checked_sub(2)? as usize;
        self.sections().get(offset)
    }

    pub fn step_info(&self, step: StepIndex) -> Option<StepInfo> {
        match self {
            Self::Standard { .. } => {
                let known = GenerationStep::from_index(step)?;
                Some(StepInfo {
                    step,
                    label: known.label().to_string(),
                    description: known.description().to_string(),
                })
            }
            Self::Custom { .. } => {
                if step <= OUTLINE_STEP {
                    return Self::Standard { solutions: 1 }.step_info(step);
                }
                if let Some(section) = self.section_at(step) {
                    return Some(StepInfo {
                        step,
                        label: shorten_label(&section.title, 25),
                        description: format!("Viết mục: {}", section.title),
                    });
                }
                if step == self.appendix_step() {
                    return Some(StepInfo {
                        step,
                        label: GenerationStep::Appendix.label().to_string(),
                        description: GenerationStep::Appendix.description().to_string(),
                    });
                }
                if step == self.completed_step() {
                    return Some(StepInfo {
                        step,
                        label: GenerationStep::Completed.label().to_string(),
                        description: GenerationStep::Completed.description().to_string(),
                    });
                }
                None
            }
        }
    }

    /// Steps shown in the progress sidebar.
    ///
    /// The standard catalogue with three or fewer solutions hides steps 10
    /// through 14, PART_V_VI included, matching the original sidebar.
    pub fn visible_steps(&self) -> Vec<StepInfo> {
        match self {
            Self::Standard { solutions } => GenerationStep::iter()
                .map(GenerationStep::index)
                .filter(|step| {
                    *solutions > 3
                        || !(GenerationStep::Solution4.index()..=GenerationStep::PartFiveSix.index())
                            .contains(step)
                })
                .filter_map(|step| self.step_info(step))
                .collect(),
            Self::Custom { .. } => (INPUT_STEP..=self.completed_step())
                .filter_map(|step| self.step_info(step))
                .collect(),
        }
    }
}

fn shorten_label(title: &str, max_chars: usize) -> String {
    if title.chars().count() > max_chars {
        let head: String = title.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::SkknTemplate;

    #[test]
    fn test_discriminants_follow_pipeline_order() {
        let indices: Vec<StepIndex> = GenerationStep::iter().map(GenerationStep::index).collect();
        assert_eq!(indices, (0..=16).collect::<Vec<_>>());
        assert_eq!(GenerationStep::from_index(14), Some(GenerationStep::PartFiveSix));
        assert_eq!(GenerationStep::from_index(17), None);
        assert_eq!(GenerationStep::Solution2Review.as_ref(), "PART_IV_SOL2_REVIEW");
    }

    #[test]
    fn test_solution_and_review_lookup() {
        assert_eq!(GenerationStep::solution(1), Some(GenerationStep::Solution1));
        assert_eq!(GenerationStep::review(5), Some(GenerationStep::Solution5Review));
        assert_eq!(GenerationStep::solution(6), None);
        assert_eq!(GenerationStep::Solution3.solution_number(), Some(3));
        assert_eq!(GenerationStep::Solution3.review_number(), None);
        assert_eq!(GenerationStep::Solution4Review.review_number(), Some(4));
        assert_eq!(GenerationStep::PartFiveSix.solution_number(), None);
    }

    #[test]
    fn test_flow_without_template_is_standard() {
        let info = UserInfo {
            num_solutions: 4,
            ..Default::default()
        };
        let flow = Flow::resolve(&info);
        assert_eq!(flow, Flow::Standard { solutions: 4 });
        assert_eq!(flow.completed_step(), 16);
        assert_eq!(flow.review_number(9), Some(3));
    }

    #[test]
    fn test_custom_flow_numbering() {
        let template = SkknTemplate {
            sections: vec![
                SkknSection::new("1", 1, "Mở đầu"),
                SkknSection::new("2", 1, "Nội dung"),
                SkknSection::new("2.1", 2, "Thực trạng"),
                SkknSection::new("2.2", 2, "Các biện pháp thực hiện trong năm học"),
                SkknSection::new("3", 1, "Kết luận"),
            ],
            ..Default::default()
        };
        let mut info = UserInfo::default();
        info.apply_template(&template).unwrap();
        let flow = Flow::resolve(&info);

        assert!(flow.is_custom());
        assert_eq!(flow.sections().len(), 4);
        assert_eq!(flow.appendix_step(), 6);
        assert_eq!(flow.completed_step(), 7);
        assert_eq!(flow.section_at(3).unwrap().id, "2.1");
        assert_eq!(flow.review_number(5), None);

        let long_title = flow.step_info(4).unwrap();
        assert!(long_title.label.ends_with("..."));
        assert_eq!(long_title.label.chars().count(), 28);
        assert_eq!(flow.visible_steps().len(), 8);
    }

    #[test]
    fn test_template_without_sections_falls_back_to_standard() {
        let mut info = UserInfo::default();
        info.apply_template(&SkknTemplate::default()).unwrap();
        assert!(!Flow::resolve(&info).is_custom());
    }

    #[test]
    fn test_sidebar_hides_late_steps_for_three_solutions() {
        let flow = Flow::Standard { solutions: 3 };
        let steps: Vec<StepIndex> = flow.visible_steps().iter().map(|s| s.step).collect();
        assert!(!steps.contains(&10));
        assert!(!steps.contains(&14));
        assert!(steps.contains(&15));

        let flow = Flow::Standard { solutions: 5 };
        assert_eq!(flow.visible_steps().len(), 17);
    }
}
