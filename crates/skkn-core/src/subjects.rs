//! Catalogue of report subjects and fields, used to ground outline prompts.

use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubjectItem {
    pub id: u32,
    pub name: &'static str,
    pub group: &'static str,
    pub description: &'static str,
}

impl SubjectItem {
    const fn new(id: u32, name: &'static str, group: &'static str, description: &'static str) -> Self {
        Self {
            id,
            name,
            group,
            description,
        }
    }
}

pub static SUBJECTS: &[SubjectItem] = &[
    SubjectItem::new(1, "Bồi dưỡng giáo viên", "Giáo dục - Đào tạo", "Các phương pháp, kinh nghiệm trong việc bồi dưỡng chuyên môn, nghiệp vụ cho giáo viên"),
    SubjectItem::new(2, "Chăm sóc nuôi dưỡng", "Mầm non", "Kinh nghiệm chăm sóc, nuôi dưỡng trẻ em tại các cơ sở giáo dục mầm non"),
    SubjectItem::new(3, "Chủ nhiệm", "Quản lý lớp học", "Kinh nghiệm công tác chủ nhiệm lớp, quản lý học sinh, xây dựng tập thể lớp"),
    SubjectItem::new(4, "Chuyển đổi số", "Công nghệ - Giáo dục", "Ứng dụng công nghệ số trong dạy học và quản lý giáo dục"),
    SubjectItem::new(5, "Cơ bản", "Kỹ thuật", "Kiến thức và kỹ năng cơ bản trong lĩnh vực kỹ thuật"),
    SubjectItem::new(6, "Cơ khí", "Kỹ thuật công nghiệp", "Kinh nghiệm giảng dạy và thực hành cơ khí"),
    SubjectItem::new(7, "Công đoàn", "Tổ chức - Đoàn thể", "Hoạt động công đoàn trong trường học, bảo vệ quyền lợi giáo viên"),
    SubjectItem::new(8, "Công nghệ công nghiệp", "Kỹ thuật - Công nghệ", "Giảng dạy và ứng dụng công nghệ công nghiệp"),
    SubjectItem::new(9, "Công nghệ nông nghiệp", "Nông nghiệp - Công nghệ", "Giảng dạy và ứng dụng công nghệ trong nông nghiệp"),
    SubjectItem::new(10, "Công nghệ thông tin", "CNTT - Giáo dục", "Ứng dụng CNTT trong dạy học, quản lý và các hoạt động giáo dục"),
    SubjectItem::new(11, "Công tác Đoàn, Đội", "Tổ chức - Đoàn thể", "Kinh nghiệm tổ chức hoạt động Đoàn Thanh niên, Đội Thiếu niên trong trường học"),
    SubjectItem::new(12, "Đạo đức", "Giáo dục nhân cách", "Giảng dạy môn Đạo đức, giáo dục phẩm chất đạo đức cho học sinh"),
    SubjectItem::new(13, "Địa lý", "Khoa học xã hội", "Phương pháp giảng dạy môn Địa lý hiệu quả"),
    SubjectItem::new(14, "Điện máy", "Kỹ thuật điện", "Kinh nghiệm giảng dạy và thực hành điện máy"),
    SubjectItem::new(15, "Giáo dục công dân", "Giáo dục nhân cách", "Phương pháp giảng dạy môn Giáo dục công dân, giáo dục pháp luật cho học sinh"),
    SubjectItem::new(16, "Giáo dục địa phương", "Giáo dục - Địa phương", "Tích hợp nội dung giáo dục địa phương vào chương trình học"),
    SubjectItem::new(17, "Giáo dục hướng nghiệp", "Hướng nghiệp", "Kinh nghiệm tư vấn, định hướng nghề nghiệp cho học sinh"),
    SubjectItem::new(18, "Giáo dục Kinh tế và Pháp luật", "Kinh tế - Pháp luật", "Giảng dạy kiến thức kinh tế và pháp luật cho học sinh THPT"),
    SubjectItem::new(19, "Giáo dục mẫu giáo, nhà trẻ", "Mầm non", "Phương pháp giáo dục trẻ mầm non, mẫu giáo và nhà trẻ"),
    SubjectItem::new(20, "Giáo dục nghề nghiệp", "Hướng nghiệp - Dạy nghề", "Kinh nghiệm giảng dạy và đào tạo nghề nghiệp cho học sinh"),
    SubjectItem::new(21, "Giáo dục quốc phòng và an ninh", "Quốc phòng - An ninh", "Giảng dạy môn Giáo dục quốc phòng và an ninh"),
    SubjectItem::new(22, "Giáo dục tập thể", "Giáo dục nhân cách", "Xây dựng tinh thần tập thể, kỹ năng làm việc nhóm cho học sinh"),
    SubjectItem::new(23, "Giáo dục thể chất", "Thể dục - Thể thao", "Phương pháp giảng dạy thể dục, rèn luyện sức khỏe cho học sinh"),
    SubjectItem::new(24, "Giáo dục thường xuyên", "Giáo dục - Đào tạo", "Kinh nghiệm giảng dạy và quản lý trong hệ thống giáo dục thường xuyên"),
    SubjectItem::new(25, "Giáo dục tiểu học", "Tiểu học", "Phương pháp giảng dạy và quản lý học sinh bậc tiểu học"),
    SubjectItem::new(26, "Hoá học", "Khoa học tự nhiên", "Phương pháp giảng dạy môn Hóa học, thí nghiệm thực hành"),
    SubjectItem::new(27, "Hoạt động trải nghiệm hướng nghiệp", "Hướng nghiệp - Trải nghiệm", "Tổ chức các hoạt động trải nghiệm thực tế gắn với định hướng nghề nghiệp"),
    SubjectItem::new(28, "Kế toán", "Kinh tế - Tài chính", "Giảng dạy kế toán, quản lý tài chính trong trường học"),
    SubjectItem::new(29, "Khoa học", "Khoa học tự nhiên", "Phương pháp giảng dạy môn Khoa học ở bậc tiểu học"),
    SubjectItem::new(30, "Kỹ năng sống", "Giáo dục nhân cách", "Giáo dục kỹ năng sống, kỹ năng mềm cho học sinh"),
    SubjectItem::new(31, "Lịch sử", "Khoa học xã hội", "Phương pháp giảng dạy môn Lịch sử hiệu quả, sáng tạo"),
    SubjectItem::new(32, "Mỹ thuật", "Nghệ thuật", "Phương pháp giảng dạy môn Mỹ thuật, phát triển năng khiếu thẩm mỹ"),
    SubjectItem::new(33, "Ngoại ngữ", "Ngôn ngữ", "Phương pháp giảng dạy ngoại ngữ (Anh, Pháp, Nhật...) hiệu quả"),
    SubjectItem::new(34, "Ngữ văn", "Ngôn ngữ - Văn học", "Phương pháp giảng dạy môn Ngữ văn, phát triển năng lực đọc viết"),
    SubjectItem::new(35, "Nhân viên", "Hành chính - Nhân sự", "Kinh nghiệm công tác của nhân viên hành chính, y tế, bảo vệ trong trường học"),
    SubjectItem::new(36, "Phong trào trường học", "Tổ chức - Phong trào", "Tổ chức các phong trào thi đua, hoạt động ngoại khóa trong trường học"),
    SubjectItem::new(37, "Phương pháp dạy học", "Sư phạm", "Đổi mới phương pháp dạy học tích cực, hiệu quả"),
    SubjectItem::new(38, "Quản lý", "Quản lý giáo dục", "Kinh nghiệm quản lý trường học, quản lý chuyên môn"),
    SubjectItem::new(39, "Sinh học", "Khoa học tự nhiên", "Phương pháp giảng dạy môn Sinh học, thực hành thí nghiệm"),
    SubjectItem::new(40, "Sức khỏe học đường", "Y tế - Sức khỏe", "Chăm sóc sức khỏe học sinh, phòng chống bệnh học đường"),
    SubjectItem::new(41, "Tâm lý học đường", "Tâm lý - Giáo dục", "Hỗ trợ tâm lý học sinh, phòng ngừa và can thiệp các vấn đề tâm lý"),
    SubjectItem::new(42, "Tham vấn học đường", "Tâm lý - Tư vấn", "Kinh nghiệm tư vấn, hỗ trợ học sinh và phụ huynh trong môi trường học đường"),
    SubjectItem::new(43, "Thanh tra", "Quản lý - Kiểm tra", "Kinh nghiệm công tác thanh tra, kiểm tra trong giáo dục"),
    SubjectItem::new(44, "Thiết bị dạy học", "Cơ sở vật chất", "Sử dụng và sáng tạo thiết bị dạy học hiệu quả"),
    SubjectItem::new(45, "Thủ công", "Nghệ thuật - Kỹ năng", "Phương pháp giảng dạy thủ công, rèn luyện kỹ năng khéo léo cho học sinh"),
    SubjectItem::new(46, "Thư viện", "Hành chính - Thư viện", "Quản lý và phát triển thư viện trường học, khuyến đọc"),
    SubjectItem::new(47, "Tiếng Việt", "Ngôn ngữ", "Phương pháp giảng dạy môn Tiếng Việt ở bậc tiểu học"),
    SubjectItem::new(48, "Tin học", "CNTT - Giáo dục", "Phương pháp giảng dạy môn Tin học, lập trình cho học sinh"),
    SubjectItem::new(49, "Toán", "Khoa học tự nhiên", "Phương pháp giảng dạy môn Toán, phát triển tư duy logic"),
    SubjectItem::new(50, "Tự chọn", "Đa lĩnh vực", "Các chủ đề tự chọn theo nhu cầu và điều kiện của nhà trường"),
    SubjectItem::new(51, "Tự nhiên xã hội", "Khoa học tổng hợp", "Phương pháp giảng dạy môn Tự nhiên và Xã hội ở bậc tiểu học"),
    SubjectItem::new(52, "Văn phòng", "Hành chính", "Kinh nghiệm công tác văn phòng, hành chính trong trường học"),
    SubjectItem::new(53, "Văn thư", "Hành chính", "Kinh nghiệm công tác văn thư, lưu trữ hồ sơ trong trường học"),
    SubjectItem::new(54, "Vật lý", "Khoa học tự nhiên", "Phương pháp giảng dạy môn Vật lý, thí nghiệm thực hành"),
];

/// Looks up a subject by name, ignoring case.
pub fn subject_info(name: &str) -> Option<&'static SubjectItem> {
    let needle = name.trim().to_lowercase();
    SUBJECTS.iter().find(|subject| subject.name.to_lowercase() == needle)
}

/// Distinct groups, sorted.
pub fn subject_groups() -> Vec<&'static str> {
    SUBJECTS
        .iter()
        .map(|subject| subject.group)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn subjects_in_group(group: &str) -> Vec<&'static SubjectItem> {
    SUBJECTS.iter().filter(|subject| subject.group == group).collect()
}

/// Subjects whose name or group contains `query`; everything for a blank query.
pub fn search_subjects(query: &str) -> Vec<&'static SubjectItem> {
    let needle = query.trim().to_lowercase();
    SUBJECTS
        .iter()
        .filter(|subject| {
            needle.is_empty()
                || subject.name.to_lowercase().contains(&needle)
                || subject.group.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let subject = subject_info("toán").unwrap();
        assert_eq!(subject.group, "Khoa học tự nhiên");
        assert!(subject_info("Không tồn tại").is_none());
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let ids: Vec<u32> = SUBJECTS.iter().map(|s| s.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_groups_and_search() {
        assert!(subject_groups().contains(&"Mầm non"));
        assert_eq!(subjects_in_group("Mầm non").len(), 2);
        assert_eq!(search_subjects("").len(), SUBJECTS.len());
        assert!(search_subjects("tâm lý").iter().any(|s| s.name == "Tâm lý học đường"));
    }
}
