//! Prompt builders for every generating step.
//!
//! Templates are rendered with minijinja. Numbers that need Vietnamese
//! thousands grouping are formatted before they reach the template.

use super::knowledge;
use crate::budget::{BudgetSection, PageAllocation, PartBudget};
use crate::document::{Document, head_chars, tail_chars};
use crate::error::Result;
use crate::subjects;
use crate::template::{SkknSection, render_structure};
use crate::user_info::UserInfo;
use minijinja::{Environment, Value, context};
use once_cell::sync::Lazy;

/// Reference documents longer than this are cut before prompting.
pub const MAX_REFERENCE_CHARS: usize = 80_000;
/// Outline excerpt quoted by solution prompts.
pub const SOLUTION_OUTLINE_CHARS: usize = 3_000;
/// Outline and document excerpts quoted by later custom-section prompts.
pub const SECTION_CONTEXT_CHARS: usize = 2_000;
pub const REVISION_REFERENCE_CHARS: usize = 5_000;
pub const REVISION_CURRENT_CHARS: usize = 3_000;

static ENV: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env
});

fn render(source: &str, ctx: Value) -> Result<String> {
    Ok(ENV.render_str(source, ctx)?)
}

/// Everything a prompt may quote.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub user_info: &'a UserInfo,
    pub document: &'a Document,
}

impl<'a> PromptContext<'a> {
    pub fn new(user_info: &'a UserInfo, document: &'a Document) -> Self {
        Self {
            user_info,
            document,
        }
    }

    fn allocation(&self) -> Option<PageAllocation> {
        self.user_info.page_allocation()
    }

    fn base(&self) -> Value {
        let info = self.user_info;
        context! {
            u => info,
            terms => info.terms(),
            higher_ed => info.is_higher_education(),
            solutions => info.solutions(),
        }
    }
}

/// Groups thousands with dots, as Vietnamese text does: `10500` becomes `10.500`.
pub fn format_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Cuts `text` to `max_chars` characters and appends a note about what was removed.
pub fn truncate_for_prompt(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let removed = total - max_chars;
    let pages = (removed as f64 / 2500.0).round() as u64;
    format!(
        "{}\n\n[... ĐÃ LƯỢC BỚT {} KÝ TỰ (~{} trang) DO QUÁ DÀI. Nội dung phía trên đã đủ để tham khảo các ý chính ...]",
        head_chars(text, max_chars),
        format_thousands(u32::try_from(removed).unwrap_or(u32::MAX)),
        pages
    )
}

const USER_INFO_BLOCK: &str = "\
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
THÔNG TIN ĐỀ TÀI:
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
• Tên đề tài: {{ u.topic }}
• Môn học / Lĩnh vực: {{ u.subject }}
{% if subject %}
  → Nhóm: {{ subject.group }}
  → Đặc trưng: {{ subject.description }}
{% endif %}
• Cấp học: {{ u.level }}
• Khối lớp / Đối tượng: {{ u.grade }}
• Trường: {{ u.school }}
• Địa phương: {{ u.location }}
• Điều kiện CSVC: {{ u.facilities }}
{% if u.textbook %}
• Bộ sách / {{ terms.material }}: {{ u.textbook }}
{% endif %}
{% if u.researchSubjects %}
• Đối tượng nghiên cứu: {{ u.researchSubjects }}
{% endif %}
{% if u.timeframe %}
• Thời gian thực hiện: {{ u.timeframe }}
{% endif %}
{% if u.applyAI %}
• Ứng dụng công nghệ / AI: {{ u.applyAI }}
{% endif %}
{% if u.focus %}
• Đặc thù / Trọng tâm: {{ u.focus }}
{% endif %}
";

/// Topic, school and subject lines shared by the outline prompts.
pub fn user_info_block(info: &UserInfo) -> Result<String> {
    let subject = subjects::subject_info(&info.subject);
    render(
        USER_INFO_BLOCK,
        context! { u => info, terms => info.terms(), subject => subject },
    )
}

const SECTION_BUDGET_BLOCK: &str = "
🚨 GIỚI HẠN SỐ TRANG CHO PHẦN NÀY ({{ label }}):
- PHẢI viết khoảng {{ pages }} TRANG (≈ {{ words }} từ ≈ {{ chars }} ký tự).
- KHÔNG viết quá {{ max_pages }} trang và KHÔNG viết dưới {{ min_pages }} trang.
";

/// Length instruction for one part, empty when no page limit is set.
pub fn section_budget_block(
    allocation: Option<&PageAllocation>,
    label: &str,
    section: BudgetSection,
) -> Result<String> {
    let Some(allocation) = allocation else {
        return Ok(String::new());
    };
    let budget: &PartBudget = allocation.section(section);
    render(
        SECTION_BUDGET_BLOCK,
        context! {
            label => label,
            pages => budget.pages,
            words => format_thousands(budget.words),
            chars => format_thousands(budget.chars),
            max_pages => budget.max_pages(),
            min_pages => budget.min_pages(),
        },
    )
}

const REQUIREMENTS_BLOCK: &str = "
⚠️ CÁC YÊU CẦU ĐẶC BIỆT ĐÃ XÁC NHẬN (BẮT BUỘC TUÂN THỦ NGHIÊM NGẶT):
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
{% if alloc %}
📏 GIỚI HẠN SỐ TRANG: {{ alloc.totalPages }} TRANG (≈ {{ total_words }} từ ≈ {{ total_chars }} ký tự)
| Phần | Số trang | Số từ |
|---|---|---|
| Phần I & II | {{ alloc.partI_II.pages }} | {{ alloc.partI_II.words }} |
| Phần III | {{ alloc.partIII.pages }} | {{ alloc.partIII.words }} |
| Phần IV ({{ alloc.numSolutions }} giải pháp, mỗi giải pháp {{ alloc.perSolution.pages }} trang) | {{ alloc.partIV.pages }} | {{ alloc.partIV.words }} |
| Phần V & VI | {{ alloc.partV_VI.pages }} | {{ alloc.partV_VI.words }} |
🚫 Tổng số trang KHÔNG vượt quá {{ alloc.totalPages }} và KHÔNG dưới {{ min_total }} trang.
{% endif %}
{% if u.includePracticalExamples %}
📝 VÍ DỤ THỰC TẾ: mỗi giải pháp có 2-3 ví dụ minh họa cụ thể lấy từ {{ terms.material }}{% if u.textbook %} {{ u.textbook }}{% endif %}.
{% endif %}
{% if u.includeStatistics %}
📊 SỐ LIỆU THỐNG KÊ: có bảng số liệu trước và sau tác động, dùng số lẻ tự nhiên (ví dụ 42,3%), tổng tỷ lệ bằng 100%.
{% endif %}
{% if special %}
✨ YÊU CẦU RIÊNG CỦA TÁC GIẢ:
{{ special }}
{% endif %}
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
";

/// Confirmed special requirements, empty until the user confirms them.
pub fn requirements_block(info: &UserInfo) -> Result<String> {
    if !info.requirements_confirmed {
        return Ok(String::new());
    }
    let alloc = info.page_allocation();
    let (total_words, total_chars, min_total) = alloc
        .as_ref()
        .map(|a| {
            (
                format_thousands(a.total_words),
                format_thousands(a.total_chars),
                (f64::from(a.total_pages) * 0.8).floor() as u32,
            )
        })
        .unwrap_or_default();
    let special = info.special_requirements.trim();
    render(
        REQUIREMENTS_BLOCK,
        context! {
            u => info,
            terms => info.terms(),
            alloc => alloc,
            total_words => total_words,
            total_chars => total_chars,
            min_total => min_total,
            special => special,
        },
    )
}

const TEMPLATE_STRUCTURE_BLOCK: &str = "
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
🚨🚨🚨 CẤU TRÚC MẪU SKKN TỪ {{ name }} (BẮT BUỘC TUYỆT ĐỐI) 🚨🚨🚨
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
⚠️ Đây là CẤU TRÚC DUY NHẤT được phép sử dụng.
🚫 TUYỆT ĐỐI KHÔNG sử dụng cấu trúc SKKN mặc định.

{{ structure }}

QUY TẮC BẮT BUỘC:
1. Tạo dàn ý theo ĐÚNG thứ tự và tên các phần, mục như trên.
2. KHÔNG thay đổi tên các phần lớn.
3. Các mục con có thể điều chỉnh nội dung nhưng PHẢI giữ nguyên cấu trúc.
4. KHÔNG dùng cấu trúc \"Phần I, II, III, IV, V, VI\" nếu mẫu có cấu trúc khác.
{% if guidelines %}

HƯỚNG DẪN NỘI DUNG TỪ MẪU:
{{ guidelines }}
{% endif %}

[HẾT CẤU TRÚC MẪU]
";

/// Structure block for a custom template, empty when there is none.
pub fn template_structure_block(info: &UserInfo) -> Result<String> {
    let Some(template) = info.template().filter(|t| t.has_sections()) else {
        return Ok(String::new());
    };
    let name = if template.name.trim().is_empty() {
        "Sở/Phòng GD"
    } else {
        template.name.as_str()
    };
    render(
        TEMPLATE_STRUCTURE_BLOCK,
        context! {
            name => name,
            structure => render_structure(&template.sections),
            guidelines => template.content_guidelines.as_deref().unwrap_or_default(),
        },
    )
}

const OUTLINE_PROMPT: &str = "
Bạn là chuyên gia giáo dục cấp quốc gia, có hơn 20 năm kinh nghiệm viết, thẩm định và chấm Sáng kiến Kinh nghiệm (SKKN) tại Việt Nam.
{% if higher_ed %}
⚠️ Đây là SKKN dành cho BẬC {{ u.level | upper }}. Dùng \"{{ terms.learner }}\", \"{{ terms.teacher }}\", \"{{ terms.material }}\" thay cho thuật ngữ phổ thông.
{% endif %}

NHIỆM VỤ: Lập DÀN Ý CHI TIẾT cho đề tài SKKN dưới đây, bảo đảm tính MỚI, tính KHOA HỌC, tính KHẢ THI và tính HIỆU QUẢ.
Viết như một {{ terms.teacher }} thực sự đang chia sẻ sáng kiến của chính mình, không sao chép nguyên văn.

{{ outline_guide }}

{{ info_block }}
{% if references %}

TÀI LIỆU THAM KHẢO DO TÁC GIẢ CUNG CẤP:
{{ references }}
{% endif %}
{{ template_block }}
{{ requirements }}

YÊU CẦU DÀN Ý (NGẮN GỌN, CHỈ ĐẦU MỤC):
✓ {{ solutions }} GIẢI PHÁP, chỉ liệt kê TÊN giải pháp.
✓ Mỗi mục chỉ ghi tiêu đề và các ý chính.
✓ Gợi ý danh sách phụ lục cần tạo.
✓ Phù hợp đặc thù môn {{ u.subject }} và cấp {{ u.level }}.
{% if alloc %}

📋 Dàn ý phải tương xứng với giới hạn {{ alloc.totalPages }} trang.
{% endif %}

ĐỊNH DẠNG ĐẦU RA: Markdown phân cấp (1. TÊN PHẦN LỚN, 1.1. Tên mục nhỏ, • Ý chi tiết).
";

pub fn outline_prompt(ctx: &PromptContext<'_>) -> Result<String> {
    let info = ctx.user_info;
    let references = if info.reference_documents.trim().is_empty() {
        String::new()
    } else {
        truncate_for_prompt(&info.reference_documents, MAX_REFERENCE_CHARS)
    };
    let values = context! {
        outline_guide => knowledge::OUTLINE_GUIDE,
        info_block => user_info_block(info)?,
        references => references,
        template_block => template_structure_block(info)?,
        requirements => requirements_block(info)?,
        alloc => ctx.allocation(),
        ..ctx.base()
    };
    render(OUTLINE_PROMPT, values)
}

const OUTLINE_REVISION_PROMPT: &str = "
Tôi muốn LẬP LẠI DÀN Ý cho đề tài \"{{ u.topic }}\" theo góp ý sau:

\"{{ feedback }}\"

Hãy viết lại TOÀN BỘ dàn ý mới, giữ nguyên thông tin đề tài, áp dụng đầy đủ góp ý trên.
Số giải pháp: {{ solutions }}.
{{ template_block }}
{{ requirements }}
ĐỊNH DẠNG ĐẦU RA: Markdown phân cấp, chỉ gồm đầu mục và ý chính.
";

pub fn outline_revision_prompt(ctx: &PromptContext<'_>, feedback: &str) -> Result<String> {
    let info = ctx.user_info;
    let values = context! {
        feedback => feedback.trim(),
        template_block => template_structure_block(info)?,
        requirements => requirements_block(info)?,
        ..ctx.base()
    };
    render(OUTLINE_REVISION_PROMPT, values)
}

const PART_ONE_TWO_PROMPT: &str = "
Đây là bản DÀN Ý CHÍNH THỨC mà tôi đã chốt (có thể đã chỉnh sửa trực tiếp).
Hãy DÙNG CHÍNH XÁC NỘI DUNG NÀY làm cơ sở triển khai, không tự ý thay đổi cấu trúc:

--- BẮT ĐẦU DÀN Ý CHÍNH THỨC ---
{{ outline }}
--- KẾT THÚC DÀN Ý CHÍNH THỨC ---

NHIỆM VỤ TIẾP THEO: Viết chi tiết PHẦN I (Đặt vấn đề) và PHẦN II (Cơ sở lý luận).

{{ intro_guide }}

{{ theory_guide }}

{{ format_rules }}

⚠️ NHẮC LẠI THÔNG TIN QUAN TRỌNG (BẮT BUỘC BÁM SÁT):
- Cấp học: {{ u.level }}
- Khối lớp / Đối tượng: {{ u.grade }}
- Môn học: {{ u.subject }}
- Trường: {{ u.school }}
- Địa phương: {{ u.location }}
🚫 Mọi ví dụ, số liệu, thuật ngữ PHẢI phù hợp với cấp {{ u.level }}, khối {{ u.grade }}.
{{ requirements }}
{{ budget }}
";

pub fn part_one_two_prompt(ctx: &PromptContext<'_>) -> Result<String> {
    let values = context! {
        outline => ctx.document.render(),
        intro_guide => knowledge::INTRO_GUIDE,
        theory_guide => knowledge::THEORY_GUIDE,
        format_rules => knowledge::FORMAT_RULES,
        requirements => requirements_block(ctx.user_info)?,
        budget => section_budget_block(
            ctx.allocation().as_ref(),
            "Phần I (Đặt vấn đề) + Phần II (Cơ sở lý luận)",
            BudgetSection::PartOneTwo,
        )?,
        ..ctx.base()
    };
    render(PART_ONE_TWO_PROMPT, values)
}

const PART_THREE_PROMPT: &str = "
{{ reality_guide }}

Tiếp tục: Viết chi tiết PHẦN III (Thực trạng vấn đề).
Tạo bảng số liệu khảo sát giả định, logic, phù hợp với đối tượng nghiên cứu: {{ research_subjects }}.
Phân tích nguyên nhân và thực trạng tại {{ u.school }}, {{ u.location }} với điều kiện CSVC thực tế: {{ u.facilities }}.

⚠️ NHẮC LẠI: Đây là SKKN cấp {{ u.level }}, khối {{ u.grade }}, môn {{ u.subject }}.

{{ format_rules }}

🖼️ GỢI Ý HÌNH ẢNH MINH HỌA (BẮT BUỘC): gợi ý 1-2 vị trí đặt hình ảnh với format:
** [🖼️ GỢI Ý HÌNH ẢNH: Mô tả chi tiết hình ảnh cần chụp / tạo - Đặt sau phần nào] **
{{ requirements }}
{{ budget }}
";

pub fn part_three_prompt(ctx: &PromptContext<'_>) -> Result<String> {
    let info = ctx.user_info;
    let research_subjects = if info.research_subjects.trim().is_empty() {
        "Học sinh".to_string()
    } else {
        info.research_subjects.clone()
    };
    let values = context! {
        reality_guide => knowledge::REALITY_GUIDE,
        research_subjects => research_subjects,
        format_rules => knowledge::FORMAT_RULES,
        requirements => requirements_block(info)?,
        budget => section_budget_block(
            ctx.allocation().as_ref(),
            "Phần III (Thực trạng vấn đề)",
            BudgetSection::PartThree,
        )?,
        ..ctx.base()
    };
    render(PART_THREE_PROMPT, values)
}

const SOLUTION_PROMPT: &str = "
{{ solution_format }}

{{ solution_guide }}

╔═══════════════════════════════════════════════════╗
║  🚨 DÀN Ý ĐÃ DUYỆT - BẮT BUỘC BÁM SÁT 🚨          ║
╚═══════════════════════════════════════════════════╝
{% if outline %}
Giải pháp {{ n }} PHẢI viết ĐÚNG theo tên và nội dung đã ghi trong dàn ý:
{{ outline }}
{% endif %}

NHIỆM VỤ: Viết chi tiết GIẢI PHÁP {{ n }} trong tổng số {{ solutions }} giải pháp.
{% if n == 1 %}
Đây là giải pháp trọng tâm, nền tảng cho các giải pháp sau.
{% elif n >= 4 %}
Đây là giải pháp MỞ RỘNG / NÂNG CAO, phát triển thêm từ các giải pháp trước.
{% endif %}
{% if n > 1 %}
🚫 KHÔNG trùng lặp nội dung với các giải pháp 1{% for i in range(2, n) %}, {{ i }}{% endfor %} đã viết.
{% endif %}
{% if n == solutions and n > 1 %}
🔗 Cuối giải pháp này, nêu rõ MỐI LIÊN HỆ giữa tất cả {{ solutions }} giải pháp.
{% endif %}

YÊU CẦU:
- Quy trình thực hiện chia thành từng bước (Bước 1, Bước 2, ...).
- Ví dụ minh họa cụ thể theo {{ terms.material }}{% if u.textbook %} {{ u.textbook }}{% endif %}.
- Gợi ý hình ảnh: ** [🖼️ GỢI Ý HÌNH ẢNH: Mô tả - Đặt sau phần nào] **
- Kết thúc bằng dòng \"✅ KẾT THÚC GIẢI PHÁP {{ n }}\" và một dòng phân cách ━━━.

{{ natural_writing }}

{{ format_rules }}
{{ requirements }}
{{ budget }}
";

/// Prompt for writing solution `n`.
pub fn solution_prompt(ctx: &PromptContext<'_>, n: u8) -> Result<String> {
    let values = context! {
        n => n,
        outline => head_chars(ctx.document.outline(), SOLUTION_OUTLINE_CHARS),
        solution_format => knowledge::SOLUTION_FORMAT,
        solution_guide => knowledge::SOLUTION_GUIDE,
        natural_writing => knowledge::NATURAL_WRITING_TECHNIQUES,
        format_rules => knowledge::FORMAT_RULES,
        requirements => requirements_block(ctx.user_info)?,
        budget => section_budget_block(
            ctx.allocation().as_ref(),
            &format!("Giải pháp {n}"),
            BudgetSection::PerSolution,
        )?,
        ..ctx.base()
    };
    render(SOLUTION_PROMPT, values)
}

const CONCLUSION_PROMPT: &str = "
Tiếp tục: Viết PHẦN V và PHẦN VI.

5. KẾT QUẢ ĐẠT ĐƯỢC
5.1. Kết quả định lượng: bảng so sánh trước và sau tác động.
5.2. Kết quả định tính: thay đổi ở {{ terms.learner }}, {{ terms.teacher }}, nhà trường.
5.3. So sánh với thực trạng ban đầu ở Phần III (số liệu phải logic).

6. ĐIỀU KIỆN NHÂN RỘNG

KẾT LUẬN VÀ KHUYẾN NGHỊ

TÀI LIỆU THAM KHẢO (8-12 tài liệu theo chuẩn trích dẫn)

{{ result_guide }}

{{ conclusion_guide }}

{{ format_rules }}
{{ requirements }}
{{ budget }}
";

pub fn conclusion_prompt(ctx: &PromptContext<'_>) -> Result<String> {
    let values = context! {
        result_guide => knowledge::RESULT_GUIDE,
        conclusion_guide => knowledge::CONCLUSION_GUIDE,
        format_rules => knowledge::FORMAT_RULES,
        requirements => requirements_block(ctx.user_info)?,
        budget => section_budget_block(
            ctx.allocation().as_ref(),
            "Phần V (Kết quả) + Phần VI (Kết luận)",
            BudgetSection::PartFiveSix,
        )?,
        ..ctx.base()
    };
    render(CONCLUSION_PROMPT, values)
}

const FIRST_SECTION_PROMPT: &str = "
Đây là bản DÀN Ý CHÍNH THỨC mà tôi đã chốt:
---
{{ outline }}
---

NHIỆM VỤ TIẾP THEO: Viết chi tiết phần đầu tiên theo cấu trúc mẫu: **{{ section.title }}**.

⚠️ BÁM SÁT MẪU YÊU CẦU:
Phần này trong mẫu gốc được định nghĩa là: {{ guidance }}

{{ solution_format }}

{{ format_rules }}
{{ requirements }}
";

const NEXT_SECTION_PROMPT: &str = "
╔═══════════════════════════════════════════════════╗
║  THÔNG TIN ĐỀ TÀI (BẮT BUỘC BÁM SÁT)              ║
╚═══════════════════════════════════════════════════╝
Đề tài: \"{{ u.topic }}\"
Môn: {{ u.subject }} - Lớp: {{ u.grade }} - Cấp: {{ u.level }}
Trường: {{ u.school }}, {{ u.location }}
{{ terms.material }}: {{ u.textbook }}
CSVC: {{ u.facilities }}

Tiếp tục viết chi tiết phần tiếp theo của SKKN: **{{ section.title }}**.

(Hướng dẫn từ mẫu gốc: {{ guidance }})

{{ solution_format }}

⚠️ SỐ LƯỢNG GIẢI PHÁP ĐÃ CHỌN: {{ solutions }} GIẢI PHÁP
Nếu phần này mô tả giải pháp / biện pháp, BẮT BUỘC viết ĐỦ {{ solutions }} giải pháp,
mỗi giải pháp có NỘI DUNG VÀ QUY TRÌNH chi tiết, VÍ DỤ MINH HỌA cụ thể.
{% if outline %}

DÀN Ý ĐÃ DUYỆT (BẮT BUỘC BÁM SÁT):
{{ outline }}

⚠️ Tên giải pháp, cấu trúc PHẢI TRÙNG KHỚP với dàn ý trên.
{% endif %}
{% if previous %}

NỘI DUNG ĐÃ VIẾT NGAY TRƯỚC ĐÓ (để liên kết mạch lạc):
{{ previous }}
{% endif %}

{{ natural_writing }}

{{ format_rules }}
{{ requirements }}
";

/// Prompt for the k-th reduced template section.
pub fn custom_section_prompt(ctx: &PromptContext<'_>, section: &SkknSection, k: usize) -> Result<String> {
    let guidance = section
        .suggested_content
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or("Không có hướng dẫn phụ");
    let requirements = requirements_block(ctx.user_info)?;

    if k == 0 {
        let values = context! {
            outline => ctx.document.render(),
            section => section,
            guidance => guidance,
            solution_format => knowledge::SOLUTION_FORMAT,
            format_rules => knowledge::FORMAT_RULES,
            requirements => requirements,
            ..ctx.base()
        };
        return render(FIRST_SECTION_PROMPT, values);
    }

    let rendered = ctx.document.render();
    let values = context! {
        outline => head_chars(ctx.document.outline(), SECTION_CONTEXT_CHARS),
        previous => tail_chars(&rendered, SECTION_CONTEXT_CHARS),
        section => section,
        guidance => guidance,
        solution_format => knowledge::SOLUTION_FORMAT,
        natural_writing => knowledge::NATURAL_WRITING_TECHNIQUES,
        format_rules => knowledge::FORMAT_RULES,
        requirements => requirements,
        ..ctx.base()
    };
    render(NEXT_SECTION_PROMPT, values)
}

const APPENDIX_PROMPT: &str = "
Dựa trên toàn bộ SKKN dưới đây, hãy tạo PHỤ LỤC chi tiết, dùng được ngay.

Đề tài: \"{{ u.topic }}\" - Môn {{ u.subject }} - {{ u.grade }} - {{ u.school }}

{{ appendix_guide }}

YÊU CẦU:
- Mỗi phụ lục có tiêu đề \"PHỤ LỤC [số]: [Tên]\".
- Phiếu khảo sát và đề kiểm tra phải khớp với số liệu trong SKKN.
- Giáo án minh họa bám sát các giải pháp đã viết.

{{ format_rules }}

--- NỘI DUNG SKKN ---
{{ document }}
--- HẾT NỘI DUNG SKKN ---
";

pub fn appendix_prompt(ctx: &PromptContext<'_>) -> Result<String> {
    let values = context! {
        appendix_guide => knowledge::APPENDIX_GUIDE,
        format_rules => knowledge::FORMAT_RULES,
        document => ctx.document.render(),
        ..ctx.base()
    };
    render(APPENDIX_PROMPT, values)
}

const REVISION_PROMPT: &str = "
Hãy VIẾT LẠI GIẢI PHÁP {{ n }} theo góp ý của tôi.

GÓP Ý:
\"{{ feedback }}\"
{% if reference %}

TÀI LIỆU THAM KHẢO BỔ SUNG:
{{ reference }}
{% endif %}

NỘI DUNG HIỆN TẠI CỦA GIẢI PHÁP {{ n }}:
{{ current }}

YÊU CẦU:
- Giữ nguyên tên và mục tiêu giải pháp, chỉnh sửa theo góp ý.
- Giữ định dạng: MỤC TIÊU, QUY TRÌNH THỰC HIỆN (Bước 1, 2, ...), VÍ DỤ MINH HỌA.
- Kết thúc bằng \"✅ KẾT THÚC GIẢI PHÁP {{ n }}\".

{{ format_rules }}
";

pub fn revision_prompt(
    ctx: &PromptContext<'_>,
    n: u8,
    current: &str,
    feedback: &str,
    reference: Option<&str>,
) -> Result<String> {
    let reference = reference
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| head_chars(text, REVISION_REFERENCE_CHARS));
    let values = context! {
        n => n,
        feedback => feedback.trim(),
        reference => reference,
        current => head_chars(current, REVISION_CURRENT_CHARS),
        format_rules => knowledge::FORMAT_RULES,
        ..ctx.base()
    };
    render(REVISION_PROMPT, values)
}

/// Status recorded when solution `n` reaches its review step.
pub fn solution_done_status(n: u8) -> String {
    format!("✅ HOÀN THÀNH GIẢI PHÁP {n}. Vui lòng xem xét và duyệt trước khi tiếp tục.")
}

/// Status recorded when the main body is complete.
pub fn completion_status() -> String {
    "✅ SKKN ĐÃ HOÀN THÀNH!\n\n\
     Bạn đã viết xong toàn bộ nội dung chính của SKKN.\n\n\
     📌 BÂY GIỜ BẠN CÓ THỂ:\n\
     1. Xuất file Word để chỉnh sửa chi tiết\n\
     2. Tạo PHỤ LỤC chi tiết bằng nút \"TẠO PHỤ LỤC\"\n\
     3. Kiểm tra lại toàn bộ nội dung trước khi nộp"
        .to_string()
}
