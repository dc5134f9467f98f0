//! Writing guides injected into prompts. Treated as opaque text.

pub const OUTLINE_GUIDE: &str = "\
📋 CẤU TRÚC DÀN Ý CHUẨN SKKN:
PHẦN I. ĐẶT VẤN ĐỀ: lý do chọn đề tài (cơ sở pháp lý, lý luận, thực tiễn, sự cần thiết), mục đích, nhiệm vụ, đối tượng và phạm vi, phương pháp nghiên cứu, điểm mới.
PHẦN II. CƠ SỞ LÝ LUẬN: khái niệm, cơ sở khoa học, cơ sở pháp lý.
PHẦN III. THỰC TRẠNG: đặc điểm đơn vị, khảo sát trước tác động, nguyên nhân.
PHẦN IV. CÁC GIẢI PHÁP: mỗi giải pháp gồm mục tiêu, nội dung và quy trình, ví dụ minh họa, điều kiện thực hiện.
PHẦN V. KẾT QUẢ: định lượng (bảng so sánh trước - sau), định tính.
PHẦN VI. KẾT LUẬN VÀ KIẾN NGHỊ, TÀI LIỆU THAM KHẢO, PHỤ LỤC.";

pub const INTRO_GUIDE: &str = "\
📝 HƯỚNG DẪN VIẾT PHẦN ĐẶT VẤN ĐỀ:
- Lý do chọn đề tài có đủ 4 ý theo thứ tự: cơ sở pháp lý, cơ sở lý luận tóm tắt, cơ sở thực tiễn, sự cần thiết.
- Mục đích nghiên cứu viết thành một câu: \"Nghiên cứu, áp dụng và đánh giá hiệu quả của ... nhằm ...\".
- Nhiệm vụ: 4-5 nhiệm vụ từ nghiên cứu lý luận tới rút bài học kinh nghiệm.
- Phạm vi: nội dung, không gian, thời gian.
- Điểm mới: so sánh rõ với cách làm truyền thống.";

pub const THEORY_GUIDE: &str = "\
📚 HƯỚNG DẪN VIẾT CƠ SỞ LÝ LUẬN:
- Định nghĩa các khái niệm then chốt, có trích dẫn nguồn.
- Trình bày cơ sở tâm lý học, giáo dục học phù hợp lứa tuổi.
- Dẫn các văn bản chỉ đạo liên quan (Chương trình GDPT 2018, thông tư, kế hoạch năm học).";

pub const REALITY_GUIDE: &str = "\
🔍 HƯỚNG DẪN VIẾT THỰC TRẠNG:
- Nêu thuận lợi và khó khăn của đơn vị.
- Có bảng khảo sát trước tác động với số liệu lẻ tự nhiên (ví dụ 37,5%).
- Phân tích nguyên nhân khách quan và chủ quan dẫn tới thực trạng.";

pub const SOLUTION_GUIDE: &str = "\
💡 10 NGUYÊN TẮC VÀNG KHI VIẾT GIẢI PHÁP:
1. Tên giải pháp ngắn gọn, thể hiện rõ hành động.
2. Nêu mục tiêu cụ thể, đo lường được.
3. Trình bày cơ sở khoa học của giải pháp.
4. Quy trình thực hiện chia thành các bước rõ ràng.
5. Có ví dụ minh họa (giáo án, hoạt động) cụ thể.
6. Chỉ ra điều kiện thực hiện.
7. Giải pháp khả thi với cơ sở vật chất hiện có.
8. Không trùng lặp nội dung giữa các giải pháp.
9. Có lưu ý khi áp dụng.
10. Gắn với đối tượng và địa phương cụ thể.";

pub const RESULT_GUIDE: &str = "\
📊 HƯỚNG DẪN VIẾT KẾT QUẢ:
- Bảng so sánh trước và sau tác động với số liệu lẻ, logic với phần thực trạng.
- Kết quả định tính: thay đổi về thái độ, kỹ năng, phẩm chất.
- Phân tích nguyên nhân đạt được kết quả.";

pub const CONCLUSION_GUIDE: &str = "\
🏁 HƯỚNG DẪN VIẾT KẾT LUẬN VÀ KIẾN NGHỊ:
- Kết luận: tóm tắt kết quả, bài học kinh nghiệm, hạn chế, hướng phát triển.
- Kiến nghị: đối với cơ quan quản lý, nhà trường, đồng nghiệp, phụ huynh.";

pub const NATURAL_WRITING_TECHNIQUES: &str = "\
✍️ KỸ THUẬT VIẾT TỰ NHIÊN:
- Viết ở ngôi thứ nhất (\"tôi\", \"chúng tôi\") khi kể trải nghiệm thực tế.
- Đa dạng độ dài câu, tránh lặp cấu trúc.
- Dùng từ nối chuyển ý tự nhiên giữa các đoạn.
- Tránh các cụm từ sáo rỗng, khẩu hiệu.";

pub const APPENDIX_GUIDE: &str = "\
📋 NỘI DUNG PHỤ LỤC CHUẨN:
- Phiếu khảo sát thực trạng
- Đề kiểm tra trước và sau tác động
- Giáo án minh họa
- Phiếu học tập, rubric đánh giá
- Hình ảnh hoạt động
- Nhận xét của đồng nghiệp, cấp quản lý";

/// Layout rules for solution write-ups. The heading and end markers are
/// what the content locator searches for.
pub const SOLUTION_FORMAT: &str = "\
📐 YÊU CẦU ĐỊNH DẠNG OUTPUT CHO MỖI GIẢI PHÁP:
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
📋 GIẢI PHÁP [số]: [Tên giải pháp]
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
1. MỤC TIÊU
2. CƠ SỞ KHOA HỌC
3. NỘI DUNG VÀ QUY TRÌNH THỰC HIỆN (Bước 1, Bước 2, ...)
4. VÍ DỤ MINH HỌA
5. ĐIỀU KIỆN THỰC HIỆN
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
✅ KẾT THÚC GIẢI PHÁP [số]
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub const FORMAT_RULES: &str = "\
⚠️ LƯU Ý FORMAT:
- Viết từng câu xuống dòng riêng.
- Tách đoạn rõ ràng.
- Bảng số liệu dùng Markdown chuẩn: | Tiêu đề | Số liệu |.
- KHÔNG viết dính chữ.";
