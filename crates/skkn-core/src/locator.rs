//! Best-effort extraction of one solution's write-up from the report text.
//!
//! The model output is only loosely structured, so every step here is a
//! heuristic. The locator never fails: when nothing plausible is found it
//! returns [`not_found_placeholder`] and reports [`LocateOutcome::NotFound`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Heading that introduces the main body after the outline.
const CONTENT_DESCRIPTION_MARKER: &str = "📋 MÔ TẢ SÁNG KIẾN";
const END_MARKER: &str = "KẾT THÚC GIẢI PHÁP";
const END_BLOCK_SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━━";
const SHORT_SEPARATOR: &str = "━━━━━━━━━━━";

const LOOKAHEAD_CHARS: usize = 1500;
const MIN_DETAIL_CHARS: usize = 500;
const MIN_NEXT_SOLUTION_OFFSET: usize = 100;
const END_BLOCK_WINDOW_BYTES: usize = 500;
const MIN_RESULT_CHARS: usize = 100;

static SOLUTIONS_SECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)4\.\s*CÁC GIẢI PHÁP",
        r"(?i)PHẦN\s*(?:IV|4)[:\s]*.*GIẢI PHÁP",
        r"(?i)IV\.\s*CÁC GIẢI PHÁP",
        r"(?i)4\.\s*GIẢI PHÁP",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static STRUCTURAL_CUES: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?i)1\.\s*MỤC TIÊU|\*\*1\.|1\.1\.|CƠ SỞ KHOA HỌC|NỘI DUNG VÀ|QUY TRÌNH|Bước\s*1|VÍ DỤ MINH HỌA|ĐIỀU KIỆN THỰC HIỆN",
    )
    .ok()
});

static NEXT_PART: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)5\.\s*KẾT QUẢ|PHẦN\s*V\b").ok());

static BLOCK_SPLIT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"━{10,}|-{5,}|(?m:^[ \t]*-{3}[ \t]*$)").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateOutcome {
    /// Found by marker search with an end boundary.
    Detailed,
    /// Found by scanning separator-delimited blocks from the end.
    BlockFallback,
    /// Nothing plausible; content is the placeholder.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSolution {
    pub content: String,
    pub outcome: LocateOutcome,
}

impl LocatedSolution {
    pub fn is_found(&self) -> bool {
        self.outcome != LocateOutcome::NotFound
    }
}

/// Text shown when solution `number` could not be located.
pub fn not_found_placeholder(number: u8) -> String {
    format!(
        "⚠️ Không tìm thấy nội dung chi tiết của GIẢI PHÁP {number}.\n\nVui lòng kiểm tra lại hoặc yêu cầu AI viết lại giải pháp này."
    )
}

/// Locates the detailed write-up of solution `number` in `document`.
pub fn locate_solution(document: &str, number: u8) -> LocatedSolution {
    let mut content = find_start(document, number)
        .map(|start| {
            let end = find_end(document, start, number);
            document[start..end].trim().to_string()
        })
        .unwrap_or_default();
    let mut outcome = LocateOutcome::Detailed;

    if content.chars().count() < MIN_DETAIL_CHARS {
        if let Some(block) = find_block(document, number) {
            content = block;
            outcome = LocateOutcome::BlockFallback;
        }
    }

    if content.chars().count() < MIN_RESULT_CHARS {
        tracing::debug!("[Locator] Solution {} not found, using placeholder", number);
        return LocatedSolution {
            content: not_found_placeholder(number),
            outcome: LocateOutcome::NotFound,
        };
    }

    LocatedSolution { content, outcome }
}

/// Byte offset where the solutions region starts, if a heading is present.
fn solutions_region_start(document: &str) -> Option<usize> {
    let marker = document.find(CONTENT_DESCRIPTION_MARKER);
    SOLUTIONS_SECTION_PATTERNS.iter().find_map(|pattern| match marker {
        Some(marker_idx) => pattern
            .find_at(document, marker_idx)
            .filter(|m| m.start() > marker_idx)
            .map(|m| m.start()),
        None => pattern.find(document).map(|m| m.start()),
    })
}

fn find_start(document: &str, number: u8) -> Option<usize> {
    let search_from = solutions_region_start(document).unwrap_or(0);

    let detail_patterns = [
        format!(r"(?i)━+\s*\n?\s*📋\s*GIẢI PHÁP\s*{number}\s*[-–:]"),
        format!(r"(?i)━+\s*\n?\s*GIẢI PHÁP\s*\[?{number}\]?\s*[-–:]"),
        format!(r"(?i)4\.{number}[.:\s]+GIẢI PHÁP\s*{number}\b"),
        format!(r"(?i)GIẢI PHÁP\s*{number}\s*[:–-]\s*[^\n]{{10,}}"),
        format!(r"(?i)GIẢI PHÁP\s*{number}\b"),
    ];

    detail_patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .find_map(|pattern| {
            pattern
                .find_iter(&document[search_from..])
                .map(|m| search_from + m.start())
                .find(|start| looks_detailed(&document[*start..]))
        })
}

/// A detailed write-up is followed closely by sub-headings and is longer
/// than an outline entry.
fn looks_detailed(rest: &str) -> bool {
    let window = crate::document::head_chars(rest, LOOKAHEAD_CHARS);
    let has_cue = STRUCTURAL_CUES
        .as_ref()
        .is_some_and(|cues| cues.is_match(window));
    has_cue && window.chars().count() > MIN_DETAIL_CHARS
}

fn find_end(document: &str, start: usize, number: u8) -> usize {
    if let Some(rel) = document[start..].find(END_MARKER) {
        let end_idx = start + rel;
        let after_marker = end_idx + END_MARKER.len();
        if let Some(block_rel) = document[after_marker..].find(END_BLOCK_SEPARATOR) {
            let block_idx = after_marker + block_rel;
            if block_idx - end_idx < END_BLOCK_WINDOW_BYTES {
                let line_end = document[block_idx..]
                    .find('\n')
                    .map(|nl| block_idx + nl)
                    .unwrap_or(document.len());
                return line_end;
            }
        }
        return document[end_idx..]
            .find("\n\n")
            .map(|rel| end_idx + rel + 1)
            .unwrap_or(document.len());
    }

    let min_end = advance_chars(document, start, MIN_DETAIL_CHARS);
    let next_solution_from = advance_chars(document, start, MIN_NEXT_SOLUTION_OFFSET);

    let next_solution = Regex::new(&format!(r"(?i)GIẢI PHÁP\s*{}\b", number + 1))
        .ok()
        .and_then(|re| re.find_at(document, next_solution_from).map(|m| m.start()));
    let next_part = NEXT_PART
        .as_ref()
        .and_then(|re| re.find_at(document, min_end).map(|m| m.start()));
    let next_separator = document[min_end..]
        .find(SHORT_SEPARATOR)
        .map(|rel| min_end + rel);

    [next_solution, next_part, next_separator]
        .into_iter()
        .flatten()
        .filter(|idx| *idx > min_end)
        .min()
        .unwrap_or(document.len())
}

fn find_block(document: &str, number: u8) -> Option<String> {
    let splitter = BLOCK_SPLIT.as_ref()?;
    let marker = Regex::new(&format!(r"(?i)GIẢI PHÁP\s*{number}\b")).ok()?;
    let parts: Vec<&str> = splitter.split(document).map(str::trim).collect();
    parts
        .into_iter()
        .rev()
        .find(|part| {
            marker.is_match(part)
                && part.chars().count() > MIN_DETAIL_CHARS
                && (part.contains("MỤC TIÊU") || part.contains("QUY TRÌNH") || part.contains("Bước 1"))
        })
        .map(str::to_string)
}

/// Byte offset `chars` characters after `from`, clamped to the end.
fn advance_chars(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map(|(idx, _)| from + idx)
        .unwrap_or(text.len())
}
