//! Page budget allocation across the parts of a standard report.
//!
//! The allocation is advisory: it is rendered into prompts as instructions
//! and never checked against what the model actually writes.

use serde::{Deserialize, Serialize};

/// Words on one A4 page at 13pt, 1.5 line spacing.
pub const WORDS_PER_PAGE: u32 = 350;
/// Characters on one A4 page at 13pt, 1.5 line spacing.
pub const CHARS_PER_PAGE: u32 = 2500;

pub const MIN_SOLUTIONS: u8 = 1;
pub const MAX_SOLUTIONS: u8 = 5;

/// Page quota for one part, with word and character equivalents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartBudget {
    pub pages: u32,
    pub words: u32,
    pub chars: u32,
}

impl PartBudget {
    pub fn from_pages(pages: u32) -> Self {
        Self {
            pages,
            words: pages * WORDS_PER_PAGE,
            chars: pages * CHARS_PER_PAGE,
        }
    }

    /// Upper tolerance: 15% above the quota, rounded up.
    pub fn max_pages(&self) -> u32 {
        (f64::from(self.pages) * 1.15).ceil() as u32
    }

    /// Lower tolerance: 15% below the quota, rounded down, at least one page.
    pub fn min_pages(&self) -> u32 {
        ((f64::from(self.pages) * 0.85).floor() as u32).max(1)
    }
}

/// Which part of the standard structure a prompt is writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetSection {
    PartOneTwo,
    PartThree,
    PerSolution,
    PartFiveSix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAllocation {
    pub total_pages: u32,
    pub words_per_page: u32,
    pub chars_per_page: u32,
    pub total_words: u32,
    pub total_chars: u32,
    pub num_solutions: u8,
    #[serde(rename = "partI_II")]
    pub part_one_two: PartBudget,
    #[serde(rename = "partIII")]
    pub part_three: PartBudget,
    #[serde(rename = "partIV")]
    pub part_four: PartBudget,
    pub per_solution: PartBudget,
    #[serde(rename = "partV_VI")]
    pub part_five_six: PartBudget,
}

impl PageAllocation {
    pub fn section(&self, section: BudgetSection) -> &PartBudget {
        match section {
            BudgetSection::PartOneTwo => &self.part_one_two,
            BudgetSection::PartThree => &self.part_three,
            BudgetSection::PerSolution => &self.per_solution,
            BudgetSection::PartFiveSix => &self.part_five_six,
        }
    }

    /// Sum of the four top-level parts.
    pub fn parts_total(&self) -> u32 {
        self.part_one_two.pages + self.part_three.pages + self.part_four.pages + self.part_five_six.pages
    }
}

/// Clamps a configured solution count into the supported range.
pub fn clamp_solutions(num_solutions: u8) -> u8 {
    num_solutions.clamp(MIN_SOLUTIONS, MAX_SOLUTIONS)
}

/// Computes the page allocation for `page_limit` pages and `num_solutions` solutions.
///
/// Returns `None` when no page limit is configured (absent or zero).
///
/// Part IV keeps a floor of three pages per solution and the conclusion is the
/// residual of the other three parts. When the residual would drop below one
/// page, Part IV gives pages back first, then Parts I-II and III, so the four
/// parts add up to `page_limit` whenever `page_limit >= 3 * num_solutions + 3`.
///
/// # Examples
///
/// ```
/// use skkn_core::budget::allocate;
///
/// let alloc = allocate(Some(30), 3).unwrap();
/// assert_eq!(alloc.part_one_two.pages, 2);
/// assert_eq!(alloc.part_four.pages, 25);
/// assert_eq!(alloc.parts_total(), 30);
/// ```
pub fn allocate(page_limit: Option<u32>, num_solutions: u8) -> Option<PageAllocation> {
    let total = page_limit.filter(|pages| *pages > 0)?;
    let solutions = clamp_solutions(num_solutions);
    let total_f = f64::from(total);

    let mut part_one_two = (total_f * 0.05).round().max(1.0) as i64;
    let mut part_three = (total_f * 0.05).round().max(1.0) as i64;
    let part_four_floor = 3 * i64::from(solutions);
    let mut part_four = ((total_f * 0.85).round() as i64).max(part_four_floor);

    let mut residual = i64::from(total) - part_one_two - part_three - part_four;
    if residual < 1 {
        let give_back = (1 - residual).min(part_four - part_four_floor).max(0);
        part_four -= give_back;
        residual += give_back;
    }
    for part in [&mut part_one_two, &mut part_three] {
        if residual >= 1 {
            break;
        }
        let give_back = (1 - residual).min(*part - 1).max(0);
        *part -= give_back;
        residual += give_back;
    }
    let part_five_six = residual.max(1);

    let per_solution = (part_four / i64::from(solutions)).max(2);

    Some(PageAllocation {
        total_pages: total,
        words_per_page: WORDS_PER_PAGE,
        chars_per_page: CHARS_PER_PAGE,
        total_words: total * WORDS_PER_PAGE,
        total_chars: total * CHARS_PER_PAGE,
        num_solutions: solutions,
        part_one_two: PartBudget::from_pages(part_one_two as u32),
        part_three: PartBudget::from_pages(part_three as u32),
        part_four: PartBudget::from_pages(part_four as u32),
        per_solution: PartBudget::from_pages(per_solution as u32),
        part_five_six: PartBudget::from_pages(part_five_six as u32),
    })
}
