use skkn_core::budget::{self, PageAllocation, PartBudget};

pub fn print(pages: u32, solutions: u8) {
    match budget::allocate(Some(pages), solutions) {
        Some(allocation) => print!("{}", render_table(&allocation)),
        None => println!("Không giới hạn số trang: không phân bổ."),
    }
}

fn row(label: &str, part: &PartBudget) -> String {
    format!(
        "| {label:<24} | {:>5} | {:>7} | {:>8} |\n",
        part.pages, part.words, part.chars
    )
}

fn render_table(allocation: &PageAllocation) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Tổng: {} trang (~{} chữ, ~{} ký tự), {} giải pháp\n\n",
        allocation.total_pages,
        allocation.total_words,
        allocation.total_chars,
        allocation.num_solutions
    ));
    out.push_str("| Phần                     | Trang |     Chữ |    Ký tự |\n");
    out.push_str("|--------------------------|-------|---------|----------|\n");
    out.push_str(&row("I-II. Mở đầu", &allocation.part_one_two));
    out.push_str(&row("III. Thực trạng", &allocation.part_three));
    out.push_str(&row("IV. Giải pháp", &allocation.part_four));
    out.push_str(&row("    Mỗi giải pháp", &allocation.per_solution));
    out.push_str(&row("V-VI. Kết luận", &allocation.part_five_six));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lists_every_part() {
        let allocation = budget::allocate(Some(30), 3).unwrap();
        let table = render_table(&allocation);
        assert!(table.starts_with("Tổng: 30 trang"));
        assert!(table.contains(&row("IV. Giải pháp", &allocation.part_four)));
        assert!(table.contains("|    25 |"));
        assert!(table.contains("|     8 |"));
        assert_eq!(table.lines().count(), 9);
    }
}
