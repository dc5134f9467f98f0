use super::model::SkknSection;

/// Flattens a hierarchical outline into addressable sections.
///
/// Walks the list once with a cursor:
///
/// - a level 1 heading is kept only when the next heading is not deeper
///   (it has no children); otherwise its children are visited one by one
/// - a heading at level 2 or deeper is kept and its whole subtree (every
///   following heading with a strictly greater level) is skipped
///
/// Levels are taken as given. Inconsistent nesting is grouped on a best
/// effort basis and never rejected. An empty result falls back to the
/// unfiltered input.
pub fn reduce_sections(sections: &[SkknSection]) -> Vec<SkknSection> {
    let mut result = Vec::new();
    let mut cursor = 0;

    while cursor < sections.len() {
        let current = &sections[cursor];

        if current.level <= 1 {
            let has_children = sections
                .get(cursor + 1)
                .is_some_and(|next| next.level > current.level);
            if !has_children {
                result.push(current.clone());
            }
            cursor += 1;
            continue;
        }

        result.push(current.clone());
        cursor += 1;
        while cursor < sections.len() && sections[cursor].level > current.level {
            cursor += 1;
        }
    }

    if result.is_empty() {
        return sections.to_vec();
    }
    result
}
