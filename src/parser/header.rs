use std::fmt;

use super::rows::{Cell, Row};

/// A header label that must appear in the header row, with alternative spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLabel {
    variants: Vec<String>,
}

impl HeaderLabel {
    pub fn new(label: &str) -> Self {
        HeaderLabel {
            variants: vec![label.to_string()],
        }
    }

    pub fn or(mut self, alt: &str) -> Self {
        self.variants.push(alt.to_string());
        self
    }

    /// Parse `"專案代號|project_code"` into two alternatives.
    pub fn parse(pattern: &str) -> Self {
        let variants = pattern
            .split('|')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        HeaderLabel { variants }
    }

    pub fn matches(&self, cell_text: &str) -> bool {
        let lower = cell_text.to_ascii_lowercase();
        self.variants
            .iter()
            .any(|v| !v.is_empty() && lower.contains(&v.to_ascii_lowercase()))
    }

    fn present_in(&self, row: &[Cell]) -> bool {
        row.iter().any(|c| self.matches(&c.text()))
    }
}

impl fmt::Display for HeaderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.variants.join("|"))
    }
}

pub fn is_header_row(row: &[Cell], required: &[HeaderLabel]) -> bool {
    !required.is_empty() && required.iter().all(|label| label.present_in(row))
}

/// Index of the first row that carries every required label.
pub fn locate_header(rows: &[Row], required: &[HeaderLabel]) -> Option<usize> {
    rows.iter().position(|row| is_header_row(row, required))
}

/// Labels missing from the row that came closest to being a header row.
pub fn missing_labels(rows: &[Row], required: &[HeaderLabel]) -> Vec<HeaderLabel> {
    let best = rows
        .iter()
        .enumerate()
        .max_by_key(|(i, row)| {
            let hits = required.iter().filter(|l| l.present_in(row)).count();
            // first row wins ties
            (hits, std::cmp::Reverse(*i))
        })
        .map(|(_, row)| row);

    match best {
        Some(row) => required
            .iter()
            .filter(|l| !l.present_in(row))
            .cloned()
            .collect(),
        None => required.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| Cell::from_lines([*c])).collect()
    }

    fn required() -> Vec<HeaderLabel> {
        vec![
            HeaderLabel::new("專案代號").or("project_code"),
            HeaderLabel::new("事項").or("task_name"),
        ]
    }

    #[test]
    fn skips_banner_rows() {
        let rows = vec![
            row(&["工作項目", "2026-02-12 更新"]),
            row(&["類別：", ""]),
            row(&["狀態", "專案代號", "事項", "開始時間"]),
            row(&["進行中", "P001", "Task A", "2024-01-01"]),
        ];
        assert_eq!(locate_header(&rows, &required()), Some(2));
    }

    #[test]
    fn substring_and_alternative_spelling() {
        let rows = vec![row(&["Status", "Project_Code", "Task_Name (short)"])];
        assert_eq!(locate_header(&rows, &required()), Some(0));
        let rows = vec![row(&["專案代號 *", "事項說明"])];
        assert_eq!(locate_header(&rows, &required()), Some(0));
    }

    #[test]
    fn labels_must_co_occur() {
        let rows = vec![row(&["專案代號"]), row(&["事項"])];
        assert_eq!(locate_header(&rows, &required()), None);
    }

    #[test]
    fn missing_reported_from_best_candidate() {
        let rows = vec![row(&["title"]), row(&["狀態", "專案代號", "備註"])];
        let missing = missing_labels(&rows, &required());
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].to_string(), "事項|task_name");
    }

    #[test]
    fn missing_all_when_no_rows() {
        assert_eq!(missing_labels(&[], &required()), required());
    }

    #[test]
    fn parse_alternatives() {
        let l = HeaderLabel::parse(" 事項 | task_name ||");
        assert_eq!(l, HeaderLabel::new("事項").or("task_name"));
    }

    #[test]
    fn empty_requirement_never_matches() {
        let rows = vec![row(&["a"])];
        assert_eq!(locate_header(&rows, &[]), None);
    }
}
