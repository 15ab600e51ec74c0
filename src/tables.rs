//! Small lookup sheets (status colours, project list) whose columns are fixed
//! by position rather than located by header text.

use crate::parser::rows::{Cell, Row};

/// A positional sheet: the first row is its header, the next `columns.len()`
/// cells of each row are the values.
#[derive(Debug, Clone, Copy)]
pub struct LookupTable {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

pub const STATUS: LookupTable = LookupTable {
    name: "status",
    columns: &["Status", "BgColor", "TextColor"],
};

pub const PROJECT: LookupTable = LookupTable {
    name: "project",
    columns: &["Code", "Status", "BU"],
};

impl LookupTable {
    /// Rows after the header with a key in the first column and at least as
    /// many cells as the table has columns. Extra cells (preview columns) are cut.
    pub fn rows(&self, rows: &[Row]) -> Vec<Vec<String>> {
        let width = self.columns.len();
        rows.iter()
            .skip(1)
            .filter(|row| row.len() >= width && row.first().is_some_and(|c| !c.is_empty()))
            .map(|row| row[..width].iter().map(Cell::text).collect())
            .collect()
    }

    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::rows::parse_rows;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn status_sheet() {
        let rows = parse_rows(&fixture("status"));
        let out = STATUS.rows(&rows);
        assert_eq!(
            out,
            vec![
                vec!["進行中", "#fff2cc", "#000000"],
                vec!["\u{2714} 完成", "#d9ead3", "#38761d"],
                vec!["暫停", "#f4cccc", "#990000"],
            ]
        );
    }

    #[test]
    fn project_sheet() {
        let rows = parse_rows(&fixture("project"));
        let out = PROJECT.rows(&rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], vec!["P001", "Active", "行銷"]);
        assert_eq!(out[1], vec!["台北展", "Closed", "展覽"]);
    }

    #[test]
    fn skips_header_short_and_keyless_rows() {
        let rows = parse_rows(
            "<tr><td>Status</td><td>BgColor</td><td>TextColor</td></tr>\
             <tr><td>a</td><td>b</td></tr>\
             <tr><td></td><td>b</td><td>c</td></tr>\
             <tr><td>k</td><td>b</td><td>c</td><td>preview</td></tr>",
        );
        assert_eq!(STATUS.rows(&rows), vec![vec!["k", "b", "c"]]);
    }

    #[test]
    fn empty_sheet() {
        assert!(STATUS.rows(&[]).is_empty());
        assert_eq!(PROJECT.header(), vec!["Code", "Status", "BU"]);
    }
}
