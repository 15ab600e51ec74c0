use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::rows::Cell;

/// Logical fields of a task record, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Status,
    ProjectCode,
    Client,
    Bu,
    TaskName,
    StartDate,
    DueDate,
    CompleteDate,
    Remark,
}

impl Field {
    pub const COUNT: usize = 9;

    pub const ALL: [Field; Field::COUNT] = [
        Field::Status,
        Field::ProjectCode,
        Field::Client,
        Field::Bu,
        Field::TaskName,
        Field::StartDate,
        Field::DueDate,
        Field::CompleteDate,
        Field::Remark,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Status => "status",
            Field::ProjectCode => "project_code",
            Field::Client => "client",
            Field::Bu => "bu",
            Field::TaskName => "task_name",
            Field::StartDate => "start_date",
            Field::DueDate => "due_date",
            Field::CompleteDate => "complete_date",
            Field::Remark => "remark",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the label table: header text → field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRule {
    pub label: String,
    pub field: Field,
    /// Whole-cell comparison instead of substring.
    #[serde(default)]
    pub exact: bool,
}

impl LabelRule {
    pub fn contains(label: &str, field: Field) -> Self {
        LabelRule {
            label: label.to_string(),
            field,
            exact: false,
        }
    }

    pub fn exact(label: &str, field: Field) -> Self {
        LabelRule {
            label: label.to_string(),
            field,
            exact: true,
        }
    }

    pub fn matches(&self, header_text: &str) -> bool {
        if self.label.is_empty() {
            return false;
        }
        if self.exact {
            header_text.trim().eq_ignore_ascii_case(&self.label)
        } else {
            header_text
                .to_ascii_lowercase()
                .contains(&self.label.to_ascii_lowercase())
        }
    }
}

/// Label table for the task sheet, Chinese headers first, then the English
/// headers used by the CSV-facing export.
pub fn default_rules() -> Vec<LabelRule> {
    vec![
        LabelRule::contains("狀態", Field::Status),
        LabelRule::contains("專案代號", Field::ProjectCode),
        LabelRule::contains("客戶", Field::Client),
        LabelRule::contains("事項", Field::TaskName),
        LabelRule::contains("開始時間", Field::StartDate),
        LabelRule::contains("預定完成", Field::DueDate),
        LabelRule::contains("完成時間", Field::CompleteDate),
        LabelRule::contains("備註", Field::Remark),
        LabelRule::contains("status", Field::Status),
        LabelRule::contains("project_code", Field::ProjectCode),
        LabelRule::contains("client", Field::Client),
        LabelRule::exact("bu", Field::Bu),
        LabelRule::contains("task_name", Field::TaskName),
        LabelRule::contains("start_date", Field::StartDate),
        LabelRule::contains("due_date", Field::DueDate),
        LabelRule::contains("complete_date", Field::CompleteDate),
        LabelRule::contains("remark", Field::Remark),
    ]
}

/// Resolved `field → column` mapping for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderMap {
    columns: BTreeMap<Field, usize>,
    width: usize,
    unmatched: Vec<(usize, String)>,
}

impl HeaderMap {
    pub fn column(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        self.columns.iter().map(|(f, c)| (*f, *c))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of cells in the header row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Header columns no rule matched, with their text.
    pub fn unmatched(&self) -> &[(usize, String)] {
        &self.unmatched
    }
}

impl fmt::Display for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .columns
            .iter()
            .map(|(field, col)| format!("{}={}", field, col))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Map each header cell through the rule table; first matching rule wins per
/// cell and the leftmost column wins per field.
pub fn map_columns(header: &[Cell], rules: &[LabelRule]) -> HeaderMap {
    let mut map = HeaderMap {
        width: header.len(),
        ..HeaderMap::default()
    };

    for (idx, cell) in header.iter().enumerate() {
        let text = cell.text();
        match rules.iter().find(|r| r.matches(&text)) {
            Some(rule) => {
                map.columns.entry(rule.field).or_insert(idx);
            }
            None => map.unmatched.push((idx, text)),
        }
    }

    map
}
