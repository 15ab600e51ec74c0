pub mod columns;
pub mod header;
pub mod records;
pub mod rows;

use thiserror::Error;

use columns::{Field, HeaderMap, LabelRule};
use header::HeaderLabel;
use records::Record;

/// What to look for in one kind of sheet.
#[derive(Debug, Clone)]
pub struct Profile {
    pub required: Vec<HeaderLabel>,
    pub rules: Vec<LabelRule>,
    pub date_fields: Vec<Field>,
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            required: vec![
                HeaderLabel::new("專案代號").or("project_code"),
                HeaderLabel::new("事項").or("task_name"),
            ],
            rules: columns::default_rules(),
            date_fields: vec![Field::StartDate, Field::DueDate, Field::CompleteDate],
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("header row not found (missing labels: {})", join_labels(.missing))]
    HeaderNotFound { missing: Vec<HeaderLabel> },
}

fn join_labels(labels: &[HeaderLabel]) -> String {
    labels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Records plus what the caller needs to log about how they were found.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub header_index: usize,
    pub header_map: HeaderMap,
    /// Rows after the header row, before separator filtering.
    pub rows_scanned: usize,
}

impl Extraction {
    pub fn rows_dropped(&self) -> usize {
        self.rows_scanned - self.records.len()
    }
}

/// Four-pass pipeline: markup → rows → header row → column map → records.
pub fn extract(html: &str, profile: &Profile) -> Result<Extraction, ExtractError> {
    let rows = rows::parse_rows(html);
    let header_index = header::locate_header(&rows, &profile.required).ok_or_else(|| {
        ExtractError::HeaderNotFound {
            missing: header::missing_labels(&rows, &profile.required),
        }
    })?;

    let header_map = columns::map_columns(&rows[header_index], &profile.rules);
    let data = &rows[header_index + 1..];
    let records = records::extract_records(data, &header_map, &profile.date_fields);

    Ok(Extraction {
        records,
        header_index,
        header_map,
        rows_scanned: data.len(),
    })
}

// ── Tests ──
