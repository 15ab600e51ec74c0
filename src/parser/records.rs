use serde::ser::{Serialize, SerializeMap, Serializer};

use super::columns::{Field, HeaderMap};
use super::rows::Row;

/// One task entry: a positional id plus one value per [`Field`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub id: usize,
    values: [String; Field::COUNT],
}

impl Record {
    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    /// Values in [`Field::ALL`] order, for tabular sinks.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// A row with neither a task name nor a project code is a separator.
    pub fn is_task(&self) -> bool {
        !self.get(Field::TaskName).is_empty() || !self.get(Field::ProjectCode).is_empty()
    }
}

#[cfg(test)]
impl Record {
    pub fn new(id: usize) -> Self {
        Record {
            id,
            ..Record::default()
        }
    }

    pub fn with(mut self, field: Field, value: &str) -> Self {
        self.set(field, value);
        self
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Field::COUNT + 1))?;
        map.serialize_entry("id", &self.id)?;
        for field in Field::ALL {
            map.serialize_entry(field.name(), self.get(field))?;
        }
        map.end()
    }
}

/// Map one data row. Columns past the end of the row read as empty.
pub fn map_row(row: &Row, header: &HeaderMap, date_fields: &[Field]) -> Record {
    let mut record = Record::default();
    for (field, col) in header.iter() {
        let Some(cell) = row.get(col) else { continue };
        let value = if date_fields.contains(&field) {
            cell.last_line().to_string()
        } else {
            cell.text()
        };
        record.set(field, value);
    }
    record
}

/// Map every data row, drop separator rows, and number the rest from 1.
pub fn extract_records(rows: &[Row], header: &HeaderMap, date_fields: &[Field]) -> Vec<Record> {
    rows.iter()
        .map(|row| map_row(row, header, date_fields))
        .filter(Record::is_task)
        .enumerate()
        .map(|(i, mut record)| {
            record.id = i + 1;
            record
        })
        .collect()
}
