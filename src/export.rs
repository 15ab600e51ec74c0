use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// UTF-8 byte-order mark so spreadsheet tools detect the encoding.
const BOM: &[u8] = b"\xEF\xBB\xBF";

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Pretty-printed JSON, non-ASCII kept literal.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut out = create(path)?;
    serde_json::to_writer_pretty(&mut out, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    out.flush()?;
    Ok(())
}

/// CSV with a BOM and CRLF line endings.
pub fn write_table<W, R>(mut w: W, header: &[String], rows: &[R]) -> Result<()>
where
    W: Write,
    R: AsRef<[String]>,
{
    w.write_all(BOM)?;
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(w);
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row.as_ref())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv<R: AsRef<[String]>>(path: &Path, header: &[String], rows: &[R]) -> Result<()> {
    let out = create(path)?;
    write_table(out, header, rows).with_context(|| format!("Failed to write {}", path.display()))
}

/// Row count of a new export compared with the file it replaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub previous: usize,
    pub current: usize,
    /// The new export is below `ratio` of the previous one, which usually
    /// means the sheet was exported with a filter applied.
    pub partial: bool,
}

impl Reconciliation {
    pub fn compare(previous: usize, current: usize, ratio: f64) -> Self {
        Reconciliation {
            previous,
            current,
            partial: (current as f64) < (previous as f64) * ratio,
        }
    }
}

/// Count the data rows of the CSV about to be replaced. `None` if it doesn't exist yet.
pub fn reconcile(previous_csv: &Path, current: usize, ratio: f64) -> Result<Option<Reconciliation>> {
    if !previous_csv.exists() {
        return Ok(None);
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(previous_csv)
        .with_context(|| format!("Failed to open {}", previous_csv.display()))?;

    let mut previous = 0;
    for record in rdr.records() {
        record.with_context(|| format!("Failed to read {}", previous_csv.display()))?;
        previous += 1;
    }
    Ok(Some(Reconciliation::compare(previous, current, ratio)))
}
