mod export;
mod parser;
mod settings;
mod tables;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::parser::columns::Field;
use crate::parser::records::Record;
use crate::parser::{Extraction, Profile};
use crate::settings::Settings;
use crate::tables::LookupTable;

#[derive(Parser)]
#[command(name = "sheet_extract", about = "Google Sheets HTML export → task records (JSON / CSV)")]
struct Cli {
    /// Settings file (default: ./sheet_extract.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the task sheet into a JSON array of records
    Json {
        /// Task sheet export (default: <html_dir>/<tasks_file>)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output file (default: json_output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert the status, project, and task sheets into CSV files
    Csv {
        /// Directory holding the HTML exports
        #[arg(long)]
        html_dir: Option<PathBuf>,
        /// Directory for status.csv, project.csv, data.csv
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Show where the header row is and how columns were mapped
    Inspect {
        /// HTML export to inspect
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    debug!(?settings, "settings loaded");

    let result = match cli.command {
        Commands::Json { input, output } => {
            let input = input.unwrap_or_else(|| settings.tasks_path());
            let output = output.unwrap_or_else(|| settings.json_output.clone());
            let extraction = extract_file(&input, &settings.profile())?;
            export::write_json(&output, &extraction.records)?;
            println!(
                "Extracted {} records to {}",
                extraction.records.len(),
                output.display()
            );
            Ok(())
        }
        Commands::Csv { html_dir, out_dir } => {
            if let Some(dir) = html_dir {
                settings.html_dir = dir;
            }
            if let Some(dir) = out_dir {
                settings.out_dir = dir;
            }
            println!("HTML source: {}", settings.html_dir.display());
            println!("CSV output:  {}", settings.out_dir.display());
            import_all(&settings)
        }
        Commands::Inspect { input } => {
            let extraction = extract_file(&input, &settings.profile())?;
            print_inspection(&extraction);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn read_html(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Read and extract one export; header-not-found names the file.
fn extract_file(path: &Path, profile: &Profile) -> Result<Extraction> {
    let html = read_html(path)?;
    let extraction = parser::extract(&html, profile)
        .with_context(|| format!("Cannot extract records from {}", path.display()))?;
    info!(
        file = %path.display(),
        header_row = extraction.header_index,
        columns = %extraction.header_map,
        records = extraction.records.len(),
        dropped = extraction.rows_dropped(),
        "extracted"
    );
    if extraction.header_map.is_empty() {
        warn!(file = %path.display(), "header row found but no column matched a label rule");
    }
    for (col, text) in extraction.header_map.unmatched() {
        debug!(column = col, header = %text, "unmapped header column");
    }
    Ok(extraction)
}

fn print_inspection(extraction: &Extraction) {
    println!("Header row: {}", extraction.header_index);
    println!(
        "Columns: {} of {} header cells mapped",
        extraction.header_map.len(),
        extraction.header_map.width()
    );
    for field in Field::ALL {
        match extraction.header_map.column(field) {
            Some(col) => println!("  {:<14} {}", field.name(), col),
            None => println!("  {:<14} -", field.name()),
        }
    }
    for (col, text) in extraction.header_map.unmatched() {
        println!("  (unmapped)     {} {:?}", col, text);
    }
    println!(
        "Records: {} ({} rows scanned, {} dropped)",
        extraction.records.len(),
        extraction.rows_scanned,
        extraction.rows_dropped()
    );
}

enum Job {
    Lookup(LookupTable, PathBuf),
    Tasks(PathBuf),
}

impl Job {
    fn source(&self) -> &Path {
        match self {
            Job::Lookup(_, p) | Job::Tasks(p) => p,
        }
    }
}

/// Run the three sheet conversions in parallel; each document is independent.
fn import_all(settings: &Settings) -> Result<()> {
    let jobs = vec![
        Job::Lookup(tables::STATUS, settings.status_path()),
        Job::Lookup(tables::PROJECT, settings.project_path()),
        Job::Tasks(settings.tasks_path()),
    ];

    let results: Vec<(&Job, Result<usize>)> = jobs
        .par_iter()
        .map(|job| (job, run_job(job, settings)))
        .collect();

    let mut failed = 0;
    for (job, result) in results {
        match result {
            Ok(n) => println!("  {} → {} rows", job.source().display(), n),
            Err(e) => {
                failed += 1;
                eprintln!("  {} failed: {:#}", job.source().display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} sheets failed", failed, jobs.len());
    }
    Ok(())
}

fn run_job(job: &Job, settings: &Settings) -> Result<usize> {
    match job {
        Job::Lookup(table, path) => import_lookup(table, path, &settings.out_dir),
        Job::Tasks(path) => import_tasks(path, settings),
    }
}

fn import_lookup(table: &LookupTable, path: &Path, out_dir: &Path) -> Result<usize> {
    let html = read_html(path)?;
    let rows = parser::rows::parse_rows(&html);
    if rows.is_empty() {
        warn!(file = %path.display(), "no table rows, nothing written");
        return Ok(0);
    }
    let data = table.rows(&rows);
    let out = out_dir.join(format!("{}.csv", table.name));
    export::write_csv(&out, &table.header(), &data)?;
    info!(file = %out.display(), rows = data.len(), "written");
    Ok(data.len())
}

fn import_tasks(path: &Path, settings: &Settings) -> Result<usize> {
    let extraction = extract_file(path, &settings.profile())?;
    let records = &extraction.records;
    let out = settings.out_dir.join("data.csv");

    if let Some(check) = export::reconcile(&out, records.len(), settings.partial_ratio)? {
        info!(previous = check.previous, current = check.current, "data.csv row count");
        if check.partial {
            warn!(
                previous = check.previous,
                current = check.current,
                "export has far fewer rows than data.csv; the sheet may have been filtered before export. Writing anyway."
            );
        }
    }

    let header: Vec<String> = Field::ALL.iter().map(|f| f.name().to_string()).collect();
    let rows: Vec<&[String]> = records.iter().map(Record::values).collect();
    export::write_csv(&out, &header, &rows)?;
    info!(file = %out.display(), rows = rows.len(), "written");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_for(html_dir: &Path, out_dir: &Path) -> Settings {
        Settings {
            html_dir: html_dir.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
            tasks_file: "tasks.html".into(),
            status_file: "status.html".into(),
            project_file: "project.html".into(),
            ..Settings::default()
        }
    }

    #[test]
    fn csv_import_writes_three_files() {
        let out = tempfile::tempdir().unwrap();
        let settings = settings_for(Path::new("tests/fixtures"), out.path());
        import_all(&settings).unwrap();

        let data = std::fs::read_to_string(out.path().join("data.csv")).unwrap();
        let data = data.trim_start_matches('\u{feff}');
        let lines: Vec<&str> = data.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("\u{2716}\u{fe0e} 完成,P001,,,官網改版,2024-01-05,2024-02-15,2024-02-20,"));

        let status = std::fs::read_to_string(out.path().join("status.csv")).unwrap();
        assert!(status.starts_with("\u{feff}Status,BgColor,TextColor\r\n"));
        let project = std::fs::read_to_string(out.path().join("project.csv")).unwrap();
        assert_eq!(project.matches("\r\n").count(), 3);
    }

    #[test]
    fn csv_import_reports_missing_sheet() {
        let out = tempfile::tempdir().unwrap();
        let mut settings = settings_for(Path::new("tests/fixtures"), out.path());
        settings.project_file = "missing.html".into();
        assert!(import_all(&settings).is_err());
        // the other sheets are still converted
        assert!(out.path().join("status.csv").exists());
        assert!(out.path().join("data.csv").exists());
    }

    #[test]
    fn header_not_found_names_the_file() {
        let err = extract_file(Path::new("tests/fixtures/status.html"), &Profile::default())
            .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("status.html"), "{}", msg);
        assert!(msg.contains("專案代號|project_code"), "{}", msg);
    }

    #[test]
    fn english_header_sheet() {
        let profile = Profile::default();
        let extraction = extract_file(Path::new("tests/fixtures/data_en.html"), &profile).unwrap();
        assert_eq!(extraction.header_index, 0);
        let r = &extraction.records[0];
        assert_eq!(r.get(Field::Client), "ACME");
        assert_eq!(r.get(Field::Bu), "行銷");
        assert_eq!(r.get(Field::DueDate), "2024-06-30");
    }
}
