use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::columns::{self, Field, LabelRule};
use crate::parser::header::HeaderLabel;
use crate::parser::Profile;

const DEFAULT_FILE: &str = "sheet_extract";

/// Settings layered from defaults, an optional TOML file, and `SHEET_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub html_dir: PathBuf,
    pub out_dir: PathBuf,
    pub tasks_file: String,
    pub status_file: String,
    pub project_file: String,
    pub json_output: PathBuf,
    /// Warn when a new export has fewer than this share of the previous rows.
    pub partial_ratio: f64,
    /// Header labels that must co-occur; alternatives separated by `|`.
    pub required_labels: Vec<String>,
    pub rules: Vec<LabelRule>,
    pub date_fields: Vec<Field>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            html_dir: PathBuf::from("作業管理表TEST"),
            out_dir: PathBuf::from("Web_App"),
            tasks_file: "工作管理表.html".into(),
            status_file: "Status.html".into(),
            project_file: "Project.html".into(),
            json_output: PathBuf::from("Web_App/data.json"),
            partial_ratio: 0.5,
            required_labels: vec!["專案代號|project_code".into(), "事項|task_name".into()],
            rules: columns::default_rules(),
            date_fields: vec![Field::StartDate, Field::DueDate, Field::CompleteDate],
        }
    }
}

/// `SHEET_*` overrides. List settings are comma separated:
/// `SHEET_DATE_FIELDS=start_date,due_date`.
fn environment() -> Environment {
    Environment::with_prefix("SHEET")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("required_labels")
        .with_list_parse_key("date_fields")
}

impl Settings {
    /// Load `sheet_extract.toml` from the working directory (or `path`), then
    /// apply `SHEET_` overrides such as `SHEET_OUT_DIR=dist`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to load configuration")?;
        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn profile(&self) -> Profile {
        Profile {
            required: self
                .required_labels
                .iter()
                .map(|l| HeaderLabel::parse(l))
                .collect(),
            rules: self.rules.clone(),
            date_fields: self.date_fields.clone(),
        }
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.html_dir.join(&self.tasks_file)
    }

    pub fn status_path(&self) -> PathBuf {
        self.html_dir.join(&self.status_file)
    }

    pub fn project_path(&self) -> PathBuf {
        self.html_dir.join(&self.project_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_parser_default() {
        let p = Settings::default().profile();
        let d = Profile::default();
        assert_eq!(p.required, d.required);
        assert_eq!(p.rules, d.rules);
        assert_eq!(p.date_fields, d.date_fields);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
out_dir = "dist"
partial_ratio = 0.8
required_labels = ["Code", "Task"]
date_fields = ["due_date"]

[[rules]]
label = "Code"
field = "project_code"

[[rules]]
label = "Task"
field = "task_name"
exact = true
"#,
        )
        .unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.out_dir, PathBuf::from("dist"));
        assert_eq!(s.partial_ratio, 0.8);
        assert_eq!(s.tasks_file, "工作管理表.html");
        assert_eq!(s.rules.len(), 2);
        assert!(s.rules[1].exact);
        assert_eq!(s.date_fields, vec![Field::DueDate]);

        let html = "<tr><td>Code</td><td>Task</td><td>Due</td></tr><tr><td>P1</td><td>t</td><td>x</td></tr>";
        let out = crate::parser::extract(html, &s.profile()).unwrap();
        assert_eq!(out.records[0].get(Field::TaskName), "t");
    }

    #[test]
    fn env_overrides_scalars_and_lists() {
        let vars = [
            ("SHEET_OUT_DIR", "dist_env"),
            ("SHEET_PARTIAL_RATIO", "0.8"),
            ("SHEET_DATE_FIELDS", "start_date,due_date"),
            ("SHEET_REQUIRED_LABELS", "Code"),
        ];
        let env = environment().source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        let s = Settings::load_with(None, env).unwrap();
        assert_eq!(s.out_dir, PathBuf::from("dist_env"));
        assert_eq!(s.partial_ratio, 0.8);
        assert_eq!(s.date_fields, vec![Field::StartDate, Field::DueDate]);
        assert_eq!(s.required_labels, vec!["Code".to_string()]);
        assert_eq!(s.tasks_file, "工作管理表.html");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
