use std::mem;
use std::sync::LazyLock;

use regex::Regex;

// Comments, doctype/processing instructions, and tags. Quoted attribute values
// may contain '>' but never '<'; a stray quote falls back to the plain branch.
// A '<' that doesn't open a well-formed tag stays in the text.
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<!--.*?(?:-->|\z)|<[!?][^>]*>|<(/?)([A-Za-z][A-Za-z0-9]*)(?:"[^"<]*"|'[^'<]*'|[^<>])*>"#)
        .unwrap()
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});

/// Class names Google Sheets puts on its row-number and column-letter cells.
const GUTTER_CLASSES: &[&str] = &["row-header", "column-header", "freezebar"];

/// Text content of one table cell, split on `<br>` into lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    lines: Vec<String>,
}

impl Cell {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Cell {
            lines: lines.into_iter().map(|l| normalize_ws(l.as_ref())).collect(),
        }
    }

    #[cfg(test)]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// All non-empty lines joined by a single space.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .filter(|l| !l.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The last non-empty line. Earlier lines are superseded values.
    pub fn last_line(&self) -> &str {
        self.lines
            .iter()
            .rev()
            .find(|l| !l.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }
}

pub type Row = Vec<Cell>;

/// Split an HTML document into table rows of `<td>` cells.
///
/// `<th>` cells carrying a gutter class (row numbers, column letters) are
/// skipped; any other `<th>` is a cell like `<td>`. `<br>` and block wrappers
/// (`div`, `p`, `li`) start a new line. Unclosed cells and rows are closed by
/// the next `<tr>`/`<td>`/`<th>`, by `</table>`, or at end of input. Rows
/// without cells are dropped.
pub fn parse_rows(html: &str) -> Vec<Row> {
    let mut builder = RowBuilder::default();
    let mut pos = 0;

    while let Some(caps) = MARKUP_RE.captures_at(html, pos) {
        let Some(whole) = caps.get(0) else { break };
        builder.text(&html[pos..whole.start()]);
        pos = whole.end();

        let Some(name) = caps.get(2) else { continue };
        let name = name.as_str().to_ascii_lowercase();
        let closing = !caps[1].is_empty();

        if !closing && (name == "script" || name == "style") {
            pos = skip_raw_text(html, pos, &name);
            continue;
        }

        match (name.as_str(), closing) {
            ("tr", false) => builder.open_row(),
            ("tr", true) | ("table", _) => builder.close_row(),
            ("td", false) => builder.open_cell(),
            ("td", true) => builder.close_cell(),
            ("th", false) if is_gutter(whole.as_str()) => builder.open_gutter(),
            ("th", false) => builder.open_cell(),
            ("th", true) => builder.close_header(),
            ("br", _) | ("div", _) | ("p", _) | ("li", _) => builder.line_break(),
            _ => {}
        }
    }

    builder.text(&html[pos..]);
    builder.finish()
}

fn is_gutter(tag: &str) -> bool {
    let Some(caps) = CLASS_RE.captures(tag) else {
        return false;
    };
    let classes = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map_or("", |m| m.as_str());
    classes
        .split_whitespace()
        .any(|c| GUTTER_CLASSES.iter().any(|g| c.starts_with(g)))
}

fn skip_raw_text(html: &str, from: usize, name: &str) -> usize {
    let close = format!("</{}", name);
    let rest = &html[from..];
    match rest.to_ascii_lowercase().find(&close) {
        Some(idx) => {
            let after = from + idx;
            html[after..].find('>').map(|e| after + e + 1).unwrap_or(html.len())
        }
        None => html.len(),
    }
}

#[derive(Default)]
struct RowBuilder {
    rows: Vec<Row>,
    row: Option<Row>,
    cell: Option<Vec<String>>,
    line: String,
    in_gutter: bool,
}

impl RowBuilder {
    fn text(&mut self, raw: &str) {
        if raw.is_empty() || self.in_gutter || self.cell.is_none() {
            return;
        }
        self.line.push_str(&html_escape::decode_html_entities(raw));
    }

    fn line_break(&mut self) {
        if let Some(lines) = self.cell.as_mut() {
            lines.push(mem::take(&mut self.line));
        }
    }

    fn open_row(&mut self) {
        self.close_row();
        self.row = Some(Vec::new());
    }

    fn close_row(&mut self) {
        self.close_cell();
        self.in_gutter = false;
        if let Some(row) = self.row.take() {
            if !row.is_empty() {
                self.rows.push(row);
            }
        }
    }

    fn open_cell(&mut self) {
        self.close_cell();
        self.in_gutter = false;
        if self.row.is_none() {
            self.row = Some(Vec::new());
        }
        self.cell = Some(Vec::new());
    }

    fn open_gutter(&mut self) {
        self.close_cell();
        self.in_gutter = true;
    }

    fn close_header(&mut self) {
        if self.in_gutter {
            self.in_gutter = false;
        } else {
            self.close_cell();
        }
    }

    fn close_cell(&mut self) {
        let Some(mut lines) = self.cell.take() else {
            return;
        };
        lines.push(mem::take(&mut self.line));
        let cell = Cell::from_lines(lines);
        self.row.get_or_insert_with(Vec::new).push(cell);
    }

    fn finish(mut self) -> Vec<Row> {
        self.close_row();
        self.rows
    }
}

/// Collapse runs of whitespace (including `&nbsp;`) to one space and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ──
