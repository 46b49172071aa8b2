use std::collections::HashMap;
use std::path::{Path, PathBuf};

use snafu::OptionExt;

use crate::dashboard::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Relative paths are read from the directory of the configuration file.
pub fn resolve_path(root: &Path, file_path: &str) -> String {
    let p = Path::new(file_path);
    let full: PathBuf = if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    };
    full.display().to_string()
}

/// Several parties in one cell are separated by `|` or `;`.
pub fn split_parties(cell: &str) -> Vec<String> {
    cell.split(|c: char| c == '|' || c == ';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Accepts the French decimal comma.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse::<f64>().ok()
}

/// The position of each known column, from the header row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnIndex {
    columns: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> ColumnIndex {
        let columns = header
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_ref().trim().to_lowercase(), idx))
            .collect();
        ColumnIndex { columns }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.get(column).cloned()
    }

    pub fn require(&self, column: &str, path: &str) -> DashboardResult<usize> {
        self.position(column).context(MissingColumnSnafu {
            column,
            path: path.to_string(),
        })
    }

    /// The non-blank value of a column in a row, if the column exists.
    pub fn get(&self, row: &[String], column: &str) -> Option<String> {
        self.position(column)
            .and_then(|idx| row.get(idx))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Builds a parsed datapoint from the cells of one row, already converted to text.
pub fn datapoint_from_row(
    columns: &ColumnIndex,
    row: &[String],
    id: String,
    lineno: usize,
) -> ParsedDatapoint {
    ParsedDatapoint {
        id,
        lineno,
        kind: columns.get(row, "type"),
        election_id: columns.get(row, "election_id"),
        election_type: columns.get(row, "election_type"),
        round: columns.get(row, "election_tour"),
        date: columns.get(row, "date"),
        candidate_name: columns.get(row, "candidate_name"),
        parties: columns
            .get(row, "party")
            .map(|s| split_parties(&s))
            .unwrap_or_default(),
        nuance: columns.get(row, "nuance"),
        level: columns.get(row, "level"),
        city: columns.get(row, "city"),
        percentage: columns.get(row, "result_pourcentage_exprime"),
        amount: columns.get(row, "result_amount"),
        poll_id: columns.get(row, "poll_id"),
        hypothesis: columns.get(row, "hypothese"),
    }
}

/// The columns that must be present in every tabular file.
pub const REQUIRED_COLUMNS: [&str; 3] = ["date", "candidate_name", "result_pourcentage_exprime"];
