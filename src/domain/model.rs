use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A single spreadsheet value after parsing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl Cell {
    /// Builds a cell from raw text. Whitespace-only text counts as empty.
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn from_number(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Hashable identity used for duplicate detection and grouping.
    /// Empty cells compare equal to each other.
    pub fn key(&self) -> String {
        match self {
            Cell::Empty => "\u{0}".to_string(),
            Cell::Number(v) => format!("n:{}", v),
            Cell::Date(d) => format!("d:{}", d),
            Cell::Bool(b) => format!("b:{}", b),
            Cell::Text(s) => format!("t:{}", s),
        }
    }

    /// Ordering used when sorting rows: values first, empty cells last.
    pub fn sort_cmp(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Empty, Cell::Empty) => Ordering::Equal,
            (Cell::Empty, _) => Ordering::Greater,
            (_, Cell::Empty) => Ordering::Less,
            (Cell::Number(a), Cell::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Cell::Date(a), Cell::Date(b)) => a.cmp(b),
            (a, b) => a.to_string().cmp(&b.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
        }
    }
}

/// Column-named rows. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns the index of `name`, appending an empty column when missing.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Cell::Empty);
        }
        self.columns.len() - 1
    }

    pub fn map_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&Cell) -> Cell,
    {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                row[idx] = f(&row[idx]);
            }
        }
    }

    /// Rearranges columns into `order`. Names not present are skipped.
    pub fn reorder_columns(&mut self, order: &[String]) {
        let indices: Vec<usize> = order
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        self.columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        self.rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
    }

    /// First `n` rows rendered as strings.
    pub fn preview(&self, n: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .take(n)
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Invoices,
    Stock,
}

impl DatasetKind {
    pub fn label(&self) -> &'static str {
        match self {
            DatasetKind::Invoices => "invoices",
            DatasetKind::Stock => "stock",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DatasetKind::Invoices => "Invoices",
            DatasetKind::Stock => "Stock",
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            DatasetKind::Invoices => "aibox_inv",
            DatasetKind::Stock => "aibox_stock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// Anything other than "xlsx" falls back to CSV.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("xlsx") {
            ExportFormat::Xlsx
        } else {
            ExportFormat::Csv
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// An uploaded file before parsing.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A cleaned file kept on disk and addressable by token.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub kind: DatasetKind,
    pub format: ExportFormat,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub before: Vec<Vec<String>>,
    pub after: Vec<Vec<String>>,
}

pub type IssuesSummary = BTreeMap<String, usize>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceProfile {
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates_removed: usize,
    pub errors_fixed: usize,
    pub currency_detected: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedRules {
    pub fuzzy_threshold: u8,
    pub drop_duplicates: bool,
    pub drop_negative_qty: bool,
    pub flag_due_before_issue: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceReport {
    pub profile: InvoiceProfile,
    pub issues_summary: IssuesSummary,
    pub ai_feedback: Vec<String>,
    pub header_map: HashMap<String, String>,
    pub preview: Preview,
    pub applied_rules: AppliedRules,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockProfile {
    pub rows_in: usize,
    pub rows_out: usize,
    pub low_stock: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    pub negative_qty_dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReport {
    pub profile: StockProfile,
    pub issues_summary: IssuesSummary,
    pub ai_feedback: Vec<String>,
    pub preview: Preview,
}

/// Output of a cleaning pipeline: the report and the cleaned rows.
#[derive(Debug, Clone)]
pub struct CleanOutcome<R> {
    pub report: R,
    pub table: Table,
}

/// JSON body returned by the cleaning endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanResponse<R> {
    #[serde(flatten)]
    pub report: R,
    pub download_token: String,
    pub share_url: String,
}
