use crate::core::fuzzy;
use crate::core::normalize::{currency_code, parse_date, parse_number, round2};
use crate::core::synonyms::{
    map_headers, output_order, INVOICE_CANONICAL_ORDER, INVOICE_HEADER_SYNONYMS, ISSUES_COLUMN,
};
use crate::core::{count_issues, Pipeline};
use crate::domain::model::{
    AppliedRules, Cell, CleanOutcome, DatasetKind, InvoiceProfile, InvoiceReport, Preview, Table,
};
use crate::utils::error::Result;
use crate::utils::validation::{validate_range, Validate};
use std::collections::{HashMap, HashSet};

const NUMERIC_COLUMNS: &[&str] = &[
    "quantity",
    "unit_price",
    "line_total",
    "tax_rate",
    "tax_amount",
    "total_before_tax",
    "total_amount",
];

const HARD_DUPLICATE_KEY: &[&str] = &["invoice_id", "item_description", "line_total"];

const PREVIEW_ROWS: usize = 10;

pub const NEGATIVE_QTY: &str = "NEGATIVE_QTY";
pub const NEGATIVE_PRICE: &str = "NEGATIVE_PRICE";
pub const DUE_BEFORE_ISSUE: &str = "DUE_BEFORE_ISSUE";
pub const TAX_RATE_OUT_OF_RANGE: &str = "TAX_RATE_OUT_OF_RANGE";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceOptions {
    pub fuzzy_threshold: u8,
    pub drop_duplicates: bool,
    pub drop_negative_qty: bool,
    pub flag_due_before_issue: bool,
}

impl Default for InvoiceOptions {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 90,
            drop_duplicates: true,
            drop_negative_qty: false,
            flag_due_before_issue: true,
        }
    }
}

impl Validate for InvoiceOptions {
    fn validate(&self) -> Result<()> {
        validate_range("fuzzy", self.fuzzy_threshold, 0, 100)
    }
}

impl From<InvoiceOptions> for AppliedRules {
    fn from(o: InvoiceOptions) -> Self {
        Self {
            fuzzy_threshold: o.fuzzy_threshold,
            drop_duplicates: o.drop_duplicates,
            drop_negative_qty: o.drop_negative_qty,
            flag_due_before_issue: o.flag_due_before_issue,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvoicePipeline {
    options: InvoiceOptions,
}

impl InvoicePipeline {
    pub fn new(options: InvoiceOptions) -> Self {
        Self { options }
    }
}

impl Pipeline for InvoicePipeline {
    type Report = InvoiceReport;

    fn kind(&self) -> DatasetKind {
        DatasetKind::Invoices
    }

    fn transform(&self, table: Table) -> Result<CleanOutcome<InvoiceReport>> {
        clean_invoices(&table, &self.options)
    }
}

/// Normalizes an invoice table, fills derived totals, flags anomalies and
/// removes duplicates.
pub fn clean_invoices(input: &Table, options: &InvoiceOptions) -> Result<CleanOutcome<InvoiceReport>> {
    let mapped = map_headers(INVOICE_HEADER_SYNONYMS, &input.columns);
    let header_map: HashMap<String, String> = input
        .columns
        .iter()
        .cloned()
        .zip(mapped.iter().cloned())
        .collect();

    let mut df = Table::new(mapped, input.rows.clone());

    normalize_fields(&mut df);
    compute_line_totals(&mut df);
    fill_invoice_totals(&mut df);
    flag_issues(&mut df, options.flag_due_before_issue);

    let removed_neg = if options.drop_negative_qty {
        drop_negative_quantity(&mut df)
    } else {
        0
    };

    let mut dup_removed = 0;
    if options.drop_duplicates {
        dup_removed += drop_hard_duplicates(&mut df);
        dup_removed += drop_soft_duplicates(&mut df, options.fuzzy_threshold);
    }

    let issues_idx = df.ensure_column(ISSUES_COLUMN);
    let errors_fixed = df.rows.iter().filter(|r| !r[issues_idx].is_empty()).count();
    let currency_detected = df.column_index("currency").and_then(|ci| {
        df.rows
            .iter()
            .find(|r| !r[ci].is_empty())
            .map(|r| r[ci].to_string())
    });

    let profile = InvoiceProfile {
        rows_in: input.len(),
        rows_out: df.len(),
        duplicates_removed: dup_removed,
        errors_fixed,
        currency_detected,
    };

    let order = output_order(INVOICE_CANONICAL_ORDER, &df.columns);
    df.reorder_columns(&order);

    let issues_summary = count_issues(&df);

    let mut tips = Vec::new();
    if dup_removed > 0 {
        tips.push(format!(
            "Removed {} duplicate rows. Consider adding unique invoice IDs upstream.",
            dup_removed
        ));
    }
    if removed_neg > 0 {
        tips.push(format!("Dropped {} rows with negative quantities.", removed_neg));
    }
    if issues_summary.contains_key(DUE_BEFORE_ISSUE) {
        tips.push("Some invoices have due_date before issue_date; enforce date validation.".to_string());
    }
    if issues_summary.contains_key(TAX_RATE_OUT_OF_RANGE) {
        tips.push("Tax rate out of expected range (0-50%); verify tax tables.".to_string());
    }
    if profile.currency_detected.is_none() && df.has_column("currency") {
        tips.push("Missing currency codes; standardize to ISO-4217 (e.g., USD, EUR, GBP).".to_string());
    }
    if tips.is_empty() {
        tips.push("No critical anomalies detected under current settings.".to_string());
    }

    tracing::debug!(
        rows_in = profile.rows_in,
        rows_out = profile.rows_out,
        duplicates = dup_removed,
        "Invoice cleaning finished"
    );

    let report = InvoiceReport {
        profile,
        issues_summary,
        ai_feedback: tips,
        header_map,
        preview: Preview {
            before: input.preview(PREVIEW_ROWS),
            after: df.preview(PREVIEW_ROWS),
        },
        applied_rules: (*options).into(),
    };

    Ok(CleanOutcome { report, table: df })
}

fn normalize_fields(df: &mut Table) {
    for col in ["issue_date", "due_date"] {
        df.map_column(col, |c| parse_date(c).map(Cell::Date).unwrap_or_default());
    }
    for col in NUMERIC_COLUMNS {
        df.map_column(col, |c| Cell::from_number(parse_number(c)));
    }
    df.map_column("currency", |c| currency_code(c).map(Cell::Text).unwrap_or_default());
}

/// quantity × unit_price when both are known, otherwise the given line total.
fn compute_line_totals(df: &mut Table) {
    let qty = df.column_index("quantity");
    let price = df.column_index("unit_price");
    let lt = df.ensure_column("line_total");

    for row in &mut df.rows {
        let q = qty.and_then(|i| row[i].as_number());
        let p = price.and_then(|i| row[i].as_number());
        if let (Some(q), Some(p)) = (q, p) {
            row[lt] = Cell::Number(round2(q * p));
        }
    }
}

fn fill_invoice_totals(df: &mut Table) {
    let Some(id_idx) = df.column_index("invoice_id") else {
        return;
    };
    let lt = df.ensure_column("line_total");

    // 每張發票的明細加總 (缺少編號的列歸為同一組)
    let mut sums: HashMap<String, f64> = HashMap::new();
    for row in &df.rows {
        let entry = sums.entry(row[id_idx].key()).or_insert(0.0);
        if let Some(v) = row[lt].as_number() {
            *entry += v;
        }
    }

    let tbt = df.ensure_column("total_before_tax");
    let tax = df.ensure_column("tax_amount");
    let rate = df.column_index("tax_rate");
    let total = df.ensure_column("total_amount");

    for row in &mut df.rows {
        if row[tbt].is_empty() {
            let sum = sums.get(&row[id_idx].key()).copied().unwrap_or(0.0);
            row[tbt] = Cell::Number(round2(sum));
        }

        if let Some(ri) = rate {
            if row[tax].is_empty() {
                if let (Some(base), Some(r)) = (row[tbt].as_number(), row[ri].as_number()) {
                    row[tax] = Cell::Number(round2(base * r));
                }
            }
        }

        if row[total].is_empty() {
            if let Some(base) = row[tbt].as_number() {
                let tax_amount = row[tax].as_number().unwrap_or(0.0);
                row[total] = Cell::Number(round2(base + tax_amount));
            }
        }
    }
}

fn flag_issues(df: &mut Table, flag_due_before_issue: bool) {
    let qty = df.column_index("quantity");
    let price = df.column_index("unit_price");
    let issue = df.column_index("issue_date");
    let due = df.column_index("due_date");
    let rate = df.column_index("tax_rate");
    let issues_idx = df.ensure_column(ISSUES_COLUMN);

    let number = |row: &[Cell], idx: Option<usize>| idx.and_then(|i| row[i].as_number());
    let date = |row: &[Cell], idx: Option<usize>| idx.and_then(|i| row[i].as_date());

    for row in &mut df.rows {
        let mut tags: Vec<&str> = Vec::new();
        let cells: &[Cell] = row.as_slice();

        if number(cells, qty).is_some_and(|q| q < 0.0) {
            tags.push(NEGATIVE_QTY);
        }
        if number(cells, price).is_some_and(|p| p < 0.0) {
            tags.push(NEGATIVE_PRICE);
        }
        if flag_due_before_issue {
            if let (Some(i), Some(d)) = (date(cells, issue), date(cells, due)) {
                if d < i {
                    tags.push(DUE_BEFORE_ISSUE);
                }
            }
        }
        if number(cells, rate).is_some_and(|r| !(0.0..=0.5).contains(&r)) {
            tags.push(TAX_RATE_OUT_OF_RANGE);
        }

        row[issues_idx] = if tags.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(tags.join("|"))
        };
    }
}

/// Missing quantities count as zero and are kept.
pub(crate) fn drop_negative_quantity_in(df: &mut Table, column: &str) -> usize {
    let Some(q) = df.column_index(column) else {
        return 0;
    };
    let before = df.len();
    df.rows.retain(|r| r[q].as_number().unwrap_or(0.0) >= 0.0);
    before - df.len()
}

fn drop_negative_quantity(df: &mut Table) -> usize {
    drop_negative_quantity_in(df, "quantity")
}

fn drop_hard_duplicates(df: &mut Table) -> usize {
    if !df.has_column("invoice_id") {
        return 0;
    }
    let subset: Vec<usize> = HARD_DUPLICATE_KEY
        .iter()
        .filter_map(|c| df.column_index(c))
        .collect();

    let before = df.len();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    df.rows
        .retain(|r| seen.insert(subset.iter().map(|&i| r[i].key()).collect()));
    before - df.len()
}

/// Sorts by customer and issue date, then drops rows whose total matches the
/// previous row's (±0.01) and whose customer name is a fuzzy match.
fn drop_soft_duplicates(df: &mut Table, threshold: u8) -> usize {
    let (Some(ci), Some(ti), Some(di)) = (
        df.column_index("customer_name"),
        df.column_index("total_amount"),
        df.column_index("issue_date"),
    ) else {
        return 0;
    };

    df.rows
        .sort_by(|a, b| a[ci].sort_cmp(&b[ci]).then_with(|| a[di].sort_cmp(&b[di])));

    let mut keep = vec![true; df.len()];
    for i in 1..df.len() {
        let (a, b) = (&df.rows[i - 1], &df.rows[i]);
        let ta = a[ti].as_number().unwrap_or(0.0);
        let tb = b[ti].as_number().unwrap_or(0.0);
        if (tb - ta).abs() <= 0.01
            && fuzzy::ratio(&a[ci].to_string(), &b[ci].to_string()) >= f64::from(threshold)
        {
            keep[i] = false;
        }
    }

    let removed = keep.iter().filter(|k| !**k).count();
    let rows = std::mem::take(&mut df.rows);
    df.rows = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, k)| k.then_some(row))
        .collect();
    removed
}
