use crate::core::invoice::drop_negative_quantity_in;
use crate::core::normalize::{parse_date, parse_number};
use crate::core::synonyms::{
    map_headers, output_order, ISSUES_COLUMN, STOCK_CANONICAL_ORDER, STOCK_HEADER_SYNONYMS,
};
use crate::core::{count_issues, Pipeline};
use crate::domain::model::{
    Cell, CleanOutcome, DatasetKind, Preview, StockProfile, StockReport, Table,
};
use crate::utils::error::{CleanError, Result};
use chrono::{Days, NaiveDate, Utc};

pub const LOW_STOCK: &str = "LOW_STOCK";
pub const EXPIRED: &str = "EXPIRED";
pub const EXPIRING_SOON: &str = "EXPIRING_SOON";
pub const NEGATIVE_QTY: &str = "NEGATIVE_QTY";

const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockOptions {
    pub days_expiring: u32,
    pub drop_negative_qty: bool,
    /// Reference date for expiry checks.
    pub today: NaiveDate,
}

impl Default for StockOptions {
    fn default() -> Self {
        Self {
            days_expiring: 30,
            drop_negative_qty: false,
            today: Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StockPipeline {
    options: StockOptions,
}

impl StockPipeline {
    pub fn new(options: StockOptions) -> Self {
        Self { options }
    }
}

impl Pipeline for StockPipeline {
    type Report = StockReport;

    fn kind(&self) -> DatasetKind {
        DatasetKind::Stock
    }

    fn accept(&self, table: &Table) -> Result<()> {
        if table.is_empty() {
            return Err(CleanError::EmptyInput);
        }
        Ok(())
    }

    fn transform(&self, table: Table) -> Result<CleanOutcome<StockReport>> {
        clean_stock(&table, &self.options)
    }
}

/// Normalizes a stock sheet and flags low, expiring, expired and negative
/// rows. Missing columns simply disable the related checks.
pub fn clean_stock(input: &Table, options: &StockOptions) -> Result<CleanOutcome<StockReport>> {
    let mapped = map_headers(STOCK_HEADER_SYNONYMS, &input.columns);
    let mut df = Table::new(mapped, input.rows.clone());

    for col in ["qty_on_hand", "reorder_point"] {
        df.map_column(col, |c| Cell::from_number(parse_number(c)));
    }
    df.map_column("expiry_date", |c| {
        parse_date(c).map(Cell::Date).unwrap_or_default()
    });

    let today = options.today;
    let soon_cutoff = today
        .checked_add_days(Days::new(u64::from(options.days_expiring)))
        .unwrap_or(NaiveDate::MAX);

    let qty = df.column_index("qty_on_hand");
    let rop = df.column_index("reorder_point");
    let exp = df.column_index("expiry_date");
    let issues_idx = df.ensure_column(ISSUES_COLUMN);

    for row in &mut df.rows {
        let q = qty.and_then(|i| row[i].as_number());
        let r = rop.and_then(|i| row[i].as_number());
        let e = exp.and_then(|i| row[i].as_date());

        let mut tags: Vec<&str> = Vec::new();
        if let (Some(q), Some(r)) = (q, r) {
            if q <= r {
                tags.push(LOW_STOCK);
            }
        }
        if let Some(e) = e {
            if e < today {
                tags.push(EXPIRED);
            } else if e <= soon_cutoff {
                tags.push(EXPIRING_SOON);
            }
        }
        if q.is_some_and(|q| q < 0.0) {
            tags.push(NEGATIVE_QTY);
        }

        row[issues_idx] = if tags.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(tags.join("|"))
        };
    }

    let removed_neg = if options.drop_negative_qty {
        drop_negative_quantity_in(&mut df, "qty_on_hand")
    } else {
        0
    };

    let issues_summary = count_issues(&df);

    let order = output_order(STOCK_CANONICAL_ORDER, &df.columns);
    df.reorder_columns(&order);

    let mut tips = Vec::new();
    if issues_summary.contains_key(LOW_STOCK) {
        tips.push("Some items are below or equal to reorder point; reorder suggested.".to_string());
    }
    if issues_summary.contains_key(EXPIRING_SOON) {
        tips.push("Items expiring soon; consider promotions or returns.".to_string());
    }
    if issues_summary.contains_key(EXPIRED) {
        tips.push("Expired items found; remove from sellable stock.".to_string());
    }
    if removed_neg > 0 {
        tips.push(format!("Dropped {} rows with negative quantities.", removed_neg));
    }
    if tips.is_empty() {
        tips.push("No critical stock anomalies detected under current settings.".to_string());
    }

    let count = |tag: &str| issues_summary.get(tag).copied().unwrap_or(0);
    let profile = StockProfile {
        rows_in: input.len(),
        rows_out: df.len(),
        low_stock: count(LOW_STOCK),
        expiring_soon: count(EXPIRING_SOON),
        expired: count(EXPIRED),
        negative_qty_dropped: removed_neg,
    };

    tracing::debug!(
        rows_in = profile.rows_in,
        rows_out = profile.rows_out,
        low_stock = profile.low_stock,
        "Stock cleaning finished"
    );

    let report = StockReport {
        profile,
        issues_summary,
        ai_feedback: tips,
        preview: Preview {
            before: input.preview(PREVIEW_ROWS),
            after: df.preview(PREVIEW_ROWS),
        },
    };

    Ok(CleanOutcome { report, table: df })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 30).unwrap()
    }

    fn options() -> StockOptions {
        StockOptions {
            today: today(),
            ..Default::default()
        }
    }

    fn sample() -> Table {
        let rows: &[&[&str]] = &[
            &["SKU-1", "Protein Bar", "Acme", "5", "10", "2025-10-05"],
            &["SKU-2", "Yogurt Cup", "Delta", "25", "10", "2025-12-15"],
            &["SKU-3", "Olive Oil", "Gamma", "0", "5", "2025-09-28"],
            &["SKU-4", "Granola", "Beta", "-2", "5", "2026-03-20"],
            &["SKU-5", "Cheese", "Acme", "7", "7", ""],
        ];
        Table::new(
            ["SKU", "Name", "Supplier", "Qty", "Reorder Point", "Expiry Date"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Cell::from_text(v)).collect())
                .collect(),
        )
    }

    fn issues(out: &CleanOutcome<StockReport>) -> Vec<String> {
        let idx = out.table.column_index(ISSUES_COLUMN).unwrap();
        out.table.rows.iter().map(|r| r[idx].to_string()).collect()
    }

    #[test]
    fn test_flags_per_row() {
        let out = clean_stock(&sample(), &options()).unwrap();
        assert_eq!(
            issues(&out),
            vec![
                "LOW_STOCK|EXPIRING_SOON",
                "",
                "LOW_STOCK|EXPIRED",
                "LOW_STOCK|NEGATIVE_QTY",
                "LOW_STOCK",
            ]
        );

        let p = &out.report.profile;
        assert_eq!((p.rows_in, p.rows_out), (5, 5));
        assert_eq!(p.low_stock, 4);
        assert_eq!(p.expiring_soon, 1);
        assert_eq!(p.expired, 1);
        assert_eq!(p.negative_qty_dropped, 0);
    }

    #[test]
    fn test_columns_are_canonical_with_issues_last() {
        let out = clean_stock(&sample(), &options()).unwrap();
        assert_eq!(
            out.table.columns,
            vec![
                "sku",
                "name",
                "supplier",
                "qty_on_hand",
                "reorder_point",
                "expiry_date",
                ISSUES_COLUMN,
            ]
        );
        assert_eq!(out.report.preview.after[0][5], "2025-10-05");
    }

    #[test]
    fn test_drop_negative_rows() {
        let opts = StockOptions {
            drop_negative_qty: true,
            ..options()
        };
        let out = clean_stock(&sample(), &opts).unwrap();
        assert_eq!(out.report.profile.rows_out, 4);
        assert_eq!(out.report.profile.negative_qty_dropped, 1);
        assert_eq!(out.report.issues_summary.get(NEGATIVE_QTY), None);
        assert!(out
            .report
            .ai_feedback
            .contains(&"Dropped 1 rows with negative quantities.".to_string()));
    }

    #[test]
    fn test_expiry_window_is_configurable() {
        let opts = StockOptions {
            days_expiring: 90,
            ..options()
        };
        let out = clean_stock(&sample(), &opts).unwrap();
        // 2025-12-15 is within 90 days of 2025-09-30
        assert_eq!(out.report.profile.expiring_soon, 2);
    }

    #[test]
    fn test_missing_columns_are_tolerated() {
        let input = Table::new(
            vec!["Product".to_string(), "Vendor".to_string()],
            vec![vec![Cell::from_text("Milk"), Cell::from_text("Acme")]],
        );
        let out = clean_stock(&input, &options()).unwrap();
        assert_eq!(out.table.columns, vec!["name", "supplier", ISSUES_COLUMN]);
        assert_eq!(
            out.report.ai_feedback,
            vec!["No critical stock anomalies detected under current settings."]
        );
    }

    #[test]
    fn test_pipeline_rejects_empty_table() {
        let pipeline = StockPipeline::new(options());
        let empty = Table::new(vec!["SKU".to_string()], vec![]);
        assert!(matches!(pipeline.accept(&empty), Err(CleanError::EmptyInput)));
    }
}
