use crate::domain::model::{Cell, ExportFormat, Table};
use crate::utils::error::{CleanError, Result};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};

pub const SHEET_NAME: &str = "Cleaned";

const WIDTH_SAMPLE_ROWS: usize = 200;
const MAX_COLUMN_WIDTH: usize = 60;

const MONEY_COLUMNS: &[&str] = &[
    "unit_price",
    "line_total",
    "total_before_tax",
    "tax_amount",
    "total_amount",
];
const QUANTITY_COLUMNS: &[&str] = &["quantity", "qty_on_hand", "reorder_point"];
const PERCENT_COLUMNS: &[&str] = &["tax_rate"];

pub fn export(table: &Table, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => to_csv(table),
        ExportFormat::Xlsx => to_xlsx(table, SHEET_NAME),
    }
}

pub fn to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|c| c.to_string()))?;
    }
    wtr.into_inner()
        .map_err(|e| CleanError::IoError(e.into_error()))
}

/// Workbook with a styled, frozen header row, sized columns and number
/// formats for well-known money/quantity/rate columns.
pub fn to_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>> {
    let header_format = Format::new()
        .set_bold()
        .set_text_wrap()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin);
    let money_format = Format::new().set_num_format("#,##0.00");
    let qty_format = Format::new().set_num_format("#,##0");
    let pct_format = Format::new().set_num_format("0.00%");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (i, name) in table.columns.iter().enumerate() {
        let col = u16::try_from(i)
            .map_err(|_| CleanError::processing(format!("too many columns: {}", table.columns.len())))?;
        worksheet.write_string_with_format(0, col, name, &header_format)?;

        let lower = name.to_lowercase();
        let number_format = if MONEY_COLUMNS.contains(&lower.as_str()) {
            Some(&money_format)
        } else if QUANTITY_COLUMNS.contains(&lower.as_str()) {
            Some(&qty_format)
        } else if PERCENT_COLUMNS.contains(&lower.as_str()) {
            Some(&pct_format)
        } else {
            None
        };

        for (r, row) in table.rows.iter().enumerate() {
            let row_num = u32::try_from(r + 1)
                .map_err(|_| CleanError::processing("too many rows for a worksheet"))?;
            match (&row[i], number_format) {
                (Cell::Empty, _) => {}
                (Cell::Number(v), Some(fmt)) => {
                    worksheet.write_number_with_format(row_num, col, *v, fmt)?;
                }
                (Cell::Number(v), None) => {
                    worksheet.write_number(row_num, col, *v)?;
                }
                (Cell::Bool(b), _) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                (other, _) => {
                    worksheet.write_string(row_num, col, other.to_string())?;
                }
            }
        }

        worksheet.set_column_width(col, column_width(table, i) as f64)?;
    }

    worksheet.set_freeze_panes(1, 0)?;

    Ok(workbook.save_to_buffer()?)
}

/// Longest of the header and the first sampled values, plus padding, capped.
fn column_width(table: &Table, index: usize) -> usize {
    let header = table.columns[index].chars().count();
    let longest = table
        .rows
        .iter()
        .take(WIDTH_SAMPLE_ROWS)
        .map(|row| row[index].to_string().chars().count())
        .max()
        .unwrap_or(0);
    (header.max(longest) + 2).min(MAX_COLUMN_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["invoice_id".to_string(), "Total_Amount".to_string()],
            vec![
                vec![Cell::Text("INV-1".to_string()), Cell::Number(120.0)],
                vec![Cell::Text("INV,2".to_string()), Cell::Empty],
            ],
        )
    }

    #[test]
    fn test_csv_export() {
        let bytes = to_csv(&table()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "invoice_id,Total_Amount\nINV-1,120\n\"INV,2\",\n");
    }

    #[test]
    fn test_xlsx_export_is_a_zip_container() {
        let bytes = export(&table(), ExportFormat::Xlsx).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_column_width() {
        let long = "x".repeat(100);
        let t = Table::new(
            vec!["id".to_string(), "note".to_string()],
            vec![vec![Cell::Text("abc".to_string()), Cell::Text(long)]],
        );
        assert_eq!(column_width(&t, 0), 5);
        assert_eq!(column_width(&t, 1), MAX_COLUMN_WIDTH);
    }
}
