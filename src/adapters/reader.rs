use crate::domain::model::{Cell, Table};
use crate::utils::error::{CleanError, Result};
use crate::utils::validation::validate_file_extension;
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

pub const ALLOWED_EXTENSIONS: &[&str] = &["csv", "xlsx"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses an uploaded spreadsheet, picking the format from the file name.
pub fn read_table(file_name: &str, bytes: &[u8]) -> Result<Table> {
    let ext = validate_file_extension("file", file_name, ALLOWED_EXTENSIONS).map_err(|_| {
        CleanError::UnsupportedFile {
            file_name: file_name.to_string(),
        }
    })?;

    match ext.as_str() {
        "csv" => read_csv(bytes),
        _ => read_xlsx(bytes),
    }
}

pub fn read_csv(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    // 以 lossy 方式解碼，避免非 UTF-8 匯出檔直接失敗
    let columns = rdr
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(i, &String::from_utf8_lossy(h)))
        .collect();

    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record?;
        let row: Vec<Cell> = record
            .iter()
            .map(|field| Cell::from_text(&String::from_utf8_lossy(field)))
            .collect();
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        rows.push(row);
    }

    Ok(Table::new(columns, rows))
}

/// Reads the first worksheet; its first row holds the headers.
pub fn read_xlsx(bytes: &[u8]) -> Result<Table> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Table::default());
    };
    let range = range?;

    let mut sheet_rows = range.rows();
    let Some(header) = sheet_rows.next() else {
        return Ok(Table::default());
    };

    let columns = header
        .iter()
        .enumerate()
        .map(|(i, data)| header_name(i, &data_to_cell(data).to_string()))
        .collect();

    let rows = sheet_rows
        .map(|r| r.iter().map(data_to_cell).collect::<Vec<_>>())
        .filter(|r| !r.iter().all(Cell::is_empty))
        .collect();

    Ok(Table::new(columns, rows))
}

fn header_name(index: usize, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Unnamed: {}", index)
    } else {
        trimmed.to_string()
    }
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::from_number(Some(*f)),
        Data::String(s) => Cell::from_text(s),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Cell::Date(d.date()))
            .unwrap_or_else(|| Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_text(s),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}
