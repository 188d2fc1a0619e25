use crate::domain::model::Cell;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace regex"));

// 只保留數字、負號與小數/千分位符號
static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9\-,.]").expect("static numeric regex"));

// 年份在前: 2025-09-01, 2025/9/1, 2025.09.01
static YEAR_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})$").expect("static year-first regex")
});

// 月份在前 (dotted too): 9/1/25, 09-01-2025, 01.09.2025
static MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[-/.](\d{1,2})[-/.](\d{4}|\d{2})$").expect("static month-first regex")
});

// 日期 + 時間，時間部分捨棄
static WITH_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)[T ]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?$").expect("static datetime regex")
});

static FOUR_DIGIT_YEAR_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}$").expect("static year regex"));

/// Month-name forms; only tried when the text ends with a 4-digit year.
const NAMED_MONTH_FORMATS: &[&str] = &["%B %d, %Y", "%B %d %Y", "%d %B %Y", "%d-%b-%Y"];

const CURRENCY_MAP: &[(&str, &str)] = &[
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("MAD", "MAD"),
    ("usd", "USD"),
    ("eur", "EUR"),
    ("gbp", "GBP"),
];

/// Lowercases, trims and collapses inner whitespace of a header.
pub fn norm_header(header: &str) -> String {
    WHITESPACE
        .replace_all(header.trim(), " ")
        .to_lowercase()
}

pub fn parse_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(v) if v.is_finite() => Some(*v),
        Cell::Text(raw) => parse_number_str(raw),
        _ => None,
    }
}

/// Parses amounts such as "1 234,50 €", "$1,200.00" or "-3".
pub fn parse_number_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let compact = trimmed.replace(' ', "");
    let mut s = NON_NUMERIC.replace_all(&compact, "").into_owned();

    // 單一逗號且無小數點時，逗號視為小數點
    if s.matches(',').count() == 1 && !s.contains('.') {
        s = s.replace(',', ".");
    }
    let s = s.replace(',', "");

    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(raw) => parse_date_str(raw),
        _ => None,
    }
}

/// Parses free-form dates, month-first when the order is ambiguous.
/// A leading field above 12 is read as the day instead.
pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(d) = parse_numeric_date(s) {
        return Some(d);
    }

    if FOUR_DIGIT_YEAR_END.is_match(s) {
        for fmt in NAMED_MONTH_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return Some(d);
            }
        }
    }

    if let Some(caps) = WITH_TIME.captures(s) {
        return parse_numeric_date(&caps[1]);
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .ok()
}

fn parse_numeric_date(s: &str) -> Option<NaiveDate> {
    if let Some(caps) = YEAR_FIRST.captures(s) {
        let year = caps[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, caps[2].parse().ok()?, caps[3].parse().ok()?);
    }

    let caps = MONTH_FIRST.captures(s)?;
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[2].parse().ok()?;
    let year_raw = &caps[3];
    let mut year: i32 = year_raw.parse().ok()?;
    if year_raw.len() == 2 {
        year = expand_two_digit_year(year, Utc::now().year());
    }

    NaiveDate::from_ymd_opt(year, first, second)
        .or_else(|| NaiveDate::from_ymd_opt(year, second, first))
}

/// Places a two-digit year within 50 years of `current_year`.
fn expand_two_digit_year(yy: i32, current_year: i32) -> i32 {
    let year = current_year - current_year % 100 + yy;
    if year >= current_year + 50 {
        year - 100
    } else if year < current_year - 50 {
        year + 100
    } else {
        year
    }
}

/// Maps currency symbols and codes to ISO-4217 codes.
pub fn currency_code(cell: &Cell) -> Option<String> {
    let raw = cell.to_string();
    let key = raw.trim();
    if key.is_empty() {
        return None;
    }

    let upper = key.to_uppercase();
    let mapped = CURRENCY_MAP
        .iter()
        .find(|(k, _)| *k == key)
        .or_else(|| CURRENCY_MAP.iter().find(|(k, _)| *k == upper))
        .map(|(_, code)| code.to_string());

    Some(mapped.unwrap_or(upper))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_norm_header() {
        assert_eq!(norm_header("  Invoice   No "), "invoice no");
        assert_eq!(norm_header("Unit\tPrice"), "unit price");
        assert_eq!(norm_header("TVA"), "tva");
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number(&text("50")), Some(50.0));
        assert_eq!(parse_number(&text("$1,200.50")), Some(1200.5));
        assert_eq!(parse_number(&text("12,5")), Some(12.5));
        assert_eq!(parse_number(&text("1 234,50 €")), Some(1234.5));
        assert_eq!(parse_number(&text("-1")), Some(-1.0));
        assert_eq!(parse_number(&Cell::Number(3.0)), Some(3.0));
        assert_eq!(parse_number(&text("abc")), None);
        assert_eq!(parse_number(&Cell::Empty), None);
    }

    #[test]
    fn test_parse_date_variants() {
        let sep1 = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(parse_date(&text("2025/09/01")), Some(sep1));
        assert_eq!(parse_date(&text("2025-09-01")), Some(sep1));
        assert_eq!(parse_date(&text("09-01-2025")), Some(sep1));
        assert_eq!(parse_date(&text("9/1/2025")), Some(sep1));
        assert_eq!(parse_date(&text("2025-09-01 13:45:00")), Some(sep1));
        assert_eq!(parse_date(&text("2025-09-01T00:00:00Z")), Some(sep1));
        assert_eq!(parse_date(&text("Sep 1, 2025")), Some(sep1));
        assert_eq!(parse_date(&text("1 September 2025")), Some(sep1));
        assert_eq!(parse_date(&text("not a date")), None);
        assert_eq!(parse_date(&Cell::Empty), None);
    }

    #[test]
    fn test_short_years_are_month_first() {
        assert_eq!(parse_date_str("9/1/25"), NaiveDate::from_ymd_opt(2025, 9, 1));
        assert_eq!(parse_date_str("12/10/24"), NaiveDate::from_ymd_opt(2024, 12, 10));
        assert_eq!(parse_date_str("9/1/25 08:30"), NaiveDate::from_ymd_opt(2025, 9, 1));
    }

    #[test]
    fn test_dotted_dates_are_month_first() {
        assert_eq!(parse_date_str("01.09.2025"), NaiveDate::from_ymd_opt(2025, 1, 9));
        assert_eq!(parse_date_str("2025.09.01"), NaiveDate::from_ymd_opt(2025, 9, 1));
    }

    #[test]
    fn test_day_first_when_month_is_impossible() {
        assert_eq!(parse_date_str("25/12/2024"), NaiveDate::from_ymd_opt(2024, 12, 25));
        assert_eq!(parse_date_str("13/13/2024"), None);
        assert_eq!(parse_date_str("2025/02/30"), None);
    }

    #[test]
    fn test_expand_two_digit_year() {
        assert_eq!(expand_two_digit_year(25, 2026), 2025);
        assert_eq!(expand_two_digit_year(75, 2026), 2075);
        assert_eq!(expand_two_digit_year(76, 2026), 1976);
        assert_eq!(expand_two_digit_year(99, 2026), 1999);
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(currency_code(&text("$")).as_deref(), Some("USD"));
        assert_eq!(currency_code(&text("€")).as_deref(), Some("EUR"));
        assert_eq!(currency_code(&text("usd")).as_deref(), Some("USD"));
        assert_eq!(currency_code(&text(" Eur ")).as_deref(), Some("EUR"));
        assert_eq!(currency_code(&text("chf")).as_deref(), Some("CHF"));
        assert_eq!(currency_code(&text("  ")), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(86.2549), 86.25);
        assert_eq!(round2(100.0 * 1.0), 100.0);
    }
}
