use crate::domain::model::{DatasetKind, Table};
use maud::{html, Markup, PreEscaped, DOCTYPE};

pub const DEFAULT_SHARE_LIMIT: usize = 200;

const STYLE: &str = r#"
    body { font-family: -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 24px; color: #222; }
    .wrap { max-width: 1100px; margin: 0 auto; }
    h1 { font-size: 22px; margin: 0 0 8px; }
    .sub { color: #666; margin-bottom: 16px; }
    table { border-collapse: collapse; width: 100%; font-size: 13px; }
    th, td { border: 1px solid #e5e7eb; padding: 8px 10px; }
    th { background: #f8fafc; text-align: left; position: sticky; top: 0; }
    .note { margin-top: 10px; color: #6b7280; }
    .pill { display:inline-block; padding: 2px 8px; border-radius: 9999px; background:#eef2ff; color:#3730a3; font-size:12px; }
"#;

fn table_markup(table: &Table, limit: usize) -> Markup {
    html! {
        table {
            thead {
                tr {
                    @for col in &table.columns {
                        th { (col) }
                    }
                }
            }
            tbody {
                @for row in table.rows.iter().take(limit) {
                    tr {
                        @for cell in row {
                            td { (cell.to_string()) }
                        }
                    }
                }
            }
        }
    }
}

/// Read-only public preview of a cleaned file.
pub fn render_share_page(table: &Table, kind: DatasetKind, limit: usize) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "AI-in-a-Box • " (kind.title()) }
                meta name="viewport" content="width=device-width,initial-scale=1";
                style { (PreEscaped(STYLE)) }
            }
            body {
                div class="wrap" {
                    h1 { "AI-in-a-Box • Cleaned " (kind.label()) }
                    div class="sub" {
                        "Public preview (read-only) • "
                        span class="pill" { (kind.title()) }
                    }
                    (table_markup(table, limit))
                    p class="note" {
                        "Showing up to the first " (limit) " rows. Download the full file from the app."
                    }
                }
            }
        }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Cell;

    #[test]
    fn test_share_page_limits_rows_and_escapes() {
        let rows = (0..5)
            .map(|i| vec![Cell::Text(format!("<b>{}</b>", i))])
            .collect();
        let table = Table::new(vec!["sku".to_string()], rows);

        let html = render_share_page(&table, DatasetKind::Stock, 3);
        assert!(html.contains("<title>AI-in-a-Box • Stock</title>"));
        assert!(html.contains("Cleaned stock"));
        assert!(html.contains("&lt;b&gt;2&lt;/b&gt;"));
        assert!(!html.contains("&lt;b&gt;3&lt;/b&gt;"));
        assert!(!html.contains("<b>0</b>"));
        assert!(html.contains("first 3 rows"));
    }

    #[test]
    fn test_script_in_cells_and_headers_is_inert() {
        let table = Table::new(
            vec!["<img src=x onerror=alert(1)>".to_string()],
            vec![vec![Cell::Text(r#"<script>alert("x")</script> & co"#.to_string())]],
        );

        let html = render_share_page(&table, DatasetKind::Invoices, 10);
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; co"));
        assert!(html.contains("<th>&lt;img src=x onerror=alert(1)&gt;</th>"));
    }
}
