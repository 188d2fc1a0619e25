use crate::client::{ImpactEstimate, LocalPreview, DEFAULT_HOURLY_RATE};
use crate::config::ClientConfig;
use crate::domain::model::{
    CleanResponse, ExportFormat, InvoiceReport, IssuesSummary, Preview, StockReport,
};
use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = r#"
    body { font-family: -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 24px; color: #222; }
    .wrap { max-width: 1100px; margin: 0 auto; }
    h1 { font-size: 26px; margin: 0 0 12px; }
    h2 { font-size: 18px; margin: 24px 0 8px; }
    .status { padding: 8px 12px; border-radius: 6px; background: #eff6ff; margin-bottom: 16px; }
    .warn { padding: 8px 12px; border-radius: 6px; background: #fef3c7; margin-bottom: 16px; }
    .error { padding: 8px 12px; border-radius: 6px; background: #fee2e2; margin-bottom: 16px; }
    .ok { padding: 8px 12px; border-radius: 6px; background: #dcfce7; margin-bottom: 16px; }
    .cards { display: flex; gap: 24px; flex-wrap: wrap; }
    form { border: 1px solid #e5e7eb; border-radius: 8px; padding: 16px; flex: 1; min-width: 320px; }
    label { display: block; margin: 6px 0; }
    .caption { color: #6b7280; font-size: 13px; }
    table { border-collapse: collapse; width: 100%; font-size: 13px; }
    td { border: 1px solid #e5e7eb; padding: 6px 8px; }
"#;

fn layout(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
                meta name="viewport" content="width=device-width,initial-scale=1";
                style { (PreEscaped(STYLE)) }
            }
            body {
                div class="wrap" {
                    h1 { "AI-in-a-Box" }
                    (body)
                    p { a href="/" { "← Back" } }
                }
            }
        }
    }
    .into_string()
}

fn format_select() -> Markup {
    html! {
        label {
            "Download format "
            select name="fmt" {
                option value="csv" selected { "csv" }
                option value="xlsx" { "xlsx" }
            }
        }
    }
}

fn upload_fields() -> Markup {
    html! {
        label { "Upload CSV or XLSX " input type="file" name="file" accept=".csv,.xlsx"; }
        label { input type="checkbox" name="sample"; " Use built-in sample" }
    }
}

pub fn index_page(config: &ClientConfig, online: bool) -> String {
    let status = if online { "ONLINE ✅" } else { "OFFLINE ❌" };
    layout(
        "AI-in-a-Box",
        html! {
            div class="status" { "API: " (status) " → " (config.api_url) }
            div class="cards" {
                form method="post" action="/invoices" enctype="multipart/form-data" {
                    h2 { "Invoices" }
                    p class="caption" { "Settings affect invoice cleaning on the server." }
                    (upload_fields())
                    label { "Fuzzy threshold " input type="number" name="fuzzy" min="0" max="100" value="90"; }
                    label { input type="checkbox" name="drop_dupes" checked; " Drop duplicates" }
                    label { input type="checkbox" name="drop_negative_qty"; " Drop negative quantities" }
                    label { input type="checkbox" name="flag_due_issue" checked; " Flag due date before issue date" }
                    label { "Hourly rate ($) " input type="number" name="hourly_rate" min="0" step="0.5" value=(DEFAULT_HOURLY_RATE); }
                    (format_select())
                    button type="submit" { "Clean invoices" }
                    p class="caption" {
                        a href=(config.public_link("/api/sample/invoice")) { "Download sample invoices" }
                    }
                }
                form method="post" action="/stock" enctype="multipart/form-data" {
                    h2 { "Stock" }
                    p class="caption" { "Settings affect stock cleaning on the server." }
                    (upload_fields())
                    label { "Expiring within (days) " input type="number" name="days_expiring" min="0" value="30"; }
                    label { input type="checkbox" name="drop_negative_qty"; " Drop negative quantities" }
                    (format_select())
                    button type="submit" { "Clean stock" }
                    p class="caption" {
                        a href=(config.public_link("/api/sample/stock")) { "Download sample stock" }
                    }
                }
            }
        },
    )
}

fn rows_table(rows: &[Vec<String>]) -> Markup {
    html! {
        table {
            @for row in rows {
                tr {
                    @for cell in row {
                        td { (cell) }
                    }
                }
            }
        }
    }
}

fn preview_section(preview: &Preview) -> Markup {
    html! {
        h2 { "Before (sample)" }
        (rows_table(&preview.before))
        h2 { "After (sample)" }
        (rows_table(&preview.after))
    }
}

fn issues_section(issues: &IssuesSummary) -> Markup {
    let mut counts: Vec<_> = issues.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    html! {
        @if !counts.is_empty() {
            h2 { "Issues (summary)" }
            table {
                @for (issue, count) in counts {
                    tr { td { (issue) } td { (count) } }
                }
            }
        }
    }
}

fn notes_section(notes: &[String]) -> Markup {
    html! {
        @if !notes.is_empty() {
            h2 { "AI notes" }
            ul {
                @for note in notes {
                    li { (note) }
                }
            }
        }
    }
}

fn links_section<R>(config: &ClientConfig, response: &CleanResponse<R>, format: ExportFormat) -> Markup {
    let download = config.public_link(&format!(
        "/api/download/{}?fmt={}",
        response.download_token,
        format.extension()
    ));
    let share = config.public_link(&response.share_url);
    html! {
        h2 { "Share & download" }
        p { "🔗 Share: " a href=(share) { (share) } }
        p { a href=(download) { "Download cleaned " (format.extension().to_uppercase()) } }
    }
}

pub fn invoice_result(
    config: &ClientConfig,
    response: &CleanResponse<InvoiceReport>,
    impact: &ImpactEstimate,
    format: ExportFormat,
) -> String {
    let report = &response.report;
    let mut header_map: Vec<_> = report.header_map.iter().collect();
    header_map.sort();
    layout(
        "AI-in-a-Box • Invoices",
        html! {
            div class="ok" { "Invoices cleaned ✅" }
            p { (impact) }
            @if let Some(currency) = &report.profile.currency_detected {
                p { "Currency detected: " (currency) }
            }
            (preview_section(&report.preview))
            @if !header_map.is_empty() {
                h2 { "Header mapping (original → canonical)" }
                table {
                    @for (original, canonical) in header_map {
                        tr { td { (original) } td { (canonical) } }
                    }
                }
            }
            (issues_section(&report.issues_summary))
            (notes_section(&report.ai_feedback))
            (links_section(config, response, format))
        },
    )
}

pub fn stock_result(
    config: &ClientConfig,
    response: &CleanResponse<StockReport>,
    format: ExportFormat,
) -> String {
    let profile = &response.report.profile;
    layout(
        "AI-in-a-Box • Stock",
        html! {
            div class="ok" { "Stock cleaned ✅" }
            p {
                "Rows in: " (profile.rows_in)
                " | Rows out: " (profile.rows_out)
                " | Low stock: " (profile.low_stock)
                " | Expiring soon: " (profile.expiring_soon)
                " | Expired: " (profile.expired)
            }
            (preview_section(&response.report.preview))
            (issues_section(&response.report.issues_summary))
            (notes_section(&response.report.ai_feedback))
            (links_section(config, response, format))
        },
    )
}

pub fn local_preview_page(api_url: &str, preview: &LocalPreview) -> String {
    layout(
        "AI-in-a-Box • Local preview",
        html! {
            div class="warn" { "⚠️ API offline (" (api_url) "). Local preview only." }
            h2 { "Uploaded (first " (preview.rows.len()) " rows)" }
            table {
                tr {
                    @for col in &preview.columns {
                        td { b { (col) } }
                    }
                }
                @for row in &preview.rows {
                    tr {
                        @for cell in row {
                            td { (cell) }
                        }
                    }
                }
            }
        },
    )
}

pub fn error_page(message: &str, suggestion: Option<&str>) -> String {
    layout(
        "AI-in-a-Box • Error",
        html! {
            div class="error" { "❌ " (message) }
            @if let Some(suggestion) = suggestion {
                p { "💡 " (suggestion) }
            }
        },
    )
}
