use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;

pub const SAMPLE_INVOICES: &str = "\
Invoice No,Date,Due,Client,Item,Qty,Unit Price,TVA,Currency,Total
INV-001,2025/09/01,2025/09/30,Acme,Widgets,2,50,0.2,USD,120
INV-001,2025/09/01,2025/09/30,Acme,Widgets,2,50,0.2,USD,120
INV-002,09-02-2025,2025-09-10,Delta,Gadgets,-1,100,0.2,USD,100
INV-003,2025-09-03,2025-08-30,Gamma,Brackets,3,25,0.15,USD,86.25
";

pub const SAMPLE_STOCK: &str = "\
SKU,Name,Supplier,Qty,Reorder Point,Expiry Date
SKU-1,Protein Bar,Acme,5,10,2025-10-05
SKU-2,Yogurt Cup,Delta,25,10,2025-10-15
SKU-3,Olive Oil,Gamma,0,5,2025-09-28
SKU-4,Granola,Beta,-2,5,2025-11-20
SKU-5,Cheese,Acme,7,7,2025-10-01
";

fn csv_attachment(file_name: &str, body: &'static str) -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
}

pub async fn invoice() -> impl IntoResponse {
    csv_attachment("sample_invoices.csv", SAMPLE_INVOICES)
}

pub async fn stock() -> impl IntoResponse {
    csv_attachment("sample_stock.csv", SAMPLE_STOCK)
}
