//! Header vocabularies for the supported dataset kinds. All keys are
//! normalized headers (see [`norm_header`](crate::core::normalize::norm_header)).

use crate::core::normalize::norm_header;
use std::collections::HashSet;

pub const INVOICE_HEADER_SYNONYMS: &[(&str, &str)] = &[
    // invoice id
    ("invoice no", "invoice_id"),
    ("invoice number", "invoice_id"),
    ("invoice", "invoice_id"),
    ("invoice#", "invoice_id"),
    ("invoice_num", "invoice_id"),
    ("invid", "invoice_id"),
    ("inv_id", "invoice_id"),
    ("id facture", "invoice_id"),
    // dates
    ("date", "issue_date"),
    ("invoice date", "issue_date"),
    ("due", "due_date"),
    ("due date", "due_date"),
    // customer
    ("client", "customer_name"),
    ("client name", "customer_name"),
    ("customer", "customer_name"),
    ("customer name", "customer_name"),
    ("customername", "customer_name"),
    ("company", "customer_name"),
    ("customer id", "customer_id"),
    // line description
    ("item", "item_description"),
    ("description", "item_description"),
    // qty / price / totals
    ("qty", "quantity"),
    ("quantity", "quantity"),
    ("price", "unit_price"),
    ("unit price", "unit_price"),
    ("line total", "line_total"),
    ("subtotal", "total_before_tax"),
    ("sub total", "total_before_tax"),
    ("ht", "total_before_tax"),
    ("grand total", "total_amount"),
    ("ttc", "total_amount"),
    ("amount", "total_amount"),
    ("total", "total_amount"),
    ("tax", "tax_amount"),
    ("tva", "tax_amount"),
    ("tax rate", "tax_rate"),
    // misc
    ("currency", "currency"),
    ("status", "status"),
];

pub const INVOICE_CANONICAL_ORDER: &[&str] = &[
    "invoice_id",
    "issue_date",
    "due_date",
    "customer_name",
    "customer_id",
    "item_description",
    "quantity",
    "unit_price",
    "line_total",
    "currency",
    "tax_rate",
    "tax_amount",
    "total_before_tax",
    "total_amount",
    "status",
];

pub const STOCK_HEADER_SYNONYMS: &[(&str, &str)] = &[
    ("sku", "sku"),
    ("product", "name"),
    ("product name", "name"),
    ("name", "name"),
    ("item", "name"),
    ("qty", "qty_on_hand"),
    ("quantity", "qty_on_hand"),
    ("qty_on_hand", "qty_on_hand"),
    ("on hand", "qty_on_hand"),
    ("onhand", "qty_on_hand"),
    ("reorder_point", "reorder_point"),
    ("reorder point", "reorder_point"),
    ("min qty", "reorder_point"),
    ("minimum qty", "reorder_point"),
    ("expiry", "expiry_date"),
    ("expiry date", "expiry_date"),
    ("expiration", "expiry_date"),
    ("expiration date", "expiry_date"),
    ("expire date", "expiry_date"),
    ("best before", "expiry_date"),
    ("bbd", "expiry_date"),
    ("supplier", "supplier"),
    ("vendor", "supplier"),
];

pub const STOCK_CANONICAL_ORDER: &[&str] = &[
    "sku",
    "name",
    "supplier",
    "qty_on_hand",
    "reorder_point",
    "expiry_date",
];

/// Column holding the `|`-joined issue tags in cleaned output.
pub const ISSUES_COLUMN: &str = "__issues";

/// Maps one raw header to its canonical name, or to a snake-ish fallback.
pub fn canonical_header(synonyms: &[(&str, &str)], raw: &str) -> String {
    let key = norm_header(raw);
    synonyms
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
        .unwrap_or_else(|| key.replace(' ', "_"))
}

/// Maps every header, suffixing later collisions with `_2`, `_3`, ...
pub fn map_headers(synonyms: &[(&str, &str)], headers: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .iter()
        .map(|raw| {
            let base = canonical_header(synonyms, raw);
            let mut name = base.clone();
            let mut n = 2;
            while seen.contains(&name) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

/// Canonical columns first, then the rest in input order, then `__issues`.
pub fn output_order(canonical: &[&str], columns: &[String]) -> Vec<String> {
    let mut order: Vec<String> = canonical
        .iter()
        .filter(|c| columns.iter().any(|col| col == *c))
        .map(|c| c.to_string())
        .collect();
    order.extend(
        columns
            .iter()
            .filter(|c| !canonical.contains(&c.as_str()) && c.as_str() != ISSUES_COLUMN)
            .cloned(),
    );
    order.push(ISSUES_COLUMN.to_string());
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_header_lookup() {
        assert_eq!(canonical_header(INVOICE_HEADER_SYNONYMS, "Invoice No"), "invoice_id");
        assert_eq!(canonical_header(INVOICE_HEADER_SYNONYMS, " Unit  Price "), "unit_price");
        assert_eq!(canonical_header(INVOICE_HEADER_SYNONYMS, "Sales Rep"), "sales_rep");
        assert_eq!(canonical_header(STOCK_HEADER_SYNONYMS, "Best Before"), "expiry_date");
        assert_eq!(canonical_header(STOCK_HEADER_SYNONYMS, "Item"), "name");
    }

    #[test]
    fn test_map_headers_suffixes_collisions() {
        let headers = vec![
            "Total".to_string(),
            "Amount".to_string(),
            "Grand Total".to_string(),
        ];
        assert_eq!(
            map_headers(INVOICE_HEADER_SYNONYMS, &headers),
            vec!["total_amount", "total_amount_2", "total_amount_3"]
        );
    }

    #[test]
    fn test_output_order() {
        let columns = vec![
            "notes".to_string(),
            ISSUES_COLUMN.to_string(),
            "quantity".to_string(),
            "invoice_id".to_string(),
        ];
        assert_eq!(
            output_order(INVOICE_CANONICAL_ORDER, &columns),
            vec!["invoice_id", "quantity", "notes", ISSUES_COLUMN]
        );
    }
}
