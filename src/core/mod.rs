pub mod engine;
pub mod fuzzy;
pub mod invoice;
pub mod normalize;
pub mod stock;
pub mod synonyms;

pub use crate::domain::model::{Cell, CleanOutcome, Table};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;

use crate::domain::model::IssuesSummary;
use synonyms::ISSUES_COLUMN;

/// Counts each issue tag found in the `__issues` column.
pub fn count_issues(table: &Table) -> IssuesSummary {
    let mut summary = IssuesSummary::new();
    let Some(idx) = table.column_index(ISSUES_COLUMN) else {
        return summary;
    };
    for row in &table.rows {
        if let Cell::Text(tags) = &row[idx] {
            for tag in tags.split('|').filter(|t| !t.is_empty()) {
                *summary.entry(tag.to_string()).or_insert(0) += 1;
            }
        }
    }
    summary
}
