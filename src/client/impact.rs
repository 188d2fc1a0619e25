use crate::domain::model::InvoiceProfile;
use std::fmt;

pub const DEFAULT_HOURLY_RATE: f64 = 25.0;

/// 每個修正預估節省的人工分鐘數
pub const MINUTES_PER_FIX: f64 = 0.5;

/// Rough manual effort avoided by a cleaning run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactEstimate {
    pub minutes_saved: f64,
    pub cost_saved: f64,
    pub rows_in: usize,
    pub rows_out: usize,
}

impl ImpactEstimate {
    pub fn from_profile(profile: &InvoiceProfile, hourly_rate: f64) -> Self {
        let fixes = profile.duplicates_removed + profile.errors_fixed;
        let minutes_saved = fixes as f64 * MINUTES_PER_FIX;
        Self {
            minutes_saved,
            cost_saved: minutes_saved / 60.0 * hourly_rate,
            rows_in: profile.rows_in,
            rows_out: profile.rows_out,
        }
    }
}

impl fmt::Display for ImpactEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Minutes saved (est.): {:.1} | Estimated cost saved: ${:.2} | Rows processed: {} → {}",
            self.minutes_saved, self.cost_saved, self.rows_in, self.rows_out
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate() {
        let profile = InvoiceProfile {
            rows_in: 4,
            rows_out: 3,
            duplicates_removed: 1,
            errors_fixed: 5,
            currency_detected: Some("USD".to_string()),
        };
        let impact = ImpactEstimate::from_profile(&profile, DEFAULT_HOURLY_RATE);
        assert_eq!(impact.minutes_saved, 3.0);
        assert!((impact.cost_saved - 1.25).abs() < 1e-9);
        assert_eq!(
            impact.to_string(),
            "Minutes saved (est.): 3.0 | Estimated cost saved: $1.25 | Rows processed: 4 → 3"
        );
    }

    #[test]
    fn test_nothing_fixed() {
        let impact = ImpactEstimate::from_profile(&InvoiceProfile::default(), 40.0);
        assert_eq!(impact.minutes_saved, 0.0);
        assert_eq!(impact.cost_saved, 0.0);
    }
}
