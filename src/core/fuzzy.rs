/// Similarity of two strings in `0.0..=100.0`, based on the indel distance
/// (insertions and deletions only). Equal strings score 100.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(&a, &b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // 單列 DP
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_empty() {
        assert_eq!(ratio("Acme", "Acme"), 100.0);
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("Acme", ""), 0.0);
    }

    #[test]
    fn test_partial_similarity() {
        // LCS("Acme Inc", "Acme Inc.") = 8 -> 200 * 8 / 17
        let r = ratio("Acme Inc", "Acme Inc.");
        assert!((r - 94.117).abs() < 0.01, "got {}", r);
        assert!(ratio("Acme", "Delta") < 50.0);
    }

    #[test]
    fn test_is_symmetric() {
        assert_eq!(ratio("kitten", "sitting"), ratio("sitting", "kitten"));
    }
}
