use crate::sampler::Counts;
use std::collections::{BTreeMap, BTreeSet};

/// Counts normalised to probabilities.
pub fn normalize(counts: &Counts) -> BTreeMap<String, f64> {
    let total: u64 = counts.values().map(|&c| u64::from(c)).sum();
    if total == 0 {
        return BTreeMap::new();
    }
    counts
        .iter()
        .map(|(k, &v)| (k.clone(), f64::from(v) / total as f64))
        .collect()
}

/// Hellinger distance between two count dictionaries: sqrt(sum (sqrt p - sqrt q)^2) / sqrt 2.
pub fn hellinger_distance(a: &Counts, b: &Counts) -> f64 {
    let p = normalize(a);
    let q = normalize(b);
    let keys: BTreeSet<&String> = p.keys().chain(q.keys()).collect();
    let total: f64 = keys
        .into_iter()
        .map(|k| {
            let x = p.get(k).copied().unwrap_or(0.0).sqrt();
            let y = q.get(k).copied().unwrap_or(0.0).sqrt();
            (x - y).powi(2)
        })
        .sum();
    total.sqrt() / std::f64::consts::SQRT_2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u32)]) -> Counts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_identical_distributions() {
        let a = counts(&[("00", 500), ("11", 500)]);
        let b = counts(&[("00", 10), ("11", 10)]);
        assert!(hellinger_distance(&a, &b).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_distributions() {
        let a = counts(&[("00", 3)]);
        let b = counts(&[("11", 7)]);
        assert!((hellinger_distance(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_overlap() {
        let a = counts(&[("0", 1), ("1", 1)]);
        let b = counts(&[("0", 1)]);
        // sqrt((sqrt(.5) - 1)^2 + .5) / sqrt 2
        let expected = (((0.5f64).sqrt() - 1.0).powi(2) + 0.5).sqrt() / 2f64.sqrt();
        assert!((hellinger_distance(&a, &b) - expected).abs() < 1e-12);
    }
}
