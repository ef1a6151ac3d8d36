use serde::{Deserialize, Serialize};

use crate::domain::activity::UserId;
use crate::domain::product::CategoryId;

/// Fixed ordinal apparel scale used when sizes are not numeric.
pub const ORDINAL_SIZES: [&str; 8] = ["XXS", "XS", "S", "M", "L", "XL", "XXL", "XXXL"];

/// Explicit opt-in preference; the highest-priority size-recommender input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePreference {
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub size: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeRecommendation {
    pub recommended_size: Option<String>,
    pub confidence: f64,
    pub message: String,
}

impl SizeRecommendation {
    pub fn none(message: impl Into<String>) -> Self {
        Self { recommended_size: None, confidence: 0.0, message: message.into() }
    }
}

fn ordinal_index(size: &str) -> Option<usize> {
    let normalized = size.trim().to_ascii_uppercase();
    ORDINAL_SIZES.iter().position(|candidate| *candidate == normalized)
}

/// Pick the available size closest to `target`.
///
/// Exact match wins. Otherwise numeric targets match numeric candidates by
/// absolute difference (ties to the lowest value), ordinal targets match
/// scale candidates by index distance (ties size up), and anything else
/// falls back to the first available size.
pub fn closest_size(target: &str, available: &[String]) -> Option<String> {
    if available.is_empty() {
        return None;
    }

    if available.iter().any(|size| size == target) {
        return Some(target.to_string());
    }

    if let Ok(target_value) = target.trim().parse::<f64>() {
        let mut numeric: Vec<(f64, &String)> = available
            .iter()
            .filter_map(|size| size.trim().parse::<f64>().ok().map(|value| (value, size)))
            .collect();
        if !numeric.is_empty() {
            numeric.sort_by(|a, b| {
                let distance_a = (a.0 - target_value).abs();
                let distance_b = (b.0 - target_value).abs();
                distance_a.total_cmp(&distance_b).then(a.0.total_cmp(&b.0))
            });
            return Some(numeric[0].1.clone());
        }
    }

    if let Some(target_index) = ordinal_index(target) {
        let mut ordinal: Vec<(usize, &String)> = available
            .iter()
            .filter_map(|size| ordinal_index(size).map(|index| (index, size)))
            .collect();
        if !ordinal.is_empty() {
            ordinal.sort_by_key(|(index, _)| {
                (index.abs_diff(target_index), std::cmp::Reverse(*index))
            });
            return Some(ordinal[0].1.clone());
        }
    }

    available.first().cloned()
}

#[cfg(test)]
mod tests {
    use super::closest_size;

    fn sizes(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn exact_match_returns_input_unchanged() {
        assert_eq!(closest_size("M", &sizes(&["S", "M", "L"])), Some("M".to_string()));
        assert_eq!(closest_size("42", &sizes(&["40", "42"])), Some("42".to_string()));
    }

    #[test]
    fn ordinal_distance_picks_nearest_scale_entry() {
        // L beats XL on distance and beats S on the size-up tie-break.
        assert_eq!(closest_size("M", &sizes(&["S", "L", "XL"])), Some("L".to_string()));
    }

    #[test]
    fn numeric_tie_breaks_to_lowest_value() {
        // 40 and 42 are both one away from 41.
        assert_eq!(closest_size("41", &sizes(&["38", "40", "42", "44"])), Some("40".to_string()));
    }

    #[test]
    fn ordinal_ties_size_up() {
        assert_eq!(closest_size("M", &sizes(&["S", "L"])), Some("L".to_string()));
    }

    #[test]
    fn mixed_lists_only_consider_comparable_candidates() {
        // Numeric target ignores ordinal entries.
        assert_eq!(closest_size("41", &sizes(&["M", "40", "L"])), Some("40".to_string()));
        // Ordinal target ignores numeric entries.
        assert_eq!(closest_size("XL", &sizes(&["40", "L", "42"])), Some("L".to_string()));
    }

    #[test]
    fn incomparable_target_falls_back_to_first_available() {
        assert_eq!(
            closest_size("one-size", &sizes(&["small-ish", "large-ish"])),
            Some("small-ish".to_string())
        );
    }

    #[test]
    fn empty_availability_yields_nothing() {
        assert_eq!(closest_size("M", &[]), None);
    }

    #[test]
    fn deterministic_for_repeated_calls() {
        let available = sizes(&["38", "40", "42", "44"]);
        let first = closest_size("41", &available);
        for _ in 0..10 {
            assert_eq!(closest_size("41", &available), first);
        }
    }
}
