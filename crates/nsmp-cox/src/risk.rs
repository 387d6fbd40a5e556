//! Risk groups from tertile thresholds of the partial hazard.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discretized recurrence risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskGroup {
    Low,
    Medium,
    High,
}

impl RiskGroup {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tertile cut points of the training partial hazard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub q1: f64,
    pub q2: f64,
}

impl RiskThresholds {
    /// Classifies a partial-hazard score. Upper bounds are inclusive.
    #[must_use]
    pub fn classify(&self, score: f64) -> RiskGroup {
        risk_group_from_score(score, self)
    }
}

/// `score <= q1` is Low, `score <= q2` is Medium, anything above is High.
#[must_use]
pub fn risk_group_from_score(score: f64, thresholds: &RiskThresholds) -> RiskGroup {
    if score <= thresholds.q1 {
        RiskGroup::Low
    } else if score <= thresholds.q2 {
        RiskGroup::Medium
    } else {
        RiskGroup::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: RiskThresholds = RiskThresholds { q1: 0.8, q2: 1.3 };

    #[test]
    fn test_boundaries_fall_to_lower_group() {
        assert_eq!(THRESHOLDS.classify(0.8), RiskGroup::Low);
        assert_eq!(THRESHOLDS.classify(1.3), RiskGroup::Medium);
        assert_eq!(THRESHOLDS.classify(0.800_000_1), RiskGroup::Medium);
        assert_eq!(THRESHOLDS.classify(1.300_000_1), RiskGroup::High);
    }

    #[test]
    fn test_monotonic_in_score() {
        let scores = [0.0, 0.1, 0.8, 0.9, 1.3, 1.31, 5.0, 100.0];
        let groups: Vec<_> = scores.iter().map(|&s| THRESHOLDS.classify(s)).collect();
        assert!(groups.is_sorted());
    }

    #[test]
    fn test_serializes_as_name() {
        assert_eq!(serde_json::to_string(&RiskGroup::Medium).unwrap(), r#""Medium""#);
    }
}
