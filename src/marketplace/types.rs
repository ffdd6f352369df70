//! Wire types for the marketplace requester API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// System qualification type for a worker's count of approved HITs.
pub const QUAL_APPROVED_HITS: &str = "00000000000000000040";
/// System qualification type for a worker's locale.
pub const QUAL_LOCALE: &str = "00000000000000000071";
/// System qualification type for a worker's approval percentage.
pub const QUAL_PERCENT_APPROVED: &str = "000000000000000000L0";

/// Lifecycle state of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    /// Submitted by the worker, awaiting review.
    Submitted,
    /// Approved; the worker has been paid.
    Approved,
    /// Rejected with feedback.
    Rejected,
}

impl AssignmentStatus {
    /// All reviewable states, in the order the listing API expects them.
    pub const ALL: [AssignmentStatus; 3] = [
        AssignmentStatus::Approved,
        AssignmentStatus::Submitted,
        AssignmentStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Submitted => "Submitted",
            AssignmentStatus::Approved => "Approved",
            AssignmentStatus::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One worker's attempt at a HIT, as returned by the marketplace.
///
/// `answer` is the raw XML answer envelope; see [`crate::answer`] for
/// extracting the embedded JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub assignment_id: String,
    pub hit_id: String,
    pub worker_id: String,
    pub status: AssignmentStatus,
    pub answer: String,
    pub submit_time: DateTime<Utc>,
}

/// A launched HIT as returned by the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    pub hit_id: String,
    pub title: String,
    pub max_assignments: u32,
    pub creation_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

/// Comparison operator in a qualification requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    GreaterThanOrEqualTo,
    EqualTo,
}

/// A worker locale constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locale {
    pub country: String,
}

/// A filter restricting which workers may accept a HIT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationRequirement {
    pub qualification_type_id: String,
    pub comparator: Comparator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integer_values: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locale_values: Vec<Locale>,
}

impl QualificationRequirement {
    /// Require at least `count` previously approved HITs.
    pub fn approved_hits_at_least(count: u32) -> Self {
        Self {
            qualification_type_id: QUAL_APPROVED_HITS.to_string(),
            comparator: Comparator::GreaterThanOrEqualTo,
            integer_values: vec![count],
            locale_values: Vec::new(),
        }
    }

    /// Require the worker's locale to match `country`.
    pub fn locale_equals(country: impl Into<String>) -> Self {
        Self {
            qualification_type_id: QUAL_LOCALE.to_string(),
            comparator: Comparator::EqualTo,
            integer_values: Vec::new(),
            locale_values: vec![Locale {
                country: country.into(),
            }],
        }
    }

    /// Require an approval rate of at least `percent`.
    pub fn approval_rate_at_least(percent: u32) -> Self {
        Self {
            qualification_type_id: QUAL_PERCENT_APPROVED.to_string(),
            comparator: Comparator::GreaterThanOrEqualTo,
            integer_values: vec![percent],
            locale_values: Vec::new(),
        }
    }
}

/// Everything needed to create a HIT.
///
/// `question` is the fully rendered question body: HTML wrapped in the
/// marketplace's `HTMLQuestion` XML envelope.
#[derive(Debug, Clone, Serialize)]
pub struct HitSpec {
    pub title: String,
    pub description: String,
    pub keywords: String,
    /// Reward per assignment as a decimal string (e.g. "1.00").
    pub reward: String,
    pub max_assignments: u32,
    pub lifetime_secs: u64,
    pub assignment_duration_secs: u64,
    pub qualification_requirements: Vec<QualificationRequirement>,
    pub question: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str_round_trip() {
        for status in AssignmentStatus::ALL {
            assert_eq!(status.to_string(), status.as_str());
        }
        assert_eq!(AssignmentStatus::Submitted.as_str(), "Submitted");
    }

    #[test]
    fn test_qualification_constructors_use_system_ids() {
        let q = QualificationRequirement::approved_hits_at_least(10000);
        assert_eq!(q.qualification_type_id, QUAL_APPROVED_HITS);
        assert_eq!(q.integer_values, vec![10000]);

        let q = QualificationRequirement::locale_equals("US");
        assert_eq!(q.qualification_type_id, QUAL_LOCALE);
        assert_eq!(q.locale_values[0].country, "US");

        let q = QualificationRequirement::approval_rate_at_least(95);
        assert_eq!(q.qualification_type_id, QUAL_PERCENT_APPROVED);
        assert_eq!(q.comparator, Comparator::GreaterThanOrEqualTo);
    }

    #[test]
    fn test_qualification_serialization_skips_empty_values() {
        let q = QualificationRequirement::locale_equals("US");
        let json = serde_json::to_string(&q).expect("serialization should succeed");
        assert!(json.contains("locale_values"));
        assert!(!json.contains("integer_values"));
    }
}
