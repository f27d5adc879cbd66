use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::document::DocumentType;

/// Immutable reference configuration. Multiple rules per document type define
/// the ordered approval levels; the engine never writes these rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRule {
    pub id: String,
    pub document_type: DocumentType,
    pub min_amount: Decimal,
    /// None means no upper bound.
    pub max_amount: Option<Decimal>,
    pub approver_role: String,
    pub sla_hours: i64,
}

impl WorkflowRule {
    pub fn matches_amount(&self, amount: Decimal) -> bool {
        if amount < self.min_amount {
            return false;
        }
        match self.max_amount {
            Some(max_amount) => amount <= max_amount,
            None => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationScope {
    All,
    Document(DocumentType),
}

impl DelegationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Document(document_type) => document_type.as_str(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        DocumentType::parse(value).map(Self::Document)
    }

    pub fn covers(&self, document_type: DocumentType) -> bool {
        match self {
            Self::All => true,
            Self::Document(scoped) => *scoped == document_type,
        }
    }
}

/// "delegate may act as delegator for the stated scope during
/// [starts_on, ends_on]". Bounds are calendar days, inclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRule {
    pub id: String,
    pub delegator_id: String,
    pub delegate_id: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub scope: DelegationScope,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{DelegationScope, WorkflowRule};
    use crate::domain::document::DocumentType;

    fn rule(min: i64, max: Option<i64>) -> WorkflowRule {
        WorkflowRule {
            id: "wr-1".to_string(),
            document_type: DocumentType::MaterialIssue,
            min_amount: Decimal::new(min, 0),
            max_amount: max.map(|value| Decimal::new(value, 0)),
            approver_role: "supervisor".to_string(),
            sla_hours: 24,
        }
    }

    #[test]
    fn amount_band_is_inclusive_on_both_ends() {
        let bounded = rule(2_000, Some(10_000));
        assert!(bounded.matches_amount(Decimal::new(2_000, 0)));
        assert!(bounded.matches_amount(Decimal::new(10_000, 0)));
        assert!(!bounded.matches_amount(Decimal::new(1_999, 0)));
        assert!(!bounded.matches_amount(Decimal::new(10_001, 0)));
    }

    #[test]
    fn open_upper_bound_matches_any_amount_above_minimum() {
        let open = rule(10_000, None);
        assert!(open.matches_amount(Decimal::new(5_000_000, 0)));
        assert!(!open.matches_amount(Decimal::new(9_999, 0)));
    }

    #[test]
    fn scope_round_trips_and_covers_expected_types() {
        assert_eq!(DelegationScope::parse("all"), Some(DelegationScope::All));
        assert_eq!(
            DelegationScope::parse("job_order"),
            Some(DelegationScope::Document(DocumentType::JobOrder))
        );
        assert_eq!(DelegationScope::parse("unknown"), None);

        assert!(DelegationScope::All.covers(DocumentType::PurchaseRequest));
        let scoped = DelegationScope::Document(DocumentType::JobOrder);
        assert!(scoped.covers(DocumentType::JobOrder));
        assert!(!scoped.covers(DocumentType::MaterialIssue));
    }
}
