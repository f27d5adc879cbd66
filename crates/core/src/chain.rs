use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::document::DocumentType;
use crate::domain::rule::WorkflowRule;

/// One position in a resolved approval chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLevel {
    pub position: u32,
    pub approver_role: String,
    pub sla_hours: i64,
}

/// Select every rule matching the document type and amount band, order by
/// `min_amount` ascending, and assign positions 1..N. An empty chain is a
/// valid outcome; callers decide what "no levels configured" means.
pub fn resolve(
    rules: &[WorkflowRule],
    document_type: DocumentType,
    amount: Decimal,
) -> Vec<ChainLevel> {
    let mut matching: Vec<&WorkflowRule> = rules
        .iter()
        .filter(|rule| rule.document_type == document_type && rule.matches_amount(amount))
        .collect();
    matching.sort_by(|left, right| {
        left.min_amount.cmp(&right.min_amount).then_with(|| left.id.cmp(&right.id))
    });

    matching
        .into_iter()
        .enumerate()
        .map(|(index, rule)| ChainLevel {
            position: index as u32 + 1,
            approver_role: rule.approver_role.clone(),
            sla_hours: rule.sla_hours,
        })
        .collect()
}

/// SLA hours for a mid-chain advance: the rule for that role with the highest
/// `min_amount` wins when a role appears in several bands.
pub fn sla_hours_for_role(
    rules: &[WorkflowRule],
    document_type: DocumentType,
    approver_role: &str,
) -> Option<i64> {
    rules
        .iter()
        .filter(|rule| {
            rule.document_type == document_type
                && normalize_role(&rule.approver_role) == normalize_role(approver_role)
        })
        .max_by(|left, right| left.min_amount.cmp(&right.min_amount))
        .map(|rule| rule.sla_hours)
}

pub(crate) fn normalize_role(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
