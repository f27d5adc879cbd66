use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::chain::normalize_role;
use crate::domain::actor::{Actor, ADMIN_ROLE};
use crate::domain::document::DocumentType;
use crate::domain::rule::DelegationRule;

/// A delegation row paired with the delegator it borrows authority from.
/// Loaded fresh on every authorization check; delegations are time-sensitive
/// and must never be cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationGrant {
    pub rule: DelegationRule,
    pub delegator: Actor,
}

/// How an actor came to be allowed to act for a required role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Authorization {
    Admin,
    Direct,
    Delegated { delegator_id: String },
}

/// Decide whether `actor` may act for `required_role` on `document_type` as
/// of the given calendar day. Fails closed: a missing or inactive actor is
/// never authorized. Multiple qualifying delegations are equivalent; the
/// first one found wins.
pub fn authorize(
    actor: Option<&Actor>,
    required_role: &str,
    document_type: DocumentType,
    grants: &[DelegationGrant],
    as_of_day: NaiveDate,
) -> Option<Authorization> {
    let actor = actor?;
    if !actor.is_active {
        return None;
    }

    let actor_role = normalize_role(&actor.role);
    let required = normalize_role(required_role);
    if actor_role == ADMIN_ROLE {
        return Some(Authorization::Admin);
    }
    if actor_role == required {
        return Some(Authorization::Direct);
    }

    grants
        .iter()
        .find(|grant| {
            grant.rule.is_active
                && grant.rule.delegate_id == actor.id
                && grant.rule.starts_on <= as_of_day
                && as_of_day <= grant.rule.ends_on
                && grant.rule.scope.covers(document_type)
                && grant.delegator.is_active
                && normalize_role(&grant.delegator.role) == required
        })
        .map(|grant| Authorization::Delegated { delegator_id: grant.delegator.id.clone() })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{authorize, Authorization, DelegationGrant};
    use crate::domain::actor::Actor;
    use crate::domain::document::DocumentType;
    use crate::domain::rule::{DelegationRule, DelegationScope};

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn actor(id: &str, role: &str, is_active: bool) -> Actor {
        Actor { id: id.to_string(), role: role.to_string(), is_active }
    }

    fn grant_for(delegate: &str, delegator: Actor, scope: DelegationScope) -> DelegationGrant {
        DelegationGrant {
            rule: DelegationRule {
                id: "dg-1".to_string(),
                delegator_id: delegator.id.clone(),
                delegate_id: delegate.to_string(),
                starts_on: day(2026, 3, 1),
                ends_on: day(2026, 3, 31),
                scope,
                is_active: true,
            },
            delegator,
        }
    }

    #[test]
    fn missing_or_inactive_actor_fails_closed() {
        assert_eq!(authorize(None, "manager", DocumentType::JobOrder, &[], day(2026, 3, 10)), None);

        let inactive = actor("u-1", "manager", false);
        assert_eq!(
            authorize(Some(&inactive), "manager", DocumentType::JobOrder, &[], day(2026, 3, 10)),
            None
        );
    }

    #[test]
    fn admin_is_authorized_for_any_required_role() {
        let admin = actor("u-admin", "admin", true);
        assert_eq!(
            authorize(Some(&admin), "operations_head", DocumentType::MaterialIssue, &[], day(2026, 3, 10)),
            Some(Authorization::Admin)
        );
    }

    #[test]
    fn direct_role_match_ignores_case_and_whitespace() {
        let manager = actor("u-1", "Manager", true);
        assert_eq!(
            authorize(Some(&manager), " manager ", DocumentType::JobOrder, &[], day(2026, 3, 10)),
            Some(Authorization::Direct)
        );
    }

    #[test]
    fn active_scoped_delegation_authorizes_within_its_window() {
        let delegate = actor("u-2", "storekeeper", true);
        let grant = grant_for("u-2", actor("u-1", "manager", true), DelegationScope::All);

        let result = authorize(
            Some(&delegate),
            "manager",
            DocumentType::MaterialIssue,
            std::slice::from_ref(&grant),
            day(2026, 3, 10),
        );
        assert_eq!(result, Some(Authorization::Delegated { delegator_id: "u-1".to_string() }));
    }

    #[test]
    fn delegation_window_bounds_are_inclusive_calendar_days() {
        let delegate = actor("u-2", "storekeeper", true);
        let grant = grant_for("u-2", actor("u-1", "manager", true), DelegationScope::All);
        let grants = std::slice::from_ref(&grant);

        for boundary in [day(2026, 3, 1), day(2026, 3, 31)] {
            assert!(
                authorize(Some(&delegate), "manager", DocumentType::JobOrder, grants, boundary)
                    .is_some()
            );
        }
        assert!(authorize(Some(&delegate), "manager", DocumentType::JobOrder, grants, day(2026, 2, 28))
            .is_none());
        assert!(authorize(Some(&delegate), "manager", DocumentType::JobOrder, grants, day(2026, 4, 1))
            .is_none());
    }

    #[test]
    fn delegation_scoped_to_another_document_type_does_not_apply() {
        let delegate = actor("u-2", "storekeeper", true);
        let grant = grant_for(
            "u-2",
            actor("u-1", "manager", true),
            DelegationScope::Document(DocumentType::JobOrder),
        );

        assert!(authorize(
            Some(&delegate),
            "manager",
            DocumentType::MaterialIssue,
            std::slice::from_ref(&grant),
            day(2026, 3, 10),
        )
        .is_none());
        assert!(authorize(
            Some(&delegate),
            "manager",
            DocumentType::JobOrder,
            std::slice::from_ref(&grant),
            day(2026, 3, 10),
        )
        .is_some());
    }

    #[test]
    fn inactive_delegator_invalidates_the_grant() {
        let delegate = actor("u-2", "storekeeper", true);
        let grant = grant_for("u-2", actor("u-1", "manager", false), DelegationScope::All);

        assert!(authorize(
            Some(&delegate),
            "manager",
            DocumentType::JobOrder,
            std::slice::from_ref(&grant),
            day(2026, 3, 10),
        )
        .is_none());
    }

    #[test]
    fn activation_flip_is_monotonic_with_no_other_input_change() {
        let delegate = actor("u-2", "storekeeper", true);
        let mut grant = grant_for("u-2", actor("u-1", "manager", true), DelegationScope::All);
        grant.rule.is_active = false;

        let before = authorize(
            Some(&delegate),
            "manager",
            DocumentType::JobOrder,
            std::slice::from_ref(&grant),
            day(2026, 3, 10),
        );
        assert_eq!(before, None);

        grant.rule.is_active = true;
        let after = authorize(
            Some(&delegate),
            "manager",
            DocumentType::JobOrder,
            std::slice::from_ref(&grant),
            day(2026, 3, 10),
        );
        assert_eq!(after, Some(Authorization::Delegated { delegator_id: "u-1".to_string() }));
    }

    #[test]
    fn delegation_for_a_different_delegate_does_not_leak() {
        let delegate = actor("u-3", "storekeeper", true);
        let grant = grant_for("u-2", actor("u-1", "manager", true), DelegationScope::All);

        assert!(authorize(
            Some(&delegate),
            "manager",
            DocumentType::JobOrder,
            std::slice::from_ref(&grant),
            day(2026, 3, 10),
        )
        .is_none());
    }
}
