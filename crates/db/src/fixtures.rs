use chrono::Utc;
use sqlx::Row;

use crate::repositories::RepositoryError;
use crate::DbPool;

/// Deterministic reference dataset for integration tests and local
/// exploration: the three document types with their approval bands, a small
/// cast of actors, one standing delegation, and one draft document per type.
/// Seeding is idempotent.
struct SeedRule {
    id: &'static str,
    document_type: &'static str,
    min_amount: &'static str,
    max_amount: Option<&'static str>,
    approver_role: &'static str,
    sla_hours: i64,
}

const SEED_RULES: &[SeedRule] = &[
    SeedRule {
        id: "wr-mi-1",
        document_type: "material_issue",
        min_amount: "0",
        max_amount: Some("2000"),
        approver_role: "supervisor",
        sla_hours: 24,
    },
    SeedRule {
        id: "wr-mi-2",
        document_type: "material_issue",
        min_amount: "2000",
        max_amount: Some("10000"),
        approver_role: "manager",
        sla_hours: 48,
    },
    SeedRule {
        id: "wr-mi-3",
        document_type: "material_issue",
        min_amount: "10000",
        max_amount: None,
        approver_role: "operations_head",
        sla_hours: 72,
    },
    SeedRule {
        id: "wr-jo-1",
        document_type: "job_order",
        min_amount: "0",
        max_amount: None,
        approver_role: "planner",
        sla_hours: 24,
    },
    SeedRule {
        id: "wr-pr-1",
        document_type: "purchase_request",
        min_amount: "0",
        max_amount: Some("5000"),
        approver_role: "procurement_officer",
        sla_hours: 24,
    },
    SeedRule {
        id: "wr-pr-2",
        document_type: "purchase_request",
        min_amount: "5000",
        max_amount: None,
        approver_role: "finance_manager",
        sla_hours: 48,
    },
];

const SEED_ACTORS: &[(&str, &str, i64)] = &[
    ("u-admin", "admin", 1),
    ("u-sup", "supervisor", 1),
    ("u-mgr", "manager", 1),
    ("u-ops", "operations_head", 1),
    ("u-plan", "planner", 1),
    ("u-proc", "procurement_officer", 1),
    ("u-fin", "finance_manager", 1),
    ("u-store", "storekeeper", 1),
];

const SEED_DOCUMENTS: &[(&str, &str)] = &[
    ("material_issue", "MI-1001"),
    ("job_order", "JO-1001"),
    ("purchase_request", "PR-1001"),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub rules: usize,
    pub actors: usize,
    pub delegations: usize,
    pub documents: usize,
}

pub async fn seed_reference_data(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let created_at = Utc::now().to_rfc3339();

    for rule in SEED_RULES {
        sqlx::query(
            "INSERT INTO workflow_rule
                 (id, document_type, min_amount, max_amount, approver_role, sla_hours, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(rule.id)
        .bind(rule.document_type)
        .bind(rule.min_amount)
        .bind(rule.max_amount)
        .bind(rule.approver_role)
        .bind(rule.sla_hours)
        .bind(&created_at)
        .execute(pool)
        .await?;
    }

    for (id, role, is_active) in SEED_ACTORS {
        sqlx::query(
            "INSERT INTO actor (id, role, is_active) VALUES (?, ?, ?)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(role)
        .bind(is_active)
        .execute(pool)
        .await?;
    }

    // Standing manager -> storekeeper delegation for material issues, with a
    // window wide enough that wall-clock test runs always fall inside it.
    sqlx::query(
        "INSERT INTO delegation_rule
             (id, delegator_id, delegate_id, starts_on, ends_on, scope, is_active)
         VALUES ('dg-1', 'u-mgr', 'u-store', '2000-01-01', '2099-12-31', 'material_issue', 1)
         ON CONFLICT (id) DO NOTHING",
    )
    .execute(pool)
    .await?;

    for (table, id) in SEED_DOCUMENTS {
        sqlx::query(&format!(
            "INSERT INTO {table} (id, status, created_at) VALUES (?, 'draft', ?)
             ON CONFLICT (id) DO NOTHING"
        ))
        .bind(id)
        .bind(&created_at)
        .execute(pool)
        .await?;
    }

    Ok(SeedSummary {
        rules: SEED_RULES.len(),
        actors: SEED_ACTORS.len(),
        delegations: 1,
        documents: SEED_DOCUMENTS.len(),
    })
}

/// Confirm the seed landed: row counts per table match the summary.
pub async fn verify_seed(pool: &DbPool) -> Result<(), RepositoryError> {
    let checks: &[(&str, i64)] = &[
        ("workflow_rule", SEED_RULES.len() as i64),
        ("actor", SEED_ACTORS.len() as i64),
        ("delegation_rule", 1),
    ];

    for (table, expected) in checks {
        let count = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table}"))
            .fetch_one(pool)
            .await?
            .get::<i64, _>("count");
        if count < *expected {
            return Err(RepositoryError::Decode(format!(
                "seed verification failed for `{table}`: expected at least {expected}, found {count}"
            )));
        }
    }

    for (table, id) in SEED_DOCUMENTS {
        let count = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table} WHERE id = ?"))
            .bind(id)
            .fetch_one(pool)
            .await?
            .get::<i64, _>("count");
        if count != 1 {
            return Err(RepositoryError::Decode(format!(
                "seed verification failed: document `{id}` missing from `{table}`"
            )));
        }
    }

    Ok(())
}
