use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "proof_status", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum ProofStatus {
    Pending,
    Verified,
    Rejected,
}

/// A learner's proof-of-completion submission for one course week.
///
/// Status starts at `pending` and only ever moves to `verified` or
/// `rejected` through an admin decision.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Proof {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week: i32,
    /// Title snapshot taken at submission time; the catalog may be edited
    /// or the week row deleted afterwards.
    pub module_title: String,
    pub proof_url: String,
    pub status: ProofStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProof {
    pub user_id: Uuid,
    pub week: i32,
    pub module_title: String,
    pub proof_url: String,
}
