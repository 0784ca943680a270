use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::db::models::{NewProof, Profile, Proof, ProofStatus};
use crate::db::repositories::{
    ProfileRepository, ProgressRepository, ProofRepository, WeekRepository,
};
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};
use crate::providers::{ObjectStorage, Principal};

/// Uploaded proof file as extracted from the multipart form.
#[derive(Debug)]
pub struct ProofFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Persistence operations the submission state machine needs. `PgPool` is
/// the production implementation; tests substitute an in-memory store.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert_proof(&self, new_proof: &NewProof) -> Result<Proof, DatabaseError>;

    async fn set_status(
        &self,
        id: Uuid,
        status: ProofStatus,
    ) -> Result<Option<Proof>, DatabaseError>;

    async fn upsert_progress(&self, user_id: Uuid, week: i32) -> Result<(), DatabaseError>;

    /// One principal's submissions only, newest first.
    async fn proofs_for_user(&self, user_id: Uuid) -> Result<Vec<Proof>, DatabaseError>;

    async fn week_titles(&self, week_numbers: &[i32])
        -> Result<Vec<(i32, String)>, DatabaseError>;
}

#[async_trait]
impl SubmissionStore for PgPool {
    async fn insert_proof(&self, new_proof: &NewProof) -> Result<Proof, DatabaseError> {
        ProofRepository::insert(self, new_proof).await
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ProofStatus,
    ) -> Result<Option<Proof>, DatabaseError> {
        ProofRepository::set_status(self, id, status).await
    }

    async fn upsert_progress(&self, user_id: Uuid, week: i32) -> Result<(), DatabaseError> {
        ProgressRepository::upsert_verified(self, user_id, week).await
    }

    async fn proofs_for_user(&self, user_id: Uuid) -> Result<Vec<Proof>, DatabaseError> {
        ProofRepository::by_user(self, user_id).await
    }

    async fn week_titles(
        &self,
        week_numbers: &[i32],
    ) -> Result<Vec<(i32, String)>, DatabaseError> {
        WeekRepository::titles_for(self, week_numbers).await
    }
}

/// Per-user, per-week, timestamp-qualified key so resubmissions never
/// collide with earlier uploads.
pub fn storage_key(user_id: Uuid, week: i32, file_name: &str, now: OffsetDateTime) -> String {
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => "bin",
    };
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("{user_id}/{week}-{millis}.{ext}")
}

/// Accept a learner's proof for a week: store the file, then insert the
/// submission row pointing at it. Insert failure triggers a best-effort
/// delete of the just-stored object so no orphan persists.
pub async fn submit<S>(
    store: &S,
    storage: &dyn ObjectStorage,
    principal: &Principal,
    week: i32,
    week_title: &str,
    file: ProofFile,
) -> AppResult<Proof>
where
    S: SubmissionStore + ?Sized,
{
    if week < 1 {
        return Err(AppError::Validation("week number must be a positive integer".to_string()));
    }
    if file.bytes.is_empty() {
        return Err(AppError::Validation("proof file is required".to_string()));
    }

    let key = storage_key(principal.id, week, &file.file_name, OffsetDateTime::now_utc());
    storage.put(&key, file.bytes, &file.content_type).await?;
    let proof_url = storage.public_url(&key);

    let new_proof = NewProof {
        user_id: principal.id,
        week,
        module_title: week_title.to_string(),
        proof_url,
    };

    match store.insert_proof(&new_proof).await {
        Ok(proof) => Ok(proof),
        Err(err) => {
            // Compensating delete. A lingering orphan is tolerated if the
            // delete fails as well; no reconciliation job exists.
            if let Err(cleanup_err) = storage.delete(&key).await {
                warn!(
                    key = %key,
                    error = %cleanup_err,
                    "failed to remove stored file after proof insert failure"
                );
            }
            Err(err.into())
        }
    }
}

#[derive(Debug)]
pub struct DecisionOutcome {
    pub proof: Proof,
    /// Whether the progress upsert (a secondary effect of approval) went
    /// through. Approval itself succeeds either way.
    pub progress_recorded: bool,
}

/// Admin decision on a pending submission: `verified` if approved, else
/// `rejected`. Approval additionally upserts the `(user, week)` progress
/// record, idempotently.
pub async fn decide<S>(store: &S, proof_id: Uuid, approved: bool) -> AppResult<DecisionOutcome>
where
    S: SubmissionStore + ?Sized,
{
    let status = if approved {
        ProofStatus::Verified
    } else {
        ProofStatus::Rejected
    };

    let proof = store
        .set_status(proof_id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("proof {proof_id} does not exist")))?;

    let mut progress_recorded = false;
    if approved {
        match store.upsert_progress(proof.user_id, proof.week).await {
            Ok(()) => progress_recorded = true,
            Err(err) => warn!(
                proof_id = %proof_id,
                error = %err,
                "failed to upsert user progress after approval"
            ),
        }
    }

    Ok(DecisionOutcome {
        proof,
        progress_recorded,
    })
}

/// Admin view of a submission, augmented with the submitter's profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProofView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub week: i32,
    pub module_title: String,
    pub proof_url: String,
    pub status: ProofStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

/// Learner view of their own submission, with the week title resolved
/// against the catalog.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofView {
    pub id: Uuid,
    pub week_number: i32,
    pub week_title: String,
    pub proof_url: String,
    pub status: ProofStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

/// All submissions across all users, newest first, joined in application
/// code against the profile mirror (there is no declared FK between the
/// two tables).
pub async fn list_for_admin(pool: &PgPool) -> AppResult<Vec<AdminProofView>> {
    let proofs = ProofRepository::all(pool).await?;

    let mut user_ids: Vec<Uuid> = proofs.iter().map(|p| p.user_id).collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let profiles: HashMap<Uuid, Profile> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        ProfileRepository::by_ids(pool, &user_ids)
            .await?
            .into_iter()
            .map(|profile| (profile.id, profile))
            .collect()
    };

    Ok(join_submitters(proofs, &profiles))
}

fn join_submitters(proofs: Vec<Proof>, profiles: &HashMap<Uuid, Profile>) -> Vec<AdminProofView> {
    proofs
        .into_iter()
        .map(|proof| {
            let profile = profiles.get(&proof.user_id);
            let module_title = if proof.module_title.is_empty() {
                format!("Week {}", proof.week)
            } else {
                proof.module_title
            };
            AdminProofView {
                id: proof.id,
                user_id: proof.user_id,
                user_name: profile
                    .map(|p| p.name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| "User".to_string()),
                user_email: profile.map(|p| p.email.clone()).unwrap_or_default(),
                week: proof.week,
                module_title,
                proof_url: proof.proof_url,
                status: proof.status,
                submitted_at: proof.submitted_at,
            }
        })
        .collect()
}

/// A learner's own submissions, newest first. Scoped to the principal at
/// the store level; nothing of other users ever reaches this function.
pub async fn list_for_user<S>(store: &S, principal: &Principal) -> AppResult<Vec<ProofView>>
where
    S: SubmissionStore + ?Sized,
{
    let proofs = store.proofs_for_user(principal.id).await?;

    let mut week_numbers: Vec<i32> = proofs.iter().map(|p| p.week).collect();
    week_numbers.sort_unstable();
    week_numbers.dedup();

    let titles: HashMap<i32, String> = if week_numbers.is_empty() {
        HashMap::new()
    } else {
        store.week_titles(&week_numbers).await?.into_iter().collect()
    };

    Ok(proofs
        .into_iter()
        .map(|proof| {
            let week_title = resolve_week_title(&titles, &proof);
            ProofView {
                id: proof.id,
                week_number: proof.week,
                week_title,
                proof_url: proof.proof_url,
                status: proof.status,
                submitted_at: proof.submitted_at,
            }
        })
        .collect())
}

/// Fallback chain for a missing catalog join: catalog title, then the
/// denormalized snapshot, then a synthesized label.
fn resolve_week_title(titles: &HashMap<i32, String>, proof: &Proof) -> String {
    if let Some(title) = titles.get(&proof.week) {
        return title.clone();
    }
    if !proof.module_title.is_empty() {
        return proof.module_title.clone();
    }
    format!("Week {}", proof.week)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct MemStore {
        proofs: Mutex<Vec<Proof>>,
        progress: Mutex<Vec<(Uuid, i32)>>,
        fail_insert: AtomicBool,
        fail_progress: AtomicBool,
    }

    impl MemStore {
        fn new() -> Self {
            Self {
                proofs: Mutex::new(Vec::new()),
                progress: Mutex::new(Vec::new()),
                fail_insert: AtomicBool::new(false),
                fail_progress: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl SubmissionStore for MemStore {
        async fn insert_proof(&self, new_proof: &NewProof) -> Result<Proof, DatabaseError> {
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(DatabaseError::Sqlx(sqlx::Error::PoolClosed));
            }
            let proof = Proof {
                id: Uuid::new_v4(),
                user_id: new_proof.user_id,
                week: new_proof.week,
                module_title: new_proof.module_title.clone(),
                proof_url: new_proof.proof_url.clone(),
                status: ProofStatus::Pending,
                submitted_at: OffsetDateTime::now_utc(),
            };
            self.proofs.lock().unwrap().push(proof.clone());
            Ok(proof)
        }

        async fn set_status(
            &self,
            id: Uuid,
            status: ProofStatus,
        ) -> Result<Option<Proof>, DatabaseError> {
            let mut proofs = self.proofs.lock().unwrap();
            match proofs.iter_mut().find(|p| p.id == id) {
                Some(proof) => {
                    proof.status = status;
                    Ok(Some(proof.clone()))
                }
                None => Ok(None),
            }
        }

        async fn upsert_progress(&self, user_id: Uuid, week: i32) -> Result<(), DatabaseError> {
            if self.fail_progress.load(Ordering::SeqCst) {
                return Err(DatabaseError::Sqlx(sqlx::Error::PoolClosed));
            }
            let mut progress = self.progress.lock().unwrap();
            if !progress.contains(&(user_id, week)) {
                progress.push((user_id, week));
            }
            Ok(())
        }

        async fn proofs_for_user(&self, user_id: Uuid) -> Result<Vec<Proof>, DatabaseError> {
            let proofs = self.proofs.lock().unwrap();
            Ok(proofs
                .iter()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn week_titles(
            &self,
            _week_numbers: &[i32],
        ) -> Result<Vec<(i32, String)>, DatabaseError> {
            Ok(Vec::new())
        }
    }

    struct MemStorage {
        objects: Mutex<std::collections::HashMap<String, Vec<u8>>>,
    }

    impl MemStorage {
        fn new() -> Self {
            Self {
                objects: Mutex::new(std::collections::HashMap::new()),
            }
        }

        fn is_empty(&self) -> bool {
            self.objects.lock().unwrap().is_empty()
        }
    }

    #[async_trait]
    impl ObjectStorage for MemStorage {
        async fn put(
            &self,
            key: &str,
            bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<(), crate::providers::StorageError> {
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("mem://{key}")
        }

        async fn delete(&self, key: &str) -> Result<(), crate::providers::StorageError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn learner() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "learner@example.com".to_string(),
            name: Some("Learner".to_string()),
        }
    }

    fn png(bytes: &[u8]) -> ProofFile {
        ProofFile {
            file_name: "proof.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn submit_starts_pending_and_stores_the_file() {
        let store = MemStore::new();
        let storage = MemStorage::new();

        let proof = submit(&store, &storage, &learner(), 3, "Week Three", png(b"img"))
            .await
            .unwrap();

        assert_eq!(proof.status, ProofStatus::Pending);
        assert_eq!(proof.week, 3);
        assert_eq!(proof.module_title, "Week Three");
        assert!(proof.proof_url.starts_with("mem://"));
        assert!(!storage.is_empty());
    }

    #[tokio::test]
    async fn submit_rejects_non_positive_week_without_storage_write() {
        let store = MemStore::new();
        let storage = MemStorage::new();

        let err = submit(&store, &storage, &learner(), 0, "", png(b"img"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(storage.is_empty());
        assert!(store.proofs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_rejects_empty_file_without_storage_write() {
        let store = MemStore::new();
        let storage = MemStorage::new();

        let err = submit(&store, &storage, &learner(), 1, "", png(b""))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn insert_failure_removes_the_stored_file() {
        let store = MemStore::new();
        store.fail_insert.store(true, Ordering::SeqCst);
        let storage = MemStorage::new();

        let err = submit(&store, &storage, &learner(), 2, "Week Two", png(b"img"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert!(storage.is_empty(), "no orphaned object may persist");
    }

    #[tokio::test]
    async fn approval_verifies_and_records_progress_idempotently() {
        let store = MemStore::new();
        let storage = MemStorage::new();
        let who = learner();

        let proof = submit(&store, &storage, &who, 3, "Week Three", png(b"img"))
            .await
            .unwrap();

        let first = decide(&store, proof.id, true).await.unwrap();
        assert_eq!(first.proof.status, ProofStatus::Verified);
        assert!(first.progress_recorded);

        // Approving again must not duplicate the progress record.
        let second = decide(&store, proof.id, true).await.unwrap();
        assert!(second.progress_recorded);
        assert_eq!(store.progress.lock().unwrap().len(), 1);
        assert_eq!(store.progress.lock().unwrap()[0], (who.id, 3));
    }

    #[tokio::test]
    async fn rejection_does_not_touch_progress() {
        let store = MemStore::new();
        let storage = MemStorage::new();

        let proof = submit(&store, &storage, &learner(), 4, "", png(b"img"))
            .await
            .unwrap();

        let outcome = decide(&store, proof.id, false).await.unwrap();
        assert_eq!(outcome.proof.status, ProofStatus::Rejected);
        assert!(!outcome.progress_recorded);
        assert!(store.progress.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn decision_on_unknown_proof_is_not_found() {
        let store = MemStore::new();
        let err = decide(&store, Uuid::new_v4(), true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn progress_upsert_failure_does_not_fail_the_approval() {
        let store = MemStore::new();
        let storage = MemStorage::new();

        let proof = submit(&store, &storage, &learner(), 5, "", png(b"img"))
            .await
            .unwrap();
        store.fail_progress.store(true, Ordering::SeqCst);

        let outcome = decide(&store, proof.id, true).await.unwrap();
        assert_eq!(outcome.proof.status, ProofStatus::Verified);
        assert!(!outcome.progress_recorded);
    }

    #[tokio::test]
    async fn listing_never_includes_another_users_submissions() {
        let store = MemStore::new();
        let storage = MemStorage::new();
        let alice = learner();
        let bob = learner();

        submit(&store, &storage, &alice, 1, "Week One", png(b"a"))
            .await
            .unwrap();
        submit(&store, &storage, &bob, 2, "Week Two", png(b"b"))
            .await
            .unwrap();

        let views = list_for_user(&store, &alice).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].week_number, 1);
        assert_eq!(views[0].week_title, "Week One");

        assert_eq!(list_for_user(&store, &bob).await.unwrap().len(), 1);
    }

    #[test]
    fn storage_keys_embed_user_week_and_extension() {
        let user_id = Uuid::new_v4();
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let key = storage_key(user_id, 3, "screenshot.png", now);
        assert_eq!(key, format!("{user_id}/3-1700000000000.png"));

        let no_ext = storage_key(user_id, 3, "screenshot", now);
        assert!(no_ext.ends_with(".bin"));
    }

    #[test]
    fn admin_join_falls_back_for_missing_profiles() {
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let profile = Profile {
            id: known,
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: crate::db::models::Role::User,
            created_at: now,
            updated_at: now,
        };
        let profiles = HashMap::from([(known, profile)]);

        let mk = |user_id, module_title: &str| Proof {
            id: Uuid::new_v4(),
            user_id,
            week: 2,
            module_title: module_title.to_string(),
            proof_url: "mem://x".to_string(),
            status: ProofStatus::Pending,
            submitted_at: now,
        };

        let views = join_submitters(vec![mk(known, "Week Two"), mk(unknown, "")], &profiles);

        assert_eq!(views[0].user_name, "Alice");
        assert_eq!(views[0].user_email, "alice@example.com");
        assert_eq!(views[1].user_name, "User");
        assert_eq!(views[1].user_email, "");
        assert_eq!(views[1].module_title, "Week 2");
    }

    #[test]
    fn week_title_fallback_chain() {
        let now = OffsetDateTime::now_utc();
        let proof = |module_title: &str| Proof {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            week: 4,
            module_title: module_title.to_string(),
            proof_url: String::new(),
            status: ProofStatus::Pending,
            submitted_at: now,
        };

        let titles = HashMap::from([(4, "Catalog Title".to_string())]);
        assert_eq!(resolve_week_title(&titles, &proof("Snapshot")), "Catalog Title");

        let empty = HashMap::new();
        assert_eq!(resolve_week_title(&empty, &proof("Snapshot")), "Snapshot");
        assert_eq!(resolve_week_title(&empty, &proof("")), "Week 4");
    }
}
