use serde::Serialize;

use crate::db::models::{Proof, ProofStatus, Week};

/// Per-week progress flags for one learner. `completed` means a proof is
/// on file (pending or verified); `verified` means an admin approved one.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekProgress {
    pub week_number: i32,
    pub title: String,
    pub video_url: Option<String>,
    pub module_link: Option<String>,
    pub drive_embed_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub primary_text: Option<String>,
    pub secondary_text: Option<String>,
    pub completed: bool,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub weeks: Vec<WeekProgress>,
    /// Number of verified weeks; this is the count an approval increments.
    pub completed_count: usize,
    pub total_count: usize,
}

/// Pure aggregation over the published catalog and a learner's proofs.
/// Recomputed on every read; any verified proof for a `(user, week)` pair
/// counts, superseded duplicates are not suppressed.
pub fn aggregate(published_weeks: Vec<Week>, proofs: &[Proof]) -> ProgressSummary {
    let total_count = published_weeks.len();

    let weeks: Vec<WeekProgress> = published_weeks
        .into_iter()
        .map(|week| {
            let verified = proofs
                .iter()
                .any(|p| p.week == week.week_number && p.status == ProofStatus::Verified);
            let pending = proofs
                .iter()
                .any(|p| p.week == week.week_number && p.status == ProofStatus::Pending);

            WeekProgress {
                week_number: week.week_number,
                title: week.title,
                video_url: week.video_url,
                module_link: week.module_link,
                drive_embed_url: week.drive_embed_url,
                thumbnail_url: week.thumbnail_url,
                primary_text: week.primary_text,
                secondary_text: week.secondary_text,
                completed: pending || verified,
                verified,
            }
        })
        .collect();

    let completed_count = weeks.iter().filter(|w| w.verified).count();

    ProgressSummary {
        weeks,
        completed_count,
        total_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn week(number: i32) -> Week {
        let now = OffsetDateTime::now_utc();
        Week {
            id: Uuid::new_v4(),
            week_number: number,
            title: format!("Week {number}"),
            start_date: None,
            video_url: None,
            module_link: None,
            drive_embed_url: None,
            thumbnail_url: None,
            primary_text: None,
            secondary_text: None,
            is_published: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn proof(week: i32, status: ProofStatus) -> Proof {
        Proof {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            week,
            module_title: String::new(),
            proof_url: String::new(),
            status,
            submitted_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn pending_marks_completed_but_not_verified() {
        let summary = aggregate(vec![week(1)], &[proof(1, ProofStatus::Pending)]);
        assert!(summary.weeks[0].completed);
        assert!(!summary.weeks[0].verified);
        assert_eq!(summary.completed_count, 0);
        assert_eq!(summary.total_count, 1);
    }

    #[test]
    fn rejected_counts_as_neither() {
        let summary = aggregate(vec![week(1)], &[proof(1, ProofStatus::Rejected)]);
        assert!(!summary.weeks[0].completed);
        assert!(!summary.weeks[0].verified);
    }

    #[test]
    fn any_verified_proof_completes_the_week() {
        // A rejected duplicate does not suppress the verified record.
        let proofs = vec![
            proof(2, ProofStatus::Rejected),
            proof(2, ProofStatus::Verified),
        ];
        let summary = aggregate(vec![week(1), week(2)], &proofs);
        assert!(summary.weeks[1].verified);
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.total_count, 2);
    }

    #[test]
    fn proofs_for_weeks_outside_the_catalog_are_ignored() {
        // Week 7 is unpublished (absent from the catalog slice): a proof
        // referencing it contributes nothing.
        let summary = aggregate(vec![week(1)], &[proof(7, ProofStatus::Verified)]);
        assert_eq!(summary.completed_count, 0);
        assert_eq!(summary.weeks.len(), 1);
        assert!(!summary.weeks[0].verified);
    }

    #[test]
    fn approval_increases_the_count_by_exactly_one() {
        let catalog = || vec![week(1), week(2), week(3)];
        let before = aggregate(catalog(), &[proof(3, ProofStatus::Pending)]);
        let after = aggregate(catalog(), &[proof(3, ProofStatus::Verified)]);
        assert_eq!(after.completed_count, before.completed_count + 1);
    }
}
