//! Storage-layer invariant tests
//!
//! These run against in-memory SQLite and exercise the CHECK/UNIQUE
//! constraints the schema carries; the invariants hold at the database
//! layer, not merely in application code.

use arandu_common::db::models::*;
use arandu_common::db::{run_migrations, Repository};
use sea_orm::{ConnectOptions, Database};
use uuid::Uuid;

async fn test_repo() -> Repository {
    // A single pooled connection keeps every statement on the same
    // in-memory database.
    let mut opts = ConnectOptions::new("sqlite::memory:".to_owned());
    opts.max_connections(1).sqlx_logging(false);
    let conn = Database::connect(opts).await.expect("connect sqlite");
    run_migrations(&conn).await.expect("migrations");
    Repository::new(conn)
}

async fn seed_paper_with_version(repo: &Repository) -> (Paper, PaperVersion) {
    let paper = repo
        .create_paper("testaid12345".into(), Some("A Paper".into()), None, None, PaperVisibility::Private)
        .await
        .expect("create paper");
    let version = repo
        .create_paper_version("testaid12345", 1, "papers/testaid12345/v1/file.pdf", None)
        .await
        .expect("create version");
    (paper, version)
}

#[tokio::test]
async fn version_zero_and_negative_rejected() {
    let repo = test_repo().await;
    let _ = repo
        .create_paper("aid0".into(), None, None, None, PaperVisibility::Private)
        .await
        .unwrap();

    assert!(repo.create_paper_version("aid0", 0, "papers/aid0/v0/file.pdf", None).await.is_err());
    assert!(repo.create_paper_version("aid0", -1, "papers/aid0/v-1/file.pdf", None).await.is_err());
    assert!(repo.create_paper_version("aid0", 1, "papers/aid0/v1/file.pdf", None).await.is_ok());
}

#[tokio::test]
async fn aid_version_uniqueness() {
    let repo = test_repo().await;
    let _ = seed_paper_with_version(&repo).await;

    // A second (aid, version=1) insert must hit the unique constraint.
    let duplicate = repo
        .create_paper_version("testaid12345", 1, "papers/testaid12345/v1/file.pdf", None)
        .await;
    assert!(duplicate.is_err());

    // Next allocated number skips past the committed row.
    assert_eq!(repo.next_version_number("testaid12345").await.unwrap(), 2);
}

#[tokio::test]
async fn concurrent_version_allocation_single_winner() {
    let repo = test_repo().await;
    let _ = repo
        .create_paper("race1".into(), None, None, None, PaperVisibility::Private)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_paper_version("race1", 1, "papers/race1/v1/file.pdf", None)
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn quality_score_range_bounds() {
    let repo = test_repo().await;
    let (paper, _) = seed_paper_with_version(&repo).await;

    for ok_score in [0, 100] {
        assert!(repo
            .insert_quality_score(
                QualityScoreScope::Paper,
                Some(paper.id),
                None,
                ok_score,
                serde_json::json!({}),
                serde_json::json!({}),
                "v0",
            )
            .await
            .is_ok());
    }

    for bad_score in [-1, 101] {
        assert!(repo
            .insert_quality_score(
                QualityScoreScope::Paper,
                Some(paper.id),
                None,
                bad_score,
                serde_json::json!({}),
                serde_json::json!({}),
                "v0",
            )
            .await
            .is_err());
    }
}

#[tokio::test]
async fn quality_score_scope_xor() {
    let repo = test_repo().await;
    let (paper, version) = seed_paper_with_version(&repo).await;

    // scope=paper with both ids set violates the XOR check.
    assert!(repo
        .insert_quality_score(
            QualityScoreScope::Paper,
            Some(paper.id),
            Some(version.id),
            50,
            serde_json::json!({}),
            serde_json::json!({}),
            "v0",
        )
        .await
        .is_err());

    // scope=version with only paper_id set is also invalid.
    assert!(repo
        .insert_quality_score(
            QualityScoreScope::Version,
            Some(paper.id),
            None,
            50,
            serde_json::json!({}),
            serde_json::json!({}),
            "v0",
        )
        .await
        .is_err());

    // The two well-formed shapes pass.
    assert!(repo
        .insert_quality_score(
            QualityScoreScope::Version,
            None,
            Some(version.id),
            50,
            serde_json::json!({}),
            serde_json::json!({}),
            "v0",
        )
        .await
        .is_ok());
}

#[tokio::test]
async fn claim_hash_dedupe_and_span_consistency() {
    let repo = test_repo().await;
    let (paper, version) = seed_paper_with_version(&repo).await;

    let first = repo
        .insert_claim(
            version.id,
            Some(paper.id),
            "We show that X improves Y.",
            Some((10, 36)),
            Some("results".into()),
            Some(0.8),
            None,
        )
        .await;
    assert!(first.is_ok());

    // Identical (text, span, version) re-extraction collides on hash.
    let duplicate = repo
        .insert_claim(
            version.id,
            Some(paper.id),
            "We show that X improves Y.",
            Some((10, 36)),
            Some("results".into()),
            Some(0.8),
            None,
        )
        .await;
    assert!(duplicate.is_err());

    // Same text without a span is a distinct claim.
    assert!(repo
        .insert_claim(
            version.id,
            Some(paper.id),
            "We show that X improves Y.",
            None,
            Some("results".into()),
            Some(0.8),
            None,
        )
        .await
        .is_ok());

    // Confidence outside [0, 1] is rejected.
    assert!(repo
        .insert_claim(version.id, None, "Out of range claim.", None, None, Some(1.5), None)
        .await
        .is_err());
}

#[tokio::test]
async fn claim_link_requires_source() {
    let repo = test_repo().await;
    let (paper, version) = seed_paper_with_version(&repo).await;
    let claim = repo
        .insert_claim(version.id, Some(paper.id), "A linked claim.", None, None, None, None)
        .await
        .unwrap();

    // Neither source present: rejected by check_source_exists.
    assert!(repo
        .insert_claim_link(claim.id, None, None, ClaimRelation::Equivalent, 0.9, None, None)
        .await
        .is_err());

    // Confidence out of range: rejected.
    assert!(repo
        .insert_claim_link(
            claim.id,
            None,
            Some("doc-1".into()),
            ClaimRelation::Equivalent,
            1.5,
            None,
            None,
        )
        .await
        .is_err());

    // Opaque document source alone is enough.
    assert!(repo
        .insert_claim_link(
            claim.id,
            None,
            Some("doc-1".into()),
            ClaimRelation::Complementary,
            0.5,
            None,
            None,
        )
        .await
        .is_ok());
}

#[tokio::test]
async fn external_id_kind_uniqueness() {
    let repo = test_repo().await;
    let (paper, _) = seed_paper_with_version(&repo).await;

    assert!(repo.add_external_id(paper.id, ExternalIdKind::Doi, "10.1/abc").await.is_ok());
    assert!(repo.add_external_id(paper.id, ExternalIdKind::Doi, "10.1/other").await.is_err());
    assert!(repo.add_external_id(paper.id, ExternalIdKind::Arxiv, "2401.00001").await.is_ok());
}

#[tokio::test]
async fn job_status_transition_is_guarded() {
    let repo = test_repo().await;
    let job = repo
        .create_job("https://github.com/user/repo".into(), None, Some("python main.py".into()))
        .await
        .unwrap();
    assert_eq!(job.job_status(), JobStatus::Pending);

    // First pickup wins, second consumer sees false.
    assert!(repo.try_mark_job_running(job.id).await.unwrap());
    assert!(!repo.try_mark_job_running(job.id).await.unwrap());

    repo.complete_job(job.id).await.unwrap();
    let job = repo.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(job.job_status(), JobStatus::Completed);
    assert!(job.is_terminal());
}

#[tokio::test]
async fn run_is_unique_per_job() {
    let repo = test_repo().await;
    let job = repo
        .create_job("https://github.com/user/repo".into(), None, None)
        .await
        .unwrap();

    let started = chrono::Utc::now();
    assert!(repo
        .create_run(job.id, 0, "out".into(), "err".into(), None, started, 1.5)
        .await
        .is_ok());

    // The unique constraint on runs.job_id prevents double-commit.
    assert!(repo
        .create_run(job.id, 0, "out".into(), "err".into(), None, started, 1.5)
        .await
        .is_err());
}

#[tokio::test]
async fn soft_delete_hides_paper() {
    let repo = test_repo().await;
    let _ = seed_paper_with_version(&repo).await;

    assert!(repo.find_paper_by_aid("testaid12345").await.unwrap().is_some());
    repo.soft_delete_paper("testaid12345").await.unwrap();
    assert!(repo.find_paper_by_aid("testaid12345").await.unwrap().is_none());
}

#[tokio::test]
async fn review_lifecycle_and_outputs() {
    let repo = test_repo().await;
    let review = repo
        .create_review(None, None, Some("/tmp/paper.pdf".into()), None)
        .await
        .unwrap();
    assert_eq!(review.review_status(), ReviewStatus::Pending);

    assert!(repo.try_mark_review_processing(review.id).await.unwrap());
    assert!(!repo.try_mark_review_processing(review.id).await.unwrap());

    let outputs = arandu_common::db::repository::ReviewOutputs {
        paper_text: Some("We propose X.".into()),
        claims: Some(serde_json::json!([{ "id": "c0", "text": "We propose X." }])),
        ..Default::default()
    };
    let updated = repo
        .finish_review(review.id, ReviewStatus::Completed, None, outputs)
        .await
        .unwrap();
    assert_eq!(updated.review_status(), ReviewStatus::Completed);
    assert!(updated.completed_at.is_some());
    assert!(updated.claims.is_some());
}
