//! Repository pattern for database operations
//!
//! All data access goes through this type; the connection handle is threaded
//! explicitly instead of being injected ad hoc. Status transitions are
//! guarded updates so that `pending -> running -> (completed | failed)` is
//! the only sequence a job can take.

use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

/// Progressively populated review result slots
#[derive(Debug, Clone, Default)]
pub struct ReviewOutputs {
    pub paper_meta: Option<serde_json::Value>,
    pub paper_text: Option<String>,
    pub claims: Option<serde_json::Value>,
    pub citations: Option<serde_json::Value>,
    pub checklist: Option<serde_json::Value>,
    pub quality_score: Option<serde_json::Value>,
    pub badges: Option<serde_json::Value>,
    pub html_report_path: Option<String>,
    pub json_summary_path: Option<String>,
}

fn now() -> chrono::DateTime<chrono::FixedOffset> {
    Utc::now().into()
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    conn: DatabaseConnection,
}

impl Repository {
    /// Create a new repository over an established connection
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Access the underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.conn.ping().await.map_err(Into::into)
    }

    // ========================================================================
    // Job Operations
    // ========================================================================

    /// Create a new pending job
    pub async fn create_job(
        &self,
        repo_url: String,
        arxiv_id: Option<String>,
        run_command: Option<String>,
    ) -> Result<Job> {
        let now = Utc::now();
        let job = job::ActiveModel {
            id: Set(Uuid::new_v4()),
            repo_url: Set(repo_url),
            arxiv_id: Set(arxiv_id),
            run_command: Set(run_command),
            status: Set(JobStatus::Pending.as_str().to_string()),
            error_message: Set(None),
            detected_environment: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        job.insert(&self.conn).await.map_err(Into::into)
    }

    /// Find job by ID
    pub async fn find_job(&self, id: Uuid) -> Result<Option<Job>> {
        JobEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Guarded `pending -> running` transition. Returns false when the job
    /// was not in `pending` (e.g. a second consumer raced us).
    pub async fn try_mark_job_running(&self, id: Uuid) -> Result<bool> {
        let res = JobEntity::update_many()
            .col_expr(JobColumn::Status, Expr::value(JobStatus::Running.as_str()))
            .col_expr(JobColumn::UpdatedAt, Expr::value(now()))
            .filter(JobColumn::Id.eq(id))
            .filter(JobColumn::Status.eq(JobStatus::Pending.as_str()))
            .exec(&self.conn)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Mark a running job completed. Called only after all artifact rows for
    /// the job are committed.
    pub async fn complete_job(&self, id: Uuid) -> Result<()> {
        JobEntity::update_many()
            .col_expr(JobColumn::Status, Expr::value(JobStatus::Completed.as_str()))
            .col_expr(JobColumn::UpdatedAt, Expr::value(now()))
            .filter(JobColumn::Id.eq(id))
            .filter(JobColumn::Status.eq(JobStatus::Running.as_str()))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Mark a job failed with a single-line display message
    pub async fn fail_job(&self, id: Uuid, error_message: &str) -> Result<()> {
        JobEntity::update_many()
            .col_expr(JobColumn::Status, Expr::value(JobStatus::Failed.as_str()))
            .col_expr(JobColumn::ErrorMessage, Expr::value(error_message))
            .col_expr(JobColumn::UpdatedAt, Expr::value(now()))
            .filter(JobColumn::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Store the detected environment on a job
    pub async fn set_job_environment(&self, id: Uuid, env: serde_json::Value) -> Result<()> {
        JobEntity::update_many()
            .col_expr(JobColumn::DetectedEnvironment, Expr::value(env))
            .col_expr(JobColumn::UpdatedAt, Expr::value(now()))
            .filter(JobColumn::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Run Operations
    // ========================================================================

    /// Create the single run record for a job at process exit
    #[allow(clippy::too_many_arguments)]
    pub async fn create_run(
        &self,
        job_id: Uuid,
        exit_code: i32,
        stdout: String,
        stderr: String,
        logs_path: Option<String>,
        started_at: chrono::DateTime<Utc>,
        duration_seconds: f64,
    ) -> Result<Run> {
        let run = run::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(job_id),
            exit_code: Set(Some(exit_code)),
            stdout: Set(Some(stdout)),
            stderr: Set(Some(stderr)),
            logs_path: Set(logs_path),
            started_at: Set(started_at.into()),
            completed_at: Set(Some(Utc::now().into())),
            duration_seconds: Set(Some(duration_seconds)),
        };
        run.insert(&self.conn).await.map_err(Into::into)
    }

    /// Find the run belonging to a job
    pub async fn find_run_by_job(&self, job_id: Uuid) -> Result<Option<Run>> {
        RunEntity::find()
            .filter(RunColumn::JobId.eq(job_id))
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Artifact Operations
    // ========================================================================

    /// Record an emitted artifact
    pub async fn create_artifact(
        &self,
        job_id: Uuid,
        artifact_type: ArtifactType,
        format: &str,
        content_path: &str,
        content_size: Option<i64>,
    ) -> Result<Artifact> {
        let artifact = artifact::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(job_id),
            artifact_type: Set(artifact_type.as_str().to_string()),
            format: Set(format.to_string()),
            content_path: Set(content_path.to_string()),
            content_size: Set(content_size),
            created_at: Set(Utc::now().into()),
        };
        artifact.insert(&self.conn).await.map_err(Into::into)
    }

    /// List artifacts for a job
    pub async fn list_artifacts(&self, job_id: Uuid) -> Result<Vec<Artifact>> {
        ArtifactEntity::find()
            .filter(ArtifactColumn::JobId.eq(job_id))
            .order_by_asc(ArtifactColumn::CreatedAt)
            .all(&self.conn)
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Review Operations
    // ========================================================================

    /// Create a new pending review
    pub async fn create_review(
        &self,
        url: Option<String>,
        doi: Option<String>,
        pdf_file_path: Option<String>,
        repo_url: Option<String>,
    ) -> Result<Review> {
        let now = Utc::now();
        let review = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            url: Set(url),
            doi: Set(doi),
            pdf_file_path: Set(pdf_file_path),
            repo_url: Set(repo_url),
            status: Set(ReviewStatus::Pending.as_str().to_string()),
            error_message: Set(None),
            paper_meta: Set(None),
            paper_text: Set(None),
            claims: Set(None),
            citations: Set(None),
            checklist: Set(None),
            quality_score: Set(None),
            badges: Set(None),
            html_report_path: Set(None),
            json_summary_path: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            completed_at: Set(None),
        };
        review.insert(&self.conn).await.map_err(Into::into)
    }

    /// Find review by ID
    pub async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
        ReviewEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Guarded `pending -> processing` transition
    pub async fn try_mark_review_processing(&self, id: Uuid) -> Result<bool> {
        let res = ReviewEntity::update_many()
            .col_expr(ReviewColumn::Status, Expr::value(ReviewStatus::Processing.as_str()))
            .col_expr(ReviewColumn::UpdatedAt, Expr::value(now()))
            .filter(ReviewColumn::Id.eq(id))
            .filter(ReviewColumn::Status.eq(ReviewStatus::Pending.as_str()))
            .exec(&self.conn)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Persist pipeline outputs and the terminal review status in one commit,
    /// so a client observing `completed` sees every populated slot.
    pub async fn finish_review(
        &self,
        id: Uuid,
        status: ReviewStatus,
        error_message: Option<String>,
        outputs: ReviewOutputs,
    ) -> Result<Review> {
        let existing = self
            .find_review(id)
            .await?
            .ok_or_else(|| AppError::ReviewNotFound { id: id.to_string() })?;

        let mut model: review::ActiveModel = existing.into();
        model.status = Set(status.as_str().to_string());
        model.error_message = Set(error_message);
        if let Some(v) = outputs.paper_meta {
            model.paper_meta = Set(Some(v));
        }
        if let Some(v) = outputs.paper_text {
            model.paper_text = Set(Some(v));
        }
        if let Some(v) = outputs.claims {
            model.claims = Set(Some(v));
        }
        if let Some(v) = outputs.citations {
            model.citations = Set(Some(v));
        }
        if let Some(v) = outputs.checklist {
            model.checklist = Set(Some(v));
        }
        if let Some(v) = outputs.quality_score {
            model.quality_score = Set(Some(v));
        }
        if let Some(v) = outputs.badges {
            model.badges = Set(Some(v));
        }
        if let Some(v) = outputs.html_report_path {
            model.html_report_path = Set(Some(v));
        }
        if let Some(v) = outputs.json_summary_path {
            model.json_summary_path = Set(Some(v));
        }
        model.updated_at = Set(Utc::now().into());
        if matches!(status, ReviewStatus::Completed | ReviewStatus::Failed) {
            model.completed_at = Set(Some(Utc::now().into()));
        }

        model.update(&self.conn).await.map_err(Into::into)
    }

    /// Mark a review failed without touching result slots
    pub async fn fail_review(&self, id: Uuid, error_message: &str) -> Result<()> {
        ReviewEntity::update_many()
            .col_expr(ReviewColumn::Status, Expr::value(ReviewStatus::Failed.as_str()))
            .col_expr(ReviewColumn::ErrorMessage, Expr::value(error_message))
            .col_expr(ReviewColumn::UpdatedAt, Expr::value(now()))
            .filter(ReviewColumn::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    /// Create a paper shell (version rows are created separately)
    pub async fn create_paper(
        &self,
        aid: String,
        title: Option<String>,
        repo_url: Option<String>,
        license: Option<String>,
        visibility: PaperVisibility,
    ) -> Result<Paper> {
        let now = Utc::now();
        let paper = paper::ActiveModel {
            id: Set(Uuid::new_v4()),
            aid: Set(aid),
            title: Set(title),
            repo_url: Set(repo_url),
            visibility: Set(visibility.as_str().to_string()),
            license: Set(license),
            created_by: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            approved_public_at: Set(None),
            deleted_at: Set(None),
        };
        paper.insert(&self.conn).await.map_err(Into::into)
    }

    /// Find a live (not soft-deleted) paper by AID
    pub async fn find_paper_by_aid(&self, aid: &str) -> Result<Option<Paper>> {
        PaperEntity::find()
            .filter(PaperColumn::Aid.eq(aid))
            .filter(PaperColumn::DeletedAt.is_null())
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Soft-delete a paper; rows stay but default queries hide them
    pub async fn soft_delete_paper(&self, aid: &str) -> Result<()> {
        PaperEntity::update_many()
            .col_expr(PaperColumn::DeletedAt, Expr::value(now()))
            .filter(PaperColumn::Aid.eq(aid))
            .filter(PaperColumn::DeletedAt.is_null())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Insert a paper version row. The `(aid, version)` uniqueness constraint
    /// turns concurrent allocation races into errors for all but one writer.
    pub async fn create_paper_version(
        &self,
        aid: &str,
        version: i32,
        pdf_path: &str,
        meta_json: Option<serde_json::Value>,
    ) -> Result<PaperVersion> {
        let model = paper_version::ActiveModel {
            id: Set(Uuid::new_v4()),
            aid: Set(aid.to_string()),
            version: Set(version),
            pdf_path: Set(pdf_path.to_string()),
            meta_json: Set(meta_json),
            created_at: Set(Utc::now().into()),
            deleted_at: Set(None),
        };
        model.insert(&self.conn).await.map_err(Into::into)
    }

    /// Next version number for a paper: max(version) + 1, or 1
    pub async fn next_version_number(&self, aid: &str) -> Result<i32> {
        let latest = self.find_version(aid, None).await?;
        Ok(latest.map(|v| v.version + 1).unwrap_or(1))
    }

    /// Find a live paper version; `None` requests the latest
    pub async fn find_version(&self, aid: &str, version: Option<i32>) -> Result<Option<PaperVersion>> {
        let mut query = PaperVersionEntity::find()
            .filter(PaperVersionColumn::Aid.eq(aid))
            .filter(PaperVersionColumn::DeletedAt.is_null());

        query = match version {
            Some(v) => query.filter(PaperVersionColumn::Version.eq(v)),
            None => query.order_by_desc(PaperVersionColumn::Version),
        };

        query.one(&self.conn).await.map_err(Into::into)
    }

    /// IDs of all live versions of a paper
    pub async fn version_ids(&self, aid: &str) -> Result<Vec<Uuid>> {
        let versions = PaperVersionEntity::find()
            .filter(PaperVersionColumn::Aid.eq(aid))
            .filter(PaperVersionColumn::DeletedAt.is_null())
            .all(&self.conn)
            .await?;
        Ok(versions.into_iter().map(|v| v.id).collect())
    }

    /// Count live versions of a paper
    pub async fn count_versions(&self, aid: &str) -> Result<u64> {
        PaperVersionEntity::find()
            .filter(PaperVersionColumn::Aid.eq(aid))
            .filter(PaperVersionColumn::DeletedAt.is_null())
            .count(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Count claims across all live versions of a paper
    pub async fn count_claims(&self, aid: &str) -> Result<u64> {
        let ids = self.version_ids(aid).await?;
        if ids.is_empty() {
            return Ok(0);
        }
        ClaimEntity::find()
            .filter(ClaimColumn::PaperVersionId.is_in(ids))
            .count(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Count quality scores attached to a paper or any of its versions
    pub async fn count_scores(&self, paper_id: Uuid, aid: &str) -> Result<u64> {
        let ids = self.version_ids(aid).await?;
        let mut cond = Condition::any().add(QualityScoreColumn::PaperId.eq(paper_id));
        if !ids.is_empty() {
            cond = cond.add(QualityScoreColumn::PaperVersionId.is_in(ids));
        }
        QualityScoreEntity::find()
            .filter(cond)
            .count(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Most recent quality score for a paper or any of its versions
    pub async fn latest_score(&self, paper_id: Uuid, aid: &str) -> Result<Option<QualityScore>> {
        let ids = self.version_ids(aid).await?;
        let mut cond = Condition::any().add(QualityScoreColumn::PaperId.eq(paper_id));
        if !ids.is_empty() {
            cond = cond.add(QualityScoreColumn::PaperVersionId.is_in(ids));
        }
        QualityScoreEntity::find()
            .filter(cond)
            .order_by_desc(QualityScoreColumn::CreatedAt)
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Attach an external identifier to a paper (one per kind)
    pub async fn add_external_id(
        &self,
        paper_id: Uuid,
        kind: ExternalIdKind,
        value: &str,
    ) -> Result<PaperExternalId> {
        let model = paper_external_id::ActiveModel {
            id: Set(Uuid::new_v4()),
            paper_id: Set(paper_id),
            kind: Set(kind.as_str().to_string()),
            value: Set(value.to_string()),
            created_at: Set(Utc::now().into()),
        };
        model.insert(&self.conn).await.map_err(Into::into)
    }

    // ========================================================================
    // Claim Operations
    // ========================================================================

    /// Insert a claim; the hash column dedupes identical extractions
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_claim(
        &self,
        paper_version_id: Uuid,
        paper_id: Option<Uuid>,
        text: &str,
        span: Option<(i32, i32)>,
        section: Option<String>,
        confidence: Option<f64>,
        text_hash: Option<String>,
    ) -> Result<Claim> {
        let (span_start, span_end) = match span {
            Some((s, e)) => (Some(s), Some(e)),
            None => (None, None),
        };
        let hash = Claim::compute_hash(text, span_start, span_end, paper_version_id);

        let model = claim::ActiveModel {
            id: Set(Uuid::new_v4()),
            paper_version_id: Set(paper_version_id),
            paper_id: Set(paper_id),
            text: Set(text.to_string()),
            span_start: Set(span_start),
            span_end: Set(span_end),
            page: Set(None),
            bbox: Set(None),
            section: Set(section),
            confidence: Set(confidence),
            extraction_model_version: Set(None),
            hash: Set(hash),
            text_hash: Set(text_hash),
            created_at: Set(Utc::now().into()),
        };
        model.insert(&self.conn).await.map_err(Into::into)
    }

    /// List claims for a paper with optional version/section filters
    pub async fn list_claims(
        &self,
        aid: &str,
        version: Option<i32>,
        section: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Claim>> {
        let version_ids: Vec<Uuid> = match version {
            Some(v) => match self.find_version(aid, Some(v)).await? {
                Some(found) => vec![found.id],
                None => return Ok(Vec::new()),
            },
            None => self.version_ids(aid).await?,
        };
        if version_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = ClaimEntity::find().filter(ClaimColumn::PaperVersionId.is_in(version_ids));
        if let Some(section) = section {
            query = query.filter(ClaimColumn::Section.eq(section));
        }

        query
            .order_by_asc(ClaimColumn::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Insert a claim link
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_claim_link(
        &self,
        claim_id: Uuid,
        source_paper_id: Option<Uuid>,
        source_doc_id: Option<String>,
        relation: ClaimRelation,
        confidence: f64,
        context_excerpt: Option<String>,
        reasoning_ref: Option<String>,
    ) -> Result<ClaimLink> {
        let model = claim_link::ActiveModel {
            id: Set(Uuid::new_v4()),
            claim_id: Set(claim_id),
            source_paper_id: Set(source_paper_id),
            source_doc_id: Set(source_doc_id),
            source_citation: Set(None),
            relation: Set(relation.as_str().to_string()),
            confidence: Set(confidence),
            context_excerpt: Set(context_excerpt),
            reasoning_ref: Set(reasoning_ref),
            created_at: Set(Utc::now().into()),
        };
        model.insert(&self.conn).await.map_err(Into::into)
    }

    // ========================================================================
    // Quality Score Operations
    // ========================================================================

    /// Insert a quality score scoped to a paper or a version (XOR enforced
    /// by the schema)
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_quality_score(
        &self,
        scope: QualityScoreScope,
        paper_id: Option<Uuid>,
        paper_version_id: Option<Uuid>,
        score: i32,
        signals: serde_json::Value,
        rationale: serde_json::Value,
        scoring_model_version: &str,
    ) -> Result<QualityScore> {
        let model = quality_score::ActiveModel {
            id: Set(Uuid::new_v4()),
            paper_id: Set(paper_id),
            paper_version_id: Set(paper_version_id),
            scope: Set(scope.as_str().to_string()),
            score: Set(score),
            signals: Set(signals),
            rationale: Set(rationale),
            scoring_model_version: Set(scoring_model_version.to_string()),
            created_at: Set(Utc::now().into()),
        };
        model.insert(&self.conn).await.map_err(Into::into)
    }
}
