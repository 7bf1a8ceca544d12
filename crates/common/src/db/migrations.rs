//! Schema migrations
//!
//! Idempotent raw DDL executed through the connection. All data-model
//! invariants live here as CHECK and UNIQUE constraints: status/enum value
//! lists, `version >= 1`, score range, confidence ranges, span consistency,
//! the quality-score scope XOR, and claim-link source existence. Type names
//! are selected per backend so the same migration runs on Postgres and on
//! SQLite (tests).

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr};

fn uuid_type(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => "UUID",
        _ => "TEXT",
    }
}

fn timestamp_type(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => "TIMESTAMPTZ",
        _ => "TEXT",
    }
}

fn json_type(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => "JSONB",
        _ => "TEXT",
    }
}

fn float_type(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => "DOUBLE PRECISION",
        _ => "REAL",
    }
}

/// Create all tables and indexes if they do not exist.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let uuid = uuid_type(backend);
    let ts = timestamp_type(backend);
    let json = json_type(backend);
    let float = float_type(backend);

    let statements = vec![
        format!(
            "CREATE TABLE IF NOT EXISTS jobs (
                id {uuid} PRIMARY KEY,
                repo_url TEXT NOT NULL,
                arxiv_id TEXT,
                run_command TEXT,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'running', 'completed', 'failed')),
                error_message TEXT,
                detected_environment {json},
                created_at {ts} NOT NULL,
                updated_at {ts} NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS runs (
                id {uuid} PRIMARY KEY,
                job_id {uuid} NOT NULL UNIQUE REFERENCES jobs(id),
                exit_code INTEGER,
                stdout TEXT,
                stderr TEXT,
                logs_path TEXT,
                started_at {ts} NOT NULL,
                completed_at {ts},
                duration_seconds {float}
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS artifacts (
                id {uuid} PRIMARY KEY,
                job_id {uuid} NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
                artifact_type TEXT NOT NULL
                    CHECK (artifact_type IN ('report', 'notebook', 'badge')),
                format TEXT NOT NULL,
                content_path TEXT NOT NULL,
                content_size BIGINT,
                created_at {ts} NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS reviews (
                id {uuid} PRIMARY KEY,
                url TEXT,
                doi TEXT,
                pdf_file_path TEXT,
                repo_url TEXT,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
                error_message TEXT,
                paper_meta {json},
                paper_text TEXT,
                claims {json},
                citations {json},
                checklist {json},
                quality_score {json},
                badges {json},
                html_report_path TEXT,
                json_summary_path TEXT,
                created_at {ts} NOT NULL,
                updated_at {ts} NOT NULL,
                completed_at {ts}
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS papers (
                id {uuid} PRIMARY KEY,
                aid TEXT NOT NULL UNIQUE,
                title TEXT,
                repo_url TEXT,
                visibility TEXT NOT NULL DEFAULT 'private'
                    CHECK (visibility IN ('private', 'unlisted', 'public')),
                license TEXT,
                created_by TEXT,
                created_at {ts} NOT NULL,
                updated_at {ts} NOT NULL,
                approved_public_at {ts},
                deleted_at {ts}
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS paper_versions (
                id {uuid} PRIMARY KEY,
                aid TEXT NOT NULL REFERENCES papers(aid) ON DELETE CASCADE,
                version INTEGER NOT NULL CHECK (version >= 1),
                pdf_path TEXT NOT NULL,
                meta_json {json},
                created_at {ts} NOT NULL,
                deleted_at {ts},
                CONSTRAINT uq_paper_versions_aid_version UNIQUE (aid, version)
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS paper_external_ids (
                id {uuid} PRIMARY KEY,
                paper_id {uuid} NOT NULL REFERENCES papers(id) ON DELETE CASCADE,
                kind TEXT NOT NULL CHECK (kind IN ('doi', 'arxiv', 'pmid', 'url')),
                value TEXT NOT NULL,
                created_at {ts} NOT NULL,
                CONSTRAINT uq_paper_external_ids_paper_kind UNIQUE (paper_id, kind)
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS claims (
                id {uuid} PRIMARY KEY,
                paper_version_id {uuid} NOT NULL REFERENCES paper_versions(id) ON DELETE CASCADE,
                paper_id {uuid} REFERENCES papers(id) ON DELETE CASCADE,
                text TEXT NOT NULL CHECK (length(text) <= 5000),
                span_start INTEGER,
                span_end INTEGER,
                page INTEGER,
                bbox {json},
                section TEXT,
                confidence {float}
                    CHECK (confidence IS NULL OR (confidence >= 0.0 AND confidence <= 1.0)),
                extraction_model_version TEXT,
                hash TEXT NOT NULL UNIQUE,
                text_hash TEXT,
                created_at {ts} NOT NULL,
                CONSTRAINT check_span_consistency CHECK (
                    (span_start IS NULL AND span_end IS NULL) OR
                    (span_start IS NOT NULL AND span_end IS NOT NULL)
                )
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS claim_links (
                id {uuid} PRIMARY KEY,
                claim_id {uuid} NOT NULL REFERENCES claims(id) ON DELETE CASCADE,
                source_paper_id {uuid} REFERENCES papers(id) ON DELETE SET NULL,
                source_doc_id TEXT,
                source_citation TEXT,
                relation TEXT NOT NULL
                    CHECK (relation IN ('equivalent', 'complementary', 'contradictory', 'unclear')),
                confidence {float} NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
                context_excerpt TEXT,
                reasoning_ref TEXT,
                created_at {ts} NOT NULL,
                CONSTRAINT check_source_exists CHECK (
                    source_paper_id IS NOT NULL OR source_doc_id IS NOT NULL
                )
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS quality_scores (
                id {uuid} PRIMARY KEY,
                paper_id {uuid} REFERENCES papers(id) ON DELETE CASCADE,
                paper_version_id {uuid} REFERENCES paper_versions(id) ON DELETE CASCADE,
                scope TEXT NOT NULL CHECK (scope IN ('paper', 'version')),
                score INTEGER NOT NULL CHECK (score >= 0 AND score <= 100),
                signals {json} NOT NULL,
                rationale {json} NOT NULL,
                scoring_model_version TEXT NOT NULL DEFAULT 'v0',
                created_at {ts} NOT NULL,
                CONSTRAINT check_quality_score_scope CHECK (
                    (scope = 'paper' AND paper_id IS NOT NULL AND paper_version_id IS NULL) OR
                    (scope = 'version' AND paper_version_id IS NOT NULL AND paper_id IS NULL)
                )
            )"
        ),
        // Indexes
        "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_artifacts_job_id ON artifacts (job_id)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_reviews_status ON reviews (status)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_papers_visibility ON papers (visibility)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_papers_deleted_at ON papers (deleted_at)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_paper_versions_aid ON paper_versions (aid)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_claims_paper_version_id ON claims (paper_version_id)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_claims_section ON claims (section)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_claim_links_claim_id ON claim_links (claim_id)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_quality_scores_paper_id ON quality_scores (paper_id)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_quality_scores_paper_version_id
            ON quality_scores (paper_version_id)"
            .to_string(),
    ];

    for stmt in statements {
        db.execute_unprepared(&stmt).await?;
    }

    tracing::info!("Database migrations applied");
    Ok(())
}
