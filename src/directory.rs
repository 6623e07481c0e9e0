//! Metadata directory lookups
//! --------------------------
//! The ownership resolver, organization resolver and membership probe are
//! single point lookups against the platform's relational store. They are
//! expressed as a trait so the access engine can be exercised against an
//! in-memory directory in tests.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio_postgres::NoTls;

use crate::error::{AppError, AppResult};

/// Projection of one attachment row: only the fields the access decision
/// needs. Created by the upload path, read-only here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub file_name: String,
    /// Owning organization (internal key, not the public id).
    pub org_id: i64,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgRecord {
    pub id: i64,
    pub public_id: String,
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// Ownership resolver: one read by unique identifier.
    async fn attachment_by_public_id(&self, public_id: &str) -> AppResult<Option<AttachmentRecord>>;

    /// Organization resolver: one read by the shortcode from the path.
    async fn org_by_shortcode(&self, shortcode: &str) -> AppResult<Option<OrgRecord>>;

    /// Membership existence check for `(org, account)`.
    async fn is_member(&self, org_id: i64, account_id: &str) -> AppResult<bool>;
}

/// Postgres-backed directory. Each lookup is bounded by `query_timeout` so a
/// stalled dependency cannot suspend a request indefinitely.
pub struct PgDirectory {
    client: tokio_postgres::Client,
    query_timeout: Duration,
}

impl PgDirectory {
    pub async fn connect(db_url: &str, query_timeout: Duration) -> anyhow::Result<Self> {
        let cfg: tokio_postgres::Config = db_url.parse().context("invalid postgres url")?;
        let (client, conn) = cfg
            .connect(NoTls)
            .await
            .context("connecting to metadata directory")?;
        // drive the connection in background
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::error!("directory connection closed: {e}");
            }
        });
        Ok(Self { client, query_timeout })
    }

    async fn query_opt_bounded(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> AppResult<Option<tokio_postgres::Row>> {
        let fut = self.client.query_opt(sql, params);
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(row)) => Ok(row),
            Ok(Err(e)) => Err(AppError::Internal(format!("directory query failed: {e}"))),
            Err(_) => Err(AppError::Internal("directory query timed out".to_string())),
        }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn attachment_by_public_id(&self, public_id: &str) -> AppResult<Option<AttachmentRecord>> {
        let row = self
            .query_opt_bounded(
                "SELECT file_name, org_id, is_public FROM attachments WHERE public_id = $1",
                &[&public_id],
            )
            .await?;
        Ok(row.map(|r| AttachmentRecord {
            file_name: r.get(0),
            org_id: r.get(1),
            is_public: r.get(2),
        }))
    }

    async fn org_by_shortcode(&self, shortcode: &str) -> AppResult<Option<OrgRecord>> {
        let row = self
            .query_opt_bounded(
                "SELECT id, public_id FROM orgs WHERE shortcode = $1",
                &[&shortcode],
            )
            .await?;
        Ok(row.map(|r| OrgRecord {
            id: r.get(0),
            public_id: r.get(1),
        }))
    }

    async fn is_member(&self, org_id: i64, account_id: &str) -> AppResult<bool> {
        let row = self
            .query_opt_bounded(
                "SELECT 1 FROM org_members WHERE org_id = $1 AND account_id = $2 LIMIT 1",
                &[&org_id, &account_id],
            )
            .await?;
        Ok(row.is_some())
    }
}
