//!
//! filegate HTTP server
//! --------------------
//! Axum routes and handlers for the retrieval proxy.
//!
//! Responsibilities:
//! - Attachment route: validate path parameters, resolve ownership and org,
//!   decide access, mint a retrieval credential and relay the stream.
//! - Avatar route: public passthrough to the avatar bucket.
//! - Principal extraction from the header the external authenticator sets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::access::{self, DenialReason, Principal};
use crate::config::Config;
use crate::directory::{Directory, PgDirectory};
use crate::error::AppError;
use crate::ident::{validate_type_id, ResourceClass};
use crate::relay;
use crate::signer::ObjectSigner;

/// Header carrying the opaque account id attached by the external
/// authenticator. Absence means anonymous.
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Shared server state injected into all handlers. Cloned per request;
/// holds no per-request mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<dyn Directory>,
    pub signer: Arc<ObjectSigner>,
    pub http: reqwest::Client,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "filegate ok" }))
        .route(
            "/attachment/{org_shortcode}/{attachment_id}/{filename}",
            get(get_attachment),
        )
        .route("/avatar/{*key}", get(get_avatar))
        .with_state(state)
}

/// Start the server with an already-loaded configuration.
pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    let directory = PgDirectory::connect(
        &config.db_url,
        Duration::from_millis(config.db_timeout_ms),
    )
    .await?;

    let signer = ObjectSigner::from_config(&config.s3, Duration::from_secs(config.signed_url_ttl_secs));

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http_port = config.http_port;
    let state = AppState {
        config: Arc::new(config),
        directory: Arc::new(directory),
        signer: Arc::new(signer),
        http,
    };

    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let value = headers.get(ACCOUNT_ID_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(Principal { account_id: value.to_string() })
}

fn denial_to_error(reason: DenialReason, requested_filename: &str) -> AppError {
    match reason {
        DenialReason::NotFound => AppError::NotFound(requested_filename.to_string()),
        DenialReason::InvalidOrg => AppError::InvalidOrg,
        DenialReason::Unauthenticated => AppError::Unauthenticated,
        DenialReason::Unauthorized => AppError::Unauthorized,
    }
}

/// Attachment proxy: verifies the caller may view the attachment, then
/// streams it via a fresh time-boxed credential.
/// path: /attachment/{org_shortcode}/{attachment_id}/{filename}
pub async fn get_attachment(
    State(state): State<AppState>,
    Path((org_shortcode, attachment_id, filename)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if org_shortcode.trim().is_empty() || attachment_id.trim().is_empty() || filename.trim().is_empty()
    {
        return Err(AppError::MalformedRequest("Missing required parameters".to_string()));
    }

    if !validate_type_id(ResourceClass::Attachment, &attachment_id) {
        return Err(AppError::InvalidIdentifier);
    }

    let attachment = state.directory.attachment_by_public_id(&attachment_id).await?;
    let org = state.directory.org_by_shortcode(&org_shortcode).await?;
    let principal = principal_from_headers(&headers);

    let decision = access::decide(
        state.directory.as_ref(),
        attachment.as_ref(),
        org.as_ref(),
        &filename,
        principal.as_ref(),
    )
    .await?;
    if let Some(reason) = decision.reason {
        return Err(denial_to_error(reason, &filename));
    }

    // An allow decision implies both records resolved.
    let (attachment, org) = match (attachment, org) {
        (Some(a), Some(o)) => (a, o),
        _ => return Err(AppError::Internal("allow decision without resolved records".to_string())),
    };

    let key = ObjectSigner::object_key(&org.public_id, &attachment_id, &attachment.file_name);
    let signed_url = state
        .signer
        .presign_get(&state.config.s3.bucket_attachments, &key)
        .await?;

    info!(
        org = %org_shortcode,
        attachment = %attachment_id,
        public = attachment.is_public,
        "streaming attachment"
    );
    relay::stream_signed_url(&state.http, &signed_url, &state.config.webapp_url).await
}

/// Avatar passthrough, mirroring the public bucket.
/// path: /avatar/{*key}
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let key = key.trim_start_matches('/');
    if key.trim().is_empty() {
        return Err(AppError::MalformedRequest("Missing required parameters".to_string()));
    }
    relay::stream_avatar(
        &state.http,
        &state.config.s3.endpoint,
        &state.config.s3.bucket_avatars,
        key,
    )
    .await
}
